pub mod support_report;
