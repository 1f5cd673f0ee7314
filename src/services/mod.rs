pub mod mailer;
pub mod support;
