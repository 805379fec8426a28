pub mod email_update;
pub mod flow;
pub mod guard;
pub mod passcode;
pub mod password_reset;
pub mod registration;
