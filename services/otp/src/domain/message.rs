use chrono::Duration;

use crate::domain::types::Purpose;

/// Rendered passcode email.
#[derive(Debug, Clone)]
pub struct PasscodeMessage {
    pub subject: String,
    pub html_body: String,
}

impl PasscodeMessage {
    /// Build the email for `purpose`. `valid_for` must be the same window the
    /// verify step enforces.
    pub fn render(purpose: Purpose, code: &str, valid_for: Duration) -> Self {
        let (subject, lead) = match purpose {
            Purpose::Registration => (
                "Confirm your email to finish signing up",
                "Use this code to verify your email address and create your account.",
            ),
            Purpose::PasswordReset => (
                "Your password reset code",
                "Use this code to reset your password. If you did not ask for a reset, you can ignore this email.",
            ),
            Purpose::EmailUpdate => (
                "Confirm your new email address",
                "Use this code to confirm this address as the new email for your account.",
            ),
        };
        let html_body = format!(
            "<p>{lead}</p>\
             <p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
             <p>The code expires in {window}. Never share it with anyone.</p>",
            window = describe_window(valid_for),
        );
        Self {
            subject: subject.to_owned(),
            html_body,
        }
    }
}

fn describe_window(window: Duration) -> String {
    let minutes = window.num_minutes();
    if minutes >= 1 && window.num_seconds() % 60 == 0 {
        if minutes == 1 {
            "1 minute".to_owned()
        } else {
            format!("{minutes} minutes")
        }
    } else {
        format!("{} seconds", window.num_seconds())
    }
}
