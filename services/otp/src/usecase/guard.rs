//! Daily request quota and failed-attempt lockout. Pure functions over a
//! record's counters.

use crate::domain::types::{MAX_DAILY_REQUESTS, MAX_FAILED_ATTEMPTS};
use crate::error::OtpServiceError;

/// Gate for a new issuance. The quota applies only within the same calendar day
/// as the previous issuance; the lockout applies whenever the error count has
/// reached the ceiling.
pub fn check_limit(
    is_same_day: bool,
    error_count: u32,
    request_count: u32,
) -> Result<(), OtpServiceError> {
    if is_same_day && request_count >= MAX_DAILY_REQUESTS {
        return Err(OtpServiceError::RateLimitExceeded);
    }
    check_lockout(error_count)
}

/// Gate for a verification attempt.
pub fn check_lockout(error_count: u32) -> Result<(), OtpServiceError> {
    if error_count >= MAX_FAILED_ATTEMPTS {
        return Err(OtpServiceError::TooManyFailedAttempts);
    }
    Ok(())
}
