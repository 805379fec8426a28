use axum::http::StatusCode;

/// Handler for `GET /healthz`. Answers as long as the process is serving.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Turn the result of a dependency probe into a `GET /readyz` status.
///
/// Services run their own probe (database ping, upstream check) and hand the
/// outcome here so every service reports readiness the same way.
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
