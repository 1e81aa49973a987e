use std::time::Duration;

/// Errors produced by the Tower Keygate middleware stack.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KeygateError {
    /// The caller's limiter rejected the request.
    ///
    /// The duration indicates when the client should retry.
    /// When the `axum` feature is enabled, this converts to `429 Too Many Requests`
    /// with a JSON `{"message": ...}` body and a `Retry-After` header.
    #[error("Too many requests, please try again later")]
    RateLimited {
        /// The duration to wait before retrying.
        retry_after: Duration,
    },

    /// The inner service exceeded the maximum allowed time.
    ///
    /// When the `axum` feature is enabled, this converts to `408 Request Timeout`.
    #[error("Request timed out")]
    Timeout,

    /// An unexpected error occurred in the inner service.
    ///
    /// The string contains the `Display` representation of the inner error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

impl KeygateError {
    /// Whole seconds to advertise in a `Retry-After` header, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(
                retry_after
                    .as_secs()
                    .saturating_add(u64::from(retry_after.subsec_nanos() > 0))
                    .max(1),
            ),
            _ => None,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for KeygateError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Inner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(serde_json::json!({ "message": self.to_string() }));

        let mut response = (status, body).into_response();
        if let Some(secs) = self.retry_after_secs() {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                axum::http::HeaderValue::from(secs),
            );
        }
        response
    }
}

/// Converts any error escaping the stack into a response.
///
/// Intended for `axum::error_handling::HandleErrorLayer`.
#[cfg(feature = "axum")]
pub async fn handle_error(err: tower::BoxError) -> axum::response::Response {
    use axum::response::IntoResponse;

    match err.downcast::<KeygateError>() {
        Ok(err) => (*err).into_response(),
        Err(err) => KeygateError::Inner(err.to_string()).into_response(),
    }
}
