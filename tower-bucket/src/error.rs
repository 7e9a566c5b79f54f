use std::time::Duration;

use http::HeaderValue;
use http::Response;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http::header::RETRY_AFTER;

/// Body of every rate-limit rejection.
pub const TOO_MANY_REQUESTS: &str = "Too Many Requests";

/// Errors produced by the Tower Bucket middleware stack.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimitError {
    /// The client has exhausted its bucket.
    ///
    /// Converts to `429 Too Many Requests` with a `text/plain` body of exactly
    /// `Too Many Requests`.
    #[error("Too Many Requests")]
    RateLimited {
        /// The time until the client's bucket holds a whole token again.
        retry_after: Duration,
    },
}

impl LimitError {
    /// Render the rejection as an HTTP response.
    ///
    /// `Retry-After` is only emitted when `retry_after_header` is set, rounded up to
    /// whole seconds and never less than one.
    pub fn into_http_response<B>(self, retry_after_header: bool) -> Response<B>
    where
        B: From<&'static str>,
    {
        let Self::RateLimited { retry_after } = self;

        let mut response = Response::new(B::from(TOO_MANY_REQUESTS));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        if retry_after_header {
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        }
        response
    }
}

fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    let secs = if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    };
    secs.max(1)
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for LimitError {
    fn into_response(self) -> axum::response::Response {
        self.into_http_response::<axum::body::Body>(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_text_429() {
        let response: Response<String> = LimitError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_http_response(false);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert!(response.headers().get(RETRY_AFTER).is_none());
        assert_eq!(response.body(), "Too Many Requests");
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(200)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(2)), 2);
        assert_eq!(retry_after_secs(Duration::from_millis(2001)), 3);

        let response: Response<String> = LimitError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_http_response(true);
        assert_eq!(response.headers()[RETRY_AFTER], "2");
    }
}
