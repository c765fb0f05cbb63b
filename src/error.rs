use thiserror::Error;

/// Failure of a single content-API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered 404.
    #[error("{message}")]
    NotFound { url: String, message: String },

    /// The API answered with another non-success status.
    #[error("{message}")]
    Status { url: String, status: u16, message: String },

    /// No response arrived (connect failure, timeout, truncated body).
    #[error("{message}")]
    Network { url: String, message: String },

    /// The response body did not match the expected shape.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Message shown to the user in place of content.
    pub fn display_message(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Build the error for a non-success response from its status and raw body.
    ///
    /// The body's `message` field wins; otherwise a generic status line is used.
    pub fn from_status(url: impl Into<String>, status: u16, body: &str) -> Self {
        let url = url.into();
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        if status == 404 {
            Self::NotFound { url, message }
        } else {
            Self::Status { url, status, message }
        }
    }

    pub fn network(url: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::Network { url: url.into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_uses_body_message() {
        let err = ApiError::from_status("http://x/info/1", 404, r#"{"message":"not found"}"#);
        assert!(err.is_not_found());
        assert_eq!(err.display_message(), "not found");
    }

    #[test]
    fn status_without_message_gets_generic_text() {
        let err = ApiError::from_status("http://x/watch/1", 500, "<html>oops</html>");
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.display_message(), "Request failed with status code 500");
    }
}
