use thiserror::Error;

/// Top-level error type for the `metalport-api` crate.
///
/// Covers every failure mode of the Metal API surface: authentication,
/// transport, structured API errors, and response decoding.
/// `metalport-core` classifies these into service error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Auth token rejected, or not usable as a header value.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response. `request_id` is only set when the response
    /// carried both a JSON body and an `X-Request-Id` header, i.e. it came
    /// from the API itself and not from a proxy or load balancer.
    #[error("API error (HTTP {status}): {}", .errors.join("; "))]
    Api {
        status: u16,
        errors: Vec<String>,
        request_id: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the error body was produced by the API.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { request_id: Some(_), .. })
    }

    /// Returns `true` if the resource does not exist.
    ///
    /// A 404 from something in front of the API (cache, load balancer)
    /// does not count.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status: 404, .. } => self.is_api_error(),
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if the caller lacks access to the resource.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Returns `true` for the 422 the API sends when unassigning a virtual
    /// network that is not assigned to the port.
    pub fn is_not_assigned(&self) -> bool {
        self.unprocessable_messages().any(|m| {
            let m = m.trim();
            m.starts_with("Virtual network") && m.ends_with("not assigned")
        })
    }

    /// Returns `true` for the 422 the API sends when assigning a virtual
    /// network that is already assigned to the port.
    pub fn is_already_assigned(&self) -> bool {
        self.unprocessable_messages()
            .any(|m| m.contains("already assigned"))
    }

    fn unprocessable_messages(&self) -> impl Iterator<Item = &str> {
        let errors: &[String] = match self {
            Self::Api {
                status: 422,
                errors,
                ..
            } => errors,
            _ => &[],
        };
        errors.iter().map(String::as_str)
    }
}
