//! The whitelisted header set forwarded to backend agents.

/// Headers forwarded from the ingress request to agents. Only the request id
/// and the caller's Authorization ever cross the boundary; everything else
/// the clients set themselves.
#[derive(Clone, Debug, Default)]
pub struct ForwardHeaders {
    /// Correlation id, echoed as `X-Request-ID` on outbound calls.
    pub request_id: String,
    /// Caller's `Authorization` header, forwarded verbatim when present.
    pub authorization: Option<String>,
}

impl ForwardHeaders {
    pub fn new(request_id: impl Into<String>, authorization: Option<String>) -> ForwardHeaders {
        ForwardHeaders {
            request_id: request_id.into(),
            authorization,
        }
    }
}
