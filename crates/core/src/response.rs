//! Immutable response snapshots.
//!
//! A snapshot owns its body as a reference-counted `Bytes` buffer, so the
//! copy handed to the caller and the copy written to the cache share the
//! same bytes and neither consumption affects the other.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

use crate::Error;

/// A captured network or synthesized response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseSnapshot {
    /// Create a snapshot from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// `200 OK` with the given content type.
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::with_content_type(StatusCode::OK, content_type, body)
    }

    /// A response with a single `Content-Type` header.
    pub fn with_content_type(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self::new(status, headers, body)
    }

    /// A JSON response.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::with_content_type(status, "application/json", body)
    }

    /// A plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_content_type(status, "text/plain; charset=utf-8", body.into())
    }

    /// Split into two independent copies: one to return, one to store.
    pub fn tee(self) -> (Self, Self) {
        let copy = self.clone();
        (self, copy)
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `Content-Type` header, if readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body size in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Serialize headers for storage as a JSON array of `[name, value]` pairs.
    ///
    /// Non-UTF-8 header values are skipped.
    pub fn headers_json(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        serde_json::to_string(&pairs).unwrap_or_else(|_| "[]".into())
    }

    /// Rebuild a snapshot from its stored representation.
    pub fn from_stored(status: u16, headers_json: &str, body: Vec<u8>) -> Result<Self, Error> {
        let status = StatusCode::from_u16(status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let pairs: Vec<(String, String)> =
            serde_json::from_str(headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let value = HeaderValue::from_str(&value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(Self { status, headers, body: Bytes::from(body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_shares_body() {
        let original = ResponseSnapshot::ok("text/css", "body { color: #333 }");
        let (returned, stored) = original.tee();
        assert_eq!(returned, stored);
        assert_eq!(returned.body.as_ptr(), stored.body.as_ptr());
    }

    #[test]
    fn test_json_is_compact() {
        let resp = ResponseSnapshot::json(StatusCode::SERVICE_UNAVAILABLE, &serde_json::json!({ "error": "x" }));
        assert_eq!(&resp.body[..], br#"{"error":"x"}"#);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_stored_headers_survive() {
        let mut resp = ResponseSnapshot::ok("text/html", "<h1>Denim</h1>");
        resp.headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        resp.headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let restored = ResponseSnapshot::from_stored(200, &resp.headers_json(), resp.body.to_vec()).unwrap();
        assert_eq!(restored.content_type(), Some("text/html"));
        assert_eq!(restored.headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(restored.body, resp.body);
    }

    #[test]
    fn test_from_stored_rejects_bad_status() {
        let result = ResponseSnapshot::from_stored(1000, "[]", Vec::new());
        assert!(matches!(result, Err(Error::CorruptEntry(_))));
    }
}
