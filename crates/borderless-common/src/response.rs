use bytes::Bytes;
use serde_json::Value;

/// Decoded body of a successful call.
///
/// JSON is the default; a caller that sets an `Accept` header receives the
/// body untouched, which is how binary documents such as PDF receipts are
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body. An empty body decodes to `Value::Null`.
    Json(Value),
    /// Raw body bytes, exactly as received.
    Raw(Bytes),
}

impl ApiResponse {
    /// Borrows the JSON body, if this is a JSON response.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Takes the JSON body, if this is a JSON response.
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Takes the raw body, if this is a raw response.
    #[must_use]
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Json(_) => None,
        }
    }

    /// Whether the body was returned undecoded.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_accessors() {
        let json = ApiResponse::Json(json!({"id": 1}));
        assert_eq!(json.as_json(), Some(&json!({"id": 1})));
        assert!(!json.is_raw());
        assert!(json.clone().into_bytes().is_none());

        let raw = ApiResponse::Raw(Bytes::from_static(b"%PDF-1.7"));
        assert!(raw.is_raw());
        assert!(raw.as_json().is_none());
        assert_eq!(raw.into_bytes(), Some(Bytes::from_static(b"%PDF-1.7")));
    }
}
