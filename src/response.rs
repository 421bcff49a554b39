//! Wire payload types and validation of completed exchanges.

use crate::client::HttpResponse;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One row as returned by the API.
///
/// `id` and `createdTime` are optional because update responses carry only
/// the field bag.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, rename = "createdTime")]
    pub created_time: Option<DateTime<Utc>>,
}

/// One page of a listing response. A present `offset` cursor means more
/// rows exist and must be echoed back to fetch the next page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPayload {
    pub records: Vec<RecordPayload>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Validate a completed exchange.
///
/// Any 2xx status passes. A body parsing as `{"error": {"type", "message"}}`
/// becomes a structured [`Error::Api`]; a missing or unparsable body becomes
/// [`Error::Communication`] carrying the raw text. Failed exchanges are
/// never retried.
pub fn check(response: &HttpResponse) -> Result<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }

    match serde_json::from_slice::<ErrorPayload>(&response.body) {
        Ok(payload) => Err(Error::Api {
            status: response.status,
            kind: payload.error.kind,
            message: payload.error.message,
        }),
        Err(_) => Err(Error::Communication {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}

/// Validate an exchange and deserialize its body
pub fn parse<T>(response: &HttpResponse) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    check(response)?;
    Ok(serde_json::from_slice(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_check_passes_2xx() {
        assert!(check(&response(200, "{}")).is_ok());
        assert!(check(&response(202, "")).is_ok());
    }

    #[test]
    fn test_check_maps_structured_error() {
        let body = r#"{"error": {"type": "TABLE_NOT_FOUND", "message": "Could not find table"}}"#;

        match check(&response(404, body)) {
            Err(Error::Api {
                status,
                kind,
                message,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(kind, "TABLE_NOT_FOUND");
                assert_eq!(message, "Could not find table");
            }
            other => panic!("expected Error::Api, got {:?}", other),
        }
    }

    #[test]
    fn test_check_maps_empty_body_to_communication_error() {
        match check(&response(500, "")) {
            Err(Error::Communication { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "");
            }
            other => panic!("expected Error::Communication, got {:?}", other),
        }
    }

    #[test]
    fn test_check_maps_unparsable_body_to_communication_error() {
        match check(&response(502, "<html>bad gateway</html>")) {
            Err(Error::Communication { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "<html>bad gateway</html>");
            }
            other => panic!("expected Error::Communication, got {:?}", other),
        }
    }

    #[test]
    fn test_record_payload_without_created_time() {
        let payload: RecordPayload =
            serde_json::from_str(r#"{"id": "rec1", "fields": {"Name": "walrus"}}"#).unwrap();

        assert_eq!(payload.id.as_deref(), Some("rec1"));
        assert!(payload.created_time.is_none());
        assert_eq!(payload.fields["Name"], "walrus");
    }

    #[test]
    fn test_list_payload_with_offset() {
        let payload: ListPayload = serde_json::from_str(
            r#"{"records": [{"id": "rec1", "fields": {}}], "offset": "abc"}"#,
        )
        .unwrap();

        assert_eq!(payload.records.len(), 1);
        assert_eq!(payload.offset.as_deref(), Some("abc"));
    }
}
