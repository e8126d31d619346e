use thiserror::Error;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message has no schema tag")]
    MissingSchema,

    #[error("Unknown schema tag: {0}")]
    UnknownSchema(String),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Turns messages into bus payloads and back.
pub trait Codec: Send + Sync {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError>;
}

/// JSON framing: one object per message with a `schema` field naming its kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(message)?)
    }

    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        let schema = value
            .get("schema")
            .and_then(|s| s.as_str())
            .ok_or(CodecError::MissingSchema)?;
        if !Message::SCHEMAS.contains(&schema) {
            return Err(CodecError::UnknownSchema(schema.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StopTimeCommand;
    use crate::status::{JobState, JobStatus};
    use chrono::{DateTime, Utc};

    #[test]
    fn test_schema_tag_on_the_wire() {
        let msg = Message::JobStatus(JobStatus::new("job-1", JobState::Writing, Utc::now()));
        let bytes = JsonCodec.encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["schema"], "wrdn");
        assert_eq!(value["state"], "writing");
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_stop_command_fields() {
        let msg = Message::StopTime(StopTimeCommand {
            job_id: "job-1".to_string(),
            service_id: None,
            command_id: "cmd-1".to_string(),
            stop_time: DateTime::<Utc>::UNIX_EPOCH,
        });
        let bytes = JsonCodec.encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["schema"], "6s4t");
        assert_eq!(value["command_id"], "cmd-1");
        assert!(value.get("service_id").is_none());
    }

    #[test]
    fn test_unknown_schema() {
        let err = JsonCodec.decode(br#"{"schema":"f144","value":1}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownSchema(tag) if tag == "f144"));
    }

    #[test]
    fn test_missing_schema() {
        let err = JsonCodec.decode(br#"{"job_id":"job-1"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingSchema));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            JsonCodec.decode(b"not json").unwrap_err(),
            CodecError::Malformed(_)
        ));
        // Known tag, missing required fields
        assert!(matches!(
            JsonCodec.decode(br#"{"schema":"answ","job_id":"job-1"}"#).unwrap_err(),
            CodecError::Malformed(_)
        ));
    }
}
