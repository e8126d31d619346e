use fwctl_common::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Unable to reach broker at {0}")]
    Unreachable(String),

    #[error("Publish to topic {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Bus unreachable: {0}")]
    BusUnreachable(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl From<BusError> for ControlError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Unreachable(address) => ControlError::BusUnreachable(address),
            BusError::Publish { .. } => ControlError::Publish(err.to_string()),
            BusError::Subscribe(reason) => ControlError::Subscribe(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
