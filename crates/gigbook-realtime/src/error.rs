use thiserror::Error;

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),
    #[error("topic {topic} already has {limit} subscribers")]
    TopicFull { topic: String, limit: usize },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
