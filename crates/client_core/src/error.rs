use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid websocket url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("connection manager has been shut down")]
    ShutDown,
}
