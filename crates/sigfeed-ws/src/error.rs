//! Push channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Push channel unreachable after {attempts} attempts")]
    GaveUp { attempts: u32 },

    #[error("Server closed push channel: code={code}, reason={reason}")]
    ServerClosed { code: u16, reason: String },

    #[error("Bad push endpoint: {0}")]
    BadEndpoint(String),

    #[error("No pong within heartbeat timeout")]
    PongTimeout,

    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

impl WsError {
    /// Label for the reconnect counter.
    pub fn reconnect_reason(&self) -> &'static str {
        match self {
            Self::PongTimeout => "heartbeat_timeout",
            Self::ServerClosed { .. } => "server_close",
            Self::Transport(_) => "transport",
            Self::GaveUp { .. } | Self::BadEndpoint(_) => "error",
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
