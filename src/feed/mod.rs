//! Live timing feed client
//!
//! The transport delivers one raw JSON payload per topic update over an mpsc
//! channel. It performs no reconnection of its own: a dropped connection
//! surfaces as a single `Disconnected` event and the lifecycle controller
//! decides whether to dial again.

pub mod messages;
pub mod signalr;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Events emitted by a feed connection
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Subscription established, initial snapshot follows as normal messages
    Connected,
    /// One raw topic update
    Message { topic: String, payload: Value },
    /// Connection lost; carries the underlying cause as context
    Disconnected { reason: String },
}

#[derive(Debug)]
pub enum FeedError {
    Negotiate(String),
    Connect(String),
    Timeout,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Negotiate(msg) => write!(f, "Negotiate error: {}", msg),
            FeedError::Connect(msg) => write!(f, "Connect error: {}", msg),
            FeedError::Timeout => write!(f, "Connect timed out"),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Negotiate(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::Connect(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Connect(err.to_string())
    }
}

/// Handle to a running feed connection
///
/// `stop` joins the reader task, so no events are delivered after it returns.
pub struct FeedHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn new(shutdown: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { shutdown, task }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Transport seam for the lifecycle controller
///
/// The production implementation is [`signalr::SignalRConnector`]; tests
/// substitute a scripted connector.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Open a connection; events flow into `tx` until the connection drops
    /// or the returned handle is stopped. Idempotence is the caller's
    /// concern: the controller holds at most one handle at a time.
    async fn open(&self, tx: mpsc::Sender<FeedEvent>) -> Result<FeedHandle, FeedError>;
}
