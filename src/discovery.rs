//! Session discovery
//!
//! Polls the static SessionInfo endpoint to learn whether a trackable
//! session is live or has just completed. Fails soft: any network or shape
//! problem logs and returns `None`, the next poll tries again.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A session the discovery endpoint currently advertises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    pub session_key: i64,
    pub session_type: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    /// Archive status "Complete": the session is over and its archive is
    /// final. The trigger for draining and the post-session ingest.
    pub is_complete: bool,
}

impl DiscoveredSession {
    /// Season year, for the post-session ingest argument
    pub fn year(&self) -> Option<i32> {
        self.start_date.get(..4).and_then(|y| y.parse().ok())
    }
}

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover(&self) -> Option<DiscoveredSession>;
}

pub struct LiveTimingDiscovery {
    http: reqwest::Client,
    url: String,
}

impl LiveTimingDiscovery {
    pub fn new(url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("BestHTTP")
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl DiscoverySource for LiveTimingDiscovery {
    async fn discover(&self) -> Option<DiscoveredSession> {
        let response = match self.http.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Session discovery request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!("SessionInfo fetch returned {}", response.status());
            return None;
        }

        let info: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("SessionInfo response was not valid JSON: {}", e);
                return None;
            }
        };

        let session = parse_session_info(&info);
        if session.is_none() {
            log::info!("No session key in SessionInfo");
        }
        session
    }
}

/// Extract a session from the SessionInfo payload; `None` without a key
pub fn parse_session_info(info: &Value) -> Option<DiscoveredSession> {
    let session_key = info.get("Key")?.as_i64()?;

    let field = |name: &str| {
        info.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let is_complete = info
        .get("ArchiveStatus")
        .and_then(|a| a.get("Status"))
        .and_then(Value::as_str)
        == Some("Complete");

    Some(DiscoveredSession {
        session_key,
        session_type: field("Type"),
        name: field("Name"),
        start_date: field("StartDate"),
        end_date: field("EndDate"),
        is_complete,
    })
}
