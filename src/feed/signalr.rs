//! SignalR client for the F1 live timing feed
//!
//! Classic (ASP.NET) SignalR over websockets: an HTTPS negotiate handshake
//! yields a connection token, the websocket connects with that token and a
//! `Subscribe` hub call registers the topic list. The subscribe reply carries
//! a full per-topic snapshot; subsequent updates arrive as `feed` hub
//! messages of the form `[topic, payload, timestamp]`.

use super::messages::SUBSCRIBED_TOPICS;
use super::{FeedConnector, FeedError, FeedEvent, FeedHandle};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{ACCEPT_ENCODING, COOKIE, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::connect_async;
use url::Url;

const HUB_NAME: &str = "Streaming";
const CLIENT_PROTOCOL: &str = "1.5";
const CONNECTION_DATA: &str = r#"[{"name":"Streaming"}]"#;
const SUBSCRIBE_INVOCATION_ID: &str = "1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// The live timing servers reject unknown user agents
const FEED_USER_AGENT: &str = "BestHTTP";

#[derive(Debug, Deserialize)]
struct NegotiateResponse {
    #[serde(rename = "ConnectionToken")]
    connection_token: String,
}

pub struct SignalRConnector {
    http: reqwest::Client,
    base_url: String,
}

impl SignalRConnector {
    pub fn new(base_url: &str) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .user_agent(FEED_USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| FeedError::Negotiate(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Negotiate handshake: returns the connection token and any cookies the
    /// server set (the websocket connect must replay them).
    async fn negotiate(&self) -> Result<(String, Option<String>), FeedError> {
        let url = Url::parse_with_params(
            &format!("{}/negotiate", self.base_url),
            &[
                ("connectionData", CONNECTION_DATA),
                ("clientProtocol", CLIENT_PROTOCOL),
            ],
        )?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Negotiate(format!(
                "negotiate returned {}",
                response.status()
            )));
        }

        let cookies: Vec<String> = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(|v| v.to_string())
            .collect();
        let cookie_header = if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        };

        let negotiate: NegotiateResponse = response.json().await?;
        Ok((negotiate.connection_token, cookie_header))
    }

    fn connect_url(&self, connection_token: &str) -> Result<Url, FeedError> {
        let mut url = Url::parse(&format!("{}/connect", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("transport", "webSockets")
            .append_pair("connectionToken", connection_token)
            .append_pair("connectionData", CONNECTION_DATA)
            .append_pair("clientProtocol", CLIENT_PROTOCOL);

        let ws_scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        url.set_scheme(ws_scheme)
            .map_err(|_| FeedError::Connect("invalid feed url scheme".to_string()))?;
        Ok(url)
    }

    async fn dial(&self, tx: mpsc::Sender<FeedEvent>) -> Result<FeedHandle, FeedError> {
        log::info!("Negotiating SignalR connection to {}", self.base_url);
        let (token, cookie) = self.negotiate().await?;

        let url = self.connect_url(&token)?;
        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(USER_AGENT, FEED_USER_AGENT.parse().expect("static header"));
        headers.insert(
            ACCEPT_ENCODING,
            "gzip, identity".parse().expect("static header"),
        );
        if let Some(cookie) = cookie {
            if let Ok(value) = cookie.parse() {
                headers.insert(COOKIE, value);
            }
        }

        let (ws_stream, _) = connect_async(request).await?;
        log::info!("SignalR websocket connected");

        let (mut write, mut read) = ws_stream.split();

        // Register interest in the topic set; the reply is the full snapshot
        let subscribe = json!({
            "H": HUB_NAME,
            "M": "Subscribe",
            "A": [SUBSCRIBED_TOPICS],
            "I": SUBSCRIBE_INVOCATION_ID,
        });
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .map_err(FeedError::from)?;

        let _ = tx.send(FeedEvent::Connected).await;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        let _ = write.send(Message::Close(None)).await;
                        // Requested stop: no disconnect event
                        return;
                    }
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            dispatch_frame(&text, &tx).await;
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = write.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break format!("closed by server: {:?}", frame);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break format!("socket error: {}", e),
                        None => break "stream ended".to_string(),
                    }
                }
            };
            let _ = tx.send(FeedEvent::Disconnected { reason }).await;
        });

        Ok(FeedHandle::new(shutdown_tx, task))
    }
}

#[async_trait]
impl FeedConnector for SignalRConnector {
    async fn open(&self, tx: mpsc::Sender<FeedEvent>) -> Result<FeedHandle, FeedError> {
        match tokio::time::timeout(CONNECT_TIMEOUT, self.dial(tx)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout),
        }
    }
}

/// Parse one websocket text frame and forward topic updates
///
/// Malformed frames are dropped with a warning; a single bad message must
/// not terminate the connection.
async fn dispatch_frame(text: &str, tx: &mpsc::Sender<FeedEvent>) {
    if text.trim().is_empty() || text == "{}" {
        // Keepalive
        return;
    }

    let frame: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Dropping malformed feed frame: {}", e);
            return;
        }
    };

    // Subscribe reply: { "R": { topic: snapshot, ... }, "I": "1" }
    if frame.get("I").and_then(Value::as_str) == Some(SUBSCRIBE_INVOCATION_ID) {
        if let Some(snapshot) = frame.get("R").and_then(Value::as_object) {
            log::info!("Received initial snapshot ({} topics)", snapshot.len());
            for (topic, payload) in snapshot {
                if payload.is_null() {
                    continue;
                }
                let _ = tx
                    .send(FeedEvent::Message {
                        topic: topic.clone(),
                        payload: payload.clone(),
                    })
                    .await;
            }
        }
        return;
    }

    // Hub updates: { "M": [ { "H": "Streaming", "M": "feed", "A": [topic, payload, utc] } ] }
    let Some(updates) = frame.get("M").and_then(Value::as_array) else {
        return;
    };
    for update in updates {
        if update.get("M").and_then(Value::as_str) != Some("feed") {
            continue;
        }
        let Some(args) = update.get("A").and_then(Value::as_array) else {
            log::warn!("Feed update without arguments, dropping");
            continue;
        };
        let (Some(topic), Some(payload)) = (args.first().and_then(Value::as_str), args.get(1))
        else {
            log::warn!("Feed update with unexpected argument shape, dropping");
            continue;
        };
        let _ = tx
            .send(FeedEvent::Message {
                topic: topic.to_string(),
                payload: payload.clone(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_feed_update() {
        let (tx, mut rx) = mpsc::channel(8);
        let frame = r#"{"C":"d-1","M":[{"H":"Streaming","M":"feed","A":["WeatherData",{"AirTemp":"24.5"},"2026-03-08T05:00:00Z"]}]}"#;

        dispatch_frame(frame, &tx).await;
        drop(tx);

        let event = rx.recv().await.expect("one event");
        match event {
            FeedEvent::Message { topic, payload } => {
                assert_eq!(topic, "WeatherData");
                assert_eq!(payload["AirTemp"], "24.5");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_subscribe_reply_fans_out_topics() {
        let (tx, mut rx) = mpsc::channel(8);
        let frame = r#"{"R":{"TrackStatus":{"Status":"1"},"LapCount":{"CurrentLap":3},"Heartbeat":null},"I":"1"}"#;

        dispatch_frame(frame, &tx).await;
        drop(tx);

        let mut topics = Vec::new();
        while let Some(event) = rx.recv().await {
            if let FeedEvent::Message { topic, .. } = event {
                topics.push(topic);
            }
        }
        topics.sort();
        // Null topics (Heartbeat) are skipped
        assert_eq!(topics, vec!["LapCount", "TrackStatus"]);
    }

    #[tokio::test]
    async fn test_dispatch_ignores_keepalive_and_malformed() {
        let (tx, mut rx) = mpsc::channel(8);

        dispatch_frame("{}", &tx).await;
        dispatch_frame("not json at all", &tx).await;
        dispatch_frame(r#"{"M":[{"H":"Streaming","M":"feed"}]}"#, &tx).await;
        drop(tx);

        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_connect_url_upgrades_scheme_and_encodes_token() {
        let connector = SignalRConnector::new("https://livetiming.formula1.com/signalr").unwrap();
        let url = connector.connect_url("abc+/=123").unwrap();

        assert_eq!(url.scheme(), "wss");
        assert!(url.as_str().contains("transport=webSockets"));
        assert!(!url.as_str().contains("abc+/=123"), "token must be encoded");
    }
}
