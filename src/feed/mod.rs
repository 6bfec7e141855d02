//! Stream Connector — persistent position feed subscription
//!
//! Owns one logical subscription to the upstream feed for the process
//! lifetime. The transport is a persistent TCP connection carrying
//! newline-delimited JSON: one subscription handshake line out, then an
//! endless stream of envelope lines in.
//!
//! Connection lifecycle is an explicit state machine
//! (Disconnected -> Connecting -> Subscribed -> Receiving) under a
//! supervising loop that owns backoff and cancellation. Any
//! connection-level failure tears the session down and the supervisor
//! retries forever with a fixed 5 second backoff — feed disconnects are
//! routine, never fatal. Both the backoff sleep and an in-progress read
//! abort on the external stop signal.

pub mod decoder;

use crate::analysis::trigger;
use crate::config::FeedConfig;
use crate::store::VesselStore;
use crate::types::QueueItem;
use decoder::{FeedEnvelope, POSITION_REPORT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed delay between reconnect attempts (seconds). No growth, no cap on
/// attempts — the feed's disconnects are expected to be transient.
pub const RECONNECT_BACKOFF_SECS: u64 = 5;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Subscribed,
    Receiving,
}

/// Subscription handshake sent once per connection.
#[derive(Debug, Serialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    /// Pairs of [lat, lon] corners; worldwide is [[-90,-180],[90,180]]
    #[serde(rename = "BoundingBoxes")]
    pub bounding_boxes: Vec<Vec<[f64; 2]>>,
    #[serde(rename = "FiltersShipMMSI", skip_serializing_if = "Option::is_none")]
    pub filter_mmsi: Option<Vec<String>>,
    #[serde(rename = "FilterMessageTypes")]
    pub filter_message_types: Vec<String>,
}

impl SubscriptionRequest {
    fn from_config(config: &FeedConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            bounding_boxes: config.bounding_boxes.clone(),
            filter_mmsi: config.filter_mmsi.clone(),
            filter_message_types: vec![POSITION_REPORT_TYPE.to_string()],
        }
    }
}

/// How a feed session ended.
enum SessionEnd {
    /// External stop signal — the supervisor exits.
    Cancelled,
    /// Handshake failure, read error, or abrupt close — retried after backoff.
    ConnectionLost(anyhow::Error),
}

/// Persist a decoded position report and run delay triage on it.
///
/// Shared between the connector's receive path and tests. Persistence
/// failures are logged and swallowed — the live triage already saw the
/// record, only durability suffered.
pub fn ingest<S: VesselStore>(store: &S, record: &crate::types::PositionRecord) {
    if let Err(e) = store.insert_position(record) {
        warn!(mmsi = record.mmsi, error = %e, "Failed to persist position report");
    }

    if trigger::should_queue(record) {
        let item = QueueItem::new(record.clone());
        match store.enqueue(&item) {
            Ok(()) => info!(
                mmsi = record.mmsi,
                sog = ?record.speed_over_ground,
                item_id = %item.id,
                "Slow vessel queued for delay prediction"
            ),
            Err(e) => warn!(mmsi = record.mmsi, error = %e, "Failed to enqueue prediction item"),
        }
    }
}

/// Supervised feed connector.
pub struct FeedConnector<S: VesselStore> {
    config: FeedConfig,
    store: Arc<S>,
    cancel: CancellationToken,
    state: ConnectorState,
}

impl<S: VesselStore> FeedConnector<S> {
    pub fn new(config: FeedConfig, store: Arc<S>, cancel: CancellationToken) -> Self {
        Self {
            config,
            store,
            cancel,
            state: ConnectorState::Disconnected,
        }
    }

    /// Current lifecycle state (primarily for logging and tests).
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Run the supervising connect-subscribe-receive loop until cancelled.
    pub async fn run(mut self) {
        info!(
            host = %self.config.host,
            port = self.config.port,
            "Feed connector starting"
        );

        loop {
            match self.run_session().await {
                SessionEnd::Cancelled => {
                    info!("Feed connector shutdown signal received");
                    break;
                }
                SessionEnd::ConnectionLost(e) => {
                    warn!(
                        error = %e,
                        backoff_secs = RECONNECT_BACKOFF_SECS,
                        "Feed session ended, reconnecting"
                    );
                }
            }

            self.state = ConnectorState::Disconnected;

            // Fixed, cancellable backoff before the next attempt.
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Feed connector shutdown during backoff");
                    break;
                }
                _ = tokio::time::sleep(std::time::Duration::from_secs(RECONNECT_BACKOFF_SECS)) => {}
            }
        }
    }

    /// One connect-subscribe-receive session.
    async fn run_session(&mut self) -> SessionEnd {
        self.state = ConnectorState::Connecting;
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let mut stream = tokio::select! {
            _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
            result = TcpStream::connect(&addr) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    return SessionEnd::ConnectionLost(anyhow::anyhow!(
                        "connect to {addr} failed: {e}"
                    ))
                }
            },
        };

        // One handshake line, then the connection only flows inward.
        let subscription = SubscriptionRequest::from_config(&self.config);
        let mut handshake = match serde_json::to_string(&subscription) {
            Ok(json) => json,
            Err(e) => {
                return SessionEnd::ConnectionLost(anyhow::anyhow!(
                    "subscription serialization failed: {e}"
                ))
            }
        };
        handshake.push('\n');

        if let Err(e) = stream.write_all(handshake.as_bytes()).await {
            return SessionEnd::ConnectionLost(anyhow::anyhow!("subscription send failed: {e}"));
        }
        self.state = ConnectorState::Subscribed;
        info!(address = %addr, "Subscribed to position report feed");

        let mut reader = BufReader::new(stream);
        let mut line = String::with_capacity(2048);
        self.state = ConnectorState::Receiving;

        loop {
            line.clear();
            let bytes = tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
                result = reader.read_line(&mut line) => match result {
                    Ok(n) => n,
                    Err(e) => {
                        return SessionEnd::ConnectionLost(anyhow::anyhow!("feed read failed: {e}"))
                    }
                },
            };

            if bytes == 0 {
                return SessionEnd::ConnectionLost(anyhow::anyhow!("feed closed the connection"));
            }

            self.handle_line(line.trim());
        }
    }

    /// Decode and dispatch one inbound line. Malformed or foreign messages
    /// never terminate the receive loop.
    fn handle_line(&self, line: &str) {
        if line.is_empty() {
            return;
        }

        let envelope: FeedEnvelope = match serde_json::from_str(line) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "Malformed feed message, skipping");
                return;
            }
        };

        // Non-position message types are ignored without error.
        if envelope.message_type != POSITION_REPORT_TYPE {
            debug!(message_type = %envelope.message_type, "Ignoring message type");
            return;
        }

        let record = match decoder::decode(&envelope) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Discarding invalid position report");
                return;
            }
        };

        ingest(self.store.as_ref(), &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_serializes_with_feed_field_names() {
        let request = SubscriptionRequest {
            api_key: "key-123".to_string(),
            bounding_boxes: vec![vec![[-90.0, -180.0], [90.0, 180.0]]],
            filter_mmsi: None,
            filter_message_types: vec![POSITION_REPORT_TYPE.to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["APIKey"], "key-123");
        assert_eq!(json["BoundingBoxes"][0][0][0], -90.0);
        assert_eq!(json["FilterMessageTypes"][0], "PositionReport");
        assert!(json.get("FiltersShipMMSI").is_none());
    }

    #[test]
    fn mmsi_filter_is_included_when_configured() {
        let request = SubscriptionRequest {
            api_key: String::new(),
            bounding_boxes: vec![],
            filter_mmsi: Some(vec!["368207620".to_string()]),
            filter_message_types: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["FiltersShipMMSI"][0], "368207620");
    }
}
