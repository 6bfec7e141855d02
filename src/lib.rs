//! Portwatch: Vessel Delay Operational Intelligence
//!
//! Ingestion-to-prediction pipeline for live vessel traffic:
//!
//! - **Feed**: resilient streaming consumer for position reports with a
//!   supervised reconnect loop and subscription handshake
//! - **Analysis**: movement statistics, traffic density, and the delay
//!   trigger that decides which vessels warrant a prediction
//! - **Store**: durable positions, prediction queue, and predictions
//!   behind a row-store trait seam
//! - **Reasoning**: external text-completion collaborator with defensive
//!   parsing of its semi-structured replies
//! - **Worker**: periodic batch that turns queued vessels into validated
//!   delay predictions

pub mod analysis;
pub mod config;
pub mod feed;
pub mod reasoning;
pub mod store;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use types::{
    BoundingBox, CongestionLevel, MovementStats, PositionRecord, PredictionRecord, QueueItem,
    QueueStatus, TrafficSnapshot,
};

// Re-export the pipeline surfaces
pub use feed::FeedConnector;
pub use reasoning::{HttpReasoningClient, ReasoningBackend};
pub use store::{SledStore, StoreError, VesselStore};
pub use worker::PredictionWorker;
