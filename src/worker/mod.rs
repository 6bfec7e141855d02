//! Prediction Worker — turns queued vessels into delay predictions
//!
//! Periodic batch over pending queue items. Per item: recent-prediction
//! dedup check, trailing-history fetch, movement and traffic statistics,
//! prompt composition, one external reasoning call, defensive parse, then
//! persist-and-complete. Failures are isolated per item and leave the item
//! pending — at-least-once, never a prediction written from garbage.
//!
//! Items are processed sequentially, so at most one external call is in
//! flight and no item is ever processed twice concurrently within a
//! process. Items whose vessel keeps yielding nothing expire after an
//! attempt budget instead of pending forever.

use crate::analysis::movement::{analyze_movement, HISTORY_WINDOW_HOURS};
use crate::analysis::traffic::{traffic_snapshot, DEFAULT_TRAFFIC_RADIUS_NM, TRAFFIC_WINDOW_MINUTES};
use crate::reasoning::{parse_prediction, prompt, ReasoningBackend};
use crate::store::VesselStore;
use crate::types::{BoundingBox, PredictionRecord, QueueItem};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Window within which an existing prediction suppresses a new one (seconds).
pub const RECENT_PREDICTION_WINDOW_SECS: i64 = 3600;

/// Worker passes after which an unprocessable item is expired.
pub const DEFAULT_ATTEMPT_BUDGET: u32 = 12;

/// Outcome tallies for one batch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub completed: usize,
    pub skipped: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Per-item outcome.
#[derive(Debug, PartialEq, Eq)]
enum ItemOutcome {
    Completed,
    /// A sufficiently recent prediction already covers this vessel.
    SkippedRecentPrediction,
    /// No trailing history yet — left pending for a later pass.
    SkippedNoHistory,
    /// Attempt budget exhausted.
    Expired,
    /// Endpoint, parse, or store failure — left pending for retry.
    Failed,
}

/// Batch prediction worker over the queue.
pub struct PredictionWorker<S: VesselStore, B: ReasoningBackend> {
    store: Arc<S>,
    backend: Arc<B>,
    history_window: Duration,
    traffic_radius_nm: f64,
    attempt_budget: u32,
}

impl<S: VesselStore, B: ReasoningBackend> PredictionWorker<S, B> {
    pub fn new(store: Arc<S>, backend: Arc<B>) -> Self {
        Self {
            store,
            backend,
            history_window: Duration::hours(HISTORY_WINDOW_HOURS),
            traffic_radius_nm: DEFAULT_TRAFFIC_RADIUS_NM,
            attempt_budget: DEFAULT_ATTEMPT_BUDGET,
        }
    }

    /// Override the trailing history window.
    pub fn with_history_window(mut self, window: Duration) -> Self {
        self.history_window = window;
        self
    }

    /// Override the traffic bounding-box radius (nautical miles).
    pub fn with_traffic_radius_nm(mut self, radius_nm: f64) -> Self {
        self.traffic_radius_nm = radius_nm;
        self
    }

    /// Override the attempt budget before unprocessable items expire.
    pub fn with_attempt_budget(mut self, budget: u32) -> Self {
        self.attempt_budget = budget;
        self
    }

    /// Process every pending item once. Never aborts the batch on a
    /// per-item failure.
    pub async fn run_batch(&self) -> BatchStats {
        let mut stats = BatchStats::default();

        let items = match self.store.pending_items() {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to list pending queue items");
                return stats;
            }
        };

        for item in items {
            stats.processed += 1;
            match self.process_item(&item).await {
                ItemOutcome::Completed => stats.completed += 1,
                ItemOutcome::SkippedRecentPrediction | ItemOutcome::SkippedNoHistory => {
                    stats.skipped += 1;
                }
                ItemOutcome::Expired => stats.expired += 1,
                ItemOutcome::Failed => stats.failed += 1,
            }
        }

        if stats.processed > 0 {
            info!(
                processed = stats.processed,
                completed = stats.completed,
                skipped = stats.skipped,
                expired = stats.expired,
                failed = stats.failed,
                "Prediction batch finished"
            );
        }
        stats
    }

    /// Run batches on a fixed interval until cancelled.
    pub async fn run(&self, interval: std::time::Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        info!(interval_secs = interval.as_secs(), "Prediction worker starting");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Prediction worker shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_batch().await;
                }
            }
        }
    }

    async fn process_item(&self, item: &QueueItem) -> ItemOutcome {
        let now = Utc::now();

        // Dedup safety net for the trigger's duplicate enqueues: a fresh
        // prediction for this vessel suppresses the call entirely.
        let dedup_since = now - Duration::seconds(RECENT_PREDICTION_WINDOW_SECS);
        match self.store.latest_prediction(item.mmsi, dedup_since) {
            Ok(Some(_)) => {
                debug!(item_id = %item.id, mmsi = item.mmsi, "Recent prediction exists, skipping");
                return self.bump_or_expire(item, ItemOutcome::SkippedRecentPrediction);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Prediction lookup failed");
                return ItemOutcome::Failed;
            }
        }

        let history = match self
            .store
            .vessel_history(item.mmsi, now - self.history_window)
        {
            Ok(history) => history,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "History fetch failed");
                return ItemOutcome::Failed;
            }
        };

        let Some(stats) = analyze_movement(&history) else {
            debug!(item_id = %item.id, mmsi = item.mmsi, "No position history yet");
            return self.bump_or_expire(item, ItemOutcome::SkippedNoHistory);
        };

        // Traffic is evaluated around the frozen enqueue-time snapshot,
        // not the vessel's current position.
        let snapshot = &item.position_snapshot;
        let bbox = BoundingBox::around(
            snapshot.latitude,
            snapshot.longitude,
            self.traffic_radius_nm,
        );
        let traffic_since = now - Duration::minutes(TRAFFIC_WINDOW_MINUTES);
        let nearby = match self.store.positions_within(&bbox, traffic_since) {
            Ok(nearby) => nearby,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Traffic window fetch failed");
                return ItemOutcome::Failed;
            }
        };
        let traffic = traffic_snapshot(item.mmsi, &nearby);

        let request = prompt::build_prompt(item, &stats, &traffic);
        let response = match self.backend.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    item_id = %item.id,
                    mmsi = item.mmsi,
                    backend = self.backend.backend_name(),
                    error = %e,
                    "Reasoning request failed, item stays pending"
                );
                return ItemOutcome::Failed;
            }
        };

        let parsed = match parse_prediction(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    item_id = %item.id,
                    mmsi = item.mmsi,
                    error = %e,
                    "Unusable reasoning response, item stays pending"
                );
                return ItemOutcome::Failed;
            }
        };

        let record = PredictionRecord {
            mmsi: item.mmsi,
            vessel_name: item.vessel_name.clone(),
            predicted_delay_minutes: parsed.delay_minutes,
            confidence_score: parsed.confidence,
            reasoning: parsed.reasoning,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert_prediction(&record) {
            warn!(item_id = %item.id, error = %e, "Prediction save failed, item stays pending");
            return ItemOutcome::Failed;
        }

        if let Err(e) = self.store.mark_completed(&item.id) {
            // The prediction exists; the dedup check absorbs the re-run.
            warn!(item_id = %item.id, error = %e, "Completion mark failed");
            return ItemOutcome::Failed;
        }

        info!(
            mmsi = item.mmsi,
            delay_minutes = record.predicted_delay_minutes,
            confidence = record.confidence_score,
            "Delay prediction saved"
        );
        ItemOutcome::Completed
    }

    /// Record a skipped pass; expire the item once the budget runs out so
    /// unprocessable items do not pend forever.
    fn bump_or_expire(&self, item: &QueueItem, skip_outcome: ItemOutcome) -> ItemOutcome {
        match self.store.record_attempt(&item.id) {
            Ok(attempts) if attempts >= self.attempt_budget => {
                match self.store.mark_expired(&item.id) {
                    Ok(()) => {
                        info!(
                            item_id = %item.id,
                            mmsi = item.mmsi,
                            attempts,
                            "Queue item expired after attempt budget"
                        );
                        ItemOutcome::Expired
                    }
                    Err(e) => {
                        warn!(item_id = %item.id, error = %e, "Expiry mark failed");
                        ItemOutcome::Failed
                    }
                }
            }
            Ok(_) => skip_outcome,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Attempt bookkeeping failed");
                skip_outcome
            }
        }
    }
}
