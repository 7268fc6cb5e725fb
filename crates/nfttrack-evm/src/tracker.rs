//! The tracker loop: backfill once, then poll on a fixed timer.
//!
//! # Phase 1: BACKFILL
//! Look up the head, fetch `[start_block, head]` (optionally in chunks),
//! decode and upsert every log in order, then set the cursor to the head.
//!
//! # Phase 2: POLLING
//! On every tick, fetch `[cursor + 1, head]`, process it the same way, then
//! advance the cursor to the new head. A failed head lookup or log fetch
//! leaves the cursor where it was so the next tick retries the wider range.
//! A single bad log is reported and skipped; it never aborts the batch.
//!
//! Ticks come from `tokio::time::interval` with `MissedTickBehavior::Skip`:
//! a tick that fires while a poll is still running is buffered once, every
//! further tick in the same busy period is dropped, and polls never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use nfttrack_core::cursor::TrackingCursor;
use nfttrack_core::error::TrackerError;
use nfttrack_core::ownership::apply_transfer;
use nfttrack_core::query::{LogQuery, QueryPlanner};
use nfttrack_core::store::OwnershipStore;
use nfttrack_core::tracker::{TrackerConfig, TrackerState};

use crate::decoder::TransferDecoder;
use crate::fetcher::{EventSource, RawLog};

/// Counters for one processed batch of logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Logs returned by the source.
    pub fetched: usize,
    /// Logs decoded and upserted.
    pub applied: usize,
    /// Logs reported and dropped (removed, undecodable, out of range, store failure).
    pub skipped: usize,
    /// The source returned logs out of `(block, log index)` order.
    pub reordered: bool,
}

impl BatchReport {
    fn merge(&mut self, other: BatchReport) {
        self.fetched += other.fetched;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.reordered |= other.reordered;
    }
}

/// Result of a single poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No new blocks since the cursor.
    Empty,
    /// The range was fetched and processed; the cursor moved to `head`.
    Processed { head: u64, report: BatchReport },
    /// Head lookup or log fetch failed; the cursor did not move.
    FetchFailed,
}

/// Drives the transfer pipeline for one set of contracts.
pub struct TransferTracker<S: EventSource> {
    config: TrackerConfig,
    source: S,
    store: Arc<dyn OwnershipStore>,
    decoder: Option<TransferDecoder>,
    planner: Option<QueryPlanner>,
    cursor: TrackingCursor,
    state: TrackerState,
}

impl<S: EventSource> TransferTracker<S> {
    pub fn new(config: TrackerConfig, source: S, store: Arc<dyn OwnershipStore>) -> Self {
        let cursor = TrackingCursor::new(config.start_block.saturating_sub(1));
        Self {
            config,
            source,
            store,
            decoder: None,
            planner: None,
            cursor,
            state: TrackerState::Initializing,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn cursor(&self) -> TrackingCursor {
        self.cursor
    }

    /// Validate the configuration and build the decoder and query planner.
    pub fn initialize(&mut self) -> Result<(), TrackerError> {
        self.state = TrackerState::Initializing;
        self.config.validate()?;

        let mut addresses = Vec::with_capacity(self.config.contract_addresses.len());
        for address in &self.config.contract_addresses {
            if !addresses.contains(address) {
                addresses.push(*address);
            }
        }

        let decoder = TransferDecoder::new()?;
        let planner = QueryPlanner::new(addresses, decoder.topic0());

        tracing::info!(
            contracts = planner.addresses().len(),
            topic0 = %format!("{:#x}", planner.topic0()),
            start_block = self.config.start_block,
            "tracker initialized"
        );

        self.decoder = Some(decoder);
        self.planner = Some(planner);
        Ok(())
    }

    fn planner(&self) -> Result<&QueryPlanner, TrackerError> {
        self.planner
            .as_ref()
            .ok_or_else(|| TrackerError::Config("tracker is not initialized".into()))
    }

    /// Process every log from `start_block` to the current head.
    ///
    /// Any head or fetch failure here is returned to the caller.
    pub async fn backfill(&mut self) -> Result<BatchReport, TrackerError> {
        self.state = TrackerState::Backfilling;
        let head = self.source.current_head().await?;
        let start = self.config.start_block;

        let Some(query) = self.planner()?.plan_backfill(start, head) else {
            tracing::info!(start, head, "backfill range is empty");
            self.cursor.advance(head);
            self.state = TrackerState::Polling;
            return Ok(BatchReport::default());
        };

        let queries = match self.config.backfill_chunk_size {
            Some(size) => query.chunks(size),
            None => vec![query],
        };

        tracing::info!(from = start, to = head, queries = queries.len(), "starting backfill");

        let mut report = BatchReport::default();
        for q in &queries {
            let logs = self.source.fetch_logs(q).await?;
            let batch = self.process_logs(q, logs).await?;
            tracing::debug!(
                from = q.from_block,
                to = q.to_block,
                fetched = batch.fetched,
                "backfill chunk complete"
            );
            report.merge(batch);
        }

        self.cursor.advance(head);
        self.state = TrackerState::Polling;
        tracing::info!(
            at = head,
            fetched = report.fetched,
            applied = report.applied,
            skipped = report.skipped,
            "backfill complete"
        );
        Ok(report)
    }

    /// Run one poll tick.
    ///
    /// Only fatal errors are returned; a transient fetch failure is logged and
    /// reported as [`TickOutcome::FetchFailed`].
    pub async fn poll_once(&mut self) -> Result<TickOutcome, TrackerError> {
        let head = match self.source.current_head().await {
            Ok(head) => head,
            Err(e) => return self.fetch_failed(e, "head lookup failed"),
        };

        let Some(query) = self.planner()?.plan_poll(self.cursor.block_number, head) else {
            tracing::debug!(cursor = self.cursor.block_number, head, "no new blocks");
            return Ok(TickOutcome::Empty);
        };

        let logs = match self.source.fetch_logs(&query).await {
            Ok(logs) => logs,
            Err(e) => return self.fetch_failed(e, "log fetch failed"),
        };

        let report = self.process_logs(&query, logs).await?;
        self.cursor.advance(head);

        tracing::info!(
            from = query.from_block,
            to = head,
            fetched = report.fetched,
            applied = report.applied,
            skipped = report.skipped,
            "poll complete"
        );
        Ok(TickOutcome::Processed { head, report })
    }

    fn fetch_failed(&self, err: TrackerError, what: &str) -> Result<TickOutcome, TrackerError> {
        if err.is_fatal() {
            return Err(err);
        }
        tracing::warn!(cursor = self.cursor.block_number, error = %err, "{what}, will retry next tick");
        Ok(TickOutcome::FetchFailed)
    }

    /// Decode and upsert `logs` in `(block, log index)` order.
    ///
    /// Per-log failures (decode, range, store) are logged and counted; they
    /// never fail the batch. Any other error from the store is returned.
    pub async fn process_logs(
        &self,
        query: &LogQuery,
        mut logs: Vec<RawLog>,
    ) -> Result<BatchReport, TrackerError> {
        let decoder = self
            .decoder
            .as_ref()
            .ok_or_else(|| TrackerError::Config("tracker is not initialized".into()))?;

        let mut report = BatchReport {
            fetched: logs.len(),
            ..Default::default()
        };

        if !logs.windows(2).all(|w| w[0].position() <= w[1].position()) {
            tracing::warn!(
                from = query.from_block,
                to = query.to_block,
                "source returned logs out of order, re-sorting"
            );
            logs.sort_by_key(RawLog::position);
            report.reordered = true;
        }

        for log in &logs {
            if log.is_removed() {
                tracing::warn!(tx = %log.tx_hash, block = %log.block_number, "skipping removed log");
                report.skipped += 1;
                continue;
            }

            if let Some(block) = log.block_number_u64() {
                if !query.contains_block(block) {
                    tracing::warn!(block, from = query.from_block, to = query.to_block, "log outside query range");
                }
            }

            let fact = match decoder.decode(log) {
                Ok(fact) => fact,
                Err(e) => {
                    tracing::warn!(
                        tx = %log.tx_hash,
                        block = %log.block_number,
                        log_index = %log.log_index,
                        error = %e,
                        "skipping undecodable log"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match apply_transfer(self.store.as_ref(), &fact, Utc::now()).await {
                Ok(_) => report.applied += 1,
                Err(e) if !e.is_per_log() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        tx = %format!("{:#x}", fact.tx_hash),
                        token_id = %fact.token_id,
                        block = fact.block_number,
                        error = %e,
                        "skipping transfer"
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run the full state machine until `cancel` fires or a fatal error occurs.
    ///
    /// Cancellation is checked between ticks; a call already in flight runs
    /// to completion first. The state is `Stopped` when this returns.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), TrackerError> {
        let result = self.run_phases(&cancel).await;
        self.state = TrackerState::Stopped;
        match result {
            Err(TrackerError::Cancelled) => {
                tracing::info!(cursor = self.cursor.block_number, "tracker cancelled");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, cursor = self.cursor.block_number, "tracker stopped");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn run_phases(&mut self, cancel: &CancellationToken) -> Result<(), TrackerError> {
        self.initialize()?;
        if cancel.is_cancelled() {
            return Err(TrackerError::Cancelled);
        }

        self.backfill().await?;
        if cancel.is_cancelled() {
            return Err(TrackerError::Cancelled);
        }

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval = %describe_interval(period),
            cursor = self.cursor.block_number,
            "polling"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TrackerError::Cancelled),
                _ = ticker.tick() => {
                    self.poll_once().await?;
                }
            }
        }
    }
}

/// Period between ticks, for logging.
pub fn describe_interval(period: Duration) -> String {
    let secs = period.as_secs();
    if secs % 3600 == 0 && secs > 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 && secs > 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", period.as_secs_f64())
    }
}
