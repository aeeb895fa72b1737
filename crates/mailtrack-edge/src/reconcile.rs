//! Folding open/click events into engagement rows.
//!
//! Each event becomes a read-modify-write against the sheet: find the
//! recipient's row, read the counters that need it, then write everything in
//! one batch. The sheet has no atomic increment, so two opens that read the
//! same `open_count` both write `count + 1` and one of them is lost. That
//! undercount is accepted; see the `lost_update` tests below.

use std::sync::Arc;
use std::time::Duration;

use mailtrack_core::{Error, EventKind, Result, RetryError, RetryPolicy, TrackingEvent};

use crate::layout::{yes_no, CellUpdate, SheetLayout};
use crate::store::RowStore;

/// Open counts above this are logged as likely scanner traffic.
pub const SUSPICIOUS_OPEN_COUNT: u64 = 1000;

/// What happened to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The recipient had no row; a first-touch row was appended.
    Created,
    /// The recipient's row was updated.
    Updated { cells: usize },
    /// Every attempt failed and the event was discarded.
    Dropped { attempts: u32, error: String },
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated { .. } => "updated",
            Self::Dropped { .. } => "dropped",
        }
    }
}

/// Applies tracking events to the row-store with retries.
pub struct Reconciler {
    store: Arc<dyn RowStore>,
    layout: SheetLayout,
    policy: RetryPolicy,
    write_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RowStore>,
        layout: SheetLayout,
        policy: RetryPolicy,
        write_timeout: Duration,
    ) -> Self {
        Self {
            store,
            layout,
            policy,
            write_timeout,
        }
    }

    /// Record an event, retrying transient failures.
    ///
    /// Never fails: once the attempt budget is spent the event is logged and
    /// dropped.
    pub async fn record_event(&self, event: TrackingEvent) -> ReconcileOutcome {
        let event = &event;
        let result = self
            .policy
            .run(|attempt| self.attempt(event, attempt), Error::is_retryable)
            .await;

        let outcome = match result {
            Ok(outcome) => {
                tracing::info!(
                    email = %event.identity,
                    kind = %event.kind,
                    outcome = outcome.label(),
                    "tracking event recorded"
                );
                outcome
            }
            Err(RetryError { attempts, error }) => {
                tracing::error!(
                    email = %event.identity,
                    kind = %event.kind,
                    attempts,
                    error = %error,
                    "dropping tracking event"
                );
                ReconcileOutcome::Dropped {
                    attempts,
                    error: error.to_string(),
                }
            }
        };

        metrics::counter!(
            "tracking_events_total",
            "kind" => event.kind.as_str(),
            "outcome" => outcome.label()
        )
        .increment(1);
        outcome
    }

    async fn attempt(&self, event: &TrackingEvent, attempt: u32) -> Result<ReconcileOutcome> {
        let result = self.apply(event).await;
        if let Err(e) = &result {
            metrics::counter!("tracking_attempt_failures_total", "error" => e.kind()).increment(1);
            tracing::warn!(
                email = %event.identity,
                kind = %event.kind,
                attempt,
                error = %e,
                retryable = e.is_retryable(),
                "tracking attempt failed"
            );
        }
        result
    }

    async fn apply(&self, event: &TrackingEvent) -> Result<ReconcileOutcome> {
        let Some(row) = self.store.find_row(&event.identity).await? else {
            tracing::info!(email = %event.identity, "recipient not on sheet, appending row");
            self.store
                .append_row(self.layout.first_touch_row(event))
                .await?;
            return Ok(ReconcileOutcome::Created);
        };

        let updates = self.plan_updates(row, event).await?;
        self.store
            .batch_write(&updates, self.write_timeout)
            .await?;
        Ok(ReconcileOutcome::Updated {
            cells: updates.len(),
        })
    }

    /// Cells to write for `event` against existing row `row`.
    async fn plan_updates(&self, row: u32, event: &TrackingEvent) -> Result<Vec<CellUpdate>> {
        let layout = &self.layout;
        let now = event.timestamp();
        let mut updates = Vec::with_capacity(3);

        match event.kind {
            EventKind::Open => {
                updates.push(CellUpdate::new(layout.cell(layout.opened, row), yes_no(true)));

                let first_open = layout.cell(layout.first_open_at, row);
                if self.store.read_cell(&first_open).await?.is_none() {
                    updates.push(CellUpdate::new(first_open, now));
                }

                let count_cell = layout.cell(layout.open_count, row);
                let current = self.store.read_cell(&count_cell).await?;
                let count = parse_count(current.as_deref()) + 1;
                if count > SUSPICIOUS_OPEN_COUNT {
                    tracing::warn!(
                        email = %event.identity,
                        open_count = count,
                        "unusually high open count"
                    );
                }
                updates.push(CellUpdate::new(count_cell, count.to_string()));
            }
            EventKind::Click => {
                updates.push(CellUpdate::new(layout.cell(layout.clicked, row), yes_no(true)));

                let first_click = layout.cell(layout.first_click_at, row);
                if self.store.read_cell(&first_click).await?.is_none() {
                    updates.push(CellUpdate::new(first_click, now));
                }
            }
        }

        Ok(updates)
    }
}

/// Parse a stored open count by its leading integer.
///
/// Thousands separators and anything after the digits are ignored, so
/// `"1,234"`, `"3.0"` and `"12 opens"` all keep their value. Only a cell with
/// no leading digits counts as zero.
fn parse_count(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    let digits: Vec<u8> = unsigned
        .bytes()
        .take_while(|b| b.is_ascii_digit() || *b == b',')
        .filter(u8::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        tracing::warn!(value = %raw, "open count is not a number, treating as 0");
        return 0;
    }
    digits.iter().fold(0u64, |count, digit| {
        count.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
    })
}
