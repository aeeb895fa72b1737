//! In-memory [`RowStore`] for tests.
//!
//! Like the real sheet it offers no atomic read-modify-write. An optional
//! barrier holds every writer until all of them have arrived, which forces
//! concurrent reconciliations to read the same counter value.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailtrack_core::{Error, Identity, Result};
use parking_lot::Mutex;
use tokio::sync::Barrier;

use super::RowStore;
use crate::layout::{CellRef, CellUpdate, SheetLayout};

#[derive(Default)]
pub struct MemoryRowStore {
    layout: SheetLayout,
    rows: Mutex<Vec<Vec<String>>>,
    failures: Mutex<VecDeque<Error>>,
    write_gate: Option<Arc<Barrier>>,
    write_delay: Option<Duration>,
    yields: Vec<u8>,
    calls: AtomicUsize,
    writes: AtomicUsize,
    appends: AtomicUsize,
}

impl MemoryRowStore {
    pub fn new(layout: SheetLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Add a row with `email` and the given `(column, value)` cells.
    pub fn with_row(self, email: &str, cells: &[(crate::layout::Column, &str)]) -> Self {
        let mut row = vec![String::new(); self.layout.width as usize];
        row[self.layout.email.index()] = email.to_string();
        for (column, value) in cells {
            row[column.index()] = value.to_string();
        }
        self.rows.lock().push(row);
        self
    }

    /// Hold each `batch_write` until `writers` of them are waiting.
    pub fn with_write_gate(mut self, writers: usize) -> Self {
        self.write_gate = Some(Arc::new(Barrier::new(writers)));
        self
    }

    /// Make every `batch_write` take this long before applying.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Yield to the scheduler `yields[call % len]` times before each call.
    pub fn with_yields(mut self, yields: Vec<u8>) -> Self {
        self.yields = yields;
        self
    }

    /// Queue errors returned by the next `find_row` calls, one per call.
    pub fn fail_next(&self, error: Error) {
        self.failures.lock().push_back(error);
    }

    pub fn cell(&self, row: u32, column: crate::layout::Column) -> String {
        self.rows
            .lock()
            .get(row as usize - 1)
            .and_then(|r| r.get(column.index()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    async fn jitter(&self) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.yields.is_empty() {
            return;
        }
        for _ in 0..self.yields[call % self.yields.len()] {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn find_row(&self, identity: &Identity) -> Result<Option<u32>> {
        self.jitter().await;
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let email = self.layout.email.index();
        Ok(self
            .rows
            .lock()
            .iter()
            .position(|row| row.get(email).is_some_and(|cell| identity.matches(cell)))
            .map(|i| i as u32 + 1))
    }

    async fn read_cell(&self, cell: &CellRef) -> Result<Option<String>> {
        self.jitter().await;
        let value = self.cell(cell.row, cell.column);
        Ok((!value.is_empty()).then_some(value))
    }

    async fn batch_write(&self, updates: &[CellUpdate], timeout: Duration) -> Result<()> {
        self.jitter().await;
        if let Some(gate) = &self.write_gate {
            gate.wait().await;
        }
        if let Some(delay) = self.write_delay {
            tokio::time::timeout(timeout, tokio::time::sleep(delay))
                .await
                .map_err(|_| Error::Timeout(timeout))?;
        }

        let mut rows = self.rows.lock();
        for update in updates {
            let Some(row) = rows.get_mut(update.cell.row as usize - 1) else {
                return Err(Error::transport(Some(400), "row out of range"));
            };
            if let Some(slot) = row.get_mut(update.cell.column.index()) {
                *slot = update.value.clone();
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        self.jitter().await;
        self.rows.lock().push(values);
        self.appends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
