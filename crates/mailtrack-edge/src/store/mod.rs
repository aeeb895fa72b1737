//! Row-store access.
//!
//! The reconciler only needs four primitives from the spreadsheet. Keeping
//! them behind [`RowStore`] lets the reconciliation logic run against an
//! in-memory sheet in tests.

use std::time::Duration;

use async_trait::async_trait;
use mailtrack_core::{Identity, Result};

use crate::layout::{CellRef, CellUpdate};

#[cfg(test)]
pub mod memory;
mod sheets;

pub use sheets::SheetsClient;

/// Minimal spreadsheet operations used by the reconciler.
///
/// None of these are atomic with respect to each other; the backing API has
/// no compare-and-swap.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// 1-based row of the first entry whose identity cell matches, ignoring
    /// case and surrounding whitespace.
    async fn find_row(&self, identity: &Identity) -> Result<Option<u32>>;

    /// Current value of a cell. Empty and out-of-range cells are `None`.
    async fn read_cell(&self, cell: &CellRef) -> Result<Option<String>>;

    /// Write several cells in one call, failing with
    /// [`mailtrack_core::Error::Timeout`] if `timeout` elapses first.
    async fn batch_write(&self, updates: &[CellUpdate], timeout: Duration) -> Result<()>;

    /// Append a row after the last populated one.
    async fn append_row(&self, values: Vec<String>) -> Result<()>;
}
