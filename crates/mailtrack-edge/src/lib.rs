//! Mailtrack Edge - pixel and click tracking service.
//!
//! Serves the open pixel and click redirects embedded in campaign mail and
//! mirrors each genuine hit into the recipient's row of a spreadsheet.
//!
//! # Architecture
//!
//! - **Routes**: Pixel, click and status handlers. Responses never wait on
//!   the spreadsheet and never reveal whether tracking worked.
//! - **Reconciler**: Read-modify-write of engagement cells with retries.
//! - **RowStore**: Spreadsheet primitives, implemented over the Sheets REST API.
//! - **Token**: Service-account bearer tokens for the REST API.
//! - **BackgroundTasks**: Keeps reconciliations alive past their response and
//!   drains them at shutdown.

pub mod config;
mod cors;
mod error;
pub mod layout;
pub mod reconcile;
pub mod redirect;
mod routes;
mod state;
pub mod store;
#[cfg(test)]
mod stub;
pub mod tasks;
pub mod token;

pub use self::config::Config;
pub use self::error::EdgeError;
pub use self::reconcile::{ReconcileOutcome, Reconciler};
pub use self::redirect::RedirectTable;
pub use self::routes::{router, PIXEL_GIF};
pub use self::state::AppState;
pub use self::tasks::BackgroundTasks;
