//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use mailtrack_core::RetryPolicy;

use crate::config::Config;
use crate::layout::SheetLayout;
use crate::reconcile::Reconciler;
use crate::redirect::RedirectTable;
use crate::store::{RowStore, SheetsClient};
use crate::tasks::BackgroundTasks;
use crate::token::{ServiceAccountTokens, TokenSource};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// State available to all request handlers.
///
/// Cheap to clone; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    /// Applies events to the row-store.
    pub reconciler: Arc<Reconciler>,

    /// Click redirect targets.
    pub redirects: Arc<RedirectTable>,

    /// Reconciliations still running after their response was sent.
    pub tasks: BackgroundTasks,
}

impl AppState {
    /// Wire the Sheets-backed reconciler from configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("mailtrack-edge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let layout = SheetLayout::default();
        let tokens: Arc<dyn TokenSource> = Arc::new(ServiceAccountTokens::new(
            config.service_account.clone(),
            http.clone(),
        ));
        let sheets = SheetsClient::new(
            http,
            tokens,
            &config.sheets_api_base,
            config.sheet_id.clone(),
            config.sheet_tab.clone(),
            layout.email,
        )?;

        Ok(Self::with_store(
            Arc::new(sheets),
            layout,
            config.redirects.clone(),
            config.retry,
            config.write_timeout,
        ))
    }

    /// Build state around any [`RowStore`].
    pub fn with_store(
        store: Arc<dyn RowStore>,
        layout: SheetLayout,
        redirects: RedirectTable,
        retry: RetryPolicy,
        write_timeout: Duration,
    ) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(store, layout, retry, write_timeout)),
            redirects: Arc::new(redirects),
            tasks: BackgroundTasks::new(),
        }
    }
}
