//! The append-only breaking-news log.
//!
//! Appends are not version-guarded. They race control actions safely
//! because [`TurnPatch::Set`] never writes the news column, and the store
//! applies [`TurnPatch::PushNews`] as a single atomic append.

use std::sync::Arc;

use chrono::Utc;
use wts_types::{NewsItem, Turn};

use crate::store::{StoreError, TurnPatch, TurnStore};

/// Appends news items to the shared turn.
#[derive(Clone)]
pub struct BreakingNewsLog {
    store: Arc<dyn TurnStore>,
}

impl BreakingNewsLog {
    /// Create a news log over the given store.
    pub fn new(store: Arc<dyn TurnStore>) -> Self {
        Self { store }
    }

    /// Append `text`, stamped with the current turn, phase and time.
    ///
    /// Returns the turn as re-read after the append.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the read, the append or the re-read.
    pub async fn append_news(&self, text: impl Into<String> + Send) -> Result<Turn, StoreError> {
        let turn = self.store.get_current_turn().await?;
        let item = NewsItem {
            text: text.into(),
            timestamp: Utc::now(),
            turn_number: turn.turn_number,
            phase: turn.phase,
        };

        tracing::info!(
            turn_number = item.turn_number,
            phase = item.phase.get(),
            "Appending breaking news"
        );
        self.store
            .update_turn(TurnPatch::PushNews(item), false, None)
            .await?;

        self.store.get_current_turn().await
    }
}
