use super::{LocalCache, Menu, RemoteBackend};
use crate::error::UploadError;
use crate::strategy::SyncStrategy;
use async_trait::async_trait;
use offsync_queue::{MenuRefresh, SyncPayload};
use std::sync::Arc;
use tracing::debug;

/// Refreshes cached venue menus. Low priority, few retries: a stale menu
/// is refetched on the next refresh anyway.
pub struct MenuRefreshStrategy {
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<LocalCache>,
}

impl MenuRefreshStrategy {
    /// Creates the strategy.
    pub fn new(backend: Arc<dyn RemoteBackend>, cache: Arc<LocalCache>) -> Self {
        Self { backend, cache }
    }
}

/// Checks for a `YYYY-MM-DD` calendar date.
fn is_iso_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    if !date.is_ascii() || bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let number = |range: std::ops::Range<usize>| -> Option<u32> {
        let part = &date[range];
        if part.bytes().all(|b| b.is_ascii_digit()) {
            part.parse().ok()
        } else {
            None
        }
    };
    match (number(0..4), number(5..7), number(8..10)) {
        (Some(_), Some(month), Some(day)) => (1..=12).contains(&month) && (1..=31).contains(&day),
        _ => false,
    }
}

#[async_trait]
impl SyncStrategy for MenuRefreshStrategy {
    type Data = MenuRefresh;
    type Output = Menu;

    fn validate(&self, data: &MenuRefresh) -> bool {
        !data.venue_id.trim().is_empty() && is_iso_date(&data.date)
    }

    async fn upload(&self, data: &MenuRefresh, _payload: &SyncPayload) -> Result<Menu, UploadError> {
        Ok(self.backend.fetch_menu(&data.venue_id, &data.date).await?)
    }

    async fn on_success(&self, menu: Menu, _payload: &SyncPayload) {
        debug!(venue = %menu.venue_id, date = %menu.date, dishes = menu.dishes.len(), "menu cached");
        self.cache.store_menu(menu);
    }

    fn priority(&self) -> u8 {
        4
    }

    fn max_retries(&self) -> u32 {
        2
    }
}
