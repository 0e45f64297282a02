mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{Holding, Id};

/// Storage trait for persisting holdings, partitioned by user.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// All holdings of a user, oldest first.
    async fn list_holdings(&self, user_id: &Id) -> Result<Vec<Holding>>;
    async fn get_holding(&self, user_id: &Id, id: &Id) -> Result<Option<Holding>>;
    /// Insert or replace a holding.
    async fn save_holding(&self, user_id: &Id, holding: &Holding) -> Result<()>;
    /// Returns false when the holding did not exist.
    async fn delete_holding(&self, user_id: &Id, id: &Id) -> Result<bool>;

    /// Check that the backing store is usable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn sort_holdings(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
