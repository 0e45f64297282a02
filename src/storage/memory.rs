//! In-memory storage implementation for testing.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use super::{sort_holdings, Storage};
use crate::models::{Holding, Id};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    holdings: Mutex<HashMap<Id, HashMap<Id, Holding>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            holdings: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn list_holdings(&self, user_id: &Id) -> Result<Vec<Holding>> {
        let users = self.holdings.lock().await;
        let mut holdings: Vec<Holding> = users
            .get(user_id)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default();
        sort_holdings(&mut holdings);
        Ok(holdings)
    }

    async fn get_holding(&self, user_id: &Id, id: &Id) -> Result<Option<Holding>> {
        let users = self.holdings.lock().await;
        Ok(users.get(user_id).and_then(|h| h.get(id)).cloned())
    }

    async fn save_holding(&self, user_id: &Id, holding: &Holding) -> Result<()> {
        let mut users = self.holdings.lock().await;
        users
            .entry(user_id.clone())
            .or_default()
            .insert(holding.id.clone(), holding.clone());
        Ok(())
    }

    async fn delete_holding(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let mut users = self.holdings.lock().await;
        Ok(users
            .get_mut(user_id)
            .map(|h| h.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetClass;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_holdings_are_scoped_per_user() -> Result<()> {
        let storage = MemoryStorage::new();
        let alice = Id::from("alice");
        let bob = Id::from("bob");

        let holding = Holding::new(AssetClass::Cash, "CASH", dec!(100), dec!(1), Utc::now())?;
        storage.save_holding(&alice, &holding).await?;

        assert_eq!(storage.list_holdings(&alice).await?.len(), 1);
        assert!(storage.list_holdings(&bob).await?.is_empty());
        assert!(storage.get_holding(&bob, &holding.id).await?.is_none());
        assert!(!storage.delete_holding(&bob, &holding.id).await?);
        assert!(storage.delete_holding(&alice, &holding.id).await?);
        assert!(storage.list_holdings(&alice).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() -> Result<()> {
        let storage = MemoryStorage::new();
        let user = Id::from("local");
        let now = Utc::now();

        let newer = Holding::new(AssetClass::Gold, "AU", dec!(1), dec!(500), now)?;
        let older =
            Holding::new(AssetClass::Bond, "B", dec!(1), dec!(100), now - Duration::days(2))?;
        storage.save_holding(&user, &newer).await?;
        storage.save_holding(&user, &older).await?;

        let listed = storage.list_holdings(&user).await?;
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[1].id, newer.id);
        Ok(())
    }
}
