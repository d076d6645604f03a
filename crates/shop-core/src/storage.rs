//! # Cart Persistence
//!
//! Durable client-side storage for cart snapshots. The cart is written
//! after every mutation and read back once at session start; writes are
//! fire-and-forget at the call site (see [`persist`]) so a slow or failing
//! store never blocks the next mutation.

use crate::cart::CartState;
use crate::error::{StoreError, StoreResult};
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable store for one session's cart snapshot
pub trait CartStorage: Send + Sync {
    /// Overwrite the stored snapshot
    fn save(&self, state: &CartState) -> StoreResult<()>;

    /// Read the stored snapshot, `None` when nothing was saved yet
    fn load(&self) -> StoreResult<Option<CartState>>;
}

/// Save a snapshot, logging instead of failing.
///
/// Callers invoke this after each mutation (typically from a spawned task);
/// a failed write leaves the in-memory cart authoritative and is only worth
/// a warning.
pub fn persist(storage: &dyn CartStorage, state: &CartState) {
    if let Err(err) = storage.save(state) {
        tracing::warn!(error = %err, "failed to persist cart snapshot");
    }
}

/// JSON file-backed storage
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStorage for JsonFileStorage {
    fn save(&self, state: &CartState) -> StoreResult<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StoreError::Persistence(format!("{}: {}", self.path.display(), e)))
    }

    fn load(&self) -> StoreResult<Option<CartState>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Persistence(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let state =
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(state))
    }
}

/// In-memory storage for tests and DB-less development.
///
/// Stores the serialized form so the full encode/decode path is exercised.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn save(&self, state: &CartState) -> StoreResult<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        *self
            .slot
            .lock()
            .map_err(|_| StoreError::Internal("cart storage lock poisoned".to_string()))? =
            Some(json);
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<CartState>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| StoreError::Internal("cart storage lock poisoned".to_string()))?;
        match slot.as_deref() {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartItem, CartStore};
    use crate::pricing::PricingConfig;

    fn sample_cart() -> CartStore {
        let mut cart = CartStore::default();
        cart.add_item(CartItem {
            id: 2,
            name: "Airpods Max".to_string(),
            unit_price: "439.00".parse().unwrap(),
            original_unit_price: Some("549.00".parse().unwrap()),
            quantity: 1,
            image_url: None,
            variant: Some("Color: Red".to_string()),
        });
        cart.add_item(CartItem {
            id: 5,
            name: "JBL TUNE 660BTNC".to_string(),
            unit_price: "159.99".parse().unwrap(),
            original_unit_price: None,
            quantity: 2,
            image_url: None,
            variant: None,
        });
        cart
    }

    #[test]
    fn test_memory_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());

        let cart = sample_cart();
        storage.save(&cart.snapshot()).unwrap();

        let restored = CartStore::hydrate(storage.load().unwrap().unwrap(), PricingConfig::default());
        assert_eq!(restored.items(), cart.items());
        assert_eq!(restored.totals(), cart.totals());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("cart.json"));
        assert!(storage.load().unwrap().is_none());

        let cart = sample_cart();
        storage.save(&cart.snapshot()).unwrap();

        let restored = CartStore::hydrate(storage.load().unwrap().unwrap(), PricingConfig::default());
        assert_eq!(restored.items(), cart.items());
        assert_eq!(restored.totals(), cart.totals());
    }

    #[test]
    fn test_persist_swallows_write_failures() {
        // Unwritable path: the helper must log and return, not panic
        let storage = JsonFileStorage::new("/nonexistent-dir/cart.json");
        persist(&storage, &sample_cart().snapshot());
    }
}
