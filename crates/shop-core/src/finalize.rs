//! # Order Finalization
//!
//! Durably records an order once a payment has been confirmed. The write is
//! the one place in this core needing real atomicity — the order header and
//! its items land in the same logical transaction or not at all — and the
//! one place needing idempotency: a client retry after a network blip must
//! get the already-created order back, not a duplicate.
//!
//! Idempotency is carried by the storage backend's uniqueness guarantee on
//! the payment confirmation reference, not by application locks, so
//! concurrent retries across sessions resolve inside the database.

use crate::error::{StoreError, StoreResult};
use crate::order::{Order, OrderDraft, OrderSummary};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Result of an order insert
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// A new order row (plus items) was written
    Created(Order),

    /// An order already existed for this payment reference; duplicate
    /// finalization resolved internally, never surfaced as an error
    Existing(Order),
}

impl InsertOutcome {
    pub fn into_order(self) -> Order {
        match self {
            InsertOutcome::Created(order) | InsertOutcome::Existing(order) => order,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// Storage seam for orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert header and items atomically. When the draft carries a payment
    /// reference that already has an order, return it as `Existing` instead
    /// of writing anything.
    async fn insert(&self, draft: &OrderDraft) -> StoreResult<InsertOutcome>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn find_by_payment_ref(&self, payment_ref: &str) -> StoreResult<Option<Order>>;

    /// Order summaries for a user, newest first
    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<OrderSummary>>;
}

/// Order finalization and lookup service
#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    /// Durably record an order for a successful payment.
    ///
    /// The caller must already have observed payment success for the
    /// draft's payment reference. A persistence failure here does NOT roll
    /// the payment back — the error is retryable against the same
    /// reference, and retrying cannot double-record thanks to the
    /// uniqueness guarantee.
    pub async fn finalize(&self, draft: OrderDraft) -> StoreResult<Order> {
        if draft.payment_ref.is_none() {
            return Err(StoreError::Validation(
                "finalization requires a payment confirmation reference".to_string(),
            ));
        }

        match self.repo.insert(&draft).await {
            Ok(InsertOutcome::Created(order)) => {
                info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    "order finalized"
                );
                Ok(order)
            }
            Ok(InsertOutcome::Existing(order)) => {
                info!(
                    order_id = %order.id,
                    payment_ref = ?draft.payment_ref,
                    "duplicate finalization resolved to existing order"
                );
                Ok(order)
            }
            Err(err) => {
                // Money has moved; this must be surfaced loudly and retried
                // against the same payment reference, never swallowed.
                warn!(
                    payment_ref = ?draft.payment_ref,
                    error = %err,
                    "order recording failed after successful payment"
                );
                Err(err)
            }
        }
    }

    /// Record a pre-payment order (no payment reference yet)
    pub async fn create(&self, draft: OrderDraft) -> StoreResult<Order> {
        Ok(self.repo.insert(&draft).await?.into_order())
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.repo.find_by_id(id).await
    }

    pub async fn find_by_payment_ref(&self, payment_ref: &str) -> StoreResult<Option<Order>> {
        self.repo.find_by_payment_ref(payment_ref).await
    }

    pub async fn history_for_user(&self, user_id: i64) -> StoreResult<Vec<OrderSummary>> {
        self.repo.list_for_user(user_id).await
    }
}

/// In-memory repository for tests and DB-less development
#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Vec<Order>>> {
        self.orders
            .lock()
            .map_err(|_| StoreError::Internal("order store lock poisoned".to_string()))
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, draft: &OrderDraft) -> StoreResult<InsertOutcome> {
        let mut orders = self.lock()?;

        if let Some(payment_ref) = draft.payment_ref.as_deref() {
            if let Some(existing) = orders
                .iter()
                .find(|o| o.payment_ref.as_deref() == Some(payment_ref))
            {
                return Ok(InsertOutcome::Existing(existing.clone()));
            }
        }

        let order = Order {
            id: Uuid::new_v4(),
            order_number: draft.order_number.clone(),
            user_id: draft.user_id,
            total: draft.total,
            payment_method: draft.payment_method.clone(),
            status: "processing".to_string(),
            payment_ref: draft.payment_ref.clone(),
            shipping_address: draft.shipping_address.clone(),
            created_at: Utc::now(),
            items: draft.items.clone(),
        };
        orders.push(order.clone());
        Ok(InsertOutcome::Created(order))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_payment_ref(&self, payment_ref: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .lock()?
            .iter()
            .find(|o| o.payment_ref.as_deref() == Some(payment_ref))
            .cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<OrderSummary>> {
        let mut summaries: Vec<OrderSummary> = self
            .lock()?
            .iter()
            .filter(|o| o.user_id == Some(user_id))
            .map(|o| OrderSummary {
                id: o.id,
                order_number: o.order_number.clone(),
                total: o.total,
                status: o.status.clone(),
                created_at: o.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderItem, ShippingAddress};
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            line1: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        }
    }

    fn draft(payment_ref: Option<&str>) -> OrderDraft {
        OrderDraft::from_parts(
            Some(7),
            payment_ref.map(String::from),
            "Stripe",
            vec![OrderItem {
                name: "Airpods Max".to_string(),
                quantity: 1,
                price: dec("439.00"),
            }],
            dec("366.315"),
            address(),
        )
        .unwrap()
    }

    fn service() -> OrderService {
        OrderService::new(Arc::new(MemoryOrderRepository::new()))
    }

    #[tokio::test]
    async fn test_finalize_persists_header_and_items() {
        let service = service();
        let order = service.finalize(draft(Some("pi_abc"))).await.unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, dec("366.32"));
        assert_eq!(order.payment_ref.as_deref(), Some("pi_abc"));

        let fetched = service.get(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_number, order.order_number);
        assert_eq!(fetched.items, order.items);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent_per_payment_ref() {
        let service = service();

        let first = service.finalize(draft(Some("pi_abc"))).await.unwrap();
        // Retry with a fresh draft (new order number) but the same reference
        let second = service.finalize(draft(Some("pi_abc"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.order_number, second.order_number);
        // Exactly one set of items exists for that order
        let stored = service.find_by_payment_ref("pi_abc").await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_finalize_creates_one_order() {
        let service = service();

        let (a, b) = tokio::join!(
            service.finalize(draft(Some("pi_race"))),
            service.finalize(draft(Some("pi_race"))),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.id, b.id);
        let history = service.history_for_user(7).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_requires_payment_ref() {
        let err = service().finalize(draft(None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_allows_pre_payment_orders() {
        let service = service();
        let order = service.create(draft(None)).await.unwrap();
        assert!(order.payment_ref.is_none());

        // Two pre-payment orders never collide on the reference
        let other = service.create(draft(None)).await.unwrap();
        assert_ne!(order.id, other.id);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let service = service();
        service.finalize(draft(Some("pi_1"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.finalize(draft(Some("pi_2"))).await.unwrap();

        let history = service.history_for_user(7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at >= history[1].created_at);
    }

    /// Repository that fails every write, for the reconciliation path
    struct FailingRepository;

    #[async_trait]
    impl OrderRepository for FailingRepository {
        async fn insert(&self, _draft: &OrderDraft) -> StoreResult<InsertOutcome> {
            Err(StoreError::Persistence("database unreachable".to_string()))
        }

        async fn find_by_id(&self, _id: Uuid) -> StoreResult<Option<Order>> {
            Ok(None)
        }

        async fn find_by_payment_ref(&self, _payment_ref: &str) -> StoreResult<Option<Order>> {
            Ok(None)
        }

        async fn list_for_user(&self, _user_id: i64) -> StoreResult<Vec<OrderSummary>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_surfaced_and_retryable() {
        let service = OrderService::new(Arc::new(FailingRepository));
        let err = service.finalize(draft(Some("pi_abc"))).await.unwrap_err();

        assert!(matches!(err, StoreError::Persistence(_)));
        assert!(err.is_retryable());
        assert!(err.charge_may_exist());
    }
}
