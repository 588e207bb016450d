//! Order persistence contract and its interchangeable backends.
//!
//! Exactly one backend is active per deployment:
//! - [`json_file::JsonFileOrderStore`] keeps the whole collection in one JSON file.
//! - [`local_storage::LocalStorageOrderStore`] keeps it under one key of the
//!   device-local key/value storage.
//! - [`sqlite::SqliteOrderStore`] keeps one row per order.
//!
//! Stores persist what they are given. Stamping ids and timestamps, sorting
//! and aggregation live in the order service.

pub mod json_file;
pub mod local_storage;
pub mod sqlite;

use crate::{models::order::Order, services::local_storage::LocalStorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid order: {0}")]
    Validation(String),
    #[error("order data could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    LocalStorage(#[from] LocalStorageError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Short backend label used in logs and readiness output.
    fn backend_name(&self) -> &'static str;

    /// Append a fully stamped order. Duplicate `order_id`s are not rejected.
    async fn create_order(&self, order: Order) -> StoreResult<Order>;

    /// Every order, in insertion order.
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    /// First order whose `order_id` matches.
    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>>;

    /// Overwrite `status` and `updated_at` of the first matching order.
    ///
    /// Returns `None` and leaves the collection untouched when nothing matches.
    async fn update_status(
        &self,
        order_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>>;

    /// Irreversibly remove every order.
    async fn delete_all_orders(&self) -> StoreResult<()>;

    /// Replace the whole collection, keeping the given order.
    async fn replace_all(&self, orders: Vec<Order>) -> StoreResult<()>;

    /// Cheap check that the backing resource is readable.
    async fn check_ready(&self) -> StoreResult<()>;
}

/// Status update shared by the collection-style backends.
fn apply_status(
    orders: &mut [Order],
    order_id: &str,
    status: &str,
    at: DateTime<Utc>,
) -> Option<Order> {
    let order = orders.iter_mut().find(|o| o.order_id == order_id)?;
    order.status = status.to_string();
    order.updated_at = at;
    Some(order.clone())
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share. Each backend's tests call these.

    use super::*;
    use crate::models::order::FileRef;
    use chrono::TimeZone;

    pub fn sample(order_id: &str, order_date: &str, status: &str) -> Order {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        Order {
            id: format!("order_1704096000000_{}", order_id.to_lowercase()),
            order_id: order_id.to_string(),
            full_name: "Jane Doe".into(),
            phone_number: "555-0100".into(),
            print_type: Some("document".into()),
            binding_color_type: None,
            copies: Some(2),
            paper_size: Some("A4".into()),
            print_side: Some("double".into()),
            selected_pages: None,
            color_pages: Some("1-2".into()),
            bw_pages: None,
            special_instructions: Some("staple top left".into()),
            files: vec![FileRef {
                name: "thesis.pdf".into(),
                size: 2048,
                content_type: "application/pdf".into(),
                path: Some("/uploads/1704096000000_thesis.pdf".into()),
            }],
            order_date: order_date.to_string(),
            status: status.to_string(),
            total_cost: Some(12.5),
            created_at: created,
            updated_at: created,
        }
    }

    pub async fn round_trip(store: &dyn OrderStore) {
        assert!(store.list_orders().await.unwrap().is_empty());
        assert_eq!(store.get_order("O1").await.unwrap(), None);

        let order = sample("O1", "2024-01-01", "pending");
        let created = store.create_order(order.clone()).await.unwrap();
        assert_eq!(created, order);
        assert_eq!(store.get_order("O1").await.unwrap(), Some(order));
    }

    pub async fn keeps_insertion_order_and_duplicates(store: &dyn OrderStore) {
        store
            .create_order(sample("B", "2024-01-02", "pending"))
            .await
            .unwrap();
        store
            .create_order(sample("A", "2024-01-03", "pending"))
            .await
            .unwrap();
        let mut dup = sample("B", "2024-01-04", "completed");
        dup.id = "order_dup".into();
        store.create_order(dup).await.unwrap();

        let ids: Vec<_> = store
            .list_orders()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(ids, vec!["B", "A", "B"]);

        let first = store.get_order("B").await.unwrap().unwrap();
        assert_eq!(first.status, "pending");
    }

    pub async fn update_status_touches_only_status(store: &dyn OrderStore) {
        let original = sample("O1", "2024-01-01", "pending");
        store.create_order(original.clone()).await.unwrap();
        store
            .create_order(sample("O2", "2024-01-02", "pending"))
            .await
            .unwrap();

        let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let updated = store
            .update_status("O1", "printing", at)
            .await
            .unwrap()
            .unwrap();

        let mut expected = original;
        expected.status = "printing".into();
        expected.updated_at = at;
        assert_eq!(updated, expected);
        assert_eq!(store.get_order("O1").await.unwrap(), Some(expected));

        let untouched = store.get_order("O2").await.unwrap().unwrap();
        assert_eq!(untouched.status, "pending");

        let before = store.list_orders().await.unwrap();
        assert_eq!(
            store.update_status("missing", "done", at).await.unwrap(),
            None
        );
        assert_eq!(store.list_orders().await.unwrap(), before);
    }

    pub async fn delete_all_then_create(store: &dyn OrderStore) {
        store
            .create_order(sample("O1", "2024-01-01", "pending"))
            .await
            .unwrap();
        store.delete_all_orders().await.unwrap();
        assert!(store.list_orders().await.unwrap().is_empty());

        store.delete_all_orders().await.unwrap();
        store
            .create_order(sample("O2", "2024-01-02", "pending"))
            .await
            .unwrap();
        assert_eq!(store.list_orders().await.unwrap().len(), 1);
        store.check_ready().await.unwrap();
    }

    pub async fn replace_all_swaps_collection(store: &dyn OrderStore) {
        store
            .create_order(sample("OLD", "2024-01-01", "pending"))
            .await
            .unwrap();
        let incoming = vec![
            sample("N1", "2024-02-01", "completed"),
            sample("N2", "2024-02-02", "pending"),
        ];
        store.replace_all(incoming.clone()).await.unwrap();
        assert_eq!(store.list_orders().await.unwrap(), incoming);
        assert_eq!(store.get_order("OLD").await.unwrap(), None);
    }
}
