//! OrderService - the interface handlers talk to, whatever backend is active.
//!
//! Stamps service-owned fields once for every backend, orders listings by
//! `orderDate` (newest first) and derives per-status counts. Store failures
//! are logged here as the operator notification and still returned to the
//! caller as a plain `Err`.

use crate::{
    models::order::{Order, OrderDraft},
    services::order_store::{OrderStore, StoreError, StoreResult},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::{cmp::Reverse, collections::BTreeMap, sync::Arc};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Validate a draft, assign `id`/`createdAt`/`updatedAt`, and persist it.
    pub async fn create_order(&self, draft: OrderDraft) -> StoreResult<Order> {
        validate_draft(&draft)?;
        let order = Order::from_draft(draft, generate_id(), Utc::now());
        let created = self
            .store
            .create_order(order)
            .await
            .inspect_err(|err| notify_failure("create order", err))?;
        info!(order_id = %created.order_id, id = %created.id, "order created");
        Ok(created)
    }

    /// All orders, most recent `orderDate` first. Ties keep insertion order.
    pub async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let mut orders = self
            .store
            .list_orders()
            .await
            .inspect_err(|err| notify_failure("list orders", err))?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    pub async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        self.store
            .get_order(order_id)
            .await
            .inspect_err(|err| notify_failure("get order", err))
    }

    /// Set `status` and refresh `updatedAt`. `None` when no order matches.
    pub async fn update_status(&self, order_id: &str, status: &str) -> StoreResult<Option<Order>> {
        let updated = self
            .store
            .update_status(order_id, status, Utc::now())
            .await
            .inspect_err(|err| notify_failure("update order status", err))?;
        if updated.is_some() {
            info!(order_id, status, "order status updated");
        }
        Ok(updated)
    }

    pub async fn delete_all_orders(&self) -> StoreResult<()> {
        self.store
            .delete_all_orders()
            .await
            .inspect_err(|err| notify_failure("delete all orders", err))?;
        warn!(backend = self.backend_name(), "all orders deleted");
        Ok(())
    }

    /// Number of orders per status string, recomputed on every call.
    pub async fn count_by_status(&self) -> StoreResult<BTreeMap<String, usize>> {
        let orders = self
            .store
            .list_orders()
            .await
            .inspect_err(|err| notify_failure("count orders", err))?;
        let mut counts = BTreeMap::new();
        for order in orders {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Pretty-printed JSON of the sorted order list, for backups.
    pub async fn export_orders(&self) -> StoreResult<String> {
        let orders = self.list_orders().await?;
        Ok(serde_json::to_string_pretty(&orders)?)
    }

    /// Replace the whole collection with a previous export.
    pub async fn import_orders(&self, json: &str) -> StoreResult<usize> {
        let orders: Vec<Order> = serde_json::from_str(json)
            .map_err(|err| StoreError::Validation(format!("invalid order export: {err}")))?;
        let count = orders.len();
        self.store
            .replace_all(orders)
            .await
            .inspect_err(|err| notify_failure("import orders", err))?;
        warn!(count, backend = self.backend_name(), "order collection replaced by import");
        Ok(count)
    }

    pub async fn check_ready(&self) -> StoreResult<()> {
        self.store.check_ready().await
    }
}

fn notify_failure(operation: &str, err: &StoreError) {
    match err {
        StoreError::Validation(msg) => warn!(operation, "rejected: {}", msg),
        other => error!(operation, error = %other, "order store failure"),
    }
}

fn validate_draft(draft: &OrderDraft) -> StoreResult<()> {
    let required = [
        ("orderId", &draft.order_id),
        ("fullName", &draft.full_name),
        ("phoneNumber", &draft.phone_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(StoreError::Validation(format!("{field} is required")));
    }
    if draft.copies == Some(0) {
        return Err(StoreError::Validation("copies must be positive".into()));
    }
    Ok(())
}

/// `order_<epoch-ms>_<9 random hex chars>`
fn generate_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("order_{}_{}", Utc::now().timestamp_millis(), &random[..9])
}

/// Stable descending sort on the parsed `orderDate`; unparseable dates last.
fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by_cached_key(|o| Reverse(parse_order_date(&o.order_date)));
}

fn parse_order_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::order_store::json_file::JsonFileOrderStore;
    use serde_json::json;
    use std::time::Duration;

    async fn service() -> (tempfile::TempDir, OrderService) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOrderStore::open(dir.path()).await.unwrap();
        (dir, OrderService::new(Arc::new(store)))
    }

    fn draft(order_id: &str, order_date: &str, status: &str) -> OrderDraft {
        serde_json::from_value(json!({
            "orderId": order_id,
            "fullName": "Jane",
            "phoneNumber": "555-0100",
            "printType": "document",
            "copies": 1,
            "orderDate": order_date,
            "status": status,
            "files": []
        }))
        .unwrap()
    }

    #[test]
    fn parses_supported_date_shapes() {
        assert!(parse_order_date("2024-01-01").is_some());
        assert!(parse_order_date("2024-01-01T10:00:00.123Z").is_some());
        assert!(parse_order_date("2024-01-01T10:00:00+02:00").is_some());
        assert!(parse_order_date("2024-01-01T10:00:00").is_some());
        assert_eq!(
            parse_order_date("2024-01-01 10:00:00"),
            parse_order_date("2024-01-01T10:00:00")
        );
        assert!(parse_order_date("2024-01-01 10:00:00.250").is_some());
        assert_eq!(parse_order_date("yesterday"), None);
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = generate_id();
        let parts: Vec<_> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "order");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(generate_id(), id);
    }

    #[tokio::test]
    async fn create_then_get_round_trips_with_stamped_fields() {
        let (_dir, service) = service().await;
        let input = draft("O1", "2024-01-01", "pending");

        let created = service.create_order(input.clone()).await.unwrap();
        assert!(created.id.starts_with("order_"));
        assert_eq!(created.created_at, created.updated_at);

        let fetched = service.get_order("O1").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        let expected = Order::from_draft(input, created.id.clone(), created.created_at);
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn rejects_drafts_missing_required_fields() {
        let (_dir, service) = service().await;

        let mut blank_name = draft("O1", "2024-01-01", "pending");
        blank_name.full_name = "  ".into();
        let err = service.create_order(blank_name).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(msg) if msg.contains("fullName")));

        let mut zero_copies = draft("O2", "2024-01-01", "pending");
        zero_copies.copies = Some(0);
        assert!(matches!(
            service.create_order(zero_copies).await,
            Err(StoreError::Validation(_))
        ));

        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_newest_first_with_stable_ties() {
        let (_dir, service) = service().await;
        for (id, date) in [
            ("A", "2024-01-02"),
            ("B", "2024-03-01T09:00:00Z"),
            ("C", "not a date"),
            ("D", "2024-01-02"),
            ("E", "2023-12-31"),
            ("F", "2024-02-01 08:30:00"),
        ] {
            service
                .create_order(draft(id, date, "pending"))
                .await
                .unwrap();
        }

        let first = service.list_orders().await.unwrap();
        let ids: Vec<_> = first.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "F", "A", "D", "E", "C"]);

        let second = service.list_orders().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn status_update_scenario() {
        let (_dir, service) = service().await;
        let created = service
            .create_order(draft("O1", "2024-01-01", "pending"))
            .await
            .unwrap();
        assert_eq!(
            service.get_order("O1").await.unwrap().unwrap().status,
            "pending"
        );

        tokio::time::sleep(Duration::from_millis(5)).await;
        let updated = service
            .update_status("O1", "printing")
            .await
            .unwrap()
            .unwrap();

        let fetched = service.get_order("O1").await.unwrap().unwrap();
        assert_eq!(fetched.status, "printing");
        assert!(fetched.updated_at > created.updated_at);
        assert_eq!(fetched, updated);

        let mut unchanged = fetched.clone();
        unchanged.status = created.status.clone();
        unchanged.updated_at = created.updated_at;
        assert_eq!(unchanged, created);

        assert_eq!(service.update_status("missing", "done").await.unwrap(), None);
    }

    #[tokio::test]
    async fn counts_by_status() {
        let (_dir, service) = service().await;
        assert!(service.count_by_status().await.unwrap().is_empty());

        for (id, status) in [("1", "a"), ("2", "a"), ("3", "b")] {
            service
                .create_order(draft(id, "2024-01-01", status))
                .await
                .unwrap();
        }

        let counts = service.count_by_status().await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 1);
    }

    #[tokio::test]
    async fn delete_all_then_create_again() {
        let (_dir, service) = service().await;
        service
            .create_order(draft("O1", "2024-01-01", "pending"))
            .await
            .unwrap();
        service.delete_all_orders().await.unwrap();
        assert!(service.list_orders().await.unwrap().is_empty());

        service
            .create_order(draft("O2", "2024-01-02", "pending"))
            .await
            .unwrap();
        assert_eq!(service.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn export_then_import_restores_collection() {
        let (_dir, service) = service().await;
        for (id, date) in [("O1", "2024-01-01"), ("O2", "2024-02-01")] {
            service
                .create_order(draft(id, date, "pending"))
                .await
                .unwrap();
        }
        let exported = service.export_orders().await.unwrap();
        let before = service.list_orders().await.unwrap();

        service.delete_all_orders().await.unwrap();
        assert_eq!(service.import_orders(&exported).await.unwrap(), 2);
        assert_eq!(service.list_orders().await.unwrap(), before);

        assert!(matches!(
            service.import_orders("{\"not\": \"a list\"}").await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(service.list_orders().await.unwrap(), before);
    }
}
