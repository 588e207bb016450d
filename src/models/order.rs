//! Represents a print order and the file references it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata copy of an uploaded file attached to an order.
///
/// This is not a foreign key into the file store; deleting uploads leaves
/// these entries untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A submitted print job.
///
/// `order_id` is the externally visible key every lookup uses. `id`,
/// `created_at` and `updated_at` are owned by the service, never the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal identifier assigned at creation.
    pub id: String,

    /// Client-assigned identifier shown to customers.
    pub order_id: String,

    pub full_name: String,
    pub phone_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_color_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bw_pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,

    #[serde(default)]
    pub files: Vec<FileRef>,

    /// Submission timestamp as sent by the client. Used for ordering only.
    pub order_date: String,

    /// Free-form workflow state, e.g. "pending", "processing", "completed".
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload accepted when a customer submits an order.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_id: String,
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub print_type: Option<String>,
    #[serde(default)]
    pub binding_color_type: Option<String>,
    #[serde(default)]
    pub copies: Option<u32>,
    #[serde(default)]
    pub paper_size: Option<String>,
    #[serde(default)]
    pub print_side: Option<String>,
    #[serde(default)]
    pub selected_pages: Option<String>,
    #[serde(default)]
    pub color_pages: Option<String>,
    #[serde(default)]
    pub bw_pages: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRef>,
    pub order_date: String,
    pub status: String,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

impl Order {
    /// Build a stored order from a draft, stamping the service-owned fields.
    pub fn from_draft(draft: OrderDraft, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            order_id: draft.order_id,
            full_name: draft.full_name,
            phone_number: draft.phone_number,
            print_type: draft.print_type,
            binding_color_type: draft.binding_color_type,
            copies: draft.copies,
            paper_size: draft.paper_size,
            print_side: draft.print_side,
            selected_pages: draft.selected_pages,
            color_pages: draft.color_pages,
            bw_pages: draft.bw_pages,
            special_instructions: draft.special_instructions,
            files: draft.files,
            order_date: draft.order_date,
            status: draft.status,
            total_cost: draft.total_cost,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_ignores_service_owned_fields() {
        let draft: OrderDraft = serde_json::from_value(json!({
            "id": "client-chosen",
            "orderId": "O1",
            "fullName": "Jane",
            "phoneNumber": "555-0100",
            "orderDate": "2024-01-01",
            "status": "pending",
            "createdAt": "1999-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(draft.order_id, "O1");
        assert!(draft.files.is_empty());
        assert_eq!(draft.copies, None);
    }

    #[test]
    fn order_serializes_camel_case_and_omits_absent_options() {
        let now = Utc::now();
        let draft: OrderDraft = serde_json::from_value(json!({
            "orderId": "O2",
            "fullName": "Sam",
            "phoneNumber": "555-0101",
            "orderDate": "2024-02-01",
            "status": "pending",
            "files": [{ "name": "a.pdf", "size": 12, "type": "application/pdf" }]
        }))
        .unwrap();
        let order = Order::from_draft(draft, "order_1_abc".into(), now);

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["orderId"], "O2");
        assert_eq!(value["files"][0]["type"], "application/pdf");
        assert!(value.get("copies").is_none());
        assert!(value["files"][0].get("path").is_none());
        assert_eq!(order.created_at, order.updated_at);
    }
}
