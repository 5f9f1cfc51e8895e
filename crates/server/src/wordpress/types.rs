//! Wire types for the WordPress, WooCommerce and Tutor REST APIs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use deskops_core::{CourseId, OrderStatus, ProductId, WcOrderId, WpUserId};

// =============================================================================
// WordPress users
// =============================================================================

/// A WordPress user as returned with `context=edit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpUser {
    pub id: WpUserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub registered_date: Option<String>,
}

/// One page of users.
#[derive(Debug, Clone, Serialize)]
pub struct WpUserPage {
    pub users: Vec<WpUser>,
    pub page: u32,
    pub total_pages: u32,
}

/// Query for listing users.
#[derive(Debug, Clone, Serialize)]
pub struct WpUserQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub context: &'static str,
}

impl Default for WpUserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            search: None,
            context: "edit",
        }
    }
}

/// Body for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWpUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

// =============================================================================
// WooCommerce orders
// =============================================================================

/// A metadata entry on an order. Values are arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub key: String,
    pub value: Value,
}

impl MetaData {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Billing {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// A WooCommerce order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: WcOrderId,
    pub status: OrderStatus,
    /// WooCommerce uses `0` for guest checkouts.
    #[serde(default)]
    pub customer_id: u64,
    #[serde(default)]
    pub billing: Billing,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub meta_data: Vec<MetaData>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    /// The WordPress user that placed the order, if not a guest.
    #[must_use]
    pub const fn customer(&self) -> Option<WpUserId> {
        if self.customer_id == 0 {
            None
        } else {
            Some(WpUserId::new(self.customer_id))
        }
    }

    /// Last value stored under `key`. WooCommerce keeps duplicates in
    /// insertion order; the latest one wins.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta_data
            .iter()
            .rev()
            .find(|m| m.key == key)
            .map(|m| &m.value)
    }
}

/// Query for listing orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<u64>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: None,
            customer: None,
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body for creating an order.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub customer_id: u64,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<NewLineItem>,
    pub meta_data: Vec<MetaData>,
    pub set_paid: bool,
}

// =============================================================================
// Tutor LMS
// =============================================================================

/// A Tutor course (a `courses` post).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(alias = "ID")]
    pub id: CourseId,
    #[serde(alias = "post_title", default)]
    pub title: String,
    #[serde(alias = "post_status", default)]
    pub status: Option<String>,
}

/// Tutor wraps every payload in `{ code, message, data }`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TutorEnvelope<T> {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// `data` of the course listing.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TutorCoursePage {
    #[serde(default)]
    pub posts: Vec<Course>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TutorEnrollment {
    pub user_id: WpUserId,
    pub course_id: CourseId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_order_deserializes_woocommerce_payload() {
        let order: Order = serde_json::from_value(json!({
            "id": 727,
            "status": "processing",
            "customer_id": 12,
            "billing": { "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com" },
            "total": "29.99",
            "meta_data": [
                { "id": 1, "key": "_pending_enrollment", "value": "yes" },
                { "id": 2, "key": "_enrollment_course_ids", "value": [10, 11] }
            ],
            "line_items": [{ "id": 5, "name": "Course", "product_id": 99, "quantity": 1 }]
        }))
        .unwrap();

        assert_eq!(order.id, WcOrderId::new(727));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.customer(), Some(WpUserId::new(12)));
        assert_eq!(order.meta("_pending_enrollment"), Some(&json!("yes")));
        assert_eq!(order.line_items[0].product_id, ProductId::new(99));
    }

    #[test]
    fn test_guest_order_has_no_customer() {
        let order: Order =
            serde_json::from_value(json!({ "id": 1, "status": "pending", "customer_id": 0 }))
                .unwrap();
        assert_eq!(order.customer(), None);
    }

    #[test]
    fn test_latest_meta_wins() {
        let order: Order = serde_json::from_value(json!({
            "id": 1,
            "status": "pending",
            "meta_data": [
                { "key": "_pending_enrollment", "value": "yes" },
                { "key": "_pending_enrollment", "value": "no" }
            ]
        }))
        .unwrap();
        assert_eq!(order.meta("_pending_enrollment"), Some(&json!("no")));
    }

    #[test]
    fn test_course_accepts_tutor_post_fields() {
        let course: Course = serde_json::from_value(json!({
            "ID": 42,
            "post_title": "Intro to Rust",
            "post_status": "publish"
        }))
        .unwrap();
        assert_eq!(course.id, CourseId::new(42));
        assert_eq!(course.title, "Intro to Rust");
    }

    #[test]
    fn test_wp_user_query_serializes_edit_context() {
        let query = serde_json::to_value(WpUserQuery::default()).unwrap();
        assert_eq!(query["context"], "edit");
        assert!(query.get("search").is_none());
    }
}
