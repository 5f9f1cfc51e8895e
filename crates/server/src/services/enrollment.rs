//! Order reconciliation and batch course enrollment.
//!
//! Course purchases are recorded on WooCommerce orders as metadata:
//!
//! - `_pending_enrollment` - `yes` while enrollment is outstanding
//! - `_enrollment_course_ids` - the courses to enroll the customer in
//! - `_enrollment_completed_at` - set when every course succeeded
//!
//! Moving an order to `completed` performs the enrollment. The flag stays set
//! until every course has succeeded, so repeating the `completed` request
//! retries the failed courses; Tutor's "already enrolled" answer counts as
//! success for the ones that went through the first time.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use deskops_core::{CourseId, OrderStatus, ProductId, WcOrderId, WpUserId};

use super::run_in_chunks;
use crate::wordpress::{
    EnrollmentGateway, MetaData, NewLineItem, NewOrder, Order, OrderGateway, WordPressError,
};

pub const PENDING_ENROLLMENT_KEY: &str = "_pending_enrollment";
pub const COURSE_IDS_KEY: &str = "_enrollment_course_ids";
pub const COMPLETED_AT_KEY: &str = "_enrollment_completed_at";

/// Warning when a completed order has courses to enroll but no customer.
pub const NO_CUSTOMER_WARNING: &str = "Order has pending enrollment but no customer";

#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The order could not be read or updated.
    #[error("order {order_id}: {source}")]
    Order {
        order_id: WcOrderId,
        #[source]
        source: WordPressError,
    },

    /// The batch request has the wrong shape.
    #[error("invalid enrollment request: {0}")]
    InvalidRequest(String),
}

impl EnrollmentError {
    /// Text for API clients, with vendor failures reduced as in
    /// [`WordPressError::public_message`].
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Order { order_id, source } => {
                format!("order {order_id}: {}", source.public_message())
            }
            Self::InvalidRequest(_) => self.to_string(),
        }
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Courses awaiting enrollment on `order`.
///
/// Returns `None` unless `_pending_enrollment` is `yes`, `true` or `1` and at
/// least one valid course ID is present.
#[must_use]
pub fn pending_enrollment(order: &Order) -> Option<Vec<CourseId>> {
    if !order.meta(PENDING_ENROLLMENT_KEY).is_some_and(is_truthy) {
        return None;
    }

    let courses = order.meta(COURSE_IDS_KEY).map(parse_course_ids)?;
    if courses.is_empty() {
        return None;
    }
    Some(courses)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "yes" | "true" | "1"),
        _ => false,
    }
}

/// Parse course IDs from a JSON array, a JSON-encoded array string, a
/// comma/space separated list or a single number.
///
/// Invalid entries (non-numeric, zero, negative) are skipped; duplicates are
/// removed keeping the first occurrence.
fn parse_course_ids(value: &Value) -> Vec<CourseId> {
    let mut ids = Vec::new();
    collect_course_ids(value, &mut ids);

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

fn collect_course_ids(value: &Value, out: &mut Vec<CourseId>) {
    match value {
        Value::Number(n) => {
            if let Some(id) = n.as_u64().filter(|id| *id > 0) {
                out.push(CourseId::new(id));
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[')
                && let Ok(inner) = serde_json::from_str::<Value>(trimmed)
            {
                collect_course_ids(&inner, out);
                return;
            }
            out.extend(
                trimmed
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter_map(|part| part.trim().parse::<u64>().ok())
                    .filter(|id| *id > 0)
                    .map(CourseId::new),
            );
        }
        Value::Array(items) => {
            for item in items {
                // Nested arrays are not a format anyone writes
                if !item.is_array() {
                    collect_course_ids(item, out);
                }
            }
        }
        _ => {}
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Per-course failure during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct CourseFailure {
    pub course_id: CourseId,
    pub reason: String,
}

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub order: Order,
    pub enrolled: Vec<CourseId>,
    pub failed: Vec<CourseFailure>,
    /// Set when enrollment was attempted and anything went wrong.
    pub warning: Option<String>,
}

/// Change an order's status and, on `completed`, enroll its customer in the
/// pending courses.
///
/// The status update happens first; if it fails nothing is enrolled.
/// Enrollment failures never fail the call, they end up in `warning`.
///
/// # Errors
///
/// Returns `EnrollmentError::Order` if the order can't be fetched or its
/// status can't be updated.
#[instrument(skip_all, fields(order_id = %order_id, status = %new_status))]
pub async fn reconcile_order_status(
    orders: &dyn OrderGateway,
    enroller: &dyn EnrollmentGateway,
    order_id: WcOrderId,
    new_status: &OrderStatus,
) -> Result<ReconcileOutcome, EnrollmentError> {
    let order_err = |source| EnrollmentError::Order { order_id, source };

    // Read first: the update response is what we return, but the metadata is
    // taken from the order as it was before the change.
    let before = orders.get_order(order_id).await.map_err(order_err)?;
    let mut order = orders
        .update_status(order_id, new_status)
        .await
        .map_err(order_err)?;

    let mut outcome = ReconcileOutcome {
        order: order.clone(),
        enrolled: Vec::new(),
        failed: Vec::new(),
        warning: None,
    };

    if !new_status.is_completed() {
        return Ok(outcome);
    }
    let Some(courses) = pending_enrollment(&before) else {
        return Ok(outcome);
    };
    let Some(customer) = before.customer() else {
        tracing::warn!("completed order has pending enrollment but no customer");
        outcome.warning = Some(NO_CUSTOMER_WARNING.to_owned());
        return Ok(outcome);
    };

    let results = futures::future::join_all(
        courses
            .iter()
            .map(|course| async move { (*course, enroller.enroll(customer, *course).await) }),
    )
    .await;

    for (course, result) in results {
        match result {
            Ok(()) => outcome.enrolled.push(course),
            Err(e) => {
                tracing::warn!(course_id = %course, error = %e, "course enrollment failed");
                outcome.failed.push(CourseFailure {
                    course_id: course,
                    reason: e.public_message(),
                });
            }
        }
    }

    if outcome.failed.is_empty() {
        let meta = [
            MetaData::new(PENDING_ENROLLMENT_KEY, "no"),
            MetaData::new(COMPLETED_AT_KEY, Utc::now().to_rfc3339()),
        ];
        match orders.update_meta(order_id, &meta).await {
            Ok(updated) => order = updated,
            Err(e) => {
                // Enrollment is done; a retry will only meet "already enrolled"
                tracing::warn!(error = %e, "failed to clear pending enrollment flag");
                outcome.warning = Some(format!(
                    "Enrolled in {} courses but the pending flag could not be cleared: {e}",
                    courses.len()
                ));
            }
        }
        outcome.order = order;
    } else {
        outcome.warning = Some(failure_warning(&outcome.failed, courses.len()));
    }

    tracing::info!(
        enrolled = outcome.enrolled.len(),
        failed = outcome.failed.len(),
        "order reconciled"
    );
    Ok(outcome)
}

/// `Enrollment failed for N of M courses: <id>: <reason>; ...`
fn failure_warning(failed: &[CourseFailure], total: usize) -> String {
    let details = failed
        .iter()
        .map(|f| format!("{}: {}", f.course_id, f.reason))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Enrollment failed for {} of {total} courses: {details}",
        failed.len()
    )
}

// =============================================================================
// Batch enrollment
// =============================================================================

/// Either one user and many courses, or many users and one course.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchEnrollRequest {
    pub user_id: Option<WpUserId>,
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
    #[serde(default)]
    pub user_ids: Vec<WpUserId>,
    pub course_id: Option<CourseId>,
    /// Line item for the orders created in the many-users shape.
    pub product_id: Option<ProductId>,
}

/// What the request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BatchShape {
    OneUser {
        user: WpUserId,
        courses: Vec<CourseId>,
    },
    ManyUsers {
        users: Vec<WpUserId>,
        course: CourseId,
    },
}

impl BatchEnrollRequest {
    fn shape(&self) -> Result<BatchShape, EnrollmentError> {
        let one_user = self.user_id.is_some() || !self.course_ids.is_empty();
        let many_users = self.course_id.is_some() || !self.user_ids.is_empty();

        match (one_user, many_users) {
            (true, true) => Err(EnrollmentError::InvalidRequest(
                "send either user_id with course_ids or user_ids with course_id, not both"
                    .to_owned(),
            )),
            (false, false) => Err(EnrollmentError::InvalidRequest(
                "send user_id with course_ids or user_ids with course_id".to_owned(),
            )),
            (true, false) => {
                let user = self.user_id.ok_or_else(|| {
                    EnrollmentError::InvalidRequest("user_id is required".to_owned())
                })?;
                if self.course_ids.is_empty() {
                    return Err(EnrollmentError::InvalidRequest(
                        "course_ids must not be empty".to_owned(),
                    ));
                }
                reject_duplicates(&self.course_ids, "course_ids")?;
                Ok(BatchShape::OneUser {
                    user,
                    courses: self.course_ids.clone(),
                })
            }
            (false, true) => {
                let course = self.course_id.ok_or_else(|| {
                    EnrollmentError::InvalidRequest("course_id is required".to_owned())
                })?;
                if self.user_ids.is_empty() {
                    return Err(EnrollmentError::InvalidRequest(
                        "user_ids must not be empty".to_owned(),
                    ));
                }
                reject_duplicates(&self.user_ids, "user_ids")?;
                Ok(BatchShape::ManyUsers {
                    users: self.user_ids.clone(),
                    course,
                })
            }
        }
    }
}

/// Outcome for one user/course pair.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub user_id: WpUserId,
    pub course_id: CourseId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<WcOrderId>,
}

/// Batch result: one item per input, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub items: Vec<BatchItem>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    fn from_items(items: Vec<BatchItem>) -> Self {
        let succeeded = items.iter().filter(|i| i.success).count();
        Self {
            total: items.len(),
            failed: items.len() - succeeded,
            succeeded,
            items,
        }
    }
}

/// Run a batch enrollment in chunks of `chunk_size`.
///
/// One user with many courses is enrolled directly. Many users with one
/// course get one `pending` order each, carrying the pending-enrollment
/// metadata; completing those orders enrolls them. A failed item never stops
/// the others.
///
/// # Errors
///
/// Returns `EnrollmentError::InvalidRequest` if the request has neither or
/// both shapes, or an empty list.
#[instrument(skip_all)]
pub async fn batch_enroll(
    orders: &dyn OrderGateway,
    enroller: &dyn EnrollmentGateway,
    request: &BatchEnrollRequest,
    chunk_size: usize,
) -> Result<BatchOutcome, EnrollmentError> {
    let items = match request.shape()? {
        BatchShape::OneUser { user, courses } => {
            run_in_chunks(&courses, chunk_size, |course| {
                let course = *course;
                async move {
                    let result = enroller.enroll(user, course).await;
                    item(user, course, result.map(|()| None))
                }
            })
            .await
        }
        BatchShape::ManyUsers { users, course } => {
            run_in_chunks(&users, chunk_size, |user| {
                let user = *user;
                let order = pending_order(user, course, request.product_id);
                async move {
                    let result = orders.create_order(&order).await;
                    item(user, course, result.map(|o| Some(o.id)))
                }
            })
            .await
        }
    };

    let outcome = BatchOutcome::from_items(items);
    tracing::info!(
        total = outcome.total,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "batch enrollment finished"
    );
    Ok(outcome)
}

/// Each repeated ID would mean a second pending order or enrollment call.
fn reject_duplicates<T: Copy + Eq + Hash + Display>(
    ids: &[T],
    field: &str,
) -> Result<(), EnrollmentError> {
    let mut seen = HashSet::with_capacity(ids.len());
    match ids.iter().find(|id| !seen.insert(**id)) {
        Some(id) => Err(EnrollmentError::InvalidRequest(format!(
            "{field} lists {id} more than once"
        ))),
        None => Ok(()),
    }
}

fn item(
    user_id: WpUserId,
    course_id: CourseId,
    result: Result<Option<WcOrderId>, WordPressError>,
) -> BatchItem {
    match result {
        Ok(order_id) => BatchItem {
            user_id,
            course_id,
            success: true,
            error: None,
            order_id,
        },
        Err(e) => {
            tracing::warn!(%user_id, %course_id, error = %e, "batch item failed");
            BatchItem {
                user_id,
                course_id,
                success: false,
                error: Some(e.public_message()),
                order_id: None,
            }
        }
    }
}

/// A `pending` order that enrolls `user` in `course` once completed.
fn pending_order(user: WpUserId, course: CourseId, product: Option<ProductId>) -> NewOrder {
    NewOrder {
        customer_id: user.as_u64(),
        status: OrderStatus::Pending,
        line_items: product
            .map(|product_id| NewLineItem {
                product_id,
                quantity: 1,
            })
            .into_iter()
            .collect(),
        meta_data: vec![
            MetaData::new(PENDING_ENROLLMENT_KEY, "yes"),
            MetaData::new(COURSE_IDS_KEY, Value::from(vec![course.as_u64()])),
        ],
        set_paid: false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    fn order_with_meta(meta: Value) -> Order {
        serde_json::from_value(json!({
            "id": 1,
            "status": "processing",
            "customer_id": 5,
            "meta_data": meta
        }))
        .unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<CourseId> {
        raw.iter().copied().map(CourseId::new).collect()
    }

    #[test]
    fn test_course_ids_json_array() {
        assert_eq!(parse_course_ids(&json!([3, 1, 2])), ids(&[3, 1, 2]));
    }

    #[test]
    fn test_course_ids_encoded_array_string() {
        assert_eq!(parse_course_ids(&json!("[10, \"11\"]")), ids(&[10, 11]));
    }

    #[test]
    fn test_course_ids_separated_list() {
        assert_eq!(parse_course_ids(&json!("4, 5 6,,7")), ids(&[4, 5, 6, 7]));
    }

    #[test]
    fn test_course_ids_single_number() {
        assert_eq!(parse_course_ids(&json!(42)), ids(&[42]));
        assert_eq!(parse_course_ids(&json!("42")), ids(&[42]));
    }

    #[test]
    fn test_course_ids_skip_invalid_and_dedupe() {
        assert_eq!(
            parse_course_ids(&json!(["7", "abc", 0, -3, 7, 8, null, 8])),
            ids(&[7, 8])
        );
    }

    #[test]
    fn test_pending_enrollment_requires_flag() {
        let order = order_with_meta(json!([
            { "key": "_enrollment_course_ids", "value": [1] }
        ]));
        assert_eq!(pending_enrollment(&order), None);

        let order = order_with_meta(json!([
            { "key": "_pending_enrollment", "value": "no" },
            { "key": "_enrollment_course_ids", "value": [1] }
        ]));
        assert_eq!(pending_enrollment(&order), None);
    }

    #[test]
    fn test_pending_enrollment_flag_variants() {
        for flag in [json!("yes"), json!("TRUE"), json!("1"), json!(1), json!(true)] {
            let order = order_with_meta(json!([
                { "key": "_pending_enrollment", "value": flag },
                { "key": "_enrollment_course_ids", "value": "9" }
            ]));
            assert_eq!(pending_enrollment(&order), Some(ids(&[9])));
        }
    }

    #[test]
    fn test_pending_enrollment_without_courses_is_none() {
        let order = order_with_meta(json!([
            { "key": "_pending_enrollment", "value": "yes" },
            { "key": "_enrollment_course_ids", "value": "none" }
        ]));
        assert_eq!(pending_enrollment(&order), None);
    }

    #[test]
    fn test_failure_warning_format() {
        let failed = vec![
            CourseFailure {
                course_id: CourseId::new(3),
                reason: "boom".to_owned(),
            },
            CourseFailure {
                course_id: CourseId::new(8),
                reason: "nope".to_owned(),
            },
        ];
        assert_eq!(
            failure_warning(&failed, 5),
            "Enrollment failed for 2 of 5 courses: 3: boom; 8: nope"
        );
    }

    #[test]
    fn test_shape_one_user() {
        let request = BatchEnrollRequest {
            user_id: Some(WpUserId::new(1)),
            course_ids: ids(&[1, 2]),
            ..BatchEnrollRequest::default()
        };
        assert_eq!(
            request.shape().unwrap(),
            BatchShape::OneUser {
                user: WpUserId::new(1),
                courses: ids(&[1, 2])
            }
        );
    }

    #[test]
    fn test_shape_many_users() {
        let request = BatchEnrollRequest {
            user_ids: vec![WpUserId::new(1), WpUserId::new(2)],
            course_id: Some(CourseId::new(5)),
            ..BatchEnrollRequest::default()
        };
        assert!(matches!(
            request.shape().unwrap(),
            BatchShape::ManyUsers { .. }
        ));
    }

    #[test]
    fn test_shape_rejects_both_and_neither() {
        let both = BatchEnrollRequest {
            user_id: Some(WpUserId::new(1)),
            course_ids: ids(&[1]),
            user_ids: vec![WpUserId::new(2)],
            course_id: Some(CourseId::new(5)),
            ..BatchEnrollRequest::default()
        };
        assert!(matches!(
            both.shape(),
            Err(EnrollmentError::InvalidRequest(_))
        ));

        assert!(matches!(
            BatchEnrollRequest::default().shape(),
            Err(EnrollmentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_shape_rejects_empty_lists() {
        let request = BatchEnrollRequest {
            user_id: Some(WpUserId::new(1)),
            ..BatchEnrollRequest::default()
        };
        assert!(matches!(
            request.shape(),
            Err(EnrollmentError::InvalidRequest(_))
        ));

        let request = BatchEnrollRequest {
            course_id: Some(CourseId::new(1)),
            ..BatchEnrollRequest::default()
        };
        assert!(matches!(
            request.shape(),
            Err(EnrollmentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_shape_rejects_duplicate_ids() {
        let request = BatchEnrollRequest {
            user_ids: vec![WpUserId::new(7), WpUserId::new(8), WpUserId::new(7)],
            course_id: Some(CourseId::new(3)),
            ..BatchEnrollRequest::default()
        };
        let Err(EnrollmentError::InvalidRequest(message)) = request.shape() else {
            panic!("duplicate user_ids accepted");
        };
        assert_eq!(message, "user_ids lists 7 more than once");

        let request = BatchEnrollRequest {
            user_id: Some(WpUserId::new(1)),
            course_ids: ids(&[4, 4]),
            ..BatchEnrollRequest::default()
        };
        assert!(matches!(
            request.shape(),
            Err(EnrollmentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_pending_order_shape() {
        let order = pending_order(WpUserId::new(12), CourseId::new(99), Some(ProductId::new(7)));
        assert_eq!(order.customer_id, 12);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.line_items.len(), 1);

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["meta_data"][0]["key"], "_pending_enrollment");
        assert_eq!(body["meta_data"][0]["value"], "yes");
        assert_eq!(body["meta_data"][1]["value"], json!([99]));
        assert_eq!(body["status"], "pending");
    }

    #[test]
    fn test_pending_order_without_product_has_no_line_items() {
        let order = pending_order(WpUserId::new(1), CourseId::new(2), None);
        let body = serde_json::to_value(&order).unwrap();
        assert!(body.get("line_items").is_none());
    }

    // =========================================================================
    // Workflow against in-memory gateways
    // =========================================================================

    /// One order, mutated the way WooCommerce applies updates.
    struct FakeOrders {
        order: Mutex<Order>,
        created: Mutex<Vec<NewOrder>>,
        reject_status: bool,
        /// Customer IDs whose order creation fails.
        reject_customers: HashSet<u64>,
    }

    impl FakeOrders {
        fn new(order: Order) -> Self {
            Self {
                order: Mutex::new(order),
                created: Mutex::new(Vec::new()),
                reject_status: false,
                reject_customers: HashSet::new(),
            }
        }

        fn current(&self) -> Order {
            self.order.lock().unwrap().clone()
        }
    }

    fn refused(code: &str) -> WordPressError {
        WordPressError::Api {
            status: 400,
            code: code.to_owned(),
            message: code.replace('_', " "),
        }
    }

    #[async_trait]
    impl OrderGateway for FakeOrders {
        async fn get_order(&self, _id: WcOrderId) -> Result<Order, WordPressError> {
            Ok(self.current())
        }

        async fn update_status(
            &self,
            _id: WcOrderId,
            status: &OrderStatus,
        ) -> Result<Order, WordPressError> {
            if self.reject_status {
                return Err(refused("invalid_status"));
            }
            let mut order = self.order.lock().unwrap();
            order.status = status.clone();
            Ok(order.clone())
        }

        async fn update_meta(
            &self,
            _id: WcOrderId,
            meta: &[MetaData],
        ) -> Result<Order, WordPressError> {
            let mut order = self.order.lock().unwrap();
            for entry in meta {
                match order.meta_data.iter_mut().find(|m| m.key == entry.key) {
                    Some(existing) => existing.value = entry.value.clone(),
                    None => order.meta_data.push(entry.clone()),
                }
            }
            Ok(order.clone())
        }

        async fn create_order(&self, new: &NewOrder) -> Result<Order, WordPressError> {
            if self.reject_customers.contains(&new.customer_id) {
                return Err(refused("invalid_customer"));
            }
            let mut created = self.created.lock().unwrap();
            created.push(new.clone());
            let id = 1000 + created.len() as u64;
            Ok(serde_json::from_value(json!({
                "id": id,
                "status": "pending",
                "customer_id": new.customer_id,
                "meta_data": new.meta_data,
            }))
            .unwrap())
        }
    }

    /// Records enrollments; repeated ones succeed like Tutor's "already
    /// enrolled" through the real gateway.
    #[derive(Default)]
    struct FakeTutor {
        enrolled: Mutex<HashSet<(WpUserId, CourseId)>>,
        failing: Mutex<HashSet<CourseId>>,
        calls: Mutex<usize>,
    }

    impl FakeTutor {
        fn failing(courses: &[u64]) -> Self {
            let tutor = Self::default();
            *tutor.failing.lock().unwrap() = courses.iter().copied().map(CourseId::new).collect();
            tutor
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl EnrollmentGateway for FakeTutor {
        async fn enroll(&self, user: WpUserId, course: CourseId) -> Result<(), WordPressError> {
            *self.calls.lock().unwrap() += 1;
            if self.failing.lock().unwrap().contains(&course) {
                return Err(refused("course_unavailable"));
            }
            self.enrolled.lock().unwrap().insert((user, course));
            Ok(())
        }
    }

    fn pending_order_json(customer_id: u64, courses: &Value) -> Order {
        serde_json::from_value(json!({
            "id": 727,
            "status": "processing",
            "customer_id": customer_id,
            "meta_data": [
                { "id": 1, "key": PENDING_ENROLLMENT_KEY, "value": "yes" },
                { "id": 2, "key": COURSE_IDS_KEY, "value": courses }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_reconcile_enrolls_and_clears_flag() {
        let orders = FakeOrders::new(pending_order_json(12, &json!([10, 11])));
        let tutor = FakeTutor::default();

        let outcome =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
                .await
                .unwrap();

        assert_eq!(outcome.enrolled, ids(&[10, 11]));
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.order.status, OrderStatus::Completed);
        assert!(pending_enrollment(&orders.current()).is_none());
        assert!(orders.current().meta(COMPLETED_AT_KEY).is_some());
    }

    #[tokio::test]
    async fn test_reconcile_retry_finishes_failed_courses() {
        let orders = FakeOrders::new(pending_order_json(12, &json!("10,11")));
        let tutor = FakeTutor::failing(&[11]);

        let first =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
                .await
                .unwrap();
        assert_eq!(first.enrolled, ids(&[10]));
        assert_eq!(first.failed.len(), 1);
        assert!(first.warning.unwrap().starts_with("Enrollment failed for 1 of 2 courses: 11:"));
        // Flag stays so the next completed request retries
        assert_eq!(pending_enrollment(&orders.current()), Some(ids(&[10, 11])));

        tutor.failing.lock().unwrap().clear();
        let second =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
                .await
                .unwrap();
        assert_eq!(second.enrolled, ids(&[10, 11]));
        assert!(second.warning.is_none());
        assert!(pending_enrollment(&orders.current()).is_none());

        // A third request finds nothing pending
        let calls = tutor.calls();
        reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(tutor.calls(), calls);
    }

    #[tokio::test]
    async fn test_reconcile_status_failure_enrolls_nothing() {
        let mut orders = FakeOrders::new(pending_order_json(12, &json!([10])));
        orders.reject_status = true;
        let tutor = FakeTutor::default();

        let result =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
                .await;

        assert!(matches!(result, Err(EnrollmentError::Order { .. })));
        assert_eq!(tutor.calls(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_guest_order_warns() {
        let orders = FakeOrders::new(pending_order_json(0, &json!([10])));
        let tutor = FakeTutor::default();

        let outcome =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::Completed)
                .await
                .unwrap();

        assert_eq!(outcome.warning.as_deref(), Some(NO_CUSTOMER_WARNING));
        assert_eq!(tutor.calls(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_non_completed_status_only_updates() {
        let orders = FakeOrders::new(pending_order_json(12, &json!([10])));
        let tutor = FakeTutor::default();

        let outcome =
            reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::OnHold)
                .await
                .unwrap();

        assert_eq!(outcome.order.status, OrderStatus::OnHold);
        assert!(outcome.enrolled.is_empty());
        assert_eq!(tutor.calls(), 0);
        assert!(pending_enrollment(&orders.current()).is_some());
    }

    #[tokio::test]
    async fn test_batch_keeps_one_result_per_input() {
        let orders = FakeOrders::new(pending_order_json(1, &json!([1])));
        let tutor = FakeTutor::failing(&[3]);
        let request = BatchEnrollRequest {
            user_id: Some(WpUserId::new(12)),
            course_ids: ids(&[1, 2, 3, 4, 5]),
            ..BatchEnrollRequest::default()
        };

        let outcome = batch_enroll(&orders, &tutor, &request, 2).await.unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.items.len(), 5);
        assert_eq!(outcome.succeeded, 4);
        assert_eq!(outcome.failed, 1);
        let course_ids: Vec<_> = outcome.items.iter().map(|i| i.course_id).collect();
        assert_eq!(course_ids, ids(&[1, 2, 3, 4, 5]));
        assert!(!outcome.items[2].success);
        assert!(orders.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_many_users_creates_one_order_each() {
        let mut orders = FakeOrders::new(pending_order_json(1, &json!([1])));
        orders.reject_customers.insert(21);
        let tutor = FakeTutor::default();
        let request = BatchEnrollRequest {
            user_ids: (20..25).map(WpUserId::new).collect(),
            course_id: Some(CourseId::new(7)),
            ..BatchEnrollRequest::default()
        };

        let outcome = batch_enroll(&orders, &tutor, &request, 10).await.unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.succeeded, 4);
        assert!(outcome.items[1].order_id.is_none());
        assert!(outcome.items[0].order_id.is_some());
        assert_eq!(tutor.calls(), 0);

        let created = orders.created.lock().unwrap();
        assert_eq!(created.len(), 4);
        assert!(created.iter().all(|o| o.status == OrderStatus::Pending));
    }

    #[tokio::test]
    async fn test_batch_repeated_user_creates_no_orders() {
        let orders = FakeOrders::new(pending_order_json(1, &json!([1])));
        let tutor = FakeTutor::default();
        let request = BatchEnrollRequest {
            user_ids: vec![WpUserId::new(7); 3],
            course_id: Some(CourseId::new(3)),
            ..BatchEnrollRequest::default()
        };

        let result = batch_enroll(&orders, &tutor, &request, 10).await;

        assert!(matches!(result, Err(EnrollmentError::InvalidRequest(_))));
        assert!(orders.created.lock().unwrap().is_empty());
        assert_eq!(tutor.calls(), 0);
    }
}
