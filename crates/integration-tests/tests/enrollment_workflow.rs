//! Order reconciliation, batch enrollment and suspension driven through the
//! real HTTP clients against a mock WordPress site.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use httpmock::prelude::*;
use serde_json::json;

use deskops_core::{CourseId, OrderStatus, ProductId, WcOrderId, WpUserId};
use deskops_integration_tests::{order_json, woocommerce_config, wordpress_config};
use deskops_server::services::enrollment::NO_CUSTOMER_WARNING;
use deskops_server::services::{
    BatchEnrollRequest, batch_enroll, reconcile_order_status, suspend_users, unsuspend_users,
};
use deskops_server::wordpress::{TutorClient, WooCommerceClient, WordPressClient};

const ORDER: &str = "/wp-json/wc/v3/orders/727";
const ENROLLMENTS: &str = "/wp-json/tutor/v1/enrollments";

fn clients(server: &MockServer) -> (WooCommerceClient, TutorClient) {
    (
        WooCommerceClient::new(&woocommerce_config(server)).unwrap(),
        TutorClient::new(&wordpress_config(server)).unwrap(),
    )
}

fn enrolled() -> serde_json::Value {
    json!({ "code": "success", "message": "Enrolled", "data": null })
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_completing_order_enrolls_pending_courses() {
    let server = MockServer::start();
    let read = server.mock(|when, then| {
        when.method(GET).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "processing", 12, Some(json!("10, 11"))));
    });
    let status = server.mock(|when, then| {
        when.method(PUT)
            .path(ORDER)
            .json_body(json!({ "status": "completed" }));
        then.status(200)
            .json_body(order_json(727, "completed", 12, Some(json!("10, 11"))));
    });
    let course_10 = server.mock(|when, then| {
        when.method(POST)
            .path(ENROLLMENTS)
            .json_body(json!({ "user_id": 12, "course_id": 10 }));
        then.status(200).json_body(enrolled());
    });
    let course_11 = server.mock(|when, then| {
        when.method(POST)
            .path(ENROLLMENTS)
            .json_body(json!({ "user_id": 12, "course_id": 11 }));
        then.status(200).json_body(json!({
            "code": "already_enrolled",
            "message": "User already enrolled in this course",
            "data": null
        }));
    });
    let clear = server.mock(|when, then| {
        when.method(PUT)
            .path(ORDER)
            .body_includes("_enrollment_completed_at");
        then.status(200).json_body(order_json(727, "completed", 12, None));
    });

    let (orders, tutor) = clients(&server);
    let outcome = reconcile_order_status(
        &orders,
        &tutor,
        WcOrderId::new(727),
        &OrderStatus::Completed,
    )
    .await
    .unwrap();

    read.assert();
    status.assert();
    course_10.assert();
    course_11.assert();
    clear.assert();
    assert_eq!(outcome.enrolled.len(), 2);
    assert!(outcome.failed.is_empty());
    assert!(outcome.warning.is_none());
    assert_eq!(outcome.order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_failed_course_keeps_pending_flag() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "processing", 12, Some(json!([10, 11]))));
    });
    server.mock(|when, then| {
        when.method(PUT)
            .path(ORDER)
            .json_body(json!({ "status": "completed" }));
        then.status(200)
            .json_body(order_json(727, "completed", 12, Some(json!([10, 11]))));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(ENROLLMENTS)
            .json_body(json!({ "user_id": 12, "course_id": 10 }));
        then.status(200).json_body(enrolled());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(ENROLLMENTS)
            .json_body(json!({ "user_id": 12, "course_id": 11 }));
        then.status(500).json_body(json!({
            "code": "internal_server_error",
            "message": "There has been a critical error on this website."
        }));
    });
    let clear = server.mock(|when, then| {
        when.method(PUT)
            .path(ORDER)
            .body_includes("_enrollment_completed_at");
        then.status(200).json_body(order_json(727, "completed", 12, None));
    });

    let (orders, tutor) = clients(&server);
    let outcome = reconcile_order_status(
        &orders,
        &tutor,
        WcOrderId::new(727),
        &OrderStatus::Completed,
    )
    .await
    .unwrap();

    clear.assert_calls(0);
    assert_eq!(outcome.enrolled, vec![CourseId::new(10)]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].course_id, CourseId::new(11));
    let warning = outcome.warning.unwrap();
    assert!(warning.starts_with("Enrollment failed for 1 of 2 courses"));
}

#[tokio::test]
async fn test_other_status_changes_skip_enrollment() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "pending", 12, Some(json!([10]))));
    });
    server.mock(|when, then| {
        when.method(PUT).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "on-hold", 12, Some(json!([10]))));
    });
    let enroll = server.mock(|when, then| {
        when.method(POST).path(ENROLLMENTS);
        then.status(200).json_body(enrolled());
    });

    let (orders, tutor) = clients(&server);
    let outcome = reconcile_order_status(&orders, &tutor, WcOrderId::new(727), &OrderStatus::OnHold)
        .await
        .unwrap();

    enroll.assert_calls(0);
    assert!(outcome.enrolled.is_empty());
    assert!(outcome.warning.is_none());
}

#[tokio::test]
async fn test_guest_order_with_pending_courses_warns() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "processing", 0, Some(json!([10]))));
    });
    server.mock(|when, then| {
        when.method(PUT).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "completed", 0, Some(json!([10]))));
    });
    let enroll = server.mock(|when, then| {
        when.method(POST).path(ENROLLMENTS);
        then.status(200).json_body(enrolled());
    });

    let (orders, tutor) = clients(&server);
    let outcome = reconcile_order_status(
        &orders,
        &tutor,
        WcOrderId::new(727),
        &OrderStatus::Completed,
    )
    .await
    .unwrap();

    enroll.assert_calls(0);
    assert_eq!(outcome.warning.as_deref(), Some(NO_CUSTOMER_WARNING));
}

#[tokio::test]
async fn test_status_update_failure_enrolls_nothing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(ORDER);
        then.status(200)
            .json_body(order_json(727, "processing", 12, Some(json!([10]))));
    });
    server.mock(|when, then| {
        when.method(PUT).path(ORDER);
        then.status(400).json_body(json!({
            "code": "woocommerce_rest_invalid_status",
            "message": "Invalid order status."
        }));
    });
    let enroll = server.mock(|when, then| {
        when.method(POST).path(ENROLLMENTS);
        then.status(200).json_body(enrolled());
    });

    let (orders, tutor) = clients(&server);
    let result = reconcile_order_status(
        &orders,
        &tutor,
        WcOrderId::new(727),
        &OrderStatus::Completed,
    )
    .await;

    assert!(result.is_err());
    enroll.assert_calls(0);
}

// =============================================================================
// Batch enrollment
// =============================================================================

#[tokio::test]
async fn test_batch_one_user_enrolls_directly() {
    let server = MockServer::start();
    let enroll = server.mock(|when, then| {
        when.method(POST).path(ENROLLMENTS);
        then.status(200).json_body(enrolled());
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/wp-json/wc/v3/orders");
        then.status(201).json_body(order_json(1, "pending", 12, None));
    });

    let (orders, tutor) = clients(&server);
    let request = BatchEnrollRequest {
        user_id: Some(WpUserId::new(12)),
        course_ids: vec![CourseId::new(10), CourseId::new(11), CourseId::new(12)],
        ..BatchEnrollRequest::default()
    };
    let outcome = batch_enroll(&orders, &tutor, &request, 2).await.unwrap();

    enroll.assert_calls(3);
    create.assert_calls(0);
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.succeeded, 3);
    assert!(outcome.items.iter().all(|i| i.order_id.is_none()));
}

#[tokio::test]
async fn test_batch_many_users_creates_pending_orders() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-json/wc/v3/orders")
            .body_includes("\"customer_id\":12");
        then.status(201)
            .json_body(order_json(901, "pending", 12, Some(json!([10]))));
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-json/wc/v3/orders")
            .body_includes("\"customer_id\":13");
        then.status(400).json_body(json!({
            "code": "woocommerce_rest_invalid_customer_id",
            "message": "Invalid customer ID."
        }));
    });
    let enroll = server.mock(|when, then| {
        when.method(POST).path(ENROLLMENTS);
        then.status(200).json_body(enrolled());
    });

    let (orders, tutor) = clients(&server);
    let request = BatchEnrollRequest {
        user_ids: vec![WpUserId::new(12), WpUserId::new(13)],
        course_id: Some(CourseId::new(10)),
        product_id: Some(ProductId::new(99)),
        ..BatchEnrollRequest::default()
    };
    let outcome = batch_enroll(&orders, &tutor, &request, 10).await.unwrap();

    first.assert();
    second.assert();
    enroll.assert_calls(0);
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    // Items stay in input order
    assert_eq!(outcome.items[0].user_id, WpUserId::new(12));
    assert_eq!(outcome.items[0].order_id, Some(WcOrderId::new(901)));
    assert_eq!(outcome.items[1].user_id, WpUserId::new(13));
    assert!(outcome.items[1].error.is_some());
}

#[tokio::test]
async fn test_batch_rejects_mixed_shapes() {
    let server = MockServer::start();
    let (orders, tutor) = clients(&server);
    let request = BatchEnrollRequest {
        user_id: Some(WpUserId::new(12)),
        course_id: Some(CourseId::new(10)),
        ..BatchEnrollRequest::default()
    };

    assert!(batch_enroll(&orders, &tutor, &request, 10).await.is_err());
}

// =============================================================================
// Suspension
// =============================================================================

#[tokio::test]
async fn test_suspend_then_unsuspend_restores_roles() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/wp-json/wp/v2/users/7");
        then.status(200)
            .json_body(json!({ "id": 7, "name": "Ada", "roles": ["editor", "author"] }));
    });
    let strip = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-json/wp/v2/users/7")
            .json_body(json!({ "roles": [] }));
        then.status(200)
            .json_body(json!({ "id": 7, "name": "Ada", "roles": [] }));
    });
    let restore = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-json/wp/v2/users/7")
            .json_body(json!({ "roles": ["editor", "author"] }));
        then.status(200)
            .json_body(json!({ "id": 7, "name": "Ada", "roles": ["editor", "author"] }));
    });

    let client = WordPressClient::new(&wordpress_config(&server)).unwrap();
    let id = WpUserId::new(7);

    let suspended = suspend_users(&client, &[id], 10).await;
    strip.assert();
    assert_eq!(suspended.succeeded, 1);
    assert_eq!(suspended.results[0].roles, vec!["editor", "author"]);

    let remembered = HashMap::from([(id, suspended.results[0].roles.clone())]);
    let restored = unsuspend_users(&client, &[id], &remembered, 10).await;
    restore.assert();
    assert_eq!(restored.succeeded, 1);
}

#[tokio::test]
async fn test_unsuspend_without_memory_uses_subscriber() {
    let server = MockServer::start();
    let restore = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-json/wp/v2/users/8")
            .json_body(json!({ "roles": ["subscriber"] }));
        then.status(200)
            .json_body(json!({ "id": 8, "name": "Bob", "roles": ["subscriber"] }));
    });

    let client = WordPressClient::new(&wordpress_config(&server)).unwrap();
    let outcome = unsuspend_users(&client, &[WpUserId::new(8)], &HashMap::new(), 10).await;

    restore.assert();
    assert_eq!(outcome.results[0].roles, vec!["subscriber"]);
}
