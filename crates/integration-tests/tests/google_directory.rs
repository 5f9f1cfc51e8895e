//! Google Workspace Directory client against a mock token endpoint and API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use deskops_integration_tests::google_config;
use deskops_server::google::{DirectoryClient, DirectoryQuery, GoogleError};

fn client(server: &MockServer) -> DirectoryClient {
    let api_base = Url::parse(&format!("{}/admin/directory/v1/", server.base_url())).unwrap();
    DirectoryClient::with_endpoints(&google_config(), &server.url("/token"), api_base).unwrap()
}

fn token_mock(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/token")
            .header("content-type", "application/x-www-form-urlencoded");
        then.status(200).json_body(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        }));
    })
}

fn user_json(id: &str, email: &str, suspended: bool) -> serde_json::Value {
    json!({
        "id": id,
        "primaryEmail": email,
        "name": { "givenName": "Jane", "familyName": "Doe", "fullName": "Jane Doe" },
        "suspended": suspended,
        "isAdmin": false,
        "orgUnitPath": "/"
    })
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let server = MockServer::start();
    let token = token_mock(&server);
    let users = server.mock(|when, then| {
        when.method(GET)
            .path("/admin/directory/v1/users")
            .query_param("customer", "my_customer")
            .query_param("orderBy", "email")
            .header("authorization", "Bearer ya29.test-token");
        then.status(200).json_body(json!({
            "users": [user_json("1001", "jane@example.com", false)],
            "nextPageToken": "page-2"
        }));
    });

    let client = client(&server);
    let first = client.list_users(&DirectoryQuery::default()).await.unwrap();
    let second = client.list_users(&DirectoryQuery::default()).await.unwrap();

    token.assert_calls(1);
    users.assert_calls(2);
    assert_eq!(first.users.len(), 1);
    assert_eq!(first.users[0].primary_email, "jane@example.com");
    assert_eq!(second.next_page_token.as_deref(), Some("page-2"));
}

#[tokio::test]
async fn test_max_results_is_clamped() {
    let server = MockServer::start();
    token_mock(&server);
    let users = server.mock(|when, then| {
        when.method(GET)
            .path("/admin/directory/v1/users")
            .query_param("maxResults", "500")
            .query_param("query", "email:jane*");
        then.status(200).json_body(json!({}));
    });

    let page = client(&server)
        .list_users(&DirectoryQuery {
            max_results: Some(10_000),
            query: Some("email:jane*".to_owned()),
            page_token: None,
        })
        .await
        .unwrap();

    users.assert();
    assert!(page.users.is_empty());
}

#[tokio::test]
async fn test_get_user_not_found() {
    let server = MockServer::start();
    token_mock(&server);
    server.mock(|when, then| {
        when.method(GET).path("/admin/directory/v1/users/9999");
        then.status(404).json_body(json!({
            "error": { "code": 404, "message": "Resource Not Found: userKey" }
        }));
    });

    let err = client(&server).get_user("9999").await.unwrap_err();

    match err {
        GoogleError::NotFound(message) => assert_eq!(message, "Resource Not Found: userKey"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_suspend_user() {
    let server = MockServer::start();
    token_mock(&server);
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/admin/directory/v1/users/1001")
            .json_body(json!({ "suspended": true }));
        then.status(200)
            .json_body(user_json("1001", "jane@example.com", true));
    });

    let user = client(&server).set_suspended("1001", true).await.unwrap();

    patch.assert();
    assert!(user.suspended);
}

#[tokio::test]
async fn test_unauthorized_drops_cached_token() {
    let server = MockServer::start();
    let token = token_mock(&server);
    server.mock(|when, then| {
        when.method(GET).path("/admin/directory/v1/users/1001");
        then.status(401).json_body(json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        }));
    });

    let client = client(&server);
    let first = client.get_user("1001").await.unwrap_err();
    let second = client.get_user("1001").await.unwrap_err();

    assert!(matches!(first, GoogleError::Api { status: 401, .. }));
    assert!(matches!(second, GoogleError::Api { status: 401, .. }));
    // Each 401 forces a fresh token exchange
    token.assert_calls(2);
}

#[tokio::test]
async fn test_token_endpoint_refusal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(400).json_body(json!({
            "error": "unauthorized_client",
            "error_description": "Client is unauthorized to retrieve access tokens using this method"
        }));
    });

    let err = client(&server)
        .list_users(&DirectoryQuery::default())
        .await
        .unwrap_err();

    match err {
        GoogleError::Auth(message) => assert!(message.contains("unauthorized")),
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[test]
fn test_owns_email() {
    let server = MockServer::start();
    let client = client(&server);

    assert!(client.owns_email("jane@example.com"));
    assert!(client.owns_email("jane@EXAMPLE.com"));
    assert!(!client.owns_email("jane@example.org"));
    assert!(!client.owns_email("not-an-email"));
}
