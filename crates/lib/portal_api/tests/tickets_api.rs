//! Ticket routes against a mock helpdesk.

mod common;

use axum::http::StatusCode;
use common::{DIRECTORY_PASSWORD, TestApp, app, body_json, json_request};
use httpmock::prelude::*;
use portal_core::store::{TicketStore, UserStore};
use serde_json::json;

async fn employee(app: &TestApp) -> String {
    app.login("/auth/employee/login", "john.doe", DIRECTORY_PASSWORD)
        .await
}

async fn active_customer(app: &TestApp, username: &str) -> String {
    let email = format!("{username}@example.com");
    app.post_json(
        "/auth/customer/register",
        json!({"username": username, "email": email, "password": "Secret55"}),
        None,
    )
    .await;
    let user = app
        .store
        .user_by_username(username)
        .await
        .unwrap()
        .unwrap();
    let admin = app
        .login("/auth/employee/login", "admin", DIRECTORY_PASSWORD)
        .await;
    let resp = app
        .post_json(
            &format!("/admin/approve-customer/{}", user.id),
            json!({}),
            Some(&admin),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.login("/auth/customer/login", username, "Secret55").await
}

async fn mock_existing_customer(app: &TestApp, id: i64, email: &str) {
    let email = email.to_string();
    app.helpdesk
        .mock_async(move |when, then| {
            when.method(GET).path("/api/v1/users/search");
            then.status(200).json_body(json!([{"id": id, "email": email}]));
        })
        .await;
}

#[tokio::test]
async fn tickets_require_a_session() {
    let app = app().await;
    assert_eq!(
        app.get("/tickets", None).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.post_json("/tickets", json!({"subject": "x"}), None)
            .await
            .status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn blank_ticket_is_rejected_before_the_helpdesk() {
    let app = app().await;
    let cookie = employee(&app).await;
    let resp = app.post_json("/tickets", json!({}), Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err = body_json(resp).await;
    assert_eq!(err["error"], "validation_error");
    assert_eq!(err["fields"][0]["field"], "subject");
    assert_eq!(err["fields"][1]["field"], "description");
    assert_eq!(app.store.count_tickets().await.unwrap(), 0);
}

#[tokio::test]
async fn helpdesk_failure_leaves_no_local_ticket() {
    let app = app().await;
    let cookie = employee(&app).await;
    mock_existing_customer(&app, 40, "john.doe@corp.example").await;
    app.helpdesk
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/tickets");
            then.status(500).body("boom");
        })
        .await;

    let resp = app
        .post_json(
            "/tickets",
            json!({"subject": "Printer", "description": "Jammed again"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["error"], "external_unavailable");
    assert_eq!(app.store.count_tickets().await.unwrap(), 0);
}

#[tokio::test]
async fn created_ticket_is_listed_once_with_mapped_fields() {
    let app = app().await;
    let cookie = employee(&app).await;
    let mut unknown_customer = app
        .helpdesk
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/users/search")
                .header("authorization", "Token token=test-token");
            then.status(200).json_body(json!([]));
        })
        .await;
    let new_customer = app
        .helpdesk
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/users")
                .body_includes("\"email\":\"john.doe@corp.example\"");
            then.status(201)
                .json_body(json!({"id": 41, "email": "john.doe@corp.example"}));
        })
        .await;
    let create = app
        .helpdesk
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/tickets")
                .body_includes("\"customer_id\":41")
                .body_includes("\"priority_id\":4")
                .body_includes("\"group\":\"Users\"");
            then.status(201).json_body(
                json!({"id": 900, "title": "VPN down", "state_id": 1, "priority_id": 4}),
            );
        })
        .await;

    let resp = app
        .post_json(
            "/tickets",
            json!({"subject": "VPN down", "description": "No tunnel since 9am", "priority": "critical"}),
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["ticket"]["ticketId"], "900");
    assert_eq!(created["ticket"]["status"], "open");
    assert_eq!(created["ticket"]["priority"], "critical");
    new_customer.assert_async().await;
    create.assert_async().await;

    // The helpdesk now knows the customer.
    unknown_customer.delete_async().await;
    mock_existing_customer(&app, 41, "john.doe@corp.example").await;
    app.helpdesk
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/tickets/search")
                .query_param("query", "customer.id:41");
            then.status(200).json_body(json!([
                {"id": 900, "title": "VPN down", "state_id": 7, "priority_id": 4}
            ]));
        })
        .await;

    let resp = app.get("/tickets", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = body_json(resp).await;
    let tickets = listed["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["ticketId"], "900");
    assert_eq!(tickets[0]["status"], "closed");
    assert_eq!(app.store.count_tickets().await.unwrap(), 1);
}

#[tokio::test]
async fn customers_cannot_read_other_accounts_tickets() {
    let app = app().await;
    let staff = employee(&app).await;
    mock_existing_customer(&app, 40, "john.doe@corp.example").await;
    app.helpdesk
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/tickets");
            then.status(201)
                .json_body(json!({"id": 77, "title": "Laptop", "state_id": 1, "priority_id": 2}));
        })
        .await;
    let created = body_json(
        app.post_json(
            "/tickets",
            json!({"subject": "Laptop", "description": "Battery swollen"}),
            Some(&staff),
        )
        .await,
    )
    .await;
    let id = created["ticket"]["id"].as_i64().unwrap();

    let customer = active_customer(&app, "outsider").await;
    let resp = app.get(&format!("/tickets/{id}"), Some(&customer)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "forbidden");
}

#[tokio::test]
async fn updating_unknown_or_malformed_ids() {
    let app = app().await;
    let cookie = employee(&app).await;

    let resp = app
        .send(json_request(
            "PATCH",
            "/tickets/4242",
            json!({"status": "closed"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "not_found");

    let resp = app
        .send(json_request(
            "PATCH",
            "/tickets/not-a-number",
            json!({"status": "closed"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_writes_helpdesk_then_portal() {
    let app = app().await;
    let cookie = employee(&app).await;
    mock_existing_customer(&app, 40, "john.doe@corp.example").await;
    app.helpdesk
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/tickets");
            then.status(201)
                .json_body(json!({"id": 55, "title": "Badge", "state_id": 1, "priority_id": 2}));
        })
        .await;
    let created = body_json(
        app.post_json(
            "/tickets",
            json!({"subject": "Badge", "description": "Does not open door 3"}),
            Some(&cookie),
        )
        .await,
    )
    .await;
    let id = created["ticket"]["id"].as_i64().unwrap();

    let put = app
        .helpdesk
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v1/tickets/55")
                .body_includes("\"state_id\":2");
            then.status(200)
                .json_body(json!({"id": 55, "title": "Badge", "state_id": 2, "priority_id": 2}));
        })
        .await;

    let resp = app
        .send(json_request(
            "PATCH",
            &format!("/tickets/{id}"),
            json!({"status": "in_progress"}),
            Some(&cookie),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["ticket"]["status"], "in_progress");
    put.assert_async().await;
}
