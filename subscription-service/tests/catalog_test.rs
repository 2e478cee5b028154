//! Users, catalog and pricing-override integration tests.

mod common;

use common::{decimal, id_of, TestApp};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

#[tokio::test]
async fn user_crud_round_trip() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/api/users",
            json!({ "tg_id": 42, "username": "alice", "fullname": "Alice" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = id_of(response, "user_id").await;

    let response = app.get("/api/users/tgid/42").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["is_admin"], false);

    let response = app
        .patch(
            &format!("/api/users/{}", user_id),
            json!({ "fullname": "Alice Liddell" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fullname"], "Alice Liddell");
    assert_eq!(body["username"], "alice");

    let response = app.delete(&format!("/api/users/{}", user_id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/users/{}", user_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_tg_id_is_a_conflict() {
    let app = TestApp::spawn().await;
    let body = json!({ "tg_id": 7, "username": "bob" });

    assert_eq!(
        app.post("/api/users", body.clone()).await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        app.post("/api/users", body).await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn non_positive_tg_id_fails_validation() {
    let app = TestApp::spawn().await;

    let response = app.post("/api/users", json!({ "tg_id": 0 })).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn user_list_is_paginated() {
    let app = TestApp::spawn().await;
    for _ in 0..3 {
        app.create_user(false).await;
    }

    let page: Vec<Value> = app
        .get("/api/users?limit=2&offset=0")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    let rest: Vec<Value> = app
        .get("/api/users?limit=2&offset=2")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
}

#[tokio::test]
async fn subscription_requires_usd_or_eur() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/api/subscriptions",
            json!({
                "service_name": "Kinopoisk",
                "base_price": "299",
                "base_currency": "RUB",
                "period_days": 30
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscription_rejects_negative_price_and_zero_period() {
    let app = TestApp::spawn().await;

    let negative = app
        .post(
            "/api/subscriptions",
            json!({
                "service_name": "Netflix",
                "base_price": "-1",
                "base_currency": "USD",
                "period_days": 30
            }),
        )
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let zero_period = app
        .post(
            "/api/subscriptions",
            json!({
                "service_name": "Netflix",
                "base_price": "15.49",
                "base_currency": "USD",
                "period_days": 0
            }),
        )
        .await;
    assert_eq!(zero_period.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn duplicate_service_name_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.create_subscription("Spotify", "10.99", "EUR").await;

    let response = app
        .post(
            "/api/subscriptions",
            json!({
                "service_name": "Spotify",
                "base_price": "11.99",
                "base_currency": "EUR",
                "period_days": 30
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn subscription_update_changes_price() {
    let app = TestApp::spawn().await;
    let subscription_id = app.create_subscription("YouTube", "13.99", "USD").await;

    let response = app
        .patch(
            &format!("/api/subscriptions/{}", subscription_id),
            json!({ "base_price": "15.99", "is_active": false }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(decimal(&body["base_price"]), dec!(15.99));
    assert_eq!(body["is_active"], false);
    assert_eq!(body["service_name"], "YouTube");
}

#[tokio::test]
async fn link_requires_existing_user_and_subscription() {
    let app = TestApp::spawn().await;
    let user_id = app.create_user(false).await;
    let missing = uuid::Uuid::new_v4().to_string();

    let response = app.link(&user_id, &missing, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let subscription_id = app.create_subscription("Notion", "8", "USD").await;
    let response = app.link(&missing, &subscription_id, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn link_is_unique_per_user_and_subscription() {
    let app = TestApp::spawn().await;
    let user_id = app.create_user(false).await;
    let subscription_id = app.create_subscription("Figma", "12", "USD").await;

    let first = app.link(&user_id, &subscription_id, json!({})).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["pricing_mode"], "none");

    let second = app.link(&user_id, &subscription_id, json!({})).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn override_rules_are_validated() {
    let app = TestApp::spawn().await;
    let user_id = app.create_user(false).await;
    let subscription_id = app.create_subscription("Dropbox", "11.99", "USD").await;

    let zero_percent = app
        .link(
            &user_id,
            &subscription_id,
            json!({ "pricing_mode": "percent", "markup_percent": "0" }),
        )
        .await;
    assert_eq!(zero_percent.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let fixed_with_markup = app
        .link(
            &user_id,
            &subscription_id,
            json!({ "pricing_mode": "fixed", "fixed_fee": "500", "markup_percent": "5" }),
        )
        .await;
    assert_eq!(fixed_with_markup.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn switching_override_mode_clears_previous_amounts() {
    let app = TestApp::spawn().await;
    let user_id = app.create_user(false).await;
    let subscription_id = app.create_subscription("ChatGPT", "20", "USD").await;

    let response = app
        .link(
            &user_id,
            &subscription_id,
            json!({ "pricing_mode": "percent", "markup_percent": "15" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let link_id = id_of(response, "user_subscription_id").await;

    let response = app
        .patch(
            &format!("/api/user-subscriptions/{}", link_id),
            json!({ "pricing_mode": "fixed", "fixed_fee": "2000" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["pricing_mode"], "fixed");
    assert_eq!(decimal(&body["fixed_fee"]), dec!(2000));
    assert_eq!(decimal(&body["markup_percent"]), dec!(0));
}

#[tokio::test]
async fn user_subscriptions_are_listed_and_removed() {
    let app = TestApp::spawn().await;
    let user_id = app.create_user(false).await;
    let first = app.create_subscription("Slack", "8.75", "USD").await;
    let second = app.create_subscription("Zoom", "13.33", "EUR").await;

    app.link(&user_id, &first, json!({})).await;
    let response = app.link(&user_id, &second, json!({})).await;
    let link_id = id_of(response, "user_subscription_id").await;

    let links: Vec<Value> = app
        .get(&format!("/api/users/{}/subscriptions", user_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(links.len(), 2);

    let response = app
        .delete(&format!("/api/user-subscriptions/{}", link_id))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let links: Vec<Value> = app
        .get(&format!("/api/users/{}/subscriptions", user_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["subscription_id"], first.as_str());
}
