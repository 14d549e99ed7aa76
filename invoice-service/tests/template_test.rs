//! Template integration tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};

fn template_body(name: &str) -> Value {
    json!({
        "name": name,
        "type": "standard",
        "template_data": {
            "bill_to": { "name": "Template Customer", "email": "template@customer.test" },
            "items": [
                { "description": "Consulting", "quantity": "2", "unit_price": "150" }
            ]
        },
        "default_terms": "Net 30"
    })
}

#[tokio::test]
async fn template_lifecycle_roundtrip() {
    let app = TestApp::spawn().await;

    let created: Value = app
        .post_json("/templates", &template_body("Roundtrip Template"))
        .await
        .json()
        .await
        .unwrap();
    let template_id = created["template_id"].as_str().unwrap().to_string();
    assert_eq!(created["is_active"], true);

    let updated: Value = app
        .put_json(
            &format!("/templates/{}", template_id),
            &json!({ "name": "Renamed Template", "is_active": false }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(updated["name"], "Renamed Template");
    assert_eq!(updated["is_active"], false);

    // Inactive templates are hidden by default and visible on request.
    let active: Value = app.get("/templates").await.json().await.unwrap();
    assert_eq!(active.as_array().unwrap().len(), 0);

    let all: Value = app
        .get("/templates?include_inactive=true")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);

    let deleted = app.delete(&format!("/templates/{}", template_id)).await;
    assert_eq!(deleted.status(), 204);

    let gone = app.delete(&format!("/templates/{}", template_id)).await;
    assert_eq!(gone.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn template_requires_a_name() {
    let app = TestApp::spawn().await;

    let mut body = template_body("");
    body["name"] = json!("");

    let response = app.post_json("/templates", &body).await;
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}
