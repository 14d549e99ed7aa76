//! Recurring invoice integration tests: template-driven generation,
//! cadence arithmetic, and termination conditions.

mod common;

use common::{TestApp, TEST_CUSTOMER_ID};
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_template(app: &TestApp, name: &str) -> Uuid {
    let body = json!({
        "name": name,
        "type": "recurring",
        "template_data": {
            "bill_to": {
                "name": "Recurring Customer",
                "email": "recurring@customer.test"
            },
            "items": [
                { "description": "Monthly desk plan", "quantity": "1", "unit_price": "500" }
            ]
        },
        "default_notes": "Generated from schedule"
    });

    let response = app.post_json("/templates", &body).await;
    assert_eq!(response.status(), 201, "Failed to create template");

    let template: Value = response.json().await.unwrap();
    Uuid::parse_str(template["template_id"].as_str().unwrap()).unwrap()
}

async fn create_schedule(app: &TestApp, template_id: Uuid, body_overrides: Value) -> Value {
    let mut body = json!({
        "template_id": template_id,
        "customer_id": TEST_CUSTOMER_ID,
        "frequency": "monthly",
        "start_date": "2024-01-31"
    });
    if let Some(overrides) = body_overrides.as_object() {
        for (key, value) in overrides {
            body[key] = value.clone();
        }
    }

    let response = app.post_json("/recurring", &body).await;
    assert_eq!(response.status(), 201, "Failed to create schedule");
    response.json().await.unwrap()
}

#[tokio::test]
async fn generation_materializes_invoice_and_advances_schedule() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app, "Monthly Plan").await;
    let schedule = create_schedule(&app, template_id, json!({})).await;
    assert_eq!(schedule["next_generation_date"], "2024-01-31");

    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["generated"], 1);
    assert_eq!(report["failed"], 0);

    // Calendar-aware monthly step: Jan 31 -> Feb 29 in the 2024 leap year.
    let schedules: Value = app.get("/recurring").await.json().await.unwrap();
    let advanced = &schedules.as_array().unwrap()[0];
    assert_eq!(advanced["next_generation_date"], "2024-02-29");
    assert_eq!(advanced["current_occurrences"], 1);

    // The generated invoice went through normal creation: numbered, draft,
    // amounts computed from the template items.
    let invoices: Value = app.get("/invoices").await.json().await.unwrap();
    assert_eq!(invoices["total"], 1);
    let invoice = &invoices["invoices"][0];
    assert_eq!(invoice["type"], "recurring");
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["invoice_number"], "INV-0001");
    assert_eq!(invoice["customer_id"], TEST_CUSTOMER_ID);

    app.cleanup().await;
}

#[tokio::test]
async fn auto_send_generates_already_sent_invoices() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app, "Auto Send Plan").await;
    create_schedule(&app, template_id, json!({ "auto_send": true })).await;

    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["generated"], 1);

    let invoices: Value = app.get("/invoices").await.json().await.unwrap();
    assert_eq!(invoices["invoices"][0]["status"], "sent");

    app.cleanup().await;
}

#[tokio::test]
async fn max_occurrences_deactivates_the_schedule() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app, "One Shot Plan").await;
    create_schedule(&app, template_id, json!({ "max_occurrences": 1 })).await;

    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["generated"], 1);

    let schedules: Value = app.get("/recurring").await.json().await.unwrap();
    let schedule = &schedules.as_array().unwrap()[0];
    assert_eq!(schedule["is_active"], false);
    assert_eq!(schedule["current_occurrences"], 1);

    // A second pass finds nothing due.
    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["generated"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn inactive_schedules_are_skipped() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app, "Paused Plan").await;
    create_schedule(&app, template_id, json!({ "is_active": false })).await;

    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["generated"], 0);
    assert_eq!(report["failed"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn broken_template_fails_without_blocking_other_schedules() {
    let app = TestApp::spawn().await;

    // A template without line items cannot produce a valid invoice.
    let empty_template: Value = app
        .post_json(
            "/templates",
            &json!({
                "name": "Empty Template",
                "type": "recurring",
                "template_data": {
                    "bill_to": { "name": "Broken", "email": "broken@customer.test" },
                    "items": []
                }
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let empty_id = Uuid::parse_str(empty_template["template_id"].as_str().unwrap()).unwrap();

    let good_id = create_template(&app, "Good Plan").await;

    create_schedule(&app, empty_id, json!({})).await;
    create_schedule(&app, good_id, json!({})).await;

    let report: Value = app
        .post_empty("/recurring/generate")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(report["generated"], 1);
    assert_eq!(report["failed"], 1);
    let details = report["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.iter().any(|d| d["success"] == false));

    app.cleanup().await;
}

#[tokio::test]
async fn activate_and_deactivate_toggle_the_schedule() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app, "Toggle Plan").await;
    let schedule = create_schedule(&app, template_id, json!({})).await;
    let recurring_id = schedule["recurring_id"].as_str().unwrap().to_string();

    let off: Value = app
        .post_empty(&format!("/recurring/{}/deactivate", recurring_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(off["is_active"], false);

    let on: Value = app
        .post_empty(&format!("/recurring/{}/activate", recurring_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(on["is_active"], true);

    app.cleanup().await;
}

#[tokio::test]
async fn schedule_requires_an_existing_template() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/recurring",
            &json!({
                "template_id": "00000000-0000-0000-0000-000000000000",
                "customer_id": TEST_CUSTOMER_ID,
                "frequency": "monthly",
                "start_date": "2024-01-01"
            }),
        )
        .await;
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}
