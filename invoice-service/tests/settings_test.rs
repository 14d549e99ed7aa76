//! Settings integration tests: singleton behavior and numbering control.

mod common;

use common::{invoice_body, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn settings_are_created_with_defaults_on_first_access() {
    let app = TestApp::spawn().await;

    let settings: Value = app.get("/settings").await.json().await.unwrap();

    assert_eq!(settings["default_currency"], "INR");
    assert_eq!(settings["default_payment_terms"], 30);
    assert_eq!(settings["number_prefix"], "INV");
    assert_eq!(settings["next_number"], 1);
    assert_eq!(settings["reminder_schedule"], json!([7, 3, 1]));

    // The singleton row is reused on subsequent reads.
    let again: Value = app.get("/settings").await.json().await.unwrap();
    assert_eq!(settings["settings_id"], again["settings_id"]);

    app.cleanup().await;
}

#[tokio::test]
async fn updated_prefix_applies_to_new_invoice_numbers() {
    let app = TestApp::spawn().await;

    let response = app
        .put_json(
            "/settings",
            &json!({ "number_prefix": "CRN", "default_payment_terms": 14 }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let invoice: Value = app
        .post_json("/invoices", &invoice_body("Prefix Customer", "1", "10"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(invoice["invoice_number"], "CRN-0001");

    app.cleanup().await;
}

#[tokio::test]
async fn empty_number_prefix_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .put_json("/settings", &json!({ "number_prefix": "" }))
        .await;
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}

#[tokio::test]
async fn numbering_counter_survives_settings_updates() {
    let app = TestApp::spawn().await;

    app.post_json("/invoices", &invoice_body("Counter One", "1", "10"))
        .await;
    app.put_json("/settings", &json!({ "default_notes": "Thank you" }))
        .await;

    let invoice: Value = app
        .post_json("/invoices", &invoice_body("Counter Two", "1", "10"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(invoice["invoice_number"], "INV-0002");

    app.cleanup().await;
}
