//! Bulk operation integration tests: per-item isolation and idempotent
//! re-application.

mod common;

use common::{create_draft_invoice, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn bulk_send_isolates_per_item_failures() {
    let app = TestApp::spawn().await;

    let valid_id = create_draft_invoice(&app, "Bulk Valid").await;

    // Already sent: the guard will reject a second send.
    let sent_id = create_draft_invoice(&app, "Bulk Already Sent").await;
    app.post_empty(&format!("/invoices/{}/send", sent_id)).await;

    let missing_id = "00000000-0000-0000-0000-000000000000";

    let response = app
        .post_json(
            "/invoices/bulk",
            &json!({
                "invoice_ids": [valid_id, missing_id, sent_id],
                "operation": "send"
            }),
        )
        .await;
    assert_eq!(response.status(), 200, "batch itself never raises");

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["total_processed"], 3);
    assert_eq!(report["successful"], 1);
    assert_eq!(report["failed"], 2);

    let details = report["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);

    let by_id = |id: &str| {
        details
            .iter()
            .find(|d| d["invoice_id"] == id)
            .unwrap_or_else(|| panic!("missing detail for {id}"))
    };
    assert_eq!(by_id(&valid_id.to_string())["success"], true);
    assert_eq!(by_id(missing_id)["success"], false);
    assert_eq!(by_id(&sent_id.to_string())["success"], false);

    app.cleanup().await;
}

#[tokio::test]
async fn rerunning_a_bulk_operation_reports_completed_items_as_failed() {
    let app = TestApp::spawn().await;

    let first_id = create_draft_invoice(&app, "Bulk Rerun One").await;
    let second_id = create_draft_invoice(&app, "Bulk Rerun Two").await;

    let body = json!({
        "invoice_ids": [first_id, second_id],
        "operation": "send"
    });

    let first_run: Value = app.post_json("/invoices/bulk", &body).await.json().await.unwrap();
    assert_eq!(first_run["successful"], 2);
    assert_eq!(first_run["failed"], 0);

    let second_run: Value = app.post_json("/invoices/bulk", &body).await.json().await.unwrap();
    assert_eq!(second_run["successful"], 0);
    assert_eq!(second_run["failed"], 2);

    app.cleanup().await;
}

#[tokio::test]
async fn bulk_operation_requires_invoice_ids() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/invoices/bulk",
            &json!({ "invoice_ids": [], "operation": "send" }),
        )
        .await;
    assert_eq!(response.status(), 422);

    app.cleanup().await;
}

#[tokio::test]
async fn bulk_cancel_applies_the_shared_reason() {
    let app = TestApp::spawn().await;

    let first_id = create_draft_invoice(&app, "Bulk Cancel One").await;
    let second_id = create_draft_invoice(&app, "Bulk Cancel Two").await;

    let report: Value = app
        .post_json(
            "/invoices/bulk",
            &json!({
                "invoice_ids": [first_id, second_id],
                "operation": "cancel",
                "reason": "season closed"
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["successful"], 2);

    let invoice: Value = app
        .get(&format!("/invoices/{}", first_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(invoice["status"], "cancelled");
    assert_eq!(invoice["cancellation_reason"], "season closed");

    app.cleanup().await;
}

#[tokio::test]
async fn bulk_delete_only_removes_drafts() {
    let app = TestApp::spawn().await;

    let draft_id = create_draft_invoice(&app, "Bulk Delete Draft").await;
    let sent_id = create_draft_invoice(&app, "Bulk Delete Sent").await;
    app.post_empty(&format!("/invoices/{}/send", sent_id)).await;

    let report: Value = app
        .post_json(
            "/invoices/bulk",
            &json!({
                "invoice_ids": [draft_id, sent_id],
                "operation": "delete"
            }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(report["successful"], 1);
    assert_eq!(report["failed"], 1);

    assert_eq!(app.get(&format!("/invoices/{}", draft_id)).await.status(), 404);
    assert_eq!(app.get(&format!("/invoices/{}", sent_id)).await.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn bulk_mark_paid_settles_each_invoice() {
    let app = TestApp::spawn().await;

    let first_id = create_draft_invoice(&app, "Bulk Paid One").await;
    let second_id = create_draft_invoice(&app, "Bulk Paid Two").await;
    app.post_empty(&format!("/invoices/{}/send", first_id)).await;
    app.post_empty(&format!("/invoices/{}/send", second_id)).await;

    let report: Value = app
        .post_json(
            "/invoices/bulk",
            &json!({
                "invoice_ids": [first_id, second_id],
                "operation": "mark_paid"
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["successful"], 2);

    for id in [first_id, second_id] {
        let invoice: Value = app
            .get(&format!("/invoices/{}", id))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(invoice["status"], "paid");
        assert_eq!(invoice["payment_status"], "completed");
    }

    app.cleanup().await;
}
