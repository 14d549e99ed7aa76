//! Invoice lifecycle integration tests: guarded transitions and the audit
//! trail that records them.

mod common;

use common::{create_draft_invoice, create_pending_invoice, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn send_transitions_draft_to_sent() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Send Customer").await;
    let response = app
        .post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;
    assert_eq!(response.status(), 200);

    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"], "sent");
    assert!(invoice["sent_at"].is_string(), "sent_at should be stamped");

    app.cleanup().await;
}

#[tokio::test]
async fn send_twice_rejects_the_second_call() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Double Send").await;
    let first = app
        .post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;
    assert_eq!(second.status(), 400);

    // The record mutated exactly once.
    let invoice: Value = app
        .get(&format!("/invoices/{}", invoice_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(invoice["status"], "sent");

    app.cleanup().await;
}

#[tokio::test]
async fn approve_requires_pending_status() {
    let app = TestApp::spawn().await;

    let pending_id = create_pending_invoice(&app, "Approve Pending").await;
    let response = app
        .post_empty(&format!("/invoices/{}/approve", pending_id))
        .await;
    assert_eq!(response.status(), 200);

    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"], "approved");
    assert!(invoice["approved_at"].is_string());

    // A draft invoice cannot be approved.
    let draft_id = create_draft_invoice(&app, "Approve Draft").await;
    let response = app
        .post_empty(&format!("/invoices/{}/approve", draft_id))
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let app = TestApp::spawn().await;

    let invoice_id = create_pending_invoice(&app, "Reject Reason").await;

    let empty = app
        .post_json(
            &format!("/invoices/{}/reject", invoice_id),
            &json!({ "reason": "" }),
        )
        .await;
    assert_eq!(empty.status(), 422);

    let response = app
        .post_json(
            &format!("/invoices/{}/reject", invoice_id),
            &json!({ "reason": "budget" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"], "rejected");
    assert_eq!(invoice["rejection_reason"], "budget");

    // The rejection is audited.
    let audit: Value = app
        .get(&format!("/invoices/{}/audit", invoice_id))
        .await
        .json()
        .await
        .unwrap();
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"rejected"));

    app.cleanup().await;
}

#[tokio::test]
async fn cancel_is_blocked_for_terminal_statuses() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Cancel Twice").await;
    let first = app
        .post_json(
            &format!("/invoices/{}/cancel", invoice_id),
            &json!({ "reason": "duplicate order" }),
        )
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .post_json(
            &format!("/invoices/{}/cancel", invoice_id),
            &json!({ "reason": "again" }),
        )
        .await;
    assert_eq!(second.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn paid_invoice_cannot_be_cancelled_but_can_be_voided() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Void Paid").await;
    app.post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;

    let paid = app
        .post_json(&format!("/invoices/{}/mark-paid", invoice_id), &json!({}))
        .await;
    assert_eq!(paid.status(), 200);

    let cancel = app
        .post_json(
            &format!("/invoices/{}/cancel", invoice_id),
            &json!({ "reason": "should fail" }),
        )
        .await;
    assert_eq!(cancel.status(), 400);

    let void = app
        .post_json(
            &format!("/invoices/{}/void", invoice_id),
            &json!({ "reason": "billing error" }),
        )
        .await;
    assert_eq!(void.status(), 200);

    let invoice: Value = void.json().await.unwrap();
    assert_eq!(invoice["status"], "voided");
    assert_eq!(invoice["void_reason"], "billing error");

    app.cleanup().await;
}

#[tokio::test]
async fn void_twice_is_rejected() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Double Void").await;
    let first = app
        .post_json(
            &format!("/invoices/{}/void", invoice_id),
            &json!({ "reason": "first" }),
        )
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .post_json(
            &format!("/invoices/{}/void", invoice_id),
            &json!({ "reason": "second" }),
        )
        .await;
    assert_eq!(second.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_succeeds_on_draft_and_fails_after_send() {
    let app = TestApp::spawn().await;

    let draft_id = create_draft_invoice(&app, "Delete Draft").await;
    let response = app.delete(&format!("/invoices/{}", draft_id)).await;
    assert_eq!(response.status(), 204);

    let gone = app.get(&format!("/invoices/{}", draft_id)).await;
    assert_eq!(gone.status(), 404);

    let sent_id = create_draft_invoice(&app, "Delete Sent").await;
    app.post_empty(&format!("/invoices/{}/send", sent_id)).await;

    let response = app.delete(&format!("/invoices/{}", sent_id)).await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn transitions_on_missing_invoice_return_not_found() {
    let app = TestApp::spawn().await;

    let missing = "/invoices/00000000-0000-0000-0000-000000000000";
    assert_eq!(app.post_empty(&format!("{}/send", missing)).await.status(), 404);
    assert_eq!(
        app.post_json(&format!("{}/cancel", missing), &json!({ "reason": "x" }))
            .await
            .status(),
        404
    );

    app.cleanup().await;
}

#[tokio::test]
async fn audit_trail_records_every_transition_in_order() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Audit Order").await;
    app.post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;
    app.post_json(
        &format!("/invoices/{}/cancel", invoice_id),
        &json!({ "reason": "test run" }),
    )
    .await;

    let audit: Value = app
        .get(&format!("/invoices/{}/audit", invoice_id))
        .await
        .json()
        .await
        .unwrap();

    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "sent", "cancelled"]);

    // Transitions capture the before/after status.
    let cancelled = &audit.as_array().unwrap()[2];
    assert_eq!(cancelled["old_values"]["status"], "sent");
    assert_eq!(cancelled["new_values"]["status"], "cancelled");

    app.cleanup().await;
}
