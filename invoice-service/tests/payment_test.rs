//! Payment ledger integration tests: partial and full settlement,
//! overpayment protection, and settlement-driven status flips.

mod common;

use common::{create_draft_invoice, decimal_field, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};

async fn send(app: &TestApp, invoice_id: &uuid::Uuid) {
    let response = app
        .post_empty(&format!("/invoices/{}/send", invoice_id))
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn partial_payment_then_full_settlement() {
    let app = TestApp::spawn().await;

    // totalAmount = 1000
    let invoice_id = create_draft_invoice(&app, "Settlement Customer").await;
    send(&app, &invoice_id).await;

    let first = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "400", "method": "bank_transfer" }),
        )
        .await;
    assert_eq!(first.status(), 201);

    let body: Value = first.json().await.unwrap();
    let invoice = &body["invoice"];
    assert_eq!(decimal_field(invoice, "paid_amount"), Decimal::new(400, 0));
    assert_eq!(decimal_field(invoice, "balance_amount"), Decimal::new(600, 0));
    assert_eq!(invoice["payment_status"], "processing");
    assert_eq!(invoice["status"], "partially_paid");

    let second = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "600", "method": "card" }),
        )
        .await;
    assert_eq!(second.status(), 201);

    let body: Value = second.json().await.unwrap();
    let invoice = &body["invoice"];
    assert_eq!(decimal_field(invoice, "balance_amount"), Decimal::ZERO);
    assert_eq!(invoice["payment_status"], "completed");
    assert_eq!(invoice["status"], "paid");
    assert!(invoice["paid_at"].is_string(), "paid_at should be stamped");

    app.cleanup().await;
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Overpay Customer").await;
    send(&app, &invoice_id).await;

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "1000.01", "method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Partial, then a second payment exceeding the remaining balance.
    app.post_json(
        &format!("/invoices/{}/payments", invoice_id),
        &json!({ "amount": "900", "method": "cash" }),
    )
    .await;

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "200", "method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Zero Payment").await;
    send(&app, &invoice_id).await;

    for amount in ["0", "-5"] {
        let response = app
            .post_json(
                &format!("/invoices/{}/payments", invoice_id),
                &json!({ "amount": amount, "method": "cash" }),
            )
            .await;
        assert_eq!(response.status(), 422, "amount {amount}");
    }

    app.cleanup().await;
}

#[tokio::test]
async fn payments_against_cancelled_invoice_are_rejected() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Cancelled Payment").await;
    app.post_json(
        &format!("/invoices/{}/cancel", invoice_id),
        &json!({ "reason": "cancelled before payment" }),
    )
    .await;

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "100", "method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn settled_invoice_rejects_further_payments() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Already Settled").await;
    send(&app, &invoice_id).await;

    app.post_json(
        &format!("/invoices/{}/payments", invoice_id),
        &json!({ "amount": "1000", "method": "card" }),
    )
    .await;

    let response = app
        .post_json(
            &format!("/invoices/{}/payments", invoice_id),
            &json!({ "amount": "1", "method": "card" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn mark_paid_settles_the_outstanding_balance() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Mark Paid").await;
    send(&app, &invoice_id).await;

    app.post_json(
        &format!("/invoices/{}/payments", invoice_id),
        &json!({ "amount": "250", "method": "upi" }),
    )
    .await;

    let response = app
        .post_json(
            &format!("/invoices/{}/mark-paid", invoice_id),
            &json!({ "method": "bank_transfer" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let invoice: Value = response.json().await.unwrap();
    assert_eq!(invoice["status"], "paid");
    assert_eq!(invoice["payment_status"], "completed");
    assert_eq!(decimal_field(&invoice, "balance_amount"), Decimal::ZERO);

    app.cleanup().await;
}

#[tokio::test]
async fn payments_are_listed_and_audited() {
    let app = TestApp::spawn().await;

    let invoice_id = create_draft_invoice(&app, "Payment Listing").await;
    send(&app, &invoice_id).await;

    app.post_json(
        &format!("/invoices/{}/payments", invoice_id),
        &json!({ "amount": "300", "method": "cash", "reference": "RCPT-1" }),
    )
    .await;
    app.post_json(
        &format!("/invoices/{}/payments", invoice_id),
        &json!({ "amount": "700", "method": "card" }),
    )
    .await;

    let payments: Value = app
        .get(&format!("/invoices/{}/payments", invoice_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let audit: Value = app
        .get(&format!("/invoices/{}/audit", invoice_id))
        .await
        .json()
        .await
        .unwrap();
    let payment_entries = audit
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["action"] == "payment_recorded")
        .count();
    assert_eq!(payment_entries, 2);

    app.cleanup().await;
}
