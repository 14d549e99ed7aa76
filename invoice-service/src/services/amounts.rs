//! Amount calculation engine.
//!
//! A pure function of an invoice's line items, taxes, discount, and
//! shipping inputs to its derived monetary fields. Every mutating code path
//! calls this before persisting, so the stored values are always
//! authoritative; nothing is recomputed lazily on read.
//!
//! Rounding policy: amounts accumulate at full precision and are rounded
//! to the currency's two minor-unit places only at the line-total and
//! final-total boundaries, never mid-expression.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{LineItem, TaxLine};

const MINOR_UNIT_DP: u32 = 2;

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Derived monetary fields, always produced together.
#[derive(Debug, Clone, PartialEq)]
pub struct Amounts {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
}

/// Compute a single line's total from quantity, unit price, and per-line
/// discount. An explicit discount amount wins over a percentage.
pub fn line_total(item: &LineItem) -> Decimal {
    let gross = item.quantity * item.unit_price;
    let discount = match (item.discount_amount, item.discount_percentage) {
        (Some(amount), _) => amount,
        (None, Some(pct)) => gross * pct / Decimal::ONE_HUNDRED,
        (None, None) => Decimal::ZERO,
    };
    round_money(gross - discount)
}

/// Recompute every line's `total` field.
pub fn normalize_items(items: &[LineItem]) -> Vec<LineItem> {
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            item.total = line_total(&item);
            item
        })
        .collect()
}

fn tax_sum(taxes: Option<&[TaxLine]>) -> Decimal {
    taxes
        .unwrap_or_default()
        .iter()
        .map(|tax| tax.amount)
        .sum()
}

/// Recompute the four derived fields from normalized line items and the
/// invoice-level inputs.
///
/// The invariant this maintains:
/// ```text
/// subtotal       = sum(line.total)
/// tax_amount     = sum(line.taxes.amount) + sum(invoice.taxes.amount)
/// total_amount   = subtotal - discount_amount + tax_amount + shipping_amount
/// balance_amount = total_amount - paid_amount
/// ```
pub fn calculate(
    items: &[LineItem],
    invoice_taxes: Option<&[TaxLine]>,
    discount_amount: Decimal,
    shipping_amount: Decimal,
    paid_amount: Decimal,
) -> Amounts {
    let subtotal: Decimal = items.iter().map(|item| item.total).sum();

    let line_taxes: Decimal = items
        .iter()
        .map(|item| tax_sum(item.taxes.as_deref()))
        .sum();
    let tax_amount = line_taxes + tax_sum(invoice_taxes);

    let total_amount = round_money(subtotal - discount_amount + tax_amount + shipping_amount);
    let balance_amount = total_amount - paid_amount;

    Amounts {
        subtotal,
        discount_amount,
        tax_amount,
        shipping_amount,
        total_amount,
        paid_amount,
        balance_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaxType;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str_exact(value).unwrap()
    }

    fn item(quantity: &str, unit_price: &str) -> LineItem {
        LineItem {
            description: "Workspace rental".to_string(),
            quantity: Decimal::from_str_exact(quantity).unwrap(),
            unit_price: Decimal::from_str_exact(unit_price).unwrap(),
            total: Decimal::ZERO,
            taxes: None,
            discount_percentage: None,
            discount_amount: None,
        }
    }

    fn tax(amount: &str) -> TaxLine {
        TaxLine {
            tax_type: TaxType::Gst,
            rate: dec("18"),
            amount: Decimal::from_str_exact(amount).unwrap(),
            description: None,
        }
    }

    #[test]
    fn line_total_multiplies_quantity_and_price() {
        assert_eq!(line_total(&item("2", "499.50")), dec("999.00"));
    }

    #[test]
    fn line_total_rounds_once_at_the_boundary() {
        // 3 x 0.333 = 0.999 -> 1.00; rounding mid-expression would give
        // 3 x 0.33 = 0.99.
        assert_eq!(line_total(&item("3", "0.333")), dec("1.00"));
    }

    #[test]
    fn line_discount_amount_wins_over_percentage() {
        let mut line = item("1", "200");
        line.discount_percentage = Some(dec("50"));
        line.discount_amount = Some(dec("20"));
        assert_eq!(line_total(&line), dec("180.00"));
    }

    #[test]
    fn line_discount_percentage_applies_when_no_amount() {
        let mut line = item("4", "25");
        line.discount_percentage = Some(dec("10"));
        assert_eq!(line_total(&line), dec("90.00"));
    }

    #[test]
    fn normalize_recomputes_stale_totals() {
        let mut line = item("2", "100");
        line.total = dec("999");
        let normalized = normalize_items(&[line]);
        assert_eq!(normalized[0].total, dec("200.00"));
    }

    #[test]
    fn invariant_holds_for_plain_invoice() {
        let items = normalize_items(&[item("2", "100"), item("1", "50")]);
        let amounts = calculate(&items, None, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(amounts.subtotal, dec("250.00"));
        assert_eq!(amounts.tax_amount, Decimal::ZERO);
        assert_eq!(amounts.total_amount, dec("250.00"));
        assert_eq!(amounts.balance_amount, dec("250.00"));
    }

    #[test]
    fn tax_sums_line_and_invoice_levels() {
        let mut line = item("1", "1000");
        line.taxes = Some(vec![tax("90.00"), tax("90.00")]);
        let items = normalize_items(&[line]);

        let invoice_taxes = [tax("20.00")];
        let amounts = calculate(
            &items,
            Some(&invoice_taxes),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );

        assert_eq!(amounts.tax_amount, dec("200.00"));
        assert_eq!(amounts.total_amount, dec("1200.00"));
    }

    #[test]
    fn discount_and_shipping_feed_the_total() {
        let items = normalize_items(&[item("1", "1000")]);
        let amounts = calculate(&items, None, dec("100"), dec("50"), Decimal::ZERO);

        // total = 1000 - 100 + 0 + 50
        assert_eq!(amounts.total_amount, dec("950.00"));
        assert_eq!(amounts.balance_amount, dec("950.00"));
    }

    #[test]
    fn partial_payment_reduces_balance_only() {
        let items = normalize_items(&[item("1", "1000")]);
        let amounts = calculate(&items, None, Decimal::ZERO, Decimal::ZERO, dec("400"));

        assert_eq!(amounts.total_amount, dec("1000.00"));
        assert_eq!(amounts.paid_amount, dec("400"));
        assert_eq!(amounts.balance_amount, dec("600.00"));
    }

    #[test]
    fn full_payment_zeroes_the_balance() {
        let items = normalize_items(&[item("1", "1000")]);
        let after_first = calculate(&items, None, Decimal::ZERO, Decimal::ZERO, dec("400"));
        assert_eq!(after_first.balance_amount, dec("600.00"));

        let after_second = calculate(&items, None, Decimal::ZERO, Decimal::ZERO, dec("1000"));
        assert_eq!(after_second.balance_amount, dec("0.00"));
    }

    #[test]
    fn derived_fields_always_reconcile() {
        let mut line = item("3", "33.33");
        line.taxes = Some(vec![tax("9.00")]);
        let items = normalize_items(&[line, item("2", "0.335")]);
        let invoice_taxes = [tax("1.25")];
        let amounts = calculate(&items, Some(&invoice_taxes), dec("5"), dec("12.50"), dec("40"));

        assert_eq!(
            amounts.total_amount,
            round_money(
                amounts.subtotal - amounts.discount_amount
                    + amounts.tax_amount
                    + amounts.shipping_amount
            )
        );
        assert_eq!(
            amounts.balance_amount,
            amounts.total_amount - amounts.paid_amount
        );
    }
}
