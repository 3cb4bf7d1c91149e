//! Property-based tests for the ledger reconciliation rules
//!
//! Status, remaining balance and deposit flag are pure functions of the
//! payments, so they are checked here across random totals and payment sets
//! rather than a handful of hand-picked amounts.

use proptest::prelude::*;
use azza_ledger::{
    invoice::{PaymentStatus, ProformaInvoice},
    ledger::{Payment, PaymentDraft},
    reconcile::{
        compute_deposit_paid_flag, compute_invoice_status, invoice_total, line_unit_price,
        payments_sum, reconcile, remaining_balance, settled_status,
    },
    types::{Amount, BusinessDate, Currency, Percent, TimeStamp},
};

// PROPERTY TEST STRATEGIES

/// Up to ten million in cents
fn amount_strategy() -> impl Strategy<Value = Amount> {
    (0u64..=1_000_000_000).prop_map(Amount::from_minor)
}

fn payments_strategy() -> impl Strategy<Value = Vec<Amount>> {
    prop::collection::vec(amount_strategy(), 0..8)
}

fn invoice_with_total(total: Option<Amount>, unit_price: Amount) -> ProformaInvoice {
    ProformaInvoice {
        id: "inv_prop".into(),
        invoice_number: "2025001".into(),
        customer_id: "cmp_prop".into(),
        bank_account_id: None,
        currency: Currency::USD,
        unit_price,
        total_amount: total,
        delivery_terms: None,
        loading_port: None,
        destination_port: None,
        payment_terms: None,
        deposit_amount: None,
        deposit_paid: false,
        deposit_date: None,
        issue_date: BusinessDate::from_ymd(2025, 1, 1).unwrap(),
        validity_date: None,
        status: PaymentStatus::Pending,
        notes: None,
        machine_id: None,
        brand: None,
        model: None,
        machine_type: None,
        chassis_number: None,
        created_at: TimeStamp::new(),
        sold_manually: false,
    }
}

fn payments_of(amounts: &[Amount]) -> Vec<Payment> {
    amounts
        .iter()
        .map(|amount| PaymentDraft::new("inv_prop", *amount))
        .enumerate()
        .map(|(i, draft)| Payment {
            id: format!("pay_{i}"),
            proforma_invoice_id: draft.proforma_invoice_id,
            amount: draft.amount,
            currency: draft.currency,
            payment_date: draft.payment_date,
            payment_method: draft.payment_method,
            reference_number: None,
            is_deposit: draft.is_deposit,
            notes: None,
            created_at: TimeStamp::new(),
        })
        .collect()
}

// PROPERTY TESTS

proptest! {
    /// Status is decided by comparing the payments sum with the total only
    #[test]
    fn status_is_function_of_sum(total in amount_strategy(), sum in amount_strategy()) {
        let status = compute_invoice_status(total, sum);
        prop_assert_eq!(status == PaymentStatus::Paid, sum >= total);
        prop_assert_eq!(status == PaymentStatus::Partial, !sum.is_zero() && sum < total);
        if !total.is_zero() {
            prop_assert_eq!(status == PaymentStatus::Pending, sum.is_zero());
        }
    }

    /// The order payments arrive in never changes the outcome
    #[test]
    fn status_ignores_payment_order(total in amount_strategy(), mut amounts in payments_strategy()) {
        let invoice = invoice_with_total(Some(total), total);
        let forward = reconcile(&invoice, &payments_of(&amounts));
        amounts.reverse();
        let backward = reconcile(&invoice, &payments_of(&amounts));
        prop_assert_eq!(forward.status, backward.status);
        prop_assert_eq!(forward.paid, backward.paid);
    }

    /// Remaining balance is never negative and adds back up to the total
    /// while the invoice is not overpaid
    #[test]
    fn remaining_never_negative(total in amount_strategy(), amounts in payments_strategy()) {
        let invoice = invoice_with_total(Some(total), Amount::ZERO);
        let payments = payments_of(&amounts);
        let sum = payments_sum(&payments);
        let remaining = remaining_balance(&invoice, sum);

        prop_assert!(remaining <= total);
        if sum <= total {
            prop_assert_eq!(remaining + sum, total);
        } else {
            prop_assert!(remaining.is_zero());
        }
    }

    /// A missing or zero total falls back to the legacy unit price
    #[test]
    fn total_falls_back_to_unit_price(unit in amount_strategy(), zero_total in prop::bool::ANY) {
        let total = if zero_total { Some(Amount::ZERO) } else { None };
        let invoice = invoice_with_total(total, unit);
        prop_assert_eq!(invoice_total(&invoice), unit);
    }

    /// A manual sale reads as paid whatever the payments add up to
    #[test]
    fn manual_sale_pins_status(total in amount_strategy(), amounts in payments_strategy()) {
        let mut invoice = invoice_with_total(Some(total), total);
        let payments = payments_of(&amounts);
        prop_assert_eq!(
            settled_status(&invoice, payments_sum(&payments)),
            compute_invoice_status(total, payments_sum(&payments))
        );

        invoice.sold_manually = true;
        prop_assert_eq!(settled_status(&invoice, payments_sum(&payments)), PaymentStatus::Paid);
        prop_assert_eq!(reconcile(&invoice, &payments).status, PaymentStatus::Paid);
    }

    /// Once true, the deposit flag stays true whatever payments follow
    #[test]
    fn deposit_flag_is_sticky(flags in prop::collection::vec(prop::bool::ANY, 1..16)) {
        let mut paid = false;
        let mut seen_deposit = false;
        for is_deposit in flags {
            let before = paid;
            paid = compute_deposit_paid_flag(paid, is_deposit);
            seen_deposit |= is_deposit;
            prop_assert!(!before || paid);
            prop_assert_eq!(paid, seen_deposit);
        }
    }

    /// Markup never lowers a price and zero margin is the identity
    #[test]
    fn markup_is_monotonic(price in amount_strategy(), pct in 0u32..=500) {
        let marked = line_unit_price(Some(price), Percent::whole(pct));
        prop_assert!(marked >= price);
        prop_assert_eq!(line_unit_price(Some(price), Percent::ZERO), price);
    }
}
