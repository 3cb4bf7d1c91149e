//! Derived ledger fields
//!
//! Pure functions over freshly read rows. Nothing here caches: callers pass
//! the current payments every time so a stored status can be checked against
//! what it should be.
//!
//! Amounts are summed as raw numbers whatever their currency.
use crate::invoice::{PaymentStatus, ProformaInvoice};
use crate::ledger::Payment;
use crate::types::{Amount, Percent};

/// `Paid` once payments cover the total, `Partial` for anything in between,
/// `Pending` when nothing has been paid.
pub fn compute_invoice_status(total_amount: Amount, payments_sum: Amount) -> PaymentStatus {
    if payments_sum >= total_amount {
        PaymentStatus::Paid
    } else if !payments_sum.is_zero() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

/// `total_amount`, or the legacy `unit_price` when the total is absent or zero.
pub fn invoice_total(invoice: &ProformaInvoice) -> Amount {
    invoice
        .total_amount
        .filter(|total| !total.is_zero())
        .unwrap_or(invoice.unit_price)
}

/// Status the invoice should carry given its payments. A manual sale
/// overrides the payments.
pub fn settled_status(invoice: &ProformaInvoice, payments_sum: Amount) -> PaymentStatus {
    if invoice.sold_manually {
        return PaymentStatus::Paid;
    }
    compute_invoice_status(invoice_total(invoice), payments_sum)
}

pub fn remaining_balance(invoice: &ProformaInvoice, payments_sum: Amount) -> Amount {
    invoice_total(invoice).saturating_sub(payments_sum)
}

/// Once any deposit payment has been recorded the flag stays set, even if that
/// payment is later deleted.
pub fn compute_deposit_paid_flag(current_flag: bool, new_payment_is_deposit: bool) -> bool {
    current_flag || new_payment_is_deposit
}

pub fn payments_sum<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Amount {
    payments.into_iter().map(|p| p.amount).sum()
}

/// Sale price of one machine: purchase price plus the profit margin.
pub fn line_unit_price(purchase_price: Option<Amount>, profit_margin: Percent) -> Amount {
    purchase_price
        .map(|price| price.with_markup(profit_margin))
        .unwrap_or(Amount::ZERO)
}

pub fn deposit_for(total: Amount, deposit_percentage: Percent) -> Amount {
    total.percent(deposit_percentage)
}

/// Payment position of one invoice as of the payments passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub total: Amount,
    pub paid: Amount,
    pub remaining: Amount,
    pub status: PaymentStatus,
    pub stored_status: PaymentStatus,
}

impl Reconciliation {
    /// The stored status column disagrees with the payments.
    pub fn is_stale(&self) -> bool {
        self.status != self.stored_status
    }
}

pub fn reconcile(invoice: &ProformaInvoice, payments: &[Payment]) -> Reconciliation {
    let total = invoice_total(invoice);
    let paid = payments_sum(payments);
    Reconciliation {
        total,
        paid,
        remaining: total.saturating_sub(paid),
        status: settled_status(invoice, paid),
        stored_status: invoice.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(units: u64) -> Amount {
        Amount::from_major(units)
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(compute_invoice_status(usd(10_000), usd(0)), PaymentStatus::Pending);
        assert_eq!(compute_invoice_status(usd(10_000), usd(3_000)), PaymentStatus::Partial);
        assert_eq!(compute_invoice_status(usd(10_000), usd(10_000)), PaymentStatus::Paid);
        assert_eq!(compute_invoice_status(usd(10_000), usd(12_000)), PaymentStatus::Paid);
    }

    #[test]
    fn zero_total_counts_as_paid() {
        assert_eq!(compute_invoice_status(Amount::ZERO, Amount::ZERO), PaymentStatus::Paid);
    }

    #[test]
    fn deposit_flag_is_monotonic() {
        assert!(!compute_deposit_paid_flag(false, false));
        assert!(compute_deposit_paid_flag(false, true));
        assert!(compute_deposit_paid_flag(true, false));
        assert!(compute_deposit_paid_flag(true, true));
    }

    #[test]
    fn multi_machine_pricing() {
        let margin = Percent::whole(30);
        let prices: Vec<Amount> = [1_000, 2_000, 3_000]
            .into_iter()
            .map(|p| line_unit_price(Some(usd(p)), margin))
            .collect();
        assert_eq!(prices, vec![usd(1_300), usd(2_600), usd(3_900)]);

        let total: Amount = prices.iter().sum();
        assert_eq!(total, usd(7_800));
        assert_eq!(deposit_for(total, Percent::whole(20)), usd(1_560));
    }

    #[test]
    fn unpriced_machine_sells_for_zero() {
        assert_eq!(line_unit_price(None, Percent::whole(50)), Amount::ZERO);
    }
}
