//! Money arithmetic for the loan book
//!
//! Every monetary figure in the system goes through this module so that the
//! interest computation, the persisted `total_return` and any display value
//! agree bit-for-bit. Rounding is half-up to two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::loan::ApprovedLoan;

/// Flat interest rate applied to every approved loan (39.99%).
pub const DEFAULT_INTEREST_RATE: Decimal = dec!(0.3999);

/// Round a monetary amount to cents, half-up.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Total amount owed on a principal at the given flat rate.
///
/// `amount * (1 + rate)`, rounded to cents. This is the single function used
/// for the submission-time preview, the persisted `total_return` at approval
/// and any later display.
pub fn total_return(amount: Decimal, rate: Decimal) -> Decimal {
    round_cents(amount * (Decimal::ONE + rate))
}

/// Format an amount in Rand prefix notation, e.g. `R1250.00`.
pub fn format_rand(amount: Decimal) -> String {
    format!("R{:.2}", round_cents(amount))
}

/// Aggregated totals over the approved loan book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub total_principal: Decimal,
    pub total_return: Decimal,
}

/// Sum principal and return across the approved collection.
pub fn aggregate_revenue(loans: &[ApprovedLoan]) -> RevenueSummary {
    let mut summary = RevenueSummary {
        total_principal: Decimal::ZERO,
        total_return: Decimal::ZERO,
    };
    for loan in loans {
        summary.total_principal += loan.amount;
        summary.total_return += loan.total_return;
    }
    summary
}

/// Month-over-month comparison of a revenue metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyComparison {
    pub current: Decimal,
    pub previous: Decimal,
    pub change_pct: Decimal,
}

/// Percentage change between two period totals.
///
/// `((current - previous) / previous) * 100`. A zero previous period yields
/// +100% regardless of the current value, including 0 vs 0. Downstream
/// dashboards depend on that exact figure, so it is not special-cased away.
pub fn month_compare(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return dec!(100);
    }
    round_cents((current - previous) / previous * dec!(100))
}
