//! # Purchase Pricing
//!
//! Derives the priced summary shown in the cart and charged at checkout.
//!
//! ```text
//! total_before_discount = Σ item.price
//! discount_amount       = round(total_before_discount × pct / 100)
//! total_after_discount  = total_before_discount − discount_amount
//! ```
//!
//! Rounding happens once, on the discount amount, so the three totals always
//! reconcile to the cent.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Priced summary of a selection of catalog items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub total_before_discount: Money,
    /// 0 when no discount code applies.
    pub discount_percentage: u32,
    pub discount_amount: Money,
    pub total_after_discount: Money,
}

impl PurchaseSummary {
    /// Summary of an empty selection.
    pub const fn empty() -> Self {
        PurchaseSummary {
            total_before_discount: Money::zero(),
            discount_percentage: 0,
            discount_amount: Money::zero(),
            total_after_discount: Money::zero(),
        }
    }

    /// Prices `total` with `percentage` off.
    pub fn compute(total: Money, percentage: u32) -> Self {
        let discount_amount = total.percentage_of(percentage);

        PurchaseSummary {
            total_before_discount: total,
            discount_percentage: percentage,
            discount_amount,
            total_after_discount: total - discount_amount,
        }
    }

    /// Sums `prices` and applies `percentage` off.
    pub fn from_prices<I>(prices: I, percentage: u32) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        Self::compute(prices.into_iter().sum(), percentage)
    }
}
