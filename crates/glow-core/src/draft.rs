//! # Draft Payloads
//!
//! Unpersisted payloads submitted by UI handlers. The ledger validates them,
//! fills in ids, resolved names and timestamps, and writes the real records.
//!
//! ## Sale Math
//! ```text
//! subtotal = Σ quantity × unit_price
//! total    = subtotal - discount
//! pending  = total - amount_paid      → added to customer.total_due
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AssignmentStatus, ExpenseCategory, SaleLineItem, WorkerTaskStatus};

/// Draft line items share the shape of recorded ones.
pub type DraftLineItem = SaleLineItem;

// =============================================================================
// Draft Sale
// =============================================================================

/// A sale as submitted by the New Sale form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftSale {
    pub customer_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub items: Vec<DraftLineItem>,
    pub discount_cents: i64,
    /// Initial payment taken with the sale; may be zero.
    pub amount_paid_cents: i64,
    pub photo_ref: Option<String>,
}

impl DraftSale {
    /// Σ quantity × unit price.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(SaleLineItem::line_total).sum()
    }

    /// Subtotal, or `None` if it does not fit in an `i64`.
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.checked_line_total()?)
        })
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// subtotal - discount.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount()
    }

    /// The part of the total left on the customer's account.
    pub fn pending_amount(&self) -> Money {
        self.total() - self.amount_paid()
    }
}

// =============================================================================
// Assignments
// =============================================================================

/// A new daily plan for a salesman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAssignment {
    pub salesman_id: String,
    pub location: String,
    pub items_to_take: Option<String>,
    pub assigned_by_id: String,
}

/// Edits made from the assignment page. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AssignmentUpdate {
    pub location: Option<String>,
    pub items_to_take: Option<String>,
    pub progress_notes: Option<String>,
    pub status: Option<AssignmentStatus>,
}

// =============================================================================
// Catalog and Accounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    /// Opening stock; absent means zero.
    pub stock: Option<i64>,
    pub reorder_level: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

/// Product edits. Stock is deliberately absent: it moves only with sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub cost_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
    pub reorder_level: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub salesman_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Worker Tasks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewWorkerTask {
    pub worker_id: String,
    pub task_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkerTaskUpdate {
    pub task_description: Option<String>,
    pub status: Option<WorkerTaskStatus>,
    pub progress_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(items: Vec<DraftLineItem>, discount: i64, paid: i64) -> DraftSale {
        DraftSale {
            customer_id: "C1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            items,
            discount_cents: discount,
            amount_paid_cents: paid,
            photo_ref: None,
        }
    }

    #[test]
    fn test_totals_single_item() {
        let sale = draft(vec![DraftLineItem::new("P1", 5, 1000)], 0, 3000);
        assert_eq!(sale.subtotal().cents(), 5000);
        assert_eq!(sale.total().cents(), 5000);
        assert_eq!(sale.pending_amount().cents(), 2000);
    }

    #[test]
    fn test_totals_with_discount() {
        let sale = draft(
            vec![
                DraftLineItem::new("P1", 2, 1250),
                DraftLineItem::new("P2", 1, 499),
            ],
            499,
            0,
        );
        assert_eq!(sale.subtotal().cents(), 2999);
        assert_eq!(sale.total().cents(), 2500);
        assert_eq!(sale.pending_amount().cents(), 2500);
    }

    #[test]
    fn test_fully_paid_has_no_pending() {
        let sale = draft(vec![DraftLineItem::new("P1", 1, 800)], 0, 800);
        assert!(sale.pending_amount().is_zero());
    }
}
