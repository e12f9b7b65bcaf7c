//! # Validation Module
//!
//! Input validation for ledger payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard forms (TypeScript)                                 │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Rejects malformed drafts before any store call                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger transaction (glow-db)                                 │
//! │  ├── Referenced customer/product/sale must exist                       │
//! │  └── Payment must fit the freshly read outstanding balance             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use glow_core::validation::{validate_payment_amount, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_payment_amount(0).is_err());
//! ```

use crate::draft::{DraftSale, NewAssignment, NewCustomer, NewExpense, NewProduct, NewWorkerTask};
use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use glow_core::validation::validate_sku;
///
/// assert!(validate_sku("SOAP-100G").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_required("sku", sku)?;
    validate_max_len("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Quantity sold on a line item: 1 to [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Unit price on a line item: 0 to [`MAX_UNIT_PRICE_CENTS`].
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    validate_non_negative_cents("unit_price", cents)?;
    if cents > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Non-negative money field (prices, discounts, initial payments).
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A standalone payment must be strictly positive.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates a draft sale before the ledger transaction starts.
///
/// ## Rules
/// ```text
/// customer_id          non-empty
/// items                1..=MAX_SALE_ITEMS; each product_id non-empty,
///                      quantity in 1..=MAX_ITEM_QUANTITY,
///                      unit_price in 0..=MAX_UNIT_PRICE_CENTS
/// subtotal             must fit in i64 cents
/// discount             0 ≤ discount ≤ subtotal
/// amount_paid          0 ≤ amount_paid ≤ total
/// ```
pub fn validate_draft_sale(draft: &DraftSale) -> ValidationResult<()> {
    validate_required("customer_id", &draft.customer_id)?;

    if draft.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if draft.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for item in &draft.items {
        validate_required("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;
        validate_unit_price(item.unit_price_cents)?;
    }

    validate_non_negative_cents("discount", draft.discount_cents)?;
    validate_non_negative_cents("amount_paid", draft.amount_paid_cents)?;

    let subtotal = draft
        .checked_subtotal()
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "subtotal".to_string(),
            min: 0,
            max: i64::MAX,
        })?;
    if draft.discount() > subtotal {
        return Err(ValidationError::ExceedsLimit {
            field: "discount".to_string(),
            value: draft.discount_cents,
            limit_field: "subtotal".to_string(),
            limit: subtotal.cents(),
        });
    }

    let total = draft.total();
    if draft.amount_paid() > total {
        return Err(ValidationError::ExceedsLimit {
            field: "amount_paid".to_string(),
            value: draft.amount_paid_cents,
            limit_field: "total".to_string(),
            limit: total.cents(),
        });
    }

    Ok(())
}

pub fn validate_new_assignment(assignment: &NewAssignment) -> ValidationResult<()> {
    validate_required("salesman_id", &assignment.salesman_id)?;
    validate_required("location", &assignment.location)?;
    validate_max_len("location", &assignment.location, 500)?;
    validate_required("assigned_by_id", &assignment.assigned_by_id)?;
    Ok(())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_required("name", &product.name)?;
    validate_max_len("name", &product.name, 200)?;
    validate_sku(&product.sku)?;
    validate_required("unit", &product.unit)?;
    validate_non_negative_cents("cost_price", product.cost_price_cents)?;
    validate_non_negative_cents("sale_price", product.sale_price_cents)?;
    if product.reorder_level < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "reorder_level".to_string(),
        });
    }
    Ok(())
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_required("name", &customer.name)?;
    validate_max_len("name", &customer.name, 200)?;
    validate_required("salesman_id", &customer.salesman_id)?;
    Ok(())
}

pub fn validate_new_expense(expense: &NewExpense) -> ValidationResult<()> {
    if expense.amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

pub fn validate_new_worker_task(task: &NewWorkerTask) -> ValidationResult<()> {
    validate_required("worker_id", &task.worker_id)?;
    validate_required("task_description", &task.task_description)?;
    Ok(())
}
