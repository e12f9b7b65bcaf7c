//! # Domain Types
//!
//! Core domain types of the GLOW ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock ◄────────┼───┤  items[]        │◄──┤  sale_id (FK)   │       │
//! │  │  sale_price     │   │  total          │   │  amount         │       │
//! │  └─────────────────┘   │  amount_paid    │   └─────────────────┘       │
//! │                        └────────┬────────┘                              │
//! │  ┌─────────────────┐            │            ┌─────────────────┐       │
//! │  │    Customer     │◄───────────┘            │   Assignment    │       │
//! │  │  ─────────────  │                         │  ─────────────  │       │
//! │  │  total_due      │                         │  Pending (≤1)   │       │
//! │  └─────────────────┘                         │  Visited        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ledger Invariants
//! - `Customer.total_due == Σ (sale.total - sale.amount_paid)` over the customer's sales
//! - `Sale.amount_paid == Σ payment.amount` over the sale's payments
//! - `Product.stock` only changes together with the sale consuming it
//! - At most one `Pending` assignment per salesman

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::TASK_EXPIRY_HOUR;

// =============================================================================
// Product
// =============================================================================

/// A product carried in inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    /// Unit label shown next to quantities ("pcs", "kg", "carton").
    pub unit: String,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    /// Units on hand. Written only by sale transactions; may go negative.
    pub stock: i64,
    /// Stock level at or below which the product is flagged for reorder.
    pub reorder_level: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Gross margin per unit at current prices.
    pub fn unit_margin(&self) -> Money {
        self.sale_price() - self.cost_price()
    }

    /// True when stock has fallen to the reorder threshold.
    pub fn needs_reorder(&self) -> bool {
        self.stock <= self.reorder_level
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    /// Salesman who owns this customer.
    pub salesman_id: String,
    /// Σ (total - amount_paid) over all of this customer's sales.
    pub total_due_cents: i64,
}

impl Customer {
    #[inline]
    pub fn total_due(&self) -> Money {
        Money::from_cents(self.total_due_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line item of a sale. The unit price is captured at sale time and does
/// not follow later product price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleLineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        SaleLineItem {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// `None` on overflow.
    pub fn checked_line_total(&self) -> Option<Money> {
        self.unit_price().checked_multiply_quantity(self.quantity)
    }
}

/// A recorded sale.
///
/// Immutable after creation except `amount_paid_cents`, which only the
/// payment recorder raises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub salesman_id: String,
    /// Salesman display name at the time of sale.
    pub salesman_name: String,
    pub customer_id: String,
    /// Customer name at the time of sale.
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<SaleLineItem>,
    pub discount_cents: i64,
    /// Σ line totals - discount.
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    /// Url of the shop photo taken with the sale.
    pub photo_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// total - amount_paid.
    #[inline]
    pub fn outstanding(&self) -> Money {
        self.total() - self.amount_paid()
    }

    pub fn is_settled(&self) -> bool {
        !self.outstanding().is_positive()
    }

    /// Checks a payment against the outstanding balance and returns the
    /// new `amount_paid`.
    pub fn apply_payment(&self, amount: Money) -> CoreResult<Money> {
        let outstanding = self.outstanding();
        if amount > outstanding {
            return Err(CoreError::Overpayment {
                sale_id: self.id.clone(),
                amount: amount.cents(),
                outstanding: outstanding.cents(),
            });
        }
        Ok(self.amount_paid() + amount)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment posted against a sale. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub recorded_by_id: String,
    pub recorded_by_name: String,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Assignment (daily plan)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// The current plan for the salesman.
    #[default]
    Pending,
    /// Superseded by a newer plan, or visited.
    Visited,
}

/// A daily plan handed to a salesman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Assignment {
    pub id: String,
    pub salesman_id: String,
    pub salesman_name: String,
    pub location: String,
    pub items_to_take: Option<String>,
    pub status: AssignmentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub assigned_by_id: String,
    pub assigned_by_name: String,
    pub progress_notes: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Salesman,
    Worker,
    Cashier,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Salesman,
        Role::Worker,
        Role::Cashier,
    ];
}

/// A dashboard user. Authentication lives elsewhere; this is the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AppUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: String,
    pub role: Option<Role>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl AppUser {
    /// Name shown on sales and payments: the profile name, else the email.
    pub fn display_name(&self) -> Option<String> {
        let name = self.name.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Fuel,
    Rent,
    Salaries,
    Packing,
    Food,
    Miscellaneous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Worker Tasks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WorkerTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WorkerTask {
    pub id: String,
    pub worker_id: String,
    pub worker_name: String,
    pub task_description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub status: WorkerTaskStatus,
    pub progress_notes: Option<String>,
}

impl WorkerTask {
    /// A pending task from an earlier day expires once the expiry hour
    /// of the current day has passed.
    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == WorkerTaskStatus::Pending
            && self.created_at.date_naive() < now.date_naive()
            && now.hour() >= TASK_EXPIRY_HOUR
    }
}

// =============================================================================
// App Settings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Pkr,
    Usd,
    Eur,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Pkr => "₨",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }

    /// Symbol for a stored currency code; unknown or missing codes show `$`.
    pub fn symbol_for_code(code: Option<&str>) -> &'static str {
        match code.map(str::to_lowercase).as_deref() {
            Some("pkr") => Currency::Pkr.symbol(),
            Some("eur") => Currency::Eur.symbol(),
            _ => Currency::Usd.symbol(),
        }
    }
}

/// Branding and locale settings of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppSettings {
    pub app_name: String,
    pub logo_light: String,
    pub logo_dark: String,
    pub auth_logo_light: String,
    pub auth_logo_dark: String,
    pub favicon: String,
    pub currency: Currency,
    pub signup_visible: bool,
}

const DEFAULT_LOGO_LIGHT: &str = "https://iili.io/KYqQC1R.png";
const DEFAULT_LOGO_DARK: &str = "https://iili.io/KYkW0NV.png";

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            app_name: "GLOW".to_string(),
            logo_light: DEFAULT_LOGO_LIGHT.to_string(),
            logo_dark: DEFAULT_LOGO_DARK.to_string(),
            auth_logo_light: DEFAULT_LOGO_LIGHT.to_string(),
            auth_logo_dark: DEFAULT_LOGO_DARK.to_string(),
            favicon: DEFAULT_LOGO_LIGHT.to_string(),
            currency: Currency::Pkr,
            signup_visible: true,
        }
    }
}

/// Partial settings update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettingsPatch {
    pub app_name: Option<String>,
    pub logo_light: Option<String>,
    pub logo_dark: Option<String>,
    pub auth_logo_light: Option<String>,
    pub auth_logo_dark: Option<String>,
    pub favicon: Option<String>,
    pub currency: Option<Currency>,
    pub signup_visible: Option<bool>,
}

impl AppSettings {
    /// Merges a patch into these settings.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.app_name {
            self.app_name = v;
        }
        if let Some(v) = patch.logo_light {
            self.logo_light = v;
        }
        if let Some(v) = patch.logo_dark {
            self.logo_dark = v;
        }
        if let Some(v) = patch.auth_logo_light {
            self.auth_logo_light = v;
        }
        if let Some(v) = patch.auth_logo_dark {
            self.auth_logo_dark = v;
        }
        if let Some(v) = patch.favicon {
            self.favicon = v;
        }
        if let Some(v) = patch.currency {
            self.currency = v;
        }
        if let Some(v) = patch.signup_visible {
            self.signup_visible = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task_created(at: DateTime<Utc>, status: WorkerTaskStatus) -> WorkerTask {
        WorkerTask {
            id: "T1".to_string(),
            worker_id: "W1".to_string(),
            worker_name: "Worker".to_string(),
            task_description: "Pack cartons".to_string(),
            created_at: at,
            status,
            progress_notes: None,
        }
    }

    #[test]
    fn test_line_total_and_outstanding() {
        let item = SaleLineItem::new("P1", 5, 1000);
        assert_eq!(item.line_total().cents(), 5000);

        let sale = Sale {
            id: "S1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            salesman_id: "U1".to_string(),
            salesman_name: "Ali".to_string(),
            customer_id: "C1".to_string(),
            customer_name: "Shop".to_string(),
            customer_phone: "0300".to_string(),
            items: vec![item],
            discount_cents: 0,
            total_cents: 5000,
            amount_paid_cents: 3000,
            photo_ref: None,
            created_at: Utc::now(),
        };
        assert_eq!(sale.outstanding().cents(), 2000);
        assert!(!sale.is_settled());

        assert_eq!(
            sale.apply_payment(Money::from_cents(2000)).unwrap().cents(),
            5000
        );
        assert!(matches!(
            sale.apply_payment(Money::from_cents(2001)),
            Err(CoreError::Overpayment { outstanding: 2000, .. })
        ));
    }

    #[test]
    fn test_needs_reorder() {
        let mut product = Product {
            id: "P1".to_string(),
            name: "Soap".to_string(),
            sku: "SOAP-1".to_string(),
            unit: "pcs".to_string(),
            cost_price_cents: 700,
            sale_price_cents: 1000,
            stock: 10,
            reorder_level: 5,
            expiry_date: None,
            created_at: Utc::now(),
        };
        assert!(!product.needs_reorder());
        assert_eq!(product.unit_margin().cents(), 300);

        product.stock = 5;
        assert!(product.needs_reorder());
        product.stock = -2;
        assert!(product.needs_reorder());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = AppUser {
            uid: "U1".to_string(),
            email: Some("ali@example.com".to_string()),
            name: "Ali".to_string(),
            role: Some(Role::Salesman),
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name().as_deref(), Some("Ali"));

        user.name = "  ".to_string();
        assert_eq!(user.display_name().as_deref(), Some("ali@example.com"));

        user.email = None;
        assert_eq!(user.display_name(), None);
    }

    #[test]
    fn test_task_expiry_rule() {
        let yesterday = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let before_cutoff = Utc.with_ymd_and_hms(2025, 3, 2, 12, 59, 0).unwrap();
        let after_cutoff = Utc.with_ymd_and_hms(2025, 3, 2, 13, 0, 0).unwrap();

        let pending = task_created(yesterday, WorkerTaskStatus::Pending);
        assert!(!pending.should_expire(before_cutoff));
        assert!(pending.should_expire(after_cutoff));

        let today = task_created(after_cutoff, WorkerTaskStatus::Pending);
        assert!(!today.should_expire(after_cutoff));

        let done = task_created(yesterday, WorkerTaskStatus::Completed);
        assert!(!done.should_expire(after_cutoff));
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(Currency::Pkr.symbol(), "₨");
        assert_eq!(Currency::symbol_for_code(Some("EUR")), "€");
        assert_eq!(Currency::symbol_for_code(Some("gbp")), "$");
        assert_eq!(Currency::symbol_for_code(None), "$");
    }

    #[test]
    fn test_settings_patch_merges() {
        let mut settings = AppSettings::default();
        settings.apply(SettingsPatch {
            app_name: Some("Shop".to_string()),
            currency: Some(Currency::Usd),
            ..Default::default()
        });
        assert_eq!(settings.app_name, "Shop");
        assert_eq!(settings.currency, Currency::Usd);
        assert_eq!(settings.logo_dark, DEFAULT_LOGO_DARK);
        assert!(settings.signup_visible);
    }
}
