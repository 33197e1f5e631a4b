//! Order Model
//!
//! The order aggregate and its request payloads. Field names are camelCase
//! on the wire; money fields travel as plain JSON numbers (2 dp).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Enums
// ============================================================================

/// 订单状态 (流转不做强制校验, 任何状态可直接设置)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Accepted,
    Preparing,
    Prepared,
    Completed,
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Prepared => "prepared",
            OrderStatus::Completed => "completed",
            OrderStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 支付方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Bank,
    Prepaid,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Prepaid => "prepaid",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order aggregate
// ============================================================================

/// Order line item
///
/// Clients may attach extra keys (规格、备注等); they are kept verbatim and
/// round-trip through storage untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    /// Unit price
    pub price: f64,
    pub quantity: i32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: i32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            extra: serde_json::Map::new(),
        }
    }
}

/// Order aggregate
///
/// `subtotal`/`tax`/`total` are derived at creation; settlement recomputes
/// `total` from the stored `subtotal` and `tax` with a fresh discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Per-branch monotonic number (unbranched orders form their own scope)
    pub order_number: u64,
    pub branch_id: Option<String>,
    /// Idempotency key supplied by the client, unique when present
    pub client_request_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub table: Option<String>,
    pub customer: Option<String>,
    pub customer_id: Option<String>,
    pub waiter: Option<String>,
    pub waiter_user_id: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: Option<PaymentMethod>,
    pub bank_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub prepared_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Request payloads
// ============================================================================

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub items: Vec<OrderItem>,
    pub table: Option<String>,
    pub customer: Option<String>,
    pub customer_id: Option<String>,
    pub waiter: Option<String>,
    pub waiter_user_id: Option<String>,
    /// Honored for admins; for other roles only when the principal has no branch
    pub branch_id: Option<String>,
    pub client_request_id: Option<String>,
}

/// Update order status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Complete payment payload (结账)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentComplete {
    pub payment_method: PaymentMethod,
    /// Settlement-time discount, defaults to 0
    #[serde(default)]
    pub discount: f64,
    pub bank_type: Option<String>,
}

/// Correct payment method payload (收银员/管理员事后修正)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodUpdate {
    pub payment_method: PaymentMethod,
    pub bank_type: Option<String>,
}
