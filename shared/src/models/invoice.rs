//! Invoice Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice lifecycle status
///
/// Valid transitions: `Pending -> Confirmed -> Shipped -> Completed`.
/// `Cancelled` is reachable from any non-terminal status and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl InvoiceStatus {
    /// Whether `self -> next` is a permitted transition
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Shipped, Cancelled)
        )
    }

    /// Terminal statuses admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Completed | InvoiceStatus::Cancelled)
    }

    /// Wire representation (lowercase)
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Confirmed => "confirmed",
            InvoiceStatus::Shipped => "shipped",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub quantity: i32,
    pub price_per_unit: Decimal,
}

impl InvoiceItem {
    /// Line total (`quantity * price_per_unit`)
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price_per_unit
    }
}

/// Invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Option<String>,
    pub status: InvoiceStatus,
    pub customer_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
}
