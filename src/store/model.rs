//! Row-store records: purchases and the line items whose quantities are aggregated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::{Aggregate, EntityId};
use crate::paginator::Keyed;

/// Largest quantity one line item may carry. Keeps per-purchase sums far
/// from `i64` overflow.
pub const MAX_QUANTITY: Aggregate = i32::MAX as Aggregate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Credit,
}

/// Settlement state of a purchase bought on credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// A purchase invoice. Listed in the paginated view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: EntityId,
    pub supplier_id: i64,
    pub invoice_number: String,
    pub category: String,
    pub description: String,
    pub purchased_at: NaiveDate,
    /// Invoice total in minor currency units
    pub total: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Only set for credit purchases
    #[serde(default)]
    pub credit_status: Option<CreditStatus>,
}

impl Keyed for Purchase {
    fn key(&self) -> EntityId {
        self.id
    }
}

/// One line of a purchase. `quantity` feeds the purchase's aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub purchase_id: EntityId,
    pub quantity: Aggregate,
    pub description: String,
    pub code: String,
    /// Minor currency units
    pub unit_price: i64,
}

impl LineItem {
    /// `quantity * unit_price`, or `None` if it does not fit in an `i64`.
    pub fn subtotal(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// Fields needed to add a line item; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub quantity: Aggregate,
    pub description: String,
    pub code: String,
    pub unit_price: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_key() {
        let purchase = Purchase {
            id: 12,
            supplier_id: 1,
            invoice_number: "FV-12".to_string(),
            category: "insumos".to_string(),
            description: "Guantes".to_string(),
            purchased_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total: 50_000,
            ..Default::default()
        };
        assert_eq!(purchase.key(), 12);
    }

    #[test]
    fn test_line_item_subtotal() {
        let item = LineItem {
            id: 1,
            purchase_id: 12,
            quantity: 3,
            description: "Caja".to_string(),
            code: "C-1".to_string(),
            unit_price: 2_500,
        };
        assert_eq!(item.subtotal(), Some(7_500));
    }

    #[test]
    fn test_line_item_subtotal_overflow() {
        let item = LineItem {
            id: 1,
            purchase_id: 12,
            quantity: MAX_QUANTITY,
            description: String::new(),
            code: String::new(),
            unit_price: i64::MAX / 2,
        };
        assert_eq!(item.subtotal(), None);
    }

    #[test]
    fn test_purchase_payment_defaults_when_absent() {
        let json = r#"{"id":1,"supplier_id":2,"invoice_number":"FV-1","category":"aseo",
            "description":"Jabon","purchased_at":"2024-03-01","total":100}"#;
        let purchase: Purchase = serde_json::from_str(json).unwrap();
        assert_eq!(purchase.payment_method, PaymentMethod::Cash);
        assert_eq!(purchase.credit_status, None);

        let json = serde_json::to_string(&PaymentMethod::Credit).unwrap();
        assert_eq!(json, "\"credit\"");
    }
}
