//! Search criteria for the purchase list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::{CreditStatus, PaymentMethod, Purchase};

/// Criteria applied when re-querying the entity source.
///
/// Every unset criterion matches everything, so the default filter returns
/// the whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub supplier_id: Option<i64>,
    /// Trimmed free text; empty matches everything
    pub text: String,
    /// Inclusive lower date bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub to: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    /// Matches credit purchases in this state only
    pub credit_status: Option<CreditStatus>,
}

impl SearchFilter {
    pub fn builder() -> SearchFilterBuilder {
        SearchFilterBuilder::default()
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.trim().to_string();
    }

    /// Case-insensitive text match on invoice number, category or description,
    /// combined with the supplier, payment and date criteria.
    pub fn matches(&self, purchase: &Purchase) -> bool {
        if self.supplier_id.is_some_and(|id| id != purchase.supplier_id) {
            return false;
        }
        if self
            .payment_method
            .is_some_and(|method| method != purchase.payment_method)
        {
            return false;
        }
        if self
            .credit_status
            .is_some_and(|status| purchase.credit_status != Some(status))
        {
            return false;
        }
        if self.from.is_some_and(|from| purchase.purchased_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| purchase.purchased_at > to) {
            return false;
        }
        if self.text.is_empty() {
            return true;
        }

        let needle = self.text.to_lowercase();
        [
            &purchase.invoice_number,
            &purchase.category,
            &purchase.description,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Builder for [`SearchFilter`].
#[derive(Debug, Default)]
pub struct SearchFilterBuilder {
    filter: SearchFilter,
}

impl SearchFilterBuilder {
    pub fn supplier_id(mut self, supplier_id: i64) -> Self {
        self.filter.supplier_id = Some(supplier_id);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.filter.set_text(text);
        self
    }

    pub fn from(mut self, date: NaiveDate) -> Self {
        self.filter.from = Some(date);
        self
    }

    pub fn to(mut self, date: NaiveDate) -> Self {
        self.filter.to = Some(date);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.filter.payment_method = Some(method);
        self
    }

    pub fn credit_status(mut self, status: CreditStatus) -> Self {
        self.filter.credit_status = Some(status);
        self
    }

    pub fn build(self) -> SearchFilter {
        self.filter
    }
}
