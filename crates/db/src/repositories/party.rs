//! Inputs and summaries shared by customers and suppliers.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Input for creating a customer or supplier.
#[derive(Debug, Clone)]
pub struct CreatePartyInput {
    /// Display name.
    pub name: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<String>,
}

/// Input for updating a customer or supplier.
#[derive(Debug, Clone, Default)]
pub struct UpdatePartyInput {
    /// Display name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<Option<String>>,
    /// Contact email.
    pub email: Option<Option<String>>,
    /// Postal address.
    pub address: Option<Option<String>>,
    /// Whether the party is active.
    pub is_active: Option<bool>,
}

/// Filter options for listing parties.
#[derive(Debug, Clone, Default)]
pub struct PartyFilter {
    /// Case-insensitive name fragment.
    pub search: Option<String>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

/// Money position of a party across all its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueSummary {
    /// Customer or supplier ID.
    pub party_id: Uuid,
    /// Σ grand total.
    pub total_billed: Decimal,
    /// Σ paid amount.
    pub total_paid: Decimal,
    /// Σ returned amount.
    pub total_returned: Decimal,
    /// Σ due amount.
    pub total_due: Decimal,
    /// Current advance.
    pub advance_balance: Decimal,
}
