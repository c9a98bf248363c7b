//! Per-company document numbers.
//!
//! Numbers have the shape `{PREFIX}-{seq:06}`. The sequence value comes from
//! a per-company counter row owned by the database layer.

use serde::{Deserialize, Serialize};

/// Width of the zero-padded sequence part.
pub const SEQUENCE_WIDTH: usize = 6;

/// Numbered document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Ledger transaction.
    Transaction,
    /// Sale invoice.
    Sale,
    /// Purchase bill.
    Purchase,
    /// Customer money receipt.
    MoneyReceipt,
    /// Payment to a supplier.
    SupplierPayment,
    /// Expense voucher.
    Expense,
    /// Income voucher.
    Income,
    /// Transfer between accounts.
    Transfer,
    /// Goods returned by a customer.
    SaleReturn,
    /// Goods returned to a supplier.
    PurchaseReturn,
}

impl DocumentKind {
    /// Number prefix for this family.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Transaction => "TXN",
            Self::Sale => "INV",
            Self::Purchase => "PUR",
            Self::MoneyReceipt => "MR",
            Self::SupplierPayment => "SP",
            Self::Expense => "EXP",
            Self::Income => "INC",
            Self::Transfer => "TRF",
            Self::SaleReturn => "SR",
            Self::PurchaseReturn => "PR",
        }
    }
}

/// Formats a document number.
///
/// Sequences wider than six digits are printed in full.
#[must_use]
pub fn format_number(kind: DocumentKind, sequence: i64) -> String {
    format!("{}-{:0width$}", kind.prefix(), sequence, width = SEQUENCE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(DocumentKind::Transaction, 1, "TXN-000001")]
    #[case(DocumentKind::Sale, 42, "INV-000042")]
    #[case(DocumentKind::MoneyReceipt, 999_999, "MR-999999")]
    #[case(DocumentKind::Expense, 1_234_567, "EXP-1234567")]
    fn test_format_number(#[case] kind: DocumentKind, #[case] seq: i64, #[case] expected: &str) {
        assert_eq!(format_number(kind, seq), expected);
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = [
            DocumentKind::Transaction,
            DocumentKind::Sale,
            DocumentKind::Purchase,
            DocumentKind::MoneyReceipt,
            DocumentKind::SupplierPayment,
            DocumentKind::Expense,
            DocumentKind::Income,
            DocumentKind::Transfer,
            DocumentKind::SaleReturn,
            DocumentKind::PurchaseReturn,
        ]
        .iter()
        .map(|k| k.prefix())
        .collect();
        let total = prefixes.len();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), total);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Zero padding keeps lexical order equal to numeric order below a million.
        #[test]
        fn prop_lexical_order_matches_numeric(a in 1i64..999_999i64, b in 1i64..999_999i64) {
            let na = format_number(DocumentKind::Sale, a);
            let nb = format_number(DocumentKind::Sale, b);
            prop_assert_eq!(na.cmp(&nb), a.cmp(&b));
        }
    }
}
