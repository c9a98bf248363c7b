//! Account kinds and per-company uniqueness rules.
//!
//! A company owns at most one `cash` and one `other` account. `bank` and
//! `mobile` accounts are distinguished by their number, which must be unique
//! within the kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank account, identified by its number.
    Bank,
    /// Mobile wallet, identified by its number.
    Mobile,
    /// Cash drawer. One per company.
    Cash,
    /// Catch-all bucket. One per company.
    Other,
}

impl AccountKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 4] = [Self::Bank, Self::Mobile, Self::Cash, Self::Other];

    /// Whether a company may own only one account of this kind.
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Cash | Self::Other)
    }

    /// Whether accounts of this kind must carry a number.
    #[must_use]
    pub const fn requires_number(self) -> bool {
        matches!(self, Self::Bank | Self::Mobile)
    }

    /// Whether postings may take the balance below zero.
    ///
    /// Physical cash cannot be overdrawn.
    #[must_use]
    pub const fn allows_overdraft(self) -> bool {
        !matches!(self, Self::Cash)
    }

    /// Lowercase name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Mobile => "mobile",
            Self::Cash => "cash",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "mobile" => Ok(Self::Mobile),
            "cash" => Ok(Self::Cash),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown account kind: {s}")),
        }
    }
}

/// The slice of an existing account needed for uniqueness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSlot {
    /// Account ID.
    pub id: Uuid,
    /// Account kind.
    pub kind: AccountKind,
    /// Account number, if any.
    pub number: Option<String>,
}

/// Validates that an account of `kind` with `number` may exist next to `existing`.
///
/// `existing` holds the company's other accounts; pass `exclude` when
/// validating an update so the account does not collide with itself.
///
/// Returns the normalized (trimmed, empty-as-none) number.
///
/// # Errors
///
/// - `AccountNumberRequired` for bank/mobile without a number
/// - `DuplicateSingletonAccount` for a second cash/other account
/// - `DuplicateAccountNumber` for a reused bank/mobile number
pub fn validate_account_slot(
    existing: &[AccountSlot],
    kind: AccountKind,
    number: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<Option<String>, LedgerError> {
    let number = number
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string);

    if kind.requires_number() && number.is_none() {
        return Err(LedgerError::AccountNumberRequired(kind));
    }

    let others = existing.iter().filter(|a| Some(a.id) != exclude);

    if kind.is_singleton() {
        if others.clone().any(|a| a.kind == kind) {
            return Err(LedgerError::DuplicateSingletonAccount(kind));
        }
    } else if let Some(n) = &number
        && others
            .clone()
            .any(|a| a.kind == kind && a.number.as_deref() == Some(n.as_str()))
    {
        return Err(LedgerError::DuplicateAccountNumber {
            kind,
            number: n.clone(),
        });
    }

    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn slot(kind: AccountKind, number: Option<&str>) -> AccountSlot {
        AccountSlot {
            id: Uuid::new_v4(),
            kind,
            number: number.map(ToString::to_string),
        }
    }

    #[rstest]
    #[case(AccountKind::Cash)]
    #[case(AccountKind::Other)]
    fn test_second_singleton_rejected(#[case] kind: AccountKind) {
        let existing = vec![slot(kind, None)];
        assert_eq!(
            validate_account_slot(&existing, kind, None, None),
            Err(LedgerError::DuplicateSingletonAccount(kind))
        );
    }

    #[test]
    fn test_singleton_update_does_not_collide_with_itself() {
        let cash = slot(AccountKind::Cash, None);
        let existing = vec![cash.clone()];
        assert!(validate_account_slot(&existing, AccountKind::Cash, None, Some(cash.id)).is_ok());
    }

    #[rstest]
    #[case(AccountKind::Bank, None)]
    #[case(AccountKind::Mobile, Some("   "))]
    fn test_number_required(#[case] kind: AccountKind, #[case] number: Option<&str>) {
        assert_eq!(
            validate_account_slot(&[], kind, number, None),
            Err(LedgerError::AccountNumberRequired(kind))
        );
    }

    #[test]
    fn test_same_number_different_kind_allowed() {
        let existing = vec![slot(AccountKind::Bank, Some("0171"))];
        let result = validate_account_slot(&existing, AccountKind::Mobile, Some("0171"), None);
        assert_eq!(result, Ok(Some("0171".to_string())));
    }

    #[test]
    fn test_number_is_trimmed() {
        let existing = vec![slot(AccountKind::Bank, Some("123"))];
        assert_eq!(
            validate_account_slot(&existing, AccountKind::Bank, Some(" 123 "), None),
            Err(LedgerError::DuplicateAccountNumber {
                kind: AccountKind::Bank,
                number: "123".to_string(),
            })
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(AccountKind::from_str("BANK").unwrap(), AccountKind::Bank);
        assert_eq!(AccountKind::from_str("cash").unwrap(), AccountKind::Cash);
        assert!(AccountKind::from_str("wallet").is_err());
    }

    #[test]
    fn test_only_cash_blocks_overdraft() {
        assert!(!AccountKind::Cash.allows_overdraft());
        assert!(AccountKind::Bank.allows_overdraft());
        assert!(AccountKind::Mobile.allows_overdraft());
        assert!(AccountKind::Other.allows_overdraft());
    }

    fn kind_strategy() -> impl Strategy<Value = AccountKind> {
        prop::sample::select(AccountKind::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Accepting accounts one by one never yields two singletons of a kind
        /// or two numbered accounts sharing (kind, number).
        #[test]
        fn prop_accepted_accounts_stay_unique(
            requests in prop::collection::vec((kind_strategy(), "[0-9]{1,2}"), 0..30),
        ) {
            let mut accepted: Vec<AccountSlot> = Vec::new();
            for (kind, number) in requests {
                if let Ok(number) = validate_account_slot(&accepted, kind, Some(number.as_str()), None) {
                    accepted.push(AccountSlot { id: Uuid::new_v4(), kind, number });
                }
            }

            for kind in AccountKind::ALL {
                let same: Vec<_> = accepted.iter().filter(|a| a.kind == kind).collect();
                if kind.is_singleton() {
                    prop_assert!(same.len() <= 1);
                } else {
                    let mut numbers: Vec<_> = same.iter().map(|a| a.number.clone()).collect();
                    numbers.sort();
                    numbers.dedup();
                    prop_assert_eq!(numbers.len(), same.len());
                }
            }
        }
    }
}
