//! Account repository for cash, bank and mobile ledger buckets.
//!
//! Balances are never written here directly; an opening balance goes through
//! the ledger as an `opening_balance` credit.

use chrono::{NaiveDate, Utc};
use hisab_core::LedgerError;
use hisab_core::account::{AccountKind, AccountSlot, validate_account_slot};
use hisab_core::ledger::{EntrySide, Posting, TransactionKind, recompute_balance};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::company::require_company;
use super::error::{RepositoryError, on_unique_violation};
use super::transaction::{PostingRequest, Source, lock_account, post};
use crate::entities::{accounts, sea_orm_active_enums, transactions};

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Display name.
    pub name: String,
    /// Account kind.
    pub kind: AccountKind,
    /// Account number; required for bank and mobile.
    pub number: Option<String>,
    /// Bank name.
    pub bank_name: Option<String>,
    /// Branch.
    pub branch: Option<String>,
    /// Balance carried in; zero for none.
    pub opening_balance: Decimal,
    /// Date of the opening balance; today when omitted.
    pub opening_date: Option<NaiveDate>,
}

/// Input for updating an account.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// Display name.
    pub name: Option<String>,
    /// Account number.
    pub number: Option<Option<String>>,
    /// Bank name.
    pub bank_name: Option<Option<String>>,
    /// Branch.
    pub branch: Option<Option<String>>,
    /// Whether the account accepts postings.
    pub is_active: Option<bool>,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by kind.
    pub kind: Option<AccountKind>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

/// Stored balance compared to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceCheck {
    /// Account ID.
    pub account_id: Uuid,
    /// `accounts.balance`.
    pub stored: Decimal,
    /// Σ credit − Σ debit over all rows.
    pub computed: Decimal,
    /// `stored − computed`.
    pub difference: Decimal,
    /// Whether the two agree.
    pub is_consistent: bool,
}

async fn company_slots<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
) -> Result<Vec<AccountSlot>, RepositoryError> {
    let rows = accounts::Entity::find()
        .filter(accounts::Column::CompanyId.eq(company_id))
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|a| AccountSlot {
            id: a.id,
            kind: a.kind.into(),
            number: a.number,
        })
        .collect())
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account, posting its opening balance when positive.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The company does not exist
    /// - A second cash/other account is requested
    /// - A bank/mobile number is missing or already used
    /// - The opening balance is negative
    pub async fn create_account(
        &self,
        company_id: Uuid,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, RepositoryError> {
        if input.opening_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(input.opening_balance).into());
        }

        let txn = self.db.begin().await?;
        require_company(&txn, company_id).await?;

        let existing = company_slots(&txn, company_id).await?;
        let number = validate_account_slot(&existing, input.kind, input.number.as_deref(), None)
            .inspect_err(|e| warn!(company_id = %company_id, error = %e, "Account rejected"))?;

        let now = Utc::now().into();
        let account_id = Uuid::new_v4();
        let kind = input.kind;
        accounts::ActiveModel {
            id: Set(account_id),
            company_id: Set(company_id),
            name: Set(input.name),
            kind: Set(kind.into()),
            number: Set(number),
            bank_name: Set(input.bank_name),
            branch: Set(input.branch),
            balance: Set(Decimal::ZERO),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| on_unique_violation(e, || format!("Duplicate {kind} account")))?;

        if input.opening_balance > Decimal::ZERO {
            post(
                &txn,
                PostingRequest {
                    company_id,
                    account_id,
                    kind: TransactionKind::OpeningBalance,
                    side: EntrySide::Credit,
                    amount: input.opening_balance,
                    date: input
                        .opening_date
                        .unwrap_or_else(|| Utc::now().date_naive()),
                    description: "Opening balance".to_string(),
                    source: Some((Source::Account, account_id)),
                },
            )
            .await?;
        }

        let account = accounts::Entity::find_by_id(account_id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::not_found("Account", account_id))?;

        txn.commit().await?;

        info!(
            company_id = %company_id,
            account_id = %account.id,
            kind = %kind,
            balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    /// Gets an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account is not in the company.
    pub async fn get_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<accounts::Model, RepositoryError> {
        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Account", account_id))
    }

    /// Lists accounts of a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        company_id: Uuid,
        filter: AccountFilter,
    ) -> Result<Vec<accounts::Model>, RepositoryError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id))
            .order_by_asc(accounts::Column::Kind)
            .order_by_asc(accounts::Column::Name);

        if let Some(kind) = filter.kind {
            query = query
                .filter(accounts::Column::Kind.eq(sea_orm_active_enums::AccountKind::from(kind)));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(accounts::Column::IsActive.eq(is_active));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Updates an account.
    ///
    /// Changing the number re-checks the kind rules. Deactivating goes
    /// through the same zero-balance check as [`Self::deactivate_account`].
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing, the new number collides,
    /// or a non-zero account is deactivated.
    pub async fn update_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, RepositoryError> {
        let txn = self.db.begin().await?;
        let account = lock_account(&txn, company_id, account_id).await?;
        let kind: AccountKind = account.kind.into();

        let number = match input.number {
            Some(number) => {
                let existing = company_slots(&txn, company_id).await?;
                Some(validate_account_slot(
                    &existing,
                    kind,
                    number.as_deref(),
                    Some(account_id),
                )?)
            }
            None => None,
        };

        if input.is_active == Some(false) && !account.balance.is_zero() {
            return Err(LedgerError::AccountHasBalance(account_id).into());
        }

        let mut active: accounts::ActiveModel = account.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(number) = number {
            active.number = Set(number);
        }
        if let Some(bank_name) = input.bank_name {
            active.bank_name = Set(bank_name);
        }
        if let Some(branch) = input.branch {
            active.branch = Set(branch);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| on_unique_violation(e, || format!("Duplicate {kind} account number")))?;
        txn.commit().await?;

        Ok(updated)
    }

    /// Soft-deletes an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountHasBalance` while money remains in the account.
    pub async fn deactivate_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<accounts::Model, RepositoryError> {
        self.update_account(
            company_id,
            account_id,
            UpdateAccountInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Recomputes the balance from the ledger and compares it to the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or a stored row is malformed.
    pub async fn verify_balance(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<BalanceCheck, RepositoryError> {
        let account = self.get_account(company_id, account_id).await?;

        let rows = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .all(&self.db)
            .await?;
        let postings = rows
            .iter()
            .map(|t| Posting::from_parts(t.debit, t.credit))
            .collect::<Result<Vec<_>, _>>()?;

        let computed = recompute_balance(&postings);
        let difference = account.balance - computed;
        if !difference.is_zero() {
            warn!(
                account_id = %account_id,
                stored = %account.balance,
                %computed,
                "Account balance drift"
            );
        }

        Ok(BalanceCheck {
            account_id,
            stored: account.balance,
            computed,
            difference,
            is_consistent: difference.is_zero(),
        })
    }
}
