//! Ledger postings.
//!
//! [`post`] and [`reverse`] are the only code paths that change
//! `accounts.balance`. Every business event calls them inside its own
//! database transaction.

use chrono::{NaiveDate, Utc};
use hisab_core::ledger::{
    self, AccountState, EntrySide, Posting, ReversalCandidate, TransactionKind, apply_posting,
    apply_reversal, ensure_reversible,
};
use hisab_core::numbering::DocumentKind;
use hisab_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::RepositoryError;
use super::numbering::next_number;
use super::page::fetch_page;
use crate::entities::{accounts, transactions};

/// Kind of record that owns a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Opening balance of an account.
    Account,
    /// Sale payment.
    Sale,
    /// Purchase payment.
    Purchase,
    /// Customer money receipt.
    MoneyReceipt,
    /// Payment to a supplier.
    SupplierPayment,
    /// Expense voucher.
    Expense,
    /// Income voucher.
    Income,
    /// Account transfer leg.
    Transfer,
    /// Refund on a sale return.
    SaleReturn,
    /// Refund on a purchase return.
    PurchaseReturn,
}

impl Source {
    /// Value stored in `transactions.source_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::MoneyReceipt => "money_receipt",
            Self::SupplierPayment => "supplier_payment",
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "account_transfer",
            Self::SaleReturn => "sale_return",
            Self::PurchaseReturn => "purchase_return",
        }
    }
}

/// A single ledger posting to write.
#[derive(Debug, Clone)]
pub struct PostingRequest {
    /// Company ID.
    pub company_id: Uuid,
    /// Account moved.
    pub account_id: Uuid,
    /// Why the row exists.
    pub kind: TransactionKind,
    /// Debit (money out) or credit (money in).
    pub side: EntrySide,
    /// Positive amount.
    pub amount: Decimal,
    /// Business date.
    pub date: NaiveDate,
    /// Free text.
    pub description: String,
    /// Owning record, if any.
    pub source: Option<(Source, Uuid)>,
}

/// Loads an account of the company and locks it for update.
pub(crate) async fn lock_account<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    account_id: Uuid,
) -> Result<accounts::Model, RepositoryError> {
    accounts::Entity::find_by_id(account_id)
        .filter(accounts::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Account", account_id))
}

async fn store_balance<C: ConnectionTrait>(
    conn: &C,
    account: accounts::Model,
    balance: Decimal,
) -> Result<(), RepositoryError> {
    let mut active: accounts::ActiveModel = account.into();
    active.balance = Set(balance);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

/// Posts one transaction and moves the account balance.
///
/// The account row stays locked until the caller commits.
///
/// # Errors
///
/// - `NotFound` if the account is not in the company
/// - `NonPositiveAmount`, `AccountInactive`, `InsufficientBalance` from the posting rules
pub async fn post<C: ConnectionTrait>(
    conn: &C,
    request: PostingRequest,
) -> Result<transactions::Model, RepositoryError> {
    let posting = Posting::new(request.side, request.amount)?;
    let account = lock_account(conn, request.company_id, request.account_id).await?;

    let state = AccountState {
        id: account.id,
        kind: account.kind.into(),
        is_active: account.is_active,
        balance: account.balance,
    };
    let balance_after = apply_posting(&state, &posting)?;
    let number = next_number(conn, request.company_id, DocumentKind::Transaction).await?;

    let (source_type, source_id) = match request.source {
        Some((source, id)) => (Some(source.as_str().to_string()), Some(id)),
        None => (None, None),
    };

    let row = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(request.company_id),
        account_id: Set(account.id),
        transaction_number: Set(number),
        kind: Set(request.kind.into()),
        debit: Set(posting.debit_amount()),
        credit: Set(posting.credit_amount()),
        balance_after: Set(balance_after),
        transaction_date: Set(request.date),
        description: Set(request.description),
        source_type: Set(source_type),
        source_id: Set(source_id),
        reversal_of: Set(None),
        is_reversed: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    store_balance(conn, account, balance_after).await?;

    debug!(
        transaction_id = %row.id,
        number = %row.transaction_number,
        kind = %request.kind,
        %balance_after,
        "Posted transaction"
    );
    Ok(row)
}

/// Posts the compensating entry for a transaction and marks it reversed.
///
/// `direct` is true for API requests; document code passes false so it can
/// unwind the rows it owns.
///
/// # Errors
///
/// - `NotFound` if the transaction is not in the company
/// - `CannotReverseReversal`, `AlreadyReversed`, `OwnedByDocument` from the reversal rules
pub async fn reverse<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    transaction_id: Uuid,
    reason: &str,
    direct: bool,
) -> Result<transactions::Model, RepositoryError> {
    let original = transactions::Entity::find_by_id(transaction_id)
        .filter(transactions::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Transaction", transaction_id))?;

    ensure_reversible(
        &ReversalCandidate {
            id: original.id,
            kind: original.kind.into(),
            is_reversed: original.is_reversed,
        },
        direct,
    )?;

    let posting = Posting::from_parts(original.debit, original.credit)?;
    let compensating = posting.reversed();
    let account = lock_account(conn, company_id, original.account_id).await?;
    let balance_after = apply_reversal(account.balance, &posting);
    let number = next_number(conn, company_id, DocumentKind::Transaction).await?;

    let reversal = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company_id),
        account_id: Set(account.id),
        transaction_number: Set(number),
        kind: Set(TransactionKind::Reversal.into()),
        debit: Set(compensating.debit_amount()),
        credit: Set(compensating.credit_amount()),
        balance_after: Set(balance_after),
        transaction_date: Set(original.transaction_date),
        description: Set(format!(
            "Reversal of {}: {reason}",
            original.transaction_number
        )),
        source_type: Set(original.source_type.clone()),
        source_id: Set(original.source_id),
        reversal_of: Set(Some(original.id)),
        is_reversed: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    let mut marked: transactions::ActiveModel = original.into();
    marked.is_reversed = Set(true);
    marked.update(conn).await?;

    store_balance(conn, account, balance_after).await?;

    debug!(
        transaction_id = %transaction_id,
        reversal_id = %reversal.id,
        %balance_after,
        "Reversed transaction"
    );
    Ok(reversal)
}

/// Reverses every live row owned by a record.
///
/// Returns the reversal rows.
pub(crate) async fn reverse_source<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    source: Source,
    source_id: Uuid,
    reason: &str,
) -> Result<Vec<transactions::Model>, RepositoryError> {
    let live = transactions::Entity::find()
        .filter(transactions::Column::CompanyId.eq(company_id))
        .filter(transactions::Column::SourceType.eq(source.as_str()))
        .filter(transactions::Column::SourceId.eq(source_id))
        .filter(transactions::Column::IsReversed.eq(false))
        .filter(transactions::Column::ReversalOf.is_null())
        .order_by_asc(transactions::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut reversals = Vec::with_capacity(live.len());
    for row in live {
        reversals.push(reverse(conn, company_id, row.id, reason, false).await?);
    }
    Ok(reversals)
}

/// Input for a manual ledger adjustment.
#[derive(Debug, Clone)]
pub struct CreateAdjustmentInput {
    /// Account to adjust.
    pub account_id: Uuid,
    /// Debit or credit.
    pub side: EntrySide,
    /// Positive amount.
    pub amount: Decimal,
    /// Business date.
    pub date: NaiveDate,
    /// Reason for the adjustment.
    pub description: String,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by account.
    pub account_id: Option<Uuid>,
    /// Filter by kind.
    pub kind: Option<ledger::TransactionKind>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// Transaction repository for ledger reads and manual corrections.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Posts a manual adjustment.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or a posting rule fails.
    pub async fn create_adjustment(
        &self,
        company_id: Uuid,
        input: CreateAdjustmentInput,
    ) -> Result<transactions::Model, RepositoryError> {
        let txn = self.db.begin().await?;

        let row = post(
            &txn,
            PostingRequest {
                company_id,
                account_id: input.account_id,
                kind: TransactionKind::Adjustment,
                side: input.side,
                amount: input.amount,
                date: input.date,
                description: input.description,
                source: None,
            },
        )
        .await?;

        txn.commit().await?;

        info!(
            company_id = %company_id,
            transaction_id = %row.id,
            number = %row.transaction_number,
            "Adjustment posted"
        );
        Ok(row)
    }

    /// Reverses an adjustment or opening balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is missing, owned by a document,
    /// already reversed, or itself a reversal.
    pub async fn reverse_transaction(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
        reason: &str,
    ) -> Result<transactions::Model, RepositoryError> {
        let txn = self.db.begin().await?;
        let reversal = reverse(&txn, company_id, transaction_id, reason, true).await?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            transaction_id = %transaction_id,
            reversal_id = %reversal.id,
            "Transaction reversed"
        );
        Ok(reversal)
    }

    /// Lists transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactions(
        &self,
        company_id: Uuid,
        filter: TransactionFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<transactions::Model>, RepositoryError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::CompanyId.eq(company_id));

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(kind) = filter.kind {
            let kind: crate::entities::sea_orm_active_enums::TransactionKind = kind.into();
            query = query.filter(transactions::Column::Kind.eq(kind));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }

        let query = query
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::CreatedAt);

        Ok(fetch_page(&self.db, query, page).await?)
    }

    /// Gets a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not found or the query fails.
    pub async fn get_transaction(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, RepositoryError> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Transaction", transaction_id))
    }
}
