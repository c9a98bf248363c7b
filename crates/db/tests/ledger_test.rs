//! Integration tests for accounts, postings, reversals, transfers and vouchers.

mod common;

use common::{account, company, date, setup};
use hisab_core::LedgerError;
use hisab_core::account::AccountKind;
use hisab_core::ledger::{EntrySide, TransactionKind};
use hisab_db::repositories::{
    AccountRepository, CreateAdjustmentInput, CreateExpenseInput, CreateIncomeInput,
    CreateTransferInput, ExpenseRepository, IncomeRepository, ReportRepository, RepositoryError,
    TransactionFilter, TransactionRepository, TransferRepository, UpdateExpenseInput,
};
use hisab_shared::types::PageRequest;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_opening_balance_is_posted_to_ledger() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;

    let cash = account(&db, company_id, AccountKind::Cash, dec!(500)).await;
    assert_eq!(cash.balance, dec!(500));

    let check = AccountRepository::new(db.clone())
        .verify_balance(company_id, cash.id)
        .await
        .expect("verify");
    assert!(check.is_consistent);
    assert_eq!(check.computed, dec!(500));
}

#[tokio::test]
async fn test_second_cash_account_rejected() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    account(&db, company_id, AccountKind::Cash, dec!(0)).await;

    let result = AccountRepository::new(db.clone())
        .create_account(
            company_id,
            hisab_db::repositories::CreateAccountInput {
                name: "Second drawer".to_string(),
                kind: AccountKind::Cash,
                number: None,
                bank_name: None,
                branch: None,
                opening_balance: dec!(0),
                opening_date: None,
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::DuplicateSingletonAccount(AccountKind::Cash)))
    ));
}

#[tokio::test]
async fn test_cash_cannot_be_overdrawn_but_bank_can() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(100)).await;
    let bank = account(&db, company_id, AccountKind::Bank, dec!(0)).await;
    let expenses = ExpenseRepository::new(db.clone());

    let overdraw = expenses
        .create_expense(
            company_id,
            CreateExpenseInput {
                account_id: cash.id,
                category: "rent".to_string(),
                amount: dec!(150),
                expense_date: date(2026, 2, 1),
                note: None,
            },
        )
        .await;
    assert!(matches!(
        overdraw,
        Err(RepositoryError::Rule(LedgerError::InsufficientBalance { .. }))
    ));

    let expense = expenses
        .create_expense(
            company_id,
            CreateExpenseInput {
                account_id: bank.id,
                category: "rent".to_string(),
                amount: dec!(150),
                expense_date: date(2026, 2, 1),
                note: None,
            },
        )
        .await
        .expect("bank overdraft allowed");
    assert_eq!(expense.amount, dec!(150));

    let bank = AccountRepository::new(db.clone())
        .get_account(company_id, bank.id)
        .await
        .expect("bank");
    assert_eq!(bank.balance, dec!(-150));
}

#[tokio::test]
async fn test_adjustment_reversal_restores_balance_once() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let ledger = TransactionRepository::new(db.clone());

    let adjustment = ledger
        .create_adjustment(
            company_id,
            CreateAdjustmentInput {
                account_id: cash.id,
                side: EntrySide::Credit,
                amount: dec!(75.50),
                date: date(2026, 3, 1),
                description: "Found in drawer".to_string(),
            },
        )
        .await
        .expect("adjustment");
    assert_eq!(adjustment.balance_after, dec!(75.50));

    let reversal = ledger
        .reverse_transaction(company_id, adjustment.id, "counted twice")
        .await
        .expect("reversal");
    assert_eq!(reversal.debit, dec!(75.50));
    assert_eq!(reversal.balance_after, dec!(0));
    assert_eq!(reversal.transaction_date, adjustment.transaction_date);

    let again = ledger
        .reverse_transaction(company_id, adjustment.id, "again")
        .await;
    assert!(matches!(
        again,
        Err(RepositoryError::Rule(LedgerError::AlreadyReversed(_)))
    ));

    let of_reversal = ledger
        .reverse_transaction(company_id, reversal.id, "undo")
        .await;
    assert!(matches!(
        of_reversal,
        Err(RepositoryError::Rule(LedgerError::CannotReverseReversal(_)))
    ));
}

#[tokio::test]
async fn test_document_transactions_not_directly_reversible() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(100)).await;

    let income = IncomeRepository::new(db.clone())
        .create_income(
            company_id,
            CreateIncomeInput {
                account_id: cash.id,
                category: "interest".to_string(),
                amount: dec!(10),
                income_date: date(2026, 3, 2),
                note: None,
            },
        )
        .await
        .expect("income");

    let result = TransactionRepository::new(db.clone())
        .reverse_transaction(company_id, income.transaction_id, "manual")
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::OwnedByDocument(_)))
    ));
}

#[tokio::test]
async fn test_opening_balance_not_directly_reversible() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let bank = account(&db, company_id, AccountKind::Bank, dec!(100)).await;
    let ledger = TransactionRepository::new(db.clone());

    let opening = ledger
        .list_transactions(
            company_id,
            TransactionFilter {
                account_id: Some(bank.id),
                kind: Some(TransactionKind::OpeningBalance),
                ..TransactionFilter::default()
            },
            &PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(opening.data.len(), 1);

    let result = ledger
        .reverse_transaction(company_id, opening.data[0].id, "typo")
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::OwnedByDocument(_)))
    ));

    let stored = AccountRepository::new(db.clone())
        .get_account(company_id, bank.id)
        .await
        .expect("get account");
    assert_eq!(stored.balance, dec!(100));
}

#[tokio::test]
async fn test_transaction_numbers_are_sequential_per_company() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(10)).await;
    let ledger = TransactionRepository::new(db.clone());

    let second = ledger
        .create_adjustment(
            company_id,
            CreateAdjustmentInput {
                account_id: cash.id,
                side: EntrySide::Credit,
                amount: dec!(1),
                date: date(2026, 1, 2),
                description: "Top up".to_string(),
            },
        )
        .await
        .expect("adjustment");

    // The opening balance took TXN-000001.
    assert_eq!(second.transaction_number, "TXN-000002");

    let page = ledger
        .list_transactions(company_id, Default::default(), &PageRequest::default())
        .await
        .expect("list");
    assert_eq!(page.meta.total, 2);
}

#[tokio::test]
async fn test_transfer_and_delete_round_trip_balances() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(300)).await;
    let bank = account(&db, company_id, AccountKind::Bank, dec!(0)).await;
    let transfers = TransferRepository::new(db.clone());
    let accounts = AccountRepository::new(db.clone());

    let same = transfers
        .create_transfer(
            company_id,
            CreateTransferInput {
                from_account_id: cash.id,
                to_account_id: cash.id,
                amount: dec!(10),
                transfer_date: date(2026, 4, 1),
                note: None,
            },
        )
        .await;
    assert!(matches!(
        same,
        Err(RepositoryError::Rule(LedgerError::SameAccountTransfer))
    ));

    let transfer = transfers
        .create_transfer(
            company_id,
            CreateTransferInput {
                from_account_id: cash.id,
                to_account_id: bank.id,
                amount: dec!(120),
                transfer_date: date(2026, 4, 1),
                note: None,
            },
        )
        .await
        .expect("transfer");
    assert!(transfer.transfer_number.starts_with("TRF-"));

    let cash_after = accounts.get_account(company_id, cash.id).await.expect("cash");
    let bank_after = accounts.get_account(company_id, bank.id).await.expect("bank");
    assert_eq!(cash_after.balance, dec!(180));
    assert_eq!(bank_after.balance, dec!(120));

    transfers
        .delete_transfer(company_id, transfer.id)
        .await
        .expect("delete");

    let cash_after = accounts.get_account(company_id, cash.id).await.expect("cash");
    let bank_after = accounts.get_account(company_id, bank.id).await.expect("bank");
    assert_eq!(cash_after.balance, dec!(300));
    assert_eq!(bank_after.balance, dec!(0));
}

#[tokio::test]
async fn test_expense_update_reposts_and_statement_tracks_it() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(1000)).await;
    let expenses = ExpenseRepository::new(db.clone());

    let expense = expenses
        .create_expense(
            company_id,
            CreateExpenseInput {
                account_id: cash.id,
                category: "utilities".to_string(),
                amount: dec!(200),
                expense_date: date(2026, 5, 10),
                note: None,
            },
        )
        .await
        .expect("expense");

    let updated = expenses
        .update_expense(
            company_id,
            expense.id,
            UpdateExpenseInput {
                amount: Some(dec!(250)),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_ne!(updated.transaction_id, expense.transaction_id);
    assert_eq!(updated.amount, dec!(250));

    let statement = ReportRepository::new(db.clone())
        .account_statement(company_id, cash.id, Some(date(2026, 5, 1)), None)
        .await
        .expect("statement");
    assert_eq!(statement.opening_balance, dec!(1000));
    // Original debit, its reversal, and the new debit.
    assert_eq!(statement.rows.len(), 3);
    assert_eq!(statement.closing_balance, dec!(750));

    let check = AccountRepository::new(db.clone())
        .verify_balance(company_id, cash.id)
        .await
        .expect("verify");
    assert!(check.is_consistent);
}

#[tokio::test]
async fn test_deactivate_account_requires_zero_balance() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let bank = account(&db, company_id, AccountKind::Bank, dec!(50)).await;
    let accounts = AccountRepository::new(db.clone());

    let result = accounts.deactivate_account(company_id, bank.id).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::AccountHasBalance(_)))
    ));

    let empty = account(&db, company_id, AccountKind::Mobile, dec!(0)).await;
    let deactivated = accounts
        .deactivate_account(company_id, empty.id)
        .await
        .expect("deactivate");
    assert!(!deactivated.is_active);
}
