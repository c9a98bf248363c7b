//! Concurrent writers against one company.
//!
//! Document numbers must stay gap-free and unique, and a cash account must
//! never be overdrawn no matter how the writers interleave.

mod common;

use std::collections::HashSet;

use common::{account, company, date, setup};
use futures::future::join_all;
use hisab_core::LedgerError;
use hisab_core::account::AccountKind;
use hisab_db::repositories::{
    AccountRepository, CreateExpenseInput, ExpenseRepository, RepositoryError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

const WRITERS: usize = 20;

fn expense(account_id: Uuid, amount: Decimal) -> CreateExpenseInput {
    CreateExpenseInput {
        account_id,
        category: "supplies".to_string(),
        amount,
        expense_date: date(2026, 3, 1),
        note: None,
    }
}

#[tokio::test]
async fn test_concurrent_expenses_get_distinct_sequential_numbers() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let bank = account(&db, company_id, AccountKind::Bank, dec!(1000)).await;

    let tasks = (0..WRITERS).map(|_| {
        let repo = ExpenseRepository::new(db.clone());
        tokio::spawn(async move { repo.create_expense(company_id, expense(bank.id, dec!(10))).await })
    });
    let results = join_all(tasks).await;

    let numbers: HashSet<String> = results
        .into_iter()
        .map(|joined| {
            joined
                .expect("task panicked")
                .expect("create expense")
                .expense_number
        })
        .collect();

    let expected: HashSet<String> = (1..=WRITERS).map(|n| format!("EXP-{n:06}")).collect();
    assert_eq!(numbers, expected);

    let accounts = AccountRepository::new(db.clone());
    let stored = accounts
        .get_account(company_id, bank.id)
        .await
        .expect("get account");
    assert_eq!(stored.balance, dec!(800));

    let check = accounts
        .verify_balance(company_id, bank.id)
        .await
        .expect("verify");
    assert!(check.is_consistent);
}

#[tokio::test]
async fn test_concurrent_expenses_never_overdraw_cash() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(1000)).await;

    let tasks = (0..5).map(|_| {
        let repo = ExpenseRepository::new(db.clone());
        tokio::spawn(async move { repo.create_expense(company_id, expense(cash.id, dec!(300))).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            failure,
            RepositoryError::Rule(LedgerError::InsufficientBalance { .. })
        ));
    }

    let stored = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("get account");
    assert_eq!(stored.balance, dec!(100));
}
