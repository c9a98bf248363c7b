//! Shared setup for database integration tests.
//!
//! Tests run against `DATABASE_URL` (or `HISAB__DATABASE__URL`) and are
//! skipped when neither is set. Each test creates its own company, so tests
//! do not see each other's rows.

#![allow(dead_code)]

use std::env;

use chrono::NaiveDate;
use hisab_core::account::AccountKind;
use hisab_db::entities::{accounts, customers, products, suppliers};
use hisab_db::migration::Migrator;
use hisab_db::repositories::{
    AccountRepository, CompanyRepository, CreateAccountInput, CreateCompanyInput,
    CreatePartyInput, CreateProductInput, CustomerRepository, ProductRepository,
    SupplierRepository,
};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("HISAB__DATABASE__URL"))
        .ok()
}

/// Connects and migrates, or returns `None` when no database is configured.
pub async fn setup() -> Option<DatabaseConnection> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to database");

    MIGRATED
        .get_or_init(|| async {
            Migrator::up(&db, None).await.expect("Failed to run migrations");
        })
        .await;

    Some(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn company(db: &DatabaseConnection) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    CompanyRepository::new(db.clone())
        .create_company(CreateCompanyInput {
            name: format!("Test Co {suffix}"),
            slug: format!("test-{suffix}"),
            address: None,
            phone: None,
        })
        .await
        .expect("create company")
        .id
}

pub async fn account(
    db: &DatabaseConnection,
    company_id: Uuid,
    kind: AccountKind,
    opening: Decimal,
) -> accounts::Model {
    let number = match kind {
        AccountKind::Bank | AccountKind::Mobile => {
            Some(Uuid::new_v4().simple().to_string()[..12].to_string())
        }
        AccountKind::Cash | AccountKind::Other => None,
    };
    AccountRepository::new(db.clone())
        .create_account(
            company_id,
            CreateAccountInput {
                name: format!("{kind} account"),
                kind,
                number,
                bank_name: None,
                branch: None,
                opening_balance: opening,
                opening_date: Some(date(2026, 1, 1)),
            },
        )
        .await
        .expect("create account")
}

pub async fn product(
    db: &DatabaseConnection,
    company_id: Uuid,
    stock: Decimal,
    price: Decimal,
) -> products::Model {
    ProductRepository::new(db.clone())
        .create_product(
            company_id,
            CreateProductInput {
                name: "Widget".to_string(),
                sku: format!("W-{}", Uuid::new_v4().simple()),
                unit: "pcs".to_string(),
                purchase_price: price,
                sale_price: price,
                stock_quantity: stock,
            },
        )
        .await
        .expect("create product")
}

fn party(name: &str) -> CreatePartyInput {
    CreatePartyInput {
        name: name.to_string(),
        phone: None,
        email: None,
        address: None,
    }
}

pub async fn customer(db: &DatabaseConnection, company_id: Uuid) -> customers::Model {
    CustomerRepository::new(db.clone())
        .create_customer(company_id, party("Rahim Traders"))
        .await
        .expect("create customer")
}

pub async fn supplier(db: &DatabaseConnection, company_id: Uuid) -> suppliers::Model {
    SupplierRepository::new(db.clone())
        .create_supplier(company_id, party("Karim Wholesale"))
        .await
        .expect("create supplier")
}
