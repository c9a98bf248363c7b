//! Database seeder for Hisab development and testing.
//!
//! Creates a demo company with accounts, products, parties and a few
//! documents. Everything goes through the repositories, so balances carry a
//! full ledger trail. Running it twice is a no-op.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use hisab_core::account::AccountKind;
use hisab_db::entities::products;
use hisab_db::repositories::{
    AccountRepository, CompanyRepository, CreateAccountInput, CreateCompanyInput,
    CreateExpenseInput, CreateMoneyReceiptInput, CreatePartyInput, CreateProductInput,
    CreatePurchaseInput, CreateSaleInput, CustomerRepository, ExpenseRepository,
    MoneyReceiptRepository, ProductRepository, PurchaseItemInput, PurchaseRepository,
    SaleItemInput, SaleRepository, SupplierRepository,
};

const DEMO_SLUG: &str = "demo-store";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("HISAB__DATABASE__URL"))
        .context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = hisab_db::connect(&database_url, 2, 1)
        .await
        .context("Failed to connect to database")?;

    let companies = CompanyRepository::new(db.clone());
    if companies.slug_exists(DEMO_SLUG).await? {
        println!("  Demo company already exists, skipping...");
        return Ok(());
    }

    println!("Seeding demo company...");
    let company_id = companies
        .create_company(CreateCompanyInput {
            name: "Demo Store".to_string(),
            slug: DEMO_SLUG.to_string(),
            address: Some("12 Market Road".to_string()),
            phone: Some("01700000000".to_string()),
        })
        .await?
        .id;

    let start = Utc::now().date_naive() - Duration::days(30);

    println!("Seeding accounts...");
    let (cash, bank) = seed_accounts(&db, company_id, start).await?;

    println!("Seeding products...");
    let products = seed_products(&db, company_id).await?;

    println!("Seeding parties and documents...");
    seed_documents(&db, company_id, cash, bank, &products, start).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_accounts(
    db: &DatabaseConnection,
    company_id: Uuid,
    opened: NaiveDate,
) -> anyhow::Result<(Uuid, Uuid)> {
    let accounts = AccountRepository::new(db.clone());

    let cash = accounts
        .create_account(
            company_id,
            CreateAccountInput {
                name: "Cash drawer".to_string(),
                kind: AccountKind::Cash,
                number: None,
                bank_name: None,
                branch: None,
                opening_balance: dec!(5000),
                opening_date: Some(opened),
            },
        )
        .await?;

    let bank = accounts
        .create_account(
            company_id,
            CreateAccountInput {
                name: "Current account".to_string(),
                kind: AccountKind::Bank,
                number: Some("0123456789".to_string()),
                bank_name: Some("City Bank".to_string()),
                branch: Some("Motijheel".to_string()),
                opening_balance: dec!(20000),
                opening_date: Some(opened),
            },
        )
        .await?;

    println!("  Created cash and bank accounts");
    Ok((cash.id, bank.id))
}

async fn seed_products(
    db: &DatabaseConnection,
    company_id: Uuid,
) -> anyhow::Result<Vec<products::Model>> {
    let repo = ProductRepository::new(db.clone());
    let catalog = [
        ("Rice 5kg", "RICE-5", "bag", dec!(420), dec!(480)),
        ("Soybean oil 1L", "OIL-1", "btl", dec!(165), dec!(185)),
        ("Sugar 1kg", "SUGAR-1", "kg", dec!(110), dec!(125)),
    ];

    let mut created = Vec::with_capacity(catalog.len());
    for (name, sku, unit, cost, price) in catalog {
        let product = repo
            .create_product(
                company_id,
                CreateProductInput {
                    name: name.to_string(),
                    sku: sku.to_string(),
                    unit: unit.to_string(),
                    purchase_price: cost,
                    sale_price: price,
                    stock_quantity: Decimal::ZERO,
                },
            )
            .await?;
        created.push(product);
    }

    println!("  Created {} products", created.len());
    Ok(created)
}

async fn seed_documents(
    db: &DatabaseConnection,
    company_id: Uuid,
    cash: Uuid,
    bank: Uuid,
    products: &[products::Model],
    start: NaiveDate,
) -> anyhow::Result<()> {
    let supplier = SupplierRepository::new(db.clone())
        .create_supplier(
            company_id,
            CreatePartyInput {
                name: "Karim Wholesale".to_string(),
                phone: Some("01811111111".to_string()),
                email: None,
                address: None,
            },
        )
        .await?;

    let customer = CustomerRepository::new(db.clone())
        .create_customer(
            company_id,
            CreatePartyInput {
                name: "Rahim Traders".to_string(),
                phone: Some("01922222222".to_string()),
                email: Some("rahim@example.com".to_string()),
                address: None,
            },
        )
        .await?;

    let purchase = PurchaseRepository::new(db.clone())
        .create_purchase(
            company_id,
            CreatePurchaseInput {
                supplier_id: Some(supplier.id),
                purchase_date: start + Duration::days(1),
                account_id: Some(bank),
                items: products
                    .iter()
                    .map(|p| PurchaseItemInput {
                        product_id: p.id,
                        quantity: dec!(50),
                        unit_price: None,
                        discount_amount: Decimal::ZERO,
                    })
                    .collect(),
                discount_amount: Decimal::ZERO,
                vat_amount: Decimal::ZERO,
                delivery_charge: dec!(300),
                paid_amount: dec!(15000),
                advance_used: Decimal::ZERO,
                note: Some("Opening stock".to_string()),
            },
        )
        .await?;
    println!(
        "  Created purchase {} (due {})",
        purchase.purchase.bill_number, purchase.purchase.due_amount
    );

    let sale = SaleRepository::new(db.clone())
        .create_sale(
            company_id,
            CreateSaleInput {
                customer_id: Some(customer.id),
                sale_date: start + Duration::days(3),
                account_id: Some(cash),
                items: products
                    .iter()
                    .map(|p| SaleItemInput {
                        product_id: p.id,
                        quantity: dec!(10),
                        unit_price: None,
                        discount_amount: Decimal::ZERO,
                    })
                    .collect(),
                discount_amount: dec!(50),
                vat_amount: Decimal::ZERO,
                delivery_charge: Decimal::ZERO,
                paid_amount: dec!(3000),
                advance_used: Decimal::ZERO,
                note: None,
            },
        )
        .await?;
    println!(
        "  Created sale {} (due {})",
        sale.sale.invoice_number, sale.sale.due_amount
    );

    let receipt = MoneyReceiptRepository::new(db.clone())
        .create_receipt(
            company_id,
            CreateMoneyReceiptInput {
                customer_id: customer.id,
                account_id: cash,
                sale_id: None,
                amount: dec!(2000),
                receipt_date: start + Duration::days(10),
                note: None,
            },
        )
        .await?;
    println!("  Created money receipt {}", receipt.receipt.receipt_number);

    ExpenseRepository::new(db.clone())
        .create_expense(
            company_id,
            CreateExpenseInput {
                account_id: cash,
                category: "rent".to_string(),
                amount: dec!(1500),
                expense_date: start + Duration::days(15),
                note: Some("Shop rent".to_string()),
            },
        )
        .await?;
    println!("  Created rent expense");

    Ok(())
}
