//! Initial database migration.
//!
//! Creates enums, tenant tables, the ledger, documents and their lines.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANCY & NUMBERING
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(NUMBER_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 3: ACCOUNTS & LEDGER
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: PARTIES & PRODUCTS
        // ============================================================
        db.execute_unprepared(PARTIES_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;

        // ============================================================
        // PART 5: SALES & PURCHASES
        // ============================================================
        db.execute_unprepared(SALES_SQL).await?;
        db.execute_unprepared(PURCHASES_SQL).await?;

        // ============================================================
        // PART 6: PAYMENTS
        // ============================================================
        db.execute_unprepared(MONEY_RECEIPTS_SQL).await?;
        db.execute_unprepared(SUPPLIER_PAYMENTS_SQL).await?;

        // ============================================================
        // PART 7: CASH BOOK
        // ============================================================
        db.execute_unprepared(CASH_BOOK_SQL).await?;

        // ============================================================
        // PART 8: RETURNS
        // ============================================================
        db.execute_unprepared(RETURNS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_kind AS ENUM ('bank', 'mobile', 'cash', 'other');

CREATE TYPE transaction_kind AS ENUM (
    'opening_balance',
    'money_receipt',
    'supplier_payment',
    'expense',
    'income',
    'transfer_in',
    'transfer_out',
    'sale_payment',
    'purchase_payment',
    'sale_refund',
    'purchase_refund',
    'adjustment',
    'reversal'
);

CREATE TYPE payment_status AS ENUM ('paid', 'partial', 'due');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(100) NOT NULL UNIQUE,
    address TEXT,
    phone VARCHAR(50),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const NUMBER_SEQUENCES_SQL: &str = r"
CREATE TABLE number_sequences (
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    prefix VARCHAR(8) NOT NULL,
    last_value BIGINT NOT NULL DEFAULT 0 CHECK (last_value >= 0),
    PRIMARY KEY (company_id, prefix)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    kind account_kind NOT NULL,
    number VARCHAR(50),
    bank_name VARCHAR(255),
    branch VARCHAR(255),
    balance NUMERIC(18, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, kind, number),
    CHECK (kind IN ('cash', 'other') OR number IS NOT NULL)
);

-- One cash and one other account per company
CREATE UNIQUE INDEX uq_accounts_singleton_kind
    ON accounts(company_id, kind)
    WHERE kind IN ('cash', 'other');

CREATE INDEX idx_accounts_company ON accounts(company_id) WHERE is_active = true;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    transaction_number VARCHAR(32) NOT NULL,
    kind transaction_kind NOT NULL,
    debit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    balance_after NUMERIC(18, 2) NOT NULL,
    transaction_date DATE NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    source_type VARCHAR(32),
    source_id UUID,
    reversal_of UUID REFERENCES transactions(id),
    is_reversed BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, transaction_number),
    CHECK (
        (debit > 0 AND credit = 0) OR
        (credit > 0 AND debit = 0)
    )
);

CREATE INDEX idx_transactions_account ON transactions(account_id, transaction_date, created_at);
CREATE INDEX idx_transactions_source ON transactions(source_type, source_id)
    WHERE source_id IS NOT NULL;
CREATE UNIQUE INDEX uq_transactions_reversal_of ON transactions(reversal_of)
    WHERE reversal_of IS NOT NULL;
";

const PARTIES_SQL: &str = r"
CREATE TABLE customers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    phone VARCHAR(50),
    email VARCHAR(255),
    address TEXT,
    advance_balance NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_balance >= 0),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_customers_company ON customers(company_id);

CREATE TABLE suppliers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    phone VARCHAR(50),
    email VARCHAR(255),
    address TEXT,
    advance_balance NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_balance >= 0),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_suppliers_company ON suppliers(company_id);
";

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    sku VARCHAR(64) NOT NULL,
    unit VARCHAR(32) NOT NULL DEFAULT 'pcs',
    purchase_price NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (purchase_price >= 0),
    sale_price NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (sale_price >= 0),
    stock_quantity NUMERIC(18, 3) NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, sku)
);
";

const SALES_SQL: &str = r"
CREATE TABLE sales (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    invoice_number VARCHAR(32) NOT NULL,
    customer_id UUID REFERENCES customers(id),
    sale_date DATE NOT NULL,
    account_id UUID REFERENCES accounts(id),
    gross_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    discount_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    vat_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (vat_amount >= 0),
    delivery_charge NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (delivery_charge >= 0),
    net_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    grand_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    paid_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (paid_amount >= 0),
    advance_used NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_used >= 0),
    returned_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (returned_amount >= 0),
    due_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (due_amount >= 0),
    payment_status payment_status NOT NULL DEFAULT 'due',
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, invoice_number)
);

CREATE INDEX idx_sales_customer_due ON sales(customer_id, sale_date) WHERE due_amount > 0;

CREATE TABLE sale_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_id UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity NUMERIC(18, 3) NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(18, 2) NOT NULL CHECK (unit_price >= 0),
    discount_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    line_total NUMERIC(18, 2) NOT NULL CHECK (line_total >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_sale_items_sale ON sale_items(sale_id);
";

const PURCHASES_SQL: &str = r"
CREATE TABLE purchases (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    bill_number VARCHAR(32) NOT NULL,
    supplier_id UUID REFERENCES suppliers(id),
    purchase_date DATE NOT NULL,
    account_id UUID REFERENCES accounts(id),
    gross_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    discount_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    vat_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (vat_amount >= 0),
    delivery_charge NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (delivery_charge >= 0),
    net_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    grand_total NUMERIC(18, 2) NOT NULL DEFAULT 0,
    paid_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (paid_amount >= 0),
    advance_used NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_used >= 0),
    returned_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (returned_amount >= 0),
    due_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (due_amount >= 0),
    payment_status payment_status NOT NULL DEFAULT 'due',
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, bill_number)
);

CREATE INDEX idx_purchases_supplier_due ON purchases(supplier_id, purchase_date) WHERE due_amount > 0;

CREATE TABLE purchase_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_id UUID NOT NULL REFERENCES purchases(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity NUMERIC(18, 3) NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(18, 2) NOT NULL CHECK (unit_price >= 0),
    discount_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    line_total NUMERIC(18, 2) NOT NULL CHECK (line_total >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_purchase_items_purchase ON purchase_items(purchase_id);
";

const MONEY_RECEIPTS_SQL: &str = r"
CREATE TABLE money_receipts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    receipt_number VARCHAR(32) NOT NULL,
    customer_id UUID NOT NULL REFERENCES customers(id),
    account_id UUID NOT NULL REFERENCES accounts(id),
    sale_id UUID REFERENCES sales(id) ON DELETE SET NULL,
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    advance_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_amount >= 0),
    receipt_date DATE NOT NULL,
    note TEXT,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, receipt_number)
);

CREATE TABLE money_receipt_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    receipt_id UUID NOT NULL REFERENCES money_receipts(id) ON DELETE CASCADE,
    sale_id UUID NOT NULL REFERENCES sales(id),
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_receipt_allocations_sale ON money_receipt_allocations(sale_id);
";

const SUPPLIER_PAYMENTS_SQL: &str = r"
CREATE TABLE supplier_payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    payment_number VARCHAR(32) NOT NULL,
    supplier_id UUID NOT NULL REFERENCES suppliers(id),
    account_id UUID NOT NULL REFERENCES accounts(id),
    purchase_id UUID REFERENCES purchases(id) ON DELETE SET NULL,
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    advance_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (advance_amount >= 0),
    payment_date DATE NOT NULL,
    note TEXT,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, payment_number)
);

CREATE TABLE supplier_payment_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id UUID NOT NULL REFERENCES supplier_payments(id) ON DELETE CASCADE,
    purchase_id UUID NOT NULL REFERENCES purchases(id),
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_payment_allocations_purchase ON supplier_payment_allocations(purchase_id);
";

const CASH_BOOK_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    expense_number VARCHAR(32) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    category VARCHAR(100) NOT NULL,
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    expense_date DATE NOT NULL,
    note TEXT,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, expense_number)
);

CREATE TABLE incomes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    income_number VARCHAR(32) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    category VARCHAR(100) NOT NULL,
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    income_date DATE NOT NULL,
    note TEXT,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, income_number)
);

CREATE TABLE account_transfers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    transfer_number VARCHAR(32) NOT NULL,
    from_account_id UUID NOT NULL REFERENCES accounts(id),
    to_account_id UUID NOT NULL REFERENCES accounts(id),
    amount NUMERIC(18, 2) NOT NULL CHECK (amount > 0),
    transfer_date DATE NOT NULL,
    note TEXT,
    out_transaction_id UUID NOT NULL REFERENCES transactions(id),
    in_transaction_id UUID NOT NULL REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, transfer_number),
    CHECK (from_account_id <> to_account_id)
);
";

const RETURNS_SQL: &str = r"
CREATE TABLE sale_returns (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    return_number VARCHAR(32) NOT NULL,
    sale_id UUID NOT NULL REFERENCES sales(id),
    customer_id UUID REFERENCES customers(id),
    return_date DATE NOT NULL,
    total_amount NUMERIC(18, 2) NOT NULL CHECK (total_amount >= 0),
    refund_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (refund_amount >= 0),
    account_id UUID REFERENCES accounts(id),
    refund_transaction_id UUID REFERENCES transactions(id),
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, return_number)
);

CREATE TABLE sale_return_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_return_id UUID NOT NULL REFERENCES sale_returns(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity NUMERIC(18, 3) NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(18, 2) NOT NULL CHECK (unit_price >= 0),
    line_total NUMERIC(18, 2) NOT NULL CHECK (line_total >= 0)
);

CREATE TABLE purchase_returns (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    return_number VARCHAR(32) NOT NULL,
    purchase_id UUID NOT NULL REFERENCES purchases(id),
    supplier_id UUID REFERENCES suppliers(id),
    return_date DATE NOT NULL,
    total_amount NUMERIC(18, 2) NOT NULL CHECK (total_amount >= 0),
    refund_amount NUMERIC(18, 2) NOT NULL DEFAULT 0 CHECK (refund_amount >= 0),
    account_id UUID REFERENCES accounts(id),
    refund_transaction_id UUID REFERENCES transactions(id),
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, return_number)
);

CREATE TABLE purchase_return_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_return_id UUID NOT NULL REFERENCES purchase_returns(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity NUMERIC(18, 3) NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC(18, 2) NOT NULL CHECK (unit_price >= 0),
    line_total NUMERIC(18, 2) NOT NULL CHECK (line_total >= 0)
);
";

const DROP_ALL_SQL: &str = r"
-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS purchase_return_items CASCADE;
DROP TABLE IF EXISTS purchase_returns CASCADE;
DROP TABLE IF EXISTS sale_return_items CASCADE;
DROP TABLE IF EXISTS sale_returns CASCADE;
DROP TABLE IF EXISTS account_transfers CASCADE;
DROP TABLE IF EXISTS incomes CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS supplier_payment_allocations CASCADE;
DROP TABLE IF EXISTS supplier_payments CASCADE;
DROP TABLE IF EXISTS money_receipt_allocations CASCADE;
DROP TABLE IF EXISTS money_receipts CASCADE;
DROP TABLE IF EXISTS purchase_items CASCADE;
DROP TABLE IF EXISTS purchases CASCADE;
DROP TABLE IF EXISTS sale_items CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS products CASCADE;
DROP TABLE IF EXISTS suppliers CASCADE;
DROP TABLE IF EXISTS customers CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS number_sequences CASCADE;
DROP TABLE IF EXISTS companies CASCADE;

-- Drop enums
DROP TYPE IF EXISTS payment_status CASCADE;
DROP TYPE IF EXISTS transaction_kind CASCADE;
DROP TYPE IF EXISTS account_kind CASCADE;
";
