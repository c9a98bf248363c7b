//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every business event runs in a single database transaction; the free
//! functions in [`transaction`] are the shared posting primitive.

pub mod account;
pub mod company;
pub mod customer;
mod document;
pub mod error;
pub mod expense;
pub mod income;
pub mod money_receipt;
pub mod numbering;
mod page;
pub mod party;
pub mod product;
pub mod purchase;
pub mod purchase_return;
pub mod report;
pub mod sale;
pub mod sale_return;
pub mod supplier;
pub mod supplier_payment;
pub mod transaction;
pub mod transfer;

pub use account::{
    AccountFilter, AccountRepository, BalanceCheck, CreateAccountInput, UpdateAccountInput,
};
pub use company::{CompanyRepository, CreateCompanyInput, UpdateCompanyInput};
pub use customer::CustomerRepository;
pub use error::RepositoryError;
pub use expense::{CreateExpenseInput, ExpenseFilter, ExpenseRepository, UpdateExpenseInput};
pub use income::{CreateIncomeInput, IncomeFilter, IncomeRepository, UpdateIncomeInput};
pub use money_receipt::{
    CreateMoneyReceiptInput, MoneyReceiptFilter, MoneyReceiptRepository,
    MoneyReceiptWithAllocations,
};
pub use party::{CreatePartyInput, DueSummary, PartyFilter, UpdatePartyInput};
pub use product::{CreateProductInput, ProductFilter, ProductRepository, UpdateProductInput};
pub use purchase::{
    CreatePurchaseInput, PurchaseFilter, PurchaseItemInput, PurchaseRepository,
    PurchaseWithItems, UpdatePurchaseInput, UpdatePurchaseItemInput,
};
pub use purchase_return::{
    CreatePurchaseReturnInput, PurchaseReturnFilter, PurchaseReturnRepository,
    PurchaseReturnWithItems,
};
pub use report::{AccountStatement, Dashboard, ReportRepository, StatementRow};
pub use sale::{
    CreateSaleInput, SaleFilter, SaleItemInput, SaleRepository, SaleWithItems, UpdateSaleInput,
    UpdateSaleItemInput,
};
pub use sale_return::{
    CreateSaleReturnInput, ReturnItemInput, SaleReturnFilter, SaleReturnRepository,
    SaleReturnWithItems,
};
pub use supplier::SupplierRepository;
pub use supplier_payment::{
    CreateSupplierPaymentInput, SupplierPaymentFilter, SupplierPaymentRepository,
    SupplierPaymentWithAllocations,
};
pub use transaction::{
    CreateAdjustmentInput, PostingRequest, Source, TransactionFilter, TransactionRepository,
};
pub use transfer::{CreateTransferInput, TransferFilter, TransferRepository};
