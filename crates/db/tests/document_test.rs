//! Integration tests for sales, purchases, payments and returns.

mod common;

use common::{account, company, customer, date, product, setup, supplier};
use hisab_core::LedgerError;
use hisab_core::account::AccountKind;
use hisab_db::entities::customers;
use hisab_db::entities::sea_orm_active_enums::PaymentStatus;
use hisab_db::repositories::{
    AccountRepository, CreateMoneyReceiptInput, CreatePurchaseInput, CreatePurchaseReturnInput,
    CreateSaleInput, CreateSaleReturnInput, CreateSupplierPaymentInput, CustomerRepository,
    MoneyReceiptRepository, ProductRepository, PurchaseItemInput, PurchaseRepository,
    PurchaseReturnRepository, ReportRepository, RepositoryError, ReturnItemInput, SaleItemInput,
    SaleRepository, SaleReturnRepository, SupplierPaymentRepository, SupplierRepository,
    UpdatePurchaseInput, UpdatePurchaseItemInput, UpdateSaleInput, UpdateSaleItemInput,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

fn sale_input(
    customer_id: Option<Uuid>,
    product_id: Uuid,
    quantity: Decimal,
    day: u32,
) -> CreateSaleInput {
    CreateSaleInput {
        customer_id,
        sale_date: date(2026, 6, day),
        account_id: None,
        items: vec![SaleItemInput {
            product_id,
            quantity,
            unit_price: None,
            discount_amount: Decimal::ZERO,
        }],
        discount_amount: Decimal::ZERO,
        vat_amount: Decimal::ZERO,
        delivery_charge: Decimal::ZERO,
        paid_amount: Decimal::ZERO,
        advance_used: Decimal::ZERO,
        note: None,
    }
}

fn purchase_input(
    supplier_id: Option<Uuid>,
    product_id: Uuid,
    quantity: Decimal,
    day: u32,
) -> CreatePurchaseInput {
    CreatePurchaseInput {
        supplier_id,
        purchase_date: date(2026, 7, day),
        account_id: None,
        items: vec![PurchaseItemInput {
            product_id,
            quantity,
            unit_price: None,
            discount_amount: Decimal::ZERO,
        }],
        discount_amount: Decimal::ZERO,
        vat_amount: Decimal::ZERO,
        delivery_charge: Decimal::ZERO,
        paid_amount: Decimal::ZERO,
        advance_used: Decimal::ZERO,
        note: None,
    }
}

async fn stock_of(db: &DatabaseConnection, company_id: Uuid, product_id: Uuid) -> Decimal {
    ProductRepository::new(db.clone())
        .get_product(company_id, product_id)
        .await
        .expect("product")
        .stock_quantity
}

#[tokio::test]
async fn test_receipts_settle_oldest_sales_first_and_keep_advance() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let widget = product(&db, company_id, dec!(10), dec!(100)).await;
    let buyer = customer(&db, company_id).await;
    let sales = SaleRepository::new(db.clone());
    let receipts = MoneyReceiptRepository::new(db.clone());
    let customers = CustomerRepository::new(db.clone());

    let first = sales
        .create_sale(company_id, sale_input(Some(buyer.id), widget.id, dec!(3), 1))
        .await
        .expect("first sale");
    assert_eq!(first.sale.invoice_number, "INV-000001");
    assert_eq!(first.sale.grand_total, dec!(300));
    assert_eq!(first.sale.payment_status, PaymentStatus::Due);

    let second = sales
        .create_sale(company_id, sale_input(Some(buyer.id), widget.id, dec!(1), 2))
        .await
        .expect("second sale");

    let stock = ProductRepository::new(db.clone())
        .get_product(company_id, widget.id)
        .await
        .expect("product")
        .stock_quantity;
    assert_eq!(stock, dec!(6));

    let fifo = receipts
        .create_receipt(
            company_id,
            CreateMoneyReceiptInput {
                customer_id: buyer.id,
                account_id: cash.id,
                sale_id: None,
                amount: dec!(350),
                receipt_date: date(2026, 6, 3),
                note: None,
            },
        )
        .await
        .expect("fifo receipt");
    assert_eq!(fifo.allocations.len(), 2);
    assert_eq!(fifo.receipt.advance_amount, dec!(0));

    let first = sales.get_sale(company_id, first.sale.id).await.expect("first");
    let second = sales.get_sale(company_id, second.sale.id).await.expect("second");
    assert_eq!(first.sale.payment_status, PaymentStatus::Paid);
    assert_eq!(second.sale.payment_status, PaymentStatus::Partial);
    assert_eq!(second.sale.due_amount, dec!(50));

    let targeted = receipts
        .create_receipt(
            company_id,
            CreateMoneyReceiptInput {
                customer_id: buyer.id,
                account_id: cash.id,
                sale_id: Some(second.sale.id),
                amount: dec!(80),
                receipt_date: date(2026, 6, 4),
                note: None,
            },
        )
        .await
        .expect("targeted receipt");
    assert_eq!(targeted.receipt.advance_amount, dec!(30));

    let advance = customers
        .get_customer(company_id, buyer.id)
        .await
        .expect("customer")
        .advance_balance;
    assert_eq!(advance, dec!(30));

    let mut third = sale_input(Some(buyer.id), widget.id, dec!(1), 5);
    third.advance_used = dec!(30);
    let third = sales.create_sale(company_id, third).await.expect("third sale");
    assert_eq!(third.sale.advance_used, dec!(30));
    assert_eq!(third.sale.due_amount, dec!(70));

    // The receipt's advance was spent on the third sale.
    let result = receipts.delete_receipt(company_id, targeted.receipt.id).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::AdvanceAlreadyConsumed { .. }))
    ));

    let summary = customers.due_summary(company_id, buyer.id).await.expect("summary");
    assert_eq!(summary.total_billed, dec!(500));
    assert_eq!(summary.total_due, dec!(70));
    assert_eq!(summary.advance_balance, dec!(0));

    let cash = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("cash");
    assert_eq!(cash.balance, dec!(430));
}

#[tokio::test]
async fn test_walk_in_sale_must_be_paid_in_full() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let widget = product(&db, company_id, dec!(5), dec!(40)).await;
    let sales = SaleRepository::new(db.clone());

    let mut no_account = sale_input(None, widget.id, dec!(1), 1);
    no_account.paid_amount = dec!(40);
    assert!(matches!(
        sales.create_sale(company_id, no_account).await,
        Err(RepositoryError::Rule(LedgerError::PaymentAccountRequired))
    ));

    let mut short = sale_input(None, widget.id, dec!(2), 1);
    short.account_id = Some(cash.id);
    short.paid_amount = dec!(50);
    assert!(matches!(
        sales.create_sale(company_id, short).await,
        Err(RepositoryError::Rule(LedgerError::UnpaidWithoutParty(_)))
    ));

    let mut paid = sale_input(None, widget.id, dec!(2), 1);
    paid.account_id = Some(cash.id);
    paid.paid_amount = dec!(80);
    let sale = sales.create_sale(company_id, paid).await.expect("walk-in sale");
    assert_eq!(sale.sale.payment_status, PaymentStatus::Paid);

    // Rejected sales rolled back their stock moves.
    let stock = ProductRepository::new(db.clone())
        .get_product(company_id, widget.id)
        .await
        .expect("product")
        .stock_quantity;
    assert_eq!(stock, dec!(3));
}

#[tokio::test]
async fn test_sale_beyond_stock_rejected() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let widget = product(&db, company_id, dec!(2), dec!(10)).await;
    let buyer = customer(&db, company_id).await;

    let result = SaleRepository::new(db.clone())
        .create_sale(company_id, sale_input(Some(buyer.id), widget.id, dec!(3), 1))
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::InsufficientStock { .. }))
    ));
}

#[tokio::test]
async fn test_sale_return_refunds_and_credits_advance() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let widget = product(&db, company_id, dec!(10), dec!(100)).await;
    let buyer = customer(&db, company_id).await;
    let sales = SaleRepository::new(db.clone());
    let returns = SaleReturnRepository::new(db.clone());

    let mut input = sale_input(Some(buyer.id), widget.id, dec!(2), 10);
    input.account_id = Some(cash.id);
    input.paid_amount = dec!(200);
    let sale = sales.create_sale(company_id, input).await.expect("sale");

    let sale_return = returns
        .create_sale_return(
            company_id,
            CreateSaleReturnInput {
                sale_id: sale.sale.id,
                return_date: date(2026, 6, 11),
                items: vec![ReturnItemInput {
                    product_id: widget.id,
                    quantity: dec!(1),
                }],
                refund_amount: dec!(60),
                account_id: Some(cash.id),
                note: None,
            },
        )
        .await
        .expect("return");
    assert_eq!(sale_return.sale_return.total_amount, dec!(100));
    assert_eq!(sale_return.sale_return.refund_amount, dec!(60));

    let sale_after = sales.get_sale(company_id, sale.sale.id).await.expect("sale");
    assert_eq!(sale_after.sale.returned_amount, dec!(100));
    assert_eq!(sale_after.sale.paid_amount, dec!(140));
    assert_eq!(sale_after.sale.due_amount, dec!(0));

    let advance = CustomerRepository::new(db.clone())
        .get_customer(company_id, buyer.id)
        .await
        .expect("customer")
        .advance_balance;
    assert_eq!(advance, dec!(40));

    let cash_after = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("cash");
    assert_eq!(cash_after.balance, dec!(140));

    let too_many = returns
        .create_sale_return(
            company_id,
            CreateSaleReturnInput {
                sale_id: sale.sale.id,
                return_date: date(2026, 6, 12),
                items: vec![ReturnItemInput {
                    product_id: widget.id,
                    quantity: dec!(2),
                }],
                refund_amount: Decimal::ZERO,
                account_id: None,
                note: None,
            },
        )
        .await;
    assert!(matches!(
        too_many,
        Err(RepositoryError::Rule(LedgerError::ReturnExceedsQuantity { .. }))
    ));

    assert!(matches!(
        sales.delete_sale(company_id, sale.sale.id).await,
        Err(RepositoryError::Rule(LedgerError::HasReturns(_)))
    ));
}

#[tokio::test]
async fn test_delete_sale_restores_cash_and_stock() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let widget = product(&db, company_id, dec!(10), dec!(100)).await;
    let buyer = customer(&db, company_id).await;
    let sales = SaleRepository::new(db.clone());

    let mut input = sale_input(Some(buyer.id), widget.id, dec!(3), 20);
    input.account_id = Some(cash.id);
    input.paid_amount = dec!(100);
    let sale = sales.create_sale(company_id, input).await.expect("sale");
    assert_eq!(sale.sale.payment_status, PaymentStatus::Partial);

    sales.delete_sale(company_id, sale.sale.id).await.expect("delete");

    let cash_after = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("cash");
    assert_eq!(cash_after.balance, dec!(0));

    let stock = ProductRepository::new(db.clone())
        .get_product(company_id, widget.id)
        .await
        .expect("product")
        .stock_quantity;
    assert_eq!(stock, dec!(10));

    assert!(matches!(
        sales.get_sale(company_id, sale.sale.id).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_purchase_cycle_moves_stock_and_supplier_advance() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(1000)).await;
    let widget = product(&db, company_id, dec!(0), dec!(100)).await;
    let vendor = supplier(&db, company_id).await;
    let purchases = PurchaseRepository::new(db.clone());

    let purchase = purchases
        .create_purchase(
            company_id,
            CreatePurchaseInput {
                supplier_id: Some(vendor.id),
                purchase_date: date(2026, 7, 1),
                account_id: Some(cash.id),
                items: vec![PurchaseItemInput {
                    product_id: widget.id,
                    quantity: dec!(5),
                    unit_price: None,
                    discount_amount: Decimal::ZERO,
                }],
                discount_amount: Decimal::ZERO,
                vat_amount: Decimal::ZERO,
                delivery_charge: Decimal::ZERO,
                paid_amount: dec!(200),
                advance_used: Decimal::ZERO,
                note: None,
            },
        )
        .await
        .expect("purchase");
    assert_eq!(purchase.purchase.bill_number, "PUR-000001");
    assert_eq!(purchase.purchase.due_amount, dec!(300));

    let payment = SupplierPaymentRepository::new(db.clone())
        .create_payment(
            company_id,
            CreateSupplierPaymentInput {
                supplier_id: vendor.id,
                account_id: cash.id,
                purchase_id: None,
                amount: dec!(400),
                payment_date: date(2026, 7, 2),
                note: None,
            },
        )
        .await
        .expect("payment");
    assert_eq!(payment.payment.advance_amount, dec!(100));

    let purchase_return = PurchaseReturnRepository::new(db.clone())
        .create_purchase_return(
            company_id,
            CreatePurchaseReturnInput {
                purchase_id: purchase.purchase.id,
                return_date: date(2026, 7, 3),
                items: vec![ReturnItemInput {
                    product_id: widget.id,
                    quantity: dec!(1),
                }],
                refund_amount: dec!(100),
                account_id: Some(cash.id),
                note: None,
            },
        )
        .await
        .expect("purchase return");
    assert_eq!(purchase_return.purchase_return.refund_amount, dec!(100));

    let stock = ProductRepository::new(db.clone())
        .get_product(company_id, widget.id)
        .await
        .expect("product")
        .stock_quantity;
    assert_eq!(stock, dec!(4));

    let advance = SupplierRepository::new(db.clone())
        .get_supplier(company_id, vendor.id)
        .await
        .expect("supplier")
        .advance_balance;
    assert_eq!(advance, dec!(100));

    // 1000 - 200 - 400 + 100
    let cash_after = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("cash");
    assert_eq!(cash_after.balance, dec!(500));

    let dashboard = ReportRepository::new(db.clone())
        .dashboard(company_id, None, None)
        .await
        .expect("dashboard");
    assert_eq!(dashboard.total_purchases, dec!(500));
    assert_eq!(dashboard.payables, dec!(0));
    assert_eq!(dashboard.cash_position, dec!(500));
}

#[tokio::test]
async fn test_shrinking_purchase_line_after_partial_sale_moves_only_the_difference() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let widget = product(&db, company_id, dec!(0), dec!(100)).await;
    let vendor = supplier(&db, company_id).await;
    let buyer = customer(&db, company_id).await;
    let purchases = PurchaseRepository::new(db.clone());

    let purchase = purchases
        .create_purchase(company_id, purchase_input(Some(vendor.id), widget.id, dec!(10), 1))
        .await
        .expect("purchase");
    SaleRepository::new(db.clone())
        .create_sale(company_id, sale_input(Some(buyer.id), widget.id, dec!(8), 2))
        .await
        .expect("sale");
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(2));

    let line_id = purchase.items[0].id;
    let resized = purchases
        .update_item(
            company_id,
            purchase.purchase.id,
            line_id,
            UpdatePurchaseItemInput {
                quantity: Some(dec!(9)),
                ..Default::default()
            },
        )
        .await
        .expect("shrink purchase line");
    assert_eq!(resized.purchase.grand_total, dec!(900));
    assert_eq!(resized.purchase.due_amount, dec!(900));
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(1));

    // Taking 8 more back would leave the shelf negative.
    let result = purchases
        .update_item(
            company_id,
            purchase.purchase.id,
            line_id,
            UpdatePurchaseItemInput {
                quantity: Some(dec!(1)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::InsufficientStock { .. }))
    ));
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(1));
}

#[tokio::test]
async fn test_sale_lines_and_header_edits_recompute_totals_and_stock() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let widget = product(&db, company_id, dec!(10), dec!(100)).await;
    let gadget = product(&db, company_id, dec!(5), dec!(50)).await;
    let buyer = customer(&db, company_id).await;
    let sales = SaleRepository::new(db.clone());

    let sale = sales
        .create_sale(company_id, sale_input(Some(buyer.id), widget.id, dec!(2), 1))
        .await
        .expect("sale");
    let sale_id = sale.sale.id;
    let widget_line = sale.items[0].id;

    let added = sales
        .add_item(
            company_id,
            sale_id,
            SaleItemInput {
                product_id: gadget.id,
                quantity: dec!(2),
                unit_price: None,
                discount_amount: Decimal::ZERO,
            },
        )
        .await
        .expect("add item");
    assert_eq!(added.items.len(), 2);
    assert_eq!(added.sale.grand_total, dec!(300));
    assert_eq!(stock_of(&db, company_id, gadget.id).await, dec!(3));
    let gadget_line = added
        .items
        .iter()
        .find(|i| i.product_id == gadget.id)
        .expect("gadget line")
        .id;

    let grown = sales
        .update_item(
            company_id,
            sale_id,
            widget_line,
            UpdateSaleItemInput {
                quantity: Some(dec!(4)),
                ..Default::default()
            },
        )
        .await
        .expect("grow line");
    assert_eq!(grown.sale.grand_total, dec!(500));
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(6));

    let beyond_stock = sales
        .update_item(
            company_id,
            sale_id,
            widget_line,
            UpdateSaleItemInput {
                quantity: Some(dec!(11)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        beyond_stock,
        Err(RepositoryError::Rule(LedgerError::InsufficientStock { .. }))
    ));

    let header = sales
        .update_sale(
            company_id,
            sale_id,
            UpdateSaleInput {
                discount_amount: Some(dec!(50)),
                vat_amount: Some(dec!(10)),
                note: Some(Some("repriced".to_string())),
                ..Default::default()
            },
        )
        .await
        .expect("update header");
    assert_eq!(header.sale.net_total, dec!(450));
    assert_eq!(header.sale.grand_total, dec!(460));
    assert_eq!(header.sale.due_amount, dec!(460));
    assert_eq!(header.sale.note.as_deref(), Some("repriced"));

    let removed = sales
        .remove_item(company_id, sale_id, gadget_line)
        .await
        .expect("remove item");
    assert_eq!(removed.items.len(), 1);
    assert_eq!(removed.sale.grand_total, dec!(360));
    assert_eq!(stock_of(&db, company_id, gadget.id).await, dec!(5));

    assert!(matches!(
        sales.remove_item(company_id, sale_id, widget_line).await,
        Err(RepositoryError::Rule(LedgerError::EmptyDocument))
    ));

    let summary = CustomerRepository::new(db.clone())
        .due_summary(company_id, buyer.id)
        .await
        .expect("summary");
    assert_eq!(summary.total_due, dec!(360));
}

#[tokio::test]
async fn test_purchase_lines_and_header_edits_recompute_totals_and_stock() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let widget = product(&db, company_id, dec!(0), dec!(100)).await;
    let gadget = product(&db, company_id, dec!(0), dec!(40)).await;
    let vendor = supplier(&db, company_id).await;
    let purchases = PurchaseRepository::new(db.clone());

    let purchase = purchases
        .create_purchase(company_id, purchase_input(Some(vendor.id), widget.id, dec!(3), 5))
        .await
        .expect("purchase");
    let purchase_id = purchase.purchase.id;
    let widget_line = purchase.items[0].id;

    let added = purchases
        .add_item(
            company_id,
            purchase_id,
            PurchaseItemInput {
                product_id: gadget.id,
                quantity: dec!(5),
                unit_price: Some(dec!(30)),
                discount_amount: dec!(10),
            },
        )
        .await
        .expect("add item");
    assert_eq!(added.purchase.grand_total, dec!(440));
    assert_eq!(stock_of(&db, company_id, gadget.id).await, dec!(5));
    let gadget_line = added
        .items
        .iter()
        .find(|i| i.product_id == gadget.id)
        .expect("gadget line")
        .id;

    let repriced = purchases
        .update_item(
            company_id,
            purchase_id,
            widget_line,
            UpdatePurchaseItemInput {
                unit_price: Some(dec!(90)),
                ..Default::default()
            },
        )
        .await
        .expect("reprice line");
    assert_eq!(repriced.purchase.grand_total, dec!(410));
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(3));

    let header = purchases
        .update_purchase(
            company_id,
            purchase_id,
            UpdatePurchaseInput {
                purchase_date: Some(date(2026, 7, 6)),
                delivery_charge: Some(dec!(15)),
                ..Default::default()
            },
        )
        .await
        .expect("update header");
    assert_eq!(header.purchase.purchase_date, date(2026, 7, 6));
    assert_eq!(header.purchase.grand_total, dec!(425));

    let too_much_discount = purchases
        .update_purchase(
            company_id,
            purchase_id,
            UpdatePurchaseInput {
                discount_amount: Some(dec!(1000)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        too_much_discount,
        Err(RepositoryError::Rule(LedgerError::DiscountExceedsTotal { .. }))
    ));

    let removed = purchases
        .remove_item(company_id, purchase_id, gadget_line)
        .await
        .expect("remove item");
    assert_eq!(removed.purchase.grand_total, dec!(285));
    assert_eq!(stock_of(&db, company_id, gadget.id).await, dec!(0));

    assert!(matches!(
        purchases.remove_item(company_id, purchase_id, widget_line).await,
        Err(RepositoryError::Rule(LedgerError::EmptyDocument))
    ));
}

#[tokio::test]
async fn test_advance_draw_beyond_balance_rejected() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let widget = product(&db, company_id, dec!(10), dec!(100)).await;
    let buyer = customer(&db, company_id).await;
    let vendor = supplier(&db, company_id).await;

    let mut sale = sale_input(Some(buyer.id), widget.id, dec!(1), 1);
    sale.advance_used = dec!(10);
    let result = SaleRepository::new(db.clone()).create_sale(company_id, sale).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::InsufficientAdvance { .. }))
    ));

    let mut purchase = purchase_input(Some(vendor.id), widget.id, dec!(1), 1);
    purchase.advance_used = dec!(0.01);
    let result = PurchaseRepository::new(db.clone())
        .create_purchase(company_id, purchase)
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Rule(LedgerError::InsufficientAdvance { .. }))
    ));

    // Both rejections rolled back their stock moves.
    assert_eq!(stock_of(&db, company_id, widget.id).await, dec!(10));
}

#[tokio::test]
async fn test_delete_supplier_payment_restores_purchase_due_and_cash() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(1000)).await;
    let widget = product(&db, company_id, dec!(0), dec!(100)).await;
    let vendor = supplier(&db, company_id).await;
    let purchases = PurchaseRepository::new(db.clone());
    let payments = SupplierPaymentRepository::new(db.clone());

    let purchase = purchases
        .create_purchase(company_id, purchase_input(Some(vendor.id), widget.id, dec!(5), 1))
        .await
        .expect("purchase");

    let payment = payments
        .create_payment(
            company_id,
            CreateSupplierPaymentInput {
                supplier_id: vendor.id,
                account_id: cash.id,
                purchase_id: None,
                amount: dec!(200),
                payment_date: date(2026, 7, 2),
                note: None,
            },
        )
        .await
        .expect("payment");
    assert_eq!(payment.allocations.len(), 1);

    let paid = purchases
        .get_purchase(company_id, purchase.purchase.id)
        .await
        .expect("purchase");
    assert_eq!(paid.purchase.due_amount, dec!(300));
    assert_eq!(paid.purchase.payment_status, PaymentStatus::Partial);

    payments
        .delete_payment(company_id, payment.payment.id)
        .await
        .expect("delete payment");

    let restored = purchases
        .get_purchase(company_id, purchase.purchase.id)
        .await
        .expect("purchase");
    assert_eq!(restored.purchase.paid_amount, dec!(0));
    assert_eq!(restored.purchase.due_amount, dec!(500));
    assert_eq!(restored.purchase.payment_status, PaymentStatus::Due);

    let cash_after = AccountRepository::new(db.clone())
        .get_account(company_id, cash.id)
        .await
        .expect("cash");
    assert_eq!(cash_after.balance, dec!(1000));

    assert!(matches!(
        payments.get_payment(company_id, payment.payment.id).await,
        Err(RepositoryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_sync_advance_balance_repairs_drift() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;
    let cash = account(&db, company_id, AccountKind::Cash, dec!(0)).await;
    let buyer = customer(&db, company_id).await;
    let repo = CustomerRepository::new(db.clone());

    MoneyReceiptRepository::new(db.clone())
        .create_receipt(
            company_id,
            CreateMoneyReceiptInput {
                customer_id: buyer.id,
                account_id: cash.id,
                sale_id: None,
                amount: dec!(30),
                receipt_date: date(2026, 6, 1),
                note: None,
            },
        )
        .await
        .expect("advance receipt");

    // Stored value drifts away from the receipts behind it.
    let stored = repo.get_customer(company_id, buyer.id).await.expect("customer");
    let mut drifted: customers::ActiveModel = stored.into();
    drifted.advance_balance = Set(dec!(75));
    drifted.update(&db).await.expect("write drift");

    let sync = repo
        .sync_advance_balance(company_id, buyer.id)
        .await
        .expect("sync");
    assert_eq!(sync.old_balance, dec!(75));
    assert_eq!(sync.new_balance, dec!(30));
    assert!(sync.changed());

    let repaired = repo.get_customer(company_id, buyer.id).await.expect("customer");
    assert_eq!(repaired.advance_balance, dec!(30));

    let again = repo
        .sync_advance_balance(company_id, buyer.id)
        .await
        .expect("second sync");
    assert!(!again.changed());
}

#[tokio::test]
async fn test_dashboard_of_empty_company_is_zero() {
    let Some(db) = setup().await else { return };
    let company_id = company(&db).await;

    let dashboard = ReportRepository::new(db.clone())
        .dashboard(company_id, None, None)
        .await
        .expect("dashboard");
    assert_eq!(dashboard.total_sales, Decimal::ZERO);
    assert_eq!(dashboard.total_purchases, Decimal::ZERO);
    assert_eq!(dashboard.total_expenses, Decimal::ZERO);
    assert_eq!(dashboard.receivables, Decimal::ZERO);
    assert_eq!(dashboard.cash_position, Decimal::ZERO);
}
