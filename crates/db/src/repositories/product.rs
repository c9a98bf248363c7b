//! Product repository and stock movements.

use chrono::Utc;
use hisab_core::LedgerError;
use hisab_core::inventory::{StockMovement, apply_stock};
use hisab_shared::types::{round_money, round_quantity};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::company::require_company;
use super::error::{RepositoryError, on_unique_violation};
use crate::entities::products;

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    /// Display name.
    pub name: String,
    /// Stock keeping unit, unique per company.
    pub sku: String,
    /// Unit of measure, e.g. `pcs` or `kg`.
    pub unit: String,
    /// Default purchase price.
    pub purchase_price: Decimal,
    /// Default sale price.
    pub sale_price: Decimal,
    /// Stock on hand at creation.
    pub stock_quantity: Decimal,
}

/// Input for updating a product. Stock is moved with [`ProductRepository::adjust_stock`].
#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    /// Display name.
    pub name: Option<String>,
    /// Stock keeping unit.
    pub sku: Option<String>,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Default purchase price.
    pub purchase_price: Option<Decimal>,
    /// Default sale price.
    pub sale_price: Option<Decimal>,
    /// Whether the product can be sold or bought.
    pub is_active: Option<bool>,
}

/// Filter options for listing products.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Name or SKU fragment.
    pub search: Option<String>,
    /// Filter by active status.
    pub is_active: Option<bool>,
    /// Only products with stock at or below this level.
    pub low_stock: Option<Decimal>,
}

fn non_negative(amount: Decimal) -> Result<Decimal, LedgerError> {
    let amount = round_money(amount);
    if amount < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount(amount));
    }
    Ok(amount)
}

/// Locks a product of the company and applies a stock movement to it.
pub(crate) async fn move_stock<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    product_id: Uuid,
    movement: StockMovement,
    quantity: Decimal,
) -> Result<products::Model, RepositoryError> {
    let product = products::Entity::find_by_id(product_id)
        .filter(products::Column::CompanyId.eq(company_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Product", product_id))?;

    let stock = apply_stock(product_id, product.stock_quantity, movement.delta(quantity))?;

    let mut active: products::ActiveModel = product.into();
    active.stock_quantity = Set(stock);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(conn).await?;

    debug!(product_id = %product_id, ?movement, %quantity, %stock, "Stock moved");
    Ok(updated)
}

/// Product repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    db: DatabaseConnection,
}

impl ProductRepository {
    /// Creates a new product repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the SKU is taken or a price or the stock is negative.
    pub async fn create_product(
        &self,
        company_id: Uuid,
        input: CreateProductInput,
    ) -> Result<products::Model, RepositoryError> {
        require_company(&self.db, company_id).await?;

        let purchase_price = non_negative(input.purchase_price)?;
        let sale_price = non_negative(input.sale_price)?;
        let stock = round_quantity(input.stock_quantity);
        if stock < Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(stock).into());
        }

        let sku = input.sku.trim().to_string();
        let now = Utc::now().into();
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name),
            sku: Set(sku.clone()),
            unit: Set(input.unit),
            purchase_price: Set(purchase_price),
            sale_price: Set(sale_price),
            stock_quantity: Set(stock),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| on_unique_violation(e, || format!("Product SKU '{sku}' already exists")))?;

        info!(company_id = %company_id, product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Gets a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product is not in the company.
    pub async fn get_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<products::Model, RepositoryError> {
        products::Entity::find_by_id(product_id)
            .filter(products::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::not_found("Product", product_id))
    }

    /// Lists products by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_products(
        &self,
        company_id: Uuid,
        filter: ProductFilter,
    ) -> Result<Vec<products::Model>, RepositoryError> {
        let mut query = products::Entity::find()
            .filter(products::Column::CompanyId.eq(company_id))
            .order_by_asc(products::Column::Name);

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                products::Column::Name
                    .contains(search)
                    .or(products::Column::Sku.contains(search)),
            );
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(products::Column::IsActive.eq(is_active));
        }
        if let Some(level) = filter.low_stock {
            query = query.filter(products::Column::StockQuantity.lte(level));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Updates a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is missing, the SKU collides or a price is negative.
    pub async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<products::Model, RepositoryError> {
        let product = self.get_product(company_id, product_id).await?;
        let mut active: products::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(sku) = &input.sku {
            active.sku = Set(sku.trim().to_string());
        }
        if let Some(unit) = input.unit {
            active.unit = Set(unit);
        }
        if let Some(price) = input.purchase_price {
            active.purchase_price = Set(non_negative(price)?);
        }
        if let Some(price) = input.sale_price {
            active.sale_price = Set(non_negative(price)?);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        active.update(&self.db).await.map_err(|e| {
            on_unique_violation(e, || {
                format!("Product SKU '{}' already exists", input.sku.unwrap_or_default())
            })
        })
    }

    /// Soft-deletes a product. Past documents keep referencing it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product is not in the company.
    pub async fn deactivate_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<products::Model, RepositoryError> {
        self.update_product(
            company_id,
            product_id,
            UpdateProductInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Manually corrects stock on hand, e.g. after a count.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if the delta would make stock negative.
    pub async fn adjust_stock(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        delta: Decimal,
        reason: &str,
    ) -> Result<products::Model, RepositoryError> {
        let delta = round_quantity(delta);
        if delta.is_zero() {
            return Err(LedgerError::InvalidQuantity(delta).into());
        }
        let (movement, quantity) = if delta > Decimal::ZERO {
            (StockMovement::Purchase, delta)
        } else {
            (StockMovement::Sale, -delta)
        };

        let txn = self.db.begin().await?;
        let product = move_stock(&txn, company_id, product_id, movement, quantity)
            .await
            .inspect_err(|e| warn!(product_id = %product_id, error = %e, "Stock adjustment rejected"))?;
        txn.commit().await?;

        info!(
            company_id = %company_id,
            product_id = %product_id,
            %delta,
            stock = %product.stock_quantity,
            reason,
            "Stock adjusted"
        );
        Ok(product)
    }
}
