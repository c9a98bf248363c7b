//! Company repository: the tenant boundary.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::error::{RepositoryError, on_unique_violation};
use crate::entities::companies;

/// Input for creating a company.
#[derive(Debug, Clone)]
pub struct CreateCompanyInput {
    /// Display name.
    pub name: String,
    /// URL-safe unique identifier.
    pub slug: String,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Input for updating a company.
#[derive(Debug, Clone, Default)]
pub struct UpdateCompanyInput {
    /// Display name.
    pub name: Option<String>,
    /// Postal address.
    pub address: Option<Option<String>>,
    /// Contact phone.
    pub phone: Option<Option<String>>,
    /// Whether the company is active.
    pub is_active: Option<bool>,
}

/// Loads a company or fails with `NotFound`.
pub(crate) async fn require_company<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
) -> Result<companies::Model, RepositoryError> {
    companies::Entity::find_by_id(company_id)
        .one(conn)
        .await?
        .ok_or(RepositoryError::not_found("Company", company_id))
}

/// Company repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Checks if a slug is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let count = companies::Entity::find()
            .filter(companies::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Creates a company.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the slug is taken.
    pub async fn create_company(
        &self,
        input: CreateCompanyInput,
    ) -> Result<companies::Model, RepositoryError> {
        let slug = input.slug.trim().to_lowercase();
        if self.slug_exists(&slug).await? {
            return Err(RepositoryError::Conflict(format!(
                "Company slug '{slug}' already exists"
            )));
        }

        let now = Utc::now().into();
        let company = companies::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug.clone()),
            address: Set(input.address),
            phone: Set(input.phone),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        company.insert(&self.db).await.map_err(|e| {
            on_unique_violation(e, || format!("Company slug '{slug}' already exists"))
        })
    }

    /// Gets a company by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the company does not exist.
    pub async fn get_company(&self, id: Uuid) -> Result<companies::Model, RepositoryError> {
        require_company(&self.db, id).await
    }

    /// Lists all companies by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_companies(&self) -> Result<Vec<companies::Model>, RepositoryError> {
        Ok(companies::Entity::find()
            .order_by_asc(companies::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Updates a company.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the company does not exist.
    pub async fn update_company(
        &self,
        id: Uuid,
        input: UpdateCompanyInput,
    ) -> Result<companies::Model, RepositoryError> {
        let company = self.get_company(id).await?;
        let mut active: companies::ActiveModel = company.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }
}
