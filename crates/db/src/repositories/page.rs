//! Offset pagination over `SeaORM` selects.

use hisab_shared::types::{PageRequest, PageResponse};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select};

/// Runs `select` for one page and counts the full result set.
pub(crate) async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: &PageRequest,
) -> Result<PageResponse<E::Model>, DbErr>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let page = page.normalized();
    let total = select.clone().count(db).await?;
    let data = select
        .offset(page.offset())
        .limit(page.limit())
        .all(db)
        .await?;

    Ok(PageResponse::new(data, page.page, page.per_page, total))
}
