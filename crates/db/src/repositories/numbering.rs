//! Per-company document number sequences.

use hisab_core::numbering::{DocumentKind, format_number};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};
use uuid::Uuid;

const NEXT_VALUE_SQL: &str = r"
INSERT INTO number_sequences (company_id, prefix, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (company_id, prefix)
DO UPDATE SET last_value = number_sequences.last_value + 1
RETURNING last_value
";

/// Allocates the next document number of `kind` for a company.
///
/// The upsert locks the counter row until the surrounding database
/// transaction ends, so concurrent writers queue behind each other and a
/// rolled-back transaction gives its number back.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn next_number<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    kind: DocumentKind,
) -> Result<String, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        NEXT_VALUE_SQL,
        [company_id.into(), kind.prefix().into()],
    );

    let row = conn
        .query_one(stmt)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("sequence {}", kind.prefix())))?;
    let sequence: i64 = row.try_get("", "last_value")?;

    Ok(format_number(kind, sequence))
}
