//! API route definitions.

use axum::{Router, middleware};
use hisab_shared::types::PageRequest;
use serde::{Deserialize, Deserializer};

use crate::{AppState, middleware::tenant_middleware};

pub mod accounts;
pub mod companies;
pub mod health;
pub mod parties;
pub mod products;
pub mod purchases;
pub mod receipts;
pub mod reports;
pub mod returns;
pub mod sales;
pub mod transactions;
pub mod transfers;
pub mod vouchers;

/// Creates the API router.
///
/// Everything below `/companies/{company_id}` passes through the tenant
/// middleware first.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes(state: AppState) -> Router<AppState> {
    let scoped = Router::new()
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(transfers::routes())
        .merge(vouchers::routes())
        .merge(parties::routes())
        .merge(products::routes())
        .merge(sales::routes())
        .merge(purchases::routes())
        .merge(receipts::routes())
        .merge(returns::routes())
        .merge(reports::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(companies::routes())
        .nest("/companies/{company_id}", scoped)
}

/// `?page=&per_page=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// Converts to a normalized [`PageRequest`].
    #[must_use]
    pub fn to_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}

/// Reads a present field, `null` included, as `Some`.
///
/// Paired with `#[serde(default)]` an absent field stays `None`, which lets
/// update bodies tell "leave alone" from "clear".
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hisab_shared::types::pagination::MAX_PER_PAGE;

    #[test]
    fn test_page_query_defaults() {
        let page = PageQuery::default().to_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
    }

    #[test]
    fn test_page_query_is_clamped() {
        let page = PageQuery {
            page: Some(0),
            per_page: Some(5000),
        }
        .to_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, MAX_PER_PAGE);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);

        let cleared: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }
}
