//! Common types used across the application.

pub mod money;
pub mod pagination;

pub use money::{round_money, round_quantity};
pub use pagination::{PageMeta, PageRequest, PageResponse};
