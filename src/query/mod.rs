//! List-request binding: field filters and pagination.

mod filter;
mod paginator;
mod selector;

pub use filter::{parse_filter, Filter, FilterOp};
pub use paginator::{OrderDirection, Ordering, Paginator, PaginatorConfig, PAGINATION_PARAMS};
pub use selector::{Selector, SelectorSchema, SelectorSlot, PRIMARY_KEY_PARAM};
