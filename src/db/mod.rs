pub(crate) mod query;
mod repository;
mod schema;

pub use query::NO_SUMMARY_PLACEHOLDER;
pub use repository::Repository;
