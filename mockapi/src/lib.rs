pub mod document;
pub mod error;
pub mod query;
pub mod store;
pub mod validation;
pub mod watcher;

pub use document::{Document, Record};
pub use error::{MockApiError, Result};
pub use query::ListQuery;
pub use store::{ReloadOutcome, Store};
pub use validation::{validate_value, Issue};
