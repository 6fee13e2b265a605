use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockApiError {
    #[error("{}", not_found_message(.collection, .id.as_deref()))]
    NotFound {
        collection: String,
        id: Option<String>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MockApiError {
    pub fn collection_not_found(collection: &str) -> Self {
        MockApiError::NotFound {
            collection: collection.to_string(),
            id: None,
        }
    }

    pub fn record_not_found(collection: &str, id: &str) -> Self {
        MockApiError::NotFound {
            collection: collection.to_string(),
            id: Some(id.to_string()),
        }
    }
}

fn not_found_message(collection: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("Record not found: {collection}/{id}"),
        None => format!("Collection not found: {collection}"),
    }
}

pub type Result<T> = std::result::Result<T, MockApiError>;
