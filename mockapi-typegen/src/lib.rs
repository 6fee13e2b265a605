//! mockapi type generation - infers type declarations from the records in a
//! mockapi JSON file.
//!
//! The main entry point is [`generate`], which infers one type per collection
//! and renders it as TypeScript interfaces or serde-ready Rust structs.

pub mod infer;
pub mod rust;
pub mod type_utils;
pub mod typescript;

pub use infer::{infer_document, CollectionType, Field, InferOptions, Shape, TypeUnion};

use mockapi::Document;
use std::path::Path;

/// Output syntax for generated declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    TypeScript,
    Rust,
}

const HEADER: &str = "// Generated by mockapi from sample data. Edits will be overwritten.\n\n";

/// Generate declarations for every collection in `document`.
pub fn generate(document: &Document, language: Language, options: &InferOptions) -> String {
    let types = infer_document(document, options);
    let body = match language {
        Language::TypeScript => typescript::render(&types),
        Language::Rust => rust::render(&types),
    };
    format!("{HEADER}{body}")
}

/// Generate declarations from a JSON file.
///
/// # Example
///
/// ```no_run
/// use mockapi_typegen::{generate_from_file, InferOptions, Language};
///
/// let ts = generate_from_file("db.json", Language::TypeScript, &InferOptions::default()).unwrap();
/// std::fs::write("types.ts", ts).unwrap();
/// ```
pub fn generate_from_file(
    path: impl AsRef<Path>,
    language: Language,
    options: &InferOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let document = Document::read(path.as_ref())?;
    Ok(generate(&document, language, options))
}
