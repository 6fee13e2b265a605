use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::Ident;
use quote::format_ident;

/// Convert a collection name to its singular PascalCase type name.
/// e.g. "users" -> "User", "categories" -> "Category", "blog-posts" -> "BlogPost"
pub fn collection_type_name(collection_name: &str) -> String {
    let name = singularize(collection_name).to_pascal_case();
    match name.chars().next() {
        None => "Item".to_string(),
        Some(c) if c.is_ascii_digit() => format!("T{name}"),
        Some(_) => name,
    }
}

/// Name of the array alias for a collection type.
/// e.g. "User" -> "UserList"
pub fn list_type_name(type_name: &str) -> String {
    format!("{type_name}List")
}

/// Naive singularization of English words.
pub fn singularize(word: &str) -> String {
    let w = word.to_lowercase();
    if w.ends_with("ies") && w.len() > 3 {
        format!("{}y", &w[..w.len() - 3])
    } else if w.ends_with("ses") || w.ends_with("xes") || w.ends_with("zes") {
        w[..w.len() - 2].to_string()
    } else if w.ends_with("ves") {
        format!("{}f", &w[..w.len() - 3])
    } else if w.ends_with('s') && !w.ends_with("ss") && w.len() > 1 {
        w[..w.len() - 1].to_string()
    } else {
        w
    }
}

/// True if `name` can be used as a bare TypeScript property name.
pub fn is_ts_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// snake_case Rust field name for a JSON key, without raw-identifier prefix.
/// Keys with no usable characters become "field"; leading digits get a prefix.
pub fn rust_field_name(name: &str) -> String {
    let snake = name.to_snake_case();
    match snake.chars().next() {
        None => "field".to_string(),
        Some(c) if c.is_ascii_digit() => format!("field_{snake}"),
        Some(_) => snake,
    }
}

/// Identifier for a Rust field, using raw syntax for keywords.
pub fn safe_field_ident(name: &str) -> Ident {
    match name {
        // these cannot be raw identifiers
        "self" | "Self" | "super" | "crate" => format_ident!("{}_", name),
        "type" | "struct" | "enum" | "fn" | "let" | "mut" | "ref" | "mod" | "use" | "pub"
        | "impl" | "trait" | "for" | "loop" | "while" | "if" | "else" | "match" | "return"
        | "break" | "continue" | "as" | "in" | "where" | "async" | "await" | "dyn" | "move"
        | "static" | "const" | "unsafe" | "extern" | "true" | "false" | "abstract"
        | "become" | "box" | "do" | "final" | "macro" | "override" | "priv" | "typeof"
        | "unsized" | "virtual" | "yield" | "try" | "gen" => format_ident!("r#{}", name),
        _ => format_ident!("{}", name),
    }
}
