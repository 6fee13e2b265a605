use crate::infer::{CollectionType, Field, Shape, TypeUnion};
use crate::type_utils::is_ts_identifier;
use std::fmt::Write;

/// Render TypeScript declarations for every collection type.
pub fn render(types: &[CollectionType]) -> String {
    let blocks: Vec<String> = types.iter().map(render_collection).collect();
    blocks.join("\n")
}

fn render_collection(ty: &CollectionType) -> String {
    let mut out = String::new();
    if ty.samples == 0 {
        let _ = writeln!(out, "// '{}' has no records to infer fields from", ty.collection);
        let _ = writeln!(out, "export type {} = Record<string, unknown>;", ty.type_name);
    } else {
        let _ = writeln!(out, "export interface {} {{", ty.type_name);
        for field in &ty.fields {
            let _ = writeln!(out, "  {};", render_member(field));
        }
        let _ = writeln!(out, "}}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "export type {} = {}[];", ty.list_name, ty.type_name);
    out
}

fn render_member(field: &Field) -> String {
    let key = if is_ts_identifier(&field.name) {
        field.name.clone()
    } else {
        serde_json::Value::String(field.name.clone()).to_string()
    };
    let optional = if field.optional { "?" } else { "" };
    format!("{key}{optional}: {}", render_union(&field.ty))
}

/// TypeScript type expression for a union. Integer and Float both render
/// as `number` and collapse into one member.
pub fn render_union(union: &TypeUnion) -> String {
    let mut parts: Vec<String> = Vec::new();
    for shape in union.shapes() {
        let part = render_shape(shape);
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    if parts.is_empty() {
        return "unknown".to_string();
    }
    parts.join(" | ")
}

fn render_shape(shape: &Shape) -> String {
    match shape {
        Shape::Integer | Shape::Float => "number".to_string(),
        Shape::String => "string".to_string(),
        Shape::Boolean => "boolean".to_string(),
        Shape::Null => "null".to_string(),
        Shape::Unknown => "unknown".to_string(),
        Shape::Array(element) => {
            let inner = render_union(element);
            if inner.contains(" | ") {
                format!("({inner})[]")
            } else {
                format!("{inner}[]")
            }
        }
        Shape::Object(Some(fields)) if !fields.is_empty() => {
            let members: Vec<String> = fields.iter().map(render_member).collect();
            format!("{{ {} }}", members.join("; "))
        }
        Shape::Object(_) => "Record<string, unknown>".to_string(),
    }
}
