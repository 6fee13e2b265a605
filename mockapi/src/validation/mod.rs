use crate::query::stringify;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// A data quality problem found in a mockapi JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    RootNotObject,
    EmptyDocument,
    NotAnArray { collection: String },
    EmptyCollection { collection: String },
    NonObjectEntries { collection: String, count: usize },
    MissingIds { collection: String, missing: usize, total: usize },
    DuplicateIds { collection: String, ids: Vec<String> },
    MixedTypes { collection: String, field: String, types: Vec<String> },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::RootNotObject => write!(f, "Root element must be a JSON object"),
            Issue::EmptyDocument => write!(f, "Database is empty (no collections)"),
            Issue::NotAnArray { collection } => {
                write!(f, "'{collection}' is not an array (expected a list of records)")
            }
            Issue::EmptyCollection { collection } => write!(f, "'{collection}' is empty"),
            Issue::NonObjectEntries { collection, count } => {
                write!(f, "'{collection}' has {count} non-object entries")
            }
            Issue::MissingIds {
                collection,
                missing,
                total,
            } => write!(
                f,
                "'{collection}' has {missing}/{total} records without 'id' field"
            ),
            Issue::DuplicateIds { collection, ids } => {
                write!(f, "'{collection}' has duplicate IDs: [{}]", ids.join(", "))
            }
            Issue::MixedTypes {
                collection,
                field,
                types,
            } => write!(
                f,
                "'{collection}.{field}' has mixed types: [{}]",
                types.join(", ")
            ),
        }
    }
}

/// Lint a raw JSON value as a mockapi database.
/// Returns every issue found; an empty list means the file is clean.
pub fn validate_value(data: &Value) -> Vec<Issue> {
    let root = match data.as_object() {
        Some(root) => root,
        None => return vec![Issue::RootNotObject],
    };
    if root.is_empty() {
        return vec![Issue::EmptyDocument];
    }

    let mut issues = Vec::new();
    for (name, members) in root {
        validate_collection(name, members, &mut issues);
    }
    issues
}

fn validate_collection(name: &str, members: &Value, issues: &mut Vec<Issue>) {
    let collection = name.to_string();
    let records = match members.as_array() {
        Some(records) => records,
        None => {
            issues.push(Issue::NotAnArray { collection });
            return;
        }
    };

    if records.is_empty() {
        issues.push(Issue::EmptyCollection { collection });
        return;
    }

    let non_object = records.iter().filter(|r| !r.is_object()).count();
    if non_object > 0 {
        issues.push(Issue::NonObjectEntries {
            collection,
            count: non_object,
        });
        return;
    }
    let objects = records.iter().filter_map(Value::as_object);

    let missing = objects.clone().filter(|r| !r.contains_key("id")).count();
    if missing > 0 {
        issues.push(Issue::MissingIds {
            collection: collection.clone(),
            missing,
            total: records.len(),
        });
    }

    // ids compare by their JSON text so 1 and "1" stay distinct
    let mut seen = HashSet::new();
    let mut dupes = BTreeMap::new();
    for id in objects.clone().filter_map(|r| r.get("id")) {
        let key = id.to_string();
        if !seen.insert(key.clone()) {
            dupes.entry(key).or_insert_with(|| stringify(id).into_owned());
        }
    }
    if !dupes.is_empty() {
        issues.push(Issue::DuplicateIds {
            collection: collection.clone(),
            ids: dupes.into_values().collect(),
        });
    }

    let mut field_types: BTreeMap<&str, BTreeSet<&'static str>> = BTreeMap::new();
    for record in objects {
        for (field, value) in record {
            if !value.is_null() {
                field_types.entry(field).or_default().insert(value_type(value));
            }
        }
    }
    for (field, types) in field_types {
        if types.len() > 1 {
            issues.push(Issue::MixedTypes {
                collection: collection.clone(),
                field: field.to_string(),
                types: types.into_iter().map(str::to_string).collect(),
            });
        }
    }
}

/// Type name for mixed-type detection. Integers and floats are distinct.
fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
