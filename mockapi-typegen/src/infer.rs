//! Structural type inference over sample JSON records.
//!
//! Every collection becomes a [`CollectionType`]: the union of field names seen
//! across its records, each with the union of value kinds observed. Nested
//! arrays and objects are inferred up to [`InferOptions::max_depth`] levels.

use crate::type_utils::{collection_type_name, list_type_name};
use mockapi::{Document, Record};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferOptions {
    /// Levels of structure inferred below a record's own fields.
    pub max_depth: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        InferOptions { max_depth: 1 }
    }
}

/// One observed kind of value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Integer,
    Float,
    String,
    Boolean,
    /// Element type of the array.
    Array(TypeUnion),
    /// Member fields, or `None` when past the depth limit.
    Object(Option<Vec<Field>>),
    /// Nothing to infer from (empty arrays, content past the depth limit).
    Unknown,
    Null,
}

impl Shape {
    // canonical position within a union
    fn rank(&self) -> u8 {
        match self {
            Shape::Integer => 0,
            Shape::Float => 1,
            Shape::String => 2,
            Shape::Boolean => 3,
            Shape::Array(_) => 4,
            Shape::Object(_) => 5,
            Shape::Unknown => 6,
            Shape::Null => 7,
        }
    }
}

/// The distinct shapes a value took across samples, in canonical order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeUnion {
    shapes: Vec<Shape>,
}

impl TypeUnion {
    pub fn of(shape: Shape) -> Self {
        TypeUnion {
            shapes: vec![shape],
        }
    }

    pub fn unknown() -> Self {
        TypeUnion::of(Shape::Unknown)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn is_nullable(&self) -> bool {
        self.shapes.contains(&Shape::Null)
    }

    /// Shapes other than `Null`.
    pub fn non_null(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| **s != Shape::Null)
    }

    fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
        self.shapes.sort_by_key(Shape::rank);
    }
}

/// A member of an inferred object type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeUnion,
    /// Absent from at least one sample.
    pub optional: bool,
}

/// The inferred type of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionType {
    pub collection: String,
    pub type_name: String,
    pub list_name: String,
    /// Number of records the type was inferred from.
    pub samples: usize,
    pub fields: Vec<Field>,
}

/// Infer a type for every collection in the document.
/// Type names that collide after singularization get a numeric suffix.
pub fn infer_document(document: &Document, options: &InferOptions) -> Vec<CollectionType> {
    let mut used = HashSet::new();
    document
        .collections()
        .map(|(name, records)| {
            let mut ty = infer_collection(name, records, options);
            let base = ty.type_name.clone();
            let mut n = 2;
            while !used.insert(ty.type_name.clone()) {
                ty.type_name = format!("{base}{n}");
                n += 1;
            }
            ty.list_name = list_type_name(&ty.type_name);
            ty
        })
        .collect()
}

pub fn infer_collection(name: &str, records: &[Record], options: &InferOptions) -> CollectionType {
    let type_name = collection_type_name(name);
    let samples: Vec<&Record> = records.iter().collect();
    CollectionType {
        collection: name.to_string(),
        list_name: list_type_name(&type_name),
        type_name,
        samples: records.len(),
        fields: infer_fields(&samples, options.max_depth),
    }
}

/// Infer the type of a single value, e.g. `42` -> `Integer`.
pub fn infer_value(value: &Value, options: &InferOptions) -> TypeUnion {
    infer_union(&[value], options.max_depth)
}

fn infer_fields(objects: &[&Record], depth: usize) -> Vec<Field> {
    let mut names: Vec<&str> = Vec::new();
    for object in objects {
        for key in object.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let values: Vec<&Value> = objects.iter().filter_map(|o| o.get(name)).collect();
            Field {
                name: name.to_string(),
                optional: values.len() < objects.len(),
                ty: infer_union(&values, depth),
            }
        })
        .collect()
}

/// Union of the shapes of `values`. `depth` is how many more levels of
/// array elements / object members may be looked into.
fn infer_union(values: &[&Value], depth: usize) -> TypeUnion {
    let mut union = TypeUnion::default();
    let mut elements: Vec<&Value> = Vec::new();
    let mut objects: Vec<&Record> = Vec::new();
    let (mut has_array, mut has_object) = (false, false);

    for value in values {
        let scalar = match value {
            Value::Null => Some(Shape::Null),
            Value::Bool(_) => Some(Shape::Boolean),
            Value::String(_) => Some(Shape::String),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Shape::Integer),
            Value::Number(_) => Some(Shape::Float),
            Value::Array(items) => {
                has_array = true;
                elements.extend(items.iter());
                None
            }
            Value::Object(map) => {
                has_object = true;
                objects.push(map);
                None
            }
        };
        if let Some(shape) = scalar {
            if !union.shapes.contains(&shape) {
                union.push(shape);
            }
        }
    }

    if has_array {
        let element = if depth == 0 || elements.is_empty() {
            TypeUnion::unknown()
        } else {
            infer_union(&elements, depth - 1)
        };
        union.push(Shape::Array(element));
    }
    if has_object {
        let fields = (depth > 0).then(|| infer_fields(&objects, depth - 1));
        union.push(Shape::Object(fields));
    }

    union
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn field<'a>(ty: &'a CollectionType, name: &str) -> &'a Field {
        ty.fields.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_infer_scalars() {
        let opts = InferOptions::default();
        assert_eq!(infer_value(&json!(42), &opts), TypeUnion::of(Shape::Integer));
        assert_eq!(infer_value(&json!(3.14), &opts), TypeUnion::of(Shape::Float));
        assert_eq!(infer_value(&json!("hello"), &opts), TypeUnion::of(Shape::String));
        assert_eq!(infer_value(&json!(true), &opts), TypeUnion::of(Shape::Boolean));
        assert_eq!(infer_value(&json!(null), &opts), TypeUnion::of(Shape::Null));
        assert_eq!(
            infer_value(&json!([1, 2]), &opts),
            TypeUnion::of(Shape::Array(TypeUnion::of(Shape::Integer)))
        );
    }

    #[test]
    fn test_nullable_string() {
        let data = records(json!([{ "id": 1, "tag": "x" }, { "id": 2, "tag": null }]));
        let ty = infer_collection("items", &data, &InferOptions::default());

        let tag = field(&ty, "tag");
        assert!(!tag.optional);
        assert!(tag.ty.is_nullable());
        assert_eq!(tag.ty.shapes(), &[Shape::String, Shape::Null]);
        assert_eq!(field(&ty, "id").ty, TypeUnion::of(Shape::Integer));
    }

    #[test]
    fn test_union_and_optional_fields() {
        let data = records(json!([
            { "id": 1, "value": "text" },
            { "id": 2, "value": 5, "extra": true },
            { "id": 3, "value": 1.5 }
        ]));
        let ty = infer_collection("things", &data, &InferOptions::default());

        assert_eq!(
            ty.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "value", "extra"]
        );
        assert_eq!(
            field(&ty, "value").ty.shapes(),
            &[Shape::Integer, Shape::Float, Shape::String]
        );
        let extra = field(&ty, "extra");
        assert!(extra.optional);
        assert_eq!(extra.ty, TypeUnion::of(Shape::Boolean));
    }

    #[test]
    fn test_nested_object_one_level() {
        let data = records(json!([
            { "id": 1, "address": { "city": "Paris", "geo": { "lat": 1.0 } } },
            { "id": 2, "address": { "city": "Oslo", "zip": "0150" } }
        ]));
        let ty = infer_collection("users", &data, &InferOptions::default());

        let address = field(&ty, "address");
        let Shape::Object(Some(members)) = &address.ty.shapes()[0] else {
            panic!("expected inferred object, got {:?}", address.ty);
        };
        let names: Vec<_> = members.iter().map(|m| (m.name.as_str(), m.optional)).collect();
        assert_eq!(names, vec![("city", false), ("geo", true), ("zip", true)]);
        // past the depth limit
        assert_eq!(members[1].ty, TypeUnion::of(Shape::Object(None)));
    }

    #[test]
    fn test_depth_zero_is_opaque() {
        let data = records(json!([{ "tags": ["a"], "meta": { "k": 1 } }]));
        let ty = infer_collection("posts", &data, &InferOptions { max_depth: 0 });
        assert_eq!(
            field(&ty, "tags").ty,
            TypeUnion::of(Shape::Array(TypeUnion::unknown()))
        );
        assert_eq!(field(&ty, "meta").ty, TypeUnion::of(Shape::Object(None)));
    }

    #[test]
    fn test_array_elements_union_across_records() {
        let data = records(json!([{ "tags": ["a", 1] }, { "tags": [] }, { "tags": [null] }]));
        let ty = infer_collection("posts", &data, &InferOptions::default());
        let Shape::Array(element) = &field(&ty, "tags").ty.shapes()[0] else {
            panic!("expected array");
        };
        assert_eq!(element.shapes(), &[Shape::Integer, Shape::String, Shape::Null]);
    }

    #[test]
    fn test_empty_collection_has_no_fields() {
        let ty = infer_collection("items", &[], &InferOptions::default());
        assert_eq!(ty.type_name, "Item");
        assert_eq!(ty.list_name, "ItemList");
        assert_eq!(ty.samples, 0);
        assert!(ty.fields.is_empty());
    }

    #[test]
    fn test_colliding_type_names_get_suffix() {
        let doc = Document::from_value(json!({ "users": [], "user": [] })).unwrap();
        let types = infer_document(&doc, &InferOptions::default());
        let names: Vec<_> = types.iter().map(|t| t.type_name.as_str()).collect();
        assert_eq!(names, vec!["User", "User2"]);
        assert_eq!(types[1].list_name, "User2List");
    }
}
