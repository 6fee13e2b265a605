// Query engine - equality filters, sorting and pagination for list requests

use crate::document::Record;
use crate::error::{MockApiError, Result};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Page size used when `_page` is given without `_limit`.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub limit: usize,
}

impl Page {
    fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.number - 1).saturating_mul(self.limit);
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }
}

/// A parsed list request: filters plus control parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub sort: Option<Sort>,
    pub page: Option<Page>,
}

impl ListQuery {
    /// Split query-string pairs into filters and control parameters.
    /// Keys starting with `_` are control parameters; unknown ones are ignored.
    pub fn parse<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Vec::new();
        let mut page_number = None;
        let mut limit = None;
        let mut sort_field = None;
        let mut order = None;

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "_page" => page_number = Some(parse_positive("_page", value)?),
                "_limit" => limit = Some(parse_positive("_limit", value)?),
                "_sort" => sort_field = Some(value.to_string()),
                "_order" => order = Some(parse_order(value)?),
                k if k.starts_with('_') => {
                    log::debug!("Ignoring unknown control parameter '{k}'");
                }
                _ => filters.push((key.to_string(), value.to_string())),
            }
        }

        let page = match (page_number, limit) {
            (None, None) => None,
            (number, limit) => Some(Page {
                number: number.unwrap_or(1),
                limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            }),
        };

        let sort = sort_field.map(|field| Sort {
            field,
            order: order.unwrap_or(SortOrder::Asc),
        });

        Ok(ListQuery {
            filters,
            sort,
            page,
        })
    }

    /// True when the record satisfies every filter.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .is_some_and(|value| stringify(value) == expected.as_str())
        })
    }

    /// Filter, then sort, then paginate.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        let mut selected: Vec<&Record> = records.iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            selected.sort_by(|a, b| compare_by_field(a, b, sort));
        }

        let selected = match &self.page {
            Some(page) => page.slice(&selected),
            None => &selected[..],
        };

        selected.iter().map(|r| (*r).clone()).collect()
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(MockApiError::Validation(format!(
            "{name} must be a positive integer, got '{value}'"
        ))),
    }
}

fn parse_order(value: &str) -> Result<SortOrder> {
    match value.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(MockApiError::Validation(format!(
            "_order must be 'asc' or 'desc', got '{value}'"
        ))),
    }
}

/// String form of a JSON value as compared against query-string values.
/// Strings are taken verbatim; everything else uses its compact JSON text.
pub fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed("null"),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

// Records missing the field always sort last, whatever the direction.
fn compare_by_field(a: &Record, b: &Record, sort: &Sort) -> Ordering {
    match (a.get(&sort.field), b.get(&sort.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            match sort.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}
