//! Caller-supplied filters merged on top of the tenant filter

use chrono::{DateTime, Utc};

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq {
        column: &'static str,
        value: FilterValue,
    },
    /// An empty list matches nothing.
    In {
        column: &'static str,
        values: Vec<FilterValue>,
    },
    /// Half-open `[from, to)`; either bound may be left open.
    Range {
        column: &'static str,
        from: Option<FilterValue>,
        to: Option<FilterValue>,
    },
    /// JSON array column sharing at least one element with `values`
    JsonOverlaps {
        column: &'static str,
        values: Vec<String>,
    },
    /// Substring match on any of `columns`
    Search {
        columns: Vec<&'static str>,
        term: String,
    },
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Filter::Eq {
            column,
            value: value.into(),
        }
    }

    pub fn any_of<V: Into<FilterValue>>(
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn between(
        column: &'static str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        Filter::Range {
            column,
            from: from.map(FilterValue::from),
            to: to.map(FilterValue::from),
        }
    }

    pub fn json_overlaps<S: Into<String>>(
        column: &'static str,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Filter::JsonOverlaps {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search(columns: &[&'static str], term: impl Into<String>) -> Self {
        Filter::Search {
            columns: columns.to_vec(),
            term: term.into(),
        }
    }

    /// Column names referenced by this filter
    pub(crate) fn columns(&self) -> Vec<&'static str> {
        match self {
            Filter::Eq { column, .. }
            | Filter::In { column, .. }
            | Filter::Range { column, .. }
            | Filter::JsonOverlaps { column, .. } => vec![*column],
            Filter::Search { columns, .. } => columns.clone(),
        }
    }

    /// Render this filter as a SQL predicate, pushing its bind values.
    /// Returns `None` when the filter places no constraint.
    pub(crate) fn render(&self, binds: &mut Vec<FilterValue>) -> Option<String> {
        match self {
            Filter::Eq { column, value } => {
                binds.push(value.clone());
                Some(format!("{} = ?", column))
            }
            Filter::In { column: _, values } if values.is_empty() => Some("1 = 0".to_string()),
            Filter::In { column, values } => {
                binds.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                Some(format!("{} IN ({})", column, placeholders))
            }
            Filter::Range { column, from, to } => {
                let mut parts = Vec::new();
                if let Some(from) = from {
                    binds.push(from.clone());
                    parts.push(format!("{} >= ?", column));
                }
                if let Some(to) = to {
                    binds.push(to.clone());
                    parts.push(format!("{} < ?", column));
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" AND "))
                }
            }
            Filter::JsonOverlaps { column: _, values } if values.is_empty() => {
                Some("1 = 0".to_string())
            }
            Filter::JsonOverlaps { column, values } => {
                binds.push(FilterValue::Text(serde_json::Value::from(values.clone()).to_string()));
                Some(format!("JSON_OVERLAPS({}, CAST(? AS JSON))", column))
            }
            Filter::Search { columns, term } => {
                let term = term.trim();
                if term.is_empty() || columns.is_empty() {
                    return None;
                }
                let pattern = format!("%{}%", escape_like(term));
                let clauses: Vec<String> = columns
                    .iter()
                    .map(|column| {
                        binds.push(FilterValue::Text(pattern.clone()));
                        format!("{} LIKE ?", column)
                    })
                    .collect();
                Some(format!("({})", clauses.join(" OR ")))
            }
        }
    }
}

/// Escape `LIKE` wildcards so user input only ever matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
