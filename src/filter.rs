//! Structured metadata filter expressions.
//!
//! Filters are data (field path, operator, value) rather than opaque
//! callbacks, so a vector-index backend can be swapped without
//! re-deriving query-building logic. Both index implementations evaluate
//! filters with [`MetadataFilter::matches`] against each record's
//! metadata object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::lookup_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Field equals the scalar value.
    Eq,
    /// Field is a member of the value array.
    In,
}

/// A single filter predicate over document metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Dotted path into the metadata object (e.g. `geocode.countryCode`).
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }

    /// Evaluate this filter against a metadata object. A missing field
    /// never matches.
    pub fn matches(&self, metadata: &Value) -> bool {
        let Some(actual) = lookup_path(metadata, &self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::In => match &self.value {
                Value::Array(options) => options.iter().any(|v| v == actual),
                _ => false,
            },
        }
    }
}
