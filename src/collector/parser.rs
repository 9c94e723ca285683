//! Bridge JSON response parser
//!
//! Listing and read responses share one envelope:
//! `{"status": 200, "value": {...}, "timestamp": 1609459200}`.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::CollectorError;
use crate::transformer::Dimensions;

/// Result type for collector operations
pub type CollectResult<T> = Result<T, CollectorError>;

/// Bridge response envelope
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeResponse {
    /// Bridge-level status, distinct from the HTTP status
    #[serde(default)]
    pub status: u16,
    /// Response payload
    #[serde(default)]
    pub value: Option<Value>,
    /// Bridge clock at response time (Unix seconds)
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Error message on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl BridgeResponse {
    /// Whether the bridge reported success
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The object payload of a successful response
    ///
    /// Anything else (non-200 status, missing or non-object value) yields
    /// `None`, which callers treat as "no data".
    pub fn object(&self) -> Option<&serde_json::Map<String, Value>> {
        if !self.is_ok() {
            return None;
        }
        self.value.as_ref().and_then(Value::as_object)
    }

    /// Owned variant of [`BridgeResponse::object`]
    pub fn into_object(self) -> Option<serde_json::Map<String, Value>> {
        if !self.is_ok() {
            return None;
        }
        match self.value {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Parse a bridge response body
pub fn parse_response(body: &str) -> CollectResult<BridgeResponse> {
    serde_json::from_str(body).map_err(|e| CollectorError::JsonParse(e.to_string()))
}

/// Attribute tree node
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Integer leaf
    Integer(i64),
    /// Floating point leaf
    Float(f64),
    /// String leaf (never published)
    String(String),
    /// Boolean leaf (never published)
    Boolean(bool),
    /// Null leaf
    Null,
    /// Nested attribute map
    Object(AttributeMap),
    /// List, opaque to the default walk
    Array(Vec<AttributeValue>),
}

/// Attribute name to value, in name order
pub type AttributeMap = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    /// Numeric value of an integer or float leaf
    ///
    /// # Precision Warning
    /// Integers above 2^53 lose precision when converted to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Nested map, if this node is one
    pub fn as_object(&self) -> Option<&AttributeMap> {
        match self {
            AttributeValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => n
                    .as_f64()
                    .map(AttributeValue::Float)
                    .unwrap_or(AttributeValue::Null),
            },
            Value::String(s) => AttributeValue::String(s),
            Value::Array(items) => {
                AttributeValue::Array(items.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(map) => AttributeValue::Object(attribute_map(map)),
        }
    }
}

/// Convert a JSON object into an attribute map
pub fn attribute_map(map: serde_json::Map<String, Value>) -> AttributeMap {
    map.into_iter()
        .map(|(k, v)| (k, AttributeValue::from(v)))
        .collect()
}

/// Parsed `<domain>:<key=value,...>` bean identity
#[derive(Debug, Clone, PartialEq)]
pub struct BeanIdentity {
    /// Identity as supplied by the bridge
    pub raw: String,
    /// Domain (e.g. "java.lang")
    pub domain: String,
    /// Key properties (e.g. {"type": "Memory"})
    pub properties: Dimensions,
}

impl BeanIdentity {
    /// Parse a raw identity
    ///
    /// Splits on the first `:` only. Segments without `=` are ignored.
    ///
    /// # Limitations
    /// - Quoted keys/values are NOT fully supported
    pub fn parse(raw: &str) -> CollectResult<Self> {
        let (domain, keys) = raw
            .split_once(':')
            .ok_or_else(|| CollectorError::InvalidBeanIdentity(raw.to_string()))?;

        let properties = keys
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            domain: domain.to_string(),
            properties,
        })
    }
}
