//! Strict request schemas
//!
//! Request bodies are checked field by field against the JSON types the API
//! promises, without any coercion: `poolId` must be a JSON integer, numbers
//! must be JSON numbers. Every failing field produces one [`FieldError`], in
//! field order, so clients get the same error list for the same body.

use poolstats_core::PoolId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire name of the pool id field
pub const POOL_ID: &str = "poolId";
/// Wire name of the upsert values field
pub const POOL_VALUES: &str = "poolValues";
/// Wire name of the query percentile field
pub const PERCENTILE: &str = "percentile";

/// One validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Machine-readable error kind, e.g. `int_type` or `missing`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Path to the offending value, starting at `"body"`
    pub loc: Vec<Value>,
    /// Human-readable message
    pub msg: String,
}

impl FieldError {
    fn new(kind: &'static str, loc: Vec<Value>, msg: impl Into<String>) -> Self {
        Self {
            kind,
            loc,
            msg: msg.into(),
        }
    }
}

/// Validated body of `POST /pools/upsert`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpsertBody {
    pub pool_id: PoolId,
    pub pool_values: Vec<f64>,
}

/// Validated body of `POST /pools/query`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolQueryBody {
    pub pool_id: PoolId,
    pub percentile: f64,
}

impl PoolUpsertBody {
    /// Parse and validate a raw request body
    pub fn parse(body: &[u8]) -> Result<Self, Vec<FieldError>> {
        let object = parse_object(body)?;
        let mut errors = Vec::new();

        record(&mut errors, int_field(&object, POOL_ID));
        match object.get(POOL_VALUES) {
            None => errors.push(missing(POOL_VALUES)),
            Some(value) => check_float_list(value, &mut errors),
        }

        decode(object, errors)
    }
}

impl PoolQueryBody {
    /// Parse and validate a raw request body
    pub fn parse(body: &[u8]) -> Result<Self, Vec<FieldError>> {
        let object = parse_object(body)?;
        let mut errors = Vec::new();

        record(&mut errors, int_field(&object, POOL_ID));
        record(&mut errors, percentile_field(&object));

        decode(object, errors)
    }
}

fn record<T>(errors: &mut Vec<FieldError>, result: Result<T, FieldError>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

/// Build the typed body once every field has passed the strict checks
fn decode<T: DeserializeOwned>(
    object: Map<String, Value>,
    errors: Vec<FieldError>,
) -> Result<T, Vec<FieldError>> {
    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(Value::Object(object)).map_err(|e| {
        vec![FieldError::new(
            "model_type",
            vec![Value::from("body")],
            e.to_string(),
        )]
    })
}

fn body_loc(field: &str) -> Vec<Value> {
    vec![Value::from("body"), Value::from(field)]
}

fn missing(field: &str) -> FieldError {
    FieldError::new("missing", body_loc(field), "Field required")
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, Vec<FieldError>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        vec![FieldError::new(
            "json_invalid",
            vec![Value::from("body")],
            format!("JSON decode error: {}", e),
        )]
    })?;

    match value {
        Value::Object(object) => Ok(object),
        _ => Err(vec![FieldError::new(
            "model_type",
            vec![Value::from("body")],
            "Input should be an object",
        )]),
    }
}

fn int_field(object: &Map<String, Value>, field: &str) -> Result<PoolId, FieldError> {
    let value = object.get(field).ok_or_else(|| missing(field))?;
    if let Some(id) = value.as_i64() {
        return Ok(id);
    }
    // Integers past i64::MAX still parse as u64
    if value.is_u64() {
        return Err(FieldError::new(
            "int_out_of_range",
            body_loc(field),
            "Input should be within the range of a 64-bit signed integer",
        ));
    }
    Err(FieldError::new(
        "int_type",
        body_loc(field),
        "Input should be a valid integer",
    ))
}

fn percentile_field(object: &Map<String, Value>) -> Result<f64, FieldError> {
    let value = object.get(PERCENTILE).ok_or_else(|| missing(PERCENTILE))?;
    let percentile = as_float(value).ok_or_else(|| {
        FieldError::new(
            "float_type",
            body_loc(PERCENTILE),
            "Input should be a valid number",
        )
    })?;

    if percentile <= 0.0 {
        return Err(FieldError::new(
            "greater_than",
            body_loc(PERCENTILE),
            "Input should be greater than 0",
        ));
    }
    if percentile > 100.0 {
        return Err(FieldError::new(
            "less_than_equal",
            body_loc(PERCENTILE),
            "Input should be less than or equal to 100",
        ));
    }
    Ok(percentile)
}

fn check_float_list(value: &Value, errors: &mut Vec<FieldError>) {
    let Some(items) = value.as_array() else {
        errors.push(FieldError::new(
            "list_type",
            body_loc(POOL_VALUES),
            "Input should be a valid list",
        ));
        return;
    };

    if items.is_empty() {
        errors.push(FieldError::new(
            "too_short",
            body_loc(POOL_VALUES),
            "List should have at least 1 item after validation, not 0",
        ));
        return;
    }

    for (index, item) in items.iter().enumerate() {
        if as_float(item).is_none() {
            let mut loc = body_loc(POOL_VALUES);
            loc.push(Value::from(index));
            errors.push(FieldError::new(
                "float_type",
                loc,
                "Input should be a valid number",
            ));
        }
    }
}

/// JSON numbers only; strings, bools and null are never coerced
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
