//! JSON Schema helpers for schemars
//!
//! schemars emits `format: uint32` and friends for unsigned integers, which
//! is not a JSON Schema format. The `*_schema` functions here are meant for
//! `#[schemars(schema_with = "...")]` and produce plain bounded integers.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde_json::Value;

/// Draft-07 schema for `T` with subschemas inlined, the shape MCP clients expect.
pub fn schema_for<T: JsonSchema>() -> Value {
    let generator = schemars::generate::SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

/// Schema for unsigned 32-bit integers (u32)
pub fn u32_schema(_gen: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "integer",
        "minimum": 0
    })
}

/// Schema for unsigned 64-bit integers (u64)
pub fn u64_schema(_gen: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "integer",
        "minimum": 0
    })
}

/// Schema for `Option<u32>`
pub fn optional_u32_schema(_gen: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": ["integer", "null"],
        "minimum": 0
    })
}

/// Schema for `Option<u64>`
pub fn optional_u64_schema(_gen: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": ["integer", "null"],
        "minimum": 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Sample {
        #[schemars(schema_with = "u32_schema")]
        limit: u32,
        #[schemars(schema_with = "u64_schema")]
        wait_for: u64,
        #[schemars(schema_with = "optional_u64_schema")]
        timeout: Option<u64>,
        inner: Inner,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Inner {
        name: String,
    }

    #[test]
    fn test_unsigned_has_no_format() {
        let schema = schema_for::<Sample>();
        let limit = &schema["properties"]["limit"];
        assert_eq!(limit["type"], "integer");
        assert!(limit.get("format").is_none());
        assert!(schema["properties"]["wait_for"].get("format").is_none());
        assert!(schema["properties"]["timeout"].get("format").is_none());
    }

    #[test]
    fn test_subschemas_inlined() {
        let schema = schema_for::<Sample>();
        assert!(schema.get("definitions").is_none());
        assert_eq!(schema["properties"]["inner"]["type"], "object");
    }
}
