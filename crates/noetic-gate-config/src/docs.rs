// noetic-gate-config/src/docs.rs
// ============================================================================
// Module: Config Docs Generator
// Description: Markdown generator for `noetic-gate.toml` documentation.
// Purpose: Keep config docs in sync with the schema and validation rules.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! Generates a markdown reference for `noetic-gate.toml` from the canonical
//! configuration schema. The output is deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde_json::Value;

use crate::schema::config_schema;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Generates the configuration markdown documentation.
#[must_use]
pub fn config_docs_markdown() -> String {
    let schema = config_schema();
    let mut out = String::new();

    out.push_str("# noetic-gate.toml Configuration\n\n");
    out.push_str("## Overview\n\n");
    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        let _ = writeln!(out, "{description}\n");
    }

    out.push_str("## Fields\n\n");
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (section_name, section_schema) in properties {
            let _ = writeln!(out, "### `{section_name}`\n");
            if let Some(description) = section_schema.get("description").and_then(Value::as_str) {
                let _ = writeln!(out, "{description}\n");
            }
            if let Some(fields) = section_schema.get("properties").and_then(Value::as_object) {
                for (field_name, field_schema) in fields {
                    let field_type = field_schema.get("type").and_then(Value::as_str).unwrap_or("any");
                    let _ = writeln!(out, "- `{field_name}` (`{field_type}`)");
                }
            }
            out.push('\n');
        }
    }

    out
}
