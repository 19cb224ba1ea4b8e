// noetic-gate-config/src/schema.rs
// ============================================================================
// Module: Config Schema
// Description: JSON schema builder for `noetic-gate.toml`.
// Purpose: Provide a canonical validation schema for config artifacts and tooling.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! This module defines the JSON Schema for [`super::OrchestratorConfig`]. The
//! schema is generated from the canonical config model and is used by
//! tooling and validation pipelines, not by `load` itself (which validates
//! structurally via `serde` plus [`super::OrchestratorConfig::validate`]).

use serde_json::Value;
use serde_json::json;

/// Returns the JSON schema for `noetic-gate.toml`.
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "noetic-gate://config/schemas/config.schema.json",
        "title": "Noetic Gate Orchestrator Configuration",
        "description": "Default episode budgets, template registry location, per-layer prompt paths, and evidence freshness defaults.",
        "type": "object",
        "properties": {
            "defaults": defaults_schema(),
            "template_registry": template_registry_schema(),
            "prompts": prompts_schema(),
            "evidence": evidence_schema(),
        },
    })
}

fn defaults_schema() -> Value {
    json!({
        "type": "object",
        "description": "Default episode budgets applied when a run request omits them.",
        "properties": {
            "token_budget": { "type": "integer", "minimum": 0 },
            "tool_call_budget": { "type": "integer", "minimum": 0 },
            "time_budget_seconds": { "type": "integer", "minimum": 1 },
            "risk_envelope": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
            "risk_max_loss": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
        },
    })
}

fn template_registry_schema() -> Value {
    json!({
        "type": "object",
        "description": "Directory of RON episode template files.",
        "properties": {
            "path": { "type": "string", "minLength": 1 },
        },
    })
}

fn prompts_schema() -> Value {
    json!({
        "type": "object",
        "description": "Per-layer system-prompt file paths, keyed by layer name.",
        "properties": {
            "paths": {
                "type": "object",
                "additionalProperties": { "type": "string", "minLength": 1 },
            },
        },
    })
}

fn evidence_schema() -> Value {
    json!({
        "type": "object",
        "description": "Evidence freshness defaults.",
        "properties": {
            "stale_if_older_than_seconds": { "type": "integer", "minimum": 1 },
        },
    })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use jsonschema::Draft;

    use super::*;
    use crate::config::OrchestratorConfig;

    #[test]
    fn default_config_validates_against_its_own_schema() {
        let schema = config_schema();
        let validator = jsonschema::options().with_draft(Draft::Draft202012).build(&schema).unwrap();
        let instance = serde_json::to_value(OrchestratorConfig::default()).unwrap();
        assert!(validator.is_valid(&instance), "{instance}");
    }

    #[test]
    fn schema_has_a_stable_id() {
        let schema = config_schema();
        assert_eq!(schema["$id"], "noetic-gate://config/schemas/config.schema.json");
    }
}
