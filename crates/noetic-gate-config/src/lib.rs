// noetic-gate-config/src/lib.rs
// ============================================================================
// Module: Noetic Gate Config Library
// Description: Canonical orchestrator config model, validation, and artifact
//              generation.
// Purpose: Single source of truth for `noetic-gate.toml` semantics.
// Dependencies: noetic-gate-core, serde, toml, ron, serde_yaml
// ============================================================================

//! ## Overview
//! `noetic-gate-config` defines the canonical configuration model for a
//! Noetic Gate host process: default episode budgets, the template registry
//! location, per-layer system-prompt file paths, and the evidence-staleness
//! default. It provides strict, fail-closed validation and deterministic
//! generators for config schema, examples, and docs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod docs;
pub mod examples;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use docs::config_docs_markdown;
pub use examples::config_ron_example;
pub use examples::config_toml_example;
pub use schema::config_schema;
