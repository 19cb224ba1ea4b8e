// noetic-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical examples for Noetic Gate orchestrator configuration, kept in
//! sync with the schema and docs.

/// Returns a canonical example `noetic-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[defaults]
token_budget = 10000
tool_call_budget = 50
time_budget_seconds = 600
risk_envelope = 1.0
risk_max_loss = 0.1

[template_registry]
path = "templates"

[prompts.paths]
INTEGRITY = "prompts/integrity.md"
L1 = "prompts/l1-aspirational.md"
L2 = "prompts/l2-global-strategy.md"
L3 = "prompts/l3-agent-model.md"
L4 = "prompts/l4-executive-function.md"
L5 = "prompts/l5-cognitive-control.md"
L6 = "prompts/l6-task-prosecution.md"

[evidence]
stale_if_older_than_seconds = 300
"#,
    )
}

/// Returns a canonical example `noetic-gate.ron` configuration.
#[must_use]
pub fn config_ron_example() -> String {
    String::from(
        r#"(
    defaults: (
        token_budget: 10000,
        tool_call_budget: 50,
        time_budget_seconds: 600,
        risk_envelope: 1.0,
        risk_max_loss: 0.1,
    ),
    template_registry: (
        path: "templates",
    ),
    prompts: (
        paths: {
            "INTEGRITY": "prompts/integrity.md",
            "L1": "prompts/l1-aspirational.md",
        },
    ),
    evidence: (
        stale_if_older_than_seconds: 300,
    ),
)
"#,
    )
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use crate::config::OrchestratorConfig;

    #[test]
    fn toml_example_parses_and_validates() {
        let config: OrchestratorConfig = toml::from_str(&super::config_toml_example()).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn ron_example_parses_and_validates() {
        let config: OrchestratorConfig = ron::from_str(&super::config_ron_example()).unwrap();
        config.validate().unwrap();
    }
}
