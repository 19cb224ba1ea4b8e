// noetic-gate-core/src/interfaces/tool.rs
// ============================================================================
// Module: Tool Contract
// Description: The opaque `execute(params) -> result` capability consumed by L6.
// Purpose: Keep concrete tool implementations entirely outside the core (§1),
//          while enforcing the write-authorization seam at the trait boundary.
// Dependencies: serde_json, chrono, thiserror, crate::vocabulary
// ============================================================================

//! ## Overview
//! §6.2 treats tools as opaque `execute(params) -> result` capabilities
//! classified `READ`/`WRITE`/`MIXED`. The registry resolves a tool by name
//! and enforces that `WRITE`/`MIXED` execution without a currently valid
//! [`crate::ledger::ActiveToken`] fails with [`ToolError::Unauthorized`]
//! rather than reaching the tool at all.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ledger::ActiveToken;
use crate::vocabulary::ToolSafety;

/// A single evidence citation a tool produces on success, consumable by
/// Gate 3 rule 3 (grounding) once attached to a packet's `Evidence::refs`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEvidenceRef {
    /// Identifier of this evidence artifact.
    pub ref_id: String,
    /// Kind of reference; tools report `"tool_output"`.
    pub ref_type: String,
    /// Name of the tool that produced this evidence.
    pub tool_name: String,
    /// When the tool call completed.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Reliability score in `[0, 1]` assigned by the tool.
    pub reliability_score: f64,
}

/// The outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Result data, if any.
    pub data: Option<serde_json::Value>,
    /// Error message, if `success` is false.
    pub error: Option<String>,
    /// Evidence the call produced, if any.
    pub evidence_ref: Option<ToolEvidenceRef>,
    /// Wall-clock execution time.
    pub execution_time_ms: u64,
}

/// Errors raised by tool execution or registry lookup.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("no tool registered as {0}")]
    NotFound(String),
    /// A `WRITE`/`MIXED` tool was invoked without a currently valid token.
    #[error("unauthorized: {tool_name} requires a valid write-authorization token")]
    Unauthorized {
        /// Name of the tool that was invoked.
        tool_name: String,
    },
    /// The tool itself reported a failure.
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// A single registered tool: an opaque `execute(params) -> result` capability
/// with a fixed safety classification.
pub trait Tool: Send + Sync {
    /// This tool's stable name, used by `TaskDirectivePayload::tool_name`.
    fn name(&self) -> &str;

    /// Safety classification gating whether a write-authorization token is
    /// required to invoke this tool (§6.2).
    fn safety(&self) -> ToolSafety;

    /// Executes the tool with the given parameters.
    ///
    /// # Errors
    /// Returns [`ToolError::ExecutionFailed`] when the underlying action fails.
    fn execute(&self, params: &serde_json::Value) -> Result<ToolResult, ToolError>;
}

/// Registry of available tools, enforcing the write-authorization seam
/// before a `WRITE`/`MIXED` tool is ever reached (§6.2).
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registers a tool, replacing any prior registration under the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(std::convert::AsRef::as_ref)
    }

    /// Lists the names of every registered tool.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Executes a registered tool, enforcing the write-authorization seam:
    /// a `WRITE`/`MIXED` tool requires `active_token` to be `Some` and
    /// currently valid at `now`.
    ///
    /// # Errors
    /// Returns [`ToolError::NotFound`] for an unregistered name,
    /// [`ToolError::Unauthorized`] when a write-capable tool is invoked
    /// without a valid token, or [`ToolError::ExecutionFailed`] when the
    /// tool itself fails.
    pub fn execute(&self, name: &str, params: &serde_json::Value, active_token: Option<&ActiveToken>, now: chrono::DateTime<chrono::Utc>) -> Result<ToolResult, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_owned()))?;
        if matches!(tool.safety(), ToolSafety::Write | ToolSafety::Mixed) {
            let authorized = active_token.is_some_and(|token| token.is_valid(now));
            if !authorized {
                return Err(ToolError::Unauthorized {
                    tool_name: name.to_owned(),
                });
            }
        }
        tool.execute(params)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    struct EchoTool {
        safety: ToolSafety,
    }

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn safety(&self) -> ToolSafety {
            self.safety
        }

        fn execute(&self, params: &serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult {
                success: true,
                data: Some(params.clone()),
                error: None,
                evidence_ref: None,
                execution_time_ms: 1,
            })
        }
    }

    #[test]
    fn write_tool_without_token_is_unauthorized() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool { safety: ToolSafety::Write }));
        let err = registry.execute("echo", &serde_json::json!({}), None, chrono::Utc::now()).unwrap_err();
        assert!(matches!(err, ToolError::Unauthorized { .. }));
    }

    #[test]
    fn read_tool_needs_no_token() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool { safety: ToolSafety::Read }));
        let result = registry.execute("echo", &serde_json::json!({"x": 1}), None, chrono::Utc::now()).unwrap();
        assert!(result.success);
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", &serde_json::json!({}), None, chrono::Utc::now()).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
