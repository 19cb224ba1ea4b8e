// noetic-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Noetic Gate Interfaces
// Description: Backend-agnostic traits for the LLM client, tools, telemetry,
//              and episode memory.
// Purpose: Define the contract surfaces the runner depends on, keeping every
//          concrete backend an external collaborator (§1).
// Dependencies: crate::vocabulary, crate::ledger, crate::packet
// ============================================================================

//! ## Overview
//! Everything the core consumes from the outside world — the LLM client
//! (§6.1), tools (§6.2), telemetry sinks (§10.1), and episode memory (§3.6) —
//! is a trait here. Concrete implementations are host concerns; the core
//! never depends on one.

pub mod llm;
pub mod memory;
pub mod metrics;
pub mod tool;

pub use llm::LlmClient;
pub use llm::LlmError;
pub use llm::LlmOptions;
pub use llm::RetryPolicy;
pub use llm::TokenUsage;
pub use memory::BeliefRecord;
pub use memory::BeliefStore;
pub use memory::SelfModelEntry;
pub use memory::SelfModelStore;
pub use metrics::BusEvent;
pub use metrics::BusMetrics;
pub use metrics::NoopMetrics;
pub use metrics::RunnerEvent;
pub use metrics::RunnerMetrics;
pub use tool::Tool;
pub use tool::ToolError;
pub use tool::ToolEvidenceRef;
pub use tool::ToolRegistry;
pub use tool::ToolResult;
