// noetic-gate-core/src/lib.rs
// ============================================================================
// Module: Noetic Gate Core Root
// Description: Public API surface for the cognitive orchestrator hard core.
// Purpose: Wire together the packet schema, validator gates, ledger, buses,
//          template compiler, and step runner into one crate surface.
// Dependencies: crate::{bus, hashing, ids, interfaces, layer_pool, ledger,
//              memory, packet, template, time, validators, vocabulary}
// ============================================================================

//! ## Overview
//! `noetic-gate-core` is the hard core of a bi-directional, layered cognitive
//! orchestrator: a typed packet schema and MCP envelope, a three-gate
//! validator stack (schema, FSM, invariants), a resource/token ledger, a
//! pair of directional buses routing by layer order, an episode template
//! compiler, and a step-driven runner that ties all of it together. Concrete
//! LLM providers, tools, telemetry sinks, and persistence backends are never
//! depended on directly — only the traits in [`interfaces`].

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod bus;
pub mod hashing;
pub mod ids;
pub mod interfaces;
pub mod layer_pool;
pub mod ledger;
pub mod memory;
pub mod packet;
pub mod runner;
pub mod template;
pub mod time;
pub mod validators;
pub mod vocabulary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bus::Bus;
pub use bus::BusMessage;
pub use bus::DeliveryFailure;
pub use bus::Direction;
pub use bus::PublishReport;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use ids::BeliefId;
pub use ids::CampaignId;
pub use ids::CorrelationId;
pub use ids::PacketId;
pub use ids::SelfModelEntryId;
pub use ids::StepId;
pub use ids::TaskId;
pub use ids::TemplateId;
pub use ids::TokenId;
pub use interfaces::BeliefRecord;
pub use interfaces::BeliefStore;
pub use interfaces::BusEvent;
pub use interfaces::BusMetrics;
pub use interfaces::LlmClient;
pub use interfaces::LlmError;
pub use interfaces::LlmOptions;
pub use interfaces::NoopMetrics;
pub use interfaces::RetryPolicy;
pub use interfaces::RunnerEvent;
pub use interfaces::RunnerMetrics;
pub use interfaces::SelfModelEntry;
pub use interfaces::SelfModelStore;
pub use interfaces::TokenUsage;
pub use interfaces::Tool;
pub use interfaces::ToolError;
pub use interfaces::ToolEvidenceRef;
pub use interfaces::ToolRegistry;
pub use interfaces::ToolResult;
pub use layer_pool::LayerInput;
pub use layer_pool::LayerInvocation;
pub use layer_pool::LayerPool;
pub use ledger::ActiveToken;
pub use ledger::BudgetCounter;
pub use ledger::BudgetKind;
pub use ledger::ConsumeOutcome;
pub use ledger::Ledger;
pub use ledger::LedgerError;
pub use ledger::LedgerSnapshot;
pub use ledger::OpenDirective;
pub use ledger::UseTokenOutcome;
pub use memory::InMemoryBeliefStore;
pub use memory::InMemorySelfModelStore;
pub use packet::AlertSeverity;
pub use packet::BeliefUpdatePayload;
pub use packet::DecisionPayload;
pub use packet::EscalationPayload;
pub use packet::Evidence;
pub use packet::EvidenceRef;
pub use packet::IntegrityAlertPayload;
pub use packet::Mcp;
pub use packet::ObservationPayload;
pub use packet::Packet;
pub use packet::PacketHeader;
pub use packet::Payload;
pub use packet::TaskDirectivePayload;
pub use packet::TaskResultPayload;
pub use packet::ToolAuthorizationTokenPayload;
pub use packet::VerificationPlanPayload;
pub use runner::EpisodeRecord;
pub use runner::EpisodeResult;
pub use runner::Runner;
pub use runner::RunnerDefaults;
pub use runner::RunnerError;
pub use runner::RunTemplateRequest;
pub use template::CompilationContext;
pub use template::CompilationError;
pub use template::CompilationErrorKind;
pub use template::CompiledEpisode;
pub use template::CompiledStep;
pub use template::EpisodeTemplate;
pub use template::TemplateConstraints;
pub use template::TemplateStep;
pub use template::compile;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use validators::InvariantValidation;
pub use validators::InvariantViolation;
pub use validators::SchemaError;
pub use validators::SchemaValidation;
pub use validators::IllegalTransition;
pub use validators::fsm_validate;
pub use validators::invariant_validate;
pub use validators::layer_may_emit;
pub use validators::validate_schema;
pub use vocabulary::DecisionOutcome;
pub use vocabulary::EpistemicStatus;
pub use vocabulary::FreshnessClass;
pub use vocabulary::FsmState;
pub use vocabulary::LayerSource;
pub use vocabulary::PacketType;
pub use vocabulary::QualityTier;
pub use vocabulary::StakesLevel;
pub use vocabulary::ToolSafety;
pub use vocabulary::ToolsState;
pub use vocabulary::VerificationRequirement;
