// noetic-gate-core/src/vocabulary/mod.rs
// ============================================================================
// Module: Noetic Gate Vocabulary
// Description: Closed enumerations shared by every packet, template, and gate.
// Purpose: Provide the stable, serializable vocabulary the rest of the core builds on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every enumerated value an episode can carry lives here: stakes, quality,
//! epistemic status, layer identity, FSM state, packet type, and decision
//! outcome. Nothing in this module depends on anything else in the crate.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Stakes & Quality
// ============================================================================

/// Overall stakes classification of a packet, the monotone maximum of its
/// four stakes components.
///
/// # Invariants
/// - Ordered LOW < MEDIUM < HIGH < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakesLevel {
    /// Low stakes; routine reversible action.
    Low,
    /// Medium stakes.
    Medium,
    /// High stakes; requires verification before acting.
    High,
    /// Critical stakes; requires verification or escalation before acting.
    Critical,
}

/// Quality tier a layer is aiming to satisfy for an emitted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    /// Below the acceptance bar; disallowed for write-capable directives.
    Subpar,
    /// Meets the acceptance bar.
    Par,
    /// Exceeds the acceptance bar.
    Superb,
}

// ============================================================================
// SECTION: Epistemics
// ============================================================================

/// How a claim was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicStatus {
    /// Directly observed via a tool at the vat boundary.
    Observed,
    /// Derived deterministically from observed or derived facts.
    Derived,
    /// Inferred with uncertainty from available evidence.
    Inferred,
    /// Assumed without direct supporting evidence.
    Assumed,
}

/// How quickly a claim is expected to go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreshnessClass {
    /// Valid only for the current instant.
    Realtime,
    /// Valid for the current operational window.
    Operational,
    /// Valid across the current strategic horizon.
    Strategic,
    /// Archival; staleness is not expected to matter.
    Archival,
}

/// How strongly a claim must be verified before being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationRequirement {
    /// Verification is not required.
    Optional,
    /// Verification is required before acting.
    Required,
    /// Verification is mandatory and cannot be waived by escalation.
    Mandatory,
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Current availability of the tool layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolsState {
    /// All registered tools are reachable.
    ToolsOk,
    /// Some registered tools are unreachable.
    ToolsPartial,
    /// No registered tools are reachable.
    ToolsDown,
}

/// Safety classification of a tool, gating whether a write-authorization
/// token is required to invoke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolSafety {
    /// Read-only; no token required.
    Read,
    /// Mutates external state; requires a valid write-authorization token.
    Write,
    /// Mixed read/write; requires a valid write-authorization token.
    Mixed,
}

// ============================================================================
// SECTION: Layers & FSM
// ============================================================================

/// A reasoning layer, or the supervisory integrity principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayerSource {
    /// Supervisory principal; may traverse both buses.
    Integrity,
    /// L1 Aspirational.
    L1,
    /// L2 Global Strategy.
    L2,
    /// L3 Agent Model.
    L3,
    /// L4 Executive Function.
    L4,
    /// L5 Cognitive Control.
    L5,
    /// L6 Task Prosecution.
    L6,
}

impl LayerSource {
    /// Returns the layer's position in the bus ordering (`INTEGRITY` = 0, `L1` = 1, ... `L6` = 6).
    ///
    /// Northbound delivery requires `order(target) < order(source)`; southbound
    /// requires `order(target) > order(source)`.
    #[must_use]
    pub const fn order(self) -> u8 {
        match self {
            Self::Integrity => 0,
            Self::L1 => 1,
            Self::L2 => 2,
            Self::L3 => 3,
            Self::L4 => 4,
            Self::L5 => 5,
            Self::L6 => 6,
        }
    }
}

/// State of the per-episode finite state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FsmState {
    /// No step in flight.
    Idle,
    /// Gathering observations.
    Perceive,
    /// Updating beliefs.
    Orient,
    /// Deciding on a course of action.
    Decide,
    /// Verifying before acting.
    Verify,
    /// Authorizing a write-capable action.
    Authorize,
    /// Executing a directive.
    Execute,
    /// Reporting a task result.
    Report,
    /// Escalating to an operator.
    Escalate,
    /// Degraded terminal state entered on any unrecoverable validator failure.
    Safemode,
    /// Episode finished successfully.
    Complete,
}

// ============================================================================
// SECTION: Packets
// ============================================================================

/// Discriminator for the nine packet payload variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    /// A claim about the world, usually from L6 at the vat boundary.
    Observation,
    /// A revision to a layer's beliefs.
    BeliefUpdate,
    /// A chosen course of action.
    Decision,
    /// A plan to verify a claim before acting on it.
    VerificationPlan,
    /// A scoped, expiring authorization to perform write-capable actions.
    ToolAuthorizationToken,
    /// An instruction for L6 to execute a task.
    TaskDirective,
    /// The outcome of an executed task.
    TaskResult,
    /// A request for operator attention.
    Escalation,
    /// A supervisory alert synthesized on gate rejection.
    IntegrityAlert,
}

impl PacketType {
    /// Returns the FSM state this packet type implies per the fixed mapping in §4.2.
    #[must_use]
    pub const fn implied_fsm_state(self) -> FsmState {
        match self {
            Self::Observation => FsmState::Perceive,
            Self::BeliefUpdate => FsmState::Orient,
            Self::Decision => FsmState::Decide,
            Self::VerificationPlan => FsmState::Verify,
            Self::ToolAuthorizationToken => FsmState::Authorize,
            Self::TaskDirective => FsmState::Execute,
            Self::TaskResult => FsmState::Report,
            Self::Escalation => FsmState::Escalate,
            Self::IntegrityAlert => FsmState::Safemode,
        }
    }
}

/// Outcome chosen by a `Decision` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// Act immediately.
    Act,
    /// Verify before acting.
    VerifyFirst,
    /// Escalate to an operator.
    Escalate,
    /// Defer; return to idle.
    Defer,
}
