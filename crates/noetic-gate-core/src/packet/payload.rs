// noetic-gate-core/src/packet/payload.rs
// ============================================================================
// Module: Packet Payloads
// Description: The nine typed payload variants a packet may carry.
// Purpose: Give each packet type its structural shape beyond (header, mcp).
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Packet variants behave uniformly at the `(header, mcp)` level (see
//! [`crate::packet::Packet`]); this module defines what differs — the
//! payload. A tagged union on `packet_type` keeps the discriminator
//! explicit on the wire (invariant P1, §8).

use serde::Deserialize;
use serde::Serialize;

use crate::ids::TaskId;
use crate::ids::TokenId;
use crate::vocabulary::DecisionOutcome;
use crate::vocabulary::ToolSafety;

/// A claim about the world, typically emitted by L6 at the vat boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationPayload {
    /// The entity the observation is about.
    pub subject: String,
    /// Observed content.
    pub content: serde_json::Value,
}

/// A revision to a layer's beliefs, appended to the belief store on acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefUpdatePayload {
    /// Domain the belief concerns (free-form, used for belief-store queries).
    pub domain: String,
    /// Tags describing the belief's topic.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The belief's content.
    pub content: String,
}

/// A chosen course of action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    /// Chosen outcome.
    pub outcome: DecisionOutcome,
    /// Scope the decision applies to; matched against a prior
    /// `VerificationPlan::verification_target` by Gate 3 rule 2.
    pub scope: String,
    /// Free-text rationale.
    pub rationale: String,
}

/// A plan to verify a claim before acting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPlanPayload {
    /// Scope this plan verifies; matched against a subsequent `Decision::scope`.
    pub verification_target: String,
    /// Steps the plan intends to take.
    pub steps: Vec<String>,
}

/// A scoped, expiring authorization to perform write-capable actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAuthorizationTokenPayload {
    /// Identifier of the issued token, also recorded in the ledger.
    pub token_id: TokenId,
    /// Scope the token authorizes (matched against a directive's action).
    pub scope: String,
    /// Maximum number of uses before the token is exhausted.
    pub max_uses: u32,
    /// Seconds from issuance until the token expires.
    pub expires_in_seconds: u64,
}

/// An instruction for L6 to execute a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDirectivePayload {
    /// Identifier correlating this directive with its eventual `TaskResult`.
    pub task_id: TaskId,
    /// Safety classification of the underlying tool action.
    pub tool_safety: ToolSafety,
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Parameters for the tool invocation.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Write-authorization token cited when `tool_safety` is `WRITE`/`MIXED`.
    #[serde(default)]
    pub authorization_token_id: Option<TokenId>,
}

/// The outcome of an executed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultPayload {
    /// Identifier of the directive this result closes.
    pub task_id: TaskId,
    /// Whether the task succeeded.
    pub success: bool,
    /// Result data, if any.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Error message, if `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Tokens consumed executing this task, charged to the ledger.
    pub tokens_consumed: u64,
    /// Tool calls consumed executing this task, charged to the ledger.
    pub tool_calls_consumed: u64,
}

/// A request for operator attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPayload {
    /// Why this episode is being escalated.
    pub reason: String,
    /// Scope the escalation approves, used by Gate 3 rule 2/4 to unblock a
    /// pending decision or budget overrun.
    #[serde(default)]
    pub approves_scope: Option<String>,
}

/// Severity of a synthesized `IntegrityAlert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Informational; does not force SAFEMODE on its own.
    Low,
    /// Notable but recoverable.
    Medium,
    /// Forces the episode to SAFEMODE.
    High,
}

/// A supervisory alert synthesized on gate rejection, or emitted directly by
/// the integrity principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityAlertPayload {
    /// Alert severity.
    pub severity: AlertSeverity,
    /// Human-readable explanation.
    pub message: String,
    /// Identifier of the packet that triggered this alert, if any.
    #[serde(default)]
    pub triggering_packet_id: Option<String>,
}

/// The nine typed payload variants a packet may carry, tagged on `packet_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "packet_type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    /// See [`ObservationPayload`].
    Observation(ObservationPayload),
    /// See [`BeliefUpdatePayload`].
    BeliefUpdate(BeliefUpdatePayload),
    /// See [`DecisionPayload`].
    Decision(DecisionPayload),
    /// See [`VerificationPlanPayload`].
    VerificationPlan(VerificationPlanPayload),
    /// See [`ToolAuthorizationTokenPayload`].
    ToolAuthorizationToken(ToolAuthorizationTokenPayload),
    /// See [`TaskDirectivePayload`].
    TaskDirective(TaskDirectivePayload),
    /// See [`TaskResultPayload`].
    TaskResult(TaskResultPayload),
    /// See [`EscalationPayload`].
    Escalation(EscalationPayload),
    /// See [`IntegrityAlertPayload`].
    IntegrityAlert(IntegrityAlertPayload),
}

impl Payload {
    /// Returns the packet type discriminator for this payload.
    #[must_use]
    pub const fn packet_type(&self) -> crate::vocabulary::PacketType {
        use crate::vocabulary::PacketType;
        match self {
            Self::Observation(_) => PacketType::Observation,
            Self::BeliefUpdate(_) => PacketType::BeliefUpdate,
            Self::Decision(_) => PacketType::Decision,
            Self::VerificationPlan(_) => PacketType::VerificationPlan,
            Self::ToolAuthorizationToken(_) => PacketType::ToolAuthorizationToken,
            Self::TaskDirective(_) => PacketType::TaskDirective,
            Self::TaskResult(_) => PacketType::TaskResult,
            Self::Escalation(_) => PacketType::Escalation,
            Self::IntegrityAlert(_) => PacketType::IntegrityAlert,
        }
    }
}
