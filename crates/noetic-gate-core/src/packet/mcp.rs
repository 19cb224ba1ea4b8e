// noetic-gate-core/src/packet/mcp.rs
// ============================================================================
// Module: MCP Envelope
// Description: The mandatory policy payload attached to every consequential packet.
// Purpose: Carry intent, stakes, quality, budgets, epistemics, evidence, and
//          routing fields that gate downstream action.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The MCP envelope is the policy surface every gate reads from. It is
//! mandatory on consequential packets; `Packet::mcp` is `None` only for
//! packets the schema validator treats as non-consequential (none in the
//! current vocabulary — every packet type is consequential).

use serde::Deserialize;
use serde::Serialize;

use crate::vocabulary::EpistemicStatus;
use crate::vocabulary::FreshnessClass;
use crate::vocabulary::QualityTier;
use crate::vocabulary::StakesLevel;
use crate::vocabulary::ToolsState;
use crate::vocabulary::VerificationRequirement;

/// What a packet is for and what it's scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// One-line summary of intent.
    pub summary: String,
    /// Scope the intent is bounded to (e.g. a file path, a resource id).
    pub scope: String,
}

/// The four stakes components, plus their monotone-max summary.
///
/// # Invariants
/// - `stakes_level` must equal `max(impact, irreversibility, uncertainty, adversariality)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakes {
    /// How much impact a wrong call would have.
    pub impact: StakesLevel,
    /// How hard a wrong call would be to undo.
    pub irreversibility: StakesLevel,
    /// How uncertain the acting layer is.
    pub uncertainty: StakesLevel,
    /// How adversarial the environment is assumed to be.
    pub adversariality: StakesLevel,
    /// Monotone maximum of the four components above.
    pub stakes_level: StakesLevel,
}

impl Stakes {
    /// Computes the monotone-maximum stakes level from the four components.
    #[must_use]
    pub fn monotone_max(impact: StakesLevel, irreversibility: StakesLevel, uncertainty: StakesLevel, adversariality: StakesLevel) -> StakesLevel {
        [impact, irreversibility, uncertainty, adversariality].into_iter().max().unwrap_or(StakesLevel::Low)
    }

    /// Returns true when `stakes_level` matches the monotone maximum of the components (invariant §3.2.i).
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stakes_level == Self::monotone_max(self.impact, self.irreversibility, self.uncertainty, self.adversariality)
    }
}

/// Definition of done for a quality target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionOfDone {
    /// Free-text description of completion criteria.
    pub text: String,
    /// Discrete, checkable conditions.
    #[serde(default)]
    pub checks: Vec<String>,
}

/// Quality target for a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    /// Target quality tier.
    pub quality_tier: QualityTier,
    /// Whether the layer is satisficing rather than optimizing.
    pub satisficing_mode: bool,
    /// What "done" means for this packet's scope.
    pub definition_of_done: DefinitionOfDone,
    /// How strongly this packet's claims must be verified.
    pub verification_requirement: VerificationRequirement,
}

/// Risk budget within the broader budget envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    /// Named risk envelope (e.g. "low", "bounded").
    pub envelope: f64,
    /// Maximum acceptable loss under this envelope.
    pub max_loss: f64,
}

/// Resource budgets available for the episode at the time this packet was emitted.
///
/// # Invariants
/// - All fields are non-negative (invariant §3.2.iii).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budgets {
    /// Remaining token budget.
    pub token_budget: u64,
    /// Remaining tool-call budget.
    pub tool_call_budget: u64,
    /// Remaining wall-clock budget, in seconds.
    pub time_budget_seconds: u64,
    /// Remaining risk budget.
    pub risk_budget: RiskBudget,
}

impl Budgets {
    /// Returns true when every budget field is non-negative.
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        self.risk_budget.envelope >= 0.0 && self.risk_budget.max_loss >= 0.0
    }
}

/// Epistemic posture of a packet's claims.
///
/// # Invariants
/// - `confidence` must be in `[0, 1]` (invariant §3.2.iv).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epistemics {
    /// How the claim was arrived at.
    pub status: EpistemicStatus,
    /// Confidence in the claim, in `[0, 1]`.
    pub confidence: f64,
    /// Free-text calibration note.
    #[serde(default)]
    pub calibration_note: Option<String>,
    /// How quickly the claim is expected to go stale.
    pub freshness_class: FreshnessClass,
    /// Staleness threshold, in seconds, for evidence cited by this packet.
    pub stale_if_older_than_seconds: u64,
    /// Explicit assumptions underlying the claim.
    #[serde(default)]
    pub assumptions: Vec<String>,
}

/// A single citation backing a packet's claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Kind of reference (e.g. `tool_output`, `prior_packet`, `assertion`).
    pub ref_type: String,
    /// Identifier of the referenced artifact.
    pub ref_id: String,
    /// When the referenced artifact was produced.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Reliability score in `[0, 1]` assigned to the reference.
    pub reliability_score: f64,
}

/// Evidence backing a packet's claims.
///
/// # Invariants
/// - If `Epistemics::status == Observed` then `refs` must be non-empty,
///   or `evidence_absent_reason` must be set (invariant §3.2.ii).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Evidence {
    /// Citations backing this packet's claims.
    #[serde(default)]
    pub refs: Vec<EvidenceRef>,
    /// Reason evidence is absent, required when `refs` is empty and
    /// `Epistemics::status == Observed`.
    #[serde(default)]
    pub evidence_absent_reason: Option<String>,
}

/// Routing context attached to a packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// Coarse classification of the task this packet belongs to.
    pub task_class: String,
    /// Tool layer availability at emission time.
    pub tools_state: ToolsState,
}

/// The mandatory policy payload attached to every consequential packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mcp {
    /// What this packet is for.
    pub intent: Intent,
    /// Stakes of the claim or action.
    pub stakes: Stakes,
    /// Quality target.
    pub quality: Quality,
    /// Resource budgets in force.
    pub budgets: Budgets,
    /// Epistemic posture.
    pub epistemics: Epistemics,
    /// Evidence backing the packet's claims.
    #[serde(default)]
    pub evidence: Evidence,
    /// Routing context.
    pub routing: Routing,
}
