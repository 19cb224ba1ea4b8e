// noetic-gate-core/src/validators/schema.rs
// ============================================================================
// Module: Schema Validator (Gate 1)
// Description: Structural and MCP-invariant checks on a single packet.
// Purpose: Reject malformed packets before they reach the FSM or invariant gates.
// Dependencies: crate::packet, crate::ids
// ============================================================================

//! ## Overview
//! Gate 1 checks what a packet *is*, independent of episode history beyond
//! timestamp monotonicity relative to `previous_packet_id`. Type and
//! enumeration-membership checks are enforced structurally by Rust's type
//! system at deserialization time; this module covers what the type system
//! cannot: the MCP invariants of §3.2 and tag agreement.

use crate::packet::Packet;
use crate::vocabulary::EpistemicStatus;

/// One schema-validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// `header.packet_type` does not match the payload's structural class (P1).
    TypeTagMismatch,
    /// `mcp.stakes.stakes_level` is not the monotone maximum of its components (invariant i).
    StakesLevelInconsistent,
    /// `epistemics.status == Observed` but no evidence refs and no absence reason (invariant ii).
    ObservedWithoutEvidence,
    /// A budget field is negative (invariant iii).
    NegativeBudget,
    /// `epistemics.confidence` is outside `[0, 1]` (invariant iv).
    ConfidenceOutOfRange,
    /// `created_at` does not strictly follow the previous packet in the chain.
    TimestampNotMonotonic,
}

/// Result of a Gate 1 check: either `ok`, or a set of `errors`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaValidation {
    /// Every failure found; empty means the packet passed.
    pub errors: Vec<SchemaError>,
}

impl SchemaValidation {
    /// Returns true when no errors were recorded.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a packet's structure and MCP invariants.
///
/// `previous_created_at` is the `created_at` timestamp of the packet
/// referenced by `header.previous_packet_id`, when resolvable from the
/// episode's history cache; timestamp monotonicity is skipped when `None`.
#[must_use]
pub fn validate_schema(packet: &Packet, previous_created_at: Option<chrono::DateTime<chrono::Utc>>) -> SchemaValidation {
    let mut errors = Vec::new();

    if !packet.type_tag_matches_payload() {
        errors.push(SchemaError::TypeTagMismatch);
    }

    if !packet.mcp.stakes.is_consistent() {
        errors.push(SchemaError::StakesLevelInconsistent);
    }

    if packet.mcp.epistemics.status == EpistemicStatus::Observed
        && packet.mcp.evidence.refs.is_empty()
        && packet.mcp.evidence.evidence_absent_reason.is_none()
    {
        errors.push(SchemaError::ObservedWithoutEvidence);
    }

    if !packet.mcp.budgets.is_non_negative() {
        errors.push(SchemaError::NegativeBudget);
    }

    if !(0.0..=1.0).contains(&packet.mcp.epistemics.confidence) {
        errors.push(SchemaError::ConfidenceOutOfRange);
    }

    if let Some(previous) = previous_created_at {
        if packet.header.created_at <= previous {
            errors.push(SchemaError::TimestampNotMonotonic);
        }
    }

    SchemaValidation {
        errors,
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
    use crate::packet::Evidence;
    use crate::packet::mcp::Budgets;
    use crate::packet::mcp::DefinitionOfDone;
    use crate::packet::mcp::Epistemics;
    use crate::packet::mcp::Intent;
    use crate::packet::mcp::Mcp;
    use crate::packet::mcp::Quality;
    use crate::packet::mcp::RiskBudget;
    use crate::packet::mcp::Routing;
    use crate::packet::mcp::Stakes;
    use crate::packet::payload::ObservationPayload;
    use crate::packet::{Packet, PacketHeader, Payload};
    use crate::vocabulary::FreshnessClass;
    use crate::vocabulary::LayerSource;
    use crate::vocabulary::PacketType;
    use crate::vocabulary::QualityTier;
    use crate::vocabulary::StakesLevel;
    use crate::vocabulary::ToolsState;
    use crate::vocabulary::VerificationRequirement;
    use crate::ids::CorrelationId;
    use crate::ids::PacketId;

    fn base_packet() -> Packet {
        Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::Observation,
                created_at: chrono::Utc::now(),
                layer_source: LayerSource::L6,
                correlation_id: CorrelationId::generate(),
                campaign_id: None,
                previous_packet_id: None,
            },
            mcp: Mcp {
                intent: Intent {
                    summary: "check disk usage".to_owned(),
                    scope: "host-1".to_owned(),
                },
                stakes: Stakes {
                    impact: StakesLevel::Low,
                    irreversibility: StakesLevel::Low,
                    uncertainty: StakesLevel::Low,
                    adversariality: StakesLevel::Low,
                    stakes_level: StakesLevel::Low,
                },
                quality: Quality {
                    quality_tier: QualityTier::Par,
                    satisficing_mode: false,
                    definition_of_done: DefinitionOfDone {
                        text: "disk usage reported".to_owned(),
                        checks: vec![],
                    },
                    verification_requirement: VerificationRequirement::Optional,
                },
                budgets: Budgets {
                    token_budget: 100,
                    tool_call_budget: 5,
                    time_budget_seconds: 60,
                    risk_budget: RiskBudget {
                        envelope: 1.0,
                        max_loss: 0.1,
                    },
                },
                epistemics: Epistemics {
                    status: EpistemicStatus::Observed,
                    confidence: 0.9,
                    calibration_note: None,
                    freshness_class: FreshnessClass::Realtime,
                    stale_if_older_than_seconds: 30,
                    assumptions: vec![],
                },
                evidence: Evidence {
                    refs: vec![crate::packet::EvidenceRef {
                        ref_type: "tool_output".to_owned(),
                        ref_id: "call-1".to_owned(),
                        timestamp: chrono::Utc::now(),
                        reliability_score: 1.0,
                    }],
                    evidence_absent_reason: None,
                },
                routing: Routing {
                    task_class: "diagnostics".to_owned(),
                    tools_state: ToolsState::ToolsOk,
                },
            },
            payload: Payload::Observation(ObservationPayload {
                subject: "host-1".to_owned(),
                content: serde_json::json!({"disk_used_pct": 42}),
            }),
        }
    }

    #[test]
    fn well_formed_packet_passes() {
        let validation = validate_schema(&base_packet(), None);
        assert!(validation.ok(), "{:?}", validation.errors);
    }

    #[test]
    fn observed_without_evidence_is_rejected() {
        let mut packet = base_packet();
        packet.mcp.evidence.refs.clear();
        let validation = validate_schema(&packet, None);
        assert!(validation.errors.contains(&SchemaError::ObservedWithoutEvidence));
    }

    #[test]
    fn inconsistent_stakes_level_is_rejected() {
        let mut packet = base_packet();
        packet.mcp.stakes.stakes_level = StakesLevel::Critical;
        let validation = validate_schema(&packet, None);
        assert!(validation.errors.contains(&SchemaError::StakesLevelInconsistent));
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let mut packet = base_packet();
        packet.mcp.epistemics.confidence = 1.5;
        let validation = validate_schema(&packet, None);
        assert!(validation.errors.contains(&SchemaError::ConfidenceOutOfRange));
    }

    #[test]
    fn non_monotonic_timestamp_is_rejected() {
        let packet = base_packet();
        let later = packet.header.created_at + chrono::Duration::seconds(5);
        let validation = validate_schema(&packet, Some(later));
        assert!(validation.errors.contains(&SchemaError::TimestampNotMonotonic));
    }
}
