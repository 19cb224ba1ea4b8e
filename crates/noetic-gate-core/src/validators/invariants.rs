// noetic-gate-core/src/validators/invariants.rs
// ============================================================================
// Module: Invariant Validator (Gate 3)
// Description: The six cross-policy rules gating packet propagation.
// Purpose: Catch violations that span packet, ledger, and episode history —
//          the checks Gate 1 and Gate 2 cannot see in isolation.
// Dependencies: ret-logic, crate::packet, crate::ledger, crate::vocabulary
// ============================================================================

//! ## Overview
//! Each rule below evaluates to a [`TriState`]: `True` (satisfied), `False`
//! (violated), or `Unknown` (insufficient history to decide). The six
//! results are folded with [`KleeneLogic`], so a single `Unknown` propagates
//! to the overall verdict and is treated as a rejection — fail-closed, per
//! the same posture the schema and FSM gates take on malformed input.

use ret_logic::KleeneLogic;
use ret_logic::TriLogic;
use ret_logic::TriState;

use crate::ledger::BudgetKind;
use crate::ledger::LedgerSnapshot;
use crate::packet::Packet;
use crate::packet::Payload;
use crate::vocabulary::DecisionOutcome;
use crate::vocabulary::EpistemicStatus;
use crate::vocabulary::LayerSource;
use crate::vocabulary::PacketType;
use crate::vocabulary::QualityTier;
use crate::vocabulary::StakesLevel;
use crate::vocabulary::ToolSafety;

/// One of the six cross-policy rules, per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Rule 1: a write-capable `TaskDirective` carries `SUBPAR` quality.
    SubparWrite,
    /// Rule 2: a high-stakes `Decision::Act` lacks a prior verification or escalation.
    MissingVerification,
    /// Rule 3: an `OBSERVED` claim lacks a fresh `tool_output` citation.
    UngroundedObservation,
    /// Rule 4: the packet's charge would exceed its budget with no approved overrun.
    BudgetOverrun,
    /// Rule 5: a write-capable `TaskDirective` lacks a valid authorization token.
    UnauthorizedWrite,
    /// Rule 6: the emitting layer is not whitelisted to emit this packet type.
    LayerContract,
}

/// The fixed per-layer emission whitelist of §4.7.
#[must_use]
pub fn layer_may_emit(layer: LayerSource, packet_type: PacketType) -> bool {
    match layer {
        LayerSource::Integrity => true,
        LayerSource::L1 => matches!(packet_type, PacketType::IntegrityAlert | PacketType::BeliefUpdate),
        LayerSource::L2 | LayerSource::L3 | LayerSource::L4 => matches!(packet_type, PacketType::BeliefUpdate),
        LayerSource::L5 => matches!(
            packet_type,
            PacketType::Decision
                | PacketType::VerificationPlan
                | PacketType::ToolAuthorizationToken
                | PacketType::TaskDirective
                | PacketType::Escalation
                | PacketType::BeliefUpdate
        ),
        LayerSource::L6 => matches!(packet_type, PacketType::Observation | PacketType::TaskResult | PacketType::BeliefUpdate),
    }
}

/// Result of a Gate 3 check: the combined verdict and each rule's individual result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantValidation {
    /// Combined verdict across all six rules, via strong Kleene AND.
    pub verdict: TriState,
    per_rule: [(InvariantViolation, TriState); 6],
}

impl InvariantValidation {
    /// Returns true when every rule evaluated to `True`.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.verdict.is_true()
    }

    /// Returns the rules that evaluated to anything other than `True`.
    #[must_use]
    pub fn violations(&self) -> Vec<InvariantViolation> {
        self.per_rule.iter().filter(|(_, state)| !state.is_true()).map(|(violation, _)| *violation).collect()
    }
}

fn rule_subpar_gate(packet: &Packet) -> TriState {
    let Payload::TaskDirective(directive) = &packet.payload else {
        return TriState::True;
    };
    let write_capable = matches!(directive.tool_safety, ToolSafety::Write | ToolSafety::Mixed);
    TriState::from(!(write_capable && packet.mcp.quality.quality_tier == QualityTier::Subpar))
}

fn rule_high_stakes_verification(packet: &Packet, history: &[Packet]) -> TriState {
    let Payload::Decision(decision) = &packet.payload else {
        return TriState::True;
    };
    let high_stakes = packet.mcp.stakes.stakes_level >= StakesLevel::High;
    if !(high_stakes && decision.outcome == DecisionOutcome::Act) {
        return TriState::True;
    }
    let covered = history.iter().any(|prior| match &prior.payload {
        Payload::VerificationPlan(plan) => plan.verification_target == decision.scope,
        Payload::Escalation(_) => true,
        _ => false,
    });
    TriState::from(covered)
}

fn rule_grounding(packet: &Packet) -> TriState {
    if packet.mcp.epistemics.status != EpistemicStatus::Observed {
        return TriState::True;
    }
    let threshold = chrono::Duration::seconds(i64::try_from(packet.mcp.epistemics.stale_if_older_than_seconds).unwrap_or(i64::MAX));
    let grounded = packet.mcp.evidence.refs.iter().any(|evidence_ref| {
        evidence_ref.ref_type == "tool_output" && packet.header.created_at.signed_duration_since(evidence_ref.timestamp) <= threshold
    });
    TriState::from(grounded)
}

fn rule_budget_ceiling(packet: &Packet, ledger: &LedgerSnapshot, history: &[Packet]) -> TriState {
    let Payload::TaskResult(result) = &packet.payload else {
        return TriState::True;
    };
    let charges = [(BudgetKind::Tokens, result.tokens_consumed), (BudgetKind::ToolCalls, result.tool_calls_consumed)];
    let has_escalation = history.iter().any(|prior| matches!(prior.payload, Payload::Escalation(_)));
    for (kind, amount) in charges {
        let counter = ledger.budgets.get(&kind).copied().unwrap_or_default();
        let would_overrun = counter.consumed.saturating_add(amount) > counter.allocated;
        if would_overrun && !has_escalation {
            return TriState::False;
        }
    }
    TriState::True
}

fn rule_write_authorization(packet: &Packet, ledger: &LedgerSnapshot) -> TriState {
    let Payload::TaskDirective(directive) = &packet.payload else {
        return TriState::True;
    };
    if !matches!(directive.tool_safety, ToolSafety::Write | ToolSafety::Mixed) {
        return TriState::True;
    }
    let Some(token_id) = &directive.authorization_token_id else {
        return TriState::False;
    };
    let Some(token) = ledger.tokens.get(token_id.as_str()) else {
        return TriState::False;
    };
    let valid_now = token.is_valid(packet.header.created_at);
    let scope_covers = directive.tool_name.starts_with(token.scope.as_str()) || token.scope == directive.tool_name;
    let authorized_issuer = matches!(token.issuer_layer, LayerSource::L5 | LayerSource::L1);
    TriState::from(valid_now && scope_covers && authorized_issuer)
}

fn rule_layer_contract(packet: &Packet) -> TriState {
    TriState::from(layer_may_emit(packet.header.layer_source, packet.payload.packet_type()))
}

/// Runs all six Gate 3 rules against `packet`, its ledger snapshot, and the
/// episode's prior packets in this correlation id.
#[must_use]
pub fn invariant_validate(packet: &Packet, ledger: &LedgerSnapshot, history: &[Packet]) -> InvariantValidation {
    let logic = KleeneLogic;
    let per_rule = [
        (InvariantViolation::SubparWrite, rule_subpar_gate(packet)),
        (InvariantViolation::MissingVerification, rule_high_stakes_verification(packet, history)),
        (InvariantViolation::UngroundedObservation, rule_grounding(packet)),
        (InvariantViolation::BudgetOverrun, rule_budget_ceiling(packet, ledger, history)),
        (InvariantViolation::UnauthorizedWrite, rule_write_authorization(packet, ledger)),
        (InvariantViolation::LayerContract, rule_layer_contract(packet)),
    ];
    let verdict = per_rule.iter().fold(TriState::True, |acc, (_, state)| logic.and(acc, *state));
    InvariantValidation {
        verdict,
        per_rule,
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
    use crate::ids::CorrelationId;
    use crate::ids::PacketId;
    use crate::ids::TaskId;
    use crate::ids::TokenId;
    use crate::ledger::ActiveToken;
    use crate::packet::mcp::Budgets;
    use crate::packet::mcp::DefinitionOfDone;
    use crate::packet::mcp::Epistemics;
    use crate::packet::mcp::Evidence;
    use crate::packet::mcp::EvidenceRef;
    use crate::packet::mcp::Intent;
    use crate::packet::mcp::Mcp;
    use crate::packet::mcp::Quality;
    use crate::packet::mcp::RiskBudget;
    use crate::packet::mcp::Routing;
    use crate::packet::mcp::Stakes;
    use crate::packet::payload::TaskDirectivePayload;
    use crate::packet::PacketHeader;
    use crate::vocabulary::FreshnessClass;
    use crate::vocabulary::ToolsState;
    use crate::vocabulary::VerificationRequirement;

    fn empty_ledger() -> LedgerSnapshot {
        LedgerSnapshot {
            budgets: std::collections::BTreeMap::new(),
            tokens: std::collections::BTreeMap::new(),
            open_directives: std::collections::BTreeMap::new(),
        }
    }

    fn directive_packet(tier: QualityTier, tool_safety: ToolSafety, authorization_token_id: Option<TokenId>) -> Packet {
        let now = chrono::Utc::now();
        Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::TaskDirective,
                created_at: now,
                layer_source: LayerSource::L5,
                correlation_id: CorrelationId::generate(),
                campaign_id: None,
                previous_packet_id: None,
            },
            mcp: Mcp {
                intent: Intent {
                    summary: "restart service".to_owned(),
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
                    quality_tier: tier,
                    satisficing_mode: false,
                    definition_of_done: DefinitionOfDone {
                        text: "service restarted".to_owned(),
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
                    status: EpistemicStatus::Derived,
                    confidence: 0.9,
                    calibration_note: None,
                    freshness_class: FreshnessClass::Operational,
                    stale_if_older_than_seconds: 30,
                    assumptions: vec![],
                },
                evidence: Evidence::default(),
                routing: Routing {
                    task_class: "remediation".to_owned(),
                    tools_state: ToolsState::ToolsOk,
                },
            },
            payload: Payload::TaskDirective(TaskDirectivePayload {
                task_id: TaskId::new("task-1"),
                tool_safety,
                tool_name: "restart_service".to_owned(),
                params: serde_json::json!({}),
                authorization_token_id,
            }),
        }
    }

    #[test]
    fn subpar_write_directive_is_rejected() {
        let packet = directive_packet(QualityTier::Subpar, ToolSafety::Write, None);
        let validation = invariant_validate(&packet, &LedgerSnapshot::default_for_test(), &[]);
        assert!(validation.violations().contains(&InvariantViolation::SubparWrite));
    }

    #[test]
    fn write_without_token_is_rejected() {
        let packet = directive_packet(QualityTier::Par, ToolSafety::Write, None);
        let validation = invariant_validate(&packet, &LedgerSnapshot::default_for_test(), &[]);
        assert!(validation.violations().contains(&InvariantViolation::UnauthorizedWrite));
    }

    #[test]
    fn write_with_valid_token_passes_rule_five() {
        let now = chrono::Utc::now();
        let token_id = TokenId::generate();
        let mut ledger = LedgerSnapshot::default_for_test();
        ledger.tokens.insert(
            token_id.to_string(),
            ActiveToken {
                token_id: token_id.clone(),
                scope: "restart_service".to_owned(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(60),
                max_uses: 1,
                uses_remaining: 1,
                issuer_layer: LayerSource::L5,
                revoked: false,
            },
        );
        let packet = directive_packet(QualityTier::Par, ToolSafety::Write, Some(token_id));
        let validation = invariant_validate(&packet, &ledger, &[]);
        assert!(!validation.violations().contains(&InvariantViolation::UnauthorizedWrite));
    }

    #[test]
    fn layer_whitelist_rejects_l6_decision() {
        let mut packet = directive_packet(QualityTier::Par, ToolSafety::Read, None);
        packet.header.layer_source = LayerSource::L6;
        let validation = invariant_validate(&packet, &LedgerSnapshot::default_for_test(), &[]);
        assert!(validation.violations().contains(&InvariantViolation::LayerContract));
    }

    #[test]
    fn grounding_requires_fresh_tool_output_citation() {
        let mut packet = directive_packet(QualityTier::Par, ToolSafety::Read, None);
        packet.mcp.epistemics.status = EpistemicStatus::Observed;
        packet.mcp.evidence.refs.push(EvidenceRef {
            ref_type: "assertion".to_owned(),
            ref_id: "x".to_owned(),
            timestamp: packet.header.created_at,
            reliability_score: 0.5,
        });
        let validation = invariant_validate(&packet, &LedgerSnapshot::default_for_test(), &[]);
        assert!(validation.violations().contains(&InvariantViolation::UngroundedObservation));
    }
}
