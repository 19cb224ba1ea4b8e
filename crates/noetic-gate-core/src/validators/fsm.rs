// noetic-gate-core/src/validators/fsm.rs
// ============================================================================
// Module: FSM Validator (Gate 2)
// Description: Legal-transition table for the per-episode finite state machine.
// Purpose: Reject packets whose implied FSM transition is not in the fixed
//          table of §4.2.
// Dependencies: crate::vocabulary
// ============================================================================

//! ## Overview
//! Gate 2 checks what a packet *does to episode state*: every packet type
//! implies a target [`FsmState`] (`PacketType::implied_fsm_state`); Gate 2
//! checks the episode's current state is allowed to transition there. A
//! `Safemode` transition is legal from any state, modeling the supervisory
//! principal's ability to halt an episode regardless of its current step.

use crate::vocabulary::FsmState;
use crate::vocabulary::PacketType;

/// The fixed table of legal `(from, to)` transitions, per §4.2.
///
/// `Safemode` is reachable from every state and is checked separately in
/// [`fsm_validate`] rather than enumerated here.
const LEGAL_TRANSITIONS: &[(FsmState, FsmState)] = &[
    (FsmState::Idle, FsmState::Perceive),
    (FsmState::Idle, FsmState::Orient),
    (FsmState::Idle, FsmState::Escalate),
    (FsmState::Perceive, FsmState::Orient),
    (FsmState::Orient, FsmState::Decide),
    (FsmState::Decide, FsmState::Verify),
    (FsmState::Decide, FsmState::Authorize),
    (FsmState::Decide, FsmState::Execute),
    (FsmState::Decide, FsmState::Escalate),
    (FsmState::Decide, FsmState::Complete),
    (FsmState::Verify, FsmState::Decide),
    (FsmState::Authorize, FsmState::Execute),
    (FsmState::Execute, FsmState::Report),
    (FsmState::Report, FsmState::Idle),
    (FsmState::Report, FsmState::Orient),
    (FsmState::Report, FsmState::Complete),
    (FsmState::Escalate, FsmState::Idle),
    (FsmState::Escalate, FsmState::Complete),
    (FsmState::Escalate, FsmState::Decide),
];

/// A Gate 2 failure: the packet's implied transition is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    /// Episode state before this packet.
    pub from: FsmState,
    /// State the packet's type implies.
    pub to: FsmState,
}

/// Checks whether the transition implied by `packet_type`, from `current`, is legal.
///
/// # Errors
/// Returns [`IllegalTransition`] when `(current, implied)` is absent from
/// [`LEGAL_TRANSITIONS`] and `implied` is not `Safemode`.
pub fn fsm_validate(current: FsmState, packet_type: PacketType) -> Result<FsmState, IllegalTransition> {
    let implied = packet_type.implied_fsm_state();
    if implied == FsmState::Safemode || LEGAL_TRANSITIONS.contains(&(current, implied)) {
        Ok(implied)
    } else {
        Err(IllegalTransition {
            from: current,
            to: implied,
        })
    }
}
