// noetic-gate-core/src/validators/mod.rs
// ============================================================================
// Module: Validator Gates
// Description: The three-gate packet validation stack of §4.3.
// Purpose: Wire schema, FSM, and invariant checks together under one module.
// Dependencies: crate::packet, crate::vocabulary, crate::ledger
// ============================================================================

//! ## Overview
//! Every packet a layer emits passes through three gates in order: Gate 1
//! ([`schema`]) checks the packet in isolation, Gate 2 ([`fsm`]) checks the
//! transition it implies against the episode's current state, and Gate 3
//! ([`invariants`]) checks cross-policy rules against ledger state and
//! episode history. A packet must clear all three before the runner applies
//! it to the ledger and publishes it on a bus (§4.8).

pub mod fsm;
pub mod invariants;
pub mod schema;

pub use fsm::fsm_validate;
pub use fsm::IllegalTransition;
pub use invariants::invariant_validate;
pub use invariants::layer_may_emit;
pub use invariants::InvariantValidation;
pub use invariants::InvariantViolation;
pub use schema::validate_schema;
pub use schema::SchemaError;
pub use schema::SchemaValidation;
