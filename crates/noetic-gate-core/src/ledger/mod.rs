// noetic-gate-core/src/ledger/mod.rs
// ============================================================================
// Module: Ledger
// Description: Per-episode accounting of budgets, write-authorization tokens,
//              and open directives.
// Purpose: Give Gate 3 and the runner a single, serialized source of truth
//          for what an episode has spent and is currently authorized to do.
// Dependencies: serde, chrono, crate::ids, crate::time
// ============================================================================

//! ## Overview
//! The ledger is per-episode mutable state, mutated only by the runner
//! thread for that episode (§5). `consume` returning `over_budget` never
//! mutates state; token `uses_remaining` and budget `consumed` counters are
//! both monotone (§3.4 invariants).

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::ids::TaskId;
use crate::ids::TokenId;
use crate::vocabulary::LayerSource;

/// The four budget dimensions tracked per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    /// LLM token consumption.
    Tokens,
    /// Tool invocation count.
    ToolCalls,
    /// Wall-clock seconds.
    WallTimeSeconds,
    /// Abstract risk units.
    Risk,
}

/// Allocated and consumed counters for one budget dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BudgetCounter {
    /// Total allocated at episode start (or raised by an approved escalation).
    pub allocated: u64,
    /// Consumed so far. Monotone non-decreasing.
    pub consumed: u64,
}

impl BudgetCounter {
    /// Remaining budget, saturating at zero.
    #[must_use]
    pub const fn remaining(self) -> u64 {
        self.allocated.saturating_sub(self.consumed)
    }
}

/// An active write-authorization token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveToken {
    /// This token's identifier.
    pub token_id: TokenId,
    /// Scope this token authorizes.
    pub scope: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// Maximum number of uses.
    pub max_uses: u32,
    /// Uses remaining. Monotone non-increasing.
    pub uses_remaining: u32,
    /// Layer that issued the token.
    pub issuer_layer: LayerSource,
    /// Whether the token has been explicitly revoked.
    pub revoked: bool,
}

impl ActiveToken {
    /// Returns true when `now < expires_at AND uses_remaining > 0 AND not revoked`.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at && self.uses_remaining > 0
    }
}

/// A directive awaiting its matching `TaskResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDirective {
    /// Identifier of the packet that opened this directive.
    pub directive_packet_id: String,
    /// When the directive was opened.
    pub issued_at: DateTime<Utc>,
    /// When the directive times out if unresolved.
    pub timeout_at: DateTime<Utc>,
}

/// Outcome of a `consume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The amount was within budget and has been charged.
    Ok,
    /// The amount would exceed the allocated budget; nothing was charged.
    OverBudget,
}

/// Outcome of a `use_token` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseTokenOutcome {
    /// The token was valid and a use was consumed.
    Ok,
    /// No token with this id exists.
    Invalid,
    /// The token has no uses remaining.
    Exhausted,
    /// The token's expiry has passed.
    Expired,
}

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// `open_directive` was called for a `task_id` that is already open.
    #[error("directive already open for task {0}")]
    DuplicateDirective(String),
}

/// Read-only view of the ledger at a point in time, handed to validators and
/// to `assemble_input` for `LayerInput::ledger_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LedgerSnapshot {
    /// Budget counters by dimension.
    pub budgets: BTreeMap<BudgetKind, BudgetCounter>,
    /// Active tokens by id.
    pub tokens: BTreeMap<String, ActiveToken>,
    /// Open directives by task id.
    pub open_directives: BTreeMap<String, OpenDirective>,
}

impl LedgerSnapshot {
    /// Returns an empty snapshot, for use as a fixture in validator tests.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self::default()
    }
}

/// Per-episode mutable accounting of budgets, issued write-authorizations,
/// and open directives.
#[derive(Debug, Clone)]
pub struct Ledger {
    budgets: BTreeMap<BudgetKind, BudgetCounter>,
    tokens: BTreeMap<String, ActiveToken>,
    open_directives: BTreeMap<String, OpenDirective>,
    approved_overruns: BTreeMap<BudgetKind, u64>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            budgets: BTreeMap::new(),
            tokens: BTreeMap::new(),
            open_directives: BTreeMap::new(),
            approved_overruns: BTreeMap::new(),
        }
    }

    /// Allocates (or raises) budgets for the listed dimensions.
    pub fn allocate(&mut self, allocations: &[(BudgetKind, u64)]) {
        for (kind, amount) in allocations {
            self.budgets.entry(*kind).or_default().allocated += amount;
        }
    }

    /// Charges `amount` against `kind`. Returns [`ConsumeOutcome::OverBudget`]
    /// without mutating state if the charge would exceed the allocation and
    /// no matching approved-overrun escalation covers it.
    pub fn consume(&mut self, kind: BudgetKind, amount: u64) -> ConsumeOutcome {
        let counter = self.budgets.entry(kind).or_default();
        let projected = counter.consumed.saturating_add(amount);
        let headroom = counter.allocated.saturating_add(*self.approved_overruns.get(&kind).unwrap_or(&0));
        if projected > headroom {
            return ConsumeOutcome::OverBudget;
        }
        counter.consumed = projected;
        ConsumeOutcome::Ok
    }

    /// Records an approved escalation that raises the effective ceiling for
    /// `kind` by `extra`, without retroactively changing `allocated`.
    pub fn approve_overrun(&mut self, kind: BudgetKind, extra: u64) {
        *self.approved_overruns.entry(kind).or_insert(0) += extra;
    }

    /// Issues a new write-authorization token.
    pub fn issue_token(&mut self, scope: impl Into<String>, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>, max_uses: u32, issuer_layer: LayerSource) -> TokenId {
        let token_id = TokenId::generate();
        self.tokens.insert(
            token_id.to_string(),
            ActiveToken {
                token_id: token_id.clone(),
                scope: scope.into(),
                issued_at,
                expires_at,
                max_uses,
                uses_remaining: max_uses,
                issuer_layer,
                revoked: false,
            },
        );
        token_id
    }

    /// Attempts to consume one use from the named token.
    pub fn use_token(&mut self, token_id: &TokenId, now: DateTime<Utc>) -> UseTokenOutcome {
        let Some(token) = self.tokens.get_mut(token_id.as_str()) else {
            return UseTokenOutcome::Invalid;
        };
        if token.revoked {
            return UseTokenOutcome::Invalid;
        }
        if now >= token.expires_at {
            return UseTokenOutcome::Expired;
        }
        if token.uses_remaining == 0 {
            return UseTokenOutcome::Exhausted;
        }
        token.uses_remaining -= 1;
        UseTokenOutcome::Ok
    }

    /// Revokes a token, regardless of remaining uses.
    pub fn revoke_token(&mut self, token_id: &TokenId) {
        if let Some(token) = self.tokens.get_mut(token_id.as_str()) {
            token.revoked = true;
        }
    }

    /// Registers a token constructed elsewhere under its own id, rather than
    /// minting a fresh one via `issue_token`. Used by the runner when an
    /// accepted `ToolAuthorizationToken` packet already names the id the
    /// issuing layer expects later directives to cite.
    pub fn register_token(&mut self, token: ActiveToken) {
        self.tokens.insert(token.token_id.to_string(), token);
    }

    /// Looks up a token by id.
    #[must_use]
    pub fn token(&self, token_id: &TokenId) -> Option<&ActiveToken> {
        self.tokens.get(token_id.as_str())
    }

    /// Opens a directive for `task_id`.
    ///
    /// # Errors
    /// Returns [`LedgerError::DuplicateDirective`] if a directive is already
    /// open for this `task_id`.
    pub fn open_directive(&mut self, task_id: &TaskId, directive_packet_id: impl Into<String>, issued_at: DateTime<Utc>, timeout_at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.open_directives.contains_key(task_id.as_str()) {
            return Err(LedgerError::DuplicateDirective(task_id.to_string()));
        }
        self.open_directives.insert(
            task_id.to_string(),
            OpenDirective {
                directive_packet_id: directive_packet_id.into(),
                issued_at,
                timeout_at,
            },
        );
        Ok(())
    }

    /// Closes the directive for `task_id`, if open. Returns whether one was closed.
    pub fn close_directive(&mut self, task_id: &TaskId) -> bool {
        self.open_directives.remove(task_id.as_str()).is_some()
    }

    /// Returns whether a directive is currently open for `task_id`.
    #[must_use]
    pub fn has_open_directive(&self, task_id: &TaskId) -> bool {
        self.open_directives.contains_key(task_id.as_str())
    }

    /// Takes a read-only snapshot of the current ledger state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            budgets: self.budgets.clone(),
            tokens: self.tokens.clone(),
            open_directives: self.open_directives.clone(),
        }
    }
}

impl Default for Ledger {
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

    #[test]
    fn budget_of_zero_rejects_first_charge() {
        let mut ledger = Ledger::new();
        ledger.allocate(&[(BudgetKind::Tokens, 0)]);
        assert_eq!(ledger.consume(BudgetKind::Tokens, 1), ConsumeOutcome::OverBudget);
    }

    #[test]
    fn consume_does_not_mutate_on_over_budget() {
        let mut ledger = Ledger::new();
        ledger.allocate(&[(BudgetKind::Tokens, 10)]);
        assert_eq!(ledger.consume(BudgetKind::Tokens, 100), ConsumeOutcome::OverBudget);
        assert_eq!(ledger.snapshot().budgets[&BudgetKind::Tokens].consumed, 0);
    }

    #[test]
    fn token_max_uses_one_exhausts_on_second_use() {
        let mut ledger = Ledger::new();
        let now = Utc::now();
        let token_id = ledger.issue_token("write:file", now, now + chrono::Duration::seconds(60), 1, LayerSource::L5);
        assert_eq!(ledger.use_token(&token_id, now), UseTokenOutcome::Ok);
        assert_eq!(ledger.use_token(&token_id, now), UseTokenOutcome::Exhausted);
    }

    #[test]
    fn duplicate_directive_is_rejected() {
        let mut ledger = Ledger::new();
        let now = Utc::now();
        let task_id = TaskId::new("task-1");
        ledger.open_directive(&task_id, "pkt-1", now, now + chrono::Duration::seconds(60)).unwrap();
        let err = ledger.open_directive(&task_id, "pkt-2", now, now + chrono::Duration::seconds(60)).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateDirective(_)));
    }
}
