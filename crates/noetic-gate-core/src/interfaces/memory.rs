// noetic-gate-core/src/interfaces/memory.rs
// ============================================================================
// Module: Memory Traits (supplemental)
// Description: Query-by-tag/keyword/domain recall within a single episode.
// Purpose: Let the runner append accepted `BeliefUpdate` packets to a belief
//          store and a self-model store without depending on a concrete
//          backend (§3.6, §11); persistence backends remain out of scope (§1).
// Dependencies: crate::ids, crate::packet
// ============================================================================

//! ## Overview
//! The distilled spec is silent on long-lived recall across steps within an
//! episode; §11 supplements it with exactly what the original source this
//! spec was distilled from carries: a `belief_store` and a
//! `self_model_store`, both simple, non-learning, query-by-tag/keyword/domain
//! stores. Deliberately minimal — no consolidation, no summarization, no
//! cross-episode persistence. Both are in-memory, default-constructed per
//! orchestrator, and reached by the runner only through these traits.

use crate::ids::BeliefId;
use crate::ids::SelfModelEntryId;
use crate::packet::BeliefUpdatePayload;
use crate::vocabulary::LayerSource;

/// A single belief appended to the belief store on acceptance of a
/// `BeliefUpdate` packet.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefRecord {
    /// This record's identifier.
    pub belief_id: BeliefId,
    /// Layer that authored the underlying `BeliefUpdate`.
    pub source: LayerSource,
    /// Domain the belief concerns.
    pub domain: String,
    /// Tags describing the belief's topic.
    pub tags: Vec<String>,
    /// The belief's content.
    pub content: String,
    /// When the belief was recorded.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// A self-model entry: the agent's standing beliefs about its own
/// capabilities, state, or posture, distinguished from world beliefs only by
/// which store a `BeliefUpdate` is routed into (routing policy is a host
/// concern, not specified here).
#[derive(Debug, Clone, PartialEq)]
pub struct SelfModelEntry {
    /// This entry's identifier.
    pub entry_id: SelfModelEntryId,
    /// Layer that authored the underlying `BeliefUpdate`.
    pub source: LayerSource,
    /// Domain the entry concerns.
    pub domain: String,
    /// Tags describing the entry's topic.
    pub tags: Vec<String>,
    /// The entry's content.
    pub content: String,
    /// When the entry was recorded.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Non-learning, query-by-tag/keyword/domain store of beliefs about the world.
pub trait BeliefStore: Send + Sync {
    /// Appends a belief derived from an accepted `BeliefUpdate` packet.
    fn record(&mut self, source: LayerSource, payload: &BeliefUpdatePayload, recorded_at: chrono::DateTime<chrono::Utc>) -> BeliefId;

    /// Returns every belief tagged with `tag`.
    fn query_by_tag(&self, tag: &str) -> Vec<BeliefRecord>;

    /// Returns every belief in `domain`.
    fn query_by_domain(&self, domain: &str) -> Vec<BeliefRecord>;

    /// Returns every belief whose content contains `keyword` (case-insensitive).
    fn query_by_keyword(&self, keyword: &str) -> Vec<BeliefRecord>;
}

/// Non-learning, query-by-tag/keyword/domain store of the agent's self-model.
pub trait SelfModelStore: Send + Sync {
    /// Appends an entry derived from an accepted `BeliefUpdate` packet.
    fn record(&mut self, source: LayerSource, payload: &BeliefUpdatePayload, recorded_at: chrono::DateTime<chrono::Utc>) -> SelfModelEntryId;

    /// Returns every entry tagged with `tag`.
    fn query_by_tag(&self, tag: &str) -> Vec<SelfModelEntry>;

    /// Returns every entry in `domain`.
    fn query_by_domain(&self, domain: &str) -> Vec<SelfModelEntry>;
}
