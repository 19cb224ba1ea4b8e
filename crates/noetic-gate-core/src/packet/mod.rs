// noetic-gate-core/src/packet/mod.rs
// ============================================================================
// Module: Packet Schema
// Description: The typed message format every layer emits.
// Purpose: Tie header, MCP envelope, and payload into the wire-format `Packet`.
// Dependencies: serde, chrono
// ============================================================================

//! ## Overview
//! Every packet is `(header, mcp, payload)`. Packets are value objects: once
//! constructed and accepted by the gates, they are never mutated — the bus
//! retains an immutable copy and the runner's history log is the
//! authoritative record (§9 Design Notes).

pub mod mcp;
pub mod payload;

pub use mcp::Budgets;
pub use mcp::DefinitionOfDone;
pub use mcp::Epistemics;
pub use mcp::Evidence;
pub use mcp::EvidenceRef;
pub use mcp::Intent;
pub use mcp::Mcp;
pub use mcp::Quality;
pub use mcp::RiskBudget;
pub use mcp::Routing;
pub use mcp::Stakes;
pub use payload::AlertSeverity;
pub use payload::BeliefUpdatePayload;
pub use payload::DecisionPayload;
pub use payload::EscalationPayload;
pub use payload::IntegrityAlertPayload;
pub use payload::ObservationPayload;
pub use payload::Payload;
pub use payload::TaskDirectivePayload;
pub use payload::TaskResultPayload;
pub use payload::ToolAuthorizationTokenPayload;
pub use payload::VerificationPlanPayload;

use serde::Deserialize;
use serde::Serialize;

use crate::ids::CampaignId;
use crate::ids::CorrelationId;
use crate::ids::PacketId;
use crate::vocabulary::LayerSource;
use crate::vocabulary::PacketType;

/// Packet header: identity, provenance, and sequencing.
///
/// # Invariants
/// - `layer_source` must match the layer that actually emitted the packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Unique identifier of this packet.
    pub packet_id: PacketId,
    /// Packet-type tag; must equal the payload's structural class (invariant P1).
    pub packet_type: PacketType,
    /// When this packet was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Layer that emitted this packet.
    pub layer_source: LayerSource,
    /// Episode this packet belongs to.
    pub correlation_id: CorrelationId,
    /// Optional macro-grouping identifier.
    #[serde(default)]
    pub campaign_id: Option<CampaignId>,
    /// Previous packet in this episode's total order, chaining the sequence.
    #[serde(default)]
    pub previous_packet_id: Option<PacketId>,
}

/// A fully assembled packet: header, mandatory MCP envelope, and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Identity, provenance, and sequencing.
    pub header: PacketHeader,
    /// Mandatory policy envelope.
    pub mcp: Mcp,
    /// Typed payload, tagged on `header.packet_type`.
    pub payload: Payload,
}

impl Packet {
    /// Returns true when the header's type tag agrees with the payload's
    /// structural class (invariant P1, §8).
    #[must_use]
    pub fn type_tag_matches_payload(&self) -> bool {
        self.header.packet_type == self.payload.packet_type()
    }
}
