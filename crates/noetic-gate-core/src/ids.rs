// noetic-gate-core/src/ids.rs
// ============================================================================
// Module: Noetic Gate Identifiers
// Description: Newtype identifiers for packets, episodes, templates, and ledger entities.
// Purpose: Keep identifier domains distinct at the type level while staying
//          transparent on the wire.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every identifier in the core is a `#[serde(transparent)]` newtype over
//! `String` so that mixing up a `TaskId` and a `TokenId` is a compile error
//! rather than a runtime bug. Identifiers that the wire format requires in
//! canonical UUID form (`PacketId`, `CorrelationId`, `TokenId`) offer a
//! `generate()` constructor backed by UUID v4.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Declares a transparent string newtype identifier with the common
/// constructor and conversion surface.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

/// Declares a transparent string newtype identifier that also offers a
/// canonical UUID v4 `generate()` constructor.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        string_id!($(#[$meta])* $name);

        impl $name {
            /// Generates a fresh identifier as a canonical 8-4-4-4-12 UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::generate()
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a single packet.
    PacketId
);

uuid_id!(
    /// Identifier grouping all packets of one episode.
    CorrelationId
);

uuid_id!(
    /// Identifier of a write-authorization token issued by the ledger.
    TokenId
);

string_id!(
    /// Optional macro identifier grouping many episodes under one mission.
    CampaignId
);

string_id!(
    /// Identifier of a declarative episode template.
    TemplateId
);

string_id!(
    /// Identifier of a step within a template's DAG.
    StepId
);

string_id!(
    /// Identifier correlating a `TaskDirective` with its `TaskResult`.
    TaskId
);

string_id!(
    /// Identifier of a belief record in the belief store.
    BeliefId
);

string_id!(
    /// Identifier of a self-model entry in the self-model store.
    SelfModelEntryId
);
