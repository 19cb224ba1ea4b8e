// noetic-gate-core/src/bus.rs
// ============================================================================
// Module: Directional Buses
// Description: Northbound/southbound packet fan-out between layers.
// Purpose: Route accepted packets to subscribed layer handlers under the
//          layer-order direction rule (§4.6), without halting on a single
//          handler's failure.
// Dependencies: crate::packet, crate::vocabulary, crate::interfaces::metrics
// ============================================================================

//! ## Overview
//! Two directional channels share one [`Bus`] implementation, distinguished
//! only by [`Direction`]. Each bus maintains a subscriber table keyed by
//! [`LayerSource`]; `publish` fans a [`BusMessage`] out to every subscriber
//! the direction rule admits, or to a single targeted recipient if the
//! message names one. A handler failure is recorded as a [`DeliveryFailure`]
//! and does not stop fan-out to the remaining subscribers (§4.6).
//!
//! The subscriber table is a `RwLock`, so `publish` and `subscribe` may be
//! called concurrently across episodes that each own a disjoint bus
//! instance (§5) — sharing one [`Bus`] across episodes is not a supported
//! usage, but the table itself tolerates it.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Instant;

use crate::interfaces::BusEvent;
use crate::interfaces::BusMetrics;
use crate::packet::Packet;
use crate::vocabulary::LayerSource;

/// Which direction a bus carries traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Delivers when `order(target) < order(source)`; `INTEGRITY` always receives.
    Northbound,
    /// Delivers when `order(target) > order(source)`; `INTEGRITY` may send to any.
    Southbound,
}

impl Direction {
    /// Returns whether a message from `source`, optionally targeted at
    /// `target_layer`, should be delivered to `candidate`.
    #[must_use]
    fn admits(self, source: LayerSource, candidate: LayerSource) -> bool {
        match self {
            Self::Northbound => candidate == LayerSource::Integrity || candidate.order() < source.order(),
            Self::Southbound => source == LayerSource::Integrity || candidate.order() > source.order(),
        }
    }
}

/// A packet in flight on a bus, optionally restricted to a single recipient.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The packet being routed.
    pub packet: Packet,
    /// When set, only this layer's handler runs (still gated by direction).
    pub target_layer: Option<LayerSource>,
}

/// A single subscriber handler failure recorded during fan-out.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// Subscriber whose handler failed.
    pub layer: LayerSource,
    /// The handler's own error message.
    pub exception: String,
    /// When the failure occurred.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Outcome of a single `publish` call: who received the message and who failed.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Layers the message was successfully delivered to.
    pub delivered_to: Vec<LayerSource>,
    /// Failures recorded during fan-out.
    pub failures: Vec<DeliveryFailure>,
}

type Handler = Box<dyn Fn(&Packet) -> Result<(), String> + Send + Sync>;

/// A single directional bus: a subscriber table plus the direction rule.
pub struct Bus {
    direction: Direction,
    subscribers: RwLock<BTreeMap<LayerSource, Vec<Handler>>>,
}

impl Bus {
    /// Creates an empty bus for the given direction.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            subscribers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a handler to run whenever `layer` is an admissible recipient.
    ///
    /// # Panics
    /// Panics if the internal subscriber lock is poisoned by a prior panic
    /// in another thread's handler.
    pub fn subscribe<F>(&self, layer: LayerSource, handler: F)
    where
        F: Fn(&Packet) -> Result<(), String> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.entry(layer).or_default().push(Box::new(handler));
    }

    /// Fans `message` out to every subscriber the direction rule admits,
    /// recording (not propagating) individual handler failures.
    ///
    /// # Panics
    /// Panics if the internal subscriber lock is poisoned by a prior panic
    /// in another thread's handler.
    pub fn publish(&self, message: &BusMessage, metrics: &dyn BusMetrics) -> PublishReport {
        let started = Instant::now();
        let source = message.packet.header.layer_source;
        let subscribers = self.subscribers.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut report = PublishReport::default();

        for (&layer, handlers) in subscribers.iter() {
            if !self.direction.admits(source, layer) {
                continue;
            }
            if let Some(target) = message.target_layer {
                if target != layer {
                    continue;
                }
            }
            let mut layer_delivered = false;
            for handler in handlers {
                match handler(&message.packet) {
                    Ok(()) => layer_delivered = true,
                    Err(exception) => {
                        metrics.record_event(BusEvent::HandlerFailed);
                        report.failures.push(DeliveryFailure {
                            layer,
                            exception,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }
            if layer_delivered {
                report.delivered_to.push(layer);
            }
        }

        if report.delivered_to.is_empty() {
            metrics.record_event(BusEvent::Filtered);
        } else {
            metrics.record_event(BusEvent::Delivered);
        }
        metrics.record_latency("publish", started.elapsed());
        report
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

    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::ids::CorrelationId;
    use crate::ids::PacketId;
    use crate::interfaces::NoopMetrics;
    use crate::packet::mcp::Budgets;
    use crate::packet::mcp::DefinitionOfDone;
    use crate::packet::mcp::Epistemics;
    use crate::packet::mcp::Evidence;
    use crate::packet::mcp::Intent;
    use crate::packet::mcp::Mcp;
    use crate::packet::mcp::Quality;
    use crate::packet::mcp::RiskBudget;
    use crate::packet::mcp::Routing;
    use crate::packet::mcp::Stakes;
    use crate::packet::BeliefUpdatePayload;
    use crate::packet::Payload;
    use crate::packet::PacketHeader;
    use crate::vocabulary::EpistemicStatus;
    use crate::vocabulary::FreshnessClass;
    use crate::vocabulary::PacketType;
    use crate::vocabulary::QualityTier;
    use crate::vocabulary::StakesLevel;
    use crate::vocabulary::ToolsState;
    use crate::vocabulary::VerificationRequirement;

    fn packet_from(source: LayerSource) -> Packet {
        let now = chrono::Utc::now();
        Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::BeliefUpdate,
                created_at: now,
                layer_source: source,
                correlation_id: CorrelationId::generate(),
                campaign_id: None,
                previous_packet_id: None,
            },
            mcp: Mcp {
                intent: Intent {
                    summary: "test".to_owned(),
                    scope: "test".to_owned(),
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
                        text: "n/a".to_owned(),
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
                    task_class: "test".to_owned(),
                    tools_state: ToolsState::ToolsOk,
                },
            },
            payload: Payload::BeliefUpdate(BeliefUpdatePayload {
                domain: "test".to_owned(),
                tags: vec![],
                content: "test".to_owned(),
            }),
        }
    }

    #[test]
    fn northbound_delivers_only_to_higher_order_layers() {
        let bus = Bus::new(Direction::Northbound);
        let l1_hits = Arc::new(AtomicUsize::new(0));
        let l5_hits = Arc::new(AtomicUsize::new(0));
        let l1_counter = Arc::clone(&l1_hits);
        let l5_counter = Arc::clone(&l5_hits);
        bus.subscribe(LayerSource::L1, move |_| {
            l1_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        bus.subscribe(LayerSource::L5, move |_| {
            l5_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let message = BusMessage {
            packet: packet_from(LayerSource::L3),
            target_layer: None,
        };
        let report = bus.publish(&message, &NoopMetrics);

        assert_eq!(l1_hits.load(Ordering::SeqCst), 1);
        assert_eq!(l5_hits.load(Ordering::SeqCst), 0);
        assert_eq!(report.delivered_to, vec![LayerSource::L1]);
    }

    #[test]
    fn integrity_always_receives() {
        let bus = Bus::new(Direction::Northbound);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.subscribe(LayerSource::Integrity, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let message = BusMessage {
            packet: packet_from(LayerSource::L1),
            target_layer: None,
        };
        bus.publish(&message, &NoopMetrics);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn integrity_does_not_universally_receive_southbound() {
        let bus = Bus::new(Direction::Southbound);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.subscribe(LayerSource::Integrity, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let message = BusMessage {
            packet: packet_from(LayerSource::L3),
            target_layer: None,
        };
        bus.publish(&message, &NoopMetrics);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn targeted_message_bypasses_broadcast() {
        let bus = Bus::new(Direction::Northbound);
        let l1_hits = Arc::new(AtomicUsize::new(0));
        let l2_hits = Arc::new(AtomicUsize::new(0));
        let l1_counter = Arc::clone(&l1_hits);
        let l2_counter = Arc::clone(&l2_hits);
        bus.subscribe(LayerSource::L1, move |_| {
            l1_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        bus.subscribe(LayerSource::L2, move |_| {
            l2_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let message = BusMessage {
            packet: packet_from(LayerSource::L4),
            target_layer: Some(LayerSource::L2),
        };
        bus.publish(&message, &NoopMetrics);
        assert_eq!(l1_hits.load(Ordering::SeqCst), 0);
        assert_eq!(l2_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_failure_is_recorded_and_does_not_halt_fanout() {
        let bus = Bus::new(Direction::Northbound);
        bus.subscribe(LayerSource::L1, |_| Err("boom".to_owned()));
        bus.subscribe(LayerSource::Integrity, |_| Ok(()));
        let message = BusMessage {
            packet: packet_from(LayerSource::L3),
            target_layer: None,
        };
        let report = bus.publish(&message, &NoopMetrics);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].layer, LayerSource::L1);
        assert!(report.delivered_to.contains(&LayerSource::Integrity));
    }
}
