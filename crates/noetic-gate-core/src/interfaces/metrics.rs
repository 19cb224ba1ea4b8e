// noetic-gate-core/src/interfaces/metrics.rs
// ============================================================================
// Module: Telemetry Seam
// Description: Trait-based metrics hooks for the runner and buses.
// Purpose: Let a host observe episode execution without the core depending
//          on any concrete telemetry sink (§10.1); sinks are out of scope (§1).
// Dependencies: none
// ============================================================================

//! ## Overview
//! Telemetry configuration and sinks are out of scope (§1). What stays in
//! scope is the seam: a small `Copy` event enum per crate boundary and a
//! `*Metrics` trait with `record_event`/`record_latency`, so call sites stay
//! allocation-free and a host may wire in whatever sink it likes. Hosts that
//! supply nothing get [`NoopMetrics`].

use std::time::Duration;

/// A notable event in the runner's step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerEvent {
    /// A step began executing.
    StepStarted,
    /// A step's emitted packet passed all three gates and was accepted.
    PacketAccepted,
    /// A step's emitted packet was rejected by a gate.
    PacketRejected,
    /// The episode transitioned to `SAFEMODE`.
    EnteredSafemode,
    /// The episode reached a terminal `COMPLETE` state.
    EpisodeCompleted,
    /// The episode was cancelled externally.
    EpisodeCancelled,
}

/// A notable event on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// A message was published and delivered to at least one subscriber.
    Delivered,
    /// A message was published but the routing rule admitted no recipients.
    Filtered,
    /// A subscriber handler failed during fan-out.
    HandlerFailed,
}

/// Telemetry seam for the runner's step loop.
pub trait RunnerMetrics: Send + Sync {
    /// Records that `event` occurred.
    fn record_event(&self, event: RunnerEvent);
    /// Records the latency of a named operation (e.g. a layer's LLM call).
    fn record_latency(&self, operation: &str, duration: Duration);
}

/// Telemetry seam for bus fan-out.
pub trait BusMetrics: Send + Sync {
    /// Records that `event` occurred.
    fn record_event(&self, event: BusEvent);
    /// Records the latency of a single `publish` fan-out.
    fn record_latency(&self, operation: &str, duration: Duration);
}

/// Default telemetry implementation that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl RunnerMetrics for NoopMetrics {
    fn record_event(&self, _event: RunnerEvent) {}
    fn record_latency(&self, _operation: &str, _duration: Duration) {}
}

impl BusMetrics for NoopMetrics {
    fn record_event(&self, _event: BusEvent) {}
    fn record_latency(&self, _operation: &str, _duration: Duration) {}
}
