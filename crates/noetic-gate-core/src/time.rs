// noetic-gate-core/src/time.rs
// ============================================================================
// Module: Noetic Gate Clock
// Description: Injectable wall-clock seam over RFC 3339 timestamps.
// Purpose: Keep the core free of direct `SystemTime`/`Utc::now()` reads so
//          that episodes stay deterministic and replayable under test.
// Dependencies: chrono
// ============================================================================

//! ## Overview
//! The core never reads wall-clock time directly. Every timestamp that
//! enters a packet, a ledger record, or an episode result comes from an
//! injected [`Clock`]. Hosts use [`SystemClock`] in production; tests use
//! [`FixedClock`] for deterministic fixtures.

use chrono::DateTime;
use chrono::Utc;

/// Source of the current wall-clock time.
///
/// # Invariants
/// - Implementations must return non-decreasing values when used as a
///   monotonic source; `SystemClock` relies on the OS clock for this.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same instant, or advances on request.
///
/// Intended for tests that need deterministic, reproducible timestamps.
#[derive(Debug, Clone)]
pub struct FixedClock {
    current: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a fixed clock starting at the given instant.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: std::sync::Mutex::new(start),
        }
    }

    /// Advances the clock by the given number of seconds and returns the new time.
    pub fn advance_seconds(&self, seconds: i64) -> DateTime<Utc> {
        let mut guard = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += chrono::Duration::seconds(seconds);
        *guard
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
