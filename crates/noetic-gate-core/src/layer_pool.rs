// noetic-gate-core/src/layer_pool.rs
// ============================================================================
// Module: Layer Pool
// Description: Uniform per-layer adapter invoking the LLM client and parsing
//              its reply into zero-or-more typed packets.
// Purpose: Give the runner one call surface for all six layers plus the
//          integrity principal, applying the retry policy and lenient
//          fenced-JSON parsing described at §4.7.
// Dependencies: crate::interfaces::llm, crate::packet, crate::ledger, crate::vocabulary
// ============================================================================

//! ## Overview
//! Each layer is a fixed system prompt plus the same adapter shape: serialize
//! a [`LayerInput`], call the LLM client, and parse the reply into zero or
//! more [`Packet`]s. The adapter owns the retry loop around the completion
//! call; a reply that exhausts its retries yields zero packets, which the
//! runner treats as a schema violation (§4.7) rather than a distinct error
//! path.
//!
//! Parsing is lenient: the reply is scanned for fenced ```json blocks, and
//! each block is expected to deserialize into a [`LayerEmission`] — a
//! `packet_type`-tagged payload with an optional full MCP override. A block
//! that fails to deserialize is counted but otherwise dropped; it is not
//! raised as a Rust error, matching the "rejected as schema errors, not
//! exceptions" posture of §9.

use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::interfaces::LlmClient;
use crate::interfaces::LlmOptions;
use crate::interfaces::RetryPolicy;
use crate::ledger::LedgerSnapshot;
use crate::ids::CorrelationId;
use crate::ids::PacketId;
use crate::packet::Mcp;
use crate::packet::Packet;
use crate::packet::PacketHeader;
use crate::packet::Payload;
use crate::time::Clock;
use crate::vocabulary::LayerSource;
use crate::vocabulary::ToolsState;

/// Everything a layer adapter hands to the LLM as context for one step.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LayerInput {
    /// Packets recently observed on the episode's buses.
    pub recent_packets: Vec<Packet>,
    /// Current ledger state.
    pub ledger_snapshot: LedgerSnapshot,
    /// Current tool-layer availability.
    pub tools_state: ToolsState,
    /// Free-form recall surfaced from the belief/self-model stores.
    pub prompt_context: serde_json::Value,
}

/// One fenced-JSON block, as the layer is expected to emit it: a tagged
/// payload with an optional full MCP override.
#[derive(Debug, Deserialize)]
struct LayerEmission {
    #[serde(flatten)]
    payload: Payload,
    #[serde(default)]
    mcp: Option<Mcp>,
}

/// Outcome of a single layer invocation.
#[derive(Debug, Clone, Default)]
pub struct LayerInvocation {
    /// Packets successfully parsed from the reply, headers fully assembled.
    pub emitted: Vec<Packet>,
    /// Fenced blocks found but not successfully parsed into a [`LayerEmission`].
    pub unparseable_blocks: usize,
    /// Whether the completion call itself exhausted its retries.
    pub retries_exhausted: bool,
}

impl LayerInvocation {
    /// True when the step produced nothing usable: no packets, whether
    /// because the completion failed outright or every block failed to parse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}

/// Uniform adapter pool: one fixed system prompt per layer, a shared LLM
/// client, and a shared retry policy.
pub struct LayerPool {
    llm_client: std::sync::Arc<dyn LlmClient>,
    system_prompts: std::collections::BTreeMap<LayerSource, String>,
    retry_policy: RetryPolicy,
    llm_options: LlmOptions,
    clock: std::sync::Arc<dyn Clock>,
}

impl LayerPool {
    /// Creates a layer pool over the given client, keyed by each layer's
    /// fixed system prompt.
    #[must_use]
    pub fn new(llm_client: std::sync::Arc<dyn LlmClient>, system_prompts: std::collections::BTreeMap<LayerSource, String>, retry_policy: RetryPolicy, llm_options: LlmOptions) -> Self {
        Self::with_clock(llm_client, system_prompts, retry_policy, llm_options, std::sync::Arc::new(crate::time::SystemClock))
    }

    /// Creates a layer pool with an explicit [`Clock`], for deterministic tests.
    #[must_use]
    pub fn with_clock(
        llm_client: std::sync::Arc<dyn LlmClient>,
        system_prompts: std::collections::BTreeMap<LayerSource, String>,
        retry_policy: RetryPolicy,
        llm_options: LlmOptions,
        clock: std::sync::Arc<dyn Clock>,
    ) -> Self {
        Self {
            llm_client,
            system_prompts,
            retry_policy,
            llm_options,
            clock,
        }
    }

    /// Invokes `layer` for the current step, retrying transient completion
    /// failures per the configured [`RetryPolicy`], then parses the reply
    /// into zero or more packets, assembling each one's header from
    /// `correlation_id` and falling back to `mcp_defaults` when a parsed
    /// block carries no MCP override.
    pub fn invoke(&self, layer: LayerSource, correlation_id: &CorrelationId, input: &LayerInput, mcp_defaults: &Mcp) -> LayerInvocation {
        let system_prompt = self.system_prompts.get(&layer).map_or("", String::as_str);
        let user_message = serde_json::to_string(input).unwrap_or_default();

        let mut total_usage = crate::interfaces::TokenUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        };
        let mut record_usage = |usage: crate::interfaces::TokenUsage| {
            total_usage.prompt_tokens += usage.prompt_tokens;
            total_usage.completion_tokens += usage.completion_tokens;
            total_usage.total_tokens += usage.total_tokens;
        };

        let mut attempt = 0u32;
        let reply = loop {
            match self.llm_client.complete(system_prompt, &user_message, &self.llm_options, &mut record_usage) {
                Ok(text) => break Some(text),
                Err(err) if err.is_retryable() && attempt < self.retry_policy.max_retries => {
                    thread::sleep(Duration::from_millis(self.retry_policy.delay_ms(attempt)));
                    attempt += 1;
                }
                Err(_) => break None,
            }
        };

        let Some(reply) = reply else {
            return LayerInvocation {
                retries_exhausted: true,
                ..LayerInvocation::default()
            };
        };

        let mut invocation = LayerInvocation::default();
        for block in extract_fenced_json_blocks(&reply) {
            match serde_json::from_value::<LayerEmission>(block) {
                Ok(emission) => {
                    let mcp = emission.mcp.unwrap_or_else(|| mcp_defaults.clone());
                    invocation.emitted.push(Packet {
                        header: PacketHeader {
                            packet_id: PacketId::generate(),
                            packet_type: emission.payload.packet_type(),
                            created_at: self.clock.now(),
                            layer_source: layer,
                            correlation_id: correlation_id.clone(),
                            campaign_id: None,
                            previous_packet_id: None,
                        },
                        mcp,
                        payload: emission.payload,
                    });
                }
                Err(_) => invocation.unparseable_blocks += 1,
            }
        }
        invocation
    }
}

/// Scans `reply` for ```json fenced blocks and parses each as a
/// [`serde_json::Value`]. A block present but not valid JSON is skipped
/// silently at this stage; it is counted as unparseable one level up, once
/// the caller attempts the stronger [`LayerEmission`] deserialization.
fn extract_fenced_json_blocks(reply: &str) -> Vec<serde_json::Value> {
    let mut blocks = Vec::new();
    let mut rest = reply;
    while let Some(start) = rest.find("```") {
        let after_open = &rest[start + 3..];
        let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
        let Some(end) = after_open.find("```") else {
            break;
        };
        let body = after_open[..end].trim();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            blocks.push(value);
        }
        rest = &after_open[end + 3..];
    }
    blocks
}
