// noetic-gate-core/src/runner.rs
// ============================================================================
// Module: Episode Runner
// Description: The step-driven dispatcher of §4.8 plus the exposed
//              orchestrator API of §6.3.
// Purpose: Walk a compiled episode's DAG, invoking the owning layer at each
//          step, validating what it emits through all three gates, applying
//          accepted packets to the ledger and memory, and routing them on
//          both buses.
// Dependencies: crate::template, crate::validators, crate::ledger,
//               crate::bus, crate::layer_pool, crate::interfaces
// ============================================================================

//! ## Overview
//! [`Runner`] owns one episode's compiled DAG walk at a time (§5: a single
//! episode is single-threaded and cooperatively stepped; running many
//! episodes concurrently means running many `Runner`s, each with its own
//! ledger and ignoring this one's bus subscriptions). Each step: assemble a
//! [`LayerInput`](crate::layer_pool::LayerInput), invoke the owning layer,
//! validate what comes back through Gate 1/2/3, apply accepted packets to
//! the ledger and memory, publish them on both buses, and advance the FSM.
//! A rejection at any gate synthesizes an `IntegrityAlert`, forces
//! `SAFEMODE`, and ends the episode.
//!
//! One deliberate departure from a literal "every step calls the LLM"
//! reading of §4.7: an L6 step whose expected packet type is `TaskResult`
//! does not ask the LLM to fabricate a result. It looks up the most recent
//! still-open `TaskDirective` in the episode's history, executes it through
//! the [`ToolRegistry`](crate::interfaces::ToolRegistry), and builds the
//! `TaskResult` directly from what the tool actually returned, citing the
//! tool's evidence in the packet's MCP envelope. Every other step keeps the
//! uniform LLM-adapter shape.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

use crate::ids::CampaignId;
use crate::ids::CorrelationId;
use crate::ids::PacketId;
use crate::ids::TemplateId;
use crate::interfaces::BusMetrics;
use crate::interfaces::BeliefStore;
use crate::interfaces::NoopMetrics;
use crate::interfaces::RunnerEvent;
use crate::interfaces::RunnerMetrics;
use crate::interfaces::SelfModelStore;
use crate::interfaces::ToolRegistry;
use crate::ledger::BudgetKind;
use crate::ledger::ActiveToken;
use crate::ledger::Ledger;
use crate::ledger::LedgerSnapshot;
use crate::layer_pool::LayerInput;
use crate::layer_pool::LayerPool;
use crate::packet::mcp::Budgets;
use crate::packet::mcp::DefinitionOfDone;
use crate::packet::mcp::Epistemics;
use crate::packet::mcp::Evidence;
use crate::packet::mcp::EvidenceRef;
use crate::packet::mcp::Intent;
use crate::packet::mcp::Quality;
use crate::packet::mcp::RiskBudget;
use crate::packet::mcp::Routing;
use crate::packet::mcp::Stakes;
use crate::packet::AlertSeverity;
use crate::packet::EscalationPayload;
use crate::packet::IntegrityAlertPayload;
use crate::packet::Mcp;
use crate::packet::Packet;
use crate::packet::PacketHeader;
use crate::packet::Payload;
use crate::packet::TaskResultPayload;
use crate::template::compile;
use crate::template::CompilationContext;
use crate::template::CompilationError;
use crate::template::CompiledStep;
use crate::template::EpisodeTemplate;
use crate::vocabulary::DecisionOutcome;
use crate::vocabulary::EpistemicStatus;
use crate::vocabulary::FreshnessClass;
use crate::vocabulary::FsmState;
use crate::vocabulary::LayerSource;
use crate::vocabulary::PacketType;
use crate::vocabulary::QualityTier;
use crate::vocabulary::StakesLevel;
use crate::vocabulary::ToolsState;
use crate::vocabulary::VerificationRequirement;
use crate::bus::Bus;
use crate::bus::BusMessage;
use crate::bus::Direction;
use crate::ids::StepId;
use crate::time::Clock;
use crate::time::SystemClock;
use crate::validators::fsm_validate;
use crate::validators::invariant_validate;
use crate::validators::validate_schema;

/// Errors the runner itself raises, as opposed to a gate rejection (which
/// degrades to an in-episode `SAFEMODE` transition rather than a `Result::Err`).
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No template is registered under this id.
    #[error("no template registered as {0}")]
    UnknownTemplate(TemplateId),
    /// Template failed to compile against the requested context.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    /// `choose_next` found no legal successor and the step wasn't an exit step.
    #[error("template inconsistency: step {step_id} has no matching successor")]
    TemplateInconsistency {
        /// The step at which no successor could be chosen.
        step_id: String,
    },
    /// No episode is recorded under this correlation id.
    #[error("no episode recorded for correlation id {0}")]
    UnknownEpisode(CorrelationId),
}

/// Request parameters for [`Runner::run_template`]; omitted fields fall back
/// to the runner's configured defaults (§6.3, §10.3).
#[derive(Debug, Clone, Default)]
pub struct RunTemplateRequest {
    /// Template to run.
    pub template_id: TemplateId,
    /// Overall stakes level applied uniformly to every step's MCP defaults.
    pub stakes_level: Option<StakesLevel>,
    /// Quality tier the context must satisfy.
    pub quality_tier: Option<QualityTier>,
    /// Token budget override.
    pub token_budget: Option<u64>,
    /// Tool-call budget override.
    pub tool_call_budget: Option<u64>,
    /// Wall-clock budget override, in seconds.
    pub time_budget_seconds: Option<u64>,
    /// Optional macro-grouping identifier.
    pub campaign_id: Option<CampaignId>,
}

/// Host-configurable defaults applied when a [`RunTemplateRequest`] omits a field.
#[derive(Debug, Clone, Copy)]
pub struct RunnerDefaults {
    /// Default stakes level.
    pub stakes_level: StakesLevel,
    /// Default quality tier.
    pub quality_tier: QualityTier,
    /// Default token budget.
    pub token_budget: u64,
    /// Default tool-call budget.
    pub tool_call_budget: u64,
    /// Default wall-clock budget, in seconds.
    pub time_budget_seconds: u64,
    /// Default freshness class for packets without an explicit override.
    pub freshness_class: FreshnessClass,
    /// Default evidence staleness threshold, in seconds.
    pub stale_if_older_than_seconds: u64,
    /// Tool layer availability assumed at compile time.
    pub tools_state: ToolsState,
    /// Whether write-capable tool access is permitted for this runner.
    pub write_allowed: bool,
}

impl Default for RunnerDefaults {
    fn default() -> Self {
        Self {
            stakes_level: StakesLevel::Low,
            quality_tier: QualityTier::Par,
            token_budget: 10_000,
            tool_call_budget: 50,
            time_budget_seconds: 600,
            freshness_class: FreshnessClass::Operational,
            stale_if_older_than_seconds: 300,
            tools_state: ToolsState::ToolsOk,
            write_allowed: false,
        }
    }
}

/// Outcome of one `run_template` call (§6.3).
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    /// Episode identifier.
    pub correlation_id: CorrelationId,
    /// Template that was run.
    pub template_id: TemplateId,
    /// Whether the episode reached `COMPLETE` rather than `SAFEMODE`.
    pub success: bool,
    /// Total steps attempted.
    pub step_count: usize,
    /// Steps that completed without a gate rejection.
    pub steps_completed: Vec<StepId>,
    /// Every packet accepted during the episode, in emission order.
    pub packets_emitted: Vec<Packet>,
    /// FSM state the episode ended in.
    pub final_state: FsmState,
    /// Ledger state at episode end.
    pub budget_consumed: LedgerSnapshot,
    /// Human-readable errors recorded during the run.
    pub errors: Vec<String>,
    /// When the episode started.
    pub started_at: DateTime<Utc>,
    /// When the episode ended.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration of the run, in seconds.
    pub duration_seconds: f64,
}

/// A recorded episode, retrievable via `get_episode`/`list_episodes` (§6.3).
#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    /// Episode identifier.
    pub correlation_id: CorrelationId,
    /// Template that was run.
    pub template_id: TemplateId,
    /// Full packet history, in emission order.
    pub history: Vec<Packet>,
    /// FSM state the episode ended in.
    pub final_state: FsmState,
    /// When the episode started.
    pub started_at: DateTime<Utc>,
    /// When the episode ended, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

/// The step-driven dispatcher: one compiled DAG walk per call to `run_template`.
pub struct Runner {
    templates: BTreeMap<TemplateId, EpisodeTemplate>,
    layer_pool: LayerPool,
    tool_registry: ToolRegistry,
    northbound: Bus,
    southbound: Bus,
    runner_metrics: Box<dyn RunnerMetrics>,
    bus_metrics: Box<dyn BusMetrics>,
    belief_store: Mutex<Box<dyn BeliefStore>>,
    self_model_store: Mutex<Box<dyn SelfModelStore>>,
    episodes: Mutex<BTreeMap<String, EpisodeRecord>>,
    cancelled: Mutex<std::collections::BTreeSet<String>>,
    defaults: RunnerDefaults,
    clock: Box<dyn Clock>,
}

impl Runner {
    /// Creates a runner with no templates registered; call [`Runner::register_template`]
    /// to add them.
    #[must_use]
    pub fn new(
        layer_pool: LayerPool,
        tool_registry: ToolRegistry,
        belief_store: Box<dyn BeliefStore>,
        self_model_store: Box<dyn SelfModelStore>,
        defaults: RunnerDefaults,
    ) -> Self {
        Self::with_clock(layer_pool, tool_registry, belief_store, self_model_store, defaults, Box::new(SystemClock))
    }

    /// Creates a runner with an explicit [`Clock`], for deterministic tests.
    #[must_use]
    pub fn with_clock(
        layer_pool: LayerPool,
        tool_registry: ToolRegistry,
        belief_store: Box<dyn BeliefStore>,
        self_model_store: Box<dyn SelfModelStore>,
        defaults: RunnerDefaults,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            templates: BTreeMap::new(),
            layer_pool,
            tool_registry,
            northbound: Bus::new(Direction::Northbound),
            southbound: Bus::new(Direction::Southbound),
            runner_metrics: Box::new(NoopMetrics),
            bus_metrics: Box::new(NoopMetrics),
            belief_store: Mutex::new(belief_store),
            self_model_store: Mutex::new(self_model_store),
            episodes: Mutex::new(BTreeMap::new()),
            cancelled: Mutex::new(std::collections::BTreeSet::new()),
            defaults,
            clock,
        }
    }

    /// Registers a template so it may be run by id.
    pub fn register_template(&mut self, template: EpisodeTemplate) {
        self.templates.insert(template.template_id.clone(), template);
    }

    /// Replaces the runner and bus telemetry sinks.
    pub fn with_metrics(mut self, runner_metrics: Box<dyn RunnerMetrics>, bus_metrics: Box<dyn BusMetrics>) -> Self {
        self.runner_metrics = runner_metrics;
        self.bus_metrics = bus_metrics;
        self
    }

    /// Subscribes a handler to the northbound bus (lower layer reporting up).
    pub fn subscribe_northbound<F>(&self, layer: LayerSource, handler: F)
    where
        F: Fn(&Packet) -> Result<(), String> + Send + Sync + 'static,
    {
        self.northbound.subscribe(layer, handler);
    }

    /// Subscribes a handler to the southbound bus (higher layer directing down).
    pub fn subscribe_southbound<F>(&self, layer: LayerSource, handler: F)
    where
        F: Fn(&Packet) -> Result<(), String> + Send + Sync + 'static,
    {
        self.southbound.subscribe(layer, handler);
    }

    /// Requests cancellation of a running or future step of `correlation_id`.
    /// The flag is checked between steps and before each LLM call (§5); an
    /// in-flight call runs to completion and its output is discarded.
    ///
    /// # Panics
    /// Panics if the internal cancellation set's lock is poisoned.
    pub fn cancel(&self, correlation_id: &CorrelationId) {
        self.cancelled.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(correlation_id.to_string());
    }

    /// Returns whether `correlation_id` has a pending cancellation request.
    fn is_cancelled(&self, correlation_id: &CorrelationId) -> bool {
        self.cancelled.lock().unwrap_or_else(std::sync::PoisonError::into_inner).contains(correlation_id.as_str())
    }

    /// Looks up a recorded episode by correlation id.
    ///
    /// # Panics
    /// Panics if the internal episode registry's lock is poisoned.
    #[must_use]
    pub fn get_episode(&self, correlation_id: &CorrelationId) -> Option<EpisodeRecord> {
        self.episodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(correlation_id.as_str()).cloned()
    }

    /// Lists recorded episodes, optionally filtered by template and capped at `limit`.
    ///
    /// # Panics
    /// Panics if the internal episode registry's lock is poisoned.
    #[must_use]
    pub fn list_episodes(&self, template_id: Option<&TemplateId>, limit: Option<usize>) -> Vec<EpisodeRecord> {
        let registry = self.episodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matches: Vec<EpisodeRecord> = registry
            .values()
            .filter(|record| template_id.is_none_or(|wanted| &record.template_id == wanted))
            .cloned()
            .collect();
        matches.sort_by_key(|record| record.started_at);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Runs `template_id` to completion (or to `SAFEMODE`), synchronously.
    ///
    /// # Errors
    /// Returns [`RunnerError::UnknownTemplate`] if no template is registered
    /// under the requested id, or [`RunnerError::Compilation`] if the
    /// template fails to compile against the derived context. Gate
    /// rejections during execution do not return `Err`; they end the episode
    /// in `SAFEMODE` with `EpisodeResult::success == false`.
    pub fn run_template(&self, request: RunTemplateRequest) -> Result<EpisodeResult, RunnerError> {
        let template = self.templates.get(&request.template_id).ok_or_else(|| RunnerError::UnknownTemplate(request.template_id.clone()))?.clone();

        let correlation_id = CorrelationId::generate();
        let stakes_level = request.stakes_level.unwrap_or(self.defaults.stakes_level);
        let quality_tier = request.quality_tier.unwrap_or(self.defaults.quality_tier);
        let token_budget = request.token_budget.unwrap_or(self.defaults.token_budget);
        let tool_call_budget = request.tool_call_budget.unwrap_or(self.defaults.tool_call_budget);
        let time_budget_seconds = request.time_budget_seconds.unwrap_or(self.defaults.time_budget_seconds);

        let context = CompilationContext {
            quality_tier,
            tools_state: self.defaults.tools_state,
            write_allowed: self.defaults.write_allowed,
            freshness_class: self.defaults.freshness_class,
            campaign_id: request.campaign_id.clone(),
            token_budget,
            tool_call_budget,
            time_budget_seconds,
            correlation_id: correlation_id.clone(),
        };
        let compiled = compile(&template, &context)?;

        let mut ledger = Ledger::new();
        ledger.allocate(&[
            (BudgetKind::Tokens, token_budget),
            (BudgetKind::ToolCalls, tool_call_budget),
            (BudgetKind::WallTimeSeconds, time_budget_seconds),
            (BudgetKind::Risk, 100),
        ]);

        let started_at = self.clock.now();
        let mut history: Vec<Packet> = Vec::new();
        let mut steps_completed: Vec<StepId> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut state = FsmState::Idle;
        let mut current_step_id = Some(compiled.entry_step.clone());
        let mut step_count = 0usize;

        'steps: while let Some(step_id) = current_step_id.take() {
            if state == FsmState::Complete || state == FsmState::Safemode {
                break;
            }
            step_count += 1;

            if self.is_cancelled(&correlation_id) {
                self.emit_cancellation(&mut history, &correlation_id, stakes_level);
                state = FsmState::Safemode;
                break;
            }

            let Some(step) = compiled.step(&step_id) else {
                errors.push(format!("template inconsistency: dangling step {step_id}"));
                break;
            };

            let mcp_defaults = self.build_mcp_defaults(step, &template, stakes_level, quality_tier, &ledger.snapshot());

            let emitted = if step.owner_layer == LayerSource::L6 && step.packet_type == PacketType::TaskResult {
                self.execute_pending_directive(&ledger, &history, &correlation_id, &mcp_defaults).into_iter().collect::<Vec<_>>()
            } else {
                self.runner_metrics.record_event(RunnerEvent::StepStarted);
                let input = self.assemble_input(&template, &history, &ledger, &context);
                let invocation = self.layer_pool.invoke(step.owner_layer, &correlation_id, &input, &mcp_defaults);
                if invocation.is_empty() {
                    self.handle_rejection(&mut history, &correlation_id, "schema_violation: layer produced no parseable packet".to_owned(), stakes_level);
                    state = FsmState::Safemode;
                    break 'steps;
                }
                invocation.emitted
            };

            let mut last_packet: Option<Packet> = None;
            for packet in emitted {
                let previous_created_at = history.last().map(|prior| prior.header.created_at);
                let gate1 = validate_schema(&packet, previous_created_at);
                if !gate1.ok() {
                    self.handle_rejection(&mut history, &correlation_id, format!("schema rejection: {:?}", gate1.errors), stakes_level);
                    state = FsmState::Safemode;
                    break 'steps;
                }

                let gate2 = match fsm_validate(state, packet.header.packet_type) {
                    Ok(next_state) => next_state,
                    Err(illegal) => {
                        self.handle_rejection(&mut history, &correlation_id, format!("illegal transition: {illegal:?}"), stakes_level);
                        state = FsmState::Safemode;
                        break 'steps;
                    }
                };

                let gate3 = invariant_validate(&packet, &ledger.snapshot(), &history);
                if !gate3.ok() {
                    self.handle_rejection(&mut history, &correlation_id, format!("invariant rejection: {:?}", gate3.violations()), stakes_level);
                    state = FsmState::Safemode;
                    break 'steps;
                }

                self.apply_to_ledger(&mut ledger, &packet);
                self.apply_to_memory(&packet);
                self.publish(&packet);

                state = gate2;
                history.push(packet.clone());
                last_packet = Some(packet);
            }

            steps_completed.push(step_id.clone());
            let next = choose_next(step, last_packet.as_ref());
            match next {
                Some(next_step) => current_step_id = Some(next_step),
                None if compiled.exit_steps.contains(&step_id) => {
                    state = FsmState::Complete;
                }
                None => {
                    errors.push(format!("template inconsistency: step {step_id} has no matching successor"));
                    return Err(RunnerError::TemplateInconsistency {
                        step_id: step_id.to_string(),
                    });
                }
            }
        }

        let completed_at = self.clock.now();
        let success = state == FsmState::Complete;
        let budget_consumed = ledger.snapshot();

        self.episodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(
            correlation_id.to_string(),
            EpisodeRecord {
                correlation_id: correlation_id.clone(),
                template_id: request.template_id.clone(),
                history: history.clone(),
                final_state: state,
                started_at,
                completed_at: Some(completed_at),
            },
        );

        Ok(EpisodeResult {
            correlation_id,
            template_id: request.template_id,
            success,
            step_count,
            steps_completed,
            packets_emitted: history,
            final_state: state,
            budget_consumed,
            errors,
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds().max(0) as f64 / 1000.0,
        })
    }

    /// Builds the [`LayerInput`] a step's layer adapter is invoked with:
    /// recent history, current ledger state, and memory recall scoped to the
    /// template's intent class.
    fn assemble_input(&self, template: &EpisodeTemplate, history: &[Packet], ledger: &Ledger, context: &CompilationContext) -> LayerInput {
        const RECENT_WINDOW: usize = 20;
        let recent_packets = history.iter().rev().take(RECENT_WINDOW).rev().cloned().collect();

        let belief_recall = self.belief_store.lock().unwrap_or_else(std::sync::PoisonError::into_inner).query_by_domain(&template.intent_class);
        let self_model_recall = self.self_model_store.lock().unwrap_or_else(std::sync::PoisonError::into_inner).query_by_domain(&template.intent_class);
        let prompt_context = serde_json::json!({
            "intent_class": template.intent_class,
            "belief_recall": belief_recall.iter().map(|record| &record.content).collect::<Vec<_>>(),
            "self_model_recall": self_model_recall.iter().map(|entry| &entry.content).collect::<Vec<_>>(),
        });

        LayerInput {
            recent_packets,
            ledger_snapshot: ledger.snapshot(),
            tools_state: context.tools_state,
            prompt_context,
        }
    }

    /// Constructs the MCP envelope a step's layer falls back to when its
    /// reply carries no explicit override.
    fn build_mcp_defaults(&self, step: &CompiledStep, template: &EpisodeTemplate, stakes_level: StakesLevel, quality_tier: QualityTier, ledger_snapshot: &LedgerSnapshot) -> Mcp {
        let remaining = |kind: BudgetKind, fallback: u64| ledger_snapshot.budgets.get(&kind).copied().map_or(fallback, crate::ledger::BudgetCounter::remaining);

        Mcp {
            intent: Intent {
                summary: format!("step {}", step.step_id),
                scope: step.resolved_bindings.get("scope").cloned().unwrap_or_else(|| template.intent_class.clone()),
            },
            stakes: Stakes {
                impact: stakes_level,
                irreversibility: stakes_level,
                uncertainty: stakes_level,
                adversariality: stakes_level,
                stakes_level,
            },
            quality: Quality {
                quality_tier,
                satisficing_mode: false,
                definition_of_done: DefinitionOfDone {
                    text: format!("{} completes its emission", step.step_id),
                    checks: vec![],
                },
                verification_requirement: if stakes_level >= StakesLevel::High { VerificationRequirement::Required } else { VerificationRequirement::Optional },
            },
            budgets: Budgets {
                token_budget: remaining(BudgetKind::Tokens, self.defaults.token_budget),
                tool_call_budget: remaining(BudgetKind::ToolCalls, self.defaults.tool_call_budget),
                time_budget_seconds: remaining(BudgetKind::WallTimeSeconds, self.defaults.time_budget_seconds),
                risk_budget: RiskBudget {
                    envelope: 1.0,
                    max_loss: 0.1,
                },
            },
            epistemics: Epistemics {
                status: EpistemicStatus::Derived,
                confidence: 0.8,
                calibration_note: None,
                freshness_class: self.defaults.freshness_class,
                stale_if_older_than_seconds: self.defaults.stale_if_older_than_seconds,
                assumptions: vec![],
            },
            evidence: Evidence::default(),
            routing: Routing {
                task_class: template.intent_class.clone(),
                tools_state: self.defaults.tools_state,
            },
        }
    }

    /// Mutates the ledger for an accepted packet's side effects: registering
    /// a token, opening or closing a directive, charging consumed budgets,
    /// or approving an overrun.
    fn apply_to_ledger(&self, ledger: &mut Ledger, packet: &Packet) {
        match &packet.payload {
            Payload::ToolAuthorizationToken(token_payload) => {
                let expires_at = packet.header.created_at + chrono::Duration::seconds(i64::try_from(token_payload.expires_in_seconds).unwrap_or(i64::MAX));
                ledger.register_token(ActiveToken {
                    token_id: token_payload.token_id.clone(),
                    scope: token_payload.scope.clone(),
                    issued_at: packet.header.created_at,
                    expires_at,
                    max_uses: token_payload.max_uses,
                    uses_remaining: token_payload.max_uses,
                    issuer_layer: packet.header.layer_source,
                    revoked: false,
                });
            }
            Payload::TaskDirective(directive) => {
                let timeout_at = packet.header.created_at + chrono::Duration::seconds(i64::try_from(packet.mcp.budgets.time_budget_seconds).unwrap_or(i64::MAX));
                let _ = ledger.open_directive(&directive.task_id, packet.header.packet_id.to_string(), packet.header.created_at, timeout_at);
                if let Some(token_id) = &directive.authorization_token_id {
                    let _ = ledger.use_token(token_id, packet.header.created_at);
                }
            }
            Payload::TaskResult(result) => {
                ledger.close_directive(&result.task_id);
                let _ = ledger.consume(BudgetKind::Tokens, result.tokens_consumed);
                let _ = ledger.consume(BudgetKind::ToolCalls, result.tool_calls_consumed);
            }
            Payload::Escalation(EscalationPayload { approves_scope: Some(_), .. }) => {
                ledger.approve_overrun(BudgetKind::Tokens, self.defaults.token_budget);
                ledger.approve_overrun(BudgetKind::ToolCalls, self.defaults.tool_call_budget);
            }
            _ => {}
        }
    }

    /// Routes an accepted `BeliefUpdate` to the self-model store when its
    /// domain names the agent itself, otherwise to the belief store.
    fn apply_to_memory(&self, packet: &Packet) {
        let Payload::BeliefUpdate(update) = &packet.payload else {
            return;
        };
        if update.domain.starts_with("self") {
            self.self_model_store.lock().unwrap_or_else(std::sync::PoisonError::into_inner).record(packet.header.layer_source, update, packet.header.created_at);
        } else {
            self.belief_store.lock().unwrap_or_else(std::sync::PoisonError::into_inner).record(packet.header.layer_source, update, packet.header.created_at);
        }
    }

    /// Fans an accepted packet out on both directional buses.
    fn publish(&self, packet: &Packet) {
        let message = BusMessage {
            packet: packet.clone(),
            target_layer: None,
        };
        self.northbound.publish(&message, self.bus_metrics.as_ref());
        self.southbound.publish(&message, self.bus_metrics.as_ref());
    }

    /// Executes the most recent still-open `TaskDirective` through the tool
    /// registry and builds the `TaskResult` packet mechanically from its
    /// outcome, rather than asking the LLM to fabricate one. Returns `None`
    /// if no open directive is found.
    fn execute_pending_directive(&self, ledger: &Ledger, history: &[Packet], correlation_id: &CorrelationId, mcp_defaults: &Mcp) -> Option<Packet> {
        let (directive_packet_id, directive) = history.iter().rev().find_map(|candidate| match &candidate.payload {
            Payload::TaskDirective(directive) if ledger.has_open_directive(&directive.task_id) => Some((candidate.header.packet_id.clone(), directive.clone())),
            _ => None,
        })?;

        let token = directive.authorization_token_id.as_ref().and_then(|token_id| ledger.token(token_id));
        let now = self.clock.now();
        let outcome = self.tool_registry.execute(&directive.tool_name, &directive.params, token, now);

        let (success, data, error, evidence_ref) = match outcome {
            Ok(result) => (result.success, result.data, result.error, result.evidence_ref),
            Err(tool_error) => (false, None, Some(tool_error.to_string()), None),
        };

        let mut mcp = mcp_defaults.clone();
        if let Some(evidence) = evidence_ref {
            mcp.epistemics.status = EpistemicStatus::Observed;
            mcp.evidence.refs.push(EvidenceRef {
                ref_type: evidence.ref_type,
                ref_id: evidence.ref_id,
                timestamp: evidence.timestamp,
                reliability_score: evidence.reliability_score,
            });
        }

        Some(Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::TaskResult,
                created_at: now,
                layer_source: LayerSource::L6,
                correlation_id: correlation_id.clone(),
                campaign_id: None,
                previous_packet_id: Some(directive_packet_id),
            },
            mcp,
            payload: Payload::TaskResult(TaskResultPayload {
                task_id: directive.task_id,
                success,
                data,
                error,
                tokens_consumed: 0,
                tool_calls_consumed: 1,
            }),
        })
    }

    /// Synthesizes an `IntegrityAlert`, publishes it, and records it in history.
    fn handle_rejection(&self, history: &mut Vec<Packet>, correlation_id: &CorrelationId, message: String, stakes_level: StakesLevel) {
        self.runner_metrics.record_event(RunnerEvent::PacketRejected);
        let alert = self.synthesize_alert(history, correlation_id, message, stakes_level);
        self.publish(&alert);
        history.push(alert);
        self.runner_metrics.record_event(RunnerEvent::EnteredSafemode);
    }

    /// Synthesizes the `Escalation` packet recording an external cancellation.
    fn emit_cancellation(&self, history: &mut Vec<Packet>, correlation_id: &CorrelationId, stakes_level: StakesLevel) {
        let escalation = Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::Escalation,
                created_at: self.clock.now(),
                layer_source: LayerSource::Integrity,
                correlation_id: correlation_id.clone(),
                campaign_id: None,
                previous_packet_id: history.last().map(|prior| prior.header.packet_id.clone()),
            },
            mcp: self.minimal_integrity_mcp(stakes_level),
            payload: Payload::Escalation(EscalationPayload {
                reason: "external_cancel".to_owned(),
                approves_scope: None,
            }),
        };
        self.publish(&escalation);
        history.push(escalation);
        self.runner_metrics.record_event(RunnerEvent::EpisodeCancelled);
    }

    /// Builds an `IntegrityAlert` packet with `HIGH` severity, chained off
    /// the last packet in history if any.
    fn synthesize_alert(&self, history: &[Packet], correlation_id: &CorrelationId, message: String, stakes_level: StakesLevel) -> Packet {
        Packet {
            header: PacketHeader {
                packet_id: PacketId::generate(),
                packet_type: PacketType::IntegrityAlert,
                created_at: self.clock.now(),
                layer_source: LayerSource::Integrity,
                correlation_id: correlation_id.clone(),
                campaign_id: None,
                previous_packet_id: history.last().map(|prior| prior.header.packet_id.clone()),
            },
            mcp: self.minimal_integrity_mcp(stakes_level),
            payload: Payload::IntegrityAlert(IntegrityAlertPayload {
                severity: AlertSeverity::High,
                message,
                triggering_packet_id: None,
            }),
        }
    }

    /// Builds a minimal MCP envelope for runner-synthesized integrity packets.
    fn minimal_integrity_mcp(&self, stakes_level: StakesLevel) -> Mcp {
        Mcp {
            intent: Intent {
                summary: "integrity escalation".to_owned(),
                scope: "episode".to_owned(),
            },
            stakes: Stakes {
                impact: stakes_level,
                irreversibility: stakes_level,
                uncertainty: stakes_level,
                adversariality: stakes_level,
                stakes_level,
            },
            quality: Quality {
                quality_tier: QualityTier::Par,
                satisficing_mode: false,
                definition_of_done: DefinitionOfDone {
                    text: "episode halted safely".to_owned(),
                    checks: vec![],
                },
                verification_requirement: VerificationRequirement::Optional,
            },
            budgets: Budgets {
                token_budget: 0,
                tool_call_budget: 0,
                time_budget_seconds: 0,
                risk_budget: RiskBudget {
                    envelope: 0.0,
                    max_loss: 0.0,
                },
            },
            epistemics: Epistemics {
                status: EpistemicStatus::Derived,
                confidence: 1.0,
                calibration_note: None,
                freshness_class: FreshnessClass::Realtime,
                stale_if_older_than_seconds: 0,
                assumptions: vec![],
            },
            evidence: Evidence::default(),
            routing: Routing {
                task_class: "integrity".to_owned(),
                tools_state: self.defaults.tools_state,
            },
        }
    }
}

/// Selects the next step from `step.next_steps`. A single candidate is
/// taken unconditionally; with multiple candidates, the match is keyed by
/// the emitted packet's discriminator against each candidate `StepId`'s own
/// name (e.g. a `Decision::outcome` of `VerifyFirst` matches a candidate
/// step id containing `verify_first`), since the template format carries no
/// separate discriminator-to-step map.
fn choose_next(step: &CompiledStep, packet: Option<&Packet>) -> Option<StepId> {
    match step.next_steps.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        many => {
            let discriminator = packet.and_then(|candidate| match &candidate.payload {
                Payload::Decision(decision) => Some(decision_outcome_token(decision.outcome)),
                _ => None,
            })?;
            many.iter().find(|candidate| candidate.as_str().to_lowercase().contains(&discriminator)).cloned()
        }
    }
}

fn decision_outcome_token(outcome: DecisionOutcome) -> String {
    match outcome {
        DecisionOutcome::Act => "act".to_owned(),
        DecisionOutcome::VerifyFirst => "verify".to_owned(),
        DecisionOutcome::Escalate => "escalate".to_owned(),
        DecisionOutcome::Defer => "defer".to_owned(),
    }
}
