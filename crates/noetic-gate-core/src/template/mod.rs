// noetic-gate-core/src/template/mod.rs
// ============================================================================
// Module: Episode Template & Compiler
// Description: Declarative episode templates and their compilation into a
//              walkable, context-bound DAG.
// Purpose: Let hosts author legal episode flows as data rather than code,
//          with constraint checks enforced once at compile time.
// Dependencies: serde, crate::vocabulary, crate::ids, crate::hashing
// ============================================================================

//! ## Overview
//! An [`EpisodeTemplate`] is a DAG of [`TemplateStep`]s, each owned by one
//! layer and expected to emit one packet type. [`compile`] binds a template
//! to a [`CompilationContext`], checking the template's constraints against
//! the context and materializing concrete MCP defaults for each step via
//! simple `${symbol}` substitution — never general expression evaluation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::ids::CampaignId;
use crate::ids::CorrelationId;
use crate::ids::StepId;
use crate::ids::TemplateId;
use crate::vocabulary::FreshnessClass;
use crate::vocabulary::LayerSource;
use crate::vocabulary::PacketType;
use crate::vocabulary::QualityTier;
use crate::vocabulary::ToolsState;

/// Constraints a runtime context must satisfy before a template may compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConstraints {
    /// Minimum quality tier the context must supply.
    pub min_tier: QualityTier,
    /// Tool states the template tolerates.
    pub allowed_tools_states: Vec<ToolsState>,
    /// Whether the template requires write-capable tool access.
    pub write_allowed: bool,
}

/// A single step in a template's DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStep {
    /// This step's identifier.
    pub step_id: StepId,
    /// Layer that owns (executes) this step.
    pub owner_layer: LayerSource,
    /// Packet type the owning layer is expected to emit at this step.
    pub packet_type: PacketType,
    /// Candidate successor steps; `choose_next` selects among these by the
    /// emitted packet's discriminator.
    pub next_steps: Vec<StepId>,
    /// Binding hints evaluated into concrete MCP defaults at compile time.
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

/// A declarative recipe specifying a legal episode flow as a DAG of typed
/// step emissions by named layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeTemplate {
    /// This template's identifier.
    pub template_id: TemplateId,
    /// Coarse classification of what this template is for.
    pub intent_class: String,
    /// Constraints the runtime context must satisfy.
    pub constraints: TemplateConstraints,
    /// All steps in the template.
    pub steps: Vec<TemplateStep>,
    /// The step an episode starts at.
    pub entry_step: StepId,
    /// Steps from which an episode may exit successfully.
    pub exit_steps: Vec<StepId>,
}

impl EpisodeTemplate {
    fn step(&self, id: &StepId) -> Option<&TemplateStep> {
        self.steps.iter().find(|step| &step.step_id == id)
    }

    /// Validates structural invariants (§3.5): `entry_step` and every
    /// `exit_step`/`next_steps` target exist among `steps`, and the DAG is
    /// acyclic when treating `next_steps` as edges.
    ///
    /// # Errors
    /// Returns [`CompilationError`] describing the first structural defect found.
    pub fn validate_structure(&self) -> Result<(), CompilationError> {
        let ids: BTreeSet<&StepId> = self.steps.iter().map(|step| &step.step_id).collect();
        if !ids.contains(&self.entry_step) {
            return Err(CompilationError::dangling_step(&self.entry_step));
        }
        for exit in &self.exit_steps {
            if !ids.contains(exit) {
                return Err(CompilationError::dangling_step(exit));
            }
        }
        for step in &self.steps {
            for next in &step.next_steps {
                if !ids.contains(next) {
                    return Err(CompilationError::dangling_step(next));
                }
            }
        }
        self.check_acyclic()
    }

    /// Detects uncontrolled cycles in the `next_steps` adjacency.
    ///
    /// A cycle is only legal when it passes through a step whose
    /// `next_steps` has more than one candidate (a discriminator-guarded
    /// back-edge, per §9); an unconditional single-successor cycle is
    /// rejected as `cyclic_dag`.
    fn check_acyclic(&self) -> Result<(), CompilationError> {
        for step in &self.steps {
            if step.next_steps.len() == 1 && step.next_steps[0] == step.step_id {
                return Err(CompilationError::CyclicDag {
                    detail: format!("step {} self-loops without a discriminator", step.step_id),
                });
            }
        }
        let mut visiting: BTreeSet<&StepId> = BTreeSet::new();
        let mut done: BTreeSet<&StepId> = BTreeSet::new();
        for step in &self.steps {
            self.visit_acyclic(&step.step_id, &mut visiting, &mut done)?;
        }
        Ok(())
    }

    fn visit_acyclic<'a>(
        &'a self,
        id: &'a StepId,
        visiting: &mut BTreeSet<&'a StepId>,
        done: &mut BTreeSet<&'a StepId>,
    ) -> Result<(), CompilationError> {
        if done.contains(id) {
            return Ok(());
        }
        if visiting.contains(id) {
            return Err(CompilationError::CyclicDag {
                detail: format!("unguarded cycle through step {id}"),
            });
        }
        let Some(step) = self.step(id) else {
            return Ok(());
        };
        // A step with more than one successor is discriminator-guarded by
        // construction (choose_next picks one edge per §4.8); only
        // single-successor chains can form an unguarded cycle.
        if step.next_steps.len() > 1 {
            done.insert(id);
            return Ok(());
        }
        visiting.insert(id);
        for next in &step.next_steps {
            self.visit_acyclic(next, visiting, done)?;
        }
        visiting.remove(id);
        done.insert(id);
        Ok(())
    }
}

/// Kind of compilation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationErrorKind {
    /// The context failed to satisfy the template's constraints.
    ConstraintViolation,
    /// A `${symbol}` binding referenced a value the context doesn't supply.
    UnknownBinding,
    /// The DAG contains an unguarded cycle.
    CyclicDag,
    /// A step reference (`entry_step`, `exit_steps`, `next_steps`) doesn't exist.
    DanglingStep,
}

/// Errors raised while compiling a template against a context.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// See [`CompilationErrorKind::ConstraintViolation`].
    #[error("constraint violation: {detail}")]
    ConstraintViolation {
        /// Explanation of which constraint failed.
        detail: String,
    },
    /// See [`CompilationErrorKind::UnknownBinding`].
    #[error("unknown binding: {symbol}")]
    UnknownBinding {
        /// The unresolved `${symbol}` reference.
        symbol: String,
    },
    /// See [`CompilationErrorKind::CyclicDag`].
    #[error("cyclic dag: {detail}")]
    CyclicDag {
        /// Explanation of the detected cycle.
        detail: String,
    },
    /// See [`CompilationErrorKind::DanglingStep`].
    #[error("dangling step reference: {step_id}")]
    DanglingStep {
        /// The step identifier that could not be resolved.
        step_id: String,
    },
}

impl CompilationError {
    fn dangling_step(id: &StepId) -> Self {
        Self::DanglingStep {
            step_id: id.to_string(),
        }
    }

    /// Returns the error's kind.
    #[must_use]
    pub const fn kind(&self) -> CompilationErrorKind {
        match self {
            Self::ConstraintViolation { .. } => CompilationErrorKind::ConstraintViolation,
            Self::UnknownBinding { .. } => CompilationErrorKind::UnknownBinding,
            Self::CyclicDag { .. } => CompilationErrorKind::CyclicDag,
            Self::DanglingStep { .. } => CompilationErrorKind::DanglingStep,
        }
    }
}

/// Runtime context a template is compiled against.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationContext {
    /// Quality tier in force for this episode.
    pub quality_tier: QualityTier,
    /// Tool layer availability.
    pub tools_state: ToolsState,
    /// Whether write-capable tool access is permitted.
    pub write_allowed: bool,
    /// Default freshness class for packets without an explicit override.
    pub freshness_class: FreshnessClass,
    /// Optional macro-grouping identifier.
    pub campaign_id: Option<CampaignId>,
    /// Default token budget.
    pub token_budget: u64,
    /// Default tool-call budget.
    pub tool_call_budget: u64,
    /// Default wall-clock budget, in seconds.
    pub time_budget_seconds: u64,
    /// Fresh correlation id minted for the episode this context compiles into.
    pub correlation_id: CorrelationId,
}

impl CompilationContext {
    /// Resolves a `${symbol}` binding name against this context's concrete values.
    fn resolve(&self, symbol: &str) -> Option<String> {
        match symbol {
            "quality_tier" => Some(format!("{:?}", self.quality_tier)),
            "tools_state" => Some(format!("{:?}", self.tools_state)),
            "freshness_class" => Some(format!("{:?}", self.freshness_class)),
            "token_budget" => Some(self.token_budget.to_string()),
            "tool_call_budget" => Some(self.tool_call_budget.to_string()),
            "time_budget_seconds" => Some(self.time_budget_seconds.to_string()),
            "correlation_id" => Some(self.correlation_id.to_string()),
            _ => None,
        }
    }
}

/// A template step with its bindings resolved into concrete defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledStep {
    /// Source step.
    pub step_id: StepId,
    /// Layer owning this step.
    pub owner_layer: LayerSource,
    /// Packet type expected at this step.
    pub packet_type: PacketType,
    /// Candidate successors.
    pub next_steps: Vec<StepId>,
    /// Bindings with every `${symbol}` reference substituted.
    pub resolved_bindings: BTreeMap<String, String>,
}

/// A template instantiated against a runtime context, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledEpisode {
    /// Source template identifier.
    pub template_id: TemplateId,
    /// Correlation id minted for this episode.
    pub correlation_id: CorrelationId,
    /// Entry step.
    pub entry_step: StepId,
    /// Exit steps.
    pub exit_steps: Vec<StepId>,
    /// All steps, with bindings resolved.
    pub steps: Vec<CompiledStep>,
}

impl CompiledEpisode {
    /// Looks up a compiled step by id.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&CompiledStep> {
        self.steps.iter().find(|step| &step.step_id == id)
    }
}

/// Compiles a template against a runtime context into a walkable DAG.
///
/// # Errors
/// Returns [`CompilationError::ConstraintViolation`] when the context fails
/// the template's constraints, [`CompilationError::UnknownBinding`] when a
/// step references an unresolvable `${symbol}`, or the structural errors
/// from [`EpisodeTemplate::validate_structure`].
pub fn compile(template: &EpisodeTemplate, context: &CompilationContext) -> Result<CompiledEpisode, CompilationError> {
    template.validate_structure()?;

    if context.quality_tier < template.constraints.min_tier {
        return Err(CompilationError::ConstraintViolation {
            detail: format!(
                "context quality_tier {:?} below template minimum {:?}",
                context.quality_tier, template.constraints.min_tier
            ),
        });
    }
    if !template.constraints.allowed_tools_states.contains(&context.tools_state) {
        return Err(CompilationError::ConstraintViolation {
            detail: format!("context tools_state {:?} not in template's allowed set", context.tools_state),
        });
    }
    if template.constraints.write_allowed && !context.write_allowed {
        return Err(CompilationError::ConstraintViolation {
            detail: "template requires write access but context forbids writes".to_owned(),
        });
    }

    let mut steps = Vec::with_capacity(template.steps.len());
    for step in &template.steps {
        let mut resolved_bindings = BTreeMap::new();
        for (key, raw) in &step.bindings {
            resolved_bindings.insert(key.clone(), substitute(raw, context)?);
        }
        steps.push(CompiledStep {
            step_id: step.step_id.clone(),
            owner_layer: step.owner_layer,
            packet_type: step.packet_type,
            next_steps: step.next_steps.clone(),
            resolved_bindings,
        });
    }

    Ok(CompiledEpisode {
        template_id: template.template_id.clone(),
        correlation_id: context.correlation_id.clone(),
        entry_step: template.entry_step.clone(),
        exit_steps: template.exit_steps.clone(),
        steps,
    })
}

/// Substitutes every `${symbol}` occurrence in `raw` with its concrete value
/// from `context`. Not a general expression evaluator: only whole-symbol
/// substitution of `${...}` spans is supported.
fn substitute(raw: &str, context: &CompilationContext) -> Result<String, CompilationError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let symbol = &after[..end];
        let value = context.resolve(symbol).ok_or_else(|| CompilationError::UnknownBinding {
            symbol: symbol.to_owned(),
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
