use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::trace;

use crate::{
    diag::Diagnostics, path::AttributePath, private_state::PrivateState, schema::Schema,
    value::{Type, Value},
};

/// A unit of planning logic attached to an attribute.
///
/// Modifiers run once for every occurrence of their attribute in the
/// resource, in the order they are declared on the attribute. They should be
/// pure computations over the request.
pub trait PlanModifier: Send + Sync {
    /// Plain text description of what the modifier does, used in logs
    fn description(&self) -> String;

    fn markdown_description(&self) -> String {
        self.description()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse;
}

/// The whole resource, for modifiers that need to look beyond their own attribute
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    pub schema: &'a Schema,
    pub config: &'a Value,
    /// The plan as proposed before any modifier ran
    pub plan: &'a Value,
    pub state: &'a Value,
}

pub struct ModifierRequest<'a> {
    pub path: &'a AttributePath,
    pub config: &'a Value,
    /// The plan value as left by the previous modifier
    pub plan: &'a Value,
    pub state: &'a Value,
    pub resource: ResourceContext<'a>,
    pub private: &'a PrivateState,
}

/// What a modifier wants done with the "requires replacement" flag of its attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplaceDecision {
    /// Keep whatever earlier modifiers decided
    #[default]
    Unchanged,
    Set,
    /// Clear the flag, even if an earlier modifier set it
    Unset,
}

#[derive(Debug, Clone, Default)]
pub struct ModifierResponse {
    /// Replacement plan value; `None` keeps the current one
    pub plan: Option<Value>,
    pub requires_replace: ReplaceDecision,
    pub diagnostics: Diagnostics,
    /// Replacement private state; `None` forwards the current one
    pub private: Option<PrivateState>,
}

impl ModifierResponse {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, plan: Value) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_requires_replace(mut self, decision: ReplaceDecision) -> Self {
        self.requires_replace = decision;
        self
    }

    pub fn with_private(mut self, private: PrivateState) -> Self {
        self.private = Some(private);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics.append(diagnostics);
        self
    }
}

/// The inputs of a pipeline that stay fixed while its modifiers run
#[derive(Debug, Clone, Copy)]
pub struct AttributeContext<'a> {
    pub path: &'a AttributePath,
    pub config: &'a Value,
    pub state: &'a Value,
    pub resource: ResourceContext<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub plan: Value,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
    pub private: PrivateState,
}

/// Run `modifiers` in order over one attribute.
///
/// The plan value and private state are threaded from each modifier to the
/// next. A modifier that reports an error stops the pipeline; the outcome
/// then reflects the modifiers that did run.
///
/// Fails if a modifier returns a plan value that does not conform to
/// `value_type`.
pub fn run_pipeline(
    modifiers: &[Arc<dyn PlanModifier>],
    value_type: &Type,
    ctx: AttributeContext<'_>,
    plan: Value,
    private: PrivateState,
) -> Result<PipelineOutcome> {
    let mut outcome = PipelineOutcome {
        plan,
        requires_replace: false,
        diagnostics: Diagnostics::new(),
        private,
    };

    for modifier in modifiers {
        let description = modifier.description();
        trace!(path = %ctx.path, modifier = %description, "calling plan modifier");

        let response = modifier.modify_plan(&ModifierRequest {
            path: ctx.path,
            config: ctx.config,
            plan: &outcome.plan,
            state: ctx.state,
            resource: ctx.resource,
            private: &outcome.private,
        });

        trace!(
            path = %ctx.path,
            modifier = %description,
            changed_plan = response.plan.is_some(),
            requires_replace = ?response.requires_replace,
            "called plan modifier"
        );

        if let Some(plan) = response.plan {
            if !plan.conforms_to(value_type) {
                bail!(
                    "plan modifier \"{}\" returned a {} value for attribute {}, which has type {}",
                    description,
                    plan.kind_name(),
                    ctx.path,
                    value_type
                );
            }
            outcome.plan = plan;
        }
        if let Some(private) = response.private {
            outcome.private = private;
        }
        match response.requires_replace {
            ReplaceDecision::Unchanged => {}
            ReplaceDecision::Set => outcome.requires_replace = true,
            ReplaceDecision::Unset => outcome.requires_replace = false,
        }

        let failed = response.diagnostics.has_error();
        outcome.diagnostics.append(response.diagnostics);
        if failed {
            break;
        }
    }

    Ok(outcome)
}
