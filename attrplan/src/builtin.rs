//! Plan modifiers that providers can attach to their attributes as-is

use crate::{
    diag::Diagnostics,
    modifier::{ModifierRequest, ModifierResponse, PlanModifier, ReplaceDecision},
};

/// Require replacement of the resource when the planned value of the
/// attribute differs from its prior state.
///
/// Does nothing when the resource is being created or destroyed, or when the
/// plan or state value of the attribute is null or unknown.
pub fn requires_replace() -> RequiresReplace {
    RequiresReplace
}

/// Like [`requires_replace`], but only when `condition` also says so
pub fn requires_replace_if<F>(
    condition: F,
    description: impl Into<String>,
    markdown_description: impl Into<String>,
) -> RequiresReplaceIf<F>
where
    F: Fn(&ModifierRequest<'_>, &mut Diagnostics) -> bool + Send + Sync,
{
    RequiresReplaceIf {
        condition,
        description: description.into(),
        markdown_description: markdown_description.into(),
    }
}

/// Copy the prior state value into the plan when the plan value is unknown.
///
/// Meant for computed attributes that do not change once the resource exists,
/// so that the plan does not show them as "known after apply".
pub fn use_state_for_unknown() -> UseStateForUnknown {
    UseStateForUnknown
}

/// Whether a change in this attribute is something a replacement could be
/// decided on
fn is_replaceable_change(request: &ModifierRequest<'_>) -> bool {
    // Creation and destruction
    if request.resource.state.is_null() || request.resource.plan.is_null() {
        return false;
    }
    if !request.plan.is_known() || !request.state.is_known() {
        return false;
    }
    request.plan != request.state
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be destroyed and recreated."
            .to_string()
    }

    fn markdown_description(&self) -> String {
        "If the value of this attribute changes, the resource will be **destroyed and recreated**."
            .to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        if !is_replaceable_change(request) {
            return ModifierResponse::unchanged();
        }
        ModifierResponse::unchanged().with_requires_replace(ReplaceDecision::Set)
    }
}

pub struct RequiresReplaceIf<F> {
    condition: F,
    description: String,
    markdown_description: String,
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&ModifierRequest<'_>, &mut Diagnostics) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn markdown_description(&self) -> String {
        self.markdown_description.clone()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        if !is_replaceable_change(request) {
            return ModifierResponse::unchanged();
        }
        let mut diagnostics = Diagnostics::new();
        let replace = (self.condition)(request, &mut diagnostics);
        let response = ModifierResponse::unchanged().with_diagnostics(diagnostics);
        if replace {
            response.with_requires_replace(ReplaceDecision::Set)
        } else {
            response
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        // Nothing to fall back to, e.g. on creation
        if request.state.is_null() {
            return ModifierResponse::unchanged();
        }
        if !request.plan.is_unknown() {
            return ModifierResponse::unchanged();
        }
        // The practitioner explicitly wants a value that is not known yet
        if request.config.is_unknown() {
            return ModifierResponse::unchanged();
        }
        ModifierResponse::unchanged().with_plan(request.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        modifier::{run_pipeline, AttributeContext, PlanModifier, ResourceContext},
        path::AttributePath,
        private_state::PrivateState,
        schema::{Attribute, Schema},
        testing::{RequiresReplaceFalseModifier, ValueModifierOne},
        value::{Type, Value},
    };

    struct Case {
        config: Value,
        plan: Value,
        state: Value,
        resource_plan: Value,
        resource_state: Value,
    }

    impl Case {
        /// An update of an existing resource
        fn update(config: Value, plan: Value, state: Value) -> Self {
            Case {
                config,
                plan,
                state,
                resource_plan: Value::object([("test", Value::string("resource"))]),
                resource_state: Value::object([("test", Value::string("resource"))]),
            }
        }

        fn run(&self, modifiers: Vec<Arc<dyn PlanModifier>>) -> (Value, bool, Diagnostics) {
            let schema = Schema::new([("test", Attribute::leaf(Type::String).required())]);
            let path = AttributePath::root("test");
            let outcome = run_pipeline(
                &modifiers,
                &Type::String,
                AttributeContext {
                    path: &path,
                    config: &self.config,
                    state: &self.state,
                    resource: ResourceContext {
                        schema: &schema,
                        config: &Value::Null,
                        plan: &self.resource_plan,
                        state: &self.resource_state,
                    },
                },
                self.plan.clone(),
                PrivateState::empty(),
            )
            .unwrap();
            (outcome.plan, outcome.requires_replace, outcome.diagnostics)
        }
    }

    #[test]
    fn test_requires_replace_on_change() {
        let case = Case::update(
            Value::string("newtestvalue"),
            Value::string("newtestvalue"),
            Value::string("testvalue"),
        );
        let (plan, replace, diags) = case.run(vec![Arc::new(requires_replace())]);
        assert_eq!(plan, Value::string("newtestvalue"));
        assert!(replace);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_requires_replace_no_change() {
        let case = Case::update(
            Value::string("testvalue"),
            Value::string("testvalue"),
            Value::string("testvalue"),
        );
        let (_, replace, _) = case.run(vec![Arc::new(requires_replace())]);
        assert!(!replace);
    }

    #[test]
    fn test_requires_replace_sees_earlier_modifications() {
        let case = Case::update(
            Value::string("TESTATTRONE"),
            Value::string("TESTATTRONE"),
            Value::string("TESTATTRONE"),
        );
        let (plan, replace, _) =
            case.run(vec![Arc::new(ValueModifierOne), Arc::new(requires_replace())]);
        assert_eq!(plan, Value::string("TESTATTRTWO"));
        assert!(replace);
    }

    #[test]
    fn test_requires_replace_can_be_overridden() {
        let case = Case::update(
            Value::string("new"),
            Value::string("new"),
            Value::string("old"),
        );
        let (_, replace, _) = case.run(vec![
            Arc::new(requires_replace()),
            Arc::new(RequiresReplaceFalseModifier),
        ]);
        assert!(!replace);
    }

    #[test]
    fn test_requires_replace_ignores_null_and_unknown() {
        for (plan, state) in [
            (Value::Unknown, Value::string("old")),
            (Value::Null, Value::string("old")),
            (Value::string("new"), Value::Null),
            (Value::string("new"), Value::Unknown),
        ] {
            let case = Case::update(Value::Null, plan.clone(), state.clone());
            let (_, replace, _) = case.run(vec![Arc::new(requires_replace())]);
            assert!(!replace, "plan {} state {}", plan, state);
        }
    }

    #[test]
    fn test_requires_replace_ignores_create_and_destroy() {
        let mut create = Case::update(
            Value::string("new"),
            Value::string("new"),
            Value::string("old"),
        );
        create.resource_state = Value::Null;
        assert!(!create.run(vec![Arc::new(requires_replace())]).1);

        let mut destroy = Case::update(
            Value::string("new"),
            Value::string("new"),
            Value::string("old"),
        );
        destroy.resource_plan = Value::Null;
        assert!(!destroy.run(vec![Arc::new(requires_replace())]).1);
    }

    #[test]
    fn test_requires_replace_if() {
        let only_growth = requires_replace_if(
            |request, diagnostics| {
                let grew = request.plan.as_str().map(str::len) > request.state.as_str().map(str::len);
                if grew {
                    diagnostics.add_attribute_warning(
                        request.path,
                        "Replacement",
                        "growing this value replaces the resource",
                    );
                }
                grew
            },
            "Replaces the resource when the value gets longer.",
            "Replaces the resource when the value gets *longer*.",
        );
        let only_growth: Arc<dyn PlanModifier> = Arc::new(only_growth);
        assert_eq!(
            only_growth.markdown_description(),
            "Replaces the resource when the value gets *longer*."
        );

        let longer = Case::update(
            Value::string("abcd"),
            Value::string("abcd"),
            Value::string("ab"),
        );
        let (_, replace, diags) = longer.run(vec![only_growth.clone()]);
        assert!(replace);
        assert_eq!(diags.warning_count(), 1);

        let shorter = Case::update(Value::string("a"), Value::string("a"), Value::string("ab"));
        let (_, replace, diags) = shorter.run(vec![only_growth.clone()]);
        assert!(!replace);
        assert!(diags.is_empty());

        let unchanged = Case::update(Value::string("ab"), Value::string("ab"), Value::string("ab"));
        assert!(!unchanged.run(vec![only_growth]).1);
    }

    #[test]
    fn test_use_state_for_unknown() {
        let case = Case::update(Value::Null, Value::Unknown, Value::string("statevalue1"));
        let (plan, replace, diags) = case.run(vec![Arc::new(use_state_for_unknown())]);
        assert_eq!(plan, Value::string("statevalue1"));
        assert!(!replace);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_use_state_for_unknown_without_state() {
        let case = Case::update(Value::Null, Value::Unknown, Value::Null);
        let (plan, _, _) = case.run(vec![Arc::new(use_state_for_unknown())]);
        assert_eq!(plan, Value::Unknown);
    }

    #[test]
    fn test_use_state_for_unknown_keeps_known_plan() {
        let case = Case::update(
            Value::string("configured"),
            Value::string("configured"),
            Value::string("old"),
        );
        let (plan, _, _) = case.run(vec![Arc::new(use_state_for_unknown())]);
        assert_eq!(plan, Value::string("configured"));
    }

    #[test]
    fn test_use_state_for_unknown_respects_unknown_config() {
        let case = Case::update(Value::Unknown, Value::Unknown, Value::string("old"));
        let (plan, _, _) = case.run(vec![Arc::new(use_state_for_unknown())]);
        assert_eq!(plan, Value::Unknown);
    }
}
