//! Plan modifiers for tests

use crate::{
    diag::Diagnostics,
    modifier::{ModifierRequest, ModifierResponse, PlanModifier, ReplaceDecision},
    value::Value,
};

pub(crate) const PRIVATE_KEY: &str = "providerKeyOne";
pub(crate) const PRIVATE_VALUE: &[u8] = br#"{"pKeyOne": {"k0": "zero", "k1": 1}}"#;

/// Rewrites "TESTATTRONE" to "TESTATTRTWO"
pub(crate) struct ValueModifierOne;

impl PlanModifier for ValueModifierOne {
    fn description(&self) -> String {
        "rewrites TESTATTRONE to TESTATTRTWO".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        if request.plan.as_str() == Some("TESTATTRONE") {
            return ModifierResponse::unchanged().with_plan(Value::string("TESTATTRTWO"));
        }
        ModifierResponse::unchanged()
    }
}

/// Rewrites "TESTATTRTWO" to "MODIFIED_TWO"
pub(crate) struct ValueModifierTwo;

impl PlanModifier for ValueModifierTwo {
    fn description(&self) -> String {
        "rewrites TESTATTRTWO to MODIFIED_TWO".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        if request.plan.as_str() == Some("TESTATTRTWO") {
            return ModifierResponse::unchanged().with_plan(Value::string("MODIFIED_TWO"));
        }
        ModifierResponse::unchanged()
    }
}

pub(crate) struct SetValueTo(pub &'static str);

impl PlanModifier for SetValueTo {
    fn description(&self) -> String {
        format!("sets the value to {}", self.0)
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        ModifierResponse::unchanged().with_plan(Value::string(self.0))
    }
}

pub(crate) struct SetUnknown;

impl PlanModifier for SetUnknown {
    fn description(&self) -> String {
        "marks the value as known after apply".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        ModifierResponse::unchanged().with_plan(Value::Unknown)
    }
}

pub(crate) struct AppendValue(pub &'static str);

impl PlanModifier for AppendValue {
    fn description(&self) -> String {
        format!("appends {}", self.0)
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        match request.plan.as_str() {
            Some(s) => ModifierResponse::unchanged().with_plan(Value::string(format!("{}{}", s, self.0))),
            None => ModifierResponse::unchanged(),
        }
    }
}

pub(crate) struct WrongTypeModifier;

impl PlanModifier for WrongTypeModifier {
    fn description(&self) -> String {
        "returns a bool".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        ModifierResponse::unchanged().with_plan(Value::Bool(true))
    }
}

pub(crate) struct RequiresReplaceTrueModifier;

impl PlanModifier for RequiresReplaceTrueModifier {
    fn description(&self) -> String {
        "always requires replacement".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        ModifierResponse::unchanged().with_requires_replace(ReplaceDecision::Set)
    }
}

pub(crate) struct RequiresReplaceFalseModifier;

impl PlanModifier for RequiresReplaceFalseModifier {
    fn description(&self) -> String {
        "never requires replacement".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        ModifierResponse::unchanged().with_requires_replace(ReplaceDecision::Unset)
    }
}

pub(crate) struct WarningDiagModifier;

impl PlanModifier for WarningDiagModifier {
    fn description(&self) -> String {
        "adds a warning".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning("Warning diag", "This is a warning");
        ModifierResponse::unchanged().with_diagnostics(diagnostics)
    }
}

pub(crate) struct ErrorDiagModifier;

impl PlanModifier for ErrorDiagModifier {
    fn description(&self) -> String {
        "adds an error".to_string()
    }

    fn modify_plan(&self, _request: &ModifierRequest<'_>) -> ModifierResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error("Error diag", "This is an error");
        ModifierResponse::unchanged().with_diagnostics(diagnostics)
    }
}

/// Stores [`PRIVATE_VALUE`] under [`PRIVATE_KEY`]
pub(crate) struct PrivateModifierSet;

impl PlanModifier for PrivateModifierSet {
    fn description(&self) -> String {
        "sets private state".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        let mut private = request.private.clone();
        let diagnostics = private.set_key(PRIVATE_KEY, PRIVATE_VALUE.to_vec());
        ModifierResponse::unchanged()
            .with_private(private)
            .with_diagnostics(diagnostics)
    }
}

/// Reports an error unless [`PRIVATE_KEY`] holds [`PRIVATE_VALUE`]
pub(crate) struct PrivateModifierGet;

impl PlanModifier for PrivateModifierGet {
    fn description(&self) -> String {
        "checks private state".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        let mut diagnostics = Diagnostics::new();
        if request.private.get_key(PRIVATE_KEY) != Some(PRIVATE_VALUE) {
            diagnostics.add_attribute_error(
                request.path,
                "Unexpected private state",
                format!("expected {:?}", String::from_utf8_lossy(PRIVATE_VALUE)),
            );
        }
        ModifierResponse::unchanged().with_diagnostics(diagnostics)
    }
}

/// Counts its invocations in private state, and plans the count it found
pub(crate) struct PrivateCounter;

impl PlanModifier for PrivateCounter {
    fn description(&self) -> String {
        "counts invocations".to_string()
    }

    fn modify_plan(&self, request: &ModifierRequest<'_>) -> ModifierResponse {
        let seen: u64 = request
            .private
            .get_key("count")
            .and_then(|b| std::str::from_utf8(b).ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let mut private = request.private.clone();
        let diagnostics = private.set_key("count", (seen + 1).to_string().into_bytes());
        ModifierResponse::unchanged()
            .with_plan(Value::string(format!("seen-{}", seen)))
            .with_private(private)
            .with_diagnostics(diagnostics)
    }
}
