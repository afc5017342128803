//! Plan modification over the schema tree.
//!
//! Each attribute first runs its own modifiers; nested attributes then
//! descend into every object of the planned value, unless the plan is null or
//! unknown. Private state is threaded through the walk depth-first, from each
//! attribute to the next one, including across siblings.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use tracing::{debug, debug_span};

use crate::{
    diag::Diagnostics,
    modifier::{run_pipeline, AttributeContext, ResourceContext},
    path::{AttributePath, Paths},
    private_state::PrivateState,
    schema::{Attribute, AttributeKind, NestingMode, Schema},
    value::Value,
};

static NULL: Value = Value::Null;
static UNKNOWN: Value = Value::Unknown;

/// Plan modification of one attribute and everything nested in it
pub struct AttributePlanRequest<'a> {
    pub path: AttributePath,
    pub config: &'a Value,
    pub plan: &'a Value,
    pub state: &'a Value,
    pub private: PrivateState,
    pub resource: ResourceContext<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributePlanResponse {
    pub plan: Value,
    /// Attributes at or below the requested one that force replacement
    pub requires_replace: Paths,
    pub diagnostics: Diagnostics,
    pub private: PrivateState,
}

/// Plan modification of a whole resource
pub struct ResourcePlanRequest<'a> {
    pub schema: &'a Schema,
    pub config: &'a Value,
    pub proposed_new_state: &'a Value,
    pub prior_state: &'a Value,
    /// Private state blob from the previous apply; may be empty
    pub prior_private: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlanResponse {
    pub planned_state: Value,
    pub requires_replace: Paths,
    pub diagnostics: Diagnostics,
    /// Private state blob to persist with the plan
    pub planned_private: Vec<u8>,
}

/// Run the plan modifiers of `attribute` and of all attributes nested in it.
///
/// Fails when the values do not conform to the attribute's type, or when a
/// modifier breaks that invariant.
pub fn modify_attribute_plan(
    attribute: &Attribute,
    request: AttributePlanRequest<'_>,
) -> Result<AttributePlanResponse> {
    let value_type = attribute.value_type();
    for (what, value) in [
        ("config", request.config),
        ("plan", request.plan),
        ("state", request.state),
    ] {
        if !value.conforms_to(&value_type) {
            bail!(
                "{} value of attribute {} is a {}, which does not conform to {}",
                what,
                request.path,
                value.kind_name(),
                value_type
            );
        }
    }

    let mut walker = Walker::new(request.resource);
    let (plan, private) = walker.attribute(
        attribute,
        &request.path,
        NodeValues {
            config: request.config,
            plan: request.plan.clone(),
            state: request.state,
        },
        request.private,
    )?;
    Ok(AttributePlanResponse {
        plan,
        requires_replace: walker.requires_replace,
        diagnostics: walker.diagnostics,
        private,
    })
}

/// Run the plan modifiers of every attribute of a resource, in schema order.
///
/// A null proposed state means the resource is being destroyed; it is
/// returned as is, without running any modifier.
pub fn modify_resource_plan(request: ResourcePlanRequest<'_>) -> Result<ResourcePlanResponse> {
    let span = debug_span!("modify_resource_plan", attributes = request.schema.attributes.len());
    let _enter = span.enter();

    request.schema.validate().context("invalid resource schema")?;
    let private = PrivateState::from_bytes(request.prior_private)
        .context("could not decode prior private state")?;

    let resource_type = request.schema.value_type();
    for (what, value) in [
        ("config", request.config),
        ("proposed new state", request.proposed_new_state),
        ("prior state", request.prior_state),
    ] {
        if !value.conforms_to(&resource_type) {
            bail!("resource {} does not conform to the schema", what);
        }
    }

    if request.proposed_new_state.is_null() {
        debug!("resource is planned for destruction, skipping plan modifiers");
        return Ok(ResourcePlanResponse {
            planned_state: Value::Null,
            requires_replace: Paths::new(),
            diagnostics: Diagnostics::new(),
            planned_private: private.to_bytes()?,
        });
    }

    let mut walker = Walker::new(ResourceContext {
        schema: request.schema,
        config: request.config,
        plan: request.proposed_new_state,
        state: request.prior_state,
    });
    let (planned_state, private) = walker.object(
        &request.schema.attributes,
        &AttributePath::empty(),
        NodeValues {
            config: request.config,
            plan: request.proposed_new_state.clone(),
            state: request.prior_state,
        },
        private,
    )?;

    debug!(
        requires_replace = walker.requires_replace.len(),
        errors = walker.diagnostics.error_count(),
        warnings = walker.diagnostics.warning_count(),
        "plan modification done"
    );

    Ok(ResourcePlanResponse {
        planned_state,
        requires_replace: walker.requires_replace,
        diagnostics: walker.diagnostics,
        planned_private: private.to_bytes()?,
    })
}

/// The values of one node. The plan is owned because it is rebuilt on the way
/// back up.
struct NodeValues<'v> {
    config: &'v Value,
    plan: Value,
    state: &'v Value,
}

/// Collects the tree-wide results of a single walk
struct Walker<'a> {
    resource: ResourceContext<'a>,
    requires_replace: Paths,
    diagnostics: Diagnostics,
}

impl<'a> Walker<'a> {
    fn new(resource: ResourceContext<'a>) -> Self {
        Walker {
            resource,
            requires_replace: Paths::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn attribute(
        &mut self,
        attribute: &Attribute,
        path: &AttributePath,
        values: NodeValues<'_>,
        private: PrivateState,
    ) -> Result<(Value, PrivateState)> {
        let NodeValues {
            config,
            plan,
            state,
        } = values;

        let outcome = run_pipeline(
            &attribute.plan_modifiers,
            &attribute.value_type(),
            AttributeContext {
                path,
                config,
                state,
                resource: self.resource,
            },
            plan,
            private,
        )?;
        let failed = outcome.diagnostics.has_error();
        self.diagnostics.append(outcome.diagnostics);
        let (plan, private) = (outcome.plan, outcome.private);
        if failed {
            return Ok((plan, private));
        }
        if outcome.requires_replace {
            debug!(path = %path, "attribute requires replacement");
            self.requires_replace.insert(path.clone());
        }

        let nested = match &attribute.kind {
            AttributeKind::Leaf(_) => return Ok((plan, private)),
            AttributeKind::Nested(nested) => nested,
        };
        if plan.is_null() || plan.is_unknown() {
            return Ok((plan, private));
        }

        match nested.nesting {
            NestingMode::Single => self.object(
                &nested.attributes,
                path,
                NodeValues {
                    config,
                    plan,
                    state,
                },
                private,
            ),
            NestingMode::List => {
                let elements = match plan {
                    Value::List(elements) => elements,
                    other => bail!(
                        "cannot enumerate list nested attribute {}: plan is a {}",
                        path,
                        other.kind_name()
                    ),
                };
                let (elements, private) =
                    self.elements(&nested.attributes, elements, config, state, private, |idx, _| {
                        path.at_list_index(idx)
                    })?;
                Ok((Value::List(elements), private))
            }
            NestingMode::Set => {
                let elements = match plan {
                    Value::Set(elements) => elements,
                    other => bail!(
                        "cannot enumerate set nested attribute {}: plan is a {}",
                        path,
                        other.kind_name()
                    ),
                };
                let (elements, private) =
                    self.elements(&nested.attributes, elements, config, state, private, |_, e| {
                        path.at_set_value(e.clone())
                    })?;
                Ok((Value::Set(elements), private))
            }
            NestingMode::Map => {
                let entries = match plan {
                    Value::Map(entries) => entries,
                    other => bail!(
                        "cannot enumerate map nested attribute {}: plan is a {}",
                        path,
                        other.kind_name()
                    ),
                };
                let mut modified = BTreeMap::new();
                let mut private = private;
                for (key, element) in entries {
                    let (element, next) = self.object(
                        &nested.attributes,
                        &path.at_map_key(key.as_str()),
                        NodeValues {
                            config: entry(config, &key),
                            plan: element,
                            state: entry(state, &key),
                        },
                        private,
                    )?;
                    modified.insert(key, element);
                    private = next;
                }
                Ok((Value::Map(modified), private))
            }
        }
    }

    /// Walk the objects of a list or set, pairing config and state elements
    /// by position
    fn elements(
        &mut self,
        attributes: &BTreeMap<String, Attribute>,
        plan: Vec<Value>,
        config: &Value,
        state: &Value,
        private: PrivateState,
        element_path: impl Fn(usize, &Value) -> AttributePath,
    ) -> Result<(Vec<Value>, PrivateState)> {
        let mut modified = Vec::with_capacity(plan.len());
        let mut private = private;
        for (idx, element) in plan.into_iter().enumerate() {
            let path = element_path(idx, &element);
            let (element, next) = self.object(
                attributes,
                &path,
                NodeValues {
                    config: element_at(config, idx),
                    plan: element,
                    state: element_at(state, idx),
                },
                private,
            )?;
            modified.push(element);
            private = next;
        }
        Ok((modified, private))
    }

    /// Walk the attributes of one object
    fn object(
        &mut self,
        attributes: &BTreeMap<String, Attribute>,
        path: &AttributePath,
        values: NodeValues<'_>,
        private: PrivateState,
    ) -> Result<(Value, PrivateState)> {
        let NodeValues {
            config,
            plan,
            state,
        } = values;
        if plan.is_null() || plan.is_unknown() {
            return Ok((plan, private));
        }
        let mut fields = match plan {
            Value::Object(fields) => fields,
            other => bail!(
                "cannot enumerate attributes of {}: plan is a {}, not an object",
                path,
                other.kind_name()
            ),
        };

        let mut private = private;
        for (name, attribute) in attributes {
            let attribute_path = path.at_name(name.as_str());
            let plan = fields.remove(name).with_context(|| {
                format!("plan object at {} has no attribute {}", path, name)
            })?;
            let (plan, next) = self.attribute(
                attribute,
                &attribute_path,
                NodeValues {
                    config: field(config, name),
                    plan,
                    state: field(state, name),
                },
                private,
            )?;
            fields.insert(name.clone(), plan);
            private = next;
        }
        Ok((Value::Object(fields), private))
    }
}

fn field<'v>(object: &'v Value, name: &str) -> &'v Value {
    match object {
        Value::Object(fields) => fields.get(name).unwrap_or(&NULL),
        Value::Unknown => &UNKNOWN,
        _ => &NULL,
    }
}

fn element_at(collection: &Value, idx: usize) -> &Value {
    match collection {
        Value::List(elements) | Value::Set(elements) => elements.get(idx).unwrap_or(&NULL),
        Value::Unknown => &UNKNOWN,
        _ => &NULL,
    }
}

fn entry<'v>(map: &'v Value, key: &str) -> &'v Value {
    match map {
        Value::Map(entries) => entries.get(key).unwrap_or(&NULL),
        Value::Unknown => &UNKNOWN,
        _ => &NULL,
    }
}
