//! Request and response files of `attrplan-runner`, and running them.

use std::{collections::BTreeMap, io::Read, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use attrplan::{
    builtin,
    modifier::PlanModifier,
    schema::{Attribute, AttributeKind, NestedAttributes, NestingMode, Schema},
    walk::{modify_resource_plan, ResourcePlanRequest},
    AttributePath, Severity, Type, Value,
};
use serde::{Deserialize, Serialize};

/// A plan modification request, as read from a file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    pub schema: SchemaFile,
    pub config: serde_json::Value,
    pub proposed_new_state: serde_json::Value,
    /// Absent or `null` when the resource is being created
    #[serde(default)]
    pub prior_state: serde_json::Value,
    /// Private state from the previous apply: key to base64 of the value
    #[serde(default)]
    pub prior_private: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    #[serde(default)]
    pub version: i64,
    pub attributes: BTreeMap<String, AttributeFile>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An attribute has either a `type` in cty JSON notation, or `nested`
/// attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeFile {
    #[serde(rename = "type", default)]
    pub type_: Option<serde_json::Value>,
    #[serde(default)]
    pub nested: Option<NestedFile>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Names of built-in plan modifiers, see [`builtin_modifier`]
    #[serde(default)]
    pub plan_modifiers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestedFile {
    pub nesting: NestingMode,
    pub attributes: BTreeMap<String, AttributeFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFile {
    pub planned_state: serde_json::Value,
    /// Attribute paths, in order
    pub requires_replace: Vec<String>,
    pub diagnostics: Vec<DiagnosticFile>,
    /// Key to base64 of the value
    pub planned_private: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticFile {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ResponseFile {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Look up a built-in plan modifier by the name used in request files
pub fn builtin_modifier(name: &str) -> Result<Arc<dyn PlanModifier>> {
    match name {
        "requires_replace" => Ok(Arc::new(builtin::requires_replace())),
        "use_state_for_unknown" => Ok(Arc::new(builtin::use_state_for_unknown())),
        other => bail!(
            "unknown plan modifier {:?}; expected one of: requires_replace, use_state_for_unknown",
            other
        ),
    }
}

impl SchemaFile {
    pub fn to_schema(&self) -> Result<Schema> {
        let mut attributes = BTreeMap::new();
        for (name, a) in &self.attributes {
            attributes.insert(name.clone(), a.to_attribute(&AttributePath::root(name))?);
        }
        Ok(Schema {
            version: self.version,
            attributes,
            description: self.description.clone(),
        })
    }
}

impl AttributeFile {
    pub fn to_attribute(&self, path: &AttributePath) -> Result<Attribute> {
        let kind = match (&self.type_, &self.nested) {
            (Some(t), None) => AttributeKind::Leaf(
                Type::from_cty_json(t).with_context(|| format!("in type of attribute {}", path))?,
            ),
            (None, Some(nested)) => {
                let mut attributes = BTreeMap::new();
                for (name, a) in &nested.attributes {
                    attributes.insert(name.clone(), a.to_attribute(&path.at_name(name))?);
                }
                AttributeKind::Nested(NestedAttributes {
                    nesting: nested.nesting,
                    attributes,
                })
            }
            (Some(_), Some(_)) => bail!("attribute {} has both a type and nested attributes", path),
            (None, None) => bail!("attribute {} has neither a type nor nested attributes", path),
        };
        let plan_modifiers = self
            .plan_modifiers
            .iter()
            .map(|name| {
                builtin_modifier(name).with_context(|| format!("in attribute {}", path))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Attribute {
            kind,
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            plan_modifiers,
        })
    }
}

/// Read a request from `path`, or from stdin when there is no path
pub fn read_request(path: Option<&Path>) -> Result<RequestFile> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read request file {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("could not read request from stdin")?;
            text
        }
    };
    parse_request(&text)
}

pub fn parse_request(text: &str) -> Result<RequestFile> {
    serde_json::from_str(text).context("could not parse plan modification request")
}

/// Run plan modification over the resource in `request`
pub fn run(request: &RequestFile) -> Result<ResponseFile> {
    let schema = request.schema.to_schema()?;
    let resource_type = schema.value_type();
    let config = Value::from_json(&request.config, &resource_type).context("in config")?;
    let proposed_new_state = Value::from_json(&request.proposed_new_state, &resource_type)
        .context("in proposed_new_state")?;
    let prior_state =
        Value::from_json(&request.prior_state, &resource_type).context("in prior_state")?;
    let prior_private = if request.prior_private.is_empty() {
        Vec::new()
    } else {
        serde_json::to_vec(&request.prior_private)?
    };

    let response = modify_resource_plan(ResourcePlanRequest {
        schema: &schema,
        config: &config,
        proposed_new_state: &proposed_new_state,
        prior_state: &prior_state,
        prior_private: &prior_private,
    })?;

    let planned_private = if response.planned_private.is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_slice(&response.planned_private)
            .context("could not read back planned private state")?
    };
    Ok(ResponseFile {
        planned_state: response.planned_state.to_json(),
        requires_replace: response
            .requires_replace
            .iter()
            .map(|p| p.to_string())
            .collect(),
        diagnostics: response
            .diagnostics
            .iter()
            .map(|d| DiagnosticFile {
                severity: d.severity,
                summary: d.summary.clone(),
                detail: d.detail.clone(),
                path: d.path.as_ref().map(|p| p.to_string()),
            })
            .collect(),
        planned_private,
    })
}
