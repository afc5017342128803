use std::{collections::BTreeMap, fmt, sync::Arc};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{
    modifier::PlanModifier,
    path::AttributePath,
    value::Type,
};

/// Schema definition for a resource
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Version of this schema
    pub version: i64,
    /// The top-level attributes, by name
    pub attributes: BTreeMap<String, Attribute>,
    /// Human-readable description
    pub description: Option<String>,
}

/// Schema for a single attribute, possibly with nested attributes
#[derive(Clone)]
pub struct Attribute {
    /// What values this attribute holds
    pub kind: AttributeKind,
    /// Human-readable description
    pub description: Option<String>,
    /// Whether this attribute is required
    pub required: bool,
    /// Whether this attribute is optional
    pub optional: bool,
    /// Whether this attribute is computed (output-only unless also optional)
    pub computed: bool,
    /// Whether this attribute is sensitive (should be redacted)
    pub sensitive: bool,
    /// Run in order during planning, each seeing the previous one's plan value
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

#[derive(Debug, Clone)]
pub enum AttributeKind {
    /// A value of the given type, without schema below it
    Leaf(Type),
    /// Attributes nested in an object, or in each element of a collection
    Nested(NestedAttributes),
}

#[derive(Debug, Clone)]
pub struct NestedAttributes {
    pub nesting: NestingMode,
    pub attributes: BTreeMap<String, Attribute>,
}

/// How nested attributes are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// Single instance: attr = { ... }
    Single,
    /// Ordered instances: attr = [{ ... }, { ... }]
    List,
    /// Unordered, unique instances
    Set,
    /// Instances by string key: attr = { key = { ... } }
    Map,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "plan_modifiers",
                &self
                    .plan_modifiers
                    .iter()
                    .map(|m| m.description())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Attribute {
    fn new(kind: AttributeKind) -> Self {
        Attribute {
            kind,
            description: None,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            plan_modifiers: Vec::new(),
        }
    }

    /// An attribute holding a value of type `t`
    pub fn leaf(t: Type) -> Self {
        Self::new(AttributeKind::Leaf(t))
    }

    pub fn nested<K: Into<String>>(
        nesting: NestingMode,
        attributes: impl IntoIterator<Item = (K, Attribute)>,
    ) -> Self {
        Self::new(AttributeKind::Nested(NestedAttributes {
            nesting,
            attributes: attributes
                .into_iter()
                .map(|(k, a)| (k.into(), a))
                .collect(),
        }))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// The type of the values this attribute holds
    pub fn value_type(&self) -> Type {
        match &self.kind {
            AttributeKind::Leaf(t) => t.clone(),
            AttributeKind::Nested(nested) => {
                let object = object_type(&nested.attributes);
                match nested.nesting {
                    NestingMode::Single => object,
                    NestingMode::List => Type::list(object),
                    NestingMode::Set => Type::set(object),
                    NestingMode::Map => Type::map(object),
                }
            }
        }
    }

    /// Check the flags of this attribute and everything nested in it
    pub fn validate(&self, path: &AttributePath) -> Result<()> {
        if self.required && self.optional {
            bail!("attribute {} cannot be both required and optional", path);
        }
        if self.required && self.computed {
            bail!("attribute {} cannot be both required and computed", path);
        }
        if !self.required && !self.optional && !self.computed {
            bail!(
                "attribute {} must be at least one of required, optional or computed",
                path
            );
        }
        if let AttributeKind::Nested(nested) = &self.kind {
            if nested.attributes.is_empty() {
                bail!("nested attribute {} has no attributes", path);
            }
            for (name, attribute) in &nested.attributes {
                attribute.validate(&path.at_name(name))?;
            }
        }
        Ok(())
    }
}

fn object_type(attributes: &BTreeMap<String, Attribute>) -> Type {
    Type::Object(
        attributes
            .iter()
            .map(|(name, a)| (name.clone(), a.value_type()))
            .collect(),
    )
}

impl Schema {
    pub fn new<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Attribute)>) -> Self {
        Schema {
            version: 0,
            attributes: attributes
                .into_iter()
                .map(|(k, a)| (k.into(), a))
                .collect(),
            description: None,
        }
    }

    /// The object type of a whole resource value
    pub fn value_type(&self) -> Type {
        object_type(&self.attributes)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, attribute) in &self.attributes {
            attribute.validate(&AttributePath::root(name))?;
        }
        Ok(())
    }
}
