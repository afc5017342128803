use std::{cmp::Ordering, collections::BTreeSet, fmt};

use crate::value::Value;

/// One step from a value to a value nested inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// An attribute of an object
    AttributeName(String),
    /// An element of a list, by position
    ElementKeyInt(usize),
    /// An element of a map, by key
    ElementKeyString(String),
    /// An element of a set, identified by the element itself
    ElementKeyValue(Value),
}

impl PathStep {
    fn rank(&self) -> u8 {
        match self {
            PathStep::AttributeName(_) => 0,
            PathStep::ElementKeyInt(_) => 1,
            PathStep::ElementKeyString(_) => 2,
            PathStep::ElementKeyValue(_) => 3,
        }
    }
}

impl Ord for PathStep {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PathStep::AttributeName(a), PathStep::AttributeName(b)) => a.cmp(b),
            (PathStep::ElementKeyInt(a), PathStep::ElementKeyInt(b)) => a.cmp(b),
            (PathStep::ElementKeyString(a), PathStep::ElementKeyString(b)) => a.cmp(b),
            // Display is canonical for equal values, so this agrees with Eq
            (PathStep::ElementKeyValue(a), PathStep::ElementKeyValue(b)) => {
                a.to_string().cmp(&b.to_string())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for PathStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The location of an attribute within a resource.
///
/// Rendered the way Terraform users know it: `servers[0].name`,
/// `tags["env"]`, `rules[{"port": 22}]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// The path of the resource itself
    pub fn empty() -> Self {
        AttributePath { steps: Vec::new() }
    }

    /// The path of a top-level attribute
    pub fn root(name: impl Into<String>) -> Self {
        AttributePath::empty().at_name(name)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn parent(&self) -> Option<AttributePath> {
        if self.steps.is_empty() {
            return None;
        }
        Some(AttributePath {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    fn with_step(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        AttributePath { steps }
    }

    pub fn at_name(&self, name: impl Into<String>) -> Self {
        self.with_step(PathStep::AttributeName(name.into()))
    }

    pub fn at_list_index(&self, index: usize) -> Self {
        self.with_step(PathStep::ElementKeyInt(index))
    }

    pub fn at_map_key(&self, key: impl Into<String>) -> Self {
        self.with_step(PathStep::ElementKeyString(key.into()))
    }

    pub fn at_set_value(&self, value: Value) -> Self {
        self.with_step(PathStep::ElementKeyValue(value))
    }

}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "<resource>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::AttributeName(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
                PathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                PathStep::ElementKeyValue(value) => write!(f, "[{}]", value)?,
            }
        }
        Ok(())
    }
}

/// An ordered set of attribute paths, such as the attributes that force
/// replacement of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths(BTreeSet<AttributePath>);

impl Paths {
    pub fn new() -> Self {
        Paths(BTreeSet::new())
    }

    /// Returns whether the path was newly added
    pub fn insert(&mut self, path: AttributePath) -> bool {
        self.0.insert(path)
    }

    pub fn append(&mut self, other: Paths) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributePath> {
        self.0.iter()
    }
}

impl FromIterator<AttributePath> for Paths {
    fn from_iter<T: IntoIterator<Item = AttributePath>>(iter: T) -> Self {
        Paths(iter.into_iter().collect())
    }
}

impl IntoIterator for Paths {
    type Item = AttributePath;
    type IntoIter = std::collections::btree_set::IntoIter<AttributePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
