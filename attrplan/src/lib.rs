//! Attribute plan modification for resource providers.
//!
//! During planning, the framework proposes a new state for a resource. Each
//! attribute of the schema may carry [`PlanModifier`](modifier::PlanModifier)s
//! that adjust that proposal: fill in known values, flag the resource for
//! replacement, report diagnostics or stash private state for the apply phase.
//! [`walk::modify_resource_plan`] runs all of them over the schema tree.

pub mod builtin;
pub mod diag;
pub mod modifier;
pub mod path;
pub mod private_state;
pub mod schema;
#[cfg(test)]
mod testing;
pub mod value;
pub mod walk;

pub use diag::{Diagnostic, Diagnostics, Severity};
pub use modifier::{ModifierRequest, ModifierResponse, PlanModifier, ReplaceDecision};
pub use path::{AttributePath, Paths};
pub use private_state::PrivateState;
pub use schema::{Attribute, NestingMode, Schema};
pub use value::{Type, Value};
pub use walk::{modify_attribute_plan, modify_resource_plan};
