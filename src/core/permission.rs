//! Permission requirements, fallback chains and the permission gate

use crate::core::auth::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation classes permissions are declared for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Save,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::View => write!(f, "view"),
            Operation::Save => write!(f, "save"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Ordered set of capability tags; satisfied by holding any one of them
///
/// An empty requirement is unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PermissionRequirement {
    tags: Vec<String>,
}

impl PermissionRequirement {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for tag in tags.into_iter().map(Into::into) {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        Self { tags: unique }
    }

    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl From<Vec<String>> for PermissionRequirement {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<PermissionRequirement> for Vec<String> {
    fn from(requirement: PermissionRequirement) -> Self {
        requirement.tags
    }
}

/// The permission gate
///
/// Unrestricted requirements always pass; otherwise an authenticated principal
/// must hold at least one of the required capability tags.
pub fn authorize(principal: Option<&Principal>, requirement: &PermissionRequirement) -> bool {
    if requirement.is_unrestricted() {
        return true;
    }
    let Some(principal) = principal else {
        return false;
    };
    requirement
        .tags()
        .iter()
        .any(|tag| principal.has_capability(tag))
}

/// Requirements declared by one entity type, per operation class
///
/// `None` means "not declared" and lets the fallback chain continue, while an
/// explicitly empty list declares the operation unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<PermissionRequirement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<PermissionRequirement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<PermissionRequirement>,
}

impl PermissionTable {
    pub fn declared(&self, operation: Operation) -> Option<&PermissionRequirement> {
        match operation {
            Operation::View => self.view.as_ref(),
            Operation::Save => self.save.as_ref(),
            Operation::Delete => self.delete.as_ref(),
        }
    }

    pub fn declare(&mut self, operation: Operation, requirement: PermissionRequirement) {
        let slot = match operation {
            Operation::View => &mut self.view,
            Operation::Save => &mut self.save,
            Operation::Delete => &mut self.delete,
        };
        *slot = Some(requirement);
    }

    /// First declared requirement along `chain`, unrestricted if none is
    pub fn resolve(&self, chain: &[Operation]) -> PermissionRequirement {
        chain
            .iter()
            .find_map(|operation| self.declared(*operation))
            .cloned()
            .unwrap_or_default()
    }
}

fn default_view_chain() -> Vec<Operation> {
    vec![Operation::View]
}

fn default_save_chain() -> Vec<Operation> {
    vec![Operation::Save, Operation::View]
}

fn default_delete_chain() -> Vec<Operation> {
    vec![Operation::Delete, Operation::Save, Operation::View]
}

/// Which declarations are consulted, in order, for each operation class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChains {
    #[serde(default = "default_view_chain")]
    pub view: Vec<Operation>,

    #[serde(default = "default_save_chain")]
    pub save: Vec<Operation>,

    #[serde(default = "default_delete_chain")]
    pub delete: Vec<Operation>,
}

impl Default for PermissionChains {
    fn default() -> Self {
        Self {
            view: default_view_chain(),
            save: default_save_chain(),
            delete: default_delete_chain(),
        }
    }
}

impl PermissionChains {
    pub fn chain(&self, operation: Operation) -> &[Operation] {
        match operation {
            Operation::View => &self.view,
            Operation::Save => &self.save,
            Operation::Delete => &self.delete,
        }
    }

    pub fn with_chain(mut self, operation: Operation, chain: Vec<Operation>) -> Self {
        match operation {
            Operation::View => self.view = chain,
            Operation::Save => self.save = chain,
            Operation::Delete => self.delete = chain,
        }
        self
    }
}
