use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// Django permission codenames the client gates on
pub const VIEW_TASK: &str = "tasks.view_task";
pub const ADD_TASK: &str = "tasks.add_task";
pub const CHANGE_TASK: &str = "tasks.change_task";
pub const DELETE_TASK: &str = "tasks.delete_task";
pub const VIEW_USER: &str = "auth.view_user";
pub const ADD_USER: &str = "auth.add_user";
pub const CHANGE_USER: &str = "auth.change_user";
pub const DELETE_USER: &str = "auth.delete_user";

/// Permission strings attached to a route or capability. Satisfied when
/// every entry is held; an empty requirement is always satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequirement(Vec<String>);

impl PermissionRequirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Required permissions absent from `held`
    pub fn missing<'a>(&'a self, held: &BTreeSet<String>) -> Vec<&'a str> {
        self.iter().filter(|perm| !held.contains(*perm)).collect()
    }
}

/// The single permission predicate. Routes, navigation and capabilities all
/// go through here.
pub fn has_permissions(held: &BTreeSet<String>, requirement: &PermissionRequirement) -> bool {
    requirement.iter().all(|perm| held.contains(perm))
}

/// Mutating actions exposed by the task and user screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateTask,
    EditTask,
    DeleteTask,
    CreateUser,
    EditUser,
    DeleteUser,
}

impl Capability {
    pub fn requirement(self) -> PermissionRequirement {
        let perm = match self {
            Capability::CreateTask => ADD_TASK,
            Capability::EditTask => CHANGE_TASK,
            Capability::DeleteTask => DELETE_TASK,
            Capability::CreateUser => ADD_USER,
            Capability::EditUser => CHANGE_USER,
            Capability::DeleteUser => DELETE_USER,
        };
        PermissionRequirement::all_of([perm])
    }

    pub fn allowed(self, held: &BTreeSet<String>) -> bool {
        has_permissions(held, &self.requirement())
    }
}
