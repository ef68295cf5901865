//! Project DTOs.
//!
//! # Design
//! These mirror the service's project schema but only carry the fields the
//! projects wrapper reads or writes. Unknown fields in responses are ignored,
//! so the real service's much larger payload deserializes too. The mock
//! server defines its own copies; integration tests catch drift.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParamValue for Visibility {
    fn into_param(self) -> Option<String> {
        Some(self.as_str().to_string())
    }
}

/// A project as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
    #[serde(default)]
    pub archived: bool,
}

/// Fields for creating a project. Only `name` is required.
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub name: String,
    pub path: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

impl CreateProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Fields for editing a project. Unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub archived: Option<bool>,
}

/// Filters and paging for listing projects.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub visibility: Option<Visibility>,
    pub archived: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}
