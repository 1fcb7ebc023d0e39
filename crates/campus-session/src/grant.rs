//! Grants: `(resource, action)` pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a grant allows doing to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Approve,
    Export,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Approve,
        Self::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = GrantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GrantParseError(s.to_string()))
    }
}

/// Resource name that matches every resource.
pub const ANY_RESOURCE: &str = "*";

/// Permission to perform `action` on `resource`.
///
/// On the wire a grant is either `{ "resource": "invoices", "action":
/// "approve" }` or the compact string `"invoices:approve"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "GrantRepr")]
pub struct Grant {
    pub resource: String,
    pub action: Action,
}

impl Grant {
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }

    /// Whether this grant covers `action` on `resource`.
    pub fn allows(&self, resource: &str, action: Action) -> bool {
        self.action == action
            && (self.resource == ANY_RESOURCE || self.resource == resource)
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for Grant {
    type Err = GrantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .rsplit_once(':')
            .ok_or_else(|| GrantParseError(s.to_string()))?;
        let resource = resource.trim();
        if resource.is_empty() {
            return Err(GrantParseError(s.to_string()));
        }
        Ok(Self::new(resource, action.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid grant {0:?}")]
pub struct GrantParseError(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum GrantRepr {
    Pair { resource: String, action: Action },
    Compact(String),
}

impl TryFrom<GrantRepr> for Grant {
    type Error = GrantParseError;

    fn try_from(repr: GrantRepr) -> Result<Self, Self::Error> {
        match repr {
            GrantRepr::Pair { resource, action } => Ok(Self { resource, action }),
            GrantRepr::Compact(s) => s.parse(),
        }
    }
}
