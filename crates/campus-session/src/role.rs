//! Canonical roles, the legacy alias table, and role-implied grants.
//!
//! Role names arrive from the backend as strings. They are resolved to a
//! [`Role`] exactly once, when the user payload is decoded; from then on
//! every check compares enum values. Older deployments still hand out
//! retired names (`accountant`, `storekeeper`, ...), which resolve through
//! [`LEGACY_ALIASES`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Action, Grant, grant::ANY_RESOURCE};

/// The closed set of roles the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Registrar,
    Teacher,
    Bursar,
    StoreManager,
    SalesAgent,
    Auditor,
}

/// Retired role names and the canonical role each maps to.
pub const LEGACY_ALIASES: &[(&str, Role)] = &[
    ("accountant", Role::Bursar),
    ("finance_officer", Role::Bursar),
    ("administrator", Role::Admin),
    ("super_admin", Role::Admin),
    ("storekeeper", Role::StoreManager),
    ("inventory_manager", Role::StoreManager),
    ("lecturer", Role::Teacher),
    ("instructor", Role::Teacher),
    ("salesperson", Role::SalesAgent),
    ("inspector", Role::Auditor),
];

const CRUD: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::Delete];
const CRUD_EXPORT: &[Action] = &[
    Action::Create,
    Action::Read,
    Action::Update,
    Action::Delete,
    Action::Export,
];
const CRUD_APPROVE: &[Action] = &[
    Action::Create,
    Action::Read,
    Action::Update,
    Action::Delete,
    Action::Approve,
];
const READ: &[Action] = &[Action::Read];
const READ_EXPORT: &[Action] = &[Action::Read, Action::Export];
const WRITE: &[Action] = &[Action::Create, Action::Read, Action::Update];

impl Role {
    pub const ALL: [Role; 7] = [
        Self::Admin,
        Self::Registrar,
        Self::Teacher,
        Self::Bursar,
        Self::StoreManager,
        Self::SalesAgent,
        Self::Auditor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Registrar => "registrar",
            Self::Teacher => "teacher",
            Self::Bursar => "bursar",
            Self::StoreManager => "store_manager",
            Self::SalesAgent => "sales_agent",
            Self::Auditor => "auditor",
        }
    }

    /// Resolves a canonical or legacy role name (case-insensitive).
    ///
    /// Returns `None` for names the client doesn't know.
    pub fn resolve(name: &str) -> Option<Role> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(name))
            .or_else(|| {
                LEGACY_ALIASES
                    .iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                    .map(|(_, role)| *role)
            })
    }

    /// Resource/action table implied by holding this role.
    pub fn implied(&self) -> &'static [(&'static str, &'static [Action])] {
        match self {
            Self::Admin => &[(ANY_RESOURCE, &Action::ALL)],
            Self::Registrar => &[
                ("students", CRUD_EXPORT),
                ("courses", CRUD),
                ("enrollments", CRUD_APPROVE),
                ("classes", CRUD),
                ("reports", READ_EXPORT),
            ],
            Self::Teacher => &[
                ("students", READ),
                ("courses", READ),
                ("classes", READ),
                ("grades", WRITE),
                ("attendance", WRITE),
            ],
            Self::Bursar => &[
                ("invoices", &Action::ALL),
                ("payments", &[
                    Action::Create,
                    Action::Read,
                    Action::Update,
                    Action::Approve,
                    Action::Export,
                ]),
                ("fees", CRUD),
                ("students", READ),
                ("reports", READ_EXPORT),
            ],
            Self::StoreManager => &[
                ("products", CRUD_EXPORT),
                ("inventory", &Action::ALL),
                ("purchases", CRUD_APPROVE),
                ("suppliers", CRUD),
                ("sales", READ_EXPORT),
            ],
            Self::SalesAgent => &[
                ("sales", WRITE),
                ("customers", WRITE),
                ("products", READ),
                ("invoices", READ),
            ],
            Self::Auditor => &[(ANY_RESOURCE, READ_EXPORT)],
        }
    }

    /// Whether this role alone allows `action` on `resource`.
    pub fn allows(&self, resource: &str, action: Action) -> bool {
        self.implied().iter().any(|(res, actions)| {
            (*res == ANY_RESOURCE || *res == resource) && actions.contains(&action)
        })
    }

    /// The implied table expanded into individual grants.
    pub fn implied_grants(&self) -> Vec<Grant> {
        self.implied()
            .iter()
            .flat_map(|(res, actions)| actions.iter().map(|a| Grant::new(*res, *a)))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
