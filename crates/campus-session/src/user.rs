//! The authenticated user.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Action, Grant, Role};

/// The signed-in user, as returned by login and refresh.
///
/// Owned by the [`Session`](crate::Session): replaced wholesale on
/// login/refresh and dropped on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default, deserialize_with = "roles_from_names")]
    pub roles: BTreeSet<Role>,
    /// Grants attached directly to the user, on top of role-implied ones.
    #[serde(default, alias = "permissions")]
    pub grants: BTreeSet<Grant>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
            roles: BTreeSet::new(),
            grants: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    #[must_use]
    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.insert(grant);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Direct grants ∪ role-implied grants.
    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.grants.iter().any(|g| g.allows(resource, action))
            || self.roles.iter().any(|r| r.allows(resource, action))
    }

    /// The full effective grant set, expanded.
    pub fn effective_grants(&self) -> BTreeSet<Grant> {
        let mut all = self.grants.clone();
        all.extend(self.roles.iter().flat_map(Role::implied_grants));
        all
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Unknown role names are dropped rather than failing the whole payload:
/// a role the client doesn't understand grants nothing.
fn roles_from_names<'de, D>(deserializer: D) -> Result<BTreeSet<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .iter()
        .filter_map(|name| {
            let role = Role::resolve(name);
            if role.is_none() {
                tracing::warn!(role = %name, "ignoring unknown role");
            }
            role
        })
        .collect())
}
