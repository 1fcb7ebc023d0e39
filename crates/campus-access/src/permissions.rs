//! Permission checks over a session snapshot.
//!
//! Everything here is fail-closed: a signed-out or expired session is
//! denied every check, whatever the requirement says.

use campus_session::{Action, Role, Session};
use serde::{Deserialize, Serialize};

/// How the individual checks of a [`Requirement`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Every supplied check must pass.
    All,
    /// At least one supplied check must pass.
    #[default]
    Any,
}

/// What a caller must hold.
///
/// A permission check needs both a resource and an action; a resource
/// given without an action is not a check and is ignored. With no checks
/// at all, the requirement is just "signed in".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requirement {
    resource: Option<String>,
    action: Option<Action>,
    role: Option<RoleCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RoleCheck {
    Known(Role),
    /// A name that resolves to no role. Never held.
    Unknown,
}

impl Requirement {
    /// No checks: satisfied by any authenticated session.
    pub fn signed_in() -> Self {
        Self::default()
    }

    pub fn permission(resource: impl Into<String>, action: Action) -> Self {
        Self::default().with_permission(resource, action)
    }

    pub fn role(role: Role) -> Self {
        Self::default().with_role(role)
    }

    #[must_use]
    pub fn with_permission(mut self, resource: impl Into<String>, action: Action) -> Self {
        self.resource = Some(resource.into());
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(RoleCheck::Known(role));
        self
    }

    /// Role by name, legacy aliases included.
    #[must_use]
    pub fn with_role_named(mut self, name: &str) -> Self {
        self.role = Some(match Role::resolve(name) {
            Some(role) => RoleCheck::Known(role),
            None => {
                tracing::debug!(role = %name, "requirement names an unknown role");
                RoleCheck::Unknown
            }
        });
        self
    }

    /// Number of checks this requirement actually performs.
    pub fn check_count(&self) -> usize {
        usize::from(self.resource.is_some() && self.action.is_some()) + usize::from(self.role.is_some())
    }
}

/// Answers permission questions about one session snapshot.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    session: Session,
}

impl From<Session> for PermissionEvaluator {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}

impl PermissionEvaluator {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Evaluates `requirement`, combining its checks with `combinator`.
    pub fn evaluate(&self, requirement: &Requirement, combinator: Combinator) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }

        let mut checks = Vec::with_capacity(2);
        if let (Some(resource), Some(action)) = (&requirement.resource, requirement.action) {
            checks.push(self.session.has_permission(resource, action));
        }
        match &requirement.role {
            Some(RoleCheck::Known(role)) => checks.push(self.session.has_role(*role)),
            Some(RoleCheck::Unknown) => checks.push(false),
            None => {}
        }

        if checks.is_empty() {
            return true;
        }
        match combinator {
            Combinator::All => checks.iter().all(|c| *c),
            Combinator::Any => checks.iter().any(|c| *c),
        }
    }

    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.session.has_permission(resource, action)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.session.has_role(role)
    }

    // -- action sugar -------------------------------------------------------

    pub fn can_create(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Create)
    }

    pub fn can_read(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Read)
    }

    pub fn can_update(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Update)
    }

    pub fn can_delete(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Delete)
    }

    pub fn can_approve(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Approve)
    }

    pub fn can_export(&self, resource: &str) -> bool {
        self.has_permission(resource, Action::Export)
    }

    // -- role predicates ----------------------------------------------------

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_registrar(&self) -> bool {
        self.has_role(Role::Registrar)
    }

    pub fn is_teacher(&self) -> bool {
        self.has_role(Role::Teacher)
    }

    pub fn is_bursar(&self) -> bool {
        self.has_role(Role::Bursar)
    }

    /// The retired "accountant" role, now [`Role::Bursar`].
    #[deprecated(note = "accountant was renamed; use `is_bursar`")]
    pub fn is_accountant(&self) -> bool {
        self.session.has_role_named("accountant")
    }

    pub fn is_store_manager(&self) -> bool {
        self.has_role(Role::StoreManager)
    }

    pub fn is_sales_agent(&self) -> bool {
        self.has_role(Role::SalesAgent)
    }

    pub fn is_auditor(&self) -> bool {
        self.has_role(Role::Auditor)
    }
}

/// A reusable requirement that decides between content and a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionGate {
    pub requirement: Requirement,
    pub combinator: Combinator,
}

impl PermissionGate {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            combinator: Combinator::default(),
        }
    }

    #[must_use]
    pub fn requiring_all(mut self) -> Self {
        self.combinator = Combinator::All;
        self
    }

    pub fn allows(&self, evaluator: &PermissionEvaluator) -> bool {
        evaluator.evaluate(&self.requirement, self.combinator)
    }

    /// Builds `children` when allowed and `fallback` otherwise. Only the
    /// chosen branch runs.
    pub fn render<T>(
        &self,
        evaluator: &PermissionEvaluator,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T {
        if self.allows(evaluator) {
            children()
        } else {
            fallback()
        }
    }

    /// `Some(children())` when allowed.
    pub fn render_or_hide<T>(
        &self,
        evaluator: &PermissionEvaluator,
        children: impl FnOnce() -> T,
    ) -> Option<T> {
        self.allows(evaluator).then(children)
    }
}
