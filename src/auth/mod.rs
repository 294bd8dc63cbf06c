//! Callers and the permission gate that guards every mutation
//!
//! A mutation does not inherit permission behavior; it is handed a
//! [`PermissionGate`] built from [`Permission`] checks. The caller is an
//! [`Actor`] placed into the GraphQL request data.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::MutationError;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Actor {
    pub user_id: Option<i32>,
    roles: BTreeSet<String>,
    scopes: BTreeSet<String>,
    is_system: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn system() -> Self {
        Self {
            is_system: true,
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_system || self.user_id.is_some()
    }
}

/// A single permission check evaluated against the caller.
pub trait Permission: Send + Sync {
    fn has_permission(&self, actor: &Actor) -> bool;

    /// Message reported when the check fails.
    fn message(&self) -> String {
        "You do not have permission to perform this action.".to_string()
    }
}

pub struct AllowAny;

impl Permission for AllowAny {
    fn has_permission(&self, _actor: &Actor) -> bool {
        true
    }
}

pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
    fn has_permission(&self, actor: &Actor) -> bool {
        actor.is_authenticated()
    }

    fn message(&self) -> String {
        "Authentication credentials were not provided.".to_string()
    }
}

pub struct HasRole(pub String);

impl Permission for HasRole {
    fn has_permission(&self, actor: &Actor) -> bool {
        actor.is_system() || actor.has_role(&self.0)
    }

    fn message(&self) -> String {
        format!("role '{}' required", self.0)
    }
}

pub struct HasScope(pub String);

impl Permission for HasScope {
    fn has_permission(&self, actor: &Actor) -> bool {
        actor.is_system() || actor.has_scope(&self.0)
    }

    fn message(&self) -> String {
        format!("scope '{}' required", self.0)
    }
}

/// Serializable form of the built-in permission checks.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSpec {
    AllowAny,
    Authenticated,
    Role(String),
    Scope(String),
}

impl PermissionSpec {
    pub fn into_permission(self) -> Arc<dyn Permission> {
        match self {
            PermissionSpec::AllowAny => Arc::new(AllowAny),
            PermissionSpec::Authenticated => Arc::new(IsAuthenticated),
            PermissionSpec::Role(role) => Arc::new(HasRole(role)),
            PermissionSpec::Scope(scope) => Arc::new(HasScope(scope)),
        }
    }
}

/// Every check must pass; an empty gate lets everyone through.
#[derive(Clone, Default)]
pub struct PermissionGate {
    permissions: Vec<Arc<dyn Permission>>,
}

impl PermissionGate {
    pub fn new(permissions: Vec<Arc<dyn Permission>>) -> Self {
        Self { permissions }
    }

    pub fn push(&mut self, permission: Arc<dyn Permission>) {
        self.permissions.push(permission);
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn check(&self, actor: &Actor) -> Result<(), MutationError> {
        for permission in &self.permissions {
            if !permission.has_permission(actor) {
                return Err(MutationError::PermissionDenied(permission.message()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("permissions", &self.permissions.len())
            .finish()
    }
}
