//! Decision engine: role grant lookup followed by the contextual check.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    AuthzError, AuthzResult, ContextualRules, GrantTable, Permission, PermissionContext, Role,
};

static STANDARD: Lazy<PermissionEngine> =
    Lazy::new(|| PermissionEngine::new(GrantTable::standard(), ContextualRules::standard()));

/// Which rule produced a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    RoleDenied,
    ContextMissing,
    ContextDenied,
    GrantedUnconditional,
    GrantedContextual,
}

impl DecisionReason {
    pub fn is_granted(self) -> bool {
        matches!(
            self,
            DecisionReason::GrantedUnconditional | DecisionReason::GrantedContextual
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::RoleDenied => "role-denied",
            DecisionReason::ContextMissing => "context-missing",
            DecisionReason::ContextDenied => "context-denied",
            DecisionReason::GrantedUnconditional => "granted-unconditional",
            DecisionReason::GrantedContextual => "granted-contextual",
        }
    }
}

/// Outcome of one evaluation. `permission` is the member that decided it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermissionDecision {
    pub granted: bool,
    pub reason: DecisionReason,
    pub permission: Permission,
}

impl PermissionDecision {
    fn new(permission: Permission, reason: DecisionReason) -> Self {
        Self {
            granted: reason.is_granted(),
            reason,
            permission,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PermissionEngine {
    grants: GrantTable,
    contextual: ContextualRules,
}

impl PermissionEngine {
    pub fn new(grants: GrantTable, contextual: ContextualRules) -> Self {
        Self { grants, contextual }
    }

    /// Process-wide engine over the school grant and contextual tables.
    pub fn standard() -> &'static PermissionEngine {
        &STANDARD
    }

    pub fn grants(&self) -> &GrantTable {
        &self.grants
    }

    pub fn contextual(&self) -> &ContextualRules {
        &self.contextual
    }

    pub fn decide(
        &self,
        role: Role,
        permission: Permission,
        context: Option<&PermissionContext>,
    ) -> PermissionDecision {
        let reason = self.reason(role, permission, context);
        debug!(
            %role,
            %permission,
            reason = reason.as_str(),
            "permission decided"
        );
        PermissionDecision::new(permission, reason)
    }

    fn reason(
        &self,
        role: Role,
        permission: Permission,
        context: Option<&PermissionContext>,
    ) -> DecisionReason {
        if !self.grants.holds(role, permission) {
            return DecisionReason::RoleDenied;
        }
        if !self.contextual.is_contextual(role, permission) {
            return DecisionReason::GrantedUnconditional;
        }
        match context {
            None => DecisionReason::ContextMissing,
            Some(ctx) if ctx.qualifies() => DecisionReason::GrantedContextual,
            Some(_) => DecisionReason::ContextDenied,
        }
    }

    /// Granted as soon as one member is granted. When none is, the first
    /// member's denial is returned.
    pub fn decide_any(
        &self,
        role: Role,
        permissions: &[Permission],
        context: Option<&PermissionContext>,
    ) -> AuthzResult<PermissionDecision> {
        let (first, rest) = permissions
            .split_first()
            .ok_or(AuthzError::EmptyPermissionSet { mode: "any" })?;
        let first_decision = self.decide(role, *first, context);
        let decision = if first_decision.granted {
            first_decision
        } else {
            rest.iter()
                .map(|permission| self.decide(role, *permission, context))
                .find(|decision| decision.granted)
                .unwrap_or(first_decision)
        };
        trace!(%role, members = permissions.len(), "any-evaluation finished");
        Ok(decision)
    }

    /// Denied as soon as one member is denied. When all are granted, the
    /// last member's grant is returned.
    pub fn decide_all(
        &self,
        role: Role,
        permissions: &[Permission],
        context: Option<&PermissionContext>,
    ) -> AuthzResult<PermissionDecision> {
        let mut decided = None;
        for permission in permissions {
            let decision = self.decide(role, *permission, context);
            decided = Some(decision);
            if !decision.granted {
                break;
            }
        }
        let decision = decided.ok_or(AuthzError::EmptyPermissionSet { mode: "all" })?;
        trace!(%role, members = permissions.len(), "all-evaluation finished");
        Ok(decision)
    }

    /// Decides every member, in order, without short-circuiting.
    pub fn audit(
        &self,
        role: Role,
        permissions: &[Permission],
        context: Option<&PermissionContext>,
    ) -> Vec<PermissionDecision> {
        permissions
            .iter()
            .map(|permission| self.decide(role, *permission, context))
            .collect()
    }

    /// String boundary: unknown names are errors, not denials.
    pub fn decide_named(
        &self,
        role: &str,
        permission: &str,
        context: Option<&PermissionContext>,
    ) -> AuthzResult<PermissionDecision> {
        let role: Role = role.parse()?;
        let permission: Permission = permission.parse()?;
        Ok(self.decide(role, permission, context))
    }
}
