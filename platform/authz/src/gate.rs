//! Consumer-facing gate over the engine.
//!
//! A gate receives one of three request shapes. When a caller supplies more
//! than one, precedence is single permission, then any-list, then all-list;
//! the others are ignored. [`GateRequest::validate`] reports such requests
//! without side effects so the adapter layer can decide whether to warn.
//! While the caller's role is still loading the gate is [`GateOutcome::Pending`],
//! which renders as denied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    AuthzError, AuthzResult, Permission, PermissionContext, PermissionDecision, PermissionEngine,
    Role,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateShape<'a> {
    Single(Permission),
    Any(&'a [Permission]),
    All(&'a [Permission]),
}

impl GateShape<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            GateShape::Single(_) => "permission",
            GateShape::Any(_) => "any",
            GateShape::All(_) => "all",
        }
    }

    pub fn permissions(&self) -> &[Permission] {
        match self {
            GateShape::Single(permission) => std::slice::from_ref(permission),
            GateShape::Any(list) | GateShape::All(list) => *list,
        }
    }
}

/// `None` means the list was not supplied. A supplied empty list is
/// invalid input, see [`GateRequest::check_lists`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GateRequest {
    #[serde(default)]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub any: Option<Vec<Permission>>,
    #[serde(default)]
    pub all: Option<Vec<Permission>>,
}

impl GateRequest {
    pub fn single(permission: Permission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    pub fn any_of(permissions: impl Into<Vec<Permission>>) -> Self {
        Self {
            any: Some(permissions.into()),
            ..Self::default()
        }
    }

    pub fn all_of(permissions: impl Into<Vec<Permission>>) -> Self {
        Self {
            all: Some(permissions.into()),
            ..Self::default()
        }
    }

    fn supplied(&self) -> Vec<GateShape<'_>> {
        let mut shapes = Vec::with_capacity(3);
        if let Some(permission) = self.permission {
            shapes.push(GateShape::Single(permission));
        }
        if let Some(list) = &self.any {
            shapes.push(GateShape::Any(list));
        }
        if let Some(list) = &self.all {
            shapes.push(GateShape::All(list));
        }
        shapes
    }

    /// Rejects a supplied but empty `any` or `all` list, whichever shape
    /// precedence would pick.
    pub fn check_lists(&self) -> AuthzResult<()> {
        if self.any.as_ref().is_some_and(Vec::is_empty) {
            return Err(AuthzError::EmptyPermissionSet { mode: "any" });
        }
        if self.all.as_ref().is_some_and(Vec::is_empty) {
            return Err(AuthzError::EmptyPermissionSet { mode: "all" });
        }
        Ok(())
    }

    /// The shape that will be evaluated.
    pub fn shape(&self) -> Option<GateShape<'_>> {
        self.supplied().into_iter().next()
    }

    pub fn validate(&self) -> Option<GateDiagnostic> {
        let supplied = self.supplied();
        match supplied.as_slice() {
            [] => Some(GateDiagnostic::NoShape),
            [_] => None,
            [evaluated, ..] => Some(GateDiagnostic::MultipleShapes {
                supplied: supplied.iter().map(GateShape::name).collect(),
                evaluated: evaluated.name(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDiagnostic {
    NoShape,
    MultipleShapes {
        supplied: Vec<&'static str>,
        evaluated: &'static str,
    },
}

impl fmt::Display for GateDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDiagnostic::NoShape => f.write_str("gate received no permission, any or all"),
            GateDiagnostic::MultipleShapes {
                supplied,
                evaluated,
            } => write!(
                f,
                "gate received {}; only `{evaluated}` is evaluated",
                supplied.join(", ")
            ),
        }
    }
}

/// Role resolution state on the caller's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Ready(Role),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Pending,
    Decided(PermissionDecision),
}

impl GateOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateOutcome::Decided(decision) if decision.granted)
    }

    pub fn decision(&self) -> Option<&PermissionDecision> {
        match self {
            GateOutcome::Pending => None,
            GateOutcome::Decided(decision) => Some(decision),
        }
    }

    /// Runs `granted` or `denied`. Pending runs `denied`.
    pub fn render<T>(self, granted: impl FnOnce() -> T, denied: impl FnOnce() -> T) -> T {
        if self.is_granted() { granted() } else { denied() }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Gate<'e> {
    engine: &'e PermissionEngine,
}

impl<'e> Gate<'e> {
    pub fn new(engine: &'e PermissionEngine) -> Self {
        Self { engine }
    }

    pub fn evaluate(
        &self,
        state: GateState,
        request: &GateRequest,
        context: Option<&PermissionContext>,
    ) -> AuthzResult<GateOutcome> {
        request.check_lists()?;
        let shape = request.shape().ok_or(AuthzError::NoRequestShape)?;
        let GateState::Ready(role) = state else {
            return Ok(GateOutcome::Pending);
        };
        let decision = match shape {
            GateShape::Single(permission) => self.engine.decide(role, permission, context),
            GateShape::Any(list) => self.engine.decide_any(role, list, context)?,
            GateShape::All(list) => self.engine.decide_all(role, list, context)?,
        };
        Ok(GateOutcome::Decided(decision))
    }
}

impl Default for Gate<'static> {
    fn default() -> Self {
        Self::new(PermissionEngine::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssignmentRecord, DecisionReason};

    #[test]
    fn single_permission_wins_over_lists() {
        let request = GateRequest {
            permission: Some(Permission::PublishResults),
            any: Some(vec![Permission::ViewGrades]),
            all: Some(vec![Permission::ViewDashboard]),
        };
        assert_eq!(request.shape(), Some(GateShape::Single(Permission::PublishResults)));

        let outcome = Gate::default()
            .evaluate(GateState::Ready(Role::Teacher), &request, None)
            .unwrap();
        let decision = outcome.decision().unwrap();
        assert_eq!(decision.permission, Permission::PublishResults);
        assert!(!outcome.is_granted());
    }

    #[test]
    fn any_list_wins_over_all_list() {
        let request = GateRequest {
            permission: None,
            any: Some(vec![Permission::ViewGrades]),
            all: Some(vec![Permission::ManageSchools]),
        };
        let outcome = Gate::default()
            .evaluate(GateState::Ready(Role::Student), &request, None)
            .unwrap();
        assert!(outcome.is_granted());
    }

    #[test]
    fn validate_reports_every_supplied_shape() {
        let request = GateRequest {
            permission: Some(Permission::ViewGrades),
            any: Some(vec![Permission::ViewFees]),
            all: None,
        };
        assert_eq!(
            request.validate(),
            Some(GateDiagnostic::MultipleShapes {
                supplied: vec!["permission", "any"],
                evaluated: "permission",
            })
        );
        assert_eq!(GateRequest::single(Permission::ViewFees).validate(), None);
        assert_eq!(GateRequest::default().validate(), Some(GateDiagnostic::NoShape));
    }

    #[test]
    fn pending_renders_denied() {
        let outcome = Gate::default()
            .evaluate(GateState::Pending, &GateRequest::single(Permission::ViewDashboard), None)
            .unwrap();
        assert_eq!(outcome, GateOutcome::Pending);
        assert_eq!(outcome.render(|| "shown", || "hidden"), "hidden");
    }

    #[test]
    fn supplied_empty_lists_are_invalid_even_beside_another_shape() {
        let request = GateRequest {
            permission: None,
            any: Some(Vec::new()),
            all: Some(vec![Permission::ViewGrades]),
        };
        let err = Gate::default()
            .evaluate(GateState::Ready(Role::Teacher), &request, None)
            .unwrap_err();
        assert_eq!(err, AuthzError::EmptyPermissionSet { mode: "any" });

        let err = Gate::default()
            .evaluate(GateState::Pending, &GateRequest::all_of(Vec::<Permission>::new()), None)
            .unwrap_err();
        assert_eq!(err, AuthzError::EmptyPermissionSet { mode: "all" });

        let absent = GateRequest {
            all: Some(vec![Permission::ViewGrades]),
            ..GateRequest::default()
        };
        assert_eq!(absent.check_lists(), Ok(()));
        assert_eq!(absent.validate(), None);
    }

    #[test]
    fn empty_request_is_invalid() {
        let err = Gate::default()
            .evaluate(GateState::Ready(Role::SuperAdmin), &GateRequest::default(), None)
            .unwrap_err();
        assert_eq!(err, AuthzError::NoRequestShape);
    }

    #[test]
    fn all_list_carries_context_to_every_member() {
        let ctx = PermissionContext::new()
            .actor("T7")
            .class("12")
            .roster(vec![AssignmentRecord::new("T7", "12", None)]);
        let request = GateRequest::all_of([Permission::MarkAttendance, Permission::ViewAttendance]);
        let outcome = Gate::default()
            .evaluate(GateState::Ready(Role::Teacher), &request, Some(&ctx))
            .unwrap();
        assert!(outcome.is_granted());
        assert_eq!(outcome.render(|| 1, || 0), 1);

        let outcome = Gate::default()
            .evaluate(GateState::Ready(Role::Teacher), &request, None)
            .unwrap();
        assert_eq!(
            outcome.decision().map(|d| d.reason),
            Some(DecisionReason::ContextMissing)
        );
    }
}
