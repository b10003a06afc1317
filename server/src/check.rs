//! Wire-level permission checks shared by REST, GraphQL and the CLI.

use platform_api::{ApiError, ApiResult};
use platform_authz::{
    DecisionReason, Gate, GateDiagnostic, GateOutcome, GateRequest, GateState, Permission,
    PermissionContext, PermissionDecision, PermissionEngine, Role,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Environment;

/// `POST /check` body. Names stay strings so unknown ones become 400s.
///
/// A `null` role means the caller's role is still being resolved; the
/// check is then pending and reported as not granted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CheckRequest {
    pub role: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub any: Option<Vec<String>>,
    #[serde(default)]
    pub all: Option<Vec<String>>,
    #[serde(default)]
    pub context: Option<PermissionContext>,
    #[serde(default)]
    pub explain: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckResponse {
    pub granted: bool,
    pub reason: Option<DecisionReason>,
    pub permission: Option<Permission>,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<Vec<PermissionDecision>>,
}

impl CheckRequest {
    fn gate_request(&self) -> ApiResult<GateRequest> {
        let permission = self
            .permission
            .as_deref()
            .map(str::parse::<Permission>)
            .transpose()?;
        Ok(GateRequest {
            permission,
            any: parse_optional_list(self.any.as_deref())?,
            all: parse_optional_list(self.all.as_deref())?,
        })
    }

    fn gate_state(&self) -> ApiResult<GateState> {
        match self.role.as_deref() {
            None => Ok(GateState::Pending),
            Some(name) => Ok(GateState::Ready(name.parse::<Role>()?)),
        }
    }
}

fn parse_optional_list(names: Option<&[String]>) -> ApiResult<Option<Vec<Permission>>> {
    Ok(names.map(Permission::parse_list).transpose()?)
}

/// Evaluates `request` against an already resolved context.
pub fn evaluate(
    engine: &PermissionEngine,
    environment: Environment,
    request: &CheckRequest,
    context: Option<&PermissionContext>,
) -> ApiResult<CheckResponse> {
    let gate_request = request.gate_request()?;
    let state = request.gate_state()?;
    gate_request.check_lists()?;

    match gate_request.validate() {
        Some(GateDiagnostic::NoShape) => {
            return Err(ApiError::invalid("one of permission, any or all is required"));
        }
        Some(diagnostic) if !environment.is_production() => {
            warn!(%diagnostic, "ambiguous permission check");
        }
        _ => {}
    }

    let outcome = Gate::new(engine).evaluate(state, &gate_request, context)?;
    let audit = match (request.explain, state, gate_request.shape()) {
        (true, GateState::Ready(role), Some(shape)) => {
            Some(engine.audit(role, shape.permissions(), context))
        }
        _ => None,
    };

    Ok(match outcome {
        GateOutcome::Pending => CheckResponse {
            granted: false,
            reason: None,
            permission: None,
            pending: true,
            audit,
        },
        GateOutcome::Decided(decision) => CheckResponse {
            granted: decision.granted,
            reason: Some(decision.reason),
            permission: Some(decision.permission),
            pending: false,
            audit,
        },
    })
}

#[cfg(test)]
mod tests {
    use platform_authz::AssignmentRecord;

    use super::*;

    fn request(role: &str) -> CheckRequest {
        CheckRequest {
            role: Some(role.into()),
            ..CheckRequest::default()
        }
    }

    fn run(request: &CheckRequest, context: Option<&PermissionContext>) -> ApiResult<CheckResponse> {
        evaluate(
            PermissionEngine::standard(),
            Environment::Development,
            request,
            context,
        )
    }

    #[test]
    fn contextual_grant_is_reported() {
        let ctx = PermissionContext::new()
            .actor("T7")
            .class("12")
            .roster(vec![AssignmentRecord::new("T7", "12", None)]);
        let req = CheckRequest {
            permission: Some("attendance:mark".into()),
            ..request("teacher")
        };
        let response = run(&req, Some(&ctx)).unwrap();
        assert!(response.granted);
        assert_eq!(response.reason, Some(DecisionReason::GrantedContextual));
        assert_eq!(response.permission, Some(Permission::MarkAttendance));
        assert!(response.audit.is_none());
    }

    #[test]
    fn unknown_names_are_invalid_input() {
        let req = CheckRequest {
            permission: Some("grades:burn".into()),
            ..request("teacher")
        };
        assert!(matches!(run(&req, None), Err(ApiError::InvalidInput(_))));

        let req = CheckRequest {
            any: Some(vec!["grades:view".into(), "nope".into()]),
            ..request("teacher")
        };
        assert!(matches!(run(&req, None), Err(ApiError::InvalidInput(_))));

        let req = CheckRequest {
            permission: Some("grades:view".into()),
            ..request("janitor")
        };
        assert!(matches!(run(&req, None), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn missing_shape_is_invalid_input() {
        assert!(matches!(run(&request("teacher"), None), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn supplied_empty_list_is_invalid_input() {
        let req = CheckRequest {
            any: Some(Vec::new()),
            all: Some(vec!["grades:view".into()]),
            ..request("teacher")
        };
        assert!(matches!(run(&req, None), Err(ApiError::InvalidInput(_))));

        let pending = CheckRequest {
            role: None,
            all: Some(Vec::new()),
            ..CheckRequest::default()
        };
        assert!(matches!(run(&pending, None), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn single_permission_takes_precedence() {
        let req = CheckRequest {
            permission: Some("results:publish".into()),
            any: Some(vec!["grades:view".into()]),
            ..request("teacher")
        };
        let response = run(&req, None).unwrap();
        assert!(!response.granted);
        assert_eq!(response.permission, Some(Permission::PublishResults));
    }

    #[test]
    fn pending_role_is_not_granted() {
        let req = CheckRequest {
            role: None,
            permission: Some("dashboard:view".into()),
            explain: true,
            ..CheckRequest::default()
        };
        let response = run(&req, None).unwrap();
        assert!(response.pending);
        assert!(!response.granted);
        assert_eq!(response.reason, None);
        assert!(response.audit.is_none());
    }

    #[test]
    fn explain_audits_every_member_of_the_evaluated_shape() {
        let req = CheckRequest {
            all: Some(vec![
                "grades:view".into(),
                "grades:edit".into(),
                "results:publish".into(),
            ]),
            explain: true,
            ..request("teacher")
        };
        let response = run(&req, None).unwrap();
        assert_eq!(response.reason, Some(DecisionReason::ContextMissing));
        let audit = response.audit.unwrap();
        assert_eq!(audit.len(), 3);
        assert_eq!(audit[2].reason, DecisionReason::RoleDenied);
    }

    #[test]
    fn request_parses_from_json() {
        let req: CheckRequest = serde_json::from_str(
            r#"{"role":"teacher","any":["grades:edit"],"context":{"actor_id":"T1","class_id":"5"}}"#,
        )
        .unwrap();
        assert_eq!(req.any, Some(vec!["grades:edit".to_string()]));
        assert_eq!(req.all, None);
        assert_eq!(
            req.context.and_then(|c| c.class_id).map(|c| c.to_string()),
            Some("5".to_string())
        );
    }
}
