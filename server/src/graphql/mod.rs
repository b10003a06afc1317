use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject,
};
use platform_api::{ApiError, ApiResult};
use platform_authz::{
    AssignmentRecord, Permission, PermissionContext, PermissionDecision, PermissionEngine, Role,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    check::{self, CheckRequest, CheckResponse},
    config::Environment,
    roster::RosterSource,
};

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

#[derive(Clone)]
pub struct GraphqlData {
    pub engine: &'static PermissionEngine,
    pub environment: Environment,
    pub roster: RosterSource,
}

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(data)
        .finish()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Every permission name, in catalogue order.
    #[instrument(name = "graphql.catalogue", skip_all)]
    async fn catalogue(&self) -> Vec<String> {
        Permission::ALL.iter().map(|p| p.to_string()).collect()
    }

    #[instrument(name = "graphql.role_grants", skip(self, ctx))]
    async fn role_grants(
        &self,
        ctx: &Context<'_>,
        role: String,
    ) -> async_graphql::Result<RoleGrantsPayload> {
        let data = ctx.data::<GraphqlData>()?;
        let role = role
            .parse::<Role>()
            .map_err(|err| ApiError::from(err).extend())?;
        Ok(RoleGrantsPayload::new(data.engine, role))
    }

    #[instrument(name = "graphql.check", skip_all)]
    async fn check(
        &self,
        ctx: &Context<'_>,
        input: CheckInput,
    ) -> async_graphql::Result<DecisionPayload> {
        let data = ctx.data::<GraphqlData>()?;
        let request = CheckRequest::from(input);
        let context = data.roster.resolve(request.context.clone()).await;
        let response = check::evaluate(data.engine, data.environment, &request, context.as_ref())
            .map_err(|err| err.extend())?;
        Ok(DecisionPayload::from(response))
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RoleGrantsPayload {
    pub role: String,
    pub permissions: Vec<String>,
    /// Permissions that also need a matching roster entry.
    pub contextual: Vec<String>,
}

impl RoleGrantsPayload {
    fn new(engine: &PermissionEngine, role: Role) -> Self {
        Self {
            role: role.to_string(),
            permissions: engine
                .grants()
                .grants(role)
                .into_iter()
                .map(|p| p.to_string())
                .collect(),
            contextual: engine
                .contextual()
                .contextual_for(role)
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct AssignmentInput {
    pub actor_id: String,
    pub class_id: String,
    pub subject_id: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct ContextInput {
    pub actor_id: Option<String>,
    pub class_id: Option<String>,
    pub subject_id: Option<String>,
    pub student_id: Option<String>,
    pub roster: Option<Vec<AssignmentInput>>,
}

#[derive(Clone, Debug, InputObject)]
pub struct CheckInput {
    /// Omit while the caller's role is still loading.
    pub role: Option<String>,
    pub permission: Option<String>,
    pub any: Option<Vec<String>>,
    pub all: Option<Vec<String>>,
    pub context: Option<ContextInput>,
    pub explain: Option<bool>,
}

impl From<ContextInput> for PermissionContext {
    fn from(input: ContextInput) -> Self {
        PermissionContext {
            class_id: input.class_id.map(Into::into),
            subject_id: input.subject_id.map(Into::into),
            student_id: input.student_id.map(Into::into),
            actor_id: input.actor_id.map(Into::into),
            roster: input.roster.map(|rows| {
                rows.into_iter()
                    .map(|row| {
                        AssignmentRecord::new(
                            row.actor_id,
                            row.class_id,
                            row.subject_id.map(Into::into),
                        )
                    })
                    .collect()
            }),
        }
    }
}

impl From<CheckInput> for CheckRequest {
    fn from(input: CheckInput) -> Self {
        CheckRequest {
            role: input.role,
            permission: input.permission,
            any: input.any,
            all: input.all,
            context: input.context.map(Into::into),
            explain: input.explain.unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuditEntry {
    pub permission: String,
    pub granted: bool,
    pub reason: String,
}

impl From<PermissionDecision> for AuditEntry {
    fn from(decision: PermissionDecision) -> Self {
        Self {
            permission: decision.permission.to_string(),
            granted: decision.granted,
            reason: decision.reason.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DecisionPayload {
    pub granted: bool,
    pub reason: Option<String>,
    pub permission: Option<String>,
    pub pending: bool,
    pub audit: Vec<AuditEntry>,
}

impl From<CheckResponse> for DecisionPayload {
    fn from(response: CheckResponse) -> Self {
        Self {
            granted: response.granted,
            reason: response.reason.map(|r| r.as_str().to_string()),
            permission: response.permission.map(|p| p.to_string()),
            pending: response.pending,
            audit: response
                .audit
                .unwrap_or_default()
                .into_iter()
                .map(AuditEntry::from)
                .collect(),
        }
    }
}
