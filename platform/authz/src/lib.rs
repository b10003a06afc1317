//! Permission evaluation for the school suite.
//!
//! A decision combines the role's static grant with, for contextual
//! permissions, a check that the acting teacher is assigned to the class
//! (and subject) in question. Evaluation is pure: rosters are passed in by
//! the caller and nothing is cached or mutated.
//!
//! ```
//! use platform_authz::{AssignmentRecord, DecisionReason, Permission, PermissionContext, PermissionEngine, Role};
//!
//! let roster = vec![AssignmentRecord::new("T7", "12", None)];
//! let ctx = PermissionContext::new().actor("T7").class("12").roster(roster);
//! let decision = PermissionEngine::standard().decide(Role::Teacher, Permission::MarkAttendance, Some(&ctx));
//! assert_eq!(decision.reason, DecisionReason::GrantedContextual);
//! ```

mod catalogue;
mod engine;
mod error;
mod gate;
mod grants;
mod qualifier;

pub use catalogue::{Permission, Role};
pub use engine::{DecisionReason, PermissionDecision, PermissionEngine};
pub use error::{AuthzError, AuthzResult};
pub use gate::{Gate, GateDiagnostic, GateOutcome, GateRequest, GateShape, GateState};
pub use grants::{ContextualRules, GrantTable, RoleGrant};
pub use qualifier::{
    ActorId, AssignmentRecord, ClassId, PermissionContext, StudentId, SubjectId, qualifies,
};
