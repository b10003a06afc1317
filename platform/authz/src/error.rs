use thiserror::Error;

/// Structurally invalid evaluator input.
///
/// A denial is never an `AuthzError`: the engine returns denials as
/// [`PermissionDecision`](crate::PermissionDecision) values. These variants
/// signal a caller bug (an unknown name, an empty permission list) and must
/// surface loudly instead of being folded into `granted = false`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unknown permission `{0}`")]
    UnknownPermission(String),
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("`{mode}` evaluation requires at least one permission")]
    EmptyPermissionSet { mode: &'static str },
    #[error("no permission, any-list or all-list supplied")]
    NoRequestShape,
}

pub type AuthzResult<T> = Result<T, AuthzError>;
