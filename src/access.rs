//! Role and identity checks run at the top of every protected service call.
//!
//! Authentication (a valid access cookie) is settled by the `AuthUser`
//! extractor and fails with 401. The checks here run afterwards against the
//! current user record and fail with 403, so a role change or deletion takes
//! effect on the next request rather than when the token expires.

use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any existing user.
    Authenticated,
    /// A user holding exactly this role.
    Role(Role),
}

pub async fn require(st: &AppState, caller: Uuid, requirement: Requirement) -> Result<User, AppError> {
    let user = st.users.find_user(caller).await?;

    match (requirement, user) {
        (Requirement::Authenticated, Some(user)) => Ok(user),
        (Requirement::Authenticated, None) => Err(AppError::not_found("User not found")),
        (Requirement::Role(role), Some(user)) if user.role == role => Ok(user),
        (Requirement::Role(role), user) => {
            warn!(
                user_id = %caller,
                required = %role,
                actual = ?user.map(|u| u.role),
                "access denied"
            );
            Err(AppError::forbidden(format!(
                "Access forbidden: {}s only",
                role
            )))
        }
    }
}

pub async fn require_role(st: &AppState, caller: Uuid, role: Role) -> Result<User, AppError> {
    require(st, caller, Requirement::Role(role)).await
}
