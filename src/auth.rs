use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;

use crate::{errors::AppError, AppState};

/// Caller role granted by the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Users,
    Administrators,
}

impl Role {
    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

pub fn ensure_role(caller: Role, required: Role) -> Result<(), AppError> {
    if caller.allows(required) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "forbidden",
            "operation requires the Administrators role",
        ))
    }
}

pub async fn require_bearer_token(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(auth)) = auth_header else {
        return Err(AppError::unauthorized(
            "missing_token",
            "missing authorization header",
        ));
    };

    let role = if state
        .administrators_token
        .as_deref()
        .is_some_and(|token| token == auth.token())
    {
        Role::Administrators
    } else if auth.token() == state.users_token.as_ref() {
        Role::Users
    } else {
        return Err(AppError::unauthorized(
            "invalid_token",
            "invalid bearer token",
        ));
    };

    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}
