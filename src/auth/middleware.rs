//! Authentication & Authorization Gates
//! Mission: Resolve bearer tokens to live accounts, then check roles

use crate::{
    auth::{
        models::{AuthContext, Role},
        AuthState,
    },
    error::ApiError,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::{debug, error};
use uuid::Uuid;

/// Resolve a bearer token to an authenticated identity.
///
/// Every failure is reported as [`ApiError::Unauthenticated`]; the specific
/// cause is only logged. The role comes from storage, not from the token, so
/// a role switch takes effect without re-issuing tokens.
pub async fn authenticate(state: &AuthState, token: Option<&str>) -> Result<AuthContext, ApiError> {
    let token = token.ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt_handler.verify(token).map_err(|e| {
        debug!("Token rejected: {:#}", e);
        ApiError::Unauthenticated
    })?;

    let account_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthenticated)?;

    let account = state
        .accounts
        .find_by_id(account_id)
        .await
        .map_err(|e| {
            error!("Account lookup failed during authentication: {:#}", e);
            ApiError::Unauthenticated
        })?
        .ok_or(ApiError::Unauthenticated)?;

    if claims.ver != account.session_epoch {
        debug!("Token for account {} predates a password change", account.id);
        return Err(ApiError::Unauthenticated);
    }

    Ok(AuthContext {
        account_id: account.id,
        role: account.role,
    })
}

/// Auth middleware: attaches an [`AuthContext`] to the request or rejects with 401
pub async fn auth_middleware(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    let ctx = authenticate(&state, token).await?;

    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// Role gate. Pure: checks the attached identity against the allowed roles.
pub fn authorize<'a>(
    ctx: Option<&'a AuthContext>,
    allowed: &[Role],
) -> Result<&'a AuthContext, ApiError> {
    let ctx = ctx.ok_or(ApiError::Unauthenticated)?;
    if !allowed.contains(&ctx.role) {
        return Err(ApiError::Forbidden);
    }
    Ok(ctx)
}

/// Host-or-admin gate, layered inside [`auth_middleware`] so it runs before
/// the handler reads the body.
pub async fn require_host(req: Request, next: Next) -> Result<Response, ApiError> {
    authorize(req.extensions().get::<AuthContext>(), &[Role::Host, Role::Admin])?;
    Ok(next.run(req).await)
}

/// Owner-or-admin check for mutating a resource owned by `owner_id`.
pub fn authorize_owner(ctx: &AuthContext, owner_id: Uuid) -> Result<(), ApiError> {
    if ctx.account_id == owner_id || ctx.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
