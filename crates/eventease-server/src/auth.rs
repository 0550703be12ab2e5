use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use entity::{session, user};

use crate::error::ApiError;
use crate::state::AppState;
use crate::util::now_ts;

/// The caller resolved from a bearer session token.
///
/// Sessions are issued by the authentication collaborator; this extractor
/// only validates them against the `sessions` table and loads the owning
/// user. It is trusted fully downstream.
pub struct CurrentUser(pub user::Model);

pub fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;

    let raw = raw.trim();
    let (scheme, rest) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim();
    if token.is_empty() {
        return None;
    }

    Some(token.to_string())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(parts) else {
            return Err(ApiError::NotAuthenticated);
        };

        let Some(sess) = session::Entity::find()
            .filter(session::Column::Token.eq(&token))
            .one(&state.db)
            .await?
        else {
            return Err(ApiError::NotAuthenticated);
        };

        if sess.expires_at <= now_ts() {
            return Err(ApiError::NotAuthenticated);
        }

        let Some(u) = user::Entity::find_by_id(sess.user_id).one(&state.db).await? else {
            return Err(ApiError::NotAuthenticated);
        };

        Ok(CurrentUser(u))
    }
}

/// Gate for organizer-only operations.
pub fn require_organizer(u: &user::Model) -> Result<(), ApiError> {
    if u.is_organizer() {
        Ok(())
    } else {
        Err(ApiError::InsufficientPermissions)
    }
}
