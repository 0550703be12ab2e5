use axum::extract::{Path, State};
use axum::Json;

use crate::auth::CurrentUser;
use crate::checkin::{self, IssuedQr};
use crate::error::ApiError;
use crate::state::AppState;
use crate::util::now_ts;

/// GET /api/registrations/{id}/qr
///
/// Issues a fresh 24-hour check-in token for the caller's own registration
/// and returns it as a base64 PNG plus display metadata. Does not mutate
/// anything; every call yields a new, equally valid token.
pub async fn handle_registration_qr(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(registration_id): Path<String>,
) -> Result<Json<IssuedQr>, ApiError> {
    let issued = checkin::issue_token(&state, &user, &registration_id, now_ts()).await?;
    Ok(Json(issued))
}
