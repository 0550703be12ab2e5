use axum::extract::{Path, State};
use axum::Json;

use crate::auth::CurrentUser;
use crate::checkin::{self, RosterEntry};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/events/{id}/attendance
///
/// Attendance roster for one of the caller's own events: every registration
/// with its ledger state, ordered by registration time.
pub async fn handle_event_attendance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    let roster = checkin::event_roster(&state, &user, &event_id).await?;
    Ok(Json(roster))
}
