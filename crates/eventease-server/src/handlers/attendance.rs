use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::checkin::{self, MarkConfirmation, ScanConfirmation};
use crate::error::ApiError;
use crate::state::AppState;
use crate::util::now_ts;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub qr_data: String,
    pub notes: Option<String>,
}

/// POST /api/attendance/scan
///
/// Redeems a scanned QR token for the calling organizer. Succeeds at most
/// once per registration; a re-scan of a present attendee is rejected with
/// `ALREADY_PRESENT` rather than re-marked.
pub async fn handle_scan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ScanRequest>,
) -> Result<(StatusCode, Json<ScanConfirmation>), ApiError> {
    let confirmation =
        checkin::redeem_token(&state, &user, &body.qr_data, body.notes, now_ts()).await?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub registration_id: String,
    pub present: bool,
    pub notes: Option<String>,
}

/// POST /api/attendance/mark
///
/// Manual organizer override: set an attendee present or absent regardless
/// of scanning. Marking absent re-opens the scan path for that registration.
pub async fn handle_mark(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<MarkRequest>,
) -> Result<Json<MarkConfirmation>, ApiError> {
    let confirmation = checkin::mark_manual(
        &state,
        &user,
        &body.registration_id,
        body.present,
        body.notes,
        now_ts(),
    )
    .await?;

    Ok(Json(confirmation))
}
