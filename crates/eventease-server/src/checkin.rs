use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, TimeZone, Utc};
use qrcode::EcLevel;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tracing::info;

use entity::{attendance, event, registration, user};

use crate::auth::require_organizer;
use crate::error::ApiError;
use crate::qr;
use crate::state::AppState;
use crate::util::{ts_to_rfc3339, uuid_v4};

/// Minimum pixel dimensions of the rendered QR image.
const QR_MIN_DIMENSIONS: u32 = 512;

/// Error-correction level for check-in codes. Medium survives typical
/// screen-to-camera scanning without inflating the symbol.
const QR_EC_LEVEL: EcLevel = EcLevel::M;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedQr {
    /// Base64-encoded PNG.
    pub qr_image: String,
    pub registration_id: String,
    pub event_id: String,
    pub event_title: String,
    /// RFC 3339.
    pub registration_date: String,
    /// RFC 3339. Tokens live for 24 hours from issuance.
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfirmation {
    pub attendance_id: String,
    pub registration_id: String,
    pub attendee_name: String,
    pub event_title: String,
    /// RFC 3339.
    pub marked_at: String,
    /// Id of the organizer who marked attendance.
    pub marked_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkConfirmation {
    pub attendance_id: String,
    pub registration_id: String,
    pub present: bool,
    /// RFC 3339.
    pub marked_at: String,
    pub marked_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub registration_id: String,
    pub user_id: String,
    pub attendee_name: String,
    pub status: String,
    pub present: Option<bool>,
    /// RFC 3339, when a ledger record exists.
    pub marked_at: Option<String>,
    pub notes: Option<String>,
}

/// Issue a signed, time-bound QR token for the requester's own registration.
///
/// Stateless: nothing is persisted, and the token stays valid until its
/// embedded expiry. Replay protection lives entirely in the ledger write of
/// [`redeem_token`].
pub async fn issue_token(
    state: &AppState,
    requester: &user::Model,
    registration_id: &str,
    now: i64,
) -> Result<IssuedQr, ApiError> {
    let Some(reg) = registration::Entity::find_by_id(registration_id)
        .one(&state.db)
        .await?
    else {
        return Err(ApiError::RegistrationNotFound);
    };

    // A foreign registration reads as not-found so the endpoint cannot be
    // used to probe other users' registration ids.
    if reg.user_id != requester.id {
        return Err(ApiError::RegistrationNotFound);
    }

    let Some(evt) = event::Entity::find_by_id(&reg.event_id).one(&state.db).await? else {
        return Err(ApiError::EventNotFound);
    };

    let (token, claims) = state
        .signer
        .issue(&reg.id, &reg.event_id, &reg.user_id, now)?;

    let png = qr::encode_png(&token, QR_MIN_DIMENSIONS, QR_EC_LEVEL)?;

    Ok(IssuedQr {
        qr_image: BASE64_STANDARD.encode(png),
        registration_id: reg.id,
        event_id: evt.id,
        event_title: evt.title,
        registration_date: ts_to_rfc3339(reg.registered_at),
        expires_at: ts_to_rfc3339(claims.exp),
    })
}

/// Redeem a scanned token: verify it, authorize the scanning organizer, gate
/// on the event date and registration status, then commit an idempotent
/// present-mark to the ledger.
pub async fn redeem_token(
    state: &AppState,
    scanner: &user::Model,
    qr_data: &str,
    notes: Option<String>,
    now: i64,
) -> Result<ScanConfirmation, ApiError> {
    require_organizer(scanner)?;

    let qr_data = qr_data.trim();
    if qr_data.is_empty() {
        return Err(ApiError::InvalidQrToken);
    }

    let claims = state.signer.verify(qr_data, now)?;

    let Some(evt) = event::Entity::find_by_id(&claims.event_id)
        .one(&state.db)
        .await?
    else {
        return Err(ApiError::EventNotFound);
    };

    // An organizer may only check in attendees of their own events.
    if evt.organizer_id != scanner.id {
        return Err(ApiError::EventNotAuthorized);
    }

    if starts_after_today(evt.starts_at, now) {
        return Err(ApiError::FutureEvent);
    }

    let Some(reg) = registration::Entity::find_by_id(&claims.registration_id)
        .one(&state.db)
        .await?
    else {
        return Err(ApiError::RegistrationNotFound);
    };

    // The claims carry both ids; a registration that moved or a stitched
    // token must not pass.
    if reg.event_id != evt.id || reg.user_id != claims.user_id {
        return Err(ApiError::InvalidQrToken);
    }

    if !reg.is_registered() {
        return Err(ApiError::InvalidRegistrationStatus);
    }

    let Some(attendee) = user::Entity::find_by_id(&reg.user_id).one(&state.db).await? else {
        return Err(ApiError::RegistrationNotFound);
    };

    let record = mark_present(&state.db, &reg.id, &scanner.id, notes, now).await?;

    info!(
        registration_id = %record.registration_id,
        event_id = %evt.id,
        marked_by = %scanner.id,
        "attendance recorded"
    );

    Ok(ScanConfirmation {
        attendance_id: record.id,
        registration_id: record.registration_id,
        attendee_name: attendee.name,
        event_title: evt.title,
        marked_at: ts_to_rfc3339(record.marked_at),
        marked_by: record.marked_by,
    })
}

/// Manual organizer override of a ledger record.
///
/// Marking absent is always allowed and re-opens the scan path; marking
/// present follows the same registration-status rule as scanning. There is
/// no temporal gate: overrides are an out-of-band correction tool.
pub async fn mark_manual(
    state: &AppState,
    organizer: &user::Model,
    registration_id: &str,
    present: bool,
    notes: Option<String>,
    now: i64,
) -> Result<MarkConfirmation, ApiError> {
    require_organizer(organizer)?;

    let Some(reg) = registration::Entity::find_by_id(registration_id)
        .one(&state.db)
        .await?
    else {
        return Err(ApiError::RegistrationNotFound);
    };

    let Some(evt) = event::Entity::find_by_id(&reg.event_id).one(&state.db).await? else {
        return Err(ApiError::EventNotFound);
    };

    if evt.organizer_id != organizer.id {
        return Err(ApiError::EventNotAuthorized);
    }

    if present && !reg.is_registered() {
        return Err(ApiError::InvalidRegistrationStatus);
    }

    let existing = attendance::Entity::find()
        .filter(attendance::Column::RegistrationId.eq(&reg.id))
        .one(&state.db)
        .await?;

    let record = match existing {
        Some(rec) => override_record(&state.db, rec, present, &organizer.id, notes, now).await?,
        None => {
            match insert_record(&state.db, &reg.id, present, &organizer.id, notes.clone(), now)
                .await
            {
                Ok(rec) => rec,
                // Lost a race against a concurrent first write; the override
                // still wins by updating whatever landed.
                Err(ApiError::AlreadyPresent) => {
                    let Some(rec) = attendance::Entity::find()
                        .filter(attendance::Column::RegistrationId.eq(&reg.id))
                        .one(&state.db)
                        .await?
                    else {
                        return Err(ApiError::Database(DbErr::RecordNotFound(
                            "attendance record vanished after insert conflict".to_owned(),
                        )));
                    };
                    override_record(&state.db, rec, present, &organizer.id, notes, now).await?
                }
                Err(e) => return Err(e),
            }
        }
    };

    info!(
        registration_id = %record.registration_id,
        present = record.present,
        marked_by = %organizer.id,
        "attendance overridden"
    );

    Ok(MarkConfirmation {
        attendance_id: record.id,
        registration_id: record.registration_id,
        present: record.present,
        marked_at: ts_to_rfc3339(record.marked_at),
        marked_by: record.marked_by,
        notes: record.notes,
    })
}

/// Attendance roster for one event: its registrations joined with their
/// ledger state.
pub async fn event_roster(
    state: &AppState,
    organizer: &user::Model,
    event_id: &str,
) -> Result<Vec<RosterEntry>, ApiError> {
    require_organizer(organizer)?;

    let Some(evt) = event::Entity::find_by_id(event_id).one(&state.db).await? else {
        return Err(ApiError::EventNotFound);
    };

    if evt.organizer_id != organizer.id {
        return Err(ApiError::EventNotAuthorized);
    }

    let mut regs = registration::Entity::find()
        .filter(registration::Column::EventId.eq(&evt.id))
        .all(&state.db)
        .await?;
    regs.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));

    let reg_ids: Vec<String> = regs.iter().map(|r| r.id.clone()).collect();
    let user_ids: Vec<String> = regs.iter().map(|r| r.user_id.clone()).collect();

    let records: HashMap<String, attendance::Model> = attendance::Entity::find()
        .filter(attendance::Column::RegistrationId.is_in(reg_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|rec| (rec.registration_id.clone(), rec))
        .collect();

    let names: HashMap<String, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let roster = regs
        .into_iter()
        .map(|reg| {
            let record = records.get(&reg.id);
            RosterEntry {
                attendee_name: names.get(&reg.user_id).cloned().unwrap_or_default(),
                registration_id: reg.id,
                user_id: reg.user_id,
                status: reg.status,
                present: record.map(|r| r.present),
                marked_at: record.map(|r| ts_to_rfc3339(r.marked_at)),
                notes: record.and_then(|r| r.notes.clone()),
            }
        })
        .collect();

    Ok(roster)
}

/// True when the event's start date (day granularity, UTC) is after today.
fn starts_after_today(starts_at: i64, now: i64) -> bool {
    match (day_of(starts_at), day_of(now)) {
        (Some(event_day), Some(today)) => event_day > today,
        // Unrepresentable timestamps never pass the gate.
        _ => true,
    }
}

fn day_of(ts: i64) -> Option<NaiveDate> {
    Utc.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive())
}

/// The idempotent ledger write behind a scan.
///
/// The read-then-write pair is race-safe: creation goes through a
/// conflict-guarded insert on the unique registration index, and the
/// absent-to-present flip is a conditional update on `present = false`.
/// Of two concurrent redemptions, exactly one commits; the other observes
/// `AlreadyPresent`.
async fn mark_present(
    db: &DatabaseConnection,
    registration_id: &str,
    organizer_id: &str,
    notes: Option<String>,
    now: i64,
) -> Result<attendance::Model, ApiError> {
    let existing = attendance::Entity::find()
        .filter(attendance::Column::RegistrationId.eq(registration_id))
        .one(db)
        .await?;

    match existing {
        // Sole replay guard for the stateless token: re-scans are rejected,
        // never re-applied.
        Some(rec) if rec.present => Err(ApiError::AlreadyPresent),

        // Previously marked absent by a manual override; flip back while
        // refreshing who marked it and when.
        Some(rec) => {
            let updated = attendance::Entity::update_many()
                .col_expr(attendance::Column::Present, Expr::value(true))
                .col_expr(attendance::Column::MarkedAt, Expr::value(now))
                .col_expr(attendance::Column::MarkedBy, Expr::value(organizer_id))
                .col_expr(attendance::Column::Notes, Expr::value(notes.clone()))
                .filter(attendance::Column::Id.eq(&rec.id))
                .filter(attendance::Column::Present.eq(false))
                .exec(db)
                .await?;

            if updated.rows_affected == 0 {
                return Err(ApiError::AlreadyPresent);
            }

            Ok(attendance::Model {
                id: rec.id,
                registration_id: rec.registration_id,
                present: true,
                marked_at: now,
                marked_by: organizer_id.to_owned(),
                notes,
            })
        }

        None => insert_record(db, registration_id, true, organizer_id, notes, now).await,
    }
}

async fn insert_record(
    db: &DatabaseConnection,
    registration_id: &str,
    present: bool,
    organizer_id: &str,
    notes: Option<String>,
    now: i64,
) -> Result<attendance::Model, ApiError> {
    let record = attendance::Model {
        id: uuid_v4(),
        registration_id: registration_id.to_owned(),
        present,
        marked_at: now,
        marked_by: organizer_id.to_owned(),
        notes,
    };

    let active = attendance::ActiveModel {
        id: Set(record.id.clone()),
        registration_id: Set(record.registration_id.clone()),
        present: Set(record.present),
        marked_at: Set(record.marked_at),
        marked_by: Set(record.marked_by.clone()),
        notes: Set(record.notes.clone()),
    };

    let insert = attendance::Entity::insert(active)
        .on_conflict(
            OnConflict::column(attendance::Column::RegistrationId)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

    match insert {
        Ok(_) => Ok(record),
        // Another writer created the record between our read and this
        // insert; this caller is deterministically the loser.
        Err(DbErr::RecordNotInserted) => Err(ApiError::AlreadyPresent),
        Err(e) => Err(e.into()),
    }
}

async fn override_record(
    db: &DatabaseConnection,
    rec: attendance::Model,
    present: bool,
    organizer_id: &str,
    notes: Option<String>,
    now: i64,
) -> Result<attendance::Model, ApiError> {
    attendance::Entity::update_many()
        .col_expr(attendance::Column::Present, Expr::value(present))
        .col_expr(attendance::Column::MarkedAt, Expr::value(now))
        .col_expr(attendance::Column::MarkedBy, Expr::value(organizer_id))
        .col_expr(attendance::Column::Notes, Expr::value(notes.clone()))
        .filter(attendance::Column::Id.eq(&rec.id))
        .exec(db)
        .await?;

    Ok(attendance::Model {
        id: rec.id,
        registration_id: rec.registration_id,
        present,
        marked_at: now,
        marked_by: organizer_id.to_owned(),
        notes,
    })
}
