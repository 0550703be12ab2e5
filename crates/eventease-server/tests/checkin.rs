mod common;

use common::{insert_event, insert_registration, insert_user, setup_state};
use entity::{attendance, registration, user};
use eventease_server::checkin;
use eventease_server::error::ApiError;
use eventease_server::token::CHECK_IN_TOKEN_TTL_SECS;
use eventease_server::util::ts_to_rfc3339;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

// 2026-08-15 13:20:00 UTC.
const NOW: i64 = 1_786_800_000;

async fn find_record(
    db: &sea_orm::DatabaseConnection,
    registration_id: &str,
) -> Option<attendance::Model> {
    attendance::Entity::find()
        .filter(attendance::Column::RegistrationId.eq(registration_id))
        .one(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn issue_token_returns_qr_and_metadata() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let issued = checkin::issue_token(&state, &attendee, "reg-1", NOW)
        .await
        .unwrap();

    assert_eq!(issued.registration_id, "reg-1");
    assert_eq!(issued.event_id, "evt-1");
    assert_eq!(issued.event_title, "RustConf");
    assert_eq!(issued.registration_date, ts_to_rfc3339(NOW - 90_000));
    assert_eq!(
        issued.expires_at,
        ts_to_rfc3339(NOW + CHECK_IN_TOKEN_TTL_SECS)
    );
    assert!(!issued.qr_image.is_empty());

    // Nothing persisted by issuance.
    assert!(find_record(db, "reg-1").await.is_none());
}

#[tokio::test]
async fn issue_token_hides_foreign_and_unknown_registrations() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    let other = insert_user(db, "att-2", "Bob", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    assert!(matches!(
        checkin::issue_token(&state, &other, "reg-1", NOW).await,
        Err(ApiError::RegistrationNotFound)
    ));
    assert!(matches!(
        checkin::issue_token(&state, &attendee, "no-such-reg", NOW).await,
        Err(ApiError::RegistrationNotFound)
    ));
}

#[tokio::test]
async fn scan_marks_present_then_rejects_duplicate() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    let confirmation =
        checkin::redeem_token(&state, &organizer, &token, Some("front desk".into()), NOW + 60)
            .await
            .unwrap();

    assert_eq!(confirmation.registration_id, "reg-1");
    assert_eq!(confirmation.attendee_name, "Ada");
    assert_eq!(confirmation.event_title, "RustConf");
    assert_eq!(confirmation.marked_by, "org-1");
    assert_eq!(confirmation.marked_at, ts_to_rfc3339(NOW + 60));

    // The token stays structurally valid; only the ledger blocks the replay.
    let duplicate = checkin::redeem_token(&state, &organizer, &token, None, NOW + 120).await;
    assert!(matches!(duplicate, Err(ApiError::AlreadyPresent)));

    // First write wins; nothing about the record changed on the re-scan.
    let record = find_record(db, "reg-1").await.unwrap();
    assert!(record.present);
    assert_eq!(record.marked_at, NOW + 60);
    assert_eq!(record.marked_by, "org-1");
    assert_eq!(record.notes.as_deref(), Some("front desk"));
}

#[tokio::test]
async fn scan_requires_organizer_role() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    let denied = checkin::redeem_token(&state, &attendee, &token, None, NOW + 60).await;
    assert!(matches!(denied, Err(ApiError::InsufficientPermissions)));
}

#[tokio::test]
async fn scan_by_foreign_organizer_is_forbidden() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let other_org = insert_user(db, "org-2", "Oscar", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    // Token validity is irrelevant; ownership decides.
    let denied = checkin::redeem_token(&state, &other_org, &token, None, NOW + 60).await;
    assert!(matches!(denied, Err(ApiError::EventNotAuthorized)));

    assert!(find_record(db, "reg-1").await.is_none());
}

#[tokio::test]
async fn scan_for_future_event_is_gated() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    // Event two days out; the token itself is fresh and valid.
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW + 2 * 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    let denied = checkin::redeem_token(&state, &organizer, &token, None, NOW + 60).await;
    assert!(matches!(denied, Err(ApiError::FutureEvent)));
}

#[tokio::test]
async fn scan_of_cancelled_registration_is_rejected() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_CANCELLED,
        NOW - 90_000,
    )
    .await;

    // Structurally valid, unexpired token for a cancelled registration.
    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    let denied = checkin::redeem_token(&state, &organizer, &token, None, NOW + 60).await;
    assert!(matches!(denied, Err(ApiError::InvalidRegistrationStatus)));
}

#[tokio::test]
async fn expired_and_tampered_tokens_are_rejected() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, claims) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    let expired = checkin::redeem_token(&state, &organizer, &token, None, claims.exp).await;
    assert!(matches!(expired, Err(ApiError::QrTokenExpired)));

    let mut tampered = token.clone().into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let rejected = checkin::redeem_token(&state, &organizer, &tampered, None, NOW + 60).await;
    assert!(matches!(rejected, Err(ApiError::InvalidQrToken)));

    let empty = checkin::redeem_token(&state, &organizer, "  ", None, NOW + 60).await;
    assert!(matches!(empty, Err(ApiError::InvalidQrToken)));
}

#[tokio::test]
async fn manual_absent_record_is_flipped_by_scan() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    // NONE -> ABSENT via manual mark.
    let marked = checkin::mark_manual(
        &state,
        &organizer,
        "reg-1",
        false,
        Some("no-show".into()),
        NOW,
    )
    .await
    .unwrap();
    assert!(!marked.present);

    // ABSENT -> PRESENT via a later successful scan, refreshing the audit
    // fields.
    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();
    checkin::redeem_token(&state, &organizer, &token, Some("arrived late".into()), NOW + 600)
        .await
        .unwrap();

    let record = find_record(db, "reg-1").await.unwrap();
    assert!(record.present);
    assert_eq!(record.marked_at, NOW + 600);
    assert_eq!(record.notes.as_deref(), Some("arrived late"));
}

#[tokio::test]
async fn manual_override_to_absent_reopens_scanning() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();

    checkin::redeem_token(&state, &organizer, &token, None, NOW + 60)
        .await
        .unwrap();

    let replay = checkin::redeem_token(&state, &organizer, &token, None, NOW + 120).await;
    assert!(matches!(replay, Err(ApiError::AlreadyPresent)));

    // PRESENT -> ABSENT is a manual-only transition.
    checkin::mark_manual(&state, &organizer, "reg-1", false, None, NOW + 180)
        .await
        .unwrap();

    // The same still-unexpired token becomes redeemable again.
    let rescanned = checkin::redeem_token(&state, &organizer, &token, None, NOW + 240)
        .await
        .unwrap();
    assert_eq!(rescanned.marked_at, ts_to_rfc3339(NOW + 240));

    // Still exactly one ledger row for the registration.
    let rows = attendance::Entity::find().all(db).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn manual_mark_enforces_ownership_and_status() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let other_org = insert_user(db, "org-2", "Oscar", user::Model::ROLE_ORGANIZER).await;
    let attendee = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &attendee.id,
        registration::Model::STATUS_CANCELLED,
        NOW - 90_000,
    )
    .await;

    let foreign = checkin::mark_manual(&state, &other_org, "reg-1", true, None, NOW).await;
    assert!(matches!(foreign, Err(ApiError::EventNotAuthorized)));

    let cancelled = checkin::mark_manual(&state, &organizer, "reg-1", true, None, NOW).await;
    assert!(matches!(cancelled, Err(ApiError::InvalidRegistrationStatus)));

    // Marking a cancelled registration absent is still allowed.
    let absent = checkin::mark_manual(&state, &organizer, "reg-1", false, None, NOW)
        .await
        .unwrap();
    assert!(!absent.present);
}

#[tokio::test]
async fn roster_lists_registrations_with_ledger_state() {
    let state = setup_state().await;
    let db = &state.db;

    let organizer = insert_user(db, "org-1", "Olive", user::Model::ROLE_ORGANIZER).await;
    let other_org = insert_user(db, "org-2", "Oscar", user::Model::ROLE_ORGANIZER).await;
    let ada = insert_user(db, "att-1", "Ada", user::Model::ROLE_ATTENDEE).await;
    let bob = insert_user(db, "att-2", "Bob", user::Model::ROLE_ATTENDEE).await;
    insert_event(db, "evt-1", &organizer.id, "RustConf", NOW - 86_400).await;
    insert_registration(
        db,
        "reg-1",
        "evt-1",
        &ada.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 90_000,
    )
    .await;
    insert_registration(
        db,
        "reg-2",
        "evt-1",
        &bob.id,
        registration::Model::STATUS_REGISTERED,
        NOW - 80_000,
    )
    .await;

    let (token, _) = state.signer.issue("reg-1", "evt-1", "att-1", NOW).unwrap();
    checkin::redeem_token(&state, &organizer, &token, None, NOW + 60)
        .await
        .unwrap();

    let roster = checkin::event_roster(&state, &organizer, "evt-1")
        .await
        .unwrap();

    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].registration_id, "reg-1");
    assert_eq!(roster[0].attendee_name, "Ada");
    assert_eq!(roster[0].present, Some(true));
    assert_eq!(roster[1].registration_id, "reg-2");
    assert_eq!(roster[1].present, None);

    let foreign = checkin::event_roster(&state, &other_org, "evt-1").await;
    assert!(matches!(foreign, Err(ApiError::EventNotAuthorized)));
}
