#![allow(dead_code)]

use entity::{event, registration, session, user};
use eventease_server::state::AppState;
use eventease_server::token::TokenSigner;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

pub const SIGNING_SECRET: &[u8] = b"test-signing-secret";

/// Fresh in-memory database with the full schema applied.
pub async fn setup_state() -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1);

    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    AppState::new(db, TokenSigner::new(SIGNING_SECRET.to_vec()))
}

pub async fn insert_user(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
    role: &str,
) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_owned()),
        email: Set(format!("{id}@example.test")),
        name: Set(name.to_owned()),
        role: Set(role.to_owned()),
        created_at: Set(0),
        updated_at: Set(0),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_event(
    db: &DatabaseConnection,
    id: &str,
    organizer_id: &str,
    title: &str,
    starts_at: i64,
) -> event::Model {
    event::ActiveModel {
        id: Set(id.to_owned()),
        organizer_id: Set(organizer_id.to_owned()),
        title: Set(title.to_owned()),
        location: Set(None),
        starts_at: Set(starts_at),
        created_at: Set(0),
        updated_at: Set(0),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_registration(
    db: &DatabaseConnection,
    id: &str,
    event_id: &str,
    user_id: &str,
    status: &str,
    registered_at: i64,
) -> registration::Model {
    registration::ActiveModel {
        id: Set(id.to_owned()),
        event_id: Set(event_id.to_owned()),
        user_id: Set(user_id.to_owned()),
        status: Set(status.to_owned()),
        registered_at: Set(registered_at),
    }
    .insert(db)
    .await
    .unwrap()
}

/// Seed a bearer session the way the authentication collaborator would.
pub async fn insert_session(
    db: &DatabaseConnection,
    user_id: &str,
    token: &str,
    expires_at: i64,
) -> session::Model {
    session::ActiveModel {
        id: Set(format!("sess-{user_id}")),
        user_id: Set(user_id.to_owned()),
        token: Set(token.to_owned()),
        created_at: Set(0),
        expires_at: Set(expires_at),
    }
    .insert(db)
    .await
    .unwrap()
}
