use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::token::TokenSigner;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub signer: Arc<TokenSigner>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, signer: TokenSigner) -> Self {
        Self {
            db,
            signer: Arc::new(signer),
        }
    }
}
