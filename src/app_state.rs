//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error, PasswordHash,
    auth::{TokenConfig, TokenKeys},
    db::initialize,
    pagination::PaginationConfig,
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The keys and lifetimes for signing access and refresh tokens.
    pub token_keys: TokenKeys,

    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,

    /// The config that controls how to page lists of data.
    pub pagination_config: PaginationConfig,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        token_config: &TokenConfig,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            token_keys: TokenKeys::new(token_config),
            password_cost: PasswordHash::DEFAULT_COST,
            pagination_config,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Use a different bcrypt cost, e.g. a low cost to keep tests fast.
    pub fn with_password_cost(mut self, password_cost: u32) -> Self {
        self.password_cost = password_cost;
        self
    }
}
