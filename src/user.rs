//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash, db::is_unique_violation};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address used to log in, stored in lower case.
    pub email: String,
    /// The display name.
    pub name: String,
    /// The user's password hash.
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: PasswordHash::from_stored(raw_password_hash),
        created_at: row.get(4)?,
    })
}

/// Create and insert a new user into the database.
///
/// The caller should pass an already normalised (lower case) email address.
///
/// # Errors
///
/// Returns a [Error::DuplicateEmail] if the email is taken, or [Error::SqlError] if another
/// SQL related error occurred.
pub fn create_user(
    email: &str,
    name: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (email, name, password, created_at) VALUES (?1, ?2, ?3, ?4)",
            (email, name, password_hash.as_ref(), created_at),
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateEmail(email.to_owned())
            } else {
                error.into()
            }
        })?;

    Ok(User {
        id: UserID::new(connection.last_insert_rowid()),
        email: email.to_owned(),
        name: name.to_owned(),
        password_hash,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password, created_at FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the email address.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password, created_at FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        user::{UserID, create_user, get_user_by_email, get_user_by_id},
    };

    use super::create_user_table;

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn test_hash() -> PasswordHash {
        PasswordHash::from_stored("hunter2".to_owned())
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();

        let inserted_user = create_user("foo@bar.baz", "Foo", test_hash(), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.password_hash, test_hash());
    }

    #[test]
    fn insert_fails_on_duplicate_email() {
        let db_connection = get_db_connection();
        create_user("foo@bar.baz", "Foo", test_hash(), &db_connection).unwrap();

        let result = create_user("foo@bar.baz", "Other Foo", test_hash(), &db_connection);

        assert_eq!(result, Err(Error::DuplicateEmail("foo@bar.baz".to_owned())));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_by_id_and_email_return_same_user() {
        let db_connection = get_db_connection();
        let test_user = create_user("foo@bar.baz", "Foo", test_hash(), &db_connection).unwrap();

        let by_id = get_user_by_id(test_user.id, &db_connection).unwrap();
        let by_email = get_user_by_email("foo@bar.baz", &db_connection).unwrap();

        assert_eq!(by_id.id, test_user.id);
        assert_eq!(by_email.id, test_user.id);
        assert_eq!(by_id.name, "Foo");
    }

    #[test]
    fn serialized_user_omits_password() {
        let db_connection = get_db_connection();
        let test_user = create_user("foo@bar.baz", "Foo", test_hash(), &db_connection).unwrap();

        let json = serde_json::to_value(&test_user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "foo@bar.baz");
    }
}
