//! Postgres-backed [`UserStore`].

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Postgres, Row, Transaction};
use tracing::{info_span, instrument, warn, Instrument};
use uuid::Uuid;

use super::{
    model::{NewUser, User},
    store::{StoreError, UserStore},
};
use crate::password::PasswordHasher;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const UNIQUE_VIOLATION: &str = "23505";
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
    hasher: PasswordHasher,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// Create the schema if missing. Idempotent; run once at startup.
    ///
    /// # Errors
    /// Returns the database error if the DDL fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "CREATE");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn fetch_one_by(&self, query: &'static str, bind: Bind<'_>) -> Result<User, StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let query = sqlx::query(query);
        let query = match bind {
            Bind::Id(id) => query.bind(id),
            Bind::Email(email) => query.bind(email),
        };
        match query.fetch_optional(&self.pool).instrument(span).await {
            Ok(Some(row)) => Ok(user_from_row(&row)?),
            Ok(None) => Err(StoreError::NotFound),
            Err(err) if is_undefined_table(&err) => Err(StoreError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}

enum Bind<'a> {
    Id(Uuid),
    Email(&'a str),
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn exists(&self, email: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS exists";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        match sqlx::query(query)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
        {
            Ok(row) => Ok(row.try_get("exists")?),
            Err(err) if is_undefined_table(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let NewUser {
            id,
            username,
            email,
            password,
        } = user;

        // Hash before checking out a connection so the slow KDF does not hold one.
        let password_hash = match password {
            Some(password) => Some(self.hasher.hash_blocking(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        match insert_row(&mut tx, id, &username, &email, password_hash.as_deref()).await {
            Ok(user) => {
                tx.commit().await?;
                Ok(user)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Failed to roll back insert transaction: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.fetch_one_by(
            "SELECT id, username, email, password_hash FROM users WHERE id = $1",
            Bind::Id(id),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.fetch_one_by(
            "SELECT id, username, email, password_hash FROM users WHERE email = $1",
            Bind::Email(email),
        )
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

async fn insert_row(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    username: &str,
    email: &str,
    password_hash: Option<&str>,
) -> Result<User, StoreError> {
    let query = r"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password_hash
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await
    {
        Ok(row) => Ok(user_from_row(&row)?),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
        Err(err) => Err(err.into()),
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
    })
}

fn has_sqlstate(err: &sqlx::Error, sqlstate: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == sqlstate),
        _ => false,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, UNIQUE_VIOLATION)
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    has_sqlstate(err, UNDEFINED_TABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(TestDbError { code: Some(code) }))
    }

    #[test]
    fn unique_violation_matches_sqlstate() {
        assert!(is_unique_violation(&db_error("23505")));
        assert!(!is_unique_violation(&db_error("42P01")));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn undefined_table_matches_sqlstate() {
        assert!(is_undefined_table(&db_error("42P01")));
        assert!(!is_undefined_table(&db_error("23505")));
        assert!(!is_undefined_table(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn schema_declares_unique_columns() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(SCHEMA_SQL.contains("username      TEXT NOT NULL UNIQUE"));
        assert!(SCHEMA_SQL.contains("email         TEXT NOT NULL UNIQUE"));
    }
}
