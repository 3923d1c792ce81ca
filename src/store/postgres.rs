//! Postgres-backed store (`sql/schema.sql`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::{
    InsertUserOutcome, NewReview, NewUser, RefreshTokenRecord, ReviewRecord, Store, Transaction,
    UserRecord,
};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, failed_login_attempts, \
                            lock_until, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Unique constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.try_get("role").context("missing role column")?;
    Ok(UserRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse()?,
        failed_login_attempts: row.try_get("failed_login_attempts")?,
        lock_until: row.try_get("lock_until")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn review_from_row(row: &PgRow) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
        id: row.try_get("id")?,
        positive: row.try_get("positive")?,
        negative: row.try_get("negative")?,
        recipient_id: row.try_get("recipient_id")?,
        recipient_name: row.try_get("recipient_name")?,
        author_id: row.try_get("author_id")?,
        author_name: row.try_get("author_name")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await.context("begin transaction")?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn now(&mut self) -> Result<DateTime<Utc>> {
        let query = "SELECT NOW() AS now";
        let row = sqlx::query(query)
            .fetch_one(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to read database clock")?;
        Ok(row.try_get("now")?)
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<InsertUserOutcome> {
        let query = format!(
            "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&mut *self.tx)
            .instrument(db_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(InsertUserOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 FOR UPDATE");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_login_state(
        &mut self,
        id: Uuid,
        failed_login_attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let query = r"
            UPDATE users
            SET failed_login_attempts = $2, lock_until = $3, updated_at = NOW()
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(id)
            .bind(failed_login_attempts)
            .bind(lock_until)
            .execute(&mut *self.tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to update login state")?;
        Ok(())
    }

    async fn list_users_except(&mut self, id: Uuid) -> Result<Vec<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id <> $1 ORDER BY name, email");
        let rows = sqlx::query(&query)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to list users")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_refresh_token(&mut self, token: &RefreshTokenRecord) -> Result<()> {
        let query = r"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
        ";
        sqlx::query(query)
            .bind(token.id)
            .bind(token.user_id)
            .bind(&token.token_hash)
            .bind(token.expires_at)
            .bind(token.revoked)
            .execute(&mut *self.tx)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert refresh token")?;
        Ok(())
    }

    async fn find_refresh_token(&mut self, jti: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT id, user_id, token_hash, expires_at, revoked
            FROM refresh_tokens
            WHERE id = $1
            FOR UPDATE
        ";
        let row = sqlx::query(query)
            .bind(jti)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup refresh token")?;

        row.map(|row| {
            Ok(RefreshTokenRecord {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                token_hash: row.try_get("token_hash")?,
                expires_at: row.try_get("expires_at")?,
                revoked: row.try_get("revoked")?,
            })
        })
        .transpose()
    }

    async fn revoke_refresh_token(&mut self, jti: Uuid) -> Result<bool> {
        let query = "UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE";
        let result = sqlx::query(query)
            .bind(jti)
            .execute(&mut *self.tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to revoke refresh token")?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_user_refresh_tokens(&mut self, user_id: Uuid) -> Result<u64> {
        let query =
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&mut *self.tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to revoke user refresh tokens")?;
        Ok(result.rows_affected())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<ReviewRecord> {
        let query = r"
            WITH inserted AS (
                INSERT INTO reviews (positive, negative, recipient_id, author_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, positive, negative, recipient_id, author_id, created_at
            )
            SELECT i.id, i.positive, i.negative, i.created_at,
                   i.recipient_id, r.name AS recipient_name,
                   i.author_id, a.name AS author_name
            FROM inserted i
            JOIN users r ON r.id = i.recipient_id
            JOIN users a ON a.id = i.author_id
        ";
        let row = sqlx::query(query)
            .bind(&review.positive)
            .bind(&review.negative)
            .bind(review.recipient_id)
            .bind(review.author_id)
            .fetch_one(&mut *self.tx)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert review")?;
        review_from_row(&row)
    }

    async fn list_reviews(&mut self) -> Result<Vec<ReviewRecord>> {
        let query = r"
            SELECT v.id, v.positive, v.negative, v.created_at,
                   v.recipient_id, r.name AS recipient_name,
                   v.author_id, a.name AS author_name
            FROM reviews v
            JOIN users r ON r.id = v.recipient_id
            JOIN users a ON a.id = v.author_id
            ORDER BY v.created_at DESC, v.id
        ";
        let rows = sqlx::query(query)
            .fetch_all(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to list reviews")?;
        rows.iter().map(review_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("commit transaction")
    }
}
