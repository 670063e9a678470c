//! # Database Persistence Layer
//!
//! Postgres persistence for obligations and their audit trail via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the API
//! stores obligations in PostgreSQL through [`PgObligationStore`]. When
//! absent, it falls back to [`crate::store::MemoryStore`] (suitable for
//! development and testing).
//!
//! Mutations run in one transaction each: the subject row is locked with
//! `SELECT ... FOR UPDATE`, the update and its audit record are written,
//! and the transaction commits. Dropping the transaction on an early
//! return rolls everything back.

pub mod audits;
pub mod licenses;
pub mod obligations;
pub mod users;

use async_trait::async_trait;
use ldb_core::{
    diff_obligations, plan_update, AuditRecord, NewAuditRecord, NewObligation, Obligation,
    ObligationError, ObligationPatch, PageRequest, OBLIGATION_AUDIT_TYPE,
};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::store::{ObligationStore, Page};

/// Connect to PostgreSQL and run embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// [`ObligationStore`] backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgObligationStore {
    pool: PgPool,
}

impl PgObligationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Log a backend failure and convert it to an internal error.
fn internal(context: &'static str, err: sqlx::Error) -> ObligationError {
    tracing::error!(error = %err, context, "database operation failed");
    ObligationError::Internal(format!("{context}: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ObligationStore for PgObligationStore {
    async fn list(&self, active: bool, page: PageRequest) -> Result<Page<Obligation>, ObligationError> {
        let not_found = |err: sqlx::Error| {
            tracing::error!(error = %err, "obligation list query failed");
            ObligationError::NotFound("Obligations not found".to_string())
        };

        let total = obligations::count(&self.pool, active).await.map_err(not_found)?;
        let items = obligations::list(
            &self.pool,
            active,
            i64::from(page.limit()),
            to_i64(page.offset()),
        )
        .await
        .map_err(not_found)?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn get_by_topic(&self, topic: &str) -> Result<Obligation, ObligationError> {
        obligations::get_by_topic(&self.pool, topic)
            .await
            .map_err(|e| internal("fetching obligation", e))?
            .ok_or_else(|| ObligationError::topic_not_found(topic))
    }

    async fn create(&self, new: NewObligation) -> Result<Obligation, ObligationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| internal("starting transaction", e))?;

        let taken = obligations::exists_with_topic_or_digest(&mut *tx, &new.topic, &new.digest)
            .await
            .map_err(|e| internal("checking obligation uniqueness", e))?;
        if taken {
            return Err(ObligationError::duplicate(&new.topic, &new.text));
        }

        let created = obligations::insert(&mut *tx, &new).await.map_err(|e| {
            if is_unique_violation(&e) {
                ObligationError::duplicate(&new.topic, &new.text)
            } else {
                internal("inserting obligation", e)
            }
        })?;

        for shortname in &new.shortnames {
            let linked = licenses::link(&mut *tx, created.id, shortname)
                .await
                .map_err(|e| internal("linking license", e))?;
            if !linked {
                tracing::warn!(
                    topic = %created.topic,
                    shortname = %shortname,
                    "unknown license shortname, obligation not linked"
                );
            }
        }

        tx.commit()
            .await
            .map_err(|e| internal("committing obligation", e))?;

        Ok(created)
    }

    async fn update(
        &self,
        topic: &str,
        patch: &ObligationPatch,
        username: &str,
    ) -> Result<Obligation, ObligationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| internal("starting transaction", e))?;

        let current = obligations::lock_by_topic(&mut *tx, topic)
            .await
            .map_err(|e| internal("locking obligation", e))?
            .ok_or_else(|| ObligationError::topic_not_found(topic))?;

        let updates = plan_update(&current, patch)?;

        let user_id = users::find_id(&mut *tx, username)
            .await
            .map_err(|e| internal("resolving user", e))?
            .ok_or_else(|| ObligationError::Internal(format!("user '{username}' not found")))?;

        if updates.is_empty() {
            tx.commit()
                .await
                .map_err(|e| internal("committing obligation", e))?;
            return Ok(current);
        }

        let next = obligations::apply_updates(&mut *tx, current.id, &updates)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    let text = patch.text.as_present().map_or(current.text.as_str(), String::as_str);
                    ObligationError::duplicate(&current.topic, text)
                } else {
                    internal("updating obligation", e)
                }
            })?;

        if let Some(audit) =
            NewAuditRecord::for_obligation(user_id, next.id, diff_obligations(&current, &next))
        {
            audits::insert(&mut *tx, audit)
                .await
                .map_err(|e| internal("recording audit", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| internal("committing obligation", e))?;

        Ok(next)
    }

    async fn deactivate(&self, topic: &str) -> Result<(), ObligationError> {
        let found = obligations::deactivate(&self.pool, topic)
            .await
            .map_err(|e| internal("deactivating obligation", e))?;
        if found {
            Ok(())
        } else {
            Err(ObligationError::topic_not_found(topic))
        }
    }

    async fn list_audits(
        &self,
        topic: &str,
        page: PageRequest,
    ) -> Result<Page<AuditRecord>, ObligationError> {
        let subject = obligations::get_by_topic(&self.pool, topic)
            .await
            .map_err(|e| internal("fetching obligation", e))?
            .ok_or_else(|| ObligationError::topic_not_found(topic))?;

        let audit_error = |err: sqlx::Error| {
            tracing::error!(error = %err, topic, "audit query failed");
            ObligationError::Internal("unable to find audits with such obligation topic".to_string())
        };

        let mut conn = self.pool.acquire().await.map_err(audit_error)?;
        let total = audits::count(&mut conn, OBLIGATION_AUDIT_TYPE, subject.id)
            .await
            .map_err(audit_error)?;
        let items = audits::list_for_subject(
            &mut conn,
            OBLIGATION_AUDIT_TYPE,
            subject.id,
            i64::from(page.limit()),
            to_i64(page.offset()),
        )
        .await
        .map_err(audit_error)?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn ping(&self) -> Result<(), ObligationError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| internal("pinging database", e))?;
        Ok(())
    }
}
