use crate::domain::{models::entrant::{normalize_email, Entrant, EntrantStatus}, ports::EntrantRepository};
use crate::error::AppError;
use crate::infra::repositories::sqlite_event_repo::shift_enrolled;
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

pub struct SqliteEntrantRepo {
    pool: SqlitePool,
}

impl SqliteEntrantRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const UPSERT_ENTRANT: &str =
    "INSERT INTO entrants (id, event_id, name, email, phone, status, joined_at, status_changed_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
     ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        email = excluded.email,
        phone = excluded.phone,
        status = excluded.status,
        status_changed_at = excluded.status_changed_at
     RETURNING *";

async fn upsert(conn: &mut SqliteConnection, entrant: &Entrant) -> Result<Entrant, AppError> {
    sqlx::query_as::<_, Entrant>(UPSERT_ENTRANT)
        .bind(&entrant.id)
        .bind(&entrant.event_id)
        .bind(&entrant.name)
        .bind(&entrant.email)
        .bind(&entrant.phone)
        .bind(entrant.status)
        .bind(entrant.joined_at)
        .bind(entrant.status_changed_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::Database)
}

#[async_trait]
impl EntrantRepository for SqliteEntrantRepo {
    async fn fetch_waiting_pool(&self, event_id: &str) -> Result<Vec<Entrant>, AppError> {
        self.list_by_event(event_id, Some(EntrantStatus::Waiting)).await
    }

    async fn list_by_event(&self, event_id: &str, status: Option<EntrantStatus>) -> Result<Vec<Entrant>, AppError> {
        match status {
            Some(status) => sqlx::query_as::<_, Entrant>(
                "SELECT * FROM entrants WHERE event_id = ? AND status = ? ORDER BY joined_at ASC, id ASC"
            )
                .bind(event_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::Database),
            None => sqlx::query_as::<_, Entrant>(
                "SELECT * FROM entrants WHERE event_id = ? ORDER BY joined_at ASC, id ASC"
            )
                .bind(event_id)
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::Database),
        }
    }

    async fn find_entrant(&self, id: &str) -> Result<Option<Entrant>, AppError> {
        sqlx::query_as::<_, Entrant>("SELECT * FROM entrants WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active_by_email(&self, event_id: &str, email: &str) -> Result<Option<Entrant>, AppError> {
        sqlx::query_as::<_, Entrant>(
            "SELECT * FROM entrants WHERE event_id = ? AND email = ? AND status != 'CANCELLED' LIMIT 1"
        )
            .bind(event_id)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_status(&self, event_id: &str, status: EntrantStatus) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM entrants WHERE event_id = ? AND status = ?")
            .bind(event_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Entrant>, AppError> {
        sqlx::query_as::<_, Entrant>(
            "SELECT * FROM entrants WHERE email = ? ORDER BY joined_at DESC, id DESC"
        )
            .bind(normalize_email(email))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn save_entrant(&self, entrant: &Entrant) -> Result<Entrant, AppError> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        upsert(&mut *conn, entrant).await
    }

    async fn save_entrants_batch(&self, event_id: &str, entrants: &[Entrant], enrolled_delta: i32) -> Result<(), AppError> {
        if let Some(foreign) = entrants.iter().find(|e| e.event_id != event_id) {
            return Err(AppError::InternalWithMsg(format!(
                "entrant {} belongs to event {}, not {}",
                foreign.id, foreign.event_id, event_id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        for entrant in entrants {
            upsert(&mut *tx, entrant).await?;
        }
        if enrolled_delta != 0 {
            shift_enrolled(&mut *tx, event_id, enrolled_delta).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
