use crate::domain::{models::event::{Event, EventCapacity}, ports::EventRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Shifts `current_enrolled` by `delta` only if the result stays within `[0, max_capacity]`.
pub(crate) async fn shift_enrolled(conn: &mut SqliteConnection, event_id: &str, delta: i32) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE events SET current_enrolled = current_enrolled + ?
         WHERE id = ? AND current_enrolled + ? >= 0 AND current_enrolled + ? <= max_capacity"
    )
        .bind(delta)
        .bind(event_id)
        .bind(delta)
        .bind(delta)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query("SELECT 1 FROM events WHERE id = ?")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(AppError::Database)?;

        return match exists {
            None => Err(AppError::NotFound("Event not found".into())),
            Some(_) if delta > 0 => Err(AppError::CapacityExceeded),
            Some(_) => Err(AppError::InternalWithMsg(format!(
                "enrolled counter of event {} would drop below zero", event_id
            ))),
        };
    }
    Ok(())
}

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (
                id, name, description, max_capacity, current_enrolled, max_waiting_list_size, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&event.id)
            .bind(&event.name)
            .bind(&event.description)
            .bind(event.max_capacity)
            .bind(event.current_enrolled)
            .bind(event.max_waiting_list_size)
            .bind(event.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn get_event_capacity(&self, event_id: &str) -> Result<EventCapacity, AppError> {
        self.find_by_id(event_id).await?
            .map(|e| e.capacity())
            .ok_or(AppError::NotFound("Event not found".into()))
    }

    async fn update_event_capacity(&self, event_id: &str, delta: i32) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        shift_enrolled(&mut *conn, event_id, delta).await
    }
}
