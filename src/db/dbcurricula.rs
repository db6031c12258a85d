use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    ChatMessageRow, CreateCurriculumRequest, CurriculumListQuery, CurriculumRow,
    CurriculumVersionRow, UpdateCurriculumRequest,
};

// Global database instance
static DB: OnceCell<Arc<DbCurricula>> = OnceCell::const_new();

/// Initialize the global database connection
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error
pub async fn init_db(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = DbCurricula::new(database_url).await?;
    DB.set(Arc::new(db))
        .map_err(|_| "Database already initialized")?;
    Ok(())
}

/// Get the global database instance
pub fn get_db() -> Option<Arc<DbCurricula>> {
    DB.get().cloned()
}

/// Database connection pool
pub struct DbCurricula {
    pool: PgPool,
}

impl DbCurricula {
    /// Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// List a user's curricula with search, filters, sorting and pagination
    ///
    /// # Arguments
    /// * `user_id` - Owner of the curricula
    /// * `query` - Validated list parameters
    ///
    /// # Returns
    /// * `Result<(Vec<CurriculumRow>, i64), SqlxError>` - Page of rows plus total count
    pub async fn list_curriculums(
        &self,
        user_id: Uuid,
        query: &CurriculumListQuery,
    ) -> Result<(Vec<CurriculumRow>, i64), SqlxError> {
        let mut conditions = String::from("user_id = $1");
        let mut idx = 1;

        let search = query.search.as_ref().map(|s| format!("%{}%", s));
        if search.is_some() {
            idx += 1;
            conditions.push_str(&format!(" AND title ILIKE ${}", idx));
        }
        if query.curriculum_type.is_some() {
            idx += 1;
            conditions.push_str(&format!(" AND type = ${}", idx));
        }
        if query.target_audience.is_some() {
            idx += 1;
            conditions.push_str(&format!(" AND target_audience = ${}", idx));
        }

        // Sort column and direction come from a whitelist, never from raw input
        let sort = match query.sort.as_deref() {
            Some("created_at") => "created_at",
            Some("title") => "title",
            _ => "updated_at",
        };
        let order = match query.order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };

        let count_sql = format!("SELECT COUNT(*) FROM curriculums WHERE {}", conditions);
        let page_sql = format!(
            "SELECT * FROM curriculums WHERE {} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            conditions,
            sort,
            order,
            idx + 1,
            idx + 2
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
        let mut page_query = sqlx::query_as::<_, CurriculumRow>(&page_sql).bind(user_id);
        if let Some(pattern) = &search {
            count_query = count_query.bind(pattern.clone());
            page_query = page_query.bind(pattern.clone());
        }
        if let Some(kind) = &query.curriculum_type {
            count_query = count_query.bind(kind.clone());
            page_query = page_query.bind(kind.clone());
        }
        if let Some(audience) = &query.target_audience {
            count_query = count_query.bind(audience.clone());
            page_query = page_query.bind(audience.clone());
        }

        let limit = query.limit();
        let offset = (query.page() - 1) * limit;
        page_query = page_query.bind(limit).bind(offset);

        let total = count_query.fetch_one(&self.pool).await?;
        let rows = page_query.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Fetch a single curriculum owned by the user
    pub async fn get_curriculum(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CurriculumRow>, SqlxError> {
        sqlx::query_as::<_, CurriculumRow>(
            "SELECT * FROM curriculums WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a new curriculum and its first version snapshot
    pub async fn insert_curriculum(
        &self,
        user_id: Uuid,
        request: &CreateCurriculumRequest,
    ) -> Result<CurriculumRow, SqlxError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CurriculumRow>(
            r#"
            INSERT INTO curriculums (user_id, title, target_audience, duration, type, content, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.title)
        .bind(&request.target_audience)
        .bind(&request.duration)
        .bind(&request.curriculum_type)
        .bind(&request.content)
        .bind(&request.metadata)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO curriculum_versions (curriculum_id, version_number, content) VALUES ($1, 1, $2)",
        )
        .bind(row.id)
        .bind(&row.content)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Update a curriculum; appends a version snapshot when content changed
    ///
    /// Returns `None` when the curriculum does not exist or is not owned by
    /// the user.
    pub async fn update_curriculum(
        &self,
        user_id: Uuid,
        id: Uuid,
        request: &UpdateCurriculumRequest,
    ) -> Result<Option<CurriculumRow>, SqlxError> {
        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 2;

        if request.title.is_some() {
            idx += 1;
            sets.push(format!("title = ${}", idx));
        }
        if request.target_audience.is_some() {
            idx += 1;
            sets.push(format!("target_audience = ${}", idx));
        }
        if request.duration.is_some() {
            idx += 1;
            sets.push(format!("duration = ${}", idx));
        }
        if request.curriculum_type.is_some() {
            idx += 1;
            sets.push(format!("type = ${}", idx));
        }
        if request.content.is_some() {
            idx += 1;
            sets.push(format!("content = ${}", idx));
        }
        if request.metadata.is_some() {
            idx += 1;
            sets.push(format!("metadata = ${}", idx));
        }

        let sql = format!(
            "UPDATE curriculums SET {} WHERE id = $1 AND user_id = $2 RETURNING *",
            sets.join(", ")
        );

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query_as::<_, CurriculumRow>(&sql).bind(id).bind(user_id);
        if let Some(title) = &request.title {
            query = query.bind(title.clone());
        }
        if let Some(audience) = &request.target_audience {
            query = query.bind(audience.clone());
        }
        if let Some(duration) = &request.duration {
            query = query.bind(duration.clone());
        }
        if let Some(kind) = &request.curriculum_type {
            query = query.bind(kind.clone());
        }
        if let Some(content) = &request.content {
            query = query.bind(content.clone());
        }
        if let Some(metadata) = &request.metadata {
            query = query.bind(metadata.clone());
        }

        let row = match query.fetch_optional(&mut *tx).await? {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        if request.content.is_some() {
            let next = Self::next_version_number(&mut tx, id).await?;
            sqlx::query(
                "INSERT INTO curriculum_versions (curriculum_id, version_number, content) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(next)
            .bind(&row.content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(row))
    }

    /// Delete a curriculum together with its versions and chat history
    ///
    /// # Returns
    /// * `Result<bool, SqlxError>` - true when a row was deleted
    pub async fn delete_curriculum(&self, user_id: Uuid, id: Uuid) -> Result<bool, SqlxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM curriculum_versions WHERE curriculum_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_histories WHERE curriculum_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM curriculums WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Copy a curriculum into a new row owned by the same user
    pub async fn duplicate_curriculum(
        &self,
        user_id: Uuid,
        original: &CurriculumRow,
    ) -> Result<CurriculumRow, SqlxError> {
        let copy = CreateCurriculumRequest {
            title: format!("{} (copy)", original.title),
            target_audience: original.target_audience.clone(),
            duration: original.duration.clone(),
            curriculum_type: original.curriculum_type.clone(),
            content: original.content.clone(),
            metadata: original.metadata.clone(),
        };
        self.insert_curriculum(user_id, &copy).await
    }

    /// List version snapshots, newest first
    pub async fn list_versions(
        &self,
        curriculum_id: Uuid,
    ) -> Result<Vec<CurriculumVersionRow>, SqlxError> {
        sqlx::query_as::<_, CurriculumVersionRow>(
            "SELECT * FROM curriculum_versions WHERE curriculum_id = $1 ORDER BY version_number DESC",
        )
        .bind(curriculum_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Fetch one version snapshot
    pub async fn get_version(
        &self,
        curriculum_id: Uuid,
        version_number: i32,
    ) -> Result<Option<CurriculumVersionRow>, SqlxError> {
        sqlx::query_as::<_, CurriculumVersionRow>(
            "SELECT * FROM curriculum_versions WHERE curriculum_id = $1 AND version_number = $2",
        )
        .bind(curriculum_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
    }

    /// Restore a curriculum to a snapshot's content, recording the restore as
    /// a fresh version
    ///
    /// # Returns
    /// * `Result<Option<(CurriculumRow, i32)>, SqlxError>` - Updated row and
    ///   the version number the restore was saved under
    pub async fn restore_version(
        &self,
        user_id: Uuid,
        curriculum_id: Uuid,
        snapshot: &CurriculumVersionRow,
    ) -> Result<Option<(CurriculumRow, i32)>, SqlxError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CurriculumRow>(
            "UPDATE curriculums SET content = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(curriculum_id)
        .bind(user_id)
        .bind(&snapshot.content)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match row {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let next = Self::next_version_number(&mut tx, curriculum_id).await?;
        sqlx::query(
            "INSERT INTO curriculum_versions (curriculum_id, version_number, content) VALUES ($1, $2, $3)",
        )
        .bind(curriculum_id)
        .bind(next)
        .bind(&snapshot.content)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((row, next)))
    }

    async fn next_version_number(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        curriculum_id: Uuid,
    ) -> Result<i32, SqlxError> {
        let latest: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version_number), 0) FROM curriculum_versions WHERE curriculum_id = $1",
        )
        .bind(curriculum_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(latest + 1)
    }

    /// Chat history for a curriculum, oldest first
    pub async fn list_chat_messages(
        &self,
        curriculum_id: Uuid,
    ) -> Result<Vec<ChatMessageRow>, SqlxError> {
        sqlx::query_as::<_, ChatMessageRow>(
            "SELECT * FROM chat_histories WHERE curriculum_id = $1 ORDER BY created_at ASC",
        )
        .bind(curriculum_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Append a chat message to a curriculum's history
    pub async fn insert_chat_message(
        &self,
        curriculum_id: Uuid,
        role: &str,
        content: &str,
    ) -> Result<ChatMessageRow, SqlxError> {
        sqlx::query_as::<_, ChatMessageRow>(
            "INSERT INTO chat_histories (curriculum_id, role, content) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(curriculum_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    /// Clear the chat history of a curriculum
    pub async fn clear_chat_messages(&self, curriculum_id: Uuid) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM chat_histories WHERE curriculum_id = $1")
            .bind(curriculum_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
