// ABOUTME: Notification store database operations with delivery timestamps
// ABOUTME: Creates rows, filters by sent/read state, and sets sent/read timestamps at most once

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Notification, NotificationFilter, NotificationPayload};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const NOTIFICATION_COLUMNS: &str = "id, user_id, payload, created_at, sent_at, read_at";

impl Database {
    /// Create the `user_notifications` table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_notifications(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                sent_at TEXT,
                read_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_user_notifications_user ON user_notifications(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a new notification for `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the insert fails
    pub async fn create_notification(
        &self,
        user_id: i64,
        payload: &NotificationPayload,
    ) -> AppResult<Notification> {
        let created_at = Utc::now();
        let payload_json = serde_json::to_string(payload)?;

        let result = sqlx::query(
            r"
            INSERT INTO user_notifications (user_id, payload, created_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(payload_json)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id,
            payload: payload.clone(),
            created_at,
            sent_at: None,
            read_at: None,
        })
    }

    /// Get notification by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is unreadable
    pub async fn get_notification(&self, notification_id: i64) -> AppResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM user_notifications WHERE id = $1"
        ))
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_notification).transpose()
    }

    /// All notifications of a user, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is unreadable
    pub async fn get_notifications_by_user(&self, user_id: i64) -> AppResult<Vec<Notification>> {
        self.get_notifications_filtered(user_id, NotificationFilter::All)
            .await
    }

    /// Notifications of a user matching `filter`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is unreadable
    pub async fn get_notifications_filtered(
        &self,
        user_id: i64,
        filter: NotificationFilter,
    ) -> AppResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM user_notifications \
             WHERE user_id = $1 AND ({}) ORDER BY created_at ASC, id ASC",
            filter.sql_predicate()
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    /// Set `sent_at` if unset, scoped to `(notification_id, user_id)`
    ///
    /// Returns whether a row changed; a repeated call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn mark_sent(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE user_notifications SET sent_at = $1
            WHERE id = $2 AND user_id = $3 AND sent_at IS NULL
            ",
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set `read_at` if unset, scoped to `(notification_id, user_id)`
    ///
    /// Returns whether a row changed; a repeated call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn mark_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE user_notifications SET read_at = $1
            WHERE id = $2 AND user_id = $3 AND read_at IS NULL
            ",
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_notification(row: &SqliteRow) -> AppResult<Notification> {
        let payload_json: String = row.try_get("payload")?;
        let payload: NotificationPayload = serde_json::from_str(&payload_json).map_err(|e| {
            AppError::database(format!("stored notification payload is not a JSON object: {e}"))
        })?;

        Ok(Notification {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            payload,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            sent_at: row.try_get::<Option<DateTime<Utc>>, _>("sent_at")?,
            read_at: row.try_get::<Option<DateTime<Utc>>, _>("read_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::database::tests::create_test_db;
    use crate::database::{Database, NewUser};
    use crate::models::{NotificationFilter, NotificationPayload, UserRole};
    use serde_json::json;

    async fn db_with_user() -> (Database, i64) {
        let db = create_test_db().await.unwrap();
        let user = db
            .create_user(&NewUser {
                username: "alice".into(),
                email: None,
                password_hash: "hash".into(),
                role: UserRole::User,
            })
            .await
            .unwrap();
        (db, user.id)
    }

    fn payload(title: &str) -> NotificationPayload {
        json!({"title": title, "message": "hello"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_notification() {
        let (db, user_id) = db_with_user().await;
        let created = db.create_notification(user_id, &payload("a")).await.unwrap();

        let fetched = db.get_notification(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, user_id);
        assert_eq!(fetched.payload["title"], "a");
        assert!(fetched.sent_at.is_none());
        assert!(fetched.read_at.is_none());
        assert!(db.get_notification(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notifications_ordered_by_creation() {
        let (db, user_id) = db_with_user().await;
        for title in ["first", "second", "third"] {
            db.create_notification(user_id, &payload(title)).await.unwrap();
        }
        let titles: Vec<String> = db
            .get_notifications_by_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.payload["title"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_mark_sent_is_idempotent() {
        let (db, user_id) = db_with_user().await;
        let n = db.create_notification(user_id, &payload("a")).await.unwrap();

        assert!(db.mark_sent(n.id, user_id).await.unwrap());
        let first = db.get_notification(n.id).await.unwrap().unwrap().sent_at;
        assert!(first.is_some());

        assert!(!db.mark_sent(n.id, user_id).await.unwrap());
        let second = db.get_notification(n.id).await.unwrap().unwrap().sent_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_mark_scoped_to_owner() {
        let (db, user_id) = db_with_user().await;
        let n = db.create_notification(user_id, &payload("a")).await.unwrap();

        assert!(!db.mark_sent(n.id, user_id + 1).await.unwrap());
        assert!(!db.mark_read(n.id, user_id + 1).await.unwrap());
        let row = db.get_notification(n.id).await.unwrap().unwrap();
        assert!(row.sent_at.is_none());
        assert!(row.read_at.is_none());
    }

    #[tokio::test]
    async fn test_filters_select_matching_rows() {
        let (db, user_id) = db_with_user().await;
        let neither = db.create_notification(user_id, &payload("neither")).await.unwrap();
        let sent = db.create_notification(user_id, &payload("sent")).await.unwrap();
        let read = db.create_notification(user_id, &payload("read")).await.unwrap();
        let both = db.create_notification(user_id, &payload("both")).await.unwrap();

        db.mark_sent(sent.id, user_id).await.unwrap();
        db.mark_read(read.id, user_id).await.unwrap();
        db.mark_sent(both.id, user_id).await.unwrap();
        db.mark_read(both.id, user_id).await.unwrap();

        let all = db.get_notifications_by_user(user_id).await.unwrap();
        assert_eq!(all.len(), 4);

        for filter in NotificationFilter::ALL_FILTERS {
            let got: Vec<i64> = db
                .get_notifications_filtered(user_id, filter)
                .await
                .unwrap()
                .into_iter()
                .map(|n| n.id)
                .collect();
            let expected: Vec<i64> = all
                .iter()
                .filter(|n| filter.matches(n))
                .map(|n| n.id)
                .collect();
            assert_eq!(got, expected, "filter {filter}");
        }

        let unsent_unread = db
            .get_notifications_filtered(user_id, NotificationFilter::UnsentAndUnread)
            .await
            .unwrap();
        assert_eq!(unsent_unread.len(), 1);
        assert_eq!(unsent_unread[0].id, neither.id);
    }
}
