//! SQLite database operations
//!
//! All database access goes through this module.
//!
//! Check-then-write sequences that the follow graph depends on (edge
//! existence, like existence, counter updates, notification inserts) run
//! inside IMMEDIATE transactions so concurrent toggles serialize instead of
//! drifting the denormalized counters.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool_for_test(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, surname, username, email, phone, bio, photo_url,
                followers, following, last_username_change, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.surname)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.photo_url)
        .bind(user.followers)
        .bind(user.following)
        .bind(user.last_username_change)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Get a user by exact username (case-insensitive)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? COLLATE NOCASE")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Get several users at once, in no particular order
    pub async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Update the editable profile fields
    pub async fn update_profile(
        &self,
        id: &str,
        first_name: &str,
        surname: &str,
        bio: &str,
        phone: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = ?, surname = ?, bio = ?, phone = ?, updated_at = ? WHERE id = ?",
        )
        .bind(first_name)
        .bind(surname)
        .bind(bio)
        .bind(phone)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the username, optionally stamping the rename cooldown.
    ///
    /// The unique index on `users.username` rejects duplicates; callers map
    /// that database error to a conflict.
    pub async fn set_username(
        &self,
        id: &str,
        username: &str,
        last_username_change: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = match last_username_change {
            Some(changed_at) => {
                sqlx::query(
                    "UPDATE users SET username = ?, last_username_change = ?, updated_at = ? WHERE id = ?",
                )
                .bind(username)
                .bind(changed_at)
                .bind(updated_at)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("UPDATE users SET username = ?, updated_at = ? WHERE id = ?")
                    .bind(username)
                    .bind(updated_at)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Backfill name/email fields on a user created before they were known
    pub async fn backfill_user_names(
        &self,
        id: &str,
        first_name: &str,
        surname: &str,
        email: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = ?, surname = ?, email = ?, updated_at = ? WHERE id = ?",
        )
        .bind(first_name)
        .bind(surname)
        .bind(email)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the profile photo URL
    pub async fn update_photo_url(
        &self,
        id: &str,
        photo_url: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET photo_url = ?, updated_at = ? WHERE id = ?")
            .bind(photo_url)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Search users by username substring (case-insensitive)
    pub async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username IS NOT NULL AND username LIKE ? ESCAPE '\'
            ORDER BY username COLLATE NOCASE
            LIMIT ?
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Count users.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Credentials & identities
    // =========================================================================

    /// Store a password hash for a user
    pub async fn insert_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO credentials (user_id, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the password hash for a user
    pub async fn get_password_hash(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM credentials WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hash)
    }

    /// Look up a federated identity
    pub async fn get_identity(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT * FROM identities WHERE provider = ? AND subject = ?",
        )
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    /// Record a federated identity mapping
    pub async fn insert_identity(&self, identity: &Identity) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO identities (provider, subject, user_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&identity.provider)
        .bind(&identity.subject)
        .bind(&identity.user_id)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Toggle the follow edge between two users.
    ///
    /// Runs as one IMMEDIATE transaction: the edge check, the edge mutation,
    /// both counter updates, and the notification insert either all land or
    /// none do. The notification kind is `follow_back` when the reverse edge
    /// already exists at toggle time.
    pub async fn toggle_follow(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<FollowOutcome, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<FollowOutcome, AppError> = async {
            let now = Utc::now();
            let existing = sqlx::query_scalar::<_, String>(
                "SELECT id FROM follows WHERE follower_id = ? AND following_id = ?",
            )
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&mut *conn)
            .await?;

            match existing {
                None => {
                    let edge = FollowEdge {
                        id: EntityId::new().0,
                        follower_id: actor_id.to_string(),
                        following_id: target_id.to_string(),
                        created_at: now,
                    };
                    sqlx::query(
                        "INSERT INTO follows (id, follower_id, following_id, created_at) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&edge.id)
                    .bind(&edge.follower_id)
                    .bind(&edge.following_id)
                    .bind(edge.created_at)
                    .execute(&mut *conn)
                    .await?;

                    sqlx::query("UPDATE users SET following = following + 1 WHERE id = ?")
                        .bind(actor_id)
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("UPDATE users SET followers = followers + 1 WHERE id = ?")
                        .bind(target_id)
                        .execute(&mut *conn)
                        .await?;

                    let reverse_exists = sqlx::query_scalar::<_, i64>(
                        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?)",
                    )
                    .bind(target_id)
                    .bind(actor_id)
                    .fetch_one(&mut *conn)
                    .await?;

                    let kind = if reverse_exists != 0 {
                        NotificationKind::FollowBack
                    } else {
                        NotificationKind::Follow
                    };

                    sqlx::query(
                        "INSERT INTO notifications (id, to_user_id, from_user_id, kind, seen, created_at) VALUES (?, ?, ?, ?, 0, ?)",
                    )
                    .bind(EntityId::new().0)
                    .bind(target_id)
                    .bind(actor_id)
                    .bind(kind.as_str())
                    .bind(now)
                    .execute(&mut *conn)
                    .await?;

                    Ok(FollowOutcome::Followed(kind))
                }
                Some(_) => {
                    let deleted = sqlx::query(
                        "DELETE FROM follows WHERE follower_id = ? AND following_id = ?",
                    )
                    .bind(actor_id)
                    .bind(target_id)
                    .execute(&mut *conn)
                    .await?
                    .rows_affected() as i64;

                    sqlx::query("UPDATE users SET following = MAX(following - ?, 0) WHERE id = ?")
                        .bind(deleted)
                        .bind(actor_id)
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("UPDATE users SET followers = MAX(followers - ?, 0) WHERE id = ?")
                        .bind(deleted)
                        .bind(target_id)
                        .execute(&mut *conn)
                        .await?;

                    sqlx::query(
                        "INSERT INTO notifications (id, to_user_id, from_user_id, kind, seen, created_at) VALUES (?, ?, ?, ?, 0, ?)",
                    )
                    .bind(EntityId::new().0)
                    .bind(target_id)
                    .bind(actor_id)
                    .bind(NotificationKind::Unfollow.as_str())
                    .bind(now)
                    .execute(&mut *conn)
                    .await?;

                    Ok(FollowOutcome::Unfollowed)
                }
            }
        }
        .await;

        match result {
            Ok(outcome) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(outcome)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Whether `follower_id` follows `following_id`
    pub async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    /// IDs of everyone `user_id` follows
    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT following_id FROM follows WHERE follower_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Users who follow `user_id`, newest edge first
    pub async fn followers_of(&self, user_id: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN follows f ON f.follower_id = u.id
            WHERE f.following_id = ?
            ORDER BY f.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Users that `user_id` follows, newest edge first
    pub async fn following_of(&self, user_id: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN follows f ON f.following_id = u.id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Recount denormalized counters from their source tables.
    ///
    /// Repairs follower/following counters from `follows` and like counters
    /// from `likes`. Returns the number of rows repaired.
    pub async fn reconcile_counters(&self) -> Result<u64, AppError> {
        let followers = sqlx::query(
            r#"
            UPDATE users
            SET followers = (SELECT COUNT(*) FROM follows WHERE following_id = users.id)
            WHERE followers <> (SELECT COUNT(*) FROM follows WHERE following_id = users.id)
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        let following = sqlx::query(
            r#"
            UPDATE users
            SET following = (SELECT COUNT(*) FROM follows WHERE follower_id = users.id)
            WHERE following <> (SELECT COUNT(*) FROM follows WHERE follower_id = users.id)
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        let likes = sqlx::query(
            r#"
            UPDATE posts
            SET likes = (SELECT COUNT(*) FROM likes WHERE post_id = posts.id)
            WHERE likes <> (SELECT COUNT(*) FROM likes WHERE post_id = posts.id)
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(followers + following + likes)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Get notifications for a recipient (paginated, newest first)
    pub async fn get_notifications(
        &self,
        to_user_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = match max_id {
            Some(max_id) => {
                sqlx::query_as::<_, Notification>(
                    "SELECT * FROM notifications WHERE to_user_id = ? AND id < ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(to_user_id)
                .bind(max_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Notification>(
                    "SELECT * FROM notifications WHERE to_user_id = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(to_user_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(notifications)
    }

    /// Get a single notification by ID
    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(notification)
    }

    /// Mark a notification as seen
    pub async fn mark_notification_seen(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE notifications SET seen = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark all of a recipient's notifications as seen
    pub async fn mark_all_notifications_seen(&self, to_user_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE notifications SET seen = 1 WHERE to_user_id = ?")
            .bind(to_user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Count unseen notifications for a recipient
    pub async fn count_unseen_notifications(&self, to_user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE to_user_id = ? AND seen = 0",
        )
        .bind(to_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, text, caption, image_url, likes, shares, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.text)
        .bind(&post.caption)
        .bind(&post.image_url)
        .bind(post.likes)
        .bind(post.shares)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Get the global feed (paginated, newest first)
    pub async fn get_posts(
        &self,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Post>, AppError> {
        let posts = match max_id {
            Some(max_id) => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE id < ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(max_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY created_at DESC LIMIT ?")
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(posts)
    }

    /// Get a user's posts (paginated, newest first)
    pub async fn get_posts_by_user(
        &self,
        user_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Post>, AppError> {
        let posts = match max_id {
            Some(max_id) => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE user_id = ? AND id < ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(max_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Post>(
                    "SELECT * FROM posts WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(posts)
    }

    /// Count posts.
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Likes & shares
    // =========================================================================

    /// Toggle a like on a post.
    ///
    /// The like row and the post's like counter move in the same IMMEDIATE
    /// transaction. Returns true when the post is liked after the call.
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<bool, AppError> = async {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = ? AND user_id = ?)",
            )
            .bind(post_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

            if exists == 0 {
                sqlx::query("INSERT INTO likes (post_id, user_id, created_at) VALUES (?, ?, ?)")
                    .bind(post_id)
                    .bind(user_id)
                    .bind(Utc::now())
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("UPDATE posts SET likes = likes + 1 WHERE id = ?")
                    .bind(post_id)
                    .execute(&mut *conn)
                    .await?;
                Ok(true)
            } else {
                sqlx::query("DELETE FROM likes WHERE post_id = ? AND user_id = ?")
                    .bind(post_id)
                    .bind(user_id)
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("UPDATE posts SET likes = MAX(likes - 1, 0) WHERE id = ?")
                    .bind(post_id)
                    .execute(&mut *conn)
                    .await?;
                Ok(false)
            }
        }
        .await;

        match result {
            Ok(liked) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(liked)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Which of `post_ids` the user has liked
    pub async fn get_liked_post_ids(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> Result<Vec<String>, AppError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT post_id FROM likes WHERE user_id = ");
        query_builder.push_bind(user_id);
        query_builder.push(" AND post_id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in post_ids {
                separated.push_bind(id);
            }
        }
        query_builder.push(")");

        let ids = query_builder
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Increment a post's share counter
    pub async fn increment_shares(&self, post_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE posts SET shares = shares + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Insert a comment
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, text, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a comment by ID
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Get a post's comments, oldest first
    pub async fn get_comments(&self, post_id: &str, limit: usize) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE post_id = ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(post_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Delete a comment
    pub async fn delete_comment(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count a post's comments
    pub async fn count_comments(&self, post_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
