//! Social graph service
//!
//! The follow/unfollow toggle and its notification side effects, plus
//! relationship views, follower and following lists, and counter
//! reconciliation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::data::{Database, FollowOutcome, NotificationKind, User};
use crate::error::AppError;
use crate::metrics::{
    FOLLOW_TOGGLES_TOTAL, NOTIFICATIONS_TOTAL, RECONCILE_REPAIRS_TOTAL, RECONCILE_RUNS_TOTAL,
};

/// Relationship between the acting user and a target
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Whether the actor follows the target
    pub following: bool,
    /// Whether the target follows the actor
    pub followed_by: bool,
    /// Target's follower counter
    pub followers: i64,
    /// Target's following counter
    pub following_count: i64,
}

/// Graph service
pub struct GraphService {
    db: Arc<Database>,
}

impl GraphService {
    /// Create new graph service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Toggle the follow edge from `actor_id` to `target_id`.
    ///
    /// Following emits a `follow` notification, or `follow_back` when the
    /// target already follows the actor. Unfollowing emits `unfollow`.
    /// Edge, counters, and notification move in one transaction.
    ///
    /// # Returns
    /// The relationship after the toggle.
    pub async fn toggle_follow(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Relationship, AppError> {
        if actor_id == target_id {
            return Err(AppError::Validation("cannot follow yourself".to_string()));
        }

        // Reject unknown targets before mutating anything
        if self.db.get_user(target_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let outcome = self.db.toggle_follow(actor_id, target_id).await?;

        match &outcome {
            FollowOutcome::Followed(kind) => {
                FOLLOW_TOGGLES_TOTAL.with_label_values(&["follow"]).inc();
                NOTIFICATIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
                tracing::info!(
                    actor = %actor_id,
                    target = %target_id,
                    kind = kind.as_str(),
                    "Follow edge created"
                );
            }
            FollowOutcome::Unfollowed => {
                FOLLOW_TOGGLES_TOTAL.with_label_values(&["unfollow"]).inc();
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[NotificationKind::Unfollow.as_str()])
                    .inc();
                tracing::info!(
                    actor = %actor_id,
                    target = %target_id,
                    "Follow edge removed"
                );
            }
        }

        self.relationship(actor_id, target_id).await
    }

    /// Current relationship between actor and target, without mutating
    pub async fn relationship(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Relationship, AppError> {
        let target = self
            .db
            .get_user(target_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let following = self.db.is_following(actor_id, target_id).await?;
        let followed_by = self.db.is_following(target_id, actor_id).await?;

        Ok(Relationship {
            following,
            followed_by,
            followers: target.followers,
            following_count: target.following,
        })
    }

    /// Users following `user_id`, each flagged with whether the viewer
    /// follows them (the follow-button state on the list screens)
    pub async fn followers(
        &self,
        user_id: &str,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Vec<(User, bool)>, AppError> {
        let users = self.db.followers_of(user_id, limit).await?;
        self.annotate_with_viewer(users, viewer_id).await
    }

    /// Users that `user_id` follows, annotated the same way
    pub async fn following(
        &self,
        user_id: &str,
        viewer_id: &str,
        limit: usize,
    ) -> Result<Vec<(User, bool)>, AppError> {
        let users = self.db.following_of(user_id, limit).await?;
        self.annotate_with_viewer(users, viewer_id).await
    }

    async fn annotate_with_viewer(
        &self,
        users: Vec<User>,
        viewer_id: &str,
    ) -> Result<Vec<(User, bool)>, AppError> {
        let viewer_following: HashSet<String> =
            self.db.following_ids(viewer_id).await?.into_iter().collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let followed = viewer_following.contains(&user.id);
                (user, followed)
            })
            .collect())
    }

    /// Recount denormalized counters from their source tables.
    ///
    /// # Returns
    /// Number of drifted rows repaired.
    pub async fn reconcile_counters(&self) -> Result<u64, AppError> {
        match self.db.reconcile_counters().await {
            Ok(repaired) => {
                RECONCILE_RUNS_TOTAL.with_label_values(&["ok"]).inc();
                if repaired > 0 {
                    RECONCILE_REPAIRS_TOTAL.inc_by(repaired);
                    tracing::warn!(repaired, "Repaired drifted counters");
                } else {
                    tracing::debug!("Counters consistent with edges");
                }
                Ok(repaired)
            }
            Err(error) => {
                RECONCILE_RUNS_TOTAL.with_label_values(&["error"]).inc();
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityId;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn create_service() -> (GraphService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-graph.db");
        let db = Arc::new(Database::connect(&db_path).await.unwrap());
        (GraphService::new(db.clone()), db, temp_dir)
    }

    async fn insert_user(db: &Database, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            first_name: "Test".to_string(),
            surname: "User".to_string(),
            username: None,
            email: email.to_string(),
            phone: String::new(),
            bio: String::new(),
            photo_url: None,
            followers: 0,
            following: 0,
            last_username_change: None,
            created_at: now,
            updated_at: now,
        };
        db.insert_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn toggle_rejects_self_follow() {
        let (service, db, _temp_dir) = create_service().await;
        let ada = insert_user(&db, "ada@example.com").await;

        let error = service.toggle_follow(&ada.id, &ada.id).await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn toggle_rejects_unknown_target() {
        let (service, db, _temp_dir) = create_service().await;
        let ada = insert_user(&db, "ada@example.com").await;

        let error = service.toggle_follow(&ada.id, "missing").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn toggle_twice_restores_relationship() {
        let (service, db, _temp_dir) = create_service().await;
        let ada = insert_user(&db, "ada@example.com").await;
        let grace = insert_user(&db, "grace@example.com").await;

        let after_follow = service.toggle_follow(&ada.id, &grace.id).await.unwrap();
        assert!(after_follow.following);
        assert_eq!(after_follow.followers, 1);

        let after_unfollow = service.toggle_follow(&ada.id, &grace.id).await.unwrap();
        assert!(!after_unfollow.following);
        assert_eq!(after_unfollow.followers, 0);
        assert_eq!(after_unfollow.following_count, 0);
    }

    #[tokio::test]
    async fn relationship_reports_both_directions() {
        let (service, db, _temp_dir) = create_service().await;
        let ada = insert_user(&db, "ada@example.com").await;
        let grace = insert_user(&db, "grace@example.com").await;

        service.toggle_follow(&grace.id, &ada.id).await.unwrap();

        let relationship = service.relationship(&ada.id, &grace.id).await.unwrap();
        assert!(!relationship.following);
        assert!(relationship.followed_by);
        assert_eq!(relationship.following_count, 1);
    }

    #[tokio::test]
    async fn lists_are_annotated_for_the_viewer() {
        let (service, db, _temp_dir) = create_service().await;
        let ada = insert_user(&db, "ada@example.com").await;
        let grace = insert_user(&db, "grace@example.com").await;
        let joan = insert_user(&db, "joan@example.com").await;

        service.toggle_follow(&grace.id, &ada.id).await.unwrap();
        service.toggle_follow(&joan.id, &ada.id).await.unwrap();
        // The viewer (joan) also follows grace
        service.toggle_follow(&joan.id, &grace.id).await.unwrap();

        let followers = service.followers(&ada.id, &joan.id, 40).await.unwrap();
        assert_eq!(followers.len(), 2);
        let grace_entry = followers
            .iter()
            .find(|(user, _)| user.id == grace.id)
            .unwrap();
        assert!(grace_entry.1);
        let joan_entry = followers
            .iter()
            .find(|(user, _)| user.id == joan.id)
            .unwrap();
        assert!(!joan_entry.1);

        let following = service.following(&joan.id, &grace.id, 40).await.unwrap();
        assert_eq!(following.len(), 2);
    }
}
