//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// ULIDs sort lexicographically in creation order, which is what makes
/// `id < max_id` pagination cursors work.
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered user
///
/// Created on signup (email/password) or on first federated sign-in.
/// `username` stays NULL until the user claims one; `followers` and
/// `following` are denormalized counters kept in step with the `follows`
/// table transactionally.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    /// Claimed handle, always starting with "@"
    pub username: Option<String>,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub photo_url: Option<String>,
    /// Denormalized count of users following this user
    pub followers: i64,
    /// Denormalized count of users this user follows
    pub following: i64,
    /// When the username last changed; gates the 28-day rename cooldown
    pub last_username_change: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Follow graph
// =============================================================================

/// A follow relationship between two users
///
/// The (follower_id, following_id) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a follow toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// An edge was created; the notification kind that was emitted
    Followed(NotificationKind),
    /// The existing edge was removed
    Unfollowed,
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification for follow-graph events
///
/// Persisted in the same transaction as the edge mutation that caused it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub to_user_id: String,
    pub from_user_id: String,
    /// Kind: follow, follow_back, unfollow
    pub kind: String,
    /// Whether the recipient has seen this
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Follow,
    FollowBack,
    Unfollow,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::FollowBack => "follow_back",
            Self::Unfollow => "unfollow",
        }
    }
}

// =============================================================================
// Posts
// =============================================================================

/// A post
///
/// Text and/or image; `likes` and `shares` are denormalized counters.
/// Like rows live in the `likes` table keyed by (post, user).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub caption: String,
    pub image_url: Option<String>,
    pub likes: i64,
    pub shares: i64,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Federated identities
// =============================================================================

/// A federated sign-in subject mapped to a local user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub provider: String,
    pub subject: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
