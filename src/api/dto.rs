//! API response DTOs
//!
//! Data Transfer Objects for JSON responses, plus the conversions from
//! data-layer models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Comment, Notification, Post, User};
use crate::service::{FeedItem, Relationship};

/// User response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub username: Option<String>,
    pub bio: String,
    pub photo_url: Option<String>,
    pub followers: i64,
    pub following: i64,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            surname: user.surname.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            photo_url: user.photo_url.clone(),
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
        }
    }
}

/// Private view of one's own account (includes email and phone)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub email: String,
    pub phone: String,
    pub last_username_change: Option<DateTime<Utc>>,
}

impl AccountResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            user: UserResponse::from_user(user),
            email: user.email.clone(),
            phone: user.phone.clone(),
            last_username_change: user.last_username_change,
        }
    }
}

/// A user list entry carrying the viewer's follow-button state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListEntry {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Whether the requesting user follows this user
    pub followed_by_viewer: bool,
}

/// Session issued on login/signup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: AccountResponse,
}

/// Relationship response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipResponse {
    pub following: bool,
    pub followed_by: bool,
    pub followers: i64,
    pub following_count: i64,
}

impl RelationshipResponse {
    pub fn from_relationship(relationship: &Relationship) -> Self {
        Self {
            following: relationship.following,
            followed_by: relationship.followed_by,
            followers: relationship.followers,
            following_count: relationship.following_count,
        }
    }
}

/// Post response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub text: String,
    pub caption: String,
    pub image_url: Option<String>,
    pub likes: i64,
    pub shares: i64,
    pub comment_count: i64,
    /// Whether the requesting user has liked this post
    pub liked: bool,
    pub created_at: DateTime<Utc>,
    pub author: Option<UserResponse>,
}

impl PostResponse {
    pub fn from_feed_item(item: &FeedItem) -> Self {
        Self {
            id: item.post.id.clone(),
            text: item.post.text.clone(),
            caption: item.post.caption.clone(),
            image_url: item.post.image_url.clone(),
            likes: item.post.likes,
            shares: item.post.shares,
            comment_count: item.comment_count,
            liked: item.liked,
            created_at: item.post.created_at,
            author: item.author.as_ref().map(UserResponse::from_user),
        }
    }

    /// For a freshly created post: no likes, comments, or enrichment yet
    pub fn from_new_post(post: &Post, author: &User) -> Self {
        Self {
            id: post.id.clone(),
            text: post.text.clone(),
            caption: post.caption.clone(),
            image_url: post.image_url.clone(),
            likes: post.likes,
            shares: post.shares,
            comment_count: 0,
            liked: false,
            created_at: post.created_at,
            author: Some(UserResponse::from_user(author)),
        }
    }
}

/// Comment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<UserResponse>,
}

impl CommentResponse {
    pub fn from_comment(comment: &Comment, author: Option<&User>) -> Self {
        Self {
            id: comment.id.clone(),
            post_id: comment.post_id.clone(),
            text: comment.text.clone(),
            created_at: comment.created_at,
            author: author.map(UserResponse::from_user),
        }
    }
}

/// Notification response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
    /// Who triggered the notification
    pub from_user: Option<UserResponse>,
}

impl NotificationResponse {
    pub fn from_notification(notification: &Notification, from_user: Option<&User>) -> Self {
        Self {
            id: notification.id.clone(),
            kind: notification.kind.clone(),
            seen: notification.seen,
            created_at: notification.created_at,
            from_user: from_user.map(UserResponse::from_user),
        }
    }
}
