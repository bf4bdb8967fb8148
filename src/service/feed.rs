//! Feed service
//!
//! Post creation (media upload first, then the database row), feed
//! retrieval, comments, likes, and shares.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use crate::data::{Comment, Database, EntityId, Post, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

fn sanitize_text(value: &str) -> String {
    ammonia::Builder::empty()
        .clean(value)
        .to_string()
        .trim()
        .to_string()
}

/// A feed entry: the post plus what the client renders next to it
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub post: Post,
    /// Post author, if still present
    pub author: Option<User>,
    /// Whether the viewer has liked this post
    pub liked: bool,
    /// Number of comments on this post
    pub comment_count: i64,
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Create a post.
    ///
    /// Requires text and/or an image. The image is uploaded to the media
    /// host first; the post row is only written once the secure URL exists,
    /// so a failed upload never leaves a post without its image.
    pub async fn create_post(
        &self,
        user_id: &str,
        text: &str,
        caption: &str,
        image: Option<(Vec<u8>, String)>,
    ) -> Result<Post, AppError> {
        let text = sanitize_text(text);
        let caption = sanitize_text(caption);

        if text.is_empty() && image.is_none() {
            return Err(AppError::Validation(
                "post must contain text or an image".to_string(),
            ));
        }

        let id = EntityId::new().0;
        let image_url = match image {
            Some((data, content_type)) => Some(
                self.storage
                    .upload_post_image(&id, data, &content_type)
                    .await?,
            ),
            None => None,
        };

        let post = Post {
            id,
            user_id: user_id.to_string(),
            text,
            caption,
            image_url,
            likes: 0,
            shares: 0,
            created_at: Utc::now(),
        };
        self.db.insert_post(&post).await?;

        crate::metrics::POSTS_TOTAL.inc();
        tracing::info!(post_id = %post.id, user_id, "Post created");

        Ok(post)
    }

    /// Global feed, newest first
    pub async fn global_feed(
        &self,
        viewer_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<FeedItem>, AppError> {
        let posts = self.db.get_posts(limit, max_id).await?;
        self.enrich(posts, viewer_id).await
    }

    /// One user's posts, newest first
    pub async fn user_feed(
        &self,
        user_id: &str,
        viewer_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<FeedItem>, AppError> {
        let posts = self.db.get_posts_by_user(user_id, limit, max_id).await?;
        self.enrich(posts, viewer_id).await
    }

    async fn enrich(&self, posts: Vec<Post>, viewer_id: &str) -> Result<Vec<FeedItem>, AppError> {
        let post_ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let author_ids: Vec<String> = posts
            .iter()
            .map(|post| post.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<String, User> = self
            .db
            .get_users_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        let liked: HashSet<String> = self
            .db
            .get_liked_post_ids(viewer_id, &post_ids)
            .await?
            .into_iter()
            .collect();

        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let comment_count = self.db.count_comments(&post.id).await?;
            let author = authors.get(&post.user_id).cloned();
            let post_liked = liked.contains(&post.id);
            items.push(FeedItem {
                author,
                liked: post_liked,
                comment_count,
                post,
            });
        }

        Ok(items)
    }

    /// Get a single post, enriched for the viewer
    pub async fn get_post(&self, post_id: &str, viewer_id: &str) -> Result<FeedItem, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        let mut items = self.enrich(vec![post], viewer_id).await?;
        Ok(items.remove(0))
    }

    /// Toggle the viewer's like on a post.
    ///
    /// # Returns
    /// (liked-after-call, like count after call)
    pub async fn toggle_like(
        &self,
        post_id: &str,
        viewer_id: &str,
    ) -> Result<(bool, i64), AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let liked = self.db.toggle_like(post_id, viewer_id).await?;
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;

        Ok((liked, post.likes))
    }

    /// Record a share of a post
    ///
    /// # Returns
    /// The share count after the increment
    pub async fn share(&self, post_id: &str) -> Result<i64, AppError> {
        if !self.db.increment_shares(post_id).await? {
            return Err(AppError::NotFound);
        }

        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        Ok(post.shares)
    }

    /// A post's comments, oldest first, each with its author
    pub async fn comments(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<(Comment, Option<User>)>, AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let comments = self.db.get_comments(post_id, limit).await?;
        let author_ids: Vec<String> = comments
            .iter()
            .map(|comment| comment.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<String, User> = self
            .db
            .get_users_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.user_id).cloned();
                (comment, author)
            })
            .collect())
    }

    /// Add a comment to a post
    pub async fn add_comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Comment, AppError> {
        let text = sanitize_text(text);
        if text.is_empty() {
            return Err(AppError::Validation("comment cannot be empty".to_string()));
        }

        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let comment = Comment {
            id: EntityId::new().0,
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            text,
            created_at: Utc::now(),
        };
        self.db.insert_comment(&comment).await?;

        Ok(comment)
    }

    /// Delete a comment.
    ///
    /// Only the comment's author may delete it.
    pub async fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<(), AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if comment.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        self.db.delete_comment(comment_id).await?;
        Ok(())
    }
}
