//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer:
//! - `account`: signup, login, federated sign-in, profile and username rules
//! - `graph`: the follow/unfollow toggle and its notification side effects
//! - `feed`: posts, comments, likes, shares

mod account;
mod feed;
mod graph;

pub use account::AccountService;
pub use feed::{FeedItem, FeedService};
pub use graph::{GraphService, Relationship};
