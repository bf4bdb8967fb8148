//! Storage module
//!
//! Media files live on a third-party image host, not on this server.

mod media;

pub use media::MediaStorage;
