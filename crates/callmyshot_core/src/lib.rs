pub mod domain;
pub mod feed;
pub mod handlers;
pub mod identity;
pub mod memory;
pub mod ports;

pub use domain::{
    AuthorSnapshot, Comment, CommentDraft, CommentThread, Likes, Shot, ShotDraft, UserSession,
};
pub use feed::{assemble_feed, FeedItem};
pub use handlers::{
    ActionState, Dashboard, InteractionError, InteractionResult, Refreshed, ShotInteractions,
};
pub use identity::{IdentitySession, Subscription};
pub use memory::MemoryShotStore;
pub use ports::{
    AuthenticatedSession, Credentials, IdentityProvider, PortError, PortResult, Registration,
    ShotStore, DEFAULT_FEED_LIMIT,
};
