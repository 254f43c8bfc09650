pub mod score_feed;

pub use score_feed::{FeedGame, ScoreFeedClient};
