pub mod feed;
pub mod usage;

pub use feed::{FeedSource, InsertOutcome, NewFeedItem, SourceOutcome, SourceResult};
pub use usage::{DailyUsage, UsageKey};
