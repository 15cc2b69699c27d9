pub mod feed_ingest;
pub mod rate_limit;

pub use feed_ingest::FeedIngestService;
pub use rate_limit::{seconds_until_reset, RateLimitDecision, RateLimitService};
