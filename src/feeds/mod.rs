pub mod fetcher;
pub mod parser;
pub mod text;

pub use fetcher::{FeedFetcher, FetchError, HttpFeedFetcher};
pub use parser::{FeedParser, ParsedItem};
