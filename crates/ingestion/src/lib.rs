//! Trade ingestion for the flowbar pipeline.
//!
//! This crate handles:
//! - Raw record validation
//! - Timestamp ordering
//! - Trade delta classification and running CVD
//! - Bucket bar building (time and tick buckets)
//! - Trade feeds

pub mod bar_builder;
pub mod classifier;
pub mod cvd;
pub mod feed;
pub mod ordering;
pub mod raw;

pub use bar_builder::BarBuilder;
pub use classifier::{classify, ClassificationStats, TradeClassifier};
pub use cvd::CvdAccumulator;
pub use feed::{FeedRequest, JsonLinesFeed, MemoryFeed, TradeFeed};
pub use ordering::enforce_order;
pub use raw::{validate_all, RawTimestamp, RawTrade};
