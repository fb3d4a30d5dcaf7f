pub mod consumer;
pub mod interest;
pub mod ranking_store;
pub mod recommend;
pub mod score;

pub use consumer::RankingEventHandler;
pub use interest::InterestStore;
pub use ranking_store::{RankingStore, RedisRankingStore};
pub use recommend::RecommendService;
pub use score::ScoreEngine;
