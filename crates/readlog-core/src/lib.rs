pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod recommend;
pub mod storage;
pub mod timeline;

pub use config::AppConfig;
pub use error::{ReadlogError, Result};
pub use models::*;

pub use analytics::{
    analyze, generate_advice, AnalyticsReport, PatternAnalyzer, PerformanceScorer, ReadingStatistics,
};
pub use recommend::{popular_recommendations, RecommendOptions, RecommendationEngine, UserProfile};
pub use storage::{BehaviorStore, InMemoryBehaviorStore, SqliteBehaviorStore};
pub use timeline::{MonthKey, ReadingTimeline};

#[cfg(feature = "async")]
pub use storage::{AsyncBehaviorStore, BlockingStore};
