//! Content-based recommendations over a user's own reading log.

mod curated;
mod engine;
pub mod profile;

pub use curated::popular_recommendations;
pub use engine::{RecommendOptions, RecommendationEngine};
pub use profile::UserProfile;
