pub mod analysis;
pub mod book;
pub mod performance;
pub mod recommendation;
pub mod statistics;

pub use analysis::*;
pub use book::*;
pub use performance::*;
pub use recommendation::*;
pub use statistics::*;
