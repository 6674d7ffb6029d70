pub mod listing;
pub mod recognition;
pub mod report;
pub mod stats;

// Re-exports for convenience
pub use listing::*;
pub use recognition::*;
pub use report::*;
pub use stats::*;
