pub mod cache;
pub mod charts;
pub mod export;
pub mod insights;
pub mod listing;
pub mod normalizer;
pub mod ranking;
