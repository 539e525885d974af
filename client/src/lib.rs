pub mod analysis;
pub mod config;
pub mod feedback;
pub mod images;
pub mod progress;
pub mod report;
