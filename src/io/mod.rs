pub mod cache;
pub mod catalog_file;
pub mod config;
pub mod report;
