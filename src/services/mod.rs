pub mod diversity;
pub mod ingest;
pub mod keywords;
pub mod providers;
pub mod recommend;
pub mod sanitize;
pub mod scoring;
pub mod tagging;
