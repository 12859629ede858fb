pub mod checkpoint_store;
pub mod config;
pub mod crawl_driver;
pub mod date_resolver;
pub mod discovery;
pub mod error;
pub mod header_normalizer;
pub mod link_enricher;
pub mod output;
pub mod pages;
pub mod ratelimit;
pub mod requests;
pub mod scraping_context;
pub mod table_extractor;
mod text_manipulators;

pub use checkpoint_store::{CheckpointStore, FrontierEntry};
pub use config::{CrawlConfig, DateRange};
pub use crawl_driver::{CrawlDriver, QueryReport, crawl};
pub use error::CrawlError;
pub use scraping_context::{CrawlSession, ScrapingContext};
