//! Workday job board platform.
//!
//! Workday-hosted boards share a DOM vocabulary built on
//! `data-automation-id` attributes and come in two listing layouts: numbered
//! pagination and infinite scroll. The crawler handles both; the parser
//! normalizes Workday's relative dates, `Locations:` prefixes, and `REQ-`
//! job ids.

pub mod config;
mod crawler;
mod parser;

pub use crawler::WorkdayCrawler;
pub use parser::WorkdayParser;

use super::{Crawler, Parser, PlatformBinding};

/// Registry entry for Workday boards.
pub fn binding() -> PlatformBinding {
    PlatformBinding {
        identifier: "workday",
        crawler: |merged| {
            WorkdayCrawler::from_config(merged).map(|crawler| Box::new(crawler) as Box<dyn Crawler>)
        },
        parser: || Box::new(WorkdayParser::new()) as Box<dyn Parser>,
        config: config::platform_config,
    }
}
