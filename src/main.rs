use rookery::{CrawlConfig, ScrapingContext, crawl};

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let crawl_config = CrawlConfig::new()?;
    info!(
        "Crawling {} queries between {} and {}",
        crawl_config.queries.len(),
        crawl_config.date_range.from,
        crawl_config.date_range.to
    );
    let ctx = ScrapingContext::new(crawl_config)?;

    let reports = match crawl(&ctx).await {
        Ok(reports) => reports,
        Err(e) => {
            error!("Crawl aborted: {e:#}");
            return Err(e);
        }
    };

    for report in &reports {
        info!(
            "{}: {}/{} processed this run, {} failed, {} were already done",
            report.query, report.processed, report.total, report.failed, report.already_done
        );
    }
    Ok(())
}
