use tracing::level_filters::LevelFilter;
use tracing::{Span, info_span};
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};
use uuid::Uuid;

pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::INFO, "info")
    };
    let app_filter = Targets::new()
        .with_target("fundscrape", level_filter)
        .with_default(LevelFilter::WARN);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(app_filter)
        .with(env_filter)
        .init();
}

/// Span tagging every log line of one scrape unit with a fresh correlation id.
pub fn scrape_unit_span(stage: &'static str) -> Span {
    let correlation_id = Uuid::new_v4();
    info_span!("scrape_unit", stage, %correlation_id)
}
