use std::io::IsTerminal as _;

use anyhow::Result;
use clap::ColorChoice;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::FmtSpan, Layer as FmtLayer},
    layer::SubscriberExt as _,
    Registry,
};

pub(crate) struct Options {
    pub verbose: bool,
    pub color: ColorChoice,
}

/// Log to stderr, so that stdout only carries the response
pub(crate) fn set_up(options: &Options) -> Result<()> {
    let filter = if options.verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    let span_events = if options.verbose {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let ansi = match options.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        _ => std::io::stderr().is_terminal(),
    };

    let fmt_layer = FmtLayer::new()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_ansi(ansi);
    let subscriber = Registry::default()
        .with(LevelFilter::from_level(filter))
        .with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))?;

    Ok(())
}
