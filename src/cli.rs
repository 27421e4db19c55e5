//! Command-line arguments

use crate::{Destination, ShotConfig};
use clap::Parser;
use std::path::PathBuf;

/// Load a URL in headless Chrome and capture a 1024x768 screenshot.
///
/// Without OUTPUT the screenshot is printed to stdout as base64 PNG.
#[derive(Debug, Parser)]
#[command(name = "pageshot", version, about)]
pub struct Args {
    /// Page to load
    pub url: String,

    /// File to write; the extension picks the format (png, jpg, jpeg, webp, pdf)
    pub output: Option<PathBuf>,

    /// Give up on the page load after this many milliseconds
    #[arg(long, default_value_t = 20000, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// Override the browser's user agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Encoder quality for jpg and webp output
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub quality: Option<u32>,

    /// Exit with status 2 if the page raises a script error
    #[arg(long)]
    pub fail_on_page_error: bool,
}

impl Args {
    pub fn config(&self) -> ShotConfig {
        ShotConfig {
            timeout_ms: self.timeout_ms,
            user_agent: self.user_agent.clone(),
            quality: self.quality,
            fail_on_page_error: self.fail_on_page_error,
            ..Default::default()
        }
    }

    pub fn destination(&self) -> Destination {
        Destination::from(self.output.clone())
    }
}
