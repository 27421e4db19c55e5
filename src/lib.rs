//! pageshot
//!
//! Load a single URL in a headless browser and capture a fixed 1024x768
//! screenshot, either as base64 PNG on stdout or as a file on disk.
//!
//! # Example
//!
//! ```no_run
//! use pageshot::{Capture, Destination, ShotConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ShotConfig::default();
//! let engine = pageshot::new_engine(config.clone())?;
//!
//! let capture = Capture::new(config, Destination::File("shot.png".into()));
//! let outcome = capture.run(engine, "https://example.com", std::io::stdout());
//! std::process::exit(outcome.exit_status().code());
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod format;
pub use format::OutputFormat;

pub mod capture;
pub use capture::{Capture, Destination, ExitStatus, Outcome};

pub mod cli;

#[cfg(feature = "cdp")]
pub mod cdp;

/// Width of the rendering surface and capture rectangle, in CSS pixels
pub const VIEWPORT_WIDTH: u32 = 1024;
/// Height of the rendering surface and capture rectangle, in CSS pixels
pub const VIEWPORT_HEIGHT: u32 = 768;

/// Configuration for a capture run
///
/// The viewport and clip are fixed at 1024x768; the CLI never changes them.
///
/// # Examples
///
/// ```
/// let cfg = pageshot::ShotConfig::default();
/// assert_eq!(cfg.viewport.width, 1024);
/// assert!(!cfg.fail_on_page_error);
/// ```
#[derive(Debug, Clone)]
pub struct ShotConfig {
    /// Size of the headless rendering surface
    pub viewport: Viewport,
    /// Region of the page captured into the output image
    pub clip: ClipRect,
    /// Navigation timeout in milliseconds
    pub timeout_ms: u64,
    /// Overrides the browser's user agent when set
    pub user_agent: Option<String>,
    /// Encoder quality (0-100) for JPEG and WebP output
    pub quality: Option<u32>,
    /// Exit with status 2 when the page raised a script error
    pub fail_on_page_error: bool,
}

impl Default for ShotConfig {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            viewport,
            clip: ClipRect::from(viewport),
            timeout_ms: 20000,
            user_agent: None,
            quality: None,
            fail_on_page_error: false,
        }
    }
}

impl ShotConfig {
    /// Reject settings the browser host cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout must be greater than zero".into()));
        }
        if let Some(q) = self.quality {
            if q > 100 {
                return Err(Error::ConfigError(format!("quality must be within 0-100, got {}", q)));
            }
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
        }
    }
}

/// Pixel rectangle of the page captured into the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl From<Viewport> for ClipRect {
    fn from(v: Viewport) -> Self {
        Self {
            top: 0,
            left: 0,
            width: v.width,
            height: v.height,
        }
    }
}

/// Result of a page load as reported by the browser host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    /// Navigation failed; carries the host's reason
    Fail(String),
}

impl LoadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadStatus::Success)
    }
}

/// Uncaught script error raised by the loaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    /// Error message as reported by the page
    pub message: String,
    /// Script URL, if known
    pub source: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Core trait for browser hosts that can load a page and rasterize it
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: ShotConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and wait for the load to complete.
    ///
    /// A navigation the host could not complete is `Ok(LoadStatus::Fail)`;
    /// `Err` is reserved for failures of the host itself.
    fn load_url(&mut self, url: &str) -> Result<LoadStatus>;

    /// Render the current page into `format`, restricted to `clip`
    fn render(&self, format: OutputFormat, clip: ClipRect) -> Result<Vec<u8>>;

    /// Render the current page as PNG
    fn render_png(&self, clip: ClipRect) -> Result<Vec<u8>> {
        self.render(OutputFormat::Png, clip)
    }

    /// Register a callback for script errors raised by the page. Must be
    /// called before `load_url` to observe errors thrown during load.
    fn on_page_error<F>(&mut self, cb: F)
    where
        F: Fn(&PageError) + Send + Sync + 'static;

    /// Remove previously registered on_page_error callback if any
    fn clear_on_page_error(&mut self);

    /// Close the engine and tear down the browser host
    fn close(self) -> Result<()>;
}

/// Create a new engine instance with the default backend
#[cfg(feature = "cdp")]
pub fn new_engine(config: ShotConfig) -> Result<impl Engine> {
    cdp::CdpEngine::new(config)
}
