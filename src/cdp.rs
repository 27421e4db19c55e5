//! Chrome DevTools Protocol adapter implementation

use crate::{ClipRect, Engine, Error, LoadStatus, OutputFormat, PageError, Result, ShotConfig};
use anyhow::Context;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type OnPageErrorHandler = Arc<dyn Fn(&PageError) + Send + Sync>;
type HandlerSlot = Arc<Mutex<Option<OnPageErrorHandler>>>;

/// Name of the page binding that receives error reports
const ERROR_BINDING: &str = "__pageshot_error";

/// Extra time after the load event before the page is captured
const SETTLE_DELAY_MS: u64 = 500;

/// Installed on every new document; forwards uncaught errors and unhandled
/// rejections to the error binding as JSON strings.
const ERROR_HOOK: &str = r#"(function(){
    const report = window.__pageshot_error;
    if (!report) return;
    window.addEventListener('error', function(e){
        try {
            report(JSON.stringify({
                message: String(e.message || e.error || 'script error'),
                source: e.filename || null,
                line: e.lineno || null,
                column: e.colno || null
            }));
        } catch(_) {}
    });
    window.addEventListener('unhandledrejection', function(e){
        try { report(JSON.stringify({ message: 'Unhandled rejection: ' + String(e.reason) })); } catch(_) {}
    });
})();"#;

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

impl From<ErrorPayload> for PageError {
    fn from(p: ErrorPayload) -> Self {
        PageError {
            message: p.message,
            source: p.source,
            line: p.line,
            column: p.column,
        }
    }
}

/// Decode a binding payload; the page posts a JSON string, but a bare value
/// is accepted too.
fn parse_error_payload(payload: serde_json::Value) -> PageError {
    let value = match payload {
        serde_json::Value::String(s) => match serde_json::from_str::<serde_json::Value>(&s) {
            Ok(v) => v,
            Err(_) => serde_json::Value::String(s),
        },
        other => other,
    };

    match value {
        serde_json::Value::String(message) => PageError {
            message,
            source: None,
            line: None,
            column: None,
        },
        other => match serde_json::from_value::<ErrorPayload>(other.clone()) {
            Ok(p) => p.into(),
            Err(_) => PageError {
                message: other.to_string(),
                source: None,
                line: None,
                column: None,
            },
        },
    }
}

fn screenshot_format(format: OutputFormat) -> Option<Page::CaptureScreenshotFormatOption> {
    match format {
        OutputFormat::Png => Some(Page::CaptureScreenshotFormatOption::Png),
        OutputFormat::Jpeg => Some(Page::CaptureScreenshotFormatOption::Jpeg),
        OutputFormat::Webp => Some(Page::CaptureScreenshotFormatOption::Webp),
        OutputFormat::Pdf => None,
    }
}

fn clip_viewport(clip: ClipRect) -> Page::Viewport {
    Page::Viewport {
        x: clip.left as f64,
        y: clip.top as f64,
        width: clip.width as f64,
        height: clip.height as f64,
        scale: 1.0,
    }
}

/// CDP-based engine implementation (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome sized to the configured viewport and drives a
/// single tab.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: ShotConfig,
    on_page_error: HandlerSlot,
}

impl CdpEngine {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        Ok(())
    }

    fn install_error_hook(tab: &Tab, slot: HandlerSlot) -> Result<()> {
        tab.expose_function(
            ERROR_BINDING,
            Arc::new(move |payload: serde_json::Value| {
                let err = parse_error_payload(payload);
                debug!("Page error: {:?}", err);
                let handler = slot.lock().ok().and_then(|h| h.clone());
                if let Some(cb) = handler {
                    cb(&err);
                }
            }),
        )
        .context("Failed to expose error binding")?;

        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: ERROR_HOOK.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .context("Failed to inject error hook")?;

        Ok(())
    }
}

impl Engine for CdpEngine {
    fn new(config: ShotConfig) -> Result<Self>
    where
        Self: Sized,
    {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(timeout.max(Duration::from_secs(30)) + Duration::from_secs(10))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(timeout);

        if let Some(ua) = &config.user_agent {
            tab.set_user_agent(ua, None, None)
                .context("Failed to set user agent")?;
        }

        let on_page_error: HandlerSlot = Arc::new(Mutex::new(None));
        Self::install_error_hook(&tab, on_page_error.clone())?;

        Ok(Self {
            browser,
            tab,
            config,
            on_page_error,
        })
    }

    fn load_url(&mut self, url: &str) -> Result<LoadStatus> {
        match self.navigate(url) {
            Ok(()) => {
                std::thread::sleep(Duration::from_millis(SETTLE_DELAY_MS));
                Ok(LoadStatus::Success)
            }
            Err(Error::LoadError(reason)) => Ok(LoadStatus::Fail(reason)),
            Err(e) => Err(e),
        }
    }

    fn render(&self, format: OutputFormat, clip: ClipRect) -> Result<Vec<u8>> {
        let data = match screenshot_format(format) {
            Some(cdp_format) => {
                let quality = self.config.quality.filter(|_| format.supports_quality());
                self.tab
                    .capture_screenshot(cdp_format, quality, Some(clip_viewport(clip)), true)
                    .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?
            }
            None => self
                .tab
                .print_to_pdf(None)
                .map_err(|e| Error::RenderError(format!("Printing to PDF failed: {}", e)))?,
        };

        Ok(data)
    }

    fn on_page_error<F>(&mut self, cb: F)
    where
        F: Fn(&PageError) + Send + Sync + 'static,
    {
        match self.on_page_error.lock() {
            Ok(mut slot) => *slot = Some(Arc::new(cb)),
            Err(_) => warn!("Page error handler lock poisoned; handler not registered"),
        }
    }

    fn clear_on_page_error(&mut self) {
        if let Ok(mut slot) = self.on_page_error.lock() {
            *slot = None;
        }
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process goes away promptly
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_engine_creation() {
        let config = ShotConfig::default();
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = CdpEngine::new(config);
        if let Err(e) = result {
            eprintln!("Skipping CDP engine creation test because Chrome is not available or failed to launch: {}", e);
            return;
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_error_payload_json_string() {
        let payload = serde_json::Value::String(
            r#"{"message":"Uncaught ReferenceError: foo is not defined","source":"http://x/a.js","line":3,"column":7}"#
                .to_string(),
        );
        let err = parse_error_payload(payload);
        assert_eq!(err.message, "Uncaught ReferenceError: foo is not defined");
        assert_eq!(err.source.as_deref(), Some("http://x/a.js"));
        assert_eq!(err.line, Some(3));
        assert_eq!(err.column, Some(7));
    }

    #[test]
    fn test_parse_error_payload_partial_object() {
        let payload = serde_json::json!({ "message": "Unhandled rejection: boom", "line": null });
        let err = parse_error_payload(payload);
        assert_eq!(err.message, "Unhandled rejection: boom");
        assert!(err.source.is_none());
        assert!(err.line.is_none());
    }

    #[test]
    fn test_parse_error_payload_plain_text() {
        let err = parse_error_payload(serde_json::Value::String("not json".into()));
        assert_eq!(err.message, "not json");

        let err = parse_error_payload(serde_json::json!({ "unexpected": 1 }));
        assert!(err.message.contains("unexpected"));
    }

    #[test]
    fn test_clip_viewport_and_formats() {
        let v = clip_viewport(ShotConfig::default().clip);
        assert_eq!((v.x, v.y, v.width, v.height, v.scale), (0.0, 0.0, 1024.0, 768.0, 1.0));
        assert!(screenshot_format(OutputFormat::Pdf).is_none());
        assert!(matches!(
            screenshot_format(OutputFormat::Jpeg),
            Some(Page::CaptureScreenshotFormatOption::Jpeg)
        ));
    }
}
