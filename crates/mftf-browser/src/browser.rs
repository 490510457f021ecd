//! Browser session over the Chrome DevTools Protocol
//!
//! [`BrowserSession`] implements [`WebDriver`] on top of `headless_chrome`.
//! Elements are never held as live CDP nodes: every query evaluates the
//! locator in the page again and picks the requested position, and pointer
//! gestures are sent as raw `Input.dispatchMouseEvent` calls.

use crate::error::{BrowserError, Result};
use crate::webdriver::WebDriver;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Input;
use headless_chrome::{Browser, LaunchOptions, Tab};
use mftf_core::{ElementHandle, Locator, Point, PointerOp};
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
        }
    }
}

/// Where the pointer is and whether the primary button is down
#[derive(Debug, Clone, Copy, Default)]
struct PointerState {
    x: f64,
    y: f64,
    pressed: bool,
}

/// What every wrapped script evaluates to
#[derive(Debug, Deserialize)]
struct ScriptEnvelope {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    x: f64,
    y: f64,
}

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    pointer: Mutex<PointerState>,
}

impl BrowserSession {
    /// Launch a new browser instance
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default()).await
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| BrowserError::Browser(format!("Failed to launch browser: {}", e)))?;

        let user_agent_arg: Option<String> =
            config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| BrowserError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");
        Ok(Self::from_parts(browser, tab))
    }

    /// Connect to an existing browser instance
    ///
    /// # Arguments
    /// * `port` - Chrome DevTools Protocol port (typically 9222)
    pub async fn connect(port: u16) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let browser = Browser::connect(format!("http://127.0.0.1:{}", port))
            .map_err(|e| BrowserError::Browser(format!("Failed to connect to browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Connected to browser successfully");
        Ok(Self::from_parts(browser, tab))
    }

    fn from_parts(browser: Browser, tab: Arc<Tab>) -> Self {
        Self {
            browser,
            tab,
            pointer: Mutex::new(PointerState::default()),
        }
    }

    /// Navigate to a URL and wait for the navigation to commit
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Navigated to {}", url);
        Ok(())
    }

    /// Get the current page title
    pub async fn get_title(&self) -> Result<String> {
        let result = self.execute_script("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get the current URL
    pub async fn get_url(&self) -> Result<String> {
        let result = self.execute_script("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Close the session's tab
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        self.tab
            .close(true)
            .map_err(|e| BrowserError::Browser(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }

    /// Viewport coordinates of the element's center, scrolling it into view first
    async fn center_of(&self, element: &ElementHandle) -> Result<(f64, f64)> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }}; }})()",
            nth_element_expr(element)
        );
        let geometry = self.geometry(element, &script).await?;
        Ok((geometry.x, geometry.y))
    }

    async fn geometry(&self, element: &ElementHandle, script: &str) -> Result<Geometry> {
        let value = self.execute_script(script).await?;
        if value.is_null() {
            return Err(BrowserError::ElementNotFound {
                locator: element.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    fn pointer_state(&self) -> PointerState {
        *self.pointer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dispatch_mouse(
        &self,
        kind: Input::DispatchMouseEventTypeOption,
        x: f64,
        y: f64,
        pressed: bool,
    ) -> Result<()> {
        let button = match kind {
            Input::DispatchMouseEventTypeOption::MouseMoved if !pressed => Input::MouseButton::None,
            _ => Input::MouseButton::Left,
        };

        self.tab
            .call_method(Input::DispatchMouseEvent {
                Type: kind,
                x,
                y,
                modifiers: None,
                timestamp: None,
                button: Some(button),
                buttons: Some(if pressed { 1 } else { 0 }),
                click_count: Some(1),
                force: None,
                tangential_pressure: None,
                tilt_x: None,
                tilt_y: None,
                twist: None,
                delta_x: None,
                delta_y: None,
                pointer_Type: None,
            })
            .map_err(|e| BrowserError::Browser(format!("Mouse event failed: {}", e)))?;

        let mut pointer = self.pointer.lock().unwrap_or_else(|e| e.into_inner());
        *pointer = PointerState { x, y, pressed };
        Ok(())
    }

    async fn move_to(&self, x: f64, y: f64) -> Result<()> {
        let pressed = self.pointer_state().pressed;
        self.dispatch_mouse(Input::DispatchMouseEventTypeOption::MouseMoved, x, y, pressed)
    }
}

#[async_trait]
impl WebDriver for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        BrowserSession::navigate(self, url).await
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(&wrap_script(script), false)
            .map_err(|e| BrowserError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        let raw = result
            .value
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Script(format!("No result from script: {}", script)))?;

        let envelope: ScriptEnvelope = serde_json::from_str(raw)?;
        if envelope.ok {
            Ok(envelope.value)
        } else {
            Err(BrowserError::Script(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let script = format!("{}.length", nodes_expr(locator));
        let count = self.execute_script(&script).await?.as_u64().unwrap_or(0) as usize;
        debug!("{} matches {} element(s)", locator, count);
        Ok(ElementHandle::snapshot(locator, count))
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; \
             const style = window.getComputedStyle(el); \
             if (style.display === 'none' || style.visibility === 'hidden') return false; \
             return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length); }})()",
            nth_element_expr(element)
        );
        Ok(self.execute_script(&script).await?.as_bool().unwrap_or(false))
    }

    async fn position(&self, element: &ElementHandle) -> Result<Point> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.left + window.scrollX, y: r.top + window.scrollY }}; }})()",
            nth_element_expr(element)
        );
        let geometry = self.geometry(element, &script).await?;
        Ok(Point::new(geometry.x, geometry.y))
    }

    async fn perform(&self, ops: &[PointerOp]) -> Result<()> {
        use Input::DispatchMouseEventTypeOption::{MousePressed, MouseReleased};

        for op in ops {
            debug!("Pointer: {:?}", op);
            match op {
                PointerOp::MoveToElement(element) => {
                    let (x, y) = self.center_of(element).await?;
                    self.move_to(x, y).await?;
                }
                PointerOp::ClickAndHold(element) => {
                    let (x, y) = self.center_of(element).await?;
                    self.move_to(x, y).await?;
                    self.dispatch_mouse(MousePressed, x, y, true)?;
                }
                PointerOp::MoveByOffset { dx, dy } => {
                    let current = self.pointer_state();
                    self.move_to(current.x + *dx as f64, current.y + *dy as f64)
                        .await?;
                }
                PointerOp::Release(Some(element)) => {
                    let (x, y) = self.center_of(element).await?;
                    self.move_to(x, y).await?;
                    self.dispatch_mouse(MouseReleased, x, y, false)?;
                }
                PointerOp::Release(None) => {
                    let current = self.pointer_state();
                    self.dispatch_mouse(MouseReleased, current.x, current.y, false)?;
                }
            }
        }
        Ok(())
    }
}

/// Run `script` so that a thrown exception comes back as data instead of a CDP error
fn wrap_script(script: &str) -> String {
    format!(
        "(() => {{ try {{ const value = ({}); \
         return JSON.stringify({{ ok: true, value: value === undefined ? null : value }}); \
         }} catch (e) {{ return JSON.stringify({{ ok: false, error: String(e) }}); }} }})()",
        script
    )
}

/// JS expression yielding an array of every node matching `locator`
fn nodes_expr(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({}))",
            js_string(selector)
        ),
        Locator::XPath(expr) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
            js_string(expr)
        ),
    }
}

/// JS expression yielding the element at the handle's (1-based) position, or undefined
fn nth_element_expr(element: &ElementHandle) -> String {
    format!(
        "{}[{}]",
        nodes_expr(&element.locator),
        element.position.saturating_sub(1)
    )
}

fn js_string(raw: &str) -> String {
    // serde_json string literals are valid JS string literals
    Value::String(raw.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 1080);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"//div[@data-role="spinner"]"#),
            r#""//div[@data-role=\"spinner\"]""#
        );
    }

    #[test]
    fn test_nth_element_is_zero_based_in_js() {
        let handle = ElementHandle::new(Locator::css(".spinner"), 3);
        let expr = nth_element_expr(&handle);
        assert!(expr.starts_with("Array.from(document.querySelectorAll(\".spinner\"))"));
        assert!(expr.ends_with("[2]"));
    }

    #[test]
    fn test_xpath_nodes_use_snapshot() {
        let expr = nodes_expr(&Locator::xpath("//div"));
        assert!(expr.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(expr.contains("\"//div\""));
    }

    #[test]
    fn test_wrapped_script_reports_errors_as_data() {
        let wrapped = wrap_script("window.jQuery.active == 0");
        assert!(wrapped.contains("const value = (window.jQuery.active == 0)"));
        assert!(wrapped.contains("ok: false"));
    }

    #[test]
    fn test_script_envelope_parsing() {
        let ok: ScriptEnvelope = serde_json::from_str(r#"{"ok":true,"value":3}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.value, Value::from(3));

        let failed: ScriptEnvelope =
            serde_json::from_str(r#"{"ok":false,"error":"ReferenceError: jQuery"}"#).unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.value, Value::Null);
        assert_eq!(failed.error.as_deref(), Some("ReferenceError: jQuery"));
    }
}
