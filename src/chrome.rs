//! [`PageSession`] over a Chrome instance driven through the DevTools protocol

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::DOM;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::BrowserConfig;
use crate::session::{ElementId, PageSession, SessionError};

/// Upper bound on a single browser command, page loads included
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Launch flags that advertise automation to the page
const HIDDEN_DEFAULT_ARGS: &[&str] = &["--enable-automation"];

pub struct ChromeSession {
    tab: Option<Arc<Tab>>,
    browser: Option<Browser>,
}

/// Extra Chrome flags so the session looks like a regular browser
pub fn launch_args(config: &BrowserConfig) -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--user-agent={}", config.user_agent),
    ]
}

pub fn launch_options<'a>(
    config: &BrowserConfig,
    args: &'a [String],
) -> Result<LaunchOptions<'a>, SessionError> {
    LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(false)
        .path(config.binary.clone())
        .args(args.iter().map(OsStr::new).collect())
        .ignore_default_args(HIDDEN_DEFAULT_ARGS.iter().map(OsStr::new).collect())
        .idle_browser_timeout(COMMAND_TIMEOUT)
        .build()
        .map_err(|e| SessionError::Protocol(format!("invalid launch options: {e}")))
}

/// Map a browser failure onto a session error
fn browser_error(err: anyhow::Error) -> SessionError {
    if err.is::<NoElementFound>() {
        SessionError::NoSuchElement(err.to_string())
    } else if err.is::<Timeout>() {
        SessionError::Timeout(err.to_string())
    } else {
        SessionError::Protocol(format!("{err:#}"))
    }
}

fn handle(element: &Element<'_>) -> ElementId {
    ElementId(element.backend_node_id.to_string())
}

fn handles(elements: Vec<Element<'_>>) -> Vec<ElementId> {
    elements.iter().map(handle).collect()
}

/// Handles carry backend node ids, which survive document re-queries;
/// each lookup pushes the node to the client again
fn resolve<'t>(tab: &'t Tab, id: &ElementId) -> Result<Element<'t>, SessionError> {
    let stale = || SessionError::StaleElement(id.0.clone());
    let backend_node_id: DOM::BackendNodeId = id.0.parse().map_err(|_| stale())?;

    let object = tab
        .call_method(DOM::ResolveNode {
            node_id: None,
            backend_node_id: Some(backend_node_id),
            object_group: None,
            execution_context_id: None,
        })
        .map_err(|_| stale())?
        .object;
    let object_id = object.object_id.ok_or_else(stale)?;
    let node_id = tab
        .call_method(DOM::RequestNode { object_id })
        .map_err(|_| stale())?
        .node_id;
    Element::new(tab, node_id).map_err(|_| stale())
}

/// Wrap a script written against `arguments` so it runs as a function body
fn function_body(script: &str) -> String {
    format!("function() {{ return (function() {{ {script} }}).apply(this, [this]); }}")
}

impl ChromeSession {
    /// Launch Chrome and open the tab the run drives
    pub fn start(config: &BrowserConfig) -> Result<Self, SessionError> {
        let args = launch_args(config);
        let options = launch_options(config, &args)?;
        let browser = Browser::new(options).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(COMMAND_TIMEOUT);
        info!(
            "Chrome session started ({}).",
            if config.headless { "headless" } else { "windowed" }
        );

        Ok(Self {
            tab: Some(tab),
            browser: Some(browser),
        })
    }

    fn tab(&self) -> Result<&Tab, SessionError> {
        self.tab
            .as_deref()
            .ok_or_else(|| SessionError::Protocol("session already closed".into()))
    }
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("navigate {}", url);
        self.tab()?
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(browser_error)?;
        Ok(())
    }

    fn find_all(&mut self, css: &str) -> Result<Vec<ElementId>, SessionError> {
        match self.tab()?.find_elements(css) {
            Ok(elements) => Ok(handles(elements)),
            Err(e) if e.is::<NoElementFound>() => Ok(Vec::new()),
            Err(e) => Err(browser_error(e)),
        }
    }

    fn find_all_within(
        &mut self,
        parent: &ElementId,
        css: &str,
    ) -> Result<Vec<ElementId>, SessionError> {
        let tab = self.tab()?;
        match resolve(tab, parent)?.find_elements(css) {
            Ok(elements) => Ok(handles(elements)),
            Err(e) if e.is::<NoElementFound>() => Ok(Vec::new()),
            Err(e) => Err(browser_error(e)),
        }
    }

    fn text(&mut self, element: &ElementId) -> Result<String, SessionError> {
        let tab = self.tab()?;
        resolve(tab, element)?.get_inner_text().map_err(browser_error)
    }

    fn attribute(
        &mut self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let tab = self.tab()?;
        resolve(tab, element)?
            .get_attribute_value(name)
            .map_err(browser_error)
    }

    fn parent(&mut self, element: &ElementId) -> Result<Option<ElementId>, SessionError> {
        let tab = self.tab()?;
        let parent = resolve(tab, element)?
            .call_js_fn("function() { return this.parentElement; }", vec![], false)
            .map_err(browser_error)?;
        let Some(object_id) = parent.object_id else {
            return Ok(None);
        };
        let node = tab
            .call_method(DOM::DescribeNode {
                node_id: None,
                backend_node_id: None,
                object_id: Some(object_id),
                depth: None,
                pierce: None,
            })
            .map_err(browser_error)?
            .node;
        Ok(Some(ElementId(node.backend_node_id.to_string())))
    }

    fn click(&mut self, element: &ElementId) -> Result<(), SessionError> {
        let tab = self.tab()?;
        resolve(tab, element)?.click().map_err(browser_error)?;
        Ok(())
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[&ElementId],
    ) -> Result<Value, SessionError> {
        let tab = self.tab()?;
        let result = match args {
            [] => tab
                .evaluate(&format!("(function() {{ {script} }})()"), false)
                .map_err(browser_error)?,
            [element] => resolve(tab, element)?
                .call_js_fn(&function_body(script), vec![], false)
                .map_err(browser_error)?,
            _ => {
                return Err(SessionError::Protocol(format!(
                    "scripts take at most one element, got {}",
                    args.len()
                )))
            }
        };
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        self.tab()?
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(browser_error)
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        self.tab()?.get_content().map_err(browser_error)
    }

    fn quit(&mut self) -> Result<(), SessionError> {
        let Some(tab) = self.tab.take() else {
            return Ok(());
        };
        let closed = tab.close(false).map_err(browser_error);
        // dropping the browser ends the Chrome process
        self.browser = None;
        closed.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_carry_browser_options() {
        let config = BrowserConfig {
            headless: true,
            binary: Some("/opt/chrome/chrome".into()),
            ..Default::default()
        };
        let args = launch_args(&config);
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));

        let options = launch_options(&config, &args).unwrap();
        assert!(options.headless);
        assert!(!options.sandbox);
        assert_eq!(options.path, Some("/opt/chrome/chrome".into()));
        assert_eq!(options.args.len(), args.len());
        assert_eq!(options.ignore_default_args, vec![OsStr::new("--enable-automation")]);
    }

    #[test]
    fn test_visible_browser_by_default() {
        let config = BrowserConfig::default();
        let args = launch_args(&config);
        let options = launch_options(&config, &args).unwrap();
        assert!(!options.headless);
        assert_eq!(options.path, None);
    }

    #[test]
    fn test_errors_map_to_variants() {
        let err = browser_error(anyhow::Error::new(NoElementFound {}));
        assert!(matches!(err, SessionError::NoSuchElement(_)));
        assert!(err.is_absence());

        let err = browser_error(anyhow::Error::new(Timeout {}));
        assert!(matches!(err, SessionError::Timeout(_)));

        let err = browser_error(anyhow::anyhow!("target crashed"));
        assert!(matches!(err, SessionError::Protocol(m) if m == "target crashed"));
    }

    #[test]
    fn test_scripts_see_element_as_first_argument() {
        let body = function_body("arguments[0].click();");
        assert!(body.starts_with("function() {"));
        assert!(body.contains("{ arguments[0].click(); }"));
        assert!(body.contains(".apply(this, [this])"));
    }
}
