//! Messaging surface driven through a W3C WebDriver endpoint
//! (chromedriver or compatible) over blocking HTTP.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};

use crate::automation::{AutomationError, MessagingSurface, StepResult};
use crate::config::Config;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const KEY_NULL: char = '\u{E000}';
const KEY_ENTER: char = '\u{E007}';
const KEY_SHIFT: char = '\u{E008}';
const KEY_ESCAPE: char = '\u{E00C}';

const NEW_CHAT: &str = r#"[aria-label="New chat"]"#;
const SEARCH_BOX: &str = r#"[role="textbox"]"#;
const NO_RESULTS: &str = "//*[contains(text(),'No results found')]";
const MESSAGE_BOX: &str = r#"#main [role="textbox"]"#;
const SEND_BUTTON: &str = r#"#main [aria-label="Send"]"#;

#[derive(Debug, Clone, Copy)]
enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl Locator<'_> {
    fn body(&self) -> Value {
        match self {
            Locator::Css(value) => json!({ "using": "css selector", "value": value }),
            Locator::XPath(value) => json!({ "using": "xpath", "value": value }),
        }
    }
}

pub struct WebDriverSurface {
    client: Client,
    endpoint: String,
    session_id: String,
    element_timeout: Duration,
    poll_interval: Duration,
    search_box: Option<String>,
}

impl WebDriverSurface {
    /// Starts a browser with the persistent profile and opens the
    /// messaging application.
    pub fn launch(config: &Config) -> StepResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AutomationError::Driver(format!("cannot build HTTP client: {}", e)))?;

        let endpoint = config.webdriver_url.trim_end_matches('/').to_string();
        let profile = fs::canonicalize(&config.profile_dir).unwrap_or_else(|_| config.profile_dir.clone());
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            format!("--user-data-dir={}", profile.display()),
                            "--start-maximized",
                        ]
                    }
                }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", endpoint), Some(capabilities))?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| AutomationError::Driver("new session response without sessionId".to_string()))?
            .to_string();
        info!("WebDriver session {} started", session_id);

        let surface = WebDriverSurface {
            client,
            endpoint,
            session_id,
            element_timeout: config.element_timeout(),
            poll_interval: Duration::from_millis(250),
            search_box: None,
        };
        surface.command(Method::POST, "/url", Some(json!({ "url": config.messaging_url })))?;
        info!("Opened {}", config.messaging_url);
        Ok(surface)
    }

    /// Ends the browser session.
    pub fn close(self) -> StepResult<()> {
        self.command(Method::DELETE, "", None)?;
        info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> StepResult<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        send(&self.client, method, &url, body)
    }

    fn find_all(&self, locator: Locator<'_>) -> StepResult<Vec<String>> {
        let value = self.command(Method::POST, "/elements", Some(locator.body()))?;
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(element_id).collect())
            .unwrap_or_default())
    }

    /// Polls until an element matches or the element timeout elapses.
    fn wait_for(&self, locator: Locator<'_>, what: &str) -> StepResult<String> {
        let deadline = Instant::now() + self.element_timeout;
        loop {
            if let Some(id) = self.find_all(locator)?.into_iter().next() {
                return Ok(id);
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::Timeout(what.to_string()));
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn click(&self, element: &str) -> StepResult<()> {
        self.command(Method::POST, &format!("/element/{}/click", element), Some(json!({})))?;
        Ok(())
    }

    fn clear(&self, element: &str) -> StepResult<()> {
        self.command(Method::POST, &format!("/element/{}/clear", element), Some(json!({})))?;
        Ok(())
    }

    fn type_keys(&self, element: &str, text: &str) -> StepResult<()> {
        self.command(Method::POST, &format!("/element/{}/value", element), Some(json!({ "text": text })))?;
        Ok(())
    }

    fn press_key(&self, key: char) -> StepResult<()> {
        let key = key.to_string();
        let actions = json!({
            "actions": [{
                "type": "key",
                "id": "keyboard",
                "actions": [
                    { "type": "keyDown", "value": key },
                    { "type": "keyUp", "value": key },
                ]
            }]
        });
        self.command(Method::POST, "/actions", Some(actions))?;
        self.command(Method::DELETE, "/actions", None)?;
        Ok(())
    }
}

impl MessagingSurface for WebDriverSurface {
    fn open_new_conversation(&mut self) -> StepResult<()> {
        let button = self.wait_for(Locator::Css(NEW_CHAT), "new chat button")?;
        self.click(&button)
    }

    fn search_recipient(&mut self, phone: &str) -> StepResult<()> {
        let search = self.wait_for(Locator::Css(SEARCH_BOX), "contact search box")?;
        self.clear(&search)?;
        self.type_keys(&search, phone)?;
        self.search_box = Some(search);
        Ok(())
    }

    fn has_no_results(&mut self) -> StepResult<bool> {
        Ok(!self.find_all(Locator::XPath(NO_RESULTS))?.is_empty())
    }

    fn select_first_result(&mut self) -> StepResult<()> {
        let search = self
            .search_box
            .clone()
            .ok_or_else(|| AutomationError::ElementNotFound("contact search box".to_string()))?;
        self.type_keys(&search, &KEY_ENTER.to_string())
    }

    fn enter_message_text(&mut self, body: &str) -> StepResult<()> {
        let input = self.wait_for(Locator::Css(MESSAGE_BOX), "message box")?;
        self.type_keys(&input, &encode_message(body))
    }

    fn invoke_send(&mut self) -> StepResult<()> {
        let button = self.wait_for(Locator::Css(SEND_BUTTON), "send button")?;
        self.click(&button)
    }

    fn capture_screenshot(&mut self, path: &Path) -> StepResult<()> {
        let value = self.command(Method::GET, "/screenshot", None)?;
        let encoded = value
            .as_str()
            .ok_or_else(|| AutomationError::Driver("screenshot response is not a string".to_string()))?;
        let png = STANDARD
            .decode(encoded)
            .map_err(|e| AutomationError::Driver(format!("invalid screenshot data: {}", e)))?;
        fs::write(path, png)?;
        Ok(())
    }

    fn dismiss_conversation(&mut self) -> StepResult<()> {
        self.search_box = None;
        self.press_key(KEY_ESCAPE)
    }
}

fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> StepResult<Value> {
    debug!("WebDriver {} {}", method, url);
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().map_err(transport_error)?;
    let status = response.status();
    let payload: Value = response.json().map_err(transport_error)?;

    if !status.is_success() {
        return Err(error_from_payload(&payload));
    }
    Ok(payload.get("value").cloned().unwrap_or(Value::Null))
}

fn transport_error(e: reqwest::Error) -> AutomationError {
    if e.is_timeout() {
        AutomationError::Timeout(format!("WebDriver response ({})", e))
    } else if e.is_connect() {
        AutomationError::Disconnected(e.to_string())
    } else {
        AutomationError::Driver(e.to_string())
    }
}

fn error_from_payload(payload: &Value) -> AutomationError {
    let error = payload["value"]["error"].as_str().unwrap_or("unknown error");
    let message = payload["value"]["message"].as_str().unwrap_or("");
    match error {
        "no such element" | "stale element reference" => AutomationError::ElementNotFound(message.to_string()),
        "timeout" | "script timeout" => AutomationError::Timeout(message.to_string()),
        "invalid session id" | "no such window" => AutomationError::Disconnected(message.to_string()),
        _ => AutomationError::Driver(format!("{}: {}", error, message)),
    }
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(str::to_string)
}

/// Line breaks become Shift+Enter so a multi-line message is not sent
/// one line at a time.
fn encode_message(body: &str) -> String {
    let mut keys = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '\r' => {}
            '\n' => {
                keys.push(KEY_SHIFT);
                keys.push(KEY_ENTER);
                keys.push(KEY_NULL);
            }
            other => keys.push(other),
        }
    }
    keys
}
