//! Playwright browser automation through a long-lived Node.js bridge
//!
//! The bridge script is written to a temp dir and run with `node`. Requests
//! and replies are single-line JSON objects on the child's stdin/stdout:
//! `{"id":1,"op":"click",...}` answered by `{"id":1,"ok":true,"result":...}`.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{
    Browser, ClickOptions, ContextOptions, LoadState, Locator, Page, UrlPattern, WaitState,
};

/// Extra time granted to a reply on top of the Playwright-side timeout
const REPLY_SLACK: Duration = Duration::from_secs(10);

/// Playwright-side wait for one-shot state probes
const PROBE_TIMEOUT: Duration = Duration::from_millis(1_000);

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

let browser = null;
const pages = new Map();
let nextPage = 1;

function text(m) {
  if (m == null) return undefined;
  return m.type === 'regex' ? new RegExp(m.source, m.flags) : m.value;
}

function resolve(page, root, loc) {
  switch (loc.kind) {
    case 'test_id':
      return root.getByTestId(loc.id);
    case 'role': {
      const opts = {};
      if (loc.name) opts.name = text(loc.name);
      if (loc.exact) opts.exact = true;
      if (loc.level != null) opts.level = loc.level;
      return root.getByRole(loc.role, opts);
    }
    case 'label':
      return root.getByLabel(loc.text);
    case 'placeholder':
      return root.getByPlaceholder(loc.text);
    case 'text':
      return root.getByText(text(loc.text), { exact: !!loc.exact });
    case 'css':
      return loc.has_text
        ? root.locator(loc.selector, { hasText: text(loc.has_text) })
        : root.locator(loc.selector);
    case 'nth': {
      const inner = resolve(page, root, loc.inner);
      return loc.index < 0 ? inner.last() : inner.nth(loc.index);
    }
    case 'within':
      return resolve(page, resolve(page, root, loc.parent), loc.child);
    case 'filter': {
      const opts = {};
      if (loc.has_text) opts.hasText = text(loc.has_text);
      if (loc.has_not) opts.hasNot = resolve(page, page, loc.has_not);
      return resolve(page, root, loc.inner).filter(opts);
    }
    default:
      throw new Error(`unknown locator kind ${loc.kind}`);
  }
}

function urlMatcher(pattern) {
  switch (pattern.type) {
    case 'contains':
      return (url) => url.href.includes(pattern.value);
    case 'glob':
      return pattern.value;
    case 'regex':
      return new RegExp(pattern.value);
    default:
      throw new Error(`unknown url pattern ${pattern.type}`);
  }
}

function entry(msg) {
  const e = pages.get(msg.page);
  if (!e) throw new Error(`unknown page ${msg.page}`);
  return e;
}

function target(msg) {
  const e = entry(msg);
  return resolve(e.page, e.page, msg.locator);
}

const ops = {
  async launch(msg) {
    const type = playwright[msg.browser];
    if (!type) throw new Error(`unsupported browser ${msg.browser}`);
    browser = await type.launch({ headless: msg.headless, slowMo: msg.slow_mo_ms || 0 });
    return null;
  },
  async new_page(msg) {
    const o = msg.options || {};
    const contextOptions = { viewport: msg.viewport };
    if (o.storage_state) contextOptions.storageState = o.storage_state;
    if (o.geolocation) contextOptions.geolocation = o.geolocation;
    if (o.permissions && o.permissions.length) contextOptions.permissions = o.permissions;
    const context = await browser.newContext(contextOptions);
    for (const script of o.init_scripts || []) await context.addInitScript(script);
    const page = await context.newPage();
    const responses = [];
    page.on('response', (r) => {
      responses.push({ url: r.url(), status: r.status() });
      if (responses.length > 500) responses.shift();
    });
    const id = nextPage++;
    pages.set(id, { page, context, responses });
    return id;
  },
  async url(msg) { return entry(msg).page.url(); },
  async goto(msg) {
    await entry(msg).page.goto(msg.url, { timeout: msg.timeout_ms, waitUntil: 'domcontentloaded' });
    return null;
  },
  async load_state(msg) {
    await entry(msg).page.waitForLoadState(msg.state, { timeout: msg.timeout_ms });
    return null;
  },
  async is_visible(msg) { return target(msg).isVisible(); },
  async is_enabled(msg) { return target(msg).isEnabled({ timeout: msg.timeout_ms }); },
  async is_disabled(msg) { return target(msg).isDisabled({ timeout: msg.timeout_ms }); },
  async count(msg) { return target(msg).count(); },
  async fill(msg) { await target(msg).fill(msg.value, { timeout: msg.timeout_ms }); return null; },
  async click(msg) {
    await target(msg).click({ force: !!msg.force, timeout: msg.timeout_ms });
    return null;
  },
  async check(msg) { await target(msg).check({ timeout: msg.timeout_ms }); return null; },
  async press(msg) { await target(msg).press(msg.key, { timeout: msg.timeout_ms }); return null; },
  async set_input_files(msg) {
    await target(msg).setInputFiles(msg.files, { timeout: msg.timeout_ms });
    return null;
  },
  async text_content(msg) { return target(msg).textContent({ timeout: msg.timeout_ms }); },
  async inner_text(msg) { return target(msg).innerText({ timeout: msg.timeout_ms }); },
  async input_value(msg) { return target(msg).inputValue({ timeout: msg.timeout_ms }); },
  async wait_for(msg) {
    await target(msg).waitFor({ state: msg.state, timeout: msg.timeout_ms });
    return null;
  },
  async wait_for_url(msg) {
    await entry(msg).page.waitForURL(urlMatcher(msg.pattern), { timeout: msg.timeout_ms });
    return null;
  },
  async wait_for_response(msg) {
    const e = entry(msg);
    const hit = (url, status) => url.startsWith(msg.url) && status === msg.status;
    if (e.responses.some((r) => hit(r.url, r.status))) return null;
    await e.page.waitForResponse((r) => hit(r.url(), r.status()), { timeout: msg.timeout_ms });
    return null;
  },
  async save_storage_state(msg) {
    await entry(msg).context.storageState({ path: msg.path });
    return null;
  },
  async close(msg) {
    const e = entry(msg);
    pages.delete(msg.page);
    await e.context.close();
    return null;
  },
  async shutdown() {
    if (browser) await browser.close();
    browser = null;
    return null;
  },
};

function reply(obj) {
  process.stdout.write(JSON.stringify(obj) + '\n');
}

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', async (line) => {
  let msg;
  try {
    msg = JSON.parse(line);
  } catch (e) {
    return;
  }
  const op = ops[msg.op];
  if (!op) {
    reply({ id: msg.id, ok: false, error: `unknown op ${msg.op}`, kind: 'error' });
    return;
  }
  try {
    reply({ id: msg.id, ok: true, result: await op(msg) });
  } catch (e) {
    const kind = e && e.name === 'TimeoutError' ? 'timeout' : 'error';
    reply({ id: msg.id, ok: false, error: String(e && e.message ? e.message : e), kind });
  }
});
rl.on('close', async () => {
  if (browser) await browser.close().catch(() => {});
  process.exit(0);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Delay between Playwright operations, handy when watching a headed run
    pub slow_mo_ms: u64,
    /// Timeout for individual element actions (fill, click, ...)
    pub action_timeout: Duration,
    /// `node_modules` containing the `playwright` package
    pub node_modules: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            // CAPTCHA and OTP gates need a visible window
            headless: false,
            viewport_width: 1280,
            viewport_height: 720,
            slow_mo_ms: 0,
            action_timeout: Duration::from_secs(30),
            node_modules: PathBuf::from("node_modules"),
        }
    }
}

/// One reply line from the bridge
#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

impl BridgeReply {
    fn into_result(self) -> E2eResult<Value> {
        if self.ok {
            return Ok(self.result);
        }
        let message = self
            .error
            .unwrap_or_else(|| "bridge reported an error without a message".to_string());
        match self.kind.as_deref() {
            Some("timeout") => Err(E2eError::Timeout(message)),
            _ => Err(E2eError::Playwright(message)),
        }
    }
}

/// Serialize a request; `params` must be a JSON object
fn encode_request(id: u64, op: &str, params: Value) -> E2eResult<String> {
    let mut message = match params {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(E2eError::Bridge(format!(
                "{} params must be an object, got {}",
                op, other
            )))
        }
    };
    message.insert("id".to_string(), json!(id));
    message.insert("op".to_string(), json!(op));
    Ok(serde_json::to_string(&Value::Object(message))?)
}

/// Parse a stdout line; anything that is not a reply is `None`
fn decode_reply(line: &str) -> Option<BridgeReply> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

fn context_params(options: &ContextOptions, config: &PlaywrightConfig) -> E2eResult<Value> {
    Ok(json!({
        "viewport": { "width": config.viewport_width, "height": config.viewport_height },
        "options": {
            "storage_state": options.storage_state,
            "geolocation": serde_json::to_value(options.geolocation)?,
            "permissions": options.permissions,
            "init_scripts": options.init_scripts,
        },
    }))
}

struct BridgeConn {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    _script_dir: TempDir,
}

impl BridgeConn {
    async fn request(&mut self, op: &str, params: Value, deadline: Duration) -> E2eResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let line = encode_request(id, op, params)?;
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        match timeout(deadline, self.read_reply(id)).await {
            Ok(result) => result,
            Err(_) => Err(E2eError::Timeout(format!(
                "bridge reply to '{}' ({:?})",
                op, deadline
            ))),
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<Value> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Bridge("bridge process exited".to_string()))?;
            match decode_reply(&line) {
                Some(reply) if reply.id == id => return reply.into_result(),
                Some(reply) => debug!("Discarding stale bridge reply {}", reply.id),
                None => debug!("[bridge] {}", line),
            }
        }
    }
}

impl Drop for BridgeConn {
    fn drop(&mut self) {
        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    std::thread::sleep(Duration::from_millis(500));
                }
            }
        }

        let _ = self.child.start_kill();
    }
}

/// Running browser behind the Node bridge
pub struct PlaywrightBridge {
    conn: Arc<Mutex<BridgeConn>>,
    config: PlaywrightConfig,
}

impl PlaywrightBridge {
    /// Write the bridge script, start `node` and launch the browser
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let node_modules = std::env::current_dir()?.join(&config.node_modules);
        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .env("NODE_PATH", &node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Bridge(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;

        let mut conn = BridgeConn {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            _script_dir: script_dir,
        };

        conn.request(
            "launch",
            json!({
                "browser": config.browser.as_str(),
                "headless": config.headless,
                "slow_mo_ms": config.slow_mo_ms,
            }),
            LAUNCH_TIMEOUT,
        )
        .await?;

        info!(
            "Launched {} (headless: {}) via Playwright bridge",
            config.browser.as_str(),
            config.headless
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Close the browser and let the bridge exit
    pub async fn shutdown(self) -> E2eResult<()> {
        let mut conn = self.conn.lock().await;
        if let Err(e) = conn.request("shutdown", Value::Null, LAUNCH_TIMEOUT).await {
            warn!("Browser shutdown failed: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for PlaywrightBridge {
    type Page = PlaywrightPage;

    async fn new_page(&mut self, options: ContextOptions) -> E2eResult<PlaywrightPage> {
        let params = context_params(&options, &self.config)?;
        let result = self
            .conn
            .lock()
            .await
            .request("new_page", params, LAUNCH_TIMEOUT)
            .await?;
        let id = result
            .as_u64()
            .ok_or_else(|| E2eError::Bridge(format!("new_page returned {}", result)))?;

        if let Some(state) = &options.storage_state {
            debug!("Page {} restored from {}", id, state.display());
        }
        Ok(PlaywrightPage {
            conn: Arc::clone(&self.conn),
            id,
            action_timeout: self.config.action_timeout,
        })
    }
}

/// A page inside its own browser context
pub struct PlaywrightPage {
    conn: Arc<Mutex<BridgeConn>>,
    id: u64,
    action_timeout: Duration,
}

impl PlaywrightPage {
    async fn call(&self, op: &str, params: Value, wait: Duration) -> E2eResult<Value> {
        let mut params = match params {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        params.insert("page".to_string(), json!(self.id));
        params.insert("timeout_ms".to_string(), json!(wait.as_millis() as u64));
        self.conn
            .lock()
            .await
            .request(op, Value::Object(params), wait + REPLY_SLACK)
            .await
    }

    async fn on(&self, op: &str, locator: &Locator, extra: Value, wait: Duration) -> E2eResult<Value> {
        let mut params = match extra {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        params.insert("locator".to_string(), serde_json::to_value(locator)?);
        self.call(op, Value::Object(params), wait).await
    }
}

fn as_bool(op: &str, value: Value) -> E2eResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| E2eError::Bridge(format!("{} returned {}", op, value)))
}

fn as_string(op: &str, value: Value) -> E2eResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(E2eError::Bridge(format!("{} returned {}", op, other))),
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn url(&mut self) -> E2eResult<String> {
        let value = self.call("url", Value::Null, PROBE_TIMEOUT).await?;
        as_string("url", value)
    }

    async fn goto(&mut self, url: &str, timeout: Duration) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.call("goto", json!({ "url": url }), timeout).await?;
        Ok(())
    }

    async fn wait_for_load_state(&mut self, state: LoadState) -> E2eResult<()> {
        self.call("load_state", json!({ "state": state.as_str() }), self.action_timeout)
            .await?;
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self.on("is_visible", locator, Value::Null, PROBE_TIMEOUT).await?;
        as_bool("is_visible", value)
    }

    async fn is_enabled(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self.on("is_enabled", locator, Value::Null, PROBE_TIMEOUT).await?;
        as_bool("is_enabled", value)
    }

    async fn is_disabled(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self.on("is_disabled", locator, Value::Null, PROBE_TIMEOUT).await?;
        as_bool("is_disabled", value)
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        let value = self.on("count", locator, Value::Null, PROBE_TIMEOUT).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Bridge(format!("count returned {}", value)))
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()> {
        debug!("Filling {}", locator);
        self.on("fill", locator, json!({ "value": value }), self.action_timeout)
            .await?;
        Ok(())
    }

    async fn click_with(&mut self, locator: &Locator, options: ClickOptions) -> E2eResult<()> {
        debug!("Clicking {}", locator);
        self.on(
            "click",
            locator,
            json!({ "force": options.force }),
            self.action_timeout,
        )
        .await?;
        Ok(())
    }

    async fn check(&mut self, locator: &Locator) -> E2eResult<()> {
        self.on("check", locator, Value::Null, self.action_timeout)
            .await?;
        Ok(())
    }

    async fn press(&mut self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.on("press", locator, json!({ "key": key }), self.action_timeout)
            .await?;
        Ok(())
    }

    async fn set_input_files(&mut self, locator: &Locator, files: &[PathBuf]) -> E2eResult<()> {
        let files: Vec<String> = files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .collect();
        self.on(
            "set_input_files",
            locator,
            json!({ "files": files }),
            self.action_timeout,
        )
        .await?;
        Ok(())
    }

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        match self
            .on("text_content", locator, Value::Null, self.action_timeout)
            .await?
        {
            Value::Null => Ok(None),
            other => as_string("text_content", other).map(Some),
        }
    }

    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String> {
        let value = self
            .on("inner_text", locator, Value::Null, self.action_timeout)
            .await?;
        as_string("inner_text", value)
    }

    async fn input_value(&mut self, locator: &Locator) -> E2eResult<String> {
        let value = self
            .on("input_value", locator, Value::Null, PROBE_TIMEOUT)
            .await?;
        as_string("input_value", value)
    }

    async fn wait_for(
        &mut self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.on("wait_for", locator, json!({ "state": state.as_str() }), timeout)
            .await?;
        Ok(())
    }

    async fn wait_for_url(&mut self, pattern: &UrlPattern, timeout: Duration) -> E2eResult<()> {
        self.call(
            "wait_for_url",
            json!({ "pattern": serde_json::to_value(pattern)? }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn wait_for_response(
        &mut self,
        url: &str,
        status: u16,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.call(
            "wait_for_response",
            json!({ "url": url, "status": status }),
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn sleep(&mut self, duration: Duration) -> E2eResult<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn save_storage_state(&mut self, path: &std::path::Path) -> E2eResult<()> {
        self.call(
            "save_storage_state",
            json!({ "path": path.to_string_lossy() }),
            self.action_timeout,
        )
        .await?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.call("close", Value::Null, self.action_timeout).await?;
        Ok(())
    }
}
