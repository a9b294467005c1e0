use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use crate::config::BrowserConfig;
use crate::errors::PilotError;
use super::locator::ResolvedLocator;
use super::page::{LoadState, PageDriver};
use tracing::{debug, info};

/// Extra time the Rust side waits beyond the backend's own timeout before
/// declaring the bridge hung.
const BRIDGE_GRACE: Duration = Duration::from_secs(5);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// A persistent Playwright browser driven through a Node.js bridge process.
///
/// The bridge script keeps one Chromium instance, one context and one page
/// alive for the lifetime of this value, so cookies and DOM state persist
/// across actions. Requests and responses are newline-delimited JSON over
/// the child's stdin/stdout, one request in flight at a time.
pub struct PlaywrightPage {
    child: Mutex<Child>,
    io: Mutex<BridgeIo>,
    next_id: AtomicU64,
    read_timeout: Duration,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl PlaywrightPage {
    /// Start the bridge and wait for it to report that the browser is up.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, PilotError> {
        let mut child = Command::new(&config.node_binary)
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .env("WEBPILOT_HEADLESS", if config.headless { "1" } else { "0" })
            .env("WEBPILOT_VIEWPORT_WIDTH", config.viewport.width.to_string())
            .env("WEBPILOT_VIEWPORT_HEIGHT", config.viewport.height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PilotError::Browser(format!(
                "Failed to start '{}' for the Playwright bridge: {}", config.node_binary, e
            )))?;

        let stdin = child.stdin.take()
            .ok_or_else(|| PilotError::Browser("Playwright bridge has no stdin".into()))?;
        let stdout = child.stdout.take()
            .ok_or_else(|| PilotError::Browser("Playwright bridge has no stdout".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(STARTUP_TIMEOUT, lines.next_line()).await
            .map_err(|_| PilotError::Timeout("Playwright bridge did not start in time".into()))?
            .map_err(|e| PilotError::Browser(format!("Playwright bridge read failed: {}", e)))?
            .ok_or_else(|| PilotError::Browser("Playwright bridge exited during start-up".into()))?;
        let ready: Value = serde_json::from_str(&ready)
            .map_err(|e| PilotError::Browser(format!("Unexpected bridge start-up output: {}", e)))?;
        if ready["ready"] != json!(true) {
            return Err(PilotError::Browser(format!(
                "Playwright bridge failed to start: {} (is the 'playwright' npm package installed?)",
                ready["error"].as_str().unwrap_or("unknown error")
            )));
        }

        info!(headless = config.headless, "Playwright browser started");
        Ok(Self {
            child: Mutex::new(child),
            io: Mutex::new(BridgeIo { stdin, stdout: lines }),
            next_id: AtomicU64::new(1),
            read_timeout: Duration::from_millis(config.navigation_timeout_ms.max(config.action_timeout_ms)),
        })
    }

    /// Send one command and wait for its response. Responses to earlier
    /// requests that timed out on this side are skipped by id.
    async fn request(&self, op: &str, mut payload: Value, timeout: Duration) -> Result<Value, PilotError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        payload["id"] = json!(id);
        payload["op"] = json!(op);
        payload["timeout"] = json!(timeout.as_millis() as u64);

        let mut line = serde_json::to_string(&payload)
            .map_err(|e| PilotError::Internal(format!("Failed to serialize bridge command: {}", e)))?;
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await
            .map_err(|e| PilotError::Browser(format!("Playwright bridge write failed: {}", e)))?;
        io.stdin.flush().await
            .map_err(|e| PilotError::Browser(format!("Playwright bridge write failed: {}", e)))?;
        debug!(op, id, "Bridge request sent");

        let deadline = timeout + BRIDGE_GRACE;
        let response = tokio::time::timeout(deadline, async {
            loop {
                let next = io.stdout.next_line().await
                    .map_err(|e| PilotError::Browser(format!("Playwright bridge read failed: {}", e)))?
                    .ok_or_else(|| PilotError::Browser("Playwright bridge exited".into()))?;
                let value: Value = match serde_json::from_str(&next) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if value["id"].as_u64() == Some(id) {
                    return Ok::<Value, PilotError>(value);
                }
            }
        })
        .await
        .map_err(|_| PilotError::Timeout(format!("Browser command '{}' timed out", op)))??;

        if response["ok"] == json!(true) {
            return Ok(response["result"].clone());
        }
        let message = response["error"].as_str().unwrap_or("unknown bridge error").to_string();
        match response["kind"].as_str() {
            Some("timeout") => Err(PilotError::Timeout(message)),
            _ => Err(PilotError::Browser(message)),
        }
    }

    async fn read(&self, op: &str, payload: Value) -> Result<Value, PilotError> {
        self.request(op, payload, self.read_timeout).await
    }
}

#[async_trait]
impl PageDriver for PlaywrightPage {
    async fn url(&self) -> Result<String, PilotError> {
        let v = self.read("url", json!({})).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn title(&self) -> Result<String, PilotError> {
        let v = self.read("title", json!({})).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn aria_snapshot(&self) -> Result<String, PilotError> {
        let v = self.read("aria", json!({})).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn inner_text(&self) -> Result<String, PilotError> {
        let v = self.read("text", json!({})).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, locator: &ResolvedLocator) -> Result<usize, PilotError> {
        let v = self.read("count", json!({ "locator": locator })).await?;
        Ok(v.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, locator: &ResolvedLocator, timeout: Duration) -> Result<bool, PilotError> {
        let v = self.request("visible", json!({ "locator": locator }), timeout).await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn click(&self, locator: &ResolvedLocator, timeout: Duration) -> Result<(), PilotError> {
        self.request("click", json!({ "locator": locator }), timeout).await.map(|_| ())
    }

    async fn fill(&self, locator: &ResolvedLocator, text: &str, timeout: Duration) -> Result<(), PilotError> {
        self.request("fill", json!({ "locator": locator, "text": text }), timeout).await.map(|_| ())
    }

    async fn press(&self, locator: Option<&ResolvedLocator>, key: &str, timeout: Duration) -> Result<(), PilotError> {
        self.request("press", json!({ "locator": locator, "key": key }), timeout).await.map(|_| ())
    }

    async fn select_option(&self, locator: &ResolvedLocator, value: &str, timeout: Duration) -> Result<(), PilotError> {
        self.request("select", json!({ "locator": locator, "value": value }), timeout).await.map(|_| ())
    }

    async fn set_checked(&self, locator: &ResolvedLocator, checked: bool, timeout: Duration) -> Result<(), PilotError> {
        self.request("check", json!({ "locator": locator, "checked": checked }), timeout).await.map(|_| ())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), PilotError> {
        self.request("goto", json!({ "url": url }), timeout).await.map(|_| ())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), PilotError> {
        self.request("load_state", json!({ "state": state.as_str() }), timeout).await.map(|_| ())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PilotError> {
        self.read("viewport", json!({ "width": width, "height": height })).await.map(|_| ())
    }

    async fn close(&self) -> Result<(), PilotError> {
        let result = self.read("close", json!({})).await.map(|_| ());
        let mut child = self.child.lock().await;
        if tokio::time::timeout(BRIDGE_GRACE, child.wait()).await.is_err() {
            let _ = child.kill().await;
        }
        result
    }
}

/// Node.js side of the bridge. Requires the `playwright` npm package to be
/// resolvable from the working directory.
const BRIDGE_SCRIPT: &str = r##"
const readline = require('readline');
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
let chromium;
try {
  ({ chromium } = require('playwright'));
} catch (e) {
  send({ ready: false, error: 'cannot load playwright: ' + e.message });
  process.exit(1);
}

(async () => {
  const headless = process.env.WEBPILOT_HEADLESS !== '0';
  const width = parseInt(process.env.WEBPILOT_VIEWPORT_WIDTH || '1280', 10);
  const height = parseInt(process.env.WEBPILOT_VIEWPORT_HEIGHT || '800', 10);
  const browser = await chromium.launch({ headless });
  const context = await browser.newContext({ viewport: { width, height }, ignoreHTTPSErrors: true });
  const page = await context.newPage();

  async function resolve(q) {
    switch (q.strategy) {
      case 'role': {
        const opts = {};
        if (q.name != null) { opts.name = q.name; opts.exact = !!q.exact; }
        return page.getByRole(q.role, opts);
      }
      case 'label': return page.getByLabel(q.text, { exact: !!q.exact });
      case 'testid': return page.locator('[' + q.attribute + '=' + JSON.stringify(q.value) + ']');
      case 'text': return page.getByText(q.text, { exact: !!q.exact });
      case 'css': return page.locator(q.selector);
      case 'focused': {
        const focused = page.locator('*:focus');
        return (await focused.count()) > 0 ? focused : page.locator(q.fallback || 'body');
      }
      default: throw new Error('unknown locator strategy: ' + q.strategy);
    }
  }

  async function handle(req) {
    const t = req.timeout;
    switch (req.op) {
      case 'url': return page.url();
      case 'title': return await page.title();
      case 'aria': return await page.locator('body').ariaSnapshot({ timeout: t });
      case 'text': return await page.evaluate(() => (document.body ? document.body.innerText : ''));
      case 'count': return await (await resolve(req.locator)).count();
      case 'visible':
        try {
          await (await resolve(req.locator)).first().waitFor({ state: 'visible', timeout: t });
          return true;
        } catch (e) {
          return false;
        }
      case 'click': await (await resolve(req.locator)).first().click({ timeout: t }); return null;
      case 'fill': await (await resolve(req.locator)).first().fill(req.text, { timeout: t }); return null;
      case 'press':
        if (req.locator) await (await resolve(req.locator)).first().press(req.key, { timeout: t });
        else await page.keyboard.press(req.key);
        return null;
      case 'select': await (await resolve(req.locator)).first().selectOption(req.value, { timeout: t }); return null;
      case 'check': await (await resolve(req.locator)).first().setChecked(req.checked, { timeout: t }); return null;
      case 'goto': await page.goto(req.url, { timeout: t, waitUntil: 'domcontentloaded' }); return page.url();
      case 'load_state': await page.waitForLoadState(req.state, { timeout: t }); return null;
      case 'viewport': await page.setViewportSize({ width: req.width, height: req.height }); return null;
      case 'close': await browser.close(); return null;
      default: throw new Error('unknown op: ' + req.op);
    }
  }

  const rl = readline.createInterface({ input: process.stdin });
  let chain = Promise.resolve();
  rl.on('line', (line) => {
    chain = chain.then(async () => {
      let req;
      try {
        req = JSON.parse(line);
      } catch (e) {
        send({ id: null, ok: false, kind: 'error', error: 'bad request: ' + e.message });
        return;
      }
      try {
        const result = await handle(req);
        send({ id: req.id, ok: true, result: result === undefined ? null : result });
        if (req.op === 'close') process.exit(0);
      } catch (e) {
        const kind = e && e.name === 'TimeoutError' ? 'timeout' : 'error';
        send({ id: req.id, ok: false, kind, error: String((e && e.message) || e) });
      }
    });
  });
  rl.on('close', async () => {
    await chain;
    try { await browser.close(); } catch (e) {}
    process.exit(0);
  });
  send({ ready: true });
})().catch((e) => {
  send({ ready: false, error: String((e && e.message) || e) });
  process.exit(1);
});
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_script_handles_every_op() {
        for op in [
            "url", "title", "aria", "text", "count", "visible", "click", "fill", "press",
            "select", "check", "goto", "load_state", "viewport", "close",
        ] {
            assert!(BRIDGE_SCRIPT.contains(&format!("case '{}'", op)), "missing op {}", op);
        }
    }

    #[test]
    fn test_bridge_script_handles_every_strategy() {
        for strategy in ["role", "label", "testid", "text", "css", "focused"] {
            assert!(BRIDGE_SCRIPT.contains(&format!("case '{}'", strategy)), "missing strategy {}", strategy);
        }
    }

    #[tokio::test]
    async fn test_launch_with_missing_node_binary_fails() {
        let config = BrowserConfig {
            node_binary: "/nonexistent/webpilot-node".to_string(),
            ..Default::default()
        };
        let err = PlaywrightPage::launch(&config).await.err().unwrap();
        assert!(matches!(err, PilotError::Browser(_)));
    }
}
