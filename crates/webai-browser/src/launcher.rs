//! Finding, launching and attaching to a Chrome/Chromium process.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use webai_config::BrowserConfig;
use webai_core::{Result, WebAiError};

use crate::cdp::CdpClient;

/// A running (or attached) browser with its CDP endpoint.
pub struct BrowserInstance {
    port: u16,
    /// Only set when we launched the process ourselves.
    process: Option<tokio::process::Child>,
    profile_dir: Option<PathBuf>,
    cdp: CdpClient,
}

impl BrowserInstance {
    /// Launch a new browser per `config` and wait until it accepts CDP.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let cdp = CdpClient::new(config.port);
        if cdp.version().await.is_ok() {
            return Err(port_in_use(config.port));
        }

        let chrome_bin = find_chrome_binary(config.executable.as_deref())?;
        let profile_dir = profile_dir(config.port);
        let args = launch_args(config, &profile_dir);

        info!(
            binary = %chrome_bin.display(),
            port = config.port,
            headless = config.headless,
            "launching browser"
        );
        debug!(?args, "browser arguments");

        let mut process = tokio::process::Command::new(&chrome_bin)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WebAiError::Browser(format!(
                    "failed to launch Chrome at '{}': {e}",
                    chrome_bin.display()
                ))
            })?;

        let limit = Duration::from_secs(config.launch_timeout_secs);
        let start = Instant::now();
        loop {
            if start.elapsed() > limit {
                return Err(WebAiError::Browser(format!(
                    "Chrome failed to start within {} seconds",
                    config.launch_timeout_secs
                )));
            }
            match cdp.version().await {
                Ok(_) => break,
                Err(_) => tokio::time::sleep(Duration::from_millis(200)).await,
            }
        }

        // Someone else answered on the port if our child already exited.
        if let Ok(Some(status)) = process.try_wait() {
            warn!(%status, port = config.port, "launched browser exited early");
            return Err(port_in_use(config.port));
        }

        info!(port = config.port, "browser ready");

        Ok(Self {
            port: config.port,
            process: Some(process),
            profile_dir: Some(profile_dir),
            cdp,
        })
    }

    /// Attach to a browser already listening on `port`.
    pub async fn connect(port: u16) -> Result<Self> {
        let cdp = CdpClient::new(port);
        let version = cdp.version().await?;
        info!(
            port,
            browser = version["Browser"].as_str().unwrap_or("unknown"),
            "connected to existing browser"
        );

        Ok(Self {
            port,
            process: None,
            profile_dir: None,
            cdp,
        })
    }

    pub fn cdp(&self) -> &CdpClient {
        &self.cdp
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True if this instance owns the browser process.
    pub fn is_launched(&self) -> bool {
        self.process.is_some()
    }

    /// Kill a launched browser and remove its profile. Attached browsers are left running.
    pub async fn shutdown(&mut self) {
        if let Some(ref mut proc) = self.process {
            if let Err(e) = proc.kill().await {
                warn!(error = %e, "failed to kill browser process");
            } else {
                info!(port = self.port, "browser process killed");
            }
        }
        self.process = None;
        if let Some(dir) = self.profile_dir.take() {
            let _ = tokio::fs::remove_dir_all(&dir).await;
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────

fn port_in_use(port: u16) -> WebAiError {
    WebAiError::Browser(format!(
        "port {port} is in use by another browser; set browser.reuse_existing = true \
         to attach to it or pick another browser.port"
    ))
}

/// Throwaway profile directory for a launch on `port`.
pub fn profile_dir(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("webai-chrome-{port}"))
}

/// Command-line arguments for launching the browser.
pub fn launch_args(config: &BrowserConfig, profile_dir: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", config.port),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
        "--safebrowsing-disable-auto-update".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
        format!("--user-data-dir={}", profile_dir.display()),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
    }

    args.extend(config.extra_args.iter().cloned());

    // Start with a blank page
    args.push("about:blank".to_string());
    args
}

/// Find a Chrome or Chromium binary.
///
/// Order: `configured`, then `CHROME_PATH`, then well-known install
/// locations, then `PATH`.
pub fn find_chrome_binary(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(WebAiError::Browser(format!(
            "configured browser.executable '{}' does not exist",
            path.display()
        )));
    }

    if let Ok(env_path) = std::env::var("CHROME_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        warn!(path = %path.display(), "CHROME_PATH does not exist, searching defaults");
    }

    let absolute = [
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // Windows
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];
    for candidate in &absolute {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    let on_path = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ];
    for candidate in &on_path {
        if let Ok(output) = std::process::Command::new("which").arg(candidate).output()
            && output.status.success()
        {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() {
                return Ok(PathBuf::from(found));
            }
        }
    }

    Err(WebAiError::Browser(
        "Chrome/Chromium not found. Install Chrome or set CHROME_PATH.".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_headless_with_viewport() {
        let config = BrowserConfig::default();
        let args = launch_args(&config, Path::new("/tmp/webai-chrome-9222"));
        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1200,1200".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/webai-chrome-9222".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_launch_args_headed_with_extras() {
        let config = BrowserConfig {
            headless: false,
            extra_args: vec!["--lang=en-US".into()],
            ..Default::default()
        };
        let args = launch_args(&config, Path::new("/tmp/p"));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--lang=en-US".to_string()));
    }

    #[test]
    fn test_configured_missing_executable_is_an_error() {
        let err = find_chrome_binary(Some(Path::new("/definitely/not/chrome"))).unwrap_err();
        assert!(err.to_string().contains("browser.executable"));
    }

    #[test]
    fn test_configured_executable_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = find_chrome_binary(Some(file.path())).unwrap();
        assert_eq!(found, file.path());
    }

    #[test]
    fn test_profile_dir_is_per_port() {
        assert_ne!(profile_dir(9222), profile_dir(9223));
        assert!(profile_dir(9222).ends_with("webai-chrome-9222"));
    }

    /// Answers every request like a browser's `/json/version`.
    async fn serve_version() -> u16 {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let body = r#"{"Browser":"HeadlessChrome/120.0"}"#;
                    let resp = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(resp.as_bytes()).await;
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn test_launch_refuses_port_owned_by_another_browser() {
        let port = serve_version().await;
        let config = BrowserConfig {
            port,
            executable: Some(PathBuf::from("/definitely/not/chrome")),
            ..Default::default()
        };
        let err = BrowserInstance::launch(&config).await.err().unwrap();
        assert!(err.to_string().contains(&format!("port {port} is in use")));
    }

    #[tokio::test]
    async fn test_connect_attaches_without_owning_process() {
        let port = serve_version().await;
        let inst = BrowserInstance::connect(port).await.unwrap();
        assert!(!inst.is_launched());
        assert_eq!(inst.port(), port);
    }
}
