//! Checks run before a browser is launched

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::E2eConfig;
use crate::datagen;
use crate::error::{E2eError, E2eResult};

/// Bounds for probing the staging apps
#[derive(Debug, Clone)]
pub struct Preflight {
    pub attempts: usize,
    pub pause: Duration,
    pub request_timeout: Duration,
}

impl Default for Preflight {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Preflight {
    /// Probe the seller, admin and buyer apps
    pub async fn check_apps(&self, config: &E2eConfig) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?;

        for (name, url) in [
            ("seller app", &config.seller_url),
            ("admin app", &config.admin_url),
            ("buyer app", &config.buyer_url),
        ] {
            self.wait_for_reachable(&client, name, url).await?;
        }
        Ok(())
    }

    /// GET `url` until it answers without a server error
    pub async fn wait_for_reachable(
        &self,
        client: &reqwest::Client,
        name: &str,
        url: &str,
    ) -> E2eResult<()> {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            match client.get(url).send().await {
                Ok(resp) if !resp.status().is_server_error() => {
                    info!("{} reachable at {} ({})", name, url, resp.status());
                    return Ok(());
                }
                Ok(resp) => warn!("{} returned {} (attempt {})", name, resp.status(), attempt),
                Err(e) => warn!("{} probe failed (attempt {}): {}", name, attempt, e),
            }
            if attempt < attempts {
                sleep(self.pause).await;
            }
        }

        Err(E2eError::Unreachable {
            name: name.to_string(),
            url: url.to_string(),
            attempts,
        })
    }
}

/// Upload fixtures the flows reference that are absent from `dir`
///
/// Only the top level counts; fixtures are resolved as `dir/<name>`.
pub fn missing_fixtures(dir: &Path) -> Vec<&'static str> {
    let present: HashSet<String> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let mut required: Vec<&'static str> = datagen::IMAGE_POOL
        .iter()
        .chain(datagen::IDENTITY_DOCUMENTS.iter())
        .chain(datagen::CUSTOMIZATION_IMAGES.iter())
        .copied()
        .collect();
    required.sort_unstable();
    required.dedup();
    required
        .into_iter()
        .filter(|name| !present.contains(*name))
        .collect()
}

/// Fail early when upload fixtures are missing
pub fn check_fixtures(config: &E2eConfig) -> E2eResult<()> {
    let missing = missing_fixtures(&config.fixtures_dir);
    if missing.is_empty() {
        return Ok(());
    }
    Err(E2eError::Config(format!(
        "missing fixtures in {}: {}",
        config.fixtures_dir.display(),
        missing.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn quick() -> Preflight {
        Preflight {
            attempts: 2,
            pause: Duration::from_millis(10),
            request_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_unreachable_after_bounded_attempts() {
        let client = reqwest::Client::new();
        let err = quick()
            .wait_for_reachable(&client, "seller app", "http://127.0.0.1:1/")
            .await
            .unwrap_err();
        match err {
            E2eError::Unreachable { name, attempts, .. } => {
                assert_eq!(name, "seller app");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reachable_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let client = reqwest::Client::new();
        quick()
            .wait_for_reachable(&client, "buyer app", &format!("http://{}/", addr))
            .await
            .unwrap();
    }

    #[test]
    fn test_missing_fixtures_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        for name in datagen::IMAGE_POOL {
            std::fs::write(dir.path().join(name), b"img").unwrap();
        }
        for name in datagen::IDENTITY_DOCUMENTS {
            std::fs::write(dir.path().join("docs").join(name), b"img").unwrap();
        }

        assert_eq!(
            missing_fixtures(dir.path()),
            vec![
                "400 400.png",
                "600.png",
                "71VBGavZfcL._SL1500_.jpg",
                "81aKZJZEUEL._SL1500_.jpg",
            ]
        );
        assert!(check_fixtures(&E2eConfig {
            fixtures_dir: dir.path().to_path_buf(),
            ..E2eConfig::default()
        })
        .is_err());
    }
}
