use std::time::Duration;

use anyhow::bail;
use tracing::{debug, info};

/// Checks that `<base>/models` answers with a success status. With a
/// non-zero `wait` the check is retried once a second until the deadline.
pub async fn wait_server_ready(client: &reqwest::Client, base_url: &str, wait: Duration) -> anyhow::Result<()> {
    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let start = tokio::time::Instant::now();
    loop {
        match client.get(&url).timeout(Duration::from_secs(10)).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Server is reachable at {}", base_url);
                return Ok(());
            }
            Ok(resp) => {
                if start.elapsed() >= wait {
                    bail!("Server returned status {} for {}", resp.status(), url);
                }
                debug!("Server returned status {}, retrying", resp.status());
            }
            Err(e) => {
                if start.elapsed() >= wait {
                    bail!("Cannot reach server at {}: {}", url, e);
                }
                debug!("Server not reachable yet: {}", e);
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
