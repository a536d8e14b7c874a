use crate::error::Result;
use crate::traits::Probe;
use crate::types::ProbeResult;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Ranks mirrors by HEAD round-trip time, measured in-process.
pub struct HttpProbe {
    client: Client,
    tries: u32,
}

impl HttpProbe {
    pub fn new(timeout: Duration, tries: u32) -> Result<Self> {
        // Slow mirrors must not hold up the whole run
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            tries: tries.max(1),
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &'static str {
        "http"
    }

    /// All candidates are measured concurrently; the result is sorted by latency.
    async fn rank(&self, candidates: &[String]) -> Result<Vec<ProbeResult>> {
        let pb = ProgressBar::with_draw_target(
            Some(candidates.len() as u64),
            ProgressDrawTarget::stderr(),
        );
        if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {percent}% {msg}") {
            pb.set_style(style.progress_chars("|| "));
        }
        pb.set_message("Testing...");

        let tasks = candidates.iter().map(|url| {
            let pb = pb.clone();
            async move {
                let res = best_latency(&self.client, url, self.tries).await;
                pb.inc(1);
                res
            }
        });

        let results = futures::future::join_all(tasks).await;
        pb.finish_and_clear();

        let mut ranked: Vec<ProbeResult> = results.into_iter().flatten().collect();
        ranked.sort_by_key(|r| r.score);
        Ok(ranked)
    }
}

/// Lowest latency over `tries` sequential attempts, `None` if every attempt failed.
async fn best_latency(client: &Client, url: &str, tries: u32) -> Option<ProbeResult> {
    let mut best: Option<u64> = None;
    for _ in 0..tries {
        if let Some(ms) = check_latency(client, url).await {
            best = Some(best.map_or(ms, |b| b.min(ms)));
        }
    }
    best.map(|score| ProbeResult {
        url: url.to_string(),
        score,
    })
}

async fn check_latency(client: &Client, url: &str) -> Option<u64> {
    let start = Instant::now();

    // HEAD only fetches headers, which is all the timing needs
    match client.head(url).send().await {
        Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
            Some(start.elapsed().as_millis() as u64)
        }
        Ok(resp) => {
            debug!("{} answered {}", url, resp.status());
            None
        }
        Err(e) => {
            // Timeouts, DNS failures and ftp:// URLs all end up here
            debug!("{} unreachable: {}", url, e);
            None
        }
    }
}
