use crate::error::{MirrorError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Writing to this path sends the result to stdout
pub const STDOUT_PATH: &str = "-";

// The mirror list is a few hundred KB, give it more time than a probe
const DOWNLOAD_TIMEOUT: u64 = 60;

/// Get the mirror list text.
///
/// A list already present at `infile` is used as is. Otherwise it is
/// downloaded from `url` and saved to `infile` for the next run.
pub async fn obtain_listing(infile: &Path, url: &str) -> Result<String> {
    if fs::try_exists(infile).await.unwrap_or(false) {
        info!("Using mirror list {:?}", infile);
        return Ok(fs::read_to_string(infile).await?);
    }

    info!("Downloading mirror list from {}...", url);
    let text = fetch_listing(url, Duration::from_secs(DOWNLOAD_TIMEOUT)).await?;

    if let Err(e) = fs::write(infile, &text).await {
        warn!("Could not save mirror list to {:?}: {}", infile, e);
    }
    Ok(text)
}

pub async fn fetch_listing(url: &str, timeout: Duration) -> Result<String> {
    let client = Client::builder().timeout(timeout).build()?;
    let retrieval = |source: reqwest::Error| MirrorError::Retrieval {
        url: url.to_string(),
        source,
    };

    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(retrieval)?;
    resp.text().await.map_err(retrieval)
}

/// Move an existing file out of the way.
/// File name format: sources.list -> sources.list.TIMESTAMP
pub async fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let base = format!("{}.{}", file_name, timestamp);

    let mut backup_path = path.with_file_name(&base);
    let mut n = 1;
    while fs::try_exists(&backup_path).await.unwrap_or(false) {
        backup_path = path.with_file_name(format!("{}.{}", base, n));
        n += 1;
    }

    fs::rename(path, &backup_path).await?;
    info!("Existing {:?} moved to {:?}", path, backup_path);
    Ok(Some(backup_path))
}

/// Write the generated file, keeping any previous one.
pub async fn write_output(path: &Path, content: &str) -> Result<()> {
    if path == Path::new(STDOUT_PATH) {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(content.as_bytes()).await?;
        stdout.flush().await?;
        return Ok(());
    }

    backup_file(path).await?;
    fs::write(path, content).await?;
    info!("Wrote {:?}", path);
    Ok(())
}
