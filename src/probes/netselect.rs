use crate::error::{MirrorError, Result};
use crate::traits::Probe;
use crate::types::ProbeResult;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

// netselect reports this score for hosts it could not reach
const UNREACHABLE_SCORE: u64 = 9999;

// How many ranked hosts to ask netselect for
const RANKED_RESULTS: u32 = 3;

const INSTALL_HINT: &str =
    "Install the netselect package (apt-get install netselect) or use '--probe http'.";

pub struct NetselectProbe {
    program: PathBuf,
    tries: Option<u32>,
}

impl NetselectProbe {
    /// Resolve `program` against `PATH` and fail early if it is not there.
    pub fn locate(program: &Path, tries: Option<u32>) -> Result<Self> {
        let resolved = find_program(program, std::env::var_os("PATH")).ok_or_else(|| missing(program))?;
        debug!("Using netselect at {:?}", resolved);
        Ok(Self {
            program: resolved,
            tries,
        })
    }

    fn args(&self, candidates: &[String]) -> Vec<String> {
        let mut args = vec!["-s".to_string(), RANKED_RESULTS.to_string()];
        if let Some(tries) = self.tries {
            args.push("-t".to_string());
            args.push(tries.to_string());
        }
        args.extend(candidates.iter().cloned());
        args
    }
}

#[async_trait]
impl Probe for NetselectProbe {
    fn name(&self) -> &'static str {
        "netselect"
    }

    async fn rank(&self, candidates: &[String]) -> Result<Vec<ProbeResult>> {
        let output = Command::new(&self.program)
            .args(self.args(candidates))
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => missing(&self.program),
                _ => MirrorError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("netselect: {}", stderr.trim());
        }
        if !output.status.success() {
            // netselect also exits non-zero when nothing answered, so keep whatever it printed
            warn!("netselect exited with {}", output.status);
        }

        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `<score> <url>` lines, best first, dropping unreachable hosts.
pub fn parse_output(stdout: &str) -> Vec<ProbeResult> {
    let mut results: Vec<ProbeResult> = stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let score = parts.next()?.parse::<u64>().ok()?;
            let url = parts.next()?;
            Some(ProbeResult {
                url: url.to_string(),
                score,
            })
        })
        .filter(|r| r.score < UNREACHABLE_SCORE)
        .collect();
    results.sort_by_key(|r| r.score);
    results
}

fn missing(program: &Path) -> MirrorError {
    MirrorError::MissingDependency {
        tool: program.display().to_string(),
        hint: INSTALL_HINT.to_string(),
    }
}

/// Only executable files count. Paths with a directory part are checked as given.
fn find_program(program: &Path, path_var: Option<OsString>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match which::which_in(program, path_var, cwd) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("{} not found: {}", program.display(), e);
            None
        }
    }
}
