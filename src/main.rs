mod config;
mod error;
mod filter;
mod listing;
mod probes;
mod render;
mod select;
mod traits;
mod types;
mod utils;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use config::{Overrides, Settings};
use error::MirrorError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use traits::Probe;
use types::{Category, MirrorRecord, Protocol};

#[derive(Parser)]
#[command(name = "aptmirror")]
#[command(about = "Find the fastest Debian mirror and write a sources.list for it", long_about = None)]
struct Cli {
    /// Distribution to write (stable, testing, unstable, sid, experimental, woody, sarge)
    distribution: Option<String>,

    /// Architecture the mirror must carry [default: this machine's]
    #[arg(short, long)]
    arch: Option<String>,

    /// Enable the deb-src lines
    #[arg(short, long)]
    sources: bool,

    /// Mirror list to read; downloaded here first if it does not exist [default: mirrors_full]
    #[arg(short, long)]
    infile: Option<PathBuf>,

    /// File to write, '-' for stdout [default: sources.list]
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Add the non-free section
    #[arg(short, long)]
    nonfree: bool,

    /// Use FTP mirrors instead of HTTP
    #[arg(short, long)]
    ftp: bool,

    /// Also pick a non-US mirror (obsolete, only for woody-era releases)
    #[arg(short = 'N', long)]
    nonus: bool,

    /// Where to download the mirror list from
    #[arg(long)]
    url: Option<String>,

    /// Mirror list format (full, masterlist)
    #[arg(long)]
    format: Option<String>,

    /// How to measure mirrors (netselect, http)
    #[arg(long)]
    probe: Option<String>,

    /// Path to the netselect binary
    #[arg(long)]
    netselect: Option<PathBuf>,

    /// Measurements per mirror
    #[arg(long)]
    tries: Option<u32>,

    /// Settings file [default: <config dir>/aptmirror/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Flags only override when given; an absent switch keeps the lower layer's value.
    fn overrides(&self) -> Overrides {
        Overrides {
            arch: self.arch.clone(),
            sources: self.sources.then_some(true),
            nonfree: self.nonfree.then_some(true),
            ftp: self.ftp.then_some(true),
            nonus: self.nonus.then_some(true),
            security: None,
            distribution: self.distribution.clone(),
            infile: self.infile.clone(),
            outfile: self.outfile.clone(),
            url: self.url.clone(),
            format: self.format.clone(),
            probe: self.probe.clone(),
            netselect: self.netselect.clone(),
            tries: self.tries,
            timeout: None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.to_string();
            let cause = e.root_cause().to_string();
            if message.contains(&cause) {
                eprintln!("Error: {}", message);
            } else {
                eprintln!("Error: {}: {}", message, cause);
            }
            let mirror_error = e.downcast_ref::<MirrorError>();
            if let Some(MirrorError::Usage(_)) = mirror_error {
                eprintln!();
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::from(mirror_error.map(MirrorError::exit_code).unwrap_or(1))
        }
    }
}

/// `-q` and `-v` win over `RUST_LOG`, which wins over the INFO default.
fn log_filter(verbose: bool, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        rust_log
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(verbose, quiet, rust_log.as_deref());

    // Diagnostics go to stderr so stdout can carry the generated file
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    debug!("Settings: {:?}", settings);

    // Check for the probe tool before downloading anything
    let probe = probes::get_probe(&settings)?;

    let text = utils::obtain_listing(&settings.infile, &settings.url).await?;
    let content = build_source_list(&text, &settings, probe.as_ref()).await?;

    utils::write_output(&settings.outfile, &content)
        .await
        .with_context(|| format!("Failed to write {:?}", settings.outfile))?;
    Ok(())
}

fn load_settings(cli: &Cli) -> error::Result<Settings> {
    let file_layer = match &cli.config {
        Some(path) => Overrides::from_file(path, true)?,
        None => match config::default_config_path() {
            Some(path) => Overrides::from_file(&path, false)?,
            None => None,
        },
    };
    let env_layer = Overrides::from_env(|key| std::env::var(key).ok())?;

    Settings::layered(file_layer.into_iter().chain([env_layer, cli.overrides()]))
}

/// Parse the list, pick a mirror per requested category and render the result.
async fn build_source_list(text: &str, settings: &Settings, probe: &dyn Probe) -> error::Result<String> {
    let format = listing::get_format(settings.format)?;
    let records: Vec<MirrorRecord> = format.records(text).collect();
    info!("Found {} mirror(s) in the {} list", records.len(), format.name());

    let protocol = if settings.ftp {
        Protocol::Ftp
    } else {
        Protocol::Http
    };

    let candidates = filter::candidates(&records, Category::Main, protocol, &settings.arch);
    let main = select::select_best(probe, Category::Main, &candidates).await?;

    let non_us = if settings.nonus {
        warn!("The non-US archive is obsolete; it only exists for old releases");
        let candidates = filter::candidates(&records, Category::NonUs, protocol, &settings.arch);
        Some(select::select_best(probe, Category::NonUs, &candidates).await?)
    } else {
        None
    };

    Ok(render::render(&main, non_us.as_ref(), &settings.render_config()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Ranks candidates in the order given and remembers what it was asked.
    #[derive(Default)]
    struct FirstWins {
        seen: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Probe for FirstWins {
        fn name(&self) -> &'static str {
            "first-wins"
        }

        async fn rank(&self, candidates: &[String]) -> error::Result<Vec<ProbeResult>> {
            self.seen.lock().unwrap().push(candidates.to_vec());
            Ok(candidates
                .iter()
                .enumerate()
                .map(|(i, url)| ProbeResult {
                    url: url.clone(),
                    score: i as u64,
                })
                .collect())
        }
    }

    const LIST: &str = "\
Site: mirrorA
Packages over HTTP: http://mirrorA/debian
Packages over FTP: ftp://mirrorA/debian
Architectures: amd64

Site: mirrorArm
Packages over HTTP: http://mirrorArm/debian
Non-US packages over HTTP: http://mirrorArm/debian-non-US
Architectures: arm64
";

    fn settings(cli: &[&str]) -> Settings {
        let mut args = vec!["aptmirror"];
        args.extend_from_slice(cli);
        let cli = Cli::parse_from(args);
        Settings::layered([cli.overrides()]).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides() {
        let s = settings(&["-a", "arm64", "-s", "-n", "-f", "-N", "-o", "-", "testing"]);
        assert_eq!(s.arch, "arm64");
        assert!(s.sources && s.nonfree && s.ftp && s.nonus);
        assert_eq!(s.outfile, PathBuf::from("-"));
        assert_eq!(s.distribution, types::Distribution::Testing);

        let s = settings(&[]);
        assert!(!s.sources);
        assert_eq!(s.distribution, types::Distribution::Stable);
    }

    #[tokio::test]
    async fn test_stable_round_trip() -> error::Result<()> {
        let probe = FirstWins::default();
        let out = build_source_list(LIST, &settings(&["-a", "amd64", "stable"]), &probe).await?;

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"deb http://mirrorA/debian stable main contrib"));
        assert!(lines.contains(&"# deb-src http://mirrorA/debian stable main contrib"));
        assert!(lines.contains(&"deb http://security.debian.org/ stable/updates main contrib"));
        assert!(!out.contains("non-US"));

        // The arm64-only mirror never reaches the probe
        let seen = probe.seen.lock().unwrap();
        assert_eq!(*seen, vec![vec!["http://mirrorA/debian".to_string()]]);
        Ok(())
    }

    #[tokio::test]
    async fn test_ftp_and_testing() -> error::Result<()> {
        let probe = FirstWins::default();
        let out = build_source_list(LIST, &settings(&["-a", "amd64", "-f", "-s", "testing"]), &probe).await?;
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"deb ftp://mirrorA/debian testing main contrib"));
        assert!(lines.contains(&"deb-src ftp://mirrorA/debian testing main contrib"));
        assert!(lines.contains(&"# deb http://security.debian.org/ testing/updates main contrib"));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_us_for_arm() -> error::Result<()> {
        let probe = FirstWins::default();
        let out = build_source_list(LIST, &settings(&["-a", "arm64", "-N", "woody"]), &probe).await?;
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"deb http://mirrorArm/debian woody main contrib"));
        assert!(lines.contains(&"deb http://mirrorArm/debian-non-US woody/non-US main contrib"));
        assert_eq!(probe.seen.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_non_us_mirror_fails() {
        let probe = FirstWins::default();
        let err = build_source_list(LIST, &settings(&["-a", "amd64", "-N"]), &probe)
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::NoCandidates(Category::NonUs)));
    }

    #[tokio::test]
    async fn test_unknown_architecture_fails() {
        let probe = FirstWins::default();
        let err = build_source_list(LIST, &settings(&["-a", "mips"]), &probe)
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::NoCandidates(Category::Main)));
        assert_eq!(err.exit_code(), 5);
        assert!(probe.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ftp_with_http_probe_is_usage_error() {
        let cli = Cli::parse_from(["aptmirror", "-a", "amd64", "-f", "--probe", "http"]);
        let err = Settings::layered([cli.overrides()]).unwrap_err();
        assert!(matches!(err, MirrorError::Usage(_)));
    }

    #[test]
    fn test_log_filter_precedence() {
        let shown = |v: bool, q: bool, rust_log: Option<&str>| log_filter(v, q, rust_log).to_string();
        let expect = |directives: &str| EnvFilter::new(directives).to_string();

        assert_eq!(shown(false, false, None), expect("info"));
        assert_eq!(shown(false, false, Some("debug")), expect("debug"));
        assert_eq!(shown(false, false, Some("aptmirror=trace")), expect("aptmirror=trace"));
        assert_eq!(shown(true, false, Some("warn")), expect("debug"));
        assert_eq!(shown(false, true, Some("debug")), expect("error"));
    }

    #[test]
    fn test_usage_error_survives_anyhow() {
        let err: anyhow::Error = MirrorError::Usage("bad distribution".into()).into();
        let err = err.context("while loading settings");
        assert_eq!(
            err.downcast_ref::<MirrorError>().map(MirrorError::exit_code),
            Some(2)
        );
    }
}
