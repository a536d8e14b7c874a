use crate::error::{MirrorError, Result};
use crate::listing::ListingKind;
use crate::probes::ProbeKind;
use crate::types::{Distribution, RenderConfig};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_LIST_URL: &str = "https://www.debian.org/mirror/mirrors_full";
const ENV_PREFIX: &str = "APTMIRROR_";

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub arch: String,
    pub sources: bool,
    pub nonfree: bool,
    pub ftp: bool,
    pub nonus: bool,
    pub security: bool,
    pub distribution: Distribution,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub url: String,
    pub format: ListingKind,
    pub probe: ProbeKind,
    pub netselect: PathBuf,
    pub tries: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arch: host_arch().to_string(),
            sources: false,
            nonfree: false,
            ftp: false,
            nonus: false,
            security: true,
            distribution: Distribution::Stable,
            infile: PathBuf::from("mirrors_full"),
            outfile: PathBuf::from("sources.list"),
            url: DEFAULT_LIST_URL.to_string(),
            format: ListingKind::Full,
            probe: ProbeKind::Netselect,
            netselect: PathBuf::from("netselect"),
            tries: None,
            timeout_secs: 3,
        }
    }
}

/// One configuration layer. Unset fields leave the previous layer alone.
///
/// The same shape is read from the config file, the environment and the
/// command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Overrides {
    pub arch: Option<String>,
    pub sources: Option<bool>,
    pub nonfree: Option<bool>,
    pub ftp: Option<bool>,
    pub nonus: Option<bool>,
    pub security: Option<bool>,
    pub distribution: Option<String>,
    pub infile: Option<PathBuf>,
    pub outfile: Option<PathBuf>,
    pub url: Option<String>,
    pub format: Option<String>,
    pub probe: Option<String>,
    pub netselect: Option<PathBuf>,
    pub tries: Option<u32>,
    pub timeout: Option<u64>,
}

impl Overrides {
    /// Read `APTMIRROR_*` variables through `lookup`.
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };
        let flag = |name: &str| -> Result<Option<bool>> {
            var(name)
                .map(|v| parse_bool(&format!("{}{}", ENV_PREFIX, name), &v))
                .transpose()
        };
        let number = |name: &str| -> Result<Option<u64>> {
            var(name)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|_| {
                        MirrorError::Usage(format!("{}{} must be a number, got '{}'", ENV_PREFIX, name, v))
                    })
                })
                .transpose()
        };

        let tries = match number("TRIES")? {
            Some(n) => Some(u32::try_from(n).map_err(|_| {
                MirrorError::Usage(format!("{}TRIES is too large", ENV_PREFIX))
            })?),
            None => None,
        };

        Ok(Self {
            arch: var("ARCH"),
            sources: flag("SOURCES")?,
            nonfree: flag("NONFREE")?,
            ftp: flag("FTP")?,
            nonus: flag("NONUS")?,
            security: flag("SECURITY")?,
            distribution: var("DISTRIBUTION"),
            infile: var("INFILE").map(PathBuf::from),
            outfile: var("OUTFILE").map(PathBuf::from),
            url: var("URL"),
            format: var("FORMAT"),
            probe: var("PROBE"),
            netselect: var("NETSELECT").map(PathBuf::from),
            tries,
            timeout: number("TIMEOUT")?,
        })
    }

    /// Read a TOML config file.
    ///
    /// With `explicit` unset a missing file is not an error.
    pub fn from_file(path: &Path, explicit: bool) -> Result<Option<Self>> {
        if !path.exists() {
            if explicit {
                return Err(MirrorError::Usage(format!("Config file not found: {:?}", path)));
            }
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let parsed: Overrides = toml::from_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(Some(parsed))
    }
}

impl Settings {
    /// Apply one layer on top of the current values.
    pub fn apply(&mut self, layer: Overrides) -> Result<()> {
        if let Some(arch) = layer.arch {
            self.arch = arch.trim().to_lowercase();
        }
        if let Some(v) = layer.sources {
            self.sources = v;
        }
        if let Some(v) = layer.nonfree {
            self.nonfree = v;
        }
        if let Some(v) = layer.ftp {
            self.ftp = v;
        }
        if let Some(v) = layer.nonus {
            self.nonus = v;
        }
        if let Some(v) = layer.security {
            self.security = v;
        }
        if let Some(d) = layer.distribution {
            self.distribution = d.parse()?;
        }
        if let Some(p) = layer.infile {
            self.infile = p;
        }
        if let Some(p) = layer.outfile {
            self.outfile = p;
        }
        if let Some(url) = layer.url {
            self.url = url;
        }
        if let Some(f) = layer.format {
            self.format = f.parse()?;
        }
        if let Some(p) = layer.probe {
            self.probe = p.parse()?;
        }
        if let Some(p) = layer.netselect {
            self.netselect = p;
        }
        if let Some(t) = layer.tries {
            if t == 0 {
                return Err(MirrorError::Usage("tries must be at least 1".to_string()));
            }
            self.tries = Some(t);
        }
        if let Some(t) = layer.timeout {
            self.timeout_secs = t;
        }
        Ok(())
    }

    /// Defaults, then each layer in order. Later layers win.
    pub fn layered<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Overrides>,
    {
        let mut settings = Settings::default();
        for layer in layers {
            settings.apply(layer)?;
        }
        if settings.arch.is_empty() {
            return Err(MirrorError::Usage("Architecture must not be empty".to_string()));
        }
        if settings.ftp && settings.probe == ProbeKind::Http {
            return Err(MirrorError::Usage(
                "The http probe cannot measure FTP mirrors; use '--probe netselect' with --ftp".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            include_sources: self.sources,
            include_non_free: self.nonfree,
            include_non_us: self.nonus,
            // Only stable gets an active security line
            include_security: self.security && self.distribution.is_stable(),
            distribution: self.distribution,
            sections: vec!["main".to_string(), "contrib".to_string()],
        }
    }
}

/// `<config_dir>/aptmirror/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "aptmirror").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MirrorError::Usage(format!(
            "{} must be a boolean (yes/no), got '{}'",
            name, value
        ))),
    }
}

/// Debian name of the architecture this binary runs on
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        "mips64" => "mips64el",
        "loongarch64" => "loong64",
        other => other,
    }
}
