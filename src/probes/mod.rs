pub mod http;
pub mod netselect;

use crate::config::Settings;
use crate::error::{MirrorError, Result};
use crate::traits::Probe;
use std::str::FromStr;
use std::time::Duration;

pub const SUPPORTED_PROBES: &[&str] = &["netselect", "http"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Run the external `netselect` tool
    Netselect,
    /// Time HTTP HEAD requests in-process
    Http,
}

impl FromStr for ProbeKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "netselect" => Ok(ProbeKind::Netselect),
            "http" => Ok(ProbeKind::Http),
            _ => Err(MirrorError::Usage(format!(
                "Unsupported probe: '{}'. Available: {}",
                s,
                SUPPORTED_PROBES.join(", ")
            ))),
        }
    }
}

/// Build the probe named in `settings`.
/// Fails with `MissingDependency` when an external tool it needs is absent.
pub fn get_probe(settings: &Settings) -> Result<Box<dyn Probe>> {
    match settings.probe {
        ProbeKind::Netselect => Ok(Box::new(netselect::NetselectProbe::locate(
            &settings.netselect,
            settings.tries,
        )?)),
        ProbeKind::Http => Ok(Box::new(http::HttpProbe::new(
            Duration::from_secs(settings.timeout_secs),
            settings.tries.unwrap_or(1),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;

    #[test]
    fn test_probe_kind_parse() {
        assert_eq!("HTTP".parse::<ProbeKind>().unwrap(), ProbeKind::Http);
        assert!(matches!("ping".parse::<ProbeKind>(), Err(MirrorError::Usage(_))));
    }

    #[test]
    fn test_missing_netselect_reported() {
        let settings = Settings::layered([Overrides {
            netselect: Some("/nonexistent/dir/netselect".into()),
            ..Default::default()
        }])
        .unwrap();
        let err = get_probe(&settings).err().unwrap();
        assert!(matches!(err, MirrorError::MissingDependency { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_http_probe_needs_no_tool() -> Result<()> {
        let settings = Settings::layered([Overrides {
            probe: Some("http".into()),
            netselect: Some("/nonexistent/dir/netselect".into()),
            ..Default::default()
        }])?;
        let probe = get_probe(&settings)?;
        assert_eq!(probe.name(), "http");
        Ok(())
    }
}
