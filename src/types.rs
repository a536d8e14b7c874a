use crate::error::MirrorError;
use std::fmt;
use std::str::FromStr;

/// Archive a mirror URL serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Main,
    /// Legacy non-US archive, only kept for old releases.
    NonUs,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Main => f.write_str("main"),
            Category::NonUs => f.write_str("non-US"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Ftp,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Ftp => "ftp",
        }
    }
}

/// A URL one mirror publishes for a given archive and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorUrl {
    pub category: Category,
    pub protocol: Protocol,
    pub url: String,
}

/// One site entry of the mirror list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
    pub site: String,
    /// `None` when the entry carries no architecture field: the mirror is
    /// then taken to carry every architecture.
    pub architectures: Option<Vec<String>>,
    pub urls: Vec<MirrorUrl>,
    /// The block of text the record was parsed from.
    pub raw: String,
}

impl MirrorRecord {
    pub fn supports(&self, arch: &str) -> bool {
        match &self.architectures {
            None => true,
            Some(list) => list.iter().any(|a| a.eq_ignore_ascii_case(arch)),
        }
    }

    pub fn urls_for(&self, category: Category, protocol: Protocol) -> impl Iterator<Item = &str> {
        self.urls
            .iter()
            .filter(move |u| u.category == category && u.protocol == protocol)
            .map(|u| u.url.as_str())
    }
}

/// Probe outcome for one candidate. Lower score is better.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub score: u64,
}

/// The mirror picked for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub category: Category,
    pub url: String,
    pub score: Option<u64>,
}

impl Selection {
    #[cfg(test)]
    pub fn new(category: Category, url: &str) -> Self {
        Self {
            category,
            url: url.to_string(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Stable,
    Testing,
    Unstable,
    Sid,
    Experimental,
    Woody,
    Sarge,
}

impl Distribution {
    pub const ALL: &'static [Distribution] = &[
        Distribution::Stable,
        Distribution::Testing,
        Distribution::Unstable,
        Distribution::Sid,
        Distribution::Experimental,
        Distribution::Woody,
        Distribution::Sarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Stable => "stable",
            Distribution::Testing => "testing",
            Distribution::Unstable => "unstable",
            Distribution::Sid => "sid",
            Distribution::Experimental => "experimental",
            Distribution::Woody => "woody",
            Distribution::Sarge => "sarge",
        }
    }

    pub fn is_stable(&self) -> bool {
        *self == Distribution::Stable
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Distribution::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Distribution::ALL.iter().map(|d| d.as_str()).collect();
                MirrorError::Usage(format!(
                    "Unknown distribution '{}'. Available: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Everything the renderer needs besides the selected mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub include_sources: bool,
    pub include_non_free: bool,
    pub include_non_us: bool,
    pub include_security: bool,
    pub distribution: Distribution,
    /// Always-present sections. The renderer appends "non-free" when
    /// `include_non_free` is set
    pub sections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_parse() {
        assert_eq!("Stable".parse::<Distribution>().unwrap(), Distribution::Stable);
        assert_eq!(" sid ".parse::<Distribution>().unwrap(), Distribution::Sid);
        let err = "bookworm-backports".parse::<Distribution>().unwrap_err();
        assert!(matches!(err, MirrorError::Usage(_)));
    }

    #[test]
    fn test_record_without_architectures_supports_anything() {
        let record = MirrorRecord {
            site: "ftp.example.org".into(),
            architectures: None,
            urls: vec![],
            raw: String::new(),
        };
        assert!(record.supports("amd64"));
        assert!(record.supports("hurd-i386"));

        let restricted = MirrorRecord {
            architectures: Some(vec!["arm64".into()]),
            ..record
        };
        assert!(restricted.supports("ARM64"));
        assert!(!restricted.supports("amd64"));
    }
}
