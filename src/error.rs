use crate::types::Category;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),

    #[error("{0}")]
    Usage(String),

    #[error("'{tool}' is not available. {hint}")]
    MissingDependency { tool: String, hint: String },

    #[error("Failed to download the mirror list from {url}: {source}. Download it manually and pass it with -i.")]
    Retrieval {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No {0} mirror matches the requested architecture and protocol")]
    NoCandidates(Category),

    #[error("Unable to find a reachable {0} mirror. You may be behind a firewall that blocks the probe traffic.")]
    ProbeUnreachable(Category),

    #[error("{0}")]
    Custom(String),
}

impl MirrorError {
    /// Process exit status for this error. 2 matches what clap uses for bad flags.
    pub fn exit_code(&self) -> u8 {
        match self {
            MirrorError::Usage(_) => 2,
            MirrorError::MissingDependency { .. } => 3,
            MirrorError::Retrieval { .. } => 4,
            MirrorError::NoCandidates(_) | MirrorError::ProbeUnreachable(_) => 5,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            MirrorError::Usage("bad".into()).exit_code(),
            MirrorError::MissingDependency {
                tool: "netselect".into(),
                hint: String::new(),
            }
            .exit_code(),
            MirrorError::NoCandidates(Category::Main).exit_code(),
            MirrorError::Custom("x".into()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            MirrorError::ProbeUnreachable(Category::NonUs).exit_code(),
            MirrorError::NoCandidates(Category::Main).exit_code()
        );
    }
}
