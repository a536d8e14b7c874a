use crate::error::Result;
use crate::types::{MirrorRecord, ProbeResult};
use async_trait::async_trait;

/// ListingFormat: turns a downloaded mirror list into records.
///
/// Parsing is best effort. Blocks that cannot be understood are skipped,
/// never reported as errors.
pub trait ListingFormat: Sync + Send {
    /// Format name as accepted on the command line
    fn name(&self) -> &'static str;

    /// Lazily yield one record per site block in `text`
    fn records<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = MirrorRecord> + 'a>;
}

/// Probe: measures candidate mirrors and ranks them.
#[async_trait]
pub trait Probe: Sync + Send {
    fn name(&self) -> &'static str;

    /// Rank `candidates`, best first.
    /// Unreachable candidates are left out, so an empty result means nothing answered.
    async fn rank(&self, candidates: &[String]) -> Result<Vec<ProbeResult>>;
}
