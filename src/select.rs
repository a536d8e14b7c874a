use crate::error::{MirrorError, Result};
use crate::traits::Probe;
use crate::types::{Category, Selection};
use tracing::{debug, info};

/// Pick the best of `candidates` for `category`.
///
/// An empty candidate list fails with `NoCandidates` before the probe runs.
/// A probe that reaches nothing fails with `ProbeUnreachable`.
pub async fn select_best(probe: &dyn Probe, category: Category, candidates: &[String]) -> Result<Selection> {
    if candidates.is_empty() {
        return Err(MirrorError::NoCandidates(category));
    }

    info!(
        "Probing {} {} mirror(s) with {}...",
        candidates.len(),
        category,
        probe.name()
    );
    let ranked = probe.rank(candidates).await?;

    for (i, res) in ranked.iter().enumerate().skip(1) {
        debug!("Runner-up #{}: {} (score {})", i + 1, res.url, res.score);
    }

    let best = ranked
        .into_iter()
        .next()
        .ok_or(MirrorError::ProbeUnreachable(category))?;

    info!("Fastest {} mirror is {} (score {})", category, best.url, best.score);
    Ok(Selection {
        category,
        url: best.url,
        score: Some(best.score),
    })
}
