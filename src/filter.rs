use crate::types::{Category, MirrorRecord, Protocol};

/// Collect the URLs of every record that carries `arch` (or declares no
/// architectures) and publishes `category` over `protocol`.
///
/// Input order is kept and duplicates are passed through.
pub fn candidates<'a, I>(records: I, category: Category, protocol: Protocol, arch: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a MirrorRecord>,
{
    records
        .into_iter()
        .filter(|r| r.supports(arch))
        .flat_map(|r| r.urls_for(category, protocol))
        .map(str::to_string)
        .collect()
}
