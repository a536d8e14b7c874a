use super::{split_architectures, Markup};
use crate::error::Result;
use crate::traits::ListingFormat;
use crate::types::{Category, MirrorRecord, MirrorUrl, Protocol};
use regex::Regex;
use tracing::debug;

/// Parser for `Mirrors.masterlist`, where archives are given as paths
/// relative to the site:
///
/// ```text
/// Site: ftp.de.debian.org
/// Archive-architecture: amd64 arm64
/// Archive-http: /debian/
/// NonUS-ftp: /debian-non-US/
/// ```
pub struct MasterListing {
    markup: Markup,
    site: Regex,
    arch: Regex,
    archive: Regex,
}

impl MasterListing {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markup: Markup::new()?,
            site: Regex::new(r"(?i)^site\s*:\s*(?P<site>\S+)")?,
            arch: Regex::new(r"(?i)^archive-architecture\s*:(?P<list>.*)$")?,
            archive: Regex::new(r"(?i)^(?P<kind>archive|nonus)-(?P<proto>http|ftp)\s*:\s*(?P<path>\S+)")?,
        })
    }

    fn parse_block(&self, block: &str) -> Option<MirrorRecord> {
        let mut site = None;
        let mut architectures = None;
        let mut paths = Vec::new();

        for field in self.markup.fields(block) {
            let text = self.markup.text(field);
            if let Some(caps) = self.site.captures(&text) {
                site = Some(caps["site"].to_string());
            } else if let Some(caps) = self.arch.captures(&text) {
                architectures = split_architectures(&caps["list"]);
            } else if let Some(caps) = self.archive.captures(&text) {
                let category = if caps["kind"].eq_ignore_ascii_case("nonus") {
                    Category::NonUs
                } else {
                    Category::Main
                };
                let protocol = if caps["proto"].eq_ignore_ascii_case("ftp") {
                    Protocol::Ftp
                } else {
                    Protocol::Http
                };
                paths.push((category, protocol, caps["path"].to_string()));
            }
        }

        let Some(site) = site else {
            debug!("Skipping masterlist block without a site marker");
            return None;
        };

        // Fields may come in any order, so URLs are built once the site is known
        let urls: Vec<MirrorUrl> = paths
            .into_iter()
            .map(|(category, protocol, path)| {
                let path = if path.starts_with('/') {
                    path
                } else {
                    format!("/{}", path)
                };
                MirrorUrl {
                    category,
                    protocol,
                    url: format!("{}://{}{}", protocol.scheme(), site, path),
                }
            })
            .collect();

        if urls.is_empty() {
            debug!("Mirror {} lists no usable archive path", site);
        }

        Some(MirrorRecord {
            site,
            architectures,
            urls,
            raw: block.to_string(),
        })
    }
}

impl ListingFormat for MasterListing {
    fn name(&self) -> &'static str {
        "masterlist"
    }

    fn records<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = MirrorRecord> + 'a> {
        Box::new(
            self.markup
                .blocks(text)
                .filter_map(move |block| self.parse_block(block)),
        )
    }
}
