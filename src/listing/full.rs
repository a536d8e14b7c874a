use super::{split_architectures, Markup};
use crate::error::Result;
use crate::traits::ListingFormat;
use crate::types::{Category, MirrorRecord, MirrorUrl, Protocol};
use regex::Regex;
use tracing::debug;

/// Parser for the mirror directory page (`mirrors_full`).
///
/// A site block looks like:
///
/// ```text
/// Site: ftp.de.debian.org
/// Type: Push-Primary
/// Packages over HTTP: <a href="http://ftp.de.debian.org/debian/">...</a>
/// Non-US packages over FTP: ftp://ftp.de.debian.org/debian-non-US/
/// Architectures: amd64 arm64 i386
/// ```
pub struct FullListing {
    markup: Markup,
    site: Regex,
    arch: Regex,
    label: Regex,
    url: Regex,
}

impl FullListing {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markup: Markup::new()?,
            site: Regex::new(r"(?i)^site\s*:\s*(?P<site>\S+)")?,
            arch: Regex::new(r"(?i)^(?:includes\s+)?architectures?\s*:(?P<list>.*)$")?,
            label: Regex::new(r"(?i)^(?P<nonus>non-us\s+)?packages\s+over\s+(?P<proto>https?|ftp)\s*:")?,
            url: Regex::new(r#"(?i)\b(?:https?|ftp)://[^\s"'<>]+"#)?,
        })
    }

    fn label(&self, text: &str) -> Option<(Category, Protocol)> {
        let caps = self.label.captures(text)?;
        let category = if caps.name("nonus").is_some() {
            Category::NonUs
        } else {
            Category::Main
        };
        let protocol = if caps["proto"].eq_ignore_ascii_case("ftp") {
            Protocol::Ftp
        } else {
            Protocol::Http
        };
        Some((category, protocol))
    }

    fn parse_block(&self, block: &str) -> Option<MirrorRecord> {
        let mut site = None;
        let mut architectures = None;
        let mut urls = Vec::new();
        // A label whose link was pushed onto the following line
        let mut pending: Option<(Category, Protocol)> = None;

        for field in self.markup.fields(block) {
            let text = self.markup.text(field);
            let found_url = self.url.find(field).map(|m| m.as_str().to_string());

            if let Some(caps) = self.site.captures(&text) {
                site = Some(caps["site"].to_string());
                pending = None;
            } else if let Some(caps) = self.arch.captures(&text) {
                architectures = split_architectures(&caps["list"]);
                pending = None;
            } else if let Some((category, protocol)) = self.label(&text) {
                match found_url {
                    Some(url) => {
                        urls.push(MirrorUrl { category, protocol, url });
                        pending = None;
                    }
                    None => pending = Some((category, protocol)),
                }
            } else if let (Some((category, protocol)), Some(url)) = (pending.take(), found_url) {
                urls.push(MirrorUrl { category, protocol, url });
            }
        }

        let Some(site) = site else {
            debug!("Skipping mirror list block without a site marker");
            return None;
        };
        if urls.is_empty() {
            debug!("Mirror {} lists no usable URL", site);
        }

        Some(MirrorRecord {
            site,
            architectures,
            urls,
            raw: block.to_string(),
        })
    }
}

impl ListingFormat for FullListing {
    fn name(&self) -> &'static str {
        "full"
    }

    fn records<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = MirrorRecord> + 'a> {
        Box::new(
            self.markup
                .blocks(text)
                .filter_map(move |block| self.parse_block(block)),
        )
    }
}
