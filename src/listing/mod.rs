pub mod full;
pub mod masterlist;

use crate::error::{MirrorError, Result};
use crate::traits::ListingFormat;
use regex::Regex;
use std::str::FromStr;

pub const SUPPORTED_FORMATS: &[&str] = &["full", "masterlist"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// The human-oriented mirror directory (`mirrors_full`)
    Full,
    /// The machine-readable `Mirrors.masterlist`
    Masterlist,
}

impl FromStr for ListingKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(ListingKind::Full),
            "masterlist" => Ok(ListingKind::Masterlist),
            _ => Err(MirrorError::Usage(format!(
                "Unsupported mirror list format: '{}'. Available: {}",
                s,
                SUPPORTED_FORMATS.join(", ")
            ))),
        }
    }
}

pub fn get_format(kind: ListingKind) -> Result<Box<dyn ListingFormat>> {
    match kind {
        ListingKind::Full => Ok(Box::new(full::FullListing::new()?)),
        ListingKind::Masterlist => Ok(Box::new(masterlist::MasterListing::new()?)),
    }
}

/// Block and field splitting shared by the formats.
///
/// Both lists describe one site per paragraph. The directory page may wrap
/// everything in HTML, so `<br>` counts as a line break and tags are dropped
/// before labels are matched.
pub(crate) struct Markup {
    block_sep: Regex,
    field_sep: Regex,
    tag: Regex,
}

impl Markup {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            block_sep: Regex::new(r"(?i)(?:\r?\n[ \t]*){2,}|(?:<br\s*/?>\s*){2,}")?,
            field_sep: Regex::new(r"(?i)\r?\n|<br\s*/?>")?,
            tag: Regex::new(r"<[^>]*>")?,
        })
    }

    pub(crate) fn blocks<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.block_sep
            .split(text)
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    pub(crate) fn fields<'a>(&'a self, block: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.field_sep
            .split(block)
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    /// Field text with markup removed
    pub(crate) fn text(&self, field: &str) -> String {
        self.tag
            .replace_all(field, "")
            .replace("&nbsp;", " ")
            .trim()
            .to_string()
    }
}

/// Split an architecture field value. An empty value means no constraint.
pub(crate) fn split_architectures(value: &str) -> Option<Vec<String>> {
    let archs: Vec<String> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|a| !a.is_empty())
        .map(|a| a.to_lowercase())
        .collect();
    if archs.is_empty() {
        None
    } else {
        Some(archs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_split_on_blank_lines_and_double_breaks() -> Result<()> {
        let markup = Markup::new()?;
        let text = "Site: a\nType: x\n\n\n  \nSite: b\r\n\r\nSite: c<br><br/>\nSite: d\n";
        let blocks: Vec<_> = markup.blocks(text).collect();
        assert_eq!(blocks, vec!["Site: a\nType: x", "Site: b", "Site: c", "Site: d"]);
        Ok(())
    }

    #[test]
    fn test_single_break_stays_inside_block() -> Result<()> {
        let markup = Markup::new()?;
        let text = "Site: a<br>\nType: x<br>";
        assert_eq!(markup.blocks(text).count(), 1);
        let fields: Vec<_> = markup.fields(text).collect();
        assert_eq!(fields, vec!["Site: a", "Type: x"]);
        Ok(())
    }

    #[test]
    fn test_text_strips_tags() -> Result<()> {
        let markup = Markup::new()?;
        assert_eq!(
            markup.text("<strong>Site:</strong>&nbsp;<a href=\"x\">ftp.de.debian.org</a>"),
            "Site: ftp.de.debian.org"
        );
        Ok(())
    }

    #[test]
    fn test_split_architectures() {
        assert_eq!(
            split_architectures("amd64, ARM64  i386"),
            Some(vec!["amd64".into(), "arm64".into(), "i386".into()])
        );
        assert_eq!(split_architectures("   "), None);
    }

    #[test]
    fn test_unknown_format_is_usage_error() {
        assert_eq!("Full".parse::<ListingKind>().unwrap(), ListingKind::Full);
        assert!(matches!(
            "yaml".parse::<ListingKind>(),
            Err(MirrorError::Usage(_))
        ));
    }
}
