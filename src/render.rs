use crate::types::{RenderConfig, Selection};

pub const SECURITY_URL: &str = "http://security.debian.org/";

fn line(active: bool, kind: &str, url: &str, suite: &str, sections: &str) -> String {
    let prefix = if active { "" } else { "# " };
    format!("{}{} {} {} {}\n", prefix, kind, url, suite, sections)
}

/// Render the sources.list text for the selected mirrors.
pub fn render(main: &Selection, non_us: Option<&Selection>, config: &RenderConfig) -> String {
    let distro = config.distribution.as_str();
    let mut sections = config.sections.join(" ");
    if config.include_non_free {
        sections.push_str(" non-free");
    }
    let mut out = String::new();

    out.push_str(&format!("# Debian packages for {}\n", distro));
    out.push_str(&line(true, "deb", &main.url, distro, &sections));
    out.push_str("# Uncomment the deb-src line if you want 'apt-get source'\n");
    out.push_str("# to work with most packages.\n");
    out.push_str(&line(config.include_sources, "deb-src", &main.url, distro, &sections));

    if let Some(non_us) = non_us.filter(|_| config.include_non_us) {
        let suite = format!("{}/non-US", distro);
        out.push('\n');
        out.push_str(&format!("# Debian non-US packages for {}\n", distro));
        out.push_str(&line(true, "deb", &non_us.url, &suite, &sections));
        out.push_str(&line(config.include_sources, "deb-src", &non_us.url, &suite, &sections));
    }

    let suite = format!("{}/updates", distro);
    out.push('\n');
    out.push_str(&format!("# Security updates for {}\n", distro));
    out.push_str(&line(config.include_security, "deb", SECURITY_URL, &suite, &sections));
    out.push_str(&line(
        config.include_security && config.include_sources,
        "deb-src",
        SECURITY_URL,
        &suite,
        &sections,
    ));

    out
}
