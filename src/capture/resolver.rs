use std::sync::LazyLock;

use regex::Regex;

use crate::core::location::{Location, LocationPath, SiteTag, find_location};

use super::url::hostname;

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").unwrap()
});

/// Pick the remembered location a page should be filed under.
///
/// An empty URL (a new tab) uses the new-tab bookmark. Otherwise a
/// site bookmark whose fragment occurs in the URL wins over the
/// last-used location.
pub fn resolve_path(url: &str, locations: &[Location]) -> Option<LocationPath> {
    if url.is_empty() {
        let path = find_location(locations, &SiteTag::NewTab).and_then(Location::path);
        log::debug!("New tab, using new-tab location: {:?}", path);
        return path;
    }

    let site_match = locations.iter().find(|l| match &l.site {
        SiteTag::Site(fragment) => !fragment.is_empty() && url.contains(fragment.as_str()),
        _ => false,
    });
    if let Some(location) = site_match {
        log::debug!("Matched site location '{}' for {}", location.site.as_str(), url);
        return location.path();
    }

    let path = find_location(locations, &SiteTag::LastLocation).and_then(Location::path);
    log::debug!("No site match for {}, falling back to last location: {:?}", url, path);
    path
}

type CoverRule = fn(&str) -> Option<String>;

/// Hostname fragment → thumbnail rule.
const COVER_RULES: &[(&str, CoverRule)] = &[
    ("youtube.com", youtube_thumbnail),
    ("youtu.be", youtube_thumbnail),
];

fn youtube_thumbnail(url: &str) -> Option<String> {
    let caps = YOUTUBE_ID_RE.captures(url)?;
    let id = caps.get(2)?.as_str();
    // Video ids are always 11 characters.
    (id.chars().count() == 11).then(|| format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id))
}

/// A cover image derived from the URL alone, or "" when no rule applies.
pub fn default_cover_for(url: &str) -> String {
    let Some(host) = hostname(url) else {
        return String::new();
    };
    COVER_RULES
        .iter()
        .find(|(site, _)| host.contains(site))
        .and_then(|(_, rule)| rule(url))
        .unwrap_or_default()
}
