//! Attribute normalization helpers
//!
//! Pure string parsing for the episode metadata encodings observed across
//! the supported platforms. These helpers never fail on malformed input;
//! they return `None` (or the input unchanged) and leave validation to the
//! caller.

use url::Url;

/// Raw episode fields pulled out of a single delimited attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawEpisode {
    pub show: String,
    pub season: String,
    pub episode: String,
}

/// Removes `prefix` from the start of `value` if present, identity otherwise.
pub(crate) fn strip_prefix<'a>(value: &'a str, prefix: &str) -> &'a str {
    value.strip_prefix(prefix).unwrap_or(value)
}

/// Extracts the numeric token from a free-text label such as
/// `"Selected, Season 3, 10 Episodes"` or `"Episode, 4."`.
///
/// The fixed `prefix` is stripped, the remainder truncated at the first
/// comma, and the first whitespace token kept with any trailing period
/// removed.
pub(crate) fn label_number(label: &str, prefix: &str) -> String {
    let rest = strip_prefix(label, prefix);
    let rest = rest.split(',').next().unwrap_or(rest);
    rest.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches('.')
        .to_string()
}

/// Parses the pipe-delimited tracking encoding: show name at index 1, season
/// at index 2 prefixed `S`, episode at index 3 prefixed `Ep`.
pub(crate) fn tracking_fields(raw: &str) -> Option<RawEpisode> {
    let parts: Vec<&str> = raw.split('|').collect();
    if parts.len() < 4 {
        return None;
    }
    Some(RawEpisode {
        show: parts[1].to_string(),
        season: strip_prefix(parts[2], "S").to_string(),
        episode: strip_prefix(parts[3], "Ep").to_string(),
    })
}

/// Parses the alternate pipe-delimited link encoding: show name at index 4,
/// season and episode at indices 6 and 7, no prefixes.
pub(crate) fn link_fields(raw: &str) -> Option<RawEpisode> {
    let parts: Vec<&str> = raw.split('|').collect();
    if parts.len() < 8 {
        return None;
    }
    Some(RawEpisode {
        show: parts[4].to_string(),
        season: parts[6].to_string(),
        episode: parts[7].to_string(),
    })
}

/// Splits a compact `"S3 E4"` code into bare season and episode digits.
///
/// Anything other than exactly two whitespace-delimited tokens is rejected.
pub(crate) fn split_season_episode(text: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return None;
    }
    Some((
        strip_prefix(tokens[0], "S").to_string(),
        strip_prefix(tokens[1], "E").to_string(),
    ))
}

/// Resolves `href` against the page's currently loaded URL.
///
/// Adapters may have navigated to season sub-pages by the time links are
/// read, so resolution is always relative to where the page actually is.
pub(crate) fn resolve_href(page_url: &Url, href: &str) -> Option<Url> {
    page_url.join(href).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("S3", "S"), "3");
        assert_eq!(strip_prefix("Ep12", "Ep"), "12");
        assert_eq!(strip_prefix("3", "S"), "3");
        assert_eq!(strip_prefix("", "S"), "");
    }

    #[test]
    fn test_label_number_season() {
        assert_eq!(
            label_number("Selected, Season 3, 10 Episodes", "Selected, Season "),
            "3"
        );
        assert_eq!(label_number("Season 12, 8 Episodes", "Season "), "12");
    }

    #[test]
    fn test_label_number_episode() {
        assert_eq!(label_number("Episode, 4.", "Episode, "), "4");
        assert_eq!(label_number("Episode, 10. The Finale", "Episode, "), "10");
        assert_eq!(label_number("Episode 4.", "Episode "), "4");
    }

    #[test]
    fn test_label_number_without_prefix() {
        // Unexpected labels degrade to the first token, never panic
        assert_eq!(label_number("4.", "Episode, "), "4");
        assert_eq!(label_number("", "Episode, "), "");
    }

    #[test]
    fn test_tracking_fields() {
        let fields = tracking_fields("x|Black Monday|S3|Ep1").unwrap();
        assert_eq!(fields.show, "Black Monday");
        assert_eq!(fields.season, "3");
        assert_eq!(fields.episode, "1");
    }

    #[test]
    fn test_tracking_fields_too_short() {
        assert_eq!(tracking_fields("x|Black Monday|S3"), None);
        assert_eq!(tracking_fields(""), None);
    }

    #[test]
    fn test_link_fields() {
        let fields = link_fields("a|b|c|d|ShowName|f|3|1").unwrap();
        assert_eq!(fields.show, "ShowName");
        assert_eq!(fields.season, "3");
        assert_eq!(fields.episode, "1");
    }

    #[test]
    fn test_link_fields_too_short() {
        assert_eq!(link_fields("a|b|c|d|ShowName|f|3"), None);
    }

    #[test]
    fn test_split_season_episode() {
        assert_eq!(
            split_season_episode("S3 E4"),
            Some(("3".to_string(), "4".to_string()))
        );
        assert_eq!(split_season_episode("S3"), None);
        assert_eq!(split_season_episode("S3 E4 extra"), None);
        assert_eq!(split_season_episode(""), None);
    }

    #[test]
    fn test_resolve_href_relative() {
        let page = Url::parse("https://play.hbomax.com/show/x").unwrap();
        let resolved = resolve_href(&page, "/episode/5").unwrap();
        assert_eq!(resolved.as_str(), "https://play.hbomax.com/episode/5");
    }

    #[test]
    fn test_resolve_href_absolute() {
        let page = Url::parse("https://play.hbomax.com/show/x").unwrap();
        let resolved = resolve_href(&page, "https://example.com/ep1").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/ep1");
    }
}
