//! Candidate filtering and ranking. Pure; no I/O.

use std::sync::LazyLock;

use regex::Regex;

use super::ImageCandidate;

/// Image hosts ordered most to least trusted.
pub const HOST_PRIORITIES: [&str; 7] = [
    "commons.wikimedia.org",
    "upload.wikimedia.org",
    "wikipedia.org",
    "nationalgeographic.com",
    "bbc.co.uk",
    "wildlife.org",
    "arkive.org",
];

/// Extensions a link must contain to be considered.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

const AUTHORITY_WEIGHT: i64 = 15;
const ASPECT_BONUS: i64 = 3;
const FORMAT_BONUS: i64 = 5;

#[allow(clippy::expect_used)]
static FORMAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)jpe?g|png|webp").expect("format regex is valid"));

/// True when the link mentions an allowed extension anywhere, ignoring case.
#[must_use]
pub fn has_allowed_extension(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

/// Hostname used for the authority lookup: the link's host, else the
/// candidate's declared source.
fn authority_host(candidate: &ImageCandidate) -> Option<String> {
    url::Url::parse(&candidate.link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .or_else(|| candidate.source.as_deref().map(str::to_ascii_lowercase))
}

#[allow(clippy::cast_precision_loss)]
fn megapixels(candidate: &ImageCandidate) -> f64 {
    let width = candidate.width().unwrap_or(0) as f64;
    let height = candidate.height().unwrap_or(0) as f64;
    width * height / 1_000_000.0
}

fn resolution_bonus(candidate: &ImageCandidate) -> i64 {
    let mp = megapixels(candidate);
    if mp > 2.0 {
        10
    } else if mp > 0.5 {
        5
    } else if mp > 0.1 {
        2
    } else {
        0
    }
}

fn authority_bonus(candidate: &ImageCandidate) -> i64 {
    let Some(host) = authority_host(candidate) else {
        return 0;
    };
    HOST_PRIORITIES
        .iter()
        .position(|domain| host.contains(domain))
        .and_then(|index| i64::try_from(HOST_PRIORITIES.len() - index).ok())
        .map_or(0, |rank| rank * AUTHORITY_WEIGHT)
}

#[allow(clippy::cast_precision_loss)]
fn aspect_bonus(candidate: &ImageCandidate) -> i64 {
    match (candidate.width(), candidate.height()) {
        (Some(w), Some(h)) if h > 0 => {
            let ratio = w as f64 / h as f64;
            if ratio > 0.6 && ratio < 1.8 { ASPECT_BONUS } else { 0 }
        }
        _ => 0,
    }
}

fn format_bonus(candidate: &ImageCandidate) -> i64 {
    let hint = candidate
        .mime
        .as_deref()
        .filter(|m| !m.is_empty())
        .or_else(|| candidate.link.rsplit('.').next())
        .unwrap_or_default();
    if FORMAT_PATTERN.is_match(hint) {
        FORMAT_BONUS
    } else {
        0
    }
}

/// Additive heuristic score for one candidate.
#[must_use]
pub fn score_candidate(candidate: &ImageCandidate) -> i64 {
    resolution_bonus(candidate)
        + authority_bonus(candidate)
        + aspect_bonus(candidate)
        + format_bonus(candidate)
}

/// Drops candidates without an allowed extension, scores the rest and sorts
/// them by descending score. Ties keep input order.
#[must_use]
pub fn score_and_sort(candidates: Vec<ImageCandidate>) -> Vec<ImageCandidate> {
    let mut scored: Vec<ImageCandidate> = candidates
        .into_iter()
        .filter(|c| has_allowed_extension(&c.link))
        .map(|mut c| {
            c.score = Some(score_candidate(&c));
            c
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::image::ImageDimensions;

    // ==================== Filter Tests ====================

    #[test]
    fn test_has_allowed_extension_is_substring_and_case_insensitive() {
        assert!(has_allowed_extension("https://x/lion.JPG"));
        assert!(has_allowed_extension("https://x/lion.jpeg?w=200"));
        assert!(has_allowed_extension("https://x/lion.png/revision/latest"));
        assert!(has_allowed_extension("https://x/a.webp"));
        assert!(!has_allowed_extension("https://x/lion.gif"));
        assert!(!has_allowed_extension("https://x/lion"));
    }

    #[test]
    fn test_filter_drops_disallowed_links() {
        let scored = score_and_sort(vec![
            ImageCandidate::new("https://x/a.gif", "q"),
            ImageCandidate::new("https://x/b.svg", "q"),
            ImageCandidate::new("https://x/c.png", "q"),
        ]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].link, "https://x/c.png");
    }

    // ==================== Scoring Tests ====================

    #[test]
    fn test_worked_example_scores_103() {
        let scored = score_and_sort(vec![
            ImageCandidate::new("a.jpg", "q")
                .with_dimensions(1000, 800)
                .with_source("upload.wikimedia.org"),
            ImageCandidate::new("b.gif", "q").with_dimensions(4000, 3000),
        ]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].link, "a.jpg");
        assert_eq!(scored[0].score, Some(103));
    }

    #[test]
    fn test_resolution_thresholds() {
        let at = |w, h| resolution_bonus(&ImageCandidate::new("x.jpg", "q").with_dimensions(w, h));
        assert_eq!(at(2000, 1001), 10);
        assert_eq!(at(2000, 1000), 5);
        assert_eq!(at(1000, 501), 5);
        assert_eq!(at(1000, 500), 2);
        assert_eq!(at(1000, 101), 2);
        assert_eq!(at(100, 100), 0);
        assert_eq!(resolution_bonus(&ImageCandidate::new("x.jpg", "q")), 0);
    }

    #[test]
    fn test_authority_uses_link_host_before_source() {
        let from_link = ImageCandidate::new("https://commons.wikimedia.org/x.jpg", "q")
            .with_source("example.com");
        assert_eq!(authority_bonus(&from_link), 7 * 15);

        let from_source = ImageCandidate::new("x.jpg", "q").with_source("www.bbc.co.uk");
        assert_eq!(authority_bonus(&from_source), 3 * 15);

        let unknown = ImageCandidate::new("https://example.com/x.jpg", "q");
        assert_eq!(authority_bonus(&unknown), 0);
    }

    #[test]
    fn test_authority_matches_subdomains() {
        let c = ImageCandidate::new("https://en.wikipedia.org/wiki/File:Lion.jpg", "q");
        assert_eq!(authority_bonus(&c), 5 * 15);
    }

    #[test]
    fn test_aspect_requires_both_dimensions_in_range() {
        let square = ImageCandidate::new("x.jpg", "q").with_dimensions(500, 500);
        assert_eq!(aspect_bonus(&square), 3);

        let panorama = ImageCandidate::new("x.jpg", "q").with_dimensions(1800, 1000);
        assert_eq!(aspect_bonus(&panorama), 0);

        let mut half = ImageCandidate::new("x.jpg", "q");
        half.dimensions = Some(ImageDimensions {
            width: Some(500),
            height: None,
        });
        assert_eq!(aspect_bonus(&half), 0);

        let zero = ImageCandidate::new("x.jpg", "q").with_dimensions(500, 0);
        assert_eq!(aspect_bonus(&zero), 0);
    }

    #[test]
    fn test_format_prefers_mime_over_extension() {
        let by_ext = ImageCandidate::new("https://x/a.webp", "q");
        assert_eq!(format_bonus(&by_ext), 5);

        let gif_mime = ImageCandidate::new("https://x/a.jpg", "q").with_mime("image/gif");
        assert_eq!(format_bonus(&gif_mime), 0);

        let png_mime = ImageCandidate::new("https://x/a.jpg?.gif", "q").with_mime("image/png");
        assert_eq!(format_bonus(&png_mime), 5);
    }

    // ==================== Ordering Tests ====================

    #[test]
    fn test_sort_is_descending_and_stable() {
        let input = vec![
            ImageCandidate::new("https://x/first.png", "q"),
            ImageCandidate::new("https://upload.wikimedia.org/top.jpg", "q"),
            ImageCandidate::new("https://x/second.png", "q"),
        ];
        let scored = score_and_sort(input.clone());
        let links: Vec<&str> = scored.iter().map(|c| c.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://upload.wikimedia.org/top.jpg",
                "https://x/first.png",
                "https://x/second.png",
            ]
        );
        assert_eq!(score_and_sort(input), scored);
    }

    #[test]
    fn test_empty_input() {
        assert!(score_and_sort(Vec::new()).is_empty());
    }
}
