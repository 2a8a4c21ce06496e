use std::sync::LazyLock;

use regex::Regex;

static CODE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?(?:github\.com|gitlab\.com)/[^\s)]+")
        .expect("valid code url regex")
});

/// Repository URLs (GitHub / GitLab) mentioned in free text, in order of
/// first appearance, with trailing punctuation removed.
pub fn extract_code_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for found in CODE_URL.find_iter(text) {
        let cleaned = found.as_str().trim_end_matches(['.', ',', ';', ')']);
        if !urls.iter().any(|u| u == cleaned) {
            urls.push(cleaned.to_string());
        }
    }
    urls
}
