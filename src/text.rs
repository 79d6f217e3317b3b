//! Small text helpers shared by extraction and taxonomy.

/// Title-case every whitespace-separated word.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a URL path segment into a human-readable label.
#[must_use]
pub fn humanize_slug(segment: &str) -> String {
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());
    let stem = decoded
        .rsplit_once('.')
        .map_or(decoded.as_str(), |(stem, _ext)| stem);
    title_case(&stem.replace(['-', '_'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello world"), "Hello World");
        assert_eq!(title_case("ALL CAPS text"), "All Caps Text");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_humanize_slug() {
        assert_eq!(humanize_slug("my-first-post"), "My First Post");
        assert_eq!(humanize_slug("some_page.html"), "Some Page");
        assert_eq!(humanize_slug("hello%20world"), "Hello World");
    }
}
