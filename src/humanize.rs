//! Display-ready labels from bundle identifiers and filenames.

/// Category used when a bundle declares none
pub const OTHER_CATEGORY: &str = "Other";

/// Upper-case the first letter of every whitespace-separated word and
/// lower-case the rest. Whitespace is preserved as-is.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// `public.app-category.developer-tools` → `Developer Tools`.
///
/// Takes the last non-empty dot-separated segment, turns hyphens into
/// spaces and title-cases it. Empty input yields `Other`.
pub fn humanize_category(raw: &str) -> String {
    let Some(segment) = raw.split('.').filter(|s| !s.is_empty()).last() else {
        return OTHER_CATEGORY.to_string();
    };
    let label = title_case(&segment.replace('-', " "));
    if label.trim().is_empty() {
        OTHER_CATEGORY.to_string()
    } else {
        label
    }
}

/// `My-Cool_App` → `My Cool App`.
///
/// Expects the bundle name with its suffix already stripped.
pub fn humanize_file_stem(stem: &str) -> String {
    stem.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_category_developer_tools() {
        assert_eq!(
            humanize_category("public.app-category.developer-tools"),
            "Developer Tools"
        );
    }

    #[test]
    fn test_humanize_category_empty_is_other() {
        assert_eq!(humanize_category(""), "Other");
        assert_eq!(humanize_category("..."), "Other");
        assert_eq!(humanize_category(OTHER_CATEGORY), "Other");
    }

    #[test]
    fn test_humanize_category_variants_merge() {
        assert_eq!(
            humanize_category("public.app-category.Games"),
            humanize_category("public.app-category.games")
        );
        assert_eq!(
            humanize_category("com.vendor.Developer-Tools"),
            "Developer Tools"
        );
    }

    #[test]
    fn test_humanize_category_trailing_dot_uses_last_real_segment() {
        assert_eq!(humanize_category("public.app-category."), "App Category");
    }

    #[test]
    fn test_humanize_file_stem() {
        assert_eq!(humanize_file_stem("My-Cool_App"), "My Cool App");
        assert_eq!(humanize_file_stem("zoom.us"), "Zoom.us");
        assert_eq!(humanize_file_stem("__a--b__"), "A B");
        assert_eq!(humanize_file_stem("-_-"), "");
    }

    #[test]
    fn test_title_case_lowercases_tail() {
        assert_eq!(title_case("hello WORLD"), "Hello World");
        assert_eq!(title_case("éclair"), "Éclair");
    }
}
