use std::collections::BTreeSet;

const STORAGE_SEPARATOR: char = ',';

/// Canonical tag set: trimmed, lower-cased, de-duplicated, sorted. Blank
/// entries are dropped. A comma inside an entry splits it, since the stored
/// encoding is comma separated.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut canonical = BTreeSet::new();
    for tag in tags {
        for part in tag.as_ref().split(STORAGE_SEPARATOR) {
            if let Some(normalized) = normalize_tag(part) {
                canonical.insert(normalized);
            }
        }
    }
    canonical.into_iter().collect()
}

pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Splits a comma separated tag list as typed on the command line.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags([raw])
}

pub fn to_storage(tags: &[String]) -> String {
    tags.join(&STORAGE_SEPARATOR.to_string())
}

pub fn from_storage(raw: &str) -> Vec<String> {
    raw.split(STORAGE_SEPARATOR)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{from_storage, normalize_tags, parse_tag_list, to_storage};

    #[test]
    fn normalizes_case_whitespace_and_duplicates() {
        let tags = normalize_tags(["Work", " ideas ", "work", "", "   ", "IDEAS"]);
        assert_eq!(tags, vec!["ideas".to_string(), "work".to_string()]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs: [&[&str]; 4] = [
            &["Zeta", "alpha", " Alpha", "beta "],
            &[],
            &["  ", ""],
            &["Ünïcode", "ünïcode", "x"],
        ];
        for input in inputs {
            let once = normalize_tags(input.iter());
            let twice = normalize_tags(once.iter());
            assert_eq!(once, twice);
            assert!(once.iter().all(|tag| !tag.trim().is_empty()));
            assert!(once.iter().all(|tag| tag == &tag.to_lowercase()));
            assert!(once.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn commas_inside_an_entry_split_it() {
        assert_eq!(
            normalize_tags(["Work,Home"]),
            vec!["home".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn parses_comma_separated_cli_lists() {
        assert_eq!(
            parse_tag_list("Work, ideas,,work"),
            vec!["ideas".to_string(), "work".to_string()]
        );
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn storage_encoding_skips_empty_segments() {
        let tags = vec!["ideas".to_string(), "work".to_string()];
        assert_eq!(to_storage(&tags), "ideas,work");
        assert_eq!(from_storage("ideas,work"), tags);
        assert!(from_storage("").is_empty());
    }
}
