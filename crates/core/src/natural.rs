//! Natural ordering for page names
//!
//! Splits a name into alternating runs of non-digits and digits. Digit runs
//! compare as integers and text runs compare case-insensitively, so
//! `page2.png` sorts before `page10.png`.

use std::cmp::Ordering;

/// One run of a natural sort key.
///
/// Keys always alternate text, number, text, ... starting with a (possibly
/// empty) text run, so two keys never compare a `Text` against a `Number`
/// at the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Case-folded non-digit run
    Text(String),

    /// Digit run with leading zeros stripped (`"007"` is stored as `"7"`)
    Number(String),
}

impl Segment {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Segment::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            // Leading zeros are gone, so a longer run is a bigger integer.
            // Compare lengths first and digits second; no overflow for long runs.
            (Segment::Number(a), Segment::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

/// Comparable natural sort key for a page name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Segment>);

impl NaturalKey {
    /// The typed runs making up this key
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
}

/// Build the natural sort key of `name`.
pub fn natural_key(name: &str) -> NaturalKey {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = name.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if !c.is_ascii_digit() {
            text.extend(c.to_lowercase());
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            if !next.is_ascii_digit() {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }

        segments.push(Segment::Text(std::mem::take(&mut text)));
        segments.push(Segment::number(&name[start..end]));
    }

    segments.push(Segment::Text(text));
    NaturalKey(segments)
}

/// Total order over names: natural key first, raw name as the tie-break.
///
/// Names such as `a1` and `A01` share a natural key; falling back to the raw
/// bytes keeps the order total for unique names.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs_compare_as_integers() {
        assert!(natural_key("page2.png") < natural_key("page10.png"));
        assert!(natural_key("2.png") < natural_key("10.png"));
    }

    #[test]
    fn test_zero_padded_runs() {
        assert!(natural_key("page-001.png") < natural_key("page-010.png"));
        assert!(natural_key("009.png") < natural_key("010.png"));
        assert_eq!(natural_key("007.png"), natural_key("7.png"));
    }

    #[test]
    fn test_text_is_case_insensitive() {
        assert_eq!(natural_key("Page1.PNG"), natural_key("page1.png"));
        assert!(natural_key("Alpha.png") < natural_key("beta.png"));
    }

    #[test]
    fn test_segments_alternate() {
        let key = natural_key("ch3/p12.jpg");
        assert_eq!(
            key.segments(),
            &[
                Segment::Text("ch".to_string()),
                Segment::Number("3".to_string()),
                Segment::Text("/p".to_string()),
                Segment::Number("12".to_string()),
                Segment::Text(".jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_leading_digits() {
        let key = natural_key("12abc");
        assert_eq!(key.segments()[0], Segment::Text(String::new()));
        assert!(natural_key("9abc") < natural_key("12abc"));
    }

    #[test]
    fn test_very_long_numbers_do_not_overflow() {
        let small = "p99999999999999999999999999999999999998.png";
        let big = "p99999999999999999999999999999999999999.png";
        assert!(natural_key(small) < natural_key(big));
    }

    #[test]
    fn test_natural_cmp_is_total() {
        let mut names = vec!["A01.png", "a1.png", "a2.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["A01.png", "a1.png", "a2.png"]);
        assert_eq!(natural_cmp("a1.png", "a1.png"), Ordering::Equal);
    }

    #[test]
    fn test_sorting_mixed_names() {
        let mut names = vec!["page10.jpg", "page1.jpg", "page2.jpg", "cover.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["cover.jpg", "page1.jpg", "page2.jpg", "page10.jpg"]);
    }
}
