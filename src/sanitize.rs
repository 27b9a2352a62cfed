use once_cell::sync::Lazy;
use regex::Regex;

/// OZI Explorer caps waypoint comments at 100 characters.
pub const MAX_COMMENT_CHARS: usize = 100;

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static WS_AFTER_NONWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\W)\s+").expect("valid regex"));
static WS_BEFORE_NONWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(\W)").expect("valid regex"));

/// Make a comment string compatible with OZI Explorer: collapse whitespace
/// runs, swap the Cyrillic capital Es (`С`) for a Latin `C`, turn commas
/// into semicolons, and, once the string runs past the budget, reclaim the
/// spaces that sit next to punctuation. Idempotent; applied to comment text
/// only.
pub fn ozi_str(s: &str) -> String {
    let mut s = WS_RUN.replace_all(s, " ").into_owned();
    s = s.replace('С', "C");
    s = s.replace(',', ";");
    while s.contains(";;") {
        s = s.replace(";;", ";");
    }
    if s.chars().count() > MAX_COMMENT_CHARS {
        s = WS_AFTER_NONWORD.replace_all(&s, "$1").into_owned();
        s = WS_BEFORE_NONWORD.replace_all(&s, "$1").into_owned();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(ozi_str("a  b\t\nc"), "a b c");
    }

    #[test]
    fn commas_become_semicolons_and_doubles_collapse() {
        assert_eq!(ozi_str("a, b,, c"), "a; b; c");
        assert_eq!(ozi_str("a,,,b"), "a;b");
    }

    #[test]
    fn substitution_is_letter_exact() {
        // only Cyrillic capital Es (U+0421) is replaced; Er and the
        // lowercase es pass through untouched
        assert_eq!(ozi_str("СИНЕЕ"), "CИНЕЕ");
        assert_eq!(ozi_str("Родник, очень холодный"), "Родник; очень холодный");
        assert_eq!(ozi_str("лес"), "лес");
    }

    #[test]
    fn long_strings_lose_spaces_around_punctuation() {
        let long = format!("{} ; {}", "a".repeat(60), "b".repeat(60));
        let out = ozi_str(&long);
        assert!(out.contains(";b"));
        assert!(!out.contains(" ;"));
        assert!(!out.contains("; "));
    }

    #[test]
    fn short_strings_keep_spaces_around_punctuation() {
        assert_eq!(ozi_str("a ; b"), "a ; b");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "Родник, очень холодный",
            "a,,,b ,  c",
            "  СС  ,, x  ",
            &format!("{} , {}", "я".repeat(70), "д".repeat(70)),
        ];
        for s in samples {
            let once = ozi_str(s);
            assert_eq!(ozi_str(&once), once, "not idempotent on {s:?}");
        }
    }

    #[test]
    fn never_longer_than_collapsed_input() {
        let samples = ["a  b", "x,,y", "С С С", "  spaced  out  "];
        for s in samples {
            let collapsed = WS_RUN.replace_all(s, " ");
            assert!(ozi_str(s).chars().count() <= collapsed.chars().count());
        }
    }
}
