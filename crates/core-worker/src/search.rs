//! Pattern matching for the search and replace-all tasks.
//!
//! Literal matching walks the line's codepoints directly (columns are cell
//! indices, and every cell is one codepoint); regex matching runs on the
//! decoded line and maps byte offsets back to columns. Case folding for
//! literal patterns is ASCII; regex patterns get `(?i)` instead.

use core_text::{CoreError, Result};
use regex::Regex;

use crate::task::SearchFlags;

/// Upper bound on matches a single search task will report.
pub const SEARCH_MATCH_MAX: usize = 100_000;

#[derive(Debug)]
pub(crate) enum Matcher {
    Literal {
        pattern: Vec<char>,
        case_sensitive: bool,
        whole_word: bool,
    },
    Regex(Regex),
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

impl Matcher {
    pub(crate) fn build(pattern: &str, flags: SearchFlags) -> Result<Matcher> {
        if flags.regex {
            let mut source = String::new();
            if !flags.case_sensitive {
                source.push_str("(?i)");
            }
            if flags.whole_word {
                source.push_str(r"\b(?:");
                source.push_str(pattern);
                source.push_str(r")\b");
            } else {
                source.push_str(pattern);
            }
            let re = Regex::new(&source).map_err(|e| CoreError::Regex(e.to_string()))?;
            Ok(Matcher::Regex(re))
        } else {
            Ok(Matcher::Literal {
                pattern: pattern.chars().collect(),
                case_sensitive: flags.case_sensitive,
                whole_word: flags.whole_word,
            })
        }
    }

    /// Append `(start_col, end_col)` spans of every non-overlapping match
    /// in `text`. The empty pattern matches nothing.
    pub(crate) fn find_in(&self, text: &str, out: &mut Vec<(usize, usize)>) {
        match self {
            Matcher::Literal {
                pattern,
                case_sensitive,
                whole_word,
            } => {
                if pattern.is_empty() {
                    return;
                }
                let hay: Vec<char> = text.chars().collect();
                if pattern.len() > hay.len() {
                    return;
                }
                let mut start = 0usize;
                while start + pattern.len() <= hay.len() {
                    let hit = hay[start..start + pattern.len()]
                        .iter()
                        .zip(pattern.iter())
                        .all(|(&h, &p)| {
                            if *case_sensitive {
                                h == p
                            } else {
                                h.eq_ignore_ascii_case(&p)
                            }
                        });
                    if !hit {
                        start += 1;
                        continue;
                    }
                    let end = start + pattern.len();
                    let boundary_ok = !*whole_word
                        || ((start == 0 || !is_word_char(hay[start - 1]))
                            && (end == hay.len() || !is_word_char(hay[end])));
                    if boundary_ok {
                        out.push((start, end));
                        start = end;
                    } else {
                        start += 1;
                    }
                }
            }
            Matcher::Regex(re) => {
                if re.as_str().is_empty() {
                    return;
                }
                for m in re.find_iter(text) {
                    if m.start() == m.end() {
                        continue; // zero-width matches are useless overlays
                    }
                    let start_col = text[..m.start()].chars().count();
                    let end_col = start_col + text[m.start()..m.end()].chars().count();
                    out.push((start_col, end_col));
                }
            }
        }
    }

    /// Expanded replacement text for the match at `(start_col, end_col)`.
    /// Regex templates support `$n` group references.
    pub(crate) fn expand(&self, text: &str, span: (usize, usize), template: &str) -> String {
        match self {
            Matcher::Literal { .. } => template.to_string(),
            Matcher::Regex(re) => {
                let byte_start = char_to_byte(text, span.0);
                if let Some(caps) = re.captures_at(text, byte_start) {
                    if let Some(m) = caps.get(0)
                        && m.start() == byte_start
                    {
                        let mut out = String::new();
                        caps.expand(template, &mut out);
                        return out;
                    }
                }
                template.to_string()
            }
        }
    }
}

fn char_to_byte(text: &str, col: usize) -> usize {
    text.char_indices()
        .nth(col)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pattern: &str, flags: SearchFlags, text: &str) -> Vec<(usize, usize)> {
        let m = Matcher::build(pattern, flags).expect("matcher");
        let mut out = Vec::new();
        m.find_in(text, &mut out);
        out
    }

    #[test]
    fn literal_case_sensitive() {
        let found = spans("ab", SearchFlags { case_sensitive: true, ..Default::default() }, "ab Ab ab");
        assert_eq!(found, vec![(0, 2), (6, 8)]);
    }

    #[test]
    fn literal_case_insensitive() {
        let found = spans("ab", SearchFlags::default(), "ab Ab AB");
        assert_eq!(found, vec![(0, 2), (3, 5), (6, 8)]);
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        assert!(spans("", SearchFlags::default(), "anything").is_empty());
        let flags = SearchFlags { regex: true, ..Default::default() };
        assert!(spans("", flags, "anything").is_empty());
    }

    #[test]
    fn whole_word_literal() {
        let flags = SearchFlags {
            case_sensitive: true,
            whole_word: true,
            regex: false,
        };
        let found = spans("cat", flags, "cat catalog the cat");
        assert_eq!(found, vec![(0, 3), (16, 19)]);
    }

    #[test]
    fn columns_are_codepoints_not_bytes() {
        let found = spans("b", SearchFlags::default(), "\u{6f22}\u{6f22}b");
        assert_eq!(found, vec![(2, 3)]);
    }

    #[test]
    fn regex_matching_and_expansion() {
        let flags = SearchFlags {
            case_sensitive: true,
            whole_word: false,
            regex: true,
        };
        let m = Matcher::build(r"(\d+)-(\d+)", flags).unwrap();
        let mut out = Vec::new();
        m.find_in("a 12-34 b", &mut out);
        assert_eq!(out, vec![(2, 7)]);
        assert_eq!(m.expand("a 12-34 b", (2, 7), "$2:$1"), "34:12");
    }

    #[test]
    fn regex_compile_error_is_reported() {
        let flags = SearchFlags { regex: true, ..Default::default() };
        let err = Matcher::build("(", flags).unwrap_err();
        assert!(matches!(err, CoreError::Regex(_)));
    }

    #[test]
    fn matches_do_not_overlap() {
        let found = spans("aa", SearchFlags::default(), "aaaa");
        assert_eq!(found, vec![(0, 2), (2, 4)]);
    }
}
