//! Regex-based highlighting.
//!
//! A [`RegexHighlighter`] combines an ordered list of `(name, pattern)`
//! styles into one pattern of named groups:
//!
//! ```text
//! (?P<name1>pattern1)|(?P<name2>pattern2)|...
//! ```
//!
//! Highlighting replaces every non-overlapping match with a tagged copy,
//! `[{prefix}{name}]{content}[/{prefix}{name}]`, where `name` is the style
//! whose group matched. When two styles could match at the same position
//! the one listed first wins. Text between matches is kept verbatim.
//!
//! Patterns may use look-around and back-references; context around a
//! match must be expressed with look-around, since everything a pattern
//! consumes ends up inside the tag.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fancy_regex::{Regex as FancyRegex, RegexBuilder};
use lazy_static::lazy_static;
use regex::Regex;
use termkit_core::{Error, Result};
use tracing::{debug, warn};

/// Style whose matches have `[` escaped so the markup renderer leaves
/// their content alone.
pub const STRING_STYLE: &str = "str";

/// Backtracking steps allowed per search.
///
/// A search runs from the current position to the next match, so long
/// stretches of unmatched text count against this as well.
pub const DEFAULT_BACKTRACK_LIMIT: usize = 100_000_000;

lazy_static! {
    static ref RE_GROUP_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("group name pattern is valid");
}

/// Something that injects markup tags into text.
pub trait Highlighter: Send + Sync {
    /// Highlight `text`.
    ///
    /// With `cache` set, a previous result for the same input may be
    /// returned instead of recomputing it.
    fn highlight(&self, text: &str, cache: bool) -> String;
}

impl<F> Highlighter for F
where
    F: Fn(&str, bool) -> String + Send + Sync,
{
    fn highlight(&self, text: &str, cache: bool) -> String {
        self(text, cache)
    }
}

/// Statistics for a [`RegexHighlighter`] cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cache.
    pub hits: u64,
    /// Calls that ran the pattern.
    pub misses: u64,
    /// Current number of entries.
    pub size: usize,
}

#[derive(Debug, Default)]
struct HighlightCache {
    entries: HashMap<String, String>,
    hits: u64,
    misses: u64,
}

/// Highlighter driven by an ordered list of named regex styles.
#[derive(Debug)]
pub struct RegexHighlighter {
    styles: Vec<(String, String)>,
    prefix: String,
    pattern: FancyRegex,
    /// Capture group index of each style, in style order
    group_indices: Vec<usize>,
    cache: Mutex<HighlightCache>,
}

impl RegexHighlighter {
    /// Build a highlighter from `(name, pattern)` styles.
    ///
    /// Style order is match precedence. Names must be unique identifiers
    /// usable as regex group names.
    pub fn new<I, N, P>(styles: I, prefix: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        Self::with_backtrack_limit(styles, prefix, DEFAULT_BACKTRACK_LIMIT)
    }

    /// Like [`RegexHighlighter::new`], with an explicit cap on backtracking
    /// steps per search.
    pub fn with_backtrack_limit<I, N, P>(
        styles: I,
        prefix: impl Into<String>,
        backtrack_limit: usize,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let styles: Vec<(String, String)> = styles
            .into_iter()
            .map(|(name, pattern)| (name.into(), pattern.into()))
            .collect();

        for (index, (name, _)) in styles.iter().enumerate() {
            if !RE_GROUP_NAME.is_match(name) {
                return Err(Error::Pattern(format!("invalid style name: {name:?}")));
            }
            if styles[..index].iter().any(|(other, _)| other == name) {
                return Err(Error::Pattern(format!("duplicate style name: {name}")));
            }
        }

        let combined = styles
            .iter()
            .map(|(name, pattern)| format!("(?P<{name}>{pattern})"))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&combined)
            .backtrack_limit(backtrack_limit)
            .build()
            .map_err(|e| Error::Pattern(e.to_string()))?;

        let group_names: Vec<Option<&str>> = pattern.capture_names().collect();
        let group_indices = styles
            .iter()
            .map(|(name, _)| {
                group_names
                    .iter()
                    .position(|group| *group == Some(name.as_str()))
                    .ok_or_else(|| Error::Pattern(format!("missing group for style {name}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let prefix: String = prefix.into();
        debug!(
            "Built highlighter with {} styles, prefix {:?}",
            styles.len(),
            prefix
        );

        Ok(Self {
            styles,
            prefix,
            pattern,
            group_indices,
            cache: Mutex::new(HighlightCache::default()),
        })
    }

    /// Styles in precedence order.
    pub fn styles(&self) -> &[(String, String)] {
        &self.styles
    }

    /// Prefix prepended to every tag name.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Return current cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.lock_cache();
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
            size: cache.entries.len(),
        }
    }

    /// Drop every cached result. Statistics are kept.
    pub fn clear_cache(&self) {
        self.lock_cache().entries.clear();
    }

    fn lock_cache(&self) -> MutexGuard<'_, HighlightCache> {
        // Cache contents stay consistent even if a holder panicked.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tag every match in `text`, without touching the cache.
    ///
    /// A search that exceeds the backtrack limit leaves one character
    /// verbatim and resumes after it.
    fn apply(&self, text: &str) -> String {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut pos = 0;

        while pos <= text.len() {
            let captures = match self.pattern.captures_from_pos(text, pos) {
                Ok(Some(captures)) => captures,
                Ok(None) => break,
                Err(e) => {
                    warn!("Highlight search failed at byte {}: {}", pos, e);
                    pos = next_boundary(text, pos);
                    continue;
                }
            };

            let Some(whole) = captures.get(0) else {
                break;
            };
            pos = if whole.end() > whole.start() {
                whole.end()
            } else {
                next_boundary(text, whole.end())
            };

            let Some(style) = self
                .group_indices
                .iter()
                .position(|&index| captures.get(index).is_some())
            else {
                continue;
            };

            output.push_str(&text[last..whole.start()]);
            self.push_tagged(&mut output, &self.styles[style].0, whole.as_str());
            last = whole.end();
        }

        output.push_str(&text[last..]);
        output
    }

    fn push_tagged(&self, output: &mut String, name: &str, content: &str) {
        let content = if name == STRING_STYLE && content.contains('[') {
            content.replace('[', r"\[")
        } else {
            content.to_string()
        };

        output.push('[');
        output.push_str(&self.prefix);
        output.push_str(name);
        output.push(']');
        output.push_str(&content);
        output.push_str("[/");
        output.push_str(&self.prefix);
        output.push_str(name);
        output.push(']');
    }
}

fn next_boundary(text: &str, pos: usize) -> usize {
    pos + text[pos..].chars().next().map_or(1, char::len_utf8)
}

impl Highlighter for RegexHighlighter {
    /// Highlight `text`, consulting the cache only when `cache` is set.
    ///
    /// The result is stored either way, so a later cached call for the same
    /// input is answered without matching.
    fn highlight(&self, text: &str, cache: bool) -> String {
        if cache {
            let mut state = self.lock_cache();
            if let Some(hit) = state.entries.get(text).cloned() {
                state.hits += 1;
                return hit;
            }
        }

        let highlighted = self.apply(text);

        let mut state = self.lock_cache();
        state.misses += 1;
        state.entries.insert(text.to_string(), highlighted.clone());
        highlighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num_word() -> RegexHighlighter {
        RegexHighlighter::new([("num", r"\d+"), ("word", "[a-z]+")], "x.").unwrap()
    }

    #[test]
    fn test_tags_matches_with_prefix() {
        let highlighter = num_word();
        assert_eq!(
            highlighter.highlight("ab12", true),
            "[x.word]ab[/x.word][x.num]12[/x.num]"
        );
    }

    #[test]
    fn test_unmatched_text_is_verbatim() {
        let highlighter = num_word();
        assert_eq!(
            highlighter.highlight("-- 7 + AB --", true),
            "-- [x.num]7[/x.num] + AB --"
        );
        assert_eq!(highlighter.highlight("", true), "");
        assert_eq!(highlighter.highlight("!?", true), "!?");
    }

    #[test]
    fn test_earlier_style_wins_at_same_position() {
        let highlighter =
            RegexHighlighter::new([("keyword", r"\bif\b"), ("name", r"\b\w+\b")], "").unwrap();
        assert_eq!(
            highlighter.highlight("if iffy", true),
            "[keyword]if[/keyword] [name]iffy[/name]"
        );

        let reversed =
            RegexHighlighter::new([("name", r"\b\w+\b"), ("keyword", r"\bif\b")], "").unwrap();
        assert_eq!(reversed.highlight("if", true), "[name]if[/name]");
    }

    #[test]
    fn test_string_style_escapes_brackets() {
        let highlighter =
            RegexHighlighter::new([("str", r#""[^"]*""#), ("list", r"\[\w*\]")], "").unwrap();
        assert_eq!(
            highlighter.highlight(r#""[bold]" [x]"#, true),
            r#"[str]"\[bold]"[/str] [list][x][/list]"#
        );
        assert_eq!(highlighter.highlight(r#""plain""#, true), r#"[str]"plain"[/str]"#);
    }

    #[test]
    fn test_lookaround_and_backreferences() {
        let highlighter = RegexHighlighter::new(
            [
                ("quoted", r#"(?P<q>['"]).*?(?P=q)"#),
                ("call", r"\w+(?=\()"),
            ],
            "",
        )
        .unwrap();
        assert_eq!(
            highlighter.highlight(r#"f('a"b')"#, true),
            r#"[call]f[/call]([quoted]'a"b'[/quoted])"#
        );
    }

    fn strip_tags(text: &str) -> String {
        Regex::new(r"\[/?\w+\]").unwrap().replace_all(text, "").into_owned()
    }

    #[test]
    fn test_search_limit_skips_only_the_failing_spot() {
        let highlighter = RegexHighlighter::with_backtrack_limit(
            [
                ("quoted", r#"(?P<q>['"]).*?(?P=q)"#),
                ("keyword", r"\bTrue\b"),
            ],
            "",
            100,
        )
        .unwrap();
        let text = format!("'{}\nTrue", "a".repeat(2000));

        let highlighted = highlighter.highlight(&text, false);

        assert!(highlighted.ends_with("\n[keyword]True[/keyword]"));
        assert_eq!(strip_tags(&highlighted), text);
    }

    #[test]
    fn test_unterminated_string_on_long_line() {
        let highlighter = RegexHighlighter::new(
            [
                ("quoted", r#"(?P<q>['"]).*?(?P=q)"#),
                ("keyword", r"\bTrue\b"),
            ],
            "",
        )
        .unwrap();
        let text = format!("x = 'unterminated {}\nTrue", "word ".repeat(4000));

        let highlighted = highlighter.highlight(&text, false);

        assert!(highlighted.ends_with("\n[keyword]True[/keyword]"));
        assert_eq!(strip_tags(&highlighted), text);
    }

    #[test]
    fn test_empty_matches_do_not_stall() {
        let highlighter = RegexHighlighter::new([("digits", r"\d*")], "").unwrap();
        assert_eq!(
            highlighter.highlight("a1", false),
            "[digits][/digits]a[digits]1[/digits][digits][/digits]"
        );
    }

    #[test]
    fn test_cache_hit_skips_matching() {
        let highlighter = num_word();
        let first = highlighter.highlight("abc 123", true);
        let second = highlighter.highlight("abc 123", true);

        assert_eq!(first, second);
        assert_eq!(
            highlighter.cache_stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                size: 1
            }
        );
    }

    #[test]
    fn test_uncached_call_still_populates_cache() {
        let highlighter = num_word();
        highlighter.highlight("abc", false);
        highlighter.highlight("abc", false);
        assert_eq!(highlighter.cache_stats().misses, 2);
        assert_eq!(highlighter.cache_stats().size, 1);

        highlighter.highlight("abc", true);
        assert_eq!(highlighter.cache_stats().hits, 1);
    }

    #[test]
    fn test_clear_cache() {
        let highlighter = num_word();
        highlighter.highlight("abc", true);
        highlighter.clear_cache();
        assert_eq!(highlighter.cache_stats().size, 0);

        highlighter.highlight("abc", true);
        assert_eq!(highlighter.cache_stats().misses, 2);
    }

    #[test]
    fn test_invalid_styles_are_rejected() {
        assert!(matches!(
            RegexHighlighter::new([("num", r"\d+"), ("num", "[a-z]+")], ""),
            Err(Error::Pattern(_))
        ));
        assert!(matches!(
            RegexHighlighter::new([("code.num", r"\d+")], ""),
            Err(Error::Pattern(_))
        ));
        assert!(matches!(
            RegexHighlighter::new([("num", r"(\d+")], ""),
            Err(Error::Pattern(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let highlighter = num_word();
        assert_eq!(highlighter.prefix(), "x.");
        assert_eq!(
            highlighter.styles(),
            &[
                ("num".to_string(), r"\d+".to_string()),
                ("word".to_string(), "[a-z]+".to_string())
            ]
        );
    }

    #[test]
    fn test_closures_are_highlighters() {
        let upper = |text: &str, _cache: bool| text.to_uppercase();
        let highlighters: Vec<Box<dyn Highlighter>> = vec![Box::new(upper), Box::new(num_word())];
        let results: Vec<String> = highlighters
            .iter()
            .map(|h| h.highlight("ab1", true))
            .collect();
        assert_eq!(results, vec!["AB1", "[x.word]ab[/x.word][x.num]1[/x.num]"]);
    }
}
