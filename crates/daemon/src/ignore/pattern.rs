// Single ignore rule: gitignore-subset syntax over shell-style globs.

use glob::{MatchOptions, Pattern};
use tracing::warn;

/// `*` crosses `/`, matching is case-sensitive, leading dots are not special.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
enum Rule {
    /// Blank, comment, negated, or uncompilable. Never matches.
    Inert,
    /// Trailing `/`: matches any directory prefix or any single segment.
    Directory(Pattern),
    /// Matches the whole relative path or its final segment.
    Path(Pattern),
}

/// A parsed ignore line. Keeps the original text for diagnostics.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    text: String,
    rule: Rule,
}

impl IgnorePattern {
    pub fn parse(line: &str) -> Self {
        let text = line.trim().to_string();
        let rule = if text.is_empty() || text.starts_with('#') || text.starts_with('!') {
            // Negation is recognized but not applied.
            Rule::Inert
        } else if let Some(directory) = text.strip_suffix('/') {
            compile(directory, &text).map_or(Rule::Inert, Rule::Directory)
        } else {
            compile(&text, &text).map_or(Rule::Inert, Rule::Path)
        };
        Self { text, rule }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.rule, Rule::Inert)
    }

    /// Match against a `/`-joined path relative to the rule's base directory.
    pub fn matches(&self, relative: &str) -> bool {
        match &self.rule {
            Rule::Inert => false,
            Rule::Directory(glob) => {
                let segments: Vec<&str> = relative.split('/').collect();
                (1..=segments.len()).any(|end| {
                    glob.matches_with(&segments[..end].join("/"), MATCH_OPTIONS)
                        || glob.matches_with(segments[end - 1], MATCH_OPTIONS)
                })
            }
            Rule::Path(glob) => {
                let basename = relative.rsplit('/').next().unwrap_or(relative);
                glob.matches_with(relative, MATCH_OPTIONS)
                    || glob.matches_with(basename, MATCH_OPTIONS)
            }
        }
    }
}

fn compile(glob: &str, original: &str) -> Option<Pattern> {
    match Pattern::new(&normalize(glob)) {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            warn!(pattern = %original, error = %error, "ignoring invalid ignore pattern");
            None
        }
    }
}

/// Rewrite shell `fnmatch` syntax into what `glob::Pattern` accepts: runs of
/// `*` collapse to one, and a `[` with no closing `]` becomes a literal.
fn normalize(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            other => out.push(other),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the class opened at `start`. A `]` directly
/// after `[` or `[!` is part of the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..].iter().position(|c| *c == ']').map(|offset| j + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matches(pattern: &str, path: &str) -> bool {
        IgnorePattern::parse(pattern).matches(path)
    }

    #[test]
    fn comments_blanks_and_negations_are_inert() {
        for line in ["", "   ", "# comment", "!keep.txt"] {
            let pattern = IgnorePattern::parse(line);
            assert!(pattern.is_inert(), "{line:?} should be inert");
            assert!(!pattern.matches("keep.txt"));
        }
    }

    #[test]
    fn basename_or_full_path_match() {
        assert!(matches("*.log", "debug.log"));
        assert!(matches("*.log", "logs/deep/debug.log"));
        assert!(matches("docs/*.md", "docs/readme.md"));
        assert!(!matches("*.log", "debug.log.txt"));
    }

    #[test]
    fn star_crosses_separators() {
        assert!(matches("src/*.rs", "src/nested/lib.rs"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(matches("file?.txt", "file1.txt"));
        assert!(!matches("file?.txt", "file10.txt"));
        assert!(matches("[abc].txt", "b.txt"));
        assert!(!matches("[!abc].txt", "b.txt"));
        assert!(matches("[!abc].txt", "d.txt"));
        assert!(matches("[0-9]*.tmp", "7days.tmp"));
    }

    #[test]
    fn directory_pattern_matches_prefix_or_segment() {
        assert!(matches("build/", "build/output.txt"));
        assert!(matches("build/", "src/build/x.txt"));
        assert!(!matches("build/", "my_build/file.txt"));
        assert!(matches("node_modules/", "a/b/node_modules/pkg/index.js"));
        assert!(matches("src/gen/", "src/gen/out.rs"));
    }

    #[test]
    fn directory_pattern_glob() {
        assert!(matches("__pycache__/", "pkg/__pycache__/mod.cpython.pyc"));
        assert!(matches("*.egg-info/", "dist/thing.egg-info/PKG-INFO"));
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let pattern = IgnorePattern::parse("weird[name");
        assert!(!pattern.is_inert());
        assert!(pattern.matches("weird[name"));
        assert!(!pattern.matches("weirdn"));
    }

    #[test]
    fn double_star_behaves_like_single_star() {
        assert!(matches("**/cache", "a/b/cache"));
        assert!(matches("foo**bar", "foo/x/bar"));
    }

    #[test]
    fn text_is_trimmed() {
        let pattern = IgnorePattern::parse("  *.swp  ");
        assert_eq!(pattern.as_str(), "*.swp");
        assert!(pattern.matches("x.swp"));
    }

    #[test]
    fn normalize_keeps_closed_classes() {
        assert_eq!(normalize("[]]x"), "[]]x");
        assert_eq!(normalize("[!]]x"), "[!]]x");
        assert_eq!(normalize("a[b"), "a[[]b");
        assert_eq!(normalize("a***b"), "a*b");
    }

    proptest! {
        #[test]
        fn build_dir_ignores_any_nesting(prefix in "[a-z]{1,6}(/[a-z]{1,6}){0,3}", file in "[a-z]{1,8}\\.txt") {
            let nested = format!("{prefix}/build/{file}");
            prop_assert!(matches("build/", &nested));
            let lookalike = format!("{prefix}/my_build/{file}");
            prop_assert!(!matches("build/", &lookalike) || prefix.split('/').any(|s| s == "build"));
        }
    }
}
