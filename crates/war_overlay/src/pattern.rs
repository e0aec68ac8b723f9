//! Include/exclude path filtering.
//!
//! Patterns use Ant-style glob syntax: `*` and `?` never cross a `/`, `**`
//! spans any number of directories, and a pattern ending in `/` matches
//! everything below that directory. `[` and `]` are literal characters, as
//! in Ant; there are no character classes.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};

/// Version-control and editor leftovers that are never copied.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/CVS/**",
    "**/.cvsignore",
    "**/.svn/**",
    "**/.git/**",
    "**/.gitignore",
    "**/.gitattributes",
    "**/.hg/**",
    "**/.hgignore",
    "**/.bzr/**",
    "**/.DS_Store",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled include/exclude set.
///
/// A path is accepted when it matches at least one include (or the include
/// list is empty) and matches no exclude.
#[derive(Debug, Clone)]
pub struct PathFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self> {
        let includes = includes
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let excludes = excludes
            .iter()
            .map(|p| p.as_ref())
            .chain(DEFAULT_EXCLUDES.iter().copied())
            .map(compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { includes, excludes })
    }

    /// Accept everything except the default excludes.
    pub fn everything() -> Result<Self> {
        Self::new::<&str>(&[], &[])
    }

    /// Check a normalized, `/`-separated relative path.
    pub fn matches(&self, path: &str) -> bool {
        let included = self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|p| p.matches_with(path, MATCH_OPTIONS));

        included
            && !self
                .excludes
                .iter()
                .any(|p| p.matches_with(path, MATCH_OPTIONS))
    }
}

fn compile(raw: &str) -> Result<Pattern> {
    let mut pattern = raw.trim().replace('\\', "/");
    while let Some(stripped) = pattern.strip_prefix('/') {
        pattern = stripped.to_string();
    }
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            other => escaped.push(other),
        }
    }

    Pattern::new(&escaped).map_err(|e| Error::InvalidPattern {
        pattern: raw.to_string(),
        message: e.msg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(includes: &[&str], excludes: &[&str]) -> PathFilter {
        PathFilter::new(includes, excludes).unwrap()
    }

    #[test]
    fn test_default_overlay_filters() {
        let f = filter(&["**/**"], &["META-INF/MANIFEST.MF"]);
        assert!(f.matches("index.jsp"));
        assert!(f.matches("WEB-INF/web.xml"));
        assert!(f.matches("META-INF/context.xml"));
        assert!(!f.matches("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_single_star_stays_in_directory() {
        let f = filter(&["*.jsp"], &[]);
        assert!(f.matches("index.jsp"));
        assert!(!f.matches("jsp/index.jsp"));

        let f = filter(&["**/*.jsp"], &[]);
        assert!(f.matches("index.jsp"));
        assert!(f.matches("jsp/d/a.jsp"));
        assert!(!f.matches("jsp/d/a.xml"));
    }

    #[test]
    fn test_trailing_slash_matches_directory_contents() {
        let f = filter(&["**/**"], &["WEB-INF/classes/"]);
        assert!(f.matches("WEB-INF/web.xml"));
        assert!(!f.matches("WEB-INF/classes/a.class"));
        assert!(!f.matches("WEB-INF/classes/org/sample/b.class"));
    }

    #[test]
    fn test_brackets_are_literal() {
        let f = filter(&["img/[draft]*.png", "img/*/[draft]*.png"], &["**/[old]/**"]);
        assert!(f.matches("img/[draft]logo.png"));
        assert!(!f.matches("img/dlogo.png"));
        assert!(!f.matches("img/rlogo.png"));
        assert!(!f.matches("img/[old]/[draft]a.png"));
        assert!(f.matches("img/new/[draft]a.png"));
    }

    #[test]
    fn test_empty_includes_means_everything() {
        let f = filter(&[], &["*.txt"]);
        assert!(f.matches("a/b/c.xml"));
        assert!(!f.matches("readme.txt"));
    }

    #[test]
    fn test_default_excludes_always_apply() {
        let f = PathFilter::everything().unwrap();
        assert!(!f.matches(".git/config"));
        assert!(!f.matches("css/.svn/entries"));
        assert!(!f.matches("jsp/index.jsp~"));
        assert!(!f.matches("img/.DS_Store"));
        assert!(f.matches("css/site.css"));
        assert!(f.matches(".htaccess"));
    }

    #[test]
    fn test_patterns_are_case_sensitive() {
        let f = filter(&["**/**"], &["META-INF/MANIFEST.MF"]);
        assert!(f.matches("meta-inf/manifest.mf"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathFilter::new(&["***.jsp"], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "***.jsp"));
        assert!(err.is_configuration_error());
    }
}
