use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where candidate paths come from: a wordlist file on disk, or an inline
/// list (used by the embedded web UI and by tests).
#[derive(Debug, Clone)]
pub enum WordlistSource {
    FilePath(PathBuf),
    Inline(Vec<String>),
}

/// Expand wordlist content into a deduplicated list of candidate paths.
///
/// Per non-empty trimmed line:
/// - the line itself becomes a candidate;
/// - for each extension suffix, `line + ext` is added iff the last path
///   segment (text after the final `/`) contains no `.` — so `admin` gains
///   `admin.bak` but `login.php` is never doubled into `login.php.bak`.
///
/// Duplicates are dropped; first-appearance order is preserved.
pub fn expand_candidates(content: &str, extensions: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw_line in content.lines() {
        let path = raw_line.trim();
        if path.is_empty() {
            continue;
        }
        if seen.insert(path.to_string()) {
            out.push(path.to_string());
        }
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        if last_segment.contains('.') {
            continue;
        }
        for ext in extensions {
            let variant = format!("{path}{ext}");
            if seen.insert(variant.clone()) {
                out.push(variant);
            }
        }
    }

    out
}

/// Load wordlist content from a source. Errors if a file path cannot be read;
/// this is a fatal configuration error for the run.
pub fn load_source(source: &WordlistSource) -> Result<String> {
    match source {
        WordlistSource::FilePath(path) => read_wordlist(path),
        WordlistSource::Inline(lines) => Ok(lines.join("\n")),
    }
}

fn read_wordlist(path: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read wordlist file: {}", path.as_ref().display()))
}

/// A conservative built-in wordlist of commonly exposed paths.
/// Intentionally small-but-useful; pass a real wordlist for serious runs.
pub fn default_wordlist() -> String {
    const DEFAULT: &[&str] = &[
        "admin",
        "login",
        "dashboard",
        "config",
        "backup",
        "uploads",
        "static",
        "api",
        "api/v1",
        "phpinfo.php",
        "robots.txt",
        "sitemap.xml",
        ".git/HEAD",
        ".env",
        "wp-login.php",
        "server-status",
        "console",
        "actuator",
        "swagger-ui.html",
        "favicon.ico",
    ];
    DEFAULT.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn expands_extensionless_paths_only() {
        let candidates = expand_candidates("admin\nlogin.php\n", &exts(&[".bak"]));
        assert_eq!(candidates, vec!["admin", "admin.bak", "login.php"]);
    }

    #[test]
    fn dedups_repeated_lines() {
        let candidates = expand_candidates("a\nb\na\n  b  \n", &[]);
        assert_eq!(candidates, vec!["a", "b"]);
    }

    #[test]
    fn skips_blank_and_whitespace_lines() {
        let candidates = expand_candidates("\n   \nadmin\n\n", &[]);
        assert_eq!(candidates, vec!["admin"]);
    }

    #[test]
    fn dot_check_applies_to_last_segment_only() {
        // A dotted directory earlier in the path must not suppress expansion.
        let candidates = expand_candidates("v1.2/admin\n", &exts(&[".old"]));
        assert_eq!(candidates, vec!["v1.2/admin", "v1.2/admin.old"]);
    }

    #[test]
    fn multiple_extensions_in_order() {
        let candidates = expand_candidates("db\n", &exts(&[".bak", ".old"]));
        assert_eq!(candidates, vec!["db", "db.bak", "db.old"]);
    }

    #[test]
    fn default_wordlist_expands_nonempty() {
        let candidates = expand_candidates(&default_wordlist(), &[]);
        assert!(!candidates.is_empty());
        assert!(candidates.iter().any(|c| c == "admin"));
    }
}
