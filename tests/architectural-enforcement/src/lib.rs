//! Architectural Enforcement
//!
//! Source scans that keep the companion crates honest about time:
//! production code waits on deadlines and channels, it never sleeps.
//! Typing pacing, grace periods and reply delays all live on the companion
//! timeline; the runtime maps them onto `sleep_until` deadlines inside one
//! `select!`, so a bare `sleep()` in production code is always a bug.
//!
//! Test code (anything after `#[cfg(test)]`, or inside a `#[test]` /
//! `#[tokio::test]` function) may sleep on a paused clock.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories scanned, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["companion/core/src", "companion/host/src"];

/// One offending line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File the line is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The trimmed source line
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root, resolved from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Sleep calls in every production directory
#[must_use]
pub fn find_sleep_violations(root: &Path) -> Vec<Violation> {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            violations.extend(
                sleep_lines(&content)
                    .into_iter()
                    .map(|(line, text)| Violation {
                        path: entry.path().to_path_buf(),
                        line,
                        text,
                    }),
            );
        }
    }
    violations
}

/// Line numbers and text of sleep calls outside test code
#[must_use]
pub fn sleep_lines(content: &str) -> Vec<(usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    let mut found = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);
        if !(code_part.contains("::sleep(") || code_part.contains(".sleep(")) {
            continue;
        }
        if is_in_test_function(&lines, idx) {
            continue;
        }
        found.push((idx + 1, line.trim().to_string()));
    }
    found
}

/// Whether the line at `current_idx` sits inside a test function
#[must_use]
pub fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    for line in lines[..current_idx].iter().rev() {
        let line = line.trim();

        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if line.starts_with("fn ")
            || line.starts_with("pub fn ")
            || line.starts_with("async fn ")
            || line.starts_with("pub async fn ")
        {
            // The attribute sits directly above the signature
            continue;
        }
        if line.starts_with("mod ") || line.starts_with("impl ") || line == "}" {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_sleep_in_plain_function() {
        let code = "fn bad() {\n    tokio::time::sleep(Duration::from_millis(10)).await;\n}\n";
        assert_eq!(sleep_lines(code).len(), 1);
        assert_eq!(sleep_lines(code)[0].0, 2);
    }

    #[test]
    fn test_sleep_until_is_allowed() {
        let code = "async fn wait(at: Instant) {\n    time::sleep_until(at).await;\n}\n";
        assert!(sleep_lines(code).is_empty());
    }

    #[test]
    fn test_comments_are_ignored() {
        let code = "fn f() {\n    // std::thread::sleep(d) would block here\n}\n";
        assert!(sleep_lines(code).is_empty());
    }

    #[test]
    fn test_cfg_test_module_is_exempt() {
        let code = concat!(
            "fn f() {}\n",
            "#[cfg(test)]\n",
            "mod tests {\n",
            "    fn helper() { std::thread::sleep(d); }\n",
            "}\n",
        );
        assert!(sleep_lines(code).is_empty());
    }

    #[test]
    fn test_test_function_is_exempt() {
        let lines = [
            "#[tokio::test(start_paused = true)]",
            "async fn test_waits() {",
            "    tokio::time::sleep(Duration::from_secs(1)).await;",
        ];
        assert!(is_in_test_function(&lines, 2));
    }

    #[test]
    fn test_function_after_closed_item_is_not_test() {
        let lines = [
            "#[test]",
            "fn test_a() {}",
            "}",
            "fn production() {",
            "    std::thread::sleep(d);",
        ];
        assert!(!is_in_test_function(&lines, 4));
    }
}
