use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding this crate's own sources. Nothing else is scanned.
const SOURCE_DIRS: [&str; 4] = ["shrink", "sda", "tests", "benches"];

const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED",
    "CORRECTED",
    "FIX",
    "FIXES",
    "NEW",
    "CHANGED",
    "CHANGES",
    "CHANGE",
    "MODIFIED",
    "MODIFIES",
    "MODIFY",
    "UPDATED",
    "UPDATES",
    "UPDATE",
];

/// One source-hygiene rule: a line matcher plus a filter that decides whether
/// a matching line is a real violation.
struct Rule {
    name: &'static str,
    pattern: String,
    accept: fn(&str) -> bool,
    advice: &'static str,
}

// Collects the violating lines of one file for one rule.
struct PolicyCollector {
    accept: fn(&str) -> bool,
    violations: Vec<String>,
}

impl Sink for PolicyCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.accept)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*")
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

fn comment_text(line: &str) -> &str {
    let trimmed = line.trim_start();
    if let Some(idx) = trimmed.find("/*") {
        let body = &trimmed[idx + 2..];
        return body.find("*/").map_or(body, |end| &body[..end]).trim();
    }
    trimmed.trim_start_matches('/').trim_start_matches('!').trim()
}

// Underscore-prefixed names outside comments and string literals.
fn underscore_binding(line: &str) -> bool {
    if is_comment(line) {
        return false;
    }
    let in_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !in_string
}

fn forbidden_marker(line: &str) -> bool {
    is_comment(line) || line.contains("//")
}

fn stars_outside_docs(line: &str) -> bool {
    !is_doc_comment(line)
}

fn all_caps_comment(line: &str) -> bool {
    if !is_comment(line) {
        return false;
    }
    let letters: Vec<char> = comment_text(line)
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
}

fn any_line(_: &str) -> bool {
    true
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "underscore-prefixed identifiers",
            pattern: r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            accept: underscore_binding,
            advice: "Either use the binding under its real name or remove it.",
        },
        Rule {
            name: "change-log markers in comments",
            pattern: format!(r"(//|/\*).*(?:{})", FORBIDDEN_WORDS.join("|")),
            accept: forbidden_marker,
            advice: "Comments describe the code as it is, not how it got there.",
        },
        Rule {
            name: "'**' in non-doc comments",
            pattern: r"(//|/\*).*\*\*".to_string(),
            accept: stars_outside_docs,
            advice: "Emphasis markup is only allowed in doc comments.",
        },
        Rule {
            name: "comments written entirely in uppercase",
            pattern: r"(//|/\*).*".to_string(),
            accept: all_caps_comment,
            advice: "Delete the comment or write it as a sentence.",
        },
        Rule {
            name: "#[allow(dead_code)] attributes",
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
            accept: any_line,
            advice: "Either use the code or remove it.",
        },
    ]
}

fn source_files() -> Vec<PathBuf> {
    SOURCE_DIRS
        .iter()
        .filter(|dir| Path::new(dir).is_dir())
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn check_policy() -> Result<(), Box<dyn Error>> {
    let files = source_files();
    let mut searcher = Searcher::new();

    for rule in rules() {
        let matcher = RegexMatcher::new_line_matcher(&rule.pattern)?;
        for path in &files {
            let mut collector = PolicyCollector {
                accept: rule.accept,
                violations: Vec::new(),
            };
            searcher.search_path(&matcher, path, &mut collector)?;

            if !collector.violations.is_empty() {
                let mut message = format!(
                    "\n❌ ERROR: Found {} {} in {}:\n",
                    collector.violations.len(),
                    rule.name,
                    path.display()
                );
                for violation in &collector.violations {
                    message.push_str(&format!("   {violation}\n"));
                }
                message.push_str(&format!("\n⚠️ {}\n", rule.advice));
                return Err(message.into());
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    if let Err(e) = check_policy() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
