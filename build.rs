use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding the crate's own Rust sources. Nothing else in the checkout is scanned.
const SOURCE_ROOTS: [&str; 3] = ["join", "cli", "tests"];

const FORBIDDEN_WORDS: &str = "FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE";

// A single hygiene rule: the regex that selects candidate lines, a predicate that
// decides whether a candidate is a real violation, and the advice printed on failure.
struct Rule {
    name: &'static str,
    pattern: String,
    is_violation: fn(&str) -> bool,
    advice: &'static str,
    include_build_script: bool,
}

// Collects violating lines of one file for one rule.
struct ViolationCollector {
    is_violation: fn(&str) -> bool,
    violations: Vec<String>,
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        if (self.is_violation)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }

        Ok(true)
    }
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || line.contains("/*")
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

// An underscore-prefixed name counts only in code, not in comments or string literals.
fn underscore_binding_in_code(line: &str) -> bool {
    if line.trim_start().starts_with("//") {
        return false;
    }
    let inside_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !inside_string
}

fn forbidden_word_in_comment(line: &str) -> bool {
    is_comment_line(line)
}

fn stars_in_plain_comment(line: &str) -> bool {
    is_comment_line(line) && !is_doc_comment(line)
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        Some(rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        Some(rest.trim())
    } else if let Some(idx) = line.find("/*") {
        let body = &line[idx + 2..];
        Some(body.find("*/").map_or(body, |end| &body[..end]).trim())
    } else {
        None
    }
}

fn all_uppercase_comment(line: &str) -> bool {
    let Some(text) = comment_text(line) else {
        return false;
    };
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

fn always(line: &str) -> bool {
    !line.is_empty()
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "underscore-prefixed variables",
            pattern: r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            is_violation: underscore_binding_in_code,
            advice: "Underscore-prefixed variable names are not allowed in this project.\n   Either use the variable (removing the underscore) or remove it completely.",
            include_build_script: true,
        },
        Rule {
            name: "forbidden comment words",
            pattern: format!(r"(//|/\*|///).*(?:{FORBIDDEN_WORDS})"),
            is_violation: forbidden_word_in_comment,
            advice: "Comments describing edits ('FIX', 'NEW', 'UPDATE' and similar) are STRICTLY FORBIDDEN.\n   Remove them completely rather than commenting them out.",
            include_build_script: false,
        },
        Rule {
            name: "'**' in regular comments",
            pattern: r"(//|/\*).*\*\*".to_string(),
            is_violation: stars_in_plain_comment,
            advice: "The '**' pattern is not allowed in regular comments (but is allowed in doc comments).",
            include_build_script: false,
        },
        Rule {
            name: "all-uppercase comments",
            pattern: r"(//|/\*|///).*".to_string(),
            is_violation: all_uppercase_comment,
            advice: "Comments where all alphabetic characters are uppercase are STRICTLY FORBIDDEN.\n   STRONGLY CONSIDER deleting the comment completely.",
            include_build_script: false,
        },
        Rule {
            name: "#[allow(dead_code)] attributes",
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
            is_violation: always,
            advice: "#[allow(dead_code)] attributes are STRICTLY FORBIDDEN.\n   Either use the code (removing the attribute) or remove it completely.",
            include_build_script: false,
        },
    ]
}

fn source_files(manifest_dir: &Path) -> Vec<PathBuf> {
    SOURCE_ROOTS
        .iter()
        .map(|root| manifest_dir.join(root))
        .flat_map(|root| WalkDir::new(root).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn check_rule(rule: &Rule, files: &[PathBuf], build_script: &Path) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(&rule.pattern)?;
    let mut searcher = Searcher::new();

    let build_script_files = rule.include_build_script.then_some(build_script);
    for path in files.iter().map(PathBuf::as_path).chain(build_script_files) {
        let mut collector = ViolationCollector {
            is_violation: rule.is_violation,
            violations: Vec::new(),
        };
        searcher.search_path(&matcher, path, &mut collector)?;

        if !collector.violations.is_empty() {
            let mut error_msg = format!(
                "\n❌ ERROR: Found {} {} in {}:\n",
                collector.violations.len(),
                rule.name,
                path.display()
            );
            for violation in &collector.violations {
                error_msg.push_str(&format!("   {violation}\n"));
            }
            error_msg.push_str(&format!("\n⚠️ {}\n", rule.advice));
            return Err(error_msg.into());
        }
    }

    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for root in SOURCE_ROOTS {
        println!("cargo:rerun-if-changed={root}");
    }

    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let files = source_files(&manifest_dir);
    let build_script = manifest_dir.join("build.rs");

    for rule in rules() {
        if let Err(e) = check_rule(&rule, &files, &build_script) {
            // The eprintln is what makes the violation visible in cargo's output.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
