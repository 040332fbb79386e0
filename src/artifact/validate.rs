//! Structural checks on rendered artifacts.
//!
//! Flags leftover placeholder tokens, unrendered `{{ }}` variables,
//! duplicate `fdd-` ids and missing or misordered `## A. Title` sections.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(TODO|TBD|FIXME|XXX|TBA)\b").expect("valid placeholder pattern"));
static BRACE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("valid brace pattern"));
static SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##\s+([A-Z])\.\s+(.+?)\s*$").expect("valid section pattern"));
static OLD_SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##\s+Section\s+[A-Z]:").expect("valid section pattern"));
static ID_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*ID\*\*:\s*(.+)$").expect("valid id pattern"));
static BACKTICKED: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code pattern"));
static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]*`").expect("valid code pattern"));
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid slug pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid slug pattern"));
static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid slug pattern"));

/// Convert a heading or directory name to a URL-friendly slug.
///
/// `"A. Introduction"` becomes `"a-introduction"`.
pub fn slugify(text: &str) -> String {
    let text = CODE_SPAN.replace_all(text, "");
    let text = text.trim().to_lowercase().replace('_', "-");
    let text = NON_SLUG.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, "-");
    let text = DASHES.replace_all(&text, "-");
    text.trim_matches('-').to_string()
}

/// A line containing a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderHit {
    /// 1-based line number
    pub line: usize,

    /// The offending token
    pub token: String,
}

/// Overall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// Findings for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// PASS when there are no findings
    pub status: ValidationStatus,

    /// Placeholder tokens and unrendered variables
    pub placeholder_hits: Vec<PlaceholderHit>,

    /// Required section ids with no heading
    pub missing_sections: Vec<String>,

    /// Other structural problems
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Check if the artifact passed.
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// One message per finding.
    pub fn findings(&self) -> Vec<String> {
        let mut findings: Vec<String> = self
            .placeholder_hits
            .iter()
            .map(|h| format!("placeholder '{}' on line {}", h.token, h.line))
            .collect();
        findings.extend(self.missing_sections.iter().map(|s| format!("missing section {s}")));
        findings.extend(self.errors.iter().cloned());
        findings
    }
}

/// Check rendered text against the structural rules.
///
/// `required_sections` lists section ids (`A`, `B`, ...) that must appear as
/// `## A. Title` headings in that order. Leave it empty to skip section checks.
pub fn validate_artifact(text: &str, required_sections: &[String]) -> ValidationReport {
    let mut placeholder_hits = Vec::new();
    let mut errors = Vec::new();
    let mut present_sections: Vec<String> = Vec::new();
    let mut ids: Vec<String> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        let trimmed = line.trim();

        for m in PLACEHOLDER.find_iter(line) {
            placeholder_hits.push(PlaceholderHit { line: number, token: m.as_str().to_string() });
        }
        for m in BRACE_PLACEHOLDER.find_iter(line) {
            placeholder_hits.push(PlaceholderHit { line: number, token: m.as_str().to_string() });
        }

        if let Some(caps) = SECTION_HEADING.captures(trimmed) {
            present_sections.push(caps[1].to_string());
        }
        if OLD_SECTION_HEADING.is_match(trimmed) {
            errors.push(format!("line {number}: use '## A. Title' instead of '{trimmed}'"));
        }

        if let Some(caps) = ID_LINE.captures(line) {
            let value = &caps[1];
            if value.contains("fdd-") && !value.contains('`') {
                errors.push(format!("line {number}: ID values must be wrapped in backticks"));
            }
            ids.extend(
                BACKTICKED
                    .captures_iter(value)
                    .map(|c| c[1].to_string())
                    .filter(|id| id.starts_with("fdd-")),
            );
        }
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in &ids {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    let duplicates: Vec<&str> = counts.iter().filter(|(_, c)| **c > 1).map(|(id, _)| *id).collect();
    if !duplicates.is_empty() {
        errors.push(format!("duplicate fdd- IDs: {}", duplicates.join(", ")));
    }

    let mut missing_sections = Vec::new();
    if !required_sections.is_empty() {
        missing_sections = required_sections
            .iter()
            .filter(|s| !present_sections.contains(s))
            .cloned()
            .collect();

        let mut section_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for id in &present_sections {
            *section_counts.entry(id.as_str()).or_default() += 1;
        }
        let repeated: Vec<&str> =
            section_counts.iter().filter(|(_, c)| **c > 1).map(|(id, _)| *id).collect();
        if !repeated.is_empty() {
            errors.push(format!("duplicate sections: {}", repeated.join(", ")));
        }

        let found_order: Vec<&String> =
            present_sections.iter().filter(|s| required_sections.contains(s)).collect();
        let expected: Vec<&String> =
            required_sections.iter().filter(|s| present_sections.contains(s)).collect();
        if repeated.is_empty() && found_order != expected {
            let found: Vec<&str> = found_order.iter().map(|s| s.as_str()).collect();
            errors.push(format!("sections out of order: found {}", found.join(", ")));
        }
    }

    let passed = placeholder_hits.is_empty() && missing_sections.is_empty() && errors.is_empty();
    ValidationReport {
        status: if passed { ValidationStatus::Pass } else { ValidationStatus::Fail },
        placeholder_hits,
        missing_sections,
        errors,
    }
}
