//! Plain `{{ variable }}` interpolation.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid variable pattern"));

/// Result of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered text; unknown variables are left as written
    pub text: String,

    /// Names of variables with no value, in order of first use
    pub unresolved: Vec<String>,
}

/// Substitute `{{ name }}` placeholders from `vars`.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> Rendered {
    let mut unresolved: Vec<String> = Vec::new();
    let text = VARIABLE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    if !unresolved.iter().any(|u| u == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    Rendered { text, unresolved }
}

/// Substitute `{slug}` in an output path.
pub fn render_path(output: &str, slug: &str) -> String {
    output.replace("{slug}", slug)
}
