//! Interpretation of raw model output.
//!
//! Code and test generators answer with JSON, sometimes wrapped in markdown
//! fences and sometimes not valid at all. Unparseable output degrades to a
//! placeholder payload instead of failing the step.

use fm_core::types::{CodeBundle, TestSuite};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Outcome of a generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated<T> {
    Parsed(T),
    /// The raw output was unusable; `payload` is a placeholder.
    Degraded { payload: T, reason: String },
}

impl<T> Generated<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Generated::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Generated::Parsed(_) => None,
            Generated::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn payload(&self) -> &T {
        match self {
            Generated::Parsed(payload) | Generated::Degraded { payload, .. } => payload,
        }
    }

    pub fn into_payload(self) -> T {
        match self {
            Generated::Parsed(payload) | Generated::Degraded { payload, .. } => payload,
        }
    }
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker and trim.
pub fn strip_json_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_or<T, F>(raw: &str, placeholder: F) -> Generated<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let cleaned = strip_json_fences(raw);
    let cleaned = if cleaned.is_empty() { "{}" } else { cleaned.as_str() };
    match serde_json::from_str(cleaned) {
        Ok(parsed) => Generated::Parsed(parsed),
        Err(err) => Generated::Degraded {
            payload: placeholder(),
            reason: err.to_string(),
        },
    }
}

pub fn parse_code_bundle(raw: &str) -> Generated<CodeBundle> {
    parse_or(raw, placeholder_code)
}

/// Test suites from the generator never carry results, only code.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTestSuite {
    framework: String,
    test_code: String,
}

pub fn parse_test_suite(raw: &str) -> Generated<TestSuite> {
    match parse_or::<RawTestSuite, _>(raw, || RawTestSuite {
        framework: String::new(),
        test_code: String::new(),
    }) {
        Generated::Parsed(suite) => Generated::Parsed(TestSuite {
            framework: suite.framework,
            test_code: suite.test_code,
            results: None,
        }),
        Generated::Degraded { reason, .. } => Generated::Degraded {
            payload: placeholder_tests(),
            reason,
        },
    }
}

pub fn placeholder_code() -> CodeBundle {
    CodeBundle {
        firebase: "// Error generating Firebase code".into(),
        ai_studio: "// Error generating AI Studio code".into(),
        replit: "# Error generating Replit code".into(),
    }
}

pub fn placeholder_tests() -> TestSuite {
    TestSuite {
        framework: "Jest".into(),
        test_code: "// Error generating unit tests".into(),
        results: None,
    }
}

const KEY_FINDINGS: &str = "key findings:";
const TECH_REQUIREMENTS: &str = "technical requirements:";

/// Bullet lines of the "Key Findings:" section of a research text, with the
/// leading "- " removed.
///
/// The section ends at "Technical Requirements:" or the end of the text and
/// both headers match case-insensitively. Without the header the result is
/// a single generic finding.
pub fn extract_key_findings(text: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();
    let Some(start) = lower.find(KEY_FINDINGS) else {
        return vec!["Research completed successfully.".to_string()];
    };
    let body_start = start + KEY_FINDINGS.len();
    let body_end = lower[body_start..]
        .find(TECH_REQUIREMENTS)
        .map(|offset| body_start + offset)
        .unwrap_or(text.len());

    text[body_start..body_end]
        .lines()
        .filter(|line| line.trim().starts_with('-'))
        .map(|line| {
            let line = line.strip_prefix("- ").unwrap_or(line);
            line.trim().to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_code_bundle_parses() {
        let raw = "```json\n{\"firebase\":\"fb\",\"aiStudio\":\"ai\",\"replit\":\"rp\"}\n```";
        let generated = parse_code_bundle(raw);
        assert!(!generated.is_degraded());
        assert_eq!(generated.payload().ai_studio, "ai");
    }

    #[test]
    fn malformed_code_degrades_to_placeholder() {
        let generated = parse_code_bundle("```json\n{\"firebase\": ");
        assert!(generated.is_degraded());
        assert!(generated.reason().is_some());
        assert_eq!(generated.into_payload(), placeholder_code());
    }

    #[test]
    fn empty_output_degrades() {
        let generated = parse_code_bundle("   ");
        assert!(generated.is_degraded());
    }

    #[test]
    fn test_suite_parses_camel_case() {
        let raw = "{\"framework\":\"Pytest\",\"testCode\":\"def test_x(): pass\"}";
        let generated = parse_test_suite(raw);
        assert_eq!(
            generated,
            Generated::Parsed(TestSuite {
                framework: "Pytest".into(),
                test_code: "def test_x(): pass".into(),
                results: None,
            })
        );
    }

    #[test]
    fn test_suite_missing_field_degrades() {
        let generated = parse_test_suite("{\"framework\":\"Jest\"}");
        assert_eq!(generated.payload(), &placeholder_tests());
    }

    #[test]
    fn key_findings_stop_at_requirements() {
        let text = "Summary:\nstuff\nKey Findings:\n- first\n  - second  \nnot a bullet\nTechnical Requirements:\n- hidden";
        assert_eq!(extract_key_findings(text), vec!["first", "- second"]);
    }

    #[test]
    fn key_findings_header_is_case_insensitive() {
        let text = "KEY FINDINGS:\n- only";
        assert_eq!(extract_key_findings(text), vec!["only"]);
    }

    #[test]
    fn missing_header_yields_default_finding() {
        assert_eq!(
            extract_key_findings("no sections here"),
            vec!["Research completed successfully."]
        );
    }
}
