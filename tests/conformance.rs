// ABOUTME: Conformance runner for the decoder.
// ABOUTME: Reads JSON case files from tests/conformance and checks decoded models, diagnostics and reports.

use emv_parser::render::render_text;
use emv_parser::{decode, DecoderConfig, FrameConfig, FrameLayout, Mode, NumericEncoding};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Known option names that this test runner supports.
const KNOWN_OPTIONS: &[&str] = &[
    "mode",
    "include_header_and_length",
    "layout",
    "parse_private_tlv",
    "parse_private_ltv",
    "max_depth",
    "skip_padding",
    "numeric_encoding",
    "allow_trailing_bytes",
];

/// Error kinds a case may expect.
const KNOWN_ERROR_TYPES: &[&str] = &[
    "MalformedHex",
    "LengthMismatch",
    "UnsupportedLengthForm",
    "TruncatedValue",
    "TrailingBytesInConstructedValue",
    "NestingTooDeep",
    "InvalidMti",
    "TagTooLong",
    "InvalidLength",
    "TrailingBytes",
];

/// Shape of a fatal diagnostic line.
const DIAGNOSTIC_PATTERN: &str = r"^(\w+) at byte (\d+): .+$";

#[derive(Debug)]
enum ValidationError {
    /// The case file is malformed and cannot be run.
    Structural(String),
}

/// Validate the version field (required, semver format).
fn validate_version(spec: &JsonValue) -> Result<(), ValidationError> {
    let version = spec
        .get("version")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ValidationError::Structural("missing string 'version' field".to_string()))?;
    let semver = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
    if !semver.is_match(version) {
        return Err(ValidationError::Structural(format!(
            "invalid version format '{}'",
            version
        )));
    }
    Ok(())
}

/// Validate a test name (pattern and uniqueness).
fn validate_test_name(name: &str, seen_names: &mut HashSet<String>) -> Result<(), ValidationError> {
    let name_pattern = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    if !name_pattern.is_match(name) {
        return Err(ValidationError::Structural(format!(
            "invalid test name '{}' (must match ^[a-z][a-z0-9_]*$)",
            name
        )));
    }
    if !seen_names.insert(name.to_string()) {
        return Err(ValidationError::Structural(format!("duplicate test name '{}'", name)));
    }
    Ok(())
}

/// Validate required fields for a test based on its type.
fn validate_test_fields(test: &JsonValue) -> Result<(), ValidationError> {
    let test_type = test["type"].as_str().unwrap_or("");
    let required: &[&str] = match test_type {
        "decode" => &["input", "expected"],
        "decode_error" => &["input", "expected_error", "expected_offset"],
        "render" => &["input", "expected_lines"],
        _ => {
            return Err(ValidationError::Structural(format!(
                "unknown test type '{}'",
                test_type
            )))
        }
    };
    for field in required {
        if test.get(*field).is_none() {
            return Err(ValidationError::Structural(format!(
                "{} test missing required '{}' field",
                test_type, field
            )));
        }
    }
    if let Some(kind) = test.get("expected_error").and_then(JsonValue::as_str) {
        if !KNOWN_ERROR_TYPES.contains(&kind) {
            return Err(ValidationError::Structural(format!("unknown error type '{}'", kind)));
        }
    }
    Ok(())
}

/// Build a decoder configuration from a case's options.
fn config_from_options(test: &JsonValue) -> Result<DecoderConfig, ValidationError> {
    let mut config = DecoderConfig::default();
    let Some(options) = test.get("options") else {
        return Ok(config);
    };
    let options = options
        .as_object()
        .ok_or_else(|| ValidationError::Structural("'options' must be an object".to_string()))?;

    for (key, value) in options {
        if !KNOWN_OPTIONS.contains(&key.as_str()) {
            return Err(ValidationError::Structural(format!("unrecognized option '{}'", key)));
        }
        let bad = || ValidationError::Structural(format!("invalid value for option '{}': {}", key, value));
        match key.as_str() {
            "mode" => {
                config.mode = match value.as_str() {
                    Some("emv") => Mode::Emv,
                    Some("iso8583") => Mode::Iso8583,
                    _ => return Err(bad()),
                }
            }
            "include_header_and_length" => {
                if value.as_bool().ok_or_else(bad)? {
                    config.frame = FrameConfig {
                        layout: config.frame.layout,
                        ..FrameConfig::header_and_length()
                    };
                }
            }
            "layout" => {
                config.frame.layout = match value.as_str() {
                    Some("length_then_header") => FrameLayout::LengthThenHeader,
                    Some("header_then_length") => FrameLayout::HeaderThenLength,
                    _ => return Err(bad()),
                }
            }
            "numeric_encoding" => {
                config.numeric_encoding = match value.as_str() {
                    Some("bcd") => NumericEncoding::Bcd,
                    Some("ascii") => NumericEncoding::Ascii,
                    _ => return Err(bad()),
                }
            }
            "parse_private_tlv" => config.parse_private_tlv = value.as_bool().ok_or_else(bad)?,
            "parse_private_ltv" => config.parse_private_ltv = value.as_bool().ok_or_else(bad)?,
            "skip_padding" => config.skip_padding = value.as_bool().ok_or_else(bad)?,
            "allow_trailing_bytes" => config.allow_trailing_bytes = value.as_bool().ok_or_else(bad)?,
            "max_depth" => config.max_depth = value.as_u64().ok_or_else(bad)? as usize,
            _ => unreachable!(),
        }
    }
    Ok(config)
}

/// True when every member of `expected` appears in `actual` with a matching value.
///
/// Arrays must have the same length; objects may carry extra keys.
fn json_contains(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Object(actual), JsonValue::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| json_contains(a, value))),
        (JsonValue::Array(actual), JsonValue::Array(expected)) => {
            actual.len() == expected.len()
                && actual.iter().zip(expected).all(|(a, e)| json_contains(a, e))
        }
        _ => actual == expected,
    }
}

fn run_test(test: &JsonValue) -> Result<(), String> {
    let name = test["name"].as_str().unwrap_or("unnamed");
    let input = test["input"].as_str().unwrap_or("");
    let config = config_from_options(test).map_err(|ValidationError::Structural(e)| format!("{}: {}", name, e))?;

    match test["type"].as_str().unwrap_or("") {
        "decode" => {
            let decoded = decode(input, &config).map_err(|e| format!("{}: unexpected error: {}", name, e))?;
            let actual = serde_json::to_value(&decoded).map_err(|e| format!("{}: {}", name, e))?;
            if !json_contains(&actual, &test["expected"]) {
                return Err(format!(
                    "{}: decoded model does not match\n  expected: {}\n  actual: {}",
                    name, test["expected"], actual
                ));
            }
        }
        "decode_error" => {
            let err = match decode(input, &config) {
                Ok(_) => return Err(format!("{}: expected an error, decode succeeded", name)),
                Err(err) => err,
            };
            let line = err.to_string();
            let pattern = Regex::new(DIAGNOSTIC_PATTERN).unwrap();
            let caps = pattern
                .captures(&line)
                .ok_or_else(|| format!("{}: malformed diagnostic line '{}'", name, line))?;
            let expected_kind = test["expected_error"].as_str().unwrap_or("");
            if &caps[1] != expected_kind || err.error_type() != expected_kind {
                return Err(format!("{}: expected {}, got '{}'", name, expected_kind, line));
            }
            let expected_offset = test["expected_offset"].as_u64().unwrap_or(u64::MAX);
            if caps[2].parse::<u64>().ok() != Some(expected_offset) {
                return Err(format!("{}: expected offset {}, got '{}'", name, expected_offset, line));
            }
        }
        "render" => {
            let decoded = decode(input, &config).map_err(|e| format!("{}: unexpected error: {}", name, e))?;
            let text = render_text(&decoded);
            let lines: Vec<&str> = text.lines().collect();
            for expected in test["expected_lines"].as_array().into_iter().flatten() {
                let expected = expected.as_str().unwrap_or("");
                if !lines.contains(&expected) {
                    return Err(format!("{}: missing line {:?} in report:\n{}", name, expected, text));
                }
            }
        }
        other => return Err(format!("{}: unknown test type '{}'", name, other)),
    }
    Ok(())
}

/// Result of running a test file.
struct TestFileResult {
    passed: usize,
    failed: usize,
    errors: Vec<String>,
    structural_error: Option<String>,
}

impl TestFileResult {
    fn structural(message: String) -> Self {
        Self {
            passed: 0,
            failed: 0,
            errors: vec![],
            structural_error: Some(message),
        }
    }
}

fn run_test_file_validated(spec: &JsonValue) -> TestFileResult {
    if spec.get("type").and_then(JsonValue::as_str) != Some("emv-parser-test") {
        return TestFileResult::structural("missing or invalid 'type' (expected 'emv-parser-test')".to_string());
    }
    if let Err(ValidationError::Structural(e)) = validate_version(spec) {
        return TestFileResult::structural(e);
    }
    let Some(tests) = spec.get("tests").and_then(JsonValue::as_array) else {
        return TestFileResult::structural("'tests' field must be an array".to_string());
    };

    let mut seen_names = HashSet::new();
    for test in tests {
        let name = test["name"].as_str().unwrap_or("");
        let checked = validate_test_name(name, &mut seen_names)
            .and_then(|()| validate_test_fields(test))
            .and_then(|()| config_from_options(test).map(|_| ()));
        if let Err(ValidationError::Structural(e)) = checked {
            return TestFileResult::structural(e);
        }
    }

    let mut result = TestFileResult {
        passed: 0,
        failed: 0,
        errors: vec![],
        structural_error: None,
    };
    for test in tests {
        match run_test(test) {
            Ok(()) => result.passed += 1,
            Err(e) => {
                result.failed += 1;
                result.errors.push(e);
            }
        }
    }
    result
}

fn run_test_file(path: &Path) -> (usize, usize, Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return (0, 1, vec![format!("Failed to read test file: {}", e)]),
    };
    let spec: JsonValue = match serde_json::from_str(&content) {
        Ok(s) => s,
        Err(e) => return (0, 1, vec![format!("Failed to parse test file: {}", e)]),
    };
    let result = run_test_file_validated(&spec);
    if let Some(structural_error) = result.structural_error {
        return (0, 1, vec![structural_error]);
    }
    (result.passed, result.failed, result.errors)
}

fn check_file(file: &str) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/conformance").join(file);
    let (passed, failed, errors) = run_test_file(&path);
    for err in &errors {
        eprintln!("{}", err);
    }
    assert_eq!(failed, 0, "Failed {} tests in {}", failed, file);
    assert!(passed > 0, "no tests ran in {}", file);
    eprintln!("{}: {} passed", file, passed);
}

#[test]
fn test_conformance_framing() {
    check_file("framing.json");
}

#[test]
fn test_conformance_emv() {
    check_file("emv.json");
}

#[test]
fn test_conformance_iso8583() {
    check_file("iso8583.json");
}

#[test]
fn test_runner_validation_structural_errors() {
    let cases = [
        serde_json::json!({ "type": "other", "version": "1.0.0", "tests": [] }),
        serde_json::json!({ "type": "emv-parser-test", "version": "1.0", "tests": [] }),
        serde_json::json!({ "type": "emv-parser-test", "version": "1.0.0", "tests": {} }),
        serde_json::json!({
            "type": "emv-parser-test",
            "version": "1.0.0",
            "tests": [{ "name": "Bad-Name", "type": "decode", "input": "", "expected": {} }]
        }),
        serde_json::json!({
            "type": "emv-parser-test",
            "version": "1.0.0",
            "tests": [
                { "name": "twice", "type": "render", "input": "", "expected_lines": [] },
                { "name": "twice", "type": "render", "input": "", "expected_lines": [] }
            ]
        }),
        serde_json::json!({
            "type": "emv-parser-test",
            "version": "1.0.0",
            "tests": [{ "name": "no_offset", "type": "decode_error", "input": "", "expected_error": "TruncatedValue" }]
        }),
        serde_json::json!({
            "type": "emv-parser-test",
            "version": "1.0.0",
            "tests": [{
                "name": "bad_option",
                "type": "decode",
                "input": "",
                "options": { "unknown": true },
                "expected": {}
            }]
        }),
        serde_json::json!({
            "type": "emv-parser-test",
            "version": "1.0.0",
            "tests": [{
                "name": "bad_kind",
                "type": "decode_error",
                "input": "",
                "expected_error": "Whatever",
                "expected_offset": 0
            }]
        }),
    ];
    for spec in &cases {
        let result = run_test_file_validated(spec);
        assert!(result.structural_error.is_some(), "accepted {}", spec);
    }
}

#[test]
fn test_runner_validation_must_fail() {
    // A well-formed file whose expectations are wrong must report failures.
    let spec = serde_json::json!({
        "type": "emv-parser-test",
        "version": "1.0.0",
        "tests": [
            {
                "name": "wrong_tag",
                "type": "decode",
                "input": "5A0112",
                "options": { "mode": "emv" },
                "expected": { "body": { "emv": [{ "tag": "5B" }] } }
            },
            {
                "name": "wrong_offset",
                "type": "decode_error",
                "input": "9F020600",
                "options": { "mode": "emv" },
                "expected_error": "TruncatedValue",
                "expected_offset": 0
            },
            {
                "name": "no_error",
                "type": "decode_error",
                "input": "5A0112",
                "options": { "mode": "emv" },
                "expected_error": "TruncatedValue",
                "expected_offset": 0
            }
        ]
    });
    let result = run_test_file_validated(&spec);
    assert!(result.structural_error.is_none());
    assert_eq!(result.passed, 0);
    assert_eq!(result.failed, 3);
}

#[test]
fn test_json_contains() {
    let actual = serde_json::json!({ "a": 1, "b": [1, 2], "c": { "d": "x", "e": true } });
    assert!(json_contains(&actual, &serde_json::json!({ "c": { "d": "x" } })));
    assert!(json_contains(&actual, &serde_json::json!({ "b": [1, 2] })));
    assert!(!json_contains(&actual, &serde_json::json!({ "b": [1] })));
    assert!(!json_contains(&actual, &serde_json::json!({ "z": 1 })));
}
