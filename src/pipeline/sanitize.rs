//! Response sanitizing: deterministic cleanup of VLM-generated JSON text.
//!
//! ## Why is sanitizing necessary?
//!
//! Even with `responseMimeType: application/json` set, vision models reading
//! scanned tables produce output that is *semantically right* but
//! *structurally invalid* — for example:
//!
//! - Wrapping the document in ` ```json ... ``` ` fences despite the prompt
//!   saying "output raw JSON"
//! - Prepending prose ("Here is the extracted data:") before the object
//! - Emitting description values with literal quotes transcribed straight
//!   off the page (`"description": "5" x 8" board"`)
//! - Leaving raw tab characters or lone backslashes inside string values
//!
//! This module applies three cheap, deterministic rules that fix those
//! quirks without touching content. Each rule is a pure function
//! (`&str → String`) and independently testable. The output is best-effort:
//! either valid JSON, or text that still fails to parse — the caller treats
//! that as a per-chunk parse failure, never a crash.
//!
//! ## Rule Order
//!
//! Fences must go before the brace-span isolation (a trailing fence sits
//! after the last `}`), and the span isolation before line repair so the
//! repair only ever sees candidate object lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all sanitizing rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip markdown code fences (models sometimes disobey the prompt)
/// 2. Isolate the first `{` through the last `}` inclusive
/// 3. Re-escape the value of every `"key": "value"[,]` line
pub fn sanitize_response(raw: &str) -> String {
    let s = strip_code_fences(raw);
    let s = isolate_object_span(&s);
    repair_string_lines(&s)
}

// ── Rule 1: Strip code fences ───────────────────────────────────────────────

fn strip_code_fences(input: &str) -> String {
    input
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

// ── Rule 2: Isolate the outermost object span ───────────────────────────────
//
// Models pad the object with prose on either side; everything outside the
// first `{` .. last `}` span is noise. When either brace is missing there is
// no span to take, so the text passes through unchanged and the parse stage
// reports it instead (the untouched text makes a far better debug artifact
// than an empty string).

fn isolate_object_span(input: &str) -> String {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start <= end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}

// ── Rule 3: Re-escape single key/value string lines ─────────────────────────
//
// The workhorse rule. Scanned-table transcriptions put inch marks, lone
// backslashes, and raw control characters inside string values, all of which
// break strict JSON parsing. For any line of the exact shape
//
//     "key": "value"[,]
//
// the value is taken as the *raw* text between the first value quote and the
// last quote on the line, and re-serialized as a proper JSON string literal.
// Raw means literal: an already-escaped `\"` inside the value is treated as
// backslash-plus-quote content and escaped again, which keeps the document
// parseable either way. Structural lines (braces, brackets, the `"items"`
// key) do not match the shape and pass through untouched.

static RE_STRING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(\s*"[^"]+"\s*:\s*)"(.*)"\s*(,?)\s*$"#).unwrap());

fn repair_string_lines(input: &str) -> String {
    input
        .lines()
        .map(repair_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn repair_line(line: &str) -> String {
    let Some(caps) = RE_STRING_LINE.captures(line) else {
        return line.to_string();
    };
    match serde_json::to_string(&caps[2]) {
        Ok(escaped) => format!("{}{}{}", &caps[1], escaped, &caps[3]),
        Err(_) => line.to_string(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let input = "```json\n{\"items\": []}\n```";
        assert_eq!(strip_code_fences(input), "{\"items\": []}");
    }

    #[test]
    fn strips_bare_fences_anywhere() {
        let input = "```\n{\"a\": 1}\n```\ntrailing";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}\n\ntrailing");
    }

    #[test]
    fn isolates_object_between_prose() {
        let input = "Here is the extracted data:\n{\"items\": []}\nLet me know!";
        assert_eq!(isolate_object_span(input), "{\"items\": []}");
    }

    #[test]
    fn missing_close_brace_passes_through() {
        let input = "{\"items\": [";
        assert_eq!(isolate_object_span(input), input);
    }

    #[test]
    fn no_braces_passes_through() {
        let input = "I could not read this document.";
        assert_eq!(isolate_object_span(input), input);
    }

    #[test]
    fn brace_after_close_brace_passes_through() {
        // No well-formed span exists when the only `{` follows the only `}`.
        let input = "} junk {";
        assert_eq!(isolate_object_span(input), input);
    }

    #[test]
    fn reescapes_embedded_quotes() {
        let line = r#"      "description": "5" x 8" board","#;
        let fixed = repair_line(line);
        assert_eq!(fixed, r#"      "description": "5\" x 8\" board","#);
    }

    #[test]
    fn reescapes_raw_tab() {
        let line = "\"description\": \"left\tright\"";
        let fixed = repair_line(line);
        assert_eq!(fixed, r#""description": "left\tright""#);
    }

    #[test]
    fn reescapes_lone_backslash() {
        let line = r#""description": "trim\molding","#;
        let fixed = repair_line(line);
        assert_eq!(fixed, r#""description": "trim\\molding","#);
    }

    #[test]
    fn clean_value_line_unchanged() {
        let line = r#"  "qty": "120.00","#;
        assert_eq!(repair_line(line), line);
    }

    #[test]
    fn structural_lines_unchanged() {
        for line in ["{", "}", "  \"items\": [", "  },", "  ]"] {
            assert_eq!(repair_line(line), line, "line {line:?} should pass through");
        }
    }

    #[test]
    fn embedded_quote_document_parses_after_repair() {
        let raw = concat!(
            "```json\n",
            "{\n",
            "  \"items\": [\n",
            "    {\n",
            "      \"description\": \"R&R 1/2\" drywall\",\n",
            "      \"qty\": \"8.00\"\n",
            "    }\n",
            "  ]\n",
            "}\n",
            "```"
        );
        let cleaned = sanitize_response(raw);
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(
            value["items"][0]["description"],
            serde_json::json!("R&R 1/2\" drywall")
        );
    }

    #[test]
    fn valid_document_survives_untouched_semantically() {
        let raw = "{\n  \"items\": [\n    {\"qty\": \"1.00\"}\n  ]\n}";
        let cleaned = sanitize_response(raw);
        let before: serde_json::Value = serde_json::from_str(raw).unwrap();
        let after: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn full_pipeline_fences_prose_and_quotes() {
        let raw = concat!(
            "Sure! Here is the table:\n",
            "```json\n",
            "{\n",
            "  \"items\": [\n",
            "    {\n",
            "      \"description\": \"6\" baseboard\",\n",
            "      \"total\": \"41.10\"\n",
            "    }\n",
            "  ]\n",
            "}\n",
            "```\n",
            "All 1 rows extracted."
        );
        let cleaned = sanitize_response(raw);
        assert!(cleaned.starts_with('{'), "got: {cleaned}");
        assert!(cleaned.ends_with('}'), "got: {cleaned}");
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["items"][0]["total"], serde_json::json!("41.10"));
    }
}
