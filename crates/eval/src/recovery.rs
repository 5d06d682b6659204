//! Structured-output recovery: extract a [`Decision`] from provider text.
//!
//! The text is treated as untrusted. A structured block is located by brace
//! position, closed if truncated, parsed, trimmed of trailing content if
//! needed, and normalized onto the fixed [`Decision`] shape. When nothing
//! parses, a keyword scan of the raw text produces a LOW-confidence
//! decision. [`recover`] never fails.

use serde_json::{Map, Value};

use arbiter_core::{ConfidenceLevel, Decision, Recommendation, RecoveryPath};

/// Placeholder for text fields the provider left out.
pub const MISSING_TEXT: &str = "Not provided";

/// Justification used whenever keyword scanning replaced a parse.
pub const HEURISTIC_JUSTIFICATION: &str = "Parsing error - manual review recommended";

/// Upper bound on member cuts tried while repairing a truncated block.
const MAX_REPAIR_CUTS: usize = 16;

/// Leading raw text kept as the assessment of a heuristic decision.
const ASSESSMENT_PREVIEW_CHARS: usize = 500;

const REASONING_KEYS: &[&str] = &[
    "reasoning_chain",
    "reasoning",
    "reasoning_steps",
    "chain_of_thought",
    "analysis",
];
const ASSESSMENT_KEYS: &[&str] = &[
    "performance_assessment",
    "assessment",
    "performance_summary",
    "summary",
];
const RISK_KEYS: &[&str] = &["risk_factors", "risks", "key_risks"];
const STRENGTH_KEYS: &[&str] = &["strengths", "key_strengths", "positives"];
const RECOMMENDATION_KEYS: &[&str] = &["recommendation", "decision", "action"];
const CONFIDENCE_KEYS: &[&str] = &["confidence_level", "confidence"];
const JUSTIFICATION_KEYS: &[&str] = &["justification", "rationale", "reason"];
const ALTERNATIVE_KEYS: &[&str] = &[
    "alternative_consideration",
    "alternatives",
    "alternative",
];

/// Recover a fully populated decision from raw provider text.
pub fn recover(raw: &str) -> Decision {
    match extract(raw) {
        Some(parsed) => {
            tracing::debug!(
                path = ?parsed.path,
                depth = parsed.open_depth,
                "structured block recovered"
            );
            normalize(&parsed.object, parsed.path, parsed.open_depth > 1)
        }
        None => {
            tracing::debug!("no structured block recovered, scanning keywords");
            heuristic(raw)
        }
    }
}

struct Parsed {
    object: Map<String, Value>,
    path: RecoveryPath,
    /// Containers still open where the text was cut off. Zero unless repaired.
    open_depth: usize,
}

fn extract(raw: &str) -> Option<Parsed> {
    let start = raw.find('{')?;
    let tail = &raw[start..];

    match raw.rfind('}').filter(|&end| end > start) {
        Some(end) => {
            let block = &raw[start..=end];
            match serde_json::from_str::<Value>(block) {
                Ok(Value::Object(object)) => Some(Parsed {
                    object,
                    path: RecoveryPath::Parsed,
                    open_depth: 0,
                }),
                Ok(_) => None,
                // A closed block that still ends early was cut inside a
                // nested structure. Any other syntax error is malformed
                // content, not truncation, and is never patched up.
                Err(err) if err.is_eof() => repair(tail),
                Err(_) => first_value(block),
            }
        }
        None => repair(tail),
    }
}

/// Parse the leading value of `text` and ignore whatever follows it.
fn first_value(text: &str) -> Option<Parsed> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(object))) => Some(Parsed {
            object,
            path: RecoveryPath::TrimmedTrailing,
            open_depth: 0,
        }),
        _ => None,
    }
}

/// Lexical state at the end of a (possibly truncated) block.
#[derive(Debug, Default)]
struct Scan {
    in_string: bool,
    escape_pending: bool,
    /// Closers owed, innermost last.
    closers: Vec<char>,
    /// Byte offsets of member separators outside strings.
    separators: Vec<usize>,
}

fn scan(text: &str) -> Scan {
    let mut s = Scan::default();
    for (idx, c) in text.char_indices() {
        if s.in_string {
            if s.escape_pending {
                s.escape_pending = false;
            } else if c == '\\' {
                s.escape_pending = true;
            } else if c == '"' {
                s.in_string = false;
            }
            continue;
        }
        match c {
            '"' => s.in_string = true,
            '{' => s.closers.push('}'),
            '[' => s.closers.push(']'),
            '}' | ']' => {
                s.closers.pop();
            }
            ',' => s.separators.push(idx),
            _ => {}
        }
    }
    s
}

/// Close a truncated block and parse it.
///
/// The cut-off text is closed as-is first: an open string is terminated,
/// trailing separators dropped and the owed closers appended in nesting
/// order. If that does not parse, the last partial member is cut at the
/// preceding separator and the attempt repeats.
fn repair(block: &str) -> Option<Parsed> {
    let open_depth = scan(block).closers.len();
    let mut end = block.len();

    for _ in 0..MAX_REPAIR_CUTS {
        let prefix = &block[..end];
        let state = scan(prefix);
        let mut fixed = String::with_capacity(prefix.len() + state.closers.len() + 1);

        if state.in_string {
            let body = if state.escape_pending {
                &prefix[..prefix.len() - 1]
            } else {
                prefix
            };
            // Raw control characters are not allowed inside a JSON string.
            fixed.push_str(body.trim_end());
            fixed.push('"');
        } else {
            fixed.push_str(prefix.trim_end().trim_end_matches([',', ':']).trim_end());
        }
        fixed.extend(state.closers.iter().rev());

        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&fixed) {
            return Some(Parsed {
                object,
                path: RecoveryPath::Repaired,
                open_depth,
            });
        }
        end = *state.separators.last()?;
    }
    None
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        other => value_text(other).into_iter().collect(),
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    lookup(object, keys)
        .and_then(value_text)
        .unwrap_or_else(|| MISSING_TEXT.to_string())
}

fn list_field(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let items = lookup(object, keys).map(value_list).unwrap_or_default();
    if items.is_empty() {
        vec![MISSING_TEXT.to_string()]
    } else {
        items
    }
}

fn normalize(object: &Map<String, Value>, path: RecoveryPath, ambiguous: bool) -> Decision {
    let recommendation = lookup(object, RECOMMENDATION_KEYS)
        .and_then(Value::as_str)
        .and_then(Recommendation::find_keyword)
        .unwrap_or(Recommendation::Monitor);

    let confidence_level = if ambiguous {
        ConfidenceLevel::Low
    } else {
        lookup(object, CONFIDENCE_KEYS)
            .and_then(Value::as_str)
            .and_then(ConfidenceLevel::find_keyword)
            .unwrap_or(ConfidenceLevel::Medium)
    };

    let data_completeness = object
        .get("data_completeness")
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .map(|f| f.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    Decision {
        reasoning_chain: list_field(object, REASONING_KEYS),
        performance_assessment: text_field(object, ASSESSMENT_KEYS),
        risk_factors: list_field(object, RISK_KEYS),
        strengths: list_field(object, STRENGTH_KEYS),
        recommendation,
        confidence_level,
        justification: text_field(object, JUSTIFICATION_KEYS),
        alternative_consideration: text_field(object, ALTERNATIVE_KEYS),
        data_completeness,
        recovery: path,
    }
}

fn heuristic(raw: &str) -> Decision {
    let preview: String = raw.trim().chars().take(ASSESSMENT_PREVIEW_CHARS).collect();
    let unable = "Unable to extract - see raw response".to_string();
    Decision {
        reasoning_chain: vec![
            "Response could not be parsed as structured output - see raw response".to_string(),
        ],
        performance_assessment: if preview.is_empty() {
            "Provider returned no text".to_string()
        } else {
            preview
        },
        risk_factors: vec![unable.clone()],
        strengths: vec![unable],
        recommendation: Recommendation::find_keyword(raw).unwrap_or(Recommendation::Monitor),
        confidence_level: ConfidenceLevel::Low,
        justification: HEURISTIC_JUSTIFICATION.to_string(),
        alternative_consideration: "Review raw response for details".to_string(),
        data_completeness: 0.0,
        recovery: RecoveryPath::Heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "reasoning_chain": ["Step 1: KPIs mostly met", "Step 2: one open incident"],
        "performance_assessment": "Solid delivery with minor gaps",
        "risk_factors": ["Open P2 incident"],
        "strengths": ["Fast response times"],
        "recommendation": "renegotiate",
        "confidence_level": "high",
        "justification": "Pricing is above market",
        "alternative_consideration": "Renew if pricing drops"
    }"#;

    #[test]
    fn valid_block_keeps_enumerations() {
        let d = recover(FULL);
        assert_eq!(d.recommendation, Recommendation::Renegotiate);
        assert_eq!(d.confidence_level, ConfidenceLevel::High);
        assert_eq!(d.recovery, RecoveryPath::Parsed);
        assert_eq!(d.reasoning_chain.len(), 2);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn code_fences_and_preamble_are_ignored() {
        let text = format!("Here is my evaluation:\n```json\n{}\n```\nThanks.", FULL);
        let d = recover(&text);
        assert_eq!(d.recovery, RecoveryPath::Parsed);
        assert_eq!(d.justification, "Pricing is above market");
    }

    #[test]
    fn truncated_mid_string_recovers() {
        let d = recover(
            r#"{"recommendation": "MONITOR", "confidence_level": "HIGH", "justification": "ok"#,
        );
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert_eq!(d.confidence_level, ConfidenceLevel::High);
        assert_eq!(d.justification, "ok");
        assert_eq!(d.recovery, RecoveryPath::Repaired);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn truncated_string_with_trailing_newline_keeps_text() {
        let d = recover(
            "```json\n{\"recommendation\": \"RENEW\", \"justification\": \"budget is under\n",
        );
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.justification, "budget is under");
        assert_eq!(d.recovery, RecoveryPath::Repaired);
    }

    #[test]
    fn truncated_mid_array_is_low_confidence() {
        let d = recover(concat!(
            r#"{"recommendation": "RENEW", "confidence_level": "HIGH", "#,
            r#""risk_factors": ["late invoices", "staff tur"#,
        ));
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert_eq!(d.risk_factors, vec!["late invoices", "staff tur"]);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn dangling_key_is_cut() {
        let d = recover(r#"{"recommendation": "TERMINATE", "confidence_level": "MEDIUM", "justif"#);
        assert_eq!(d.recommendation, Recommendation::Terminate);
        assert_eq!(d.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(d.justification, MISSING_TEXT);
        assert_eq!(d.recovery, RecoveryPath::Repaired);
    }

    #[test]
    fn dangling_colon_and_escape_are_dropped() {
        let d = recover(r#"{"recommendation": "RENEW", "justification": "said \"#);
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.justification, "said");

        let d = recover(r#"{"recommendation": "RENEW", "strengths":"#);
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.strengths, vec![MISSING_TEXT]);
    }

    #[test]
    fn truncation_after_closed_nested_object() {
        let d =
            recover(r#"{"meta": {"model": "x"}, "recommendation": "RENEW", "justification": "cut"#);
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.justification, "cut");
        assert_eq!(d.recovery, RecoveryPath::Repaired);
    }

    #[test]
    fn trailing_content_is_discarded() {
        let text =
            r#"{"recommendation": "TERMINATE", "confidence_level": "LOW"} and also {"note": "x"}"#;
        let d = recover(text);
        assert_eq!(d.recommendation, Recommendation::Terminate);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert_eq!(d.recovery, RecoveryPath::TrimmedTrailing);
    }

    #[test]
    fn no_brace_scans_keywords_by_priority() {
        let d = recover("...vendor should be TERMINATE due to repeated failures...");
        assert_eq!(d.recommendation, Recommendation::Terminate);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert_eq!(d.recovery, RecoveryPath::Heuristic);
        assert_eq!(d.justification, HEURISTIC_JUSTIFICATION);

        let d = recover("we could renew, or renegotiate the rate card");
        assert_eq!(d.recommendation, Recommendation::Renegotiate);

        let d = recover("no clear call here");
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn empty_text_is_still_populated() {
        let d = recover("");
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn unparseable_block_falls_back_to_keywords() {
        let d = recover("{ this is not json at all, RENEW it }");
        assert_eq!(d.recovery, RecoveryPath::Heuristic);
        assert_eq!(d.recommendation, Recommendation::Renew);
    }

    #[test]
    fn closed_but_malformed_block_is_not_patched() {
        let d = recover(concat!(
            r#"{"recommendation": "RENEW", "confidence_level": "HIGH", "#,
            r#""risk_factors": ["a", "b"], "justification": "Vendor must "TERMINATE" now"}"#,
        ));
        assert_eq!(d.recovery, RecoveryPath::Heuristic);
        assert_eq!(d.recommendation, Recommendation::Terminate);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert_eq!(d.justification, HEURISTIC_JUSTIFICATION);

        let d = recover(concat!(
            r#"{"recommendation": "RENEW", "confidence_level": "HIGH", "#,
            r#""justification": "ok" "alternative_consideration": "none"}"#,
        ));
        assert_eq!(d.recovery, RecoveryPath::Heuristic);
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);

        let d = recover(r#"{'recommendation': 'TERMINATE', 'confidence_level': 'HIGH'}"#);
        assert_eq!(d.recovery, RecoveryPath::Heuristic);
        assert_eq!(d.recommendation, Recommendation::Terminate);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn synonyms_and_bare_strings_are_normalized() {
        let d = recover(
            r#"{"reasoning": "One long paragraph", "risks": "Key person dependency",
                "decision": "We recommend to Renew", "confidence": "medium-high",
                "rationale": "Good value"}"#,
        );
        assert_eq!(d.reasoning_chain, vec!["One long paragraph"]);
        assert_eq!(d.risk_factors, vec!["Key person dependency"]);
        assert_eq!(d.recommendation, Recommendation::Renew);
        assert_eq!(d.confidence_level, ConfidenceLevel::High);
        assert_eq!(d.justification, "Good value");
        assert_eq!(d.strengths, vec![MISSING_TEXT]);
    }

    #[test]
    fn unknown_enumerations_take_defaults() {
        let d = recover(r#"{"recommendation": "extend", "confidence_level": 0.8}"#);
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert_eq!(d.confidence_level, ConfidenceLevel::Medium);
        assert!(d.is_fully_populated());
    }

    #[test]
    fn heuristic_preview_is_bounded() {
        let text = "x".repeat(2000);
        let d = recover(&text);
        assert_eq!(d.performance_assessment.chars().count(), ASSESSMENT_PREVIEW_CHARS);
    }

    #[test]
    fn arbitrary_inputs_never_leave_fields_empty() {
        let inputs = [
            "{",
            "}",
            "}{",
            "{\"",
            "{\"a\":[[[[",
            "{\"recommendation\": [\"TERMINATE\"]}",
            "{\"reasoning_chain\": [null, 3, {\"x\": 1}]}",
            "{\"a\": \"\\u12",
            "[1, 2, 3]",
            "{\"a\": tru",
            "{\"a\": -",
        ];
        for input in inputs {
            let d = recover(input);
            assert!(d.is_fully_populated(), "not populated for {input:?}: {d:?}");
        }
    }
}
