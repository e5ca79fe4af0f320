use super::candidate::CandidateRecord;
use super::GeneratorError;

/// Parse a generator reply into a candidate record.
///
/// The reply must contain a single JSON object, optionally wrapped in a
/// markdown code fence. Missing fields are fine; fields with the wrong shape
/// are a structural failure.
pub fn parse_candidate(reply: &str) -> Result<CandidateRecord, GeneratorError> {
    let json_str = extract_json_object(reply)?;

    let value: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| GeneratorError::JsonParsing(e.to_string()))?;

    serde_json::from_value(value).map_err(|e| GeneratorError::Schema(e.to_string()))
}

/// Locate the JSON object inside a generator reply.
fn extract_json_object(reply: &str) -> Result<&str, GeneratorError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(GeneratorError::MalformedResponse("Empty reply".into()));
    }

    let body = match trimmed.find("```") {
        Some(fence_start) => {
            let after_fence = &trimmed[fence_start + 3..];
            let content_start = after_fence.find('\n').map_or(0, |i| i + 1);
            let content = &after_fence[content_start..];
            let fence_end = content.find("```").ok_or_else(|| {
                GeneratorError::MalformedResponse("Unclosed code fence".into())
            })?;
            content[..fence_end].trim()
        }
        None => trimmed,
    };

    let start = body
        .find('{')
        .ok_or_else(|| GeneratorError::MalformedResponse("No JSON object found".into()))?;
    let end = body
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| GeneratorError::MalformedResponse("Unterminated JSON object".into()))?;

    Ok(&body[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_parses() {
        let record = parse_candidate(r#"{"intent": "refill_request", "risk_level": "low"}"#).unwrap();
        assert_eq!(record.intent.as_deref(), Some("refill_request"));
        assert_eq!(record.risk_level.as_deref(), Some("low"));
        assert!(record.pharmacist_task.is_none());
    }

    #[test]
    fn fenced_object_parses() {
        let reply = "Here you go:\n```json\n{\"intent\": \"side_effects\"}\n```\nThanks";
        let record = parse_candidate(reply).unwrap();
        assert_eq!(record.intent.as_deref(), Some("side_effects"));
    }

    #[test]
    fn fence_without_language_tag() {
        let reply = "```\n{\"key_facts\": [\"ran out\"]}\n```";
        let record = parse_candidate(reply).unwrap();
        assert_eq!(record.key_facts, Some(vec!["ran out".to_string()]));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let record = parse_candidate(r#"{"intent": "unknown", "agent_backend_used": "groq"}"#).unwrap();
        assert_eq!(record.intent.as_deref(), Some("unknown"));
    }

    #[test]
    fn empty_reply_is_malformed() {
        assert!(matches!(
            parse_candidate("   "),
            Err(GeneratorError::MalformedResponse(_))
        ));
    }

    #[test]
    fn prose_only_is_malformed() {
        assert!(matches!(
            parse_candidate("I cannot help with that."),
            Err(GeneratorError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unclosed_fence_is_malformed() {
        assert!(matches!(
            parse_candidate("```json\n{\"intent\": \"unknown\"}"),
            Err(GeneratorError::MalformedResponse(_))
        ));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(
            parse_candidate(r#"{"intent": "unknown",}"#),
            Err(GeneratorError::JsonParsing(_))
        ));
    }

    #[test]
    fn wrong_field_shape_is_schema_error() {
        assert!(matches!(
            parse_candidate(r#"{"key_facts": "not a list"}"#),
            Err(GeneratorError::Schema(_))
        ));
        assert!(matches!(
            parse_candidate(r#"{"pharmacist_task": "mtm_outreach"}"#),
            Err(GeneratorError::Schema(_))
        ));
        assert!(matches!(
            parse_candidate(r#"{"soap_note": {"plan": 42}}"#),
            Err(GeneratorError::Schema(_))
        ));
    }
}
