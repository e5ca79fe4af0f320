//! Patient-reply sanitizer.
//!
//! Total over every (reply, risk tier, symptom) combination:
//! 1. empty reply      -> operational acknowledgement
//! 2. clinical advice  -> reply discarded, risk-tier template substituted
//! 3. otherwise        -> reply kept, missing safety language appended
//!
//! The appended sentences contain the wording the check looks for, so a
//! second pass never changes the text.

use crate::pipeline::intake::types::RiskLevel;

use super::keywords::scan_advice;
use super::types::{ReplyOutcome, SanitizedReply};

/// Used when the generator produced no reply at all.
pub const ACKNOWLEDGEMENT_REPLY: &str =
    "Thanks for your message. A pharmacist will review it and follow up with you soon.";

/// Replaces an advice-bearing reply when the risk tier is high.
pub const HIGH_RISK_REPLY: &str =
    "Thanks for letting us know. Based on what you described, please call 911 or go to the \
     nearest emergency room now. A pharmacist has also been alerted and will follow up with you.";

/// Replaces an advice-bearing reply when the risk tier is low or medium.
pub const OPERATIONAL_REPLY: &str =
    "Thanks for your message. A pharmacist will review your request and follow up with you.";

/// Appended to high-risk replies that lack emergency wording.
pub const EMERGENCY_SENTENCE: &str =
    "If you are having a medical emergency, call 911 or go to the nearest emergency room now.";

/// Appended to symptomatic replies that lack urgent-care wording.
pub const URGENT_CARE_SENTENCE: &str =
    "If your symptoms get worse or you feel unsafe, please seek urgent care.";

/// Sanitize a candidate patient-facing reply.
pub fn sanitize_reply(candidate: &str, risk: RiskLevel, has_symptoms: bool) -> SanitizedReply {
    let trimmed = candidate.trim();

    if trimmed.is_empty() {
        let text = append_safety_language(ACKNOWLEDGEMENT_REPLY, risk, has_symptoms);
        log_reply_outcome(ReplyOutcome::EmptyReplaced, 0);
        return SanitizedReply {
            text,
            outcome: ReplyOutcome::EmptyReplaced,
            advice_matches: Vec::new(),
        };
    }

    let advice_matches = scan_advice(trimmed);
    if !advice_matches.is_empty() {
        let template = if risk == RiskLevel::High {
            HIGH_RISK_REPLY
        } else {
            OPERATIONAL_REPLY
        };
        let text = append_safety_language(template, risk, has_symptoms);
        log_reply_outcome(ReplyOutcome::AdviceReplaced, advice_matches.len());
        return SanitizedReply {
            text,
            outcome: ReplyOutcome::AdviceReplaced,
            advice_matches,
        };
    }

    let text = append_safety_language(trimmed, risk, has_symptoms);
    let outcome = if text == trimmed {
        ReplyOutcome::Passed
    } else {
        ReplyOutcome::SafetyAppended
    };
    log_reply_outcome(outcome, 0);
    SanitizedReply {
        text,
        outcome,
        advice_matches: Vec::new(),
    }
}

/// Wording that counts as an emergency-service instruction. A bare mention
/// of "emergency" ("this is not an emergency") does not.
const EMERGENCY_INSTRUCTIONS: [&str; 4] = [
    "911",
    "emergency room",
    "emergency services",
    "emergency department",
];

/// Append the sentence the risk tier requires, if the text lacks it.
fn append_safety_language(text: &str, risk: RiskLevel, has_symptoms: bool) -> String {
    let lower = text.to_lowercase();
    let has_emergency = EMERGENCY_INSTRUCTIONS.iter().any(|w| lower.contains(w));
    let has_urgent_care = lower.contains("urgent care");

    let sentence = match risk {
        RiskLevel::High if !has_emergency && !has_urgent_care => Some(EMERGENCY_SENTENCE),
        RiskLevel::High => None,
        _ if has_symptoms && !has_urgent_care => Some(URGENT_CARE_SENTENCE),
        _ => None,
    };

    match sentence {
        Some(sentence) => format!("{} {sentence}", text.trim_end()),
        None => text.to_string(),
    }
}

/// Log the sanitizer decision WITHOUT reply text.
fn log_reply_outcome(outcome: ReplyOutcome, advice_count: usize) {
    match outcome {
        ReplyOutcome::AdviceReplaced => tracing::warn!(
            outcome = "advice_replaced",
            advice_count,
            "Reply sanitizer: clinical advice discarded"
        ),
        ReplyOutcome::EmptyReplaced => tracing::info!(
            outcome = "empty_replaced",
            "Reply sanitizer: empty reply replaced"
        ),
        ReplyOutcome::SafetyAppended => tracing::info!(
            outcome = "safety_appended",
            "Reply sanitizer: safety language appended"
        ),
        ReplyOutcome::Passed => tracing::debug!(outcome = "passed", "Reply sanitizer: clean pass"),
    }
}
