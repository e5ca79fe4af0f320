//! Rule-based fallback classifier.
//!
//! Builds a complete candidate record from keyword rules alone. Used when no
//! generator is configured or the generator call failed. The orchestrator
//! passes the result through the same normalizer and sanitizer as generator
//! output.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::candidate::{DEFAULT_MEDICATION_ISSUE, DEFAULT_OBJECTIVE};
use super::types::{
    Intent, IntakeResult, MedicationIssue, PharmacistTask, Priority, Queue, RiskLevel,
    SafetyResult, SoapNote,
};
use crate::pipeline::safety::keywords::{
    has_adherence_language, has_appointment_language, has_discontinuation, has_refill_language,
    has_side_effect_language, red_flag_signals, symptom_mentions,
};
use crate::pipeline::safety::routing::default_next_step;
use crate::pipeline::safety::types::RedactionTag;

/// Transcripts shorter than this carry too little to call a question.
const MIN_QUESTION_WORDS: usize = 4;

pub const TAG_FALLBACK: &str = "fallback";
pub const TAG_REDACTED: &str = "redacted";

/// Common outpatient medications recognised in transcripts.
static MEDICATION_LEXICON: &[&str] = &[
    "metformin", "insulin", "glipizide", "lisinopril", "losartan", "amlodipine",
    "metoprolol", "hydrochlorothiazide", "atorvastatin", "simvastatin", "rosuvastatin",
    "statin", "levothyroxine", "omeprazole", "warfarin", "apixaban", "aspirin", "ibuprofen",
    "sertraline", "gabapentin", "albuterol", "prednisone", "amoxicillin",
];

static MEDICATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = MEDICATION_LEXICON.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("Invalid medication regex pattern")
});

/// Fixed per-intent task and documentation template.
struct IntentTemplate {
    queue: Queue,
    priority: Priority,
    due_in_hours: u32,
    summary: &'static str,
    assessment: &'static str,
    plan: &'static str,
    reply: &'static str,
}

fn template_for(intent: Intent) -> IntentTemplate {
    match intent {
        Intent::AdherenceIssue => IntentTemplate {
            queue: Queue::MtmOutreach,
            priority: Priority::High,
            due_in_hours: 24,
            summary: "Adherence concern reported by patient (automated triage).",
            assessment: "Possible medication adherence barrier; needs pharmacist review.",
            plan: "Pharmacist outreach to review medication use and adherence barriers.",
            reply: "Thanks for letting us know. A pharmacist will review your message and \
                    follow up with you.",
        },
        Intent::SideEffects => IntentTemplate {
            queue: Queue::SideEffectFollowup,
            priority: Priority::High,
            due_in_hours: 24,
            summary: "Possible medication side effect reported (automated triage).",
            assessment: "Patient-reported symptoms possibly related to medication; needs \
                         pharmacist review.",
            plan: "Pharmacist follow-up to review reported symptoms and current medications.",
            reply: "Thanks for letting us know. A pharmacist will review what you described \
                    and follow up with you.",
        },
        Intent::RefillRequest => IntentTemplate {
            queue: Queue::RefillRequest,
            priority: Priority::Normal,
            due_in_hours: 48,
            summary: "Refill request (automated triage).",
            assessment: "Administrative refill request.",
            plan: "Pharmacist to review refill eligibility and prescription status.",
            reply: "Thanks, we received your refill request. A pharmacist will review it and \
                    follow up with you.",
        },
        Intent::AppointmentRequest => IntentTemplate {
            queue: Queue::AppointmentScheduling,
            priority: Priority::Normal,
            due_in_hours: 72,
            summary: "Appointment request (automated triage).",
            assessment: "Administrative scheduling request.",
            plan: "Schedule a pharmacist consultation.",
            reply: "Thanks, we received your scheduling request. A pharmacist will reach out \
                    to confirm a time.",
        },
        Intent::GeneralQuestion | Intent::Unknown => IntentTemplate {
            queue: Queue::MtmOutreach,
            priority: Priority::Normal,
            due_in_hours: 72,
            summary: "Pharmacist follow-up needed (automated triage).",
            assessment: "Needs pharmacist review (automated triage).",
            plan: "Pharmacist follow-up to clarify medication details, timing, and barriers.",
            reply: "Thanks for sharing that. A pharmacist will review your message and follow \
                    up with you.",
        },
    }
}

const RED_FLAG_ASSESSMENT: &str =
    "Patient reports red-flag symptoms; requires immediate pharmacist escalation.";
const RED_FLAG_REPLY: &str =
    "Thanks for letting us know. A pharmacist has been alerted and will contact you shortly.";

/// Intent by keyword ladder: adherence > side effects > refill > appointment
/// > general question (or unknown for very short messages).
pub fn classify_intent(redacted_transcript: &str) -> Intent {
    let text = redacted_transcript.trim();
    if has_adherence_language(text) {
        Intent::AdherenceIssue
    } else if has_side_effect_language(text) {
        Intent::SideEffects
    } else if has_refill_language(text) {
        Intent::RefillRequest
    } else if has_appointment_language(text) {
        Intent::AppointmentRequest
    } else if text.split_whitespace().count() < MIN_QUESTION_WORDS {
        Intent::Unknown
    } else {
        Intent::GeneralQuestion
    }
}

pub fn classify_risk(redacted_transcript: &str, intent: Intent) -> RiskLevel {
    if !red_flag_signals(redacted_transcript).is_empty() {
        RiskLevel::High
    } else if intent.needs_prompt_followup() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Medications from the lexicon, each paired with the issue reported.
pub fn medication_mentions(redacted_transcript: &str) -> Vec<MedicationIssue> {
    let issue = symptom_mentions(redacted_transcript)
        .first()
        .map(|s| s.to_string())
        .or_else(|| {
            has_discontinuation(redacted_transcript).then(|| "stopped or skipped doses".to_string())
        })
        .unwrap_or_else(|| DEFAULT_MEDICATION_ISSUE.to_string());

    let mut seen = BTreeSet::new();
    MEDICATION_PATTERN
        .find_iter(redacted_transcript)
        .map(|m| m.as_str().to_lowercase())
        .filter(|name| seen.insert(name.clone()))
        .map(|name| MedicationIssue {
            name,
            issue: issue.clone(),
        })
        .collect()
}

fn key_facts(redacted_transcript: &str, red_flags: &[String]) -> Vec<String> {
    let mut facts = Vec::new();
    if !redacted_transcript.is_empty() {
        facts.push(redacted_transcript.to_string());
    }
    for signal in red_flags {
        facts.push(format!("Red-flag symptom reported: {signal}"));
    }
    for symptom in symptom_mentions(redacted_transcript) {
        facts.push(format!("Symptom mentioned: {symptom}"));
    }
    if has_discontinuation(redacted_transcript) {
        facts.push("Patient reports stopping or skipping a medication".to_string());
    }
    facts
}

/// Build a candidate record from keyword rules over the redacted transcript.
pub fn classify(redacted_transcript: &str, redaction_tags: &BTreeSet<RedactionTag>) -> IntakeResult {
    let text = redacted_transcript.trim();
    let intent = classify_intent(text);
    let risk_level = classify_risk(text, intent);
    let red_flags = red_flag_signals(text);
    let template = template_for(intent);

    let (assessment, reply) = if red_flags.is_empty() {
        (template.assessment, template.reply)
    } else {
        (RED_FLAG_ASSESSMENT, RED_FLAG_REPLY)
    };

    let mut task = PharmacistTask {
        queue: template.queue,
        priority: template.priority,
        due_in_hours: template.due_in_hours,
        summary: template.summary.to_string(),
        tags: BTreeSet::new(),
    };
    task.add_tag(TAG_FALLBACK);
    task.add_tag(intent.as_str());
    if !redaction_tags.is_empty() {
        task.add_tag(TAG_REDACTED);
    }

    tracing::info!(
        intent = intent.as_str(),
        risk_level = ?risk_level,
        queue = %task.queue,
        "Fallback classifier produced candidate"
    );

    IntakeResult {
        intent,
        risk_level,
        key_facts: key_facts(text, &red_flags),
        medications: medication_mentions(text),
        recommended_next_step: default_next_step(task.queue).to_string(),
        safe_patient_reply: reply.to_string(),
        soap_note: SoapNote {
            subjective: if text.is_empty() {
                "Patient left a message requesting assistance.".to_string()
            } else {
                text.to_string()
            },
            objective: DEFAULT_OBJECTIVE.to_string(),
            assessment: assessment.to_string(),
            plan: template.plan.to_string(),
        },
        pharmacist_task: task,
        safety: SafetyResult::default(),
    }
}
