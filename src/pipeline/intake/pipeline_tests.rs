// End-to-end tests for the intake pipeline.
// These drive the FULL chain: redact → mock generator / fallback → normalize
// → sanitize → validate, and check that the generator path and the fallback
// path land on the same safety guarantees.

use std::sync::{Arc, Mutex};

use super::llm::{LlmClient, MockLlmClient};
use super::orchestrator::IntakePipeline;
use super::types::{BackendUsed, Intent, IntakeOutcome, Priority, Queue, RiskLevel};
use super::GeneratorError;
use crate::pipeline::safety::keywords::contains_advice;
use crate::pipeline::safety::types::RedactionTag;

/// Generator that records every user prompt it receives.
struct RecordingClient {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl LlmClient for RecordingClient {
    fn complete(&self, _system: &str, user: &str) -> Result<String, GeneratorError> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(self.reply.clone())
    }

    fn backend_name(&self) -> &str {
        "recording"
    }
}

fn with_generator(reply: &str) -> IntakePipeline {
    IntakePipeline::new(Box::new(MockLlmClient::new(reply)))
}

/// Generator reply that under-reports everything.
fn complacent_reply() -> String {
    r#"```json
{
  "intent": "general_question",
  "risk_level": "low",
  "key_facts": ["patient called"],
  "medications": [],
  "recommended_next_step": "Call back next week.",
  "safe_patient_reply": "Thanks! A pharmacist will call you back next week.",
  "soap_note": {"subjective": "Patient called.", "objective": "N/A", "assessment": "Routine.", "plan": "Call back."},
  "pharmacist_task": {"queue": "mtm_outreach", "priority": "low", "due_in_hours": 120, "summary": "Routine call", "tags": ["routine"]}
}
```"#
    .to_string()
}

/// Generator reply that escalates and gives clinical advice.
fn overeager_reply() -> String {
    r#"{
  "intent": "side_effects",
  "risk_level": "high",
  "key_facts": ["dizziness"],
  "medications": [{"name": "metformin", "issue": "dizziness"}],
  "recommended_next_step": "Escalate.",
  "safe_patient_reply": "You should stop taking the metformin and switch to a different medication.",
  "soap_note": {"subjective": "Dizzy.", "objective": "N/A", "assessment": "Side effect.", "plan": "Escalate."},
  "pharmacist_task": {"queue": "urgent_escalation", "priority": "urgent", "due_in_hours": 1, "summary": "Dizziness", "tags": []}
}"#
    .to_string()
}

fn both_paths(transcript: &str, reply: &str) -> [IntakeOutcome; 2] {
    [
        with_generator(reply).analyze(transcript).unwrap(),
        IntakePipeline::fallback_only().analyze(transcript).unwrap(),
    ]
}

// =================================================================
// RED FLAGS
// =================================================================

#[test]
fn chest_pain_escalates_on_both_paths() {
    let transcript = "I'm having chest pain and trouble breathing";
    for outcome in both_paths(transcript, &complacent_reply()) {
        let r = &outcome.result;
        assert_eq!(r.risk_level, RiskLevel::High, "{:?}", outcome.backend);
        assert_eq!(r.pharmacist_task.queue, Queue::UrgentEscalation);
        assert_eq!(r.pharmacist_task.priority, Priority::Urgent);
        assert_eq!(r.pharmacist_task.due_in_hours, 1);
        assert!(r.pharmacist_task.tags.contains("red_flag"));
        assert!(r.safe_patient_reply.to_lowercase().contains("emergency"));
        assert!(r.safety.red_flag_detected);
        assert!(r.safety.red_flag_signals.contains(&"chest pain".to_string()));
    }
}

#[test]
fn generator_keeps_its_next_step_on_red_flag() {
    let outcome = with_generator(&complacent_reply())
        .analyze("I passed out this morning")
        .unwrap();
    assert_eq!(outcome.result.recommended_next_step, "Call back next week.");
    assert_eq!(outcome.result.pharmacist_task.queue, Queue::UrgentEscalation);
}

// =================================================================
// SIDE EFFECTS + ADHERENCE
// =================================================================

#[test]
fn metformin_dizzy_routes_to_side_effect_followup() {
    let transcript = "I stopped taking my metformin because it makes me dizzy";
    for outcome in both_paths(transcript, &complacent_reply()) {
        let r = &outcome.result;
        assert!(!r.safety.red_flag_detected);
        assert_eq!(r.pharmacist_task.queue, Queue::SideEffectFollowup, "{:?}", outcome.backend);
        assert_eq!(r.pharmacist_task.priority, Priority::High);
        assert!(r.pharmacist_task.due_in_hours <= 24);
        assert!(r.pharmacist_task.tags.contains("side_effects"));
        assert!(r.pharmacist_task.tags.contains("adherence"));
        assert_eq!(r.risk_level, RiskLevel::Medium);
        assert!(r.safe_patient_reply.to_lowercase().contains("urgent care"));
    }
}

#[test]
fn complacent_generator_is_reclassified() {
    let outcome = with_generator(&complacent_reply())
        .analyze("I stopped taking my metformin because it makes me dizzy")
        .unwrap();
    assert_eq!(outcome.result.intent, Intent::SideEffects);
    assert_eq!(outcome.result.pharmacist_task.due_in_hours, 24);
    assert!(outcome.result.pharmacist_task.tags.contains("routine"));
}

#[test]
fn overeager_generator_is_downgraded_and_sanitized() {
    let outcome = with_generator(&overeager_reply())
        .analyze("the metformin makes me dizzy")
        .unwrap();
    let r = &outcome.result;
    assert_eq!(outcome.backend, BackendUsed::Generator("mock".into()));
    assert_eq!(r.pharmacist_task.queue, Queue::SideEffectFollowup);
    assert_eq!(r.pharmacist_task.priority, Priority::High);
    assert_eq!(r.pharmacist_task.due_in_hours, 24);
    assert_eq!(r.risk_level, RiskLevel::Medium);
    assert!(r.safety.advice_violation);
    assert!(!contains_advice(&r.safe_patient_reply));
    assert!(!r.safe_patient_reply.contains("metformin"));
}

// =================================================================
// ADMINISTRATIVE CONTACTS
// =================================================================

#[test]
fn refill_gets_no_urgent_care_language() {
    let outcome = IntakePipeline::fallback_only()
        .analyze("Hi, I need a refill of my lisinopril, I ran out yesterday")
        .unwrap();
    let r = &outcome.result;
    assert_eq!(r.intent, Intent::RefillRequest);
    assert_eq!(r.risk_level, RiskLevel::Low);
    assert!(!r.safe_patient_reply.to_lowercase().contains("urgent care"));
    assert!(!r.safety.advice_violation);
}

#[test]
fn embedded_words_are_not_symptoms() {
    let transcript = "I'm retired and I need a refill of my lisinopril";
    for outcome in both_paths(transcript, &complacent_reply()) {
        let r = &outcome.result;
        assert!(!r.safety.red_flag_detected);
        assert_ne!(r.pharmacist_task.queue, Queue::SideEffectFollowup, "{:?}", outcome.backend);
        assert!(!r.safe_patient_reply.to_lowercase().contains("urgent care"));
    }
    let outcome = IntakePipeline::fallback_only().analyze(transcript).unwrap();
    assert_eq!(outcome.result.intent, Intent::RefillRequest);
    assert_eq!(outcome.result.pharmacist_task.queue, Queue::RefillRequest);
}

#[test]
fn generator_high_risk_on_refill_is_lowered() {
    let reply = r#"{"intent": "refill_request", "risk_level": "high",
        "pharmacist_task": {"queue": "refill_request", "priority": "normal", "due_in_hours": 48}}"#;
    let outcome = with_generator(reply)
        .analyze("I need a refill of my lisinopril")
        .unwrap();
    let r = &outcome.result;
    assert_eq!(outcome.backend, BackendUsed::Generator("mock".into()));
    assert_eq!(r.risk_level, RiskLevel::Medium);
    assert!(!r.safety.red_flag_detected);
    assert!(!r.safe_patient_reply.contains("911"));
    assert!(!r.safe_patient_reply.to_lowercase().contains("emergency"));
}

#[test]
fn empty_transcript_fallback_defaults() {
    let outcome = IntakePipeline::fallback_only().analyze("   ").unwrap();
    let r = &outcome.result;
    assert_eq!(r.intent, Intent::Unknown);
    assert_eq!(r.risk_level, RiskLevel::Low);
    assert_eq!(r.pharmacist_task.queue, Queue::MtmOutreach);
    assert!(!r.safe_patient_reply.trim().is_empty());
    assert!(outcome.redaction_tags.is_empty());
}

// =================================================================
// REDACTION BOUNDARY
// =================================================================

#[test]
fn generator_only_sees_redacted_text() {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let pipeline = IntakePipeline::new(Box::new(RecordingClient {
        reply: complacent_reply(),
        prompts: Arc::clone(&prompts),
    }));

    let outcome = pipeline
        .analyze("My name is Maria Lopez, DOB 01/02/1980, email maria@example.com. I need a refill.")
        .unwrap();

    let sent = prompts.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].contains("Maria"));
    assert!(!sent[0].contains("1980"));
    assert!(!sent[0].contains("maria@example.com"));
    assert!(sent[0].contains("[NAME]"));
    assert!(sent[0].contains("Tags present: DOB, EMAIL, NAME"));

    let tags: Vec<RedactionTag> = outcome.redaction_tags.iter().copied().collect();
    assert_eq!(tags, vec![RedactionTag::Dob, RedactionTag::Email, RedactionTag::Name]);
    assert_eq!(outcome.backend.label(), "recording");
}

#[test]
fn red_flag_survives_address_like_phrasing() {
    for transcript in [
        "I took 2 pills and fainted in the street",
        "I had 3 episodes of chest pain and my dr is away",
    ] {
        for outcome in both_paths(transcript, &complacent_reply()) {
            let r = &outcome.result;
            assert!(!outcome.transcript.contains("[ADDRESS]"), "{}", outcome.transcript);
            assert!(r.safety.red_flag_detected, "{transcript:?} {:?}", outcome.backend);
            assert_eq!(r.pharmacist_task.queue, Queue::UrgentEscalation);
            assert_eq!(r.risk_level, RiskLevel::High);
        }
    }
}

#[test]
fn fallback_record_carries_no_raw_identifiers() {
    let outcome = IntakePipeline::fallback_only()
        .analyze("This is John Smith, call me at 555-123-4567 about my refill")
        .unwrap();
    let json = serde_json::to_string(&outcome.result).unwrap();
    assert!(!json.contains("John"));
    assert!(!json.contains("4567"));
    assert!(outcome.result.pharmacist_task.tags.contains("redacted"));
}

// =================================================================
// FAILURE HANDLING + OUTPUT CONTRACT
// =================================================================

#[test]
fn structurally_invalid_reply_is_replaced_by_fallback() {
    let reply = r#"{"intent": "refill_request", "pharmacist_task": {"tags": "refill"}}"#;
    let outcome = with_generator(reply).analyze("I need a refill please").unwrap();
    assert_eq!(outcome.backend, BackendUsed::Fallback);
    assert!(outcome.result.pharmacist_task.tags.contains("fallback"));
}

#[test]
fn generator_failure_is_never_surfaced() {
    let pipeline = IntakePipeline::new(Box::new(MockLlmClient::failing("connection refused")));
    for transcript in ["", "chest pain", "I skipped my pills", "refill"] {
        assert!(pipeline.analyze(transcript).is_ok(), "{transcript:?}");
    }
}

#[test]
fn outcome_serializes_with_snake_case_enums() {
    let outcome = IntakePipeline::fallback_only()
        .analyze("I stopped taking my metformin because it makes me dizzy")
        .unwrap();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["result"]["pharmacist_task"]["queue"], "side_effect_followup");
    assert_eq!(value["result"]["intent"], "adherence_issue");
    assert_eq!(value["backend"], "fallback");
}

#[test]
fn final_reply_is_stable_under_resanitizing() {
    use crate::pipeline::safety::keywords::has_symptoms;
    use crate::pipeline::safety::reply::sanitize_reply;

    let transcripts = [
        "I'm having chest pain and trouble breathing",
        "I stopped taking my metformin because it makes me dizzy",
        "I need a refill",
        "",
    ];
    for transcript in transcripts {
        for outcome in both_paths(transcript, &overeager_reply()) {
            let r = &outcome.result;
            let again = sanitize_reply(&r.safe_patient_reply, r.risk_level, has_symptoms(transcript));
            assert_eq!(again.text, r.safe_patient_reply, "{transcript:?}");
        }
    }
}
