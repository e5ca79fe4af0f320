//! Permissive intermediate shape for upstream candidate records.
//!
//! A generator reply is deserialized into `CandidateRecord` (every field
//! optional, unknown fields ignored) and then coerced field by field into a
//! strict `IntakeResult`. Wrong shapes fail deserialization; missing or
//! unrecognised values fall back to defaults here.

use std::collections::BTreeSet;

use serde::Deserialize;

use super::types::{
    Intent, IntakeResult, MedicationIssue, PharmacistTask, Priority, Queue, RiskLevel,
    SafetyResult, SoapNote, MAX_DUE_IN_HOURS, MIN_DUE_IN_HOURS,
};

pub const DEFAULT_DUE_IN_HOURS: u32 = 72;
pub const DEFAULT_OBJECTIVE: &str = "Not available (voice-only intake).";
pub const DEFAULT_MEDICATION_ISSUE: &str = "mentioned in message";

const DEFAULT_SUBJECTIVE: &str = "Patient left a voice message requesting assistance.";
const DEFAULT_ASSESSMENT: &str = "Needs pharmacist review.";
const DEFAULT_PLAN: &str = "Pharmacist follow-up to clarify medication details, timing, and barriers.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateRecord {
    pub intent: Option<String>,
    pub risk_level: Option<String>,
    pub key_facts: Option<Vec<String>>,
    pub medications: Option<Vec<serde_json::Value>>,
    pub recommended_next_step: Option<String>,
    pub safe_patient_reply: Option<String>,
    pub soap_note: Option<CandidateSoapNote>,
    pub pharmacist_task: Option<CandidateTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateSoapNote {
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateTask {
    pub queue: Option<String>,
    pub priority: Option<String>,
    /// Number or numeric string; anything else is defaulted.
    pub due_in_hours: Option<serde_json::Value>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CandidateMedication {
    name: Option<String>,
    issue: Option<String>,
}

impl CandidateRecord {
    /// Coerce into the strict record. Safety fields start cleared; the
    /// normalizer and sanitizer fill them.
    pub fn into_record(self) -> IntakeResult {
        let intent = Intent::parse(self.intent.as_deref().unwrap_or_default());
        let risk_level = self
            .risk_level
            .as_deref()
            .and_then(RiskLevel::parse)
            .unwrap_or(RiskLevel::Low);

        let soap = self.soap_note.unwrap_or_default();
        let task = self.pharmacist_task.unwrap_or_default();

        IntakeResult {
            intent,
            risk_level,
            key_facts: clean_strings(self.key_facts.unwrap_or_default()),
            medications: coerce_medications(self.medications.as_deref()),
            recommended_next_step: non_empty(self.recommended_next_step).unwrap_or_default(),
            safe_patient_reply: self.safe_patient_reply.unwrap_or_default(),
            soap_note: SoapNote {
                subjective: non_empty(soap.subjective).unwrap_or_else(|| DEFAULT_SUBJECTIVE.into()),
                objective: non_empty(soap.objective).unwrap_or_else(|| DEFAULT_OBJECTIVE.into()),
                assessment: non_empty(soap.assessment).unwrap_or_else(|| DEFAULT_ASSESSMENT.into()),
                plan: non_empty(soap.plan).unwrap_or_else(|| DEFAULT_PLAN.into()),
            },
            pharmacist_task: PharmacistTask {
                queue: task
                    .queue
                    .as_deref()
                    .and_then(Queue::parse)
                    .unwrap_or(Queue::MtmOutreach),
                priority: task
                    .priority
                    .as_deref()
                    .and_then(Priority::parse)
                    .unwrap_or(Priority::Normal),
                due_in_hours: coerce_due_in_hours(task.due_in_hours.as_ref()),
                summary: non_empty(task.summary)
                    .unwrap_or_else(|| format!("Pharmacist follow-up: {}", intent.as_str())),
                tags: normalize_tags(task.tags.unwrap_or_default()),
            },
            safety: SafetyResult::default(),
        }
    }
}

/// Missing or non-numeric values become 72; numbers are rounded and clamped
/// into `[1, 168]`.
pub fn coerce_due_in_hours(value: Option<&serde_json::Value>) -> u32 {
    let hours = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match hours {
        Some(h) if h.is_finite() => {
            h.round().clamp(f64::from(MIN_DUE_IN_HOURS), f64::from(MAX_DUE_IN_HOURS)) as u32
        }
        _ => DEFAULT_DUE_IN_HOURS,
    }
}

/// Lowercase, trim and deduplicate tags; empty tags are dropped.
pub fn normalize_tags(tags: Vec<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn coerce_medications(items: Option<&[serde_json::Value]>) -> Vec<MedicationIssue> {
    items
        .unwrap_or_default()
        .iter()
        .filter_map(|v| serde_json::from_value::<CandidateMedication>(v.clone()).ok())
        .filter_map(|m| {
            let name = non_empty(m.name)?;
            let issue = non_empty(m.issue).unwrap_or_else(|| DEFAULT_MEDICATION_ISSUE.into());
            Some(MedicationIssue { name, issue })
        })
        .collect()
}

fn clean_strings(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|s| non_empty(Some(s)))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(value: serde_json::Value) -> CandidateRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_candidate_gets_defaults() {
        let record = CandidateRecord::default().into_record();
        assert_eq!(record.intent, Intent::Unknown);
        assert_eq!(record.risk_level, RiskLevel::Low);
        assert_eq!(record.pharmacist_task.queue, Queue::MtmOutreach);
        assert_eq!(record.pharmacist_task.priority, Priority::Normal);
        assert_eq!(record.pharmacist_task.due_in_hours, 72);
        assert_eq!(record.soap_note.objective, DEFAULT_OBJECTIVE);
        assert!(!record.pharmacist_task.summary.is_empty());
        assert!(record.recommended_next_step.is_empty());
        assert!(!record.safety.red_flag_detected);
    }

    #[test]
    fn full_candidate_is_kept() {
        let record = candidate(json!({
            "intent": "refill_request",
            "risk_level": "low",
            "key_facts": ["ran out of lisinopril", "  "],
            "medications": [{"name": "lisinopril", "issue": "ran out"}],
            "recommended_next_step": "Process refill.",
            "safe_patient_reply": "We got your refill request.",
            "soap_note": {"subjective": "s", "objective": "o", "assessment": "a", "plan": "p"},
            "pharmacist_task": {
                "queue": "refill_request", "priority": "normal", "due_in_hours": 48,
                "summary": "Refill lisinopril", "tags": ["Refill", "refill ", ""]
            }
        }))
        .into_record();

        assert_eq!(record.intent, Intent::RefillRequest);
        assert_eq!(record.key_facts, vec!["ran out of lisinopril"]);
        assert_eq!(record.medications[0].name, "lisinopril");
        assert_eq!(record.pharmacist_task.queue, Queue::RefillRequest);
        assert_eq!(record.pharmacist_task.due_in_hours, 48);
        assert_eq!(
            record.pharmacist_task.tags.iter().collect::<Vec<_>>(),
            vec!["refill"]
        );
        assert_eq!(record.soap_note.plan, "p");
    }

    #[test]
    fn unknown_enum_values_default() {
        let record = candidate(json!({
            "intent": "billing_dispute",
            "risk_level": "catastrophic",
            "pharmacist_task": {"queue": "billing", "priority": "asap"}
        }))
        .into_record();
        assert_eq!(record.intent, Intent::GeneralQuestion);
        assert_eq!(record.risk_level, RiskLevel::Low);
        assert_eq!(record.pharmacist_task.queue, Queue::MtmOutreach);
        assert_eq!(record.pharmacist_task.priority, Priority::Normal);
    }

    #[test]
    fn due_in_hours_coercion() {
        assert_eq!(coerce_due_in_hours(None), 72);
        assert_eq!(coerce_due_in_hours(Some(&json!(24))), 24);
        assert_eq!(coerce_due_in_hours(Some(&json!("12"))), 12);
        assert_eq!(coerce_due_in_hours(Some(&json!(" 6.4 "))), 6);
        assert_eq!(coerce_due_in_hours(Some(&json!(0))), 1);
        assert_eq!(coerce_due_in_hours(Some(&json!(-5))), 1);
        assert_eq!(coerce_due_in_hours(Some(&json!(1000))), 168);
        assert_eq!(coerce_due_in_hours(Some(&json!("soon"))), 72);
        assert_eq!(coerce_due_in_hours(Some(&json!(null))), 72);
        assert_eq!(coerce_due_in_hours(Some(&json!([24]))), 72);
    }

    #[test]
    fn medications_parsed_leniently() {
        let record = candidate(json!({
            "medications": [
                {"name": "metformin", "issue": "dizziness"},
                {"name": "statin"},
                {"issue": "no name"},
                "aspirin",
                {"name": 5}
            ]
        }))
        .into_record();
        assert_eq!(record.medications.len(), 2);
        assert_eq!(record.medications[1].issue, DEFAULT_MEDICATION_ISSUE);
    }
}
