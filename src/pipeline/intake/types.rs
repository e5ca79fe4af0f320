use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::safety::types::RedactionTag;

/// Longest SLA a pharmacist task may carry (one week).
pub const MAX_DUE_IN_HOURS: u32 = 168;
/// Shortest SLA; reserved for urgent escalation.
pub const MIN_DUE_IN_HOURS: u32 = 1;

/// Triage risk tier. Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Pharmacist task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" | "medium" | "routine" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" | "critical" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Fixed pharmacist workflow queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    UrgentEscalation,
    SideEffectFollowup,
    MtmOutreach,
    RefillRequest,
    AppointmentScheduling,
}

impl Queue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UrgentEscalation => "urgent_escalation",
            Self::SideEffectFollowup => "side_effect_followup",
            Self::MtmOutreach => "mtm_outreach",
            Self::RefillRequest => "refill_request",
            Self::AppointmentScheduling => "appointment_scheduling",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "urgent_escalation" | "urgent" | "escalation" => Some(Self::UrgentEscalation),
            "side_effect_followup" | "side_effect_follow_up" | "side_effects" => {
                Some(Self::SideEffectFollowup)
            }
            "mtm_outreach" | "mtm" | "outreach" => Some(Self::MtmOutreach),
            "refill_request" | "refill" | "refills" => Some(Self::RefillRequest),
            "appointment_scheduling" | "appointment" | "appointments" => {
                Some(Self::AppointmentScheduling)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the patient called about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AdherenceIssue,
    SideEffects,
    RefillRequest,
    AppointmentRequest,
    GeneralQuestion,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdherenceIssue => "adherence_issue",
            Self::SideEffects => "side_effects",
            Self::RefillRequest => "refill_request",
            Self::AppointmentRequest => "appointment_request",
            Self::GeneralQuestion => "general_question",
            Self::Unknown => "unknown",
        }
    }

    /// Map a free-form intent label onto the fixed set. Unrecognised but
    /// non-empty labels become `GeneralQuestion`; empty ones `Unknown`.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "" | "unknown" => Self::Unknown,
            "adherence_issue" | "adherence" | "non_adherence" => Self::AdherenceIssue,
            "side_effects" | "side_effect" | "adverse_effect" => Self::SideEffects,
            "refill_request" | "refill" => Self::RefillRequest,
            "appointment_request" | "appointment" | "scheduling" => Self::AppointmentRequest,
            _ => Self::GeneralQuestion,
        }
    }

    /// Intents whose tasks carry the tightened 24-hour SLA.
    pub fn needs_prompt_followup(self) -> bool {
        matches!(self, Self::AdherenceIssue | Self::SideEffects)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicationIssue {
    /// Medication name as mentioned (unverified).
    pub name: String,
    /// Side effect or issue reported.
    pub issue: String,
}

/// SOAP-style documentation note (non-diagnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PharmacistTask {
    pub queue: Queue,
    pub priority: Priority,
    /// SLA in hours, within `[MIN_DUE_IN_HOURS, MAX_DUE_IN_HOURS]`.
    pub due_in_hours: u32,
    pub summary: String,
    pub tags: BTreeSet<String>,
}

impl PharmacistTask {
    pub fn add_tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_string());
    }
}

/// Audit record of why the safety layer intervened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyResult {
    pub red_flag_detected: bool,
    pub red_flag_signals: Vec<String>,
    pub advice_violation: bool,
}

/// The validated triage record handed to the request and persistence layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeResult {
    pub intent: Intent,
    pub risk_level: RiskLevel,
    pub key_facts: Vec<String>,
    pub medications: Vec<MedicationIssue>,
    pub recommended_next_step: String,
    pub safe_patient_reply: String,
    pub soap_note: SoapNote,
    pub pharmacist_task: PharmacistTask,
    pub safety: SafetyResult,
}

/// Which generator produced the candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendUsed {
    /// An upstream text generator (e.g. `groq`, `openai`).
    Generator(String),
    /// The rule-based fallback classifier.
    Fallback,
}

impl BackendUsed {
    pub fn label(&self) -> &str {
        match self {
            Self::Generator(name) => name,
            Self::Fallback => "fallback",
        }
    }
}

/// Everything the pipeline returns for one transcript.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
    /// The REDACTED transcript the record was built from.
    pub transcript: String,
    pub result: IntakeResult,
    pub redaction_tags: BTreeSet<RedactionTag>,
    pub backend: BackendUsed,
}

/// Response for a voice upload. `transcript` is the REDACTED transcript.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceIntakeResponse {
    pub transcript: String,
    pub language: Option<String>,
    pub result: IntakeResult,
    pub redaction_tags: BTreeSet<RedactionTag>,
    pub backend: BackendUsed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(RiskLevel::Low.max(RiskLevel::High), RiskLevel::High);
    }

    #[test]
    fn enum_parsing_is_lenient() {
        assert_eq!(RiskLevel::parse(" HIGH "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("severe"), None);
        assert_eq!(Priority::parse("Urgent"), Some(Priority::Urgent));
        assert_eq!(Queue::parse("Side Effect Followup"), Some(Queue::SideEffectFollowup));
        assert_eq!(Queue::parse("pharmacy_misc"), None);
    }

    #[test]
    fn intent_parse_defaults() {
        assert_eq!(Intent::parse(""), Intent::Unknown);
        assert_eq!(Intent::parse("side-effects"), Intent::SideEffects);
        assert_eq!(Intent::parse("insurance_question"), Intent::GeneralQuestion);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&Queue::UrgentEscalation).unwrap(),
            "\"urgent_escalation\""
        );
        assert_eq!(
            serde_json::to_string(&Intent::AdherenceIssue).unwrap(),
            "\"adherence_issue\""
        );
        assert_eq!(serde_json::to_string(&Priority::Normal).unwrap(), "\"normal\"");
    }

    #[test]
    fn queue_as_str_round_trips_through_parse() {
        for queue in [
            Queue::UrgentEscalation,
            Queue::SideEffectFollowup,
            Queue::MtmOutreach,
            Queue::RefillRequest,
            Queue::AppointmentScheduling,
        ] {
            assert_eq!(Queue::parse(queue.as_str()), Some(queue));
        }
    }

    #[test]
    fn intake_result_rejects_unknown_fields() {
        let json = serde_json::json!({
            "intent": "unknown",
            "risk_level": "low",
            "key_facts": [],
            "medications": [],
            "recommended_next_step": "x",
            "safe_patient_reply": "y",
            "soap_note": {"subjective": "a", "objective": "b", "assessment": "c", "plan": "d"},
            "pharmacist_task": {
                "queue": "mtm_outreach", "priority": "normal", "due_in_hours": 72,
                "summary": "s", "tags": ["t"]
            },
            "safety": {"red_flag_detected": false, "red_flag_signals": [], "advice_violation": false},
            "agent_backend_used": "fallback"
        });
        assert!(serde_json::from_value::<IntakeResult>(json).is_err());
    }

    #[test]
    fn backend_labels() {
        assert_eq!(BackendUsed::Fallback.label(), "fallback");
        assert_eq!(BackendUsed::Generator("groq".into()).label(), "groq");
    }
}
