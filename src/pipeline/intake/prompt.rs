use std::collections::BTreeSet;

use crate::pipeline::safety::types::RedactionTag;

pub const INTAKE_SYSTEM_PROMPT: &str = r#"
You are a clinical operations assistant supporting a Medication Therapy Management (MTM) team.
You must NOT provide medical advice, diagnosis, or prescribing instructions.
Your job is to triage the transcript into structured workflow artifacts and documentation.

SAFETY RULES:
1. If the transcript includes red-flag symptoms (chest pain, trouble breathing, fainting,
   severe allergic reaction, facial swelling) set risk_level="high",
   pharmacist_task.queue="urgent_escalation", pharmacist_task.priority="urgent",
   pharmacist_task.due_in_hours=1, and safe_patient_reply must tell the patient to seek
   urgent care or emergency services.
2. safe_patient_reply is operational only: acknowledge the message and say a pharmacist
   will follow up. Never mention doses, never tell the patient to start, stop, take,
   skip or switch a medication.

OUTPUT RULES:
- Return ONLY a JSON object that matches the IntakeResult schema provided.
- Do not wrap the JSON in markdown.
"#;

/// JSON description of the record the generator must produce.
pub fn intake_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "title": "IntakeResult",
        "required": [
            "intent", "risk_level", "key_facts", "medications", "recommended_next_step",
            "safe_patient_reply", "soap_note", "pharmacist_task"
        ],
        "properties": {
            "intent": {
                "type": "string",
                "enum": [
                    "adherence_issue", "side_effects", "refill_request",
                    "appointment_request", "general_question", "unknown"
                ]
            },
            "risk_level": { "type": "string", "enum": ["low", "medium", "high"] },
            "key_facts": { "type": "array", "items": { "type": "string" } },
            "medications": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "issue": { "type": "string" }
                    }
                }
            },
            "recommended_next_step": { "type": "string" },
            "safe_patient_reply": { "type": "string" },
            "soap_note": {
                "type": "object",
                "properties": {
                    "subjective": { "type": "string" },
                    "objective": { "type": "string" },
                    "assessment": { "type": "string" },
                    "plan": { "type": "string" }
                }
            },
            "pharmacist_task": {
                "type": "object",
                "properties": {
                    "queue": {
                        "type": "string",
                        "enum": [
                            "urgent_escalation", "side_effect_followup", "mtm_outreach",
                            "refill_request", "appointment_scheduling"
                        ]
                    },
                    "priority": { "type": "string", "enum": ["low", "normal", "high", "urgent"] },
                    "due_in_hours": { "type": "integer", "minimum": 1, "maximum": 168 },
                    "summary": { "type": "string" },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    })
}

/// Build the user turn for one redacted transcript.
pub fn build_intake_prompt(redacted_transcript: &str, redaction_tags: &BTreeSet<RedactionTag>) -> String {
    let redaction_note = if redaction_tags.is_empty() {
        String::new()
    } else {
        let labels: Vec<&str> = redaction_tags.iter().map(|t| t.label()).collect();
        format!(
            "Note: identifiers were redacted. Tags present: {}\n\n",
            labels.join(", ")
        )
    };

    format!(
        "Convert the following patient transcript into an IntakeResult JSON object.\n\
         Follow the schema strictly and do not include medical advice.\n\n\
         {redaction_note}\
         Transcript:\n{redacted_transcript}\n\n\
         Schema:\n{}\n\n\
         Return ONLY JSON.",
        intake_schema()
    )
}
