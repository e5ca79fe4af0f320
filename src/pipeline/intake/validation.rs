// Final structural check on a normalized, sanitized intake record.
// A violation here means the rule chain itself produced a bad record, so it
// is surfaced to the caller rather than recovered.

use super::types::{IntakeResult, Priority, Queue, RiskLevel, MAX_DUE_IN_HOURS, MIN_DUE_IN_HOURS};
use super::IntakeError;
use crate::pipeline::safety::keywords::contains_advice;

/// Validate the final record against the output contract.
pub fn validate_intake_result(record: &IntakeResult) -> Result<(), IntakeError> {
    let mut violations = Vec::new();

    check_required_text(record, &mut violations);
    check_task(record, &mut violations);
    check_safety(record, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        tracing::error!(
            violation_count = violations.len(),
            "Intake record failed final validation"
        );
        Err(IntakeError::SchemaViolation(violations))
    }
}

fn check_required_text(record: &IntakeResult, violations: &mut Vec<String>) {
    let fields = [
        ("recommended_next_step", &record.recommended_next_step),
        ("safe_patient_reply", &record.safe_patient_reply),
        ("soap_note.subjective", &record.soap_note.subjective),
        ("soap_note.objective", &record.soap_note.objective),
        ("soap_note.assessment", &record.soap_note.assessment),
        ("soap_note.plan", &record.soap_note.plan),
        ("pharmacist_task.summary", &record.pharmacist_task.summary),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            violations.push(format!("{name} is empty"));
        }
    }
}

fn check_task(record: &IntakeResult, violations: &mut Vec<String>) {
    let task = &record.pharmacist_task;

    if !(MIN_DUE_IN_HOURS..=MAX_DUE_IN_HOURS).contains(&task.due_in_hours) {
        violations.push(format!(
            "pharmacist_task.due_in_hours {} outside [{MIN_DUE_IN_HOURS}, {MAX_DUE_IN_HOURS}]",
            task.due_in_hours
        ));
    }

    if task.tags.is_empty() {
        violations.push("pharmacist_task.tags is empty".into());
    }
    if task.tags.iter().any(|t| t.trim().is_empty()) {
        violations.push("pharmacist_task.tags contains an empty tag".into());
    }

    let escalated = task.queue == Queue::UrgentEscalation;
    let urgent = task.priority == Priority::Urgent;
    if escalated != urgent {
        violations.push(format!(
            "priority {:?} inconsistent with queue {}",
            task.priority, task.queue
        ));
    }
    if escalated && task.due_in_hours != MIN_DUE_IN_HOURS {
        violations.push(format!(
            "due_in_hours {} inconsistent with queue {}",
            task.due_in_hours, task.queue
        ));
    }
}

fn check_safety(record: &IntakeResult, violations: &mut Vec<String>) {
    let escalated = record.pharmacist_task.queue == Queue::UrgentEscalation;

    if escalated != record.safety.red_flag_detected {
        violations.push("urgent_escalation queue does not match red-flag detection".into());
    }
    if record.safety.red_flag_detected != (record.risk_level == RiskLevel::High) {
        violations.push(format!(
            "risk_level {:?} inconsistent with red-flag detection",
            record.risk_level
        ));
    }
    if record.safety.red_flag_detected && record.safety.red_flag_signals.is_empty() {
        violations.push("red flag detected without signals".into());
    }
    if contains_advice(&record.safe_patient_reply) {
        violations.push("safe_patient_reply contains clinical advice".into());
    }
}
