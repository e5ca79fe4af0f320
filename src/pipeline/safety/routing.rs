//! Routing normalizer.
//!
//! Enforces queue / priority / SLA invariants on a triage record, overriding
//! whatever the upstream generator chose. Rules are evaluated in precedence
//! order against the REDACTED transcript; the first rule whose condition
//! holds is applied and the chain stops ("strictest rule wins").
//!
//! | id      | condition                                    | effect |
//! |---------|----------------------------------------------|--------|
//! | ROUTE-1 | red flag in transcript                       | urgent_escalation / urgent / 1h, risk high |
//! | ROUTE-2 | no red flag, record claims urgent_escalation | side_effect_followup / high / 24h, or mtm_outreach / normal / 72h |
//! | ROUTE-3 | discontinuation + side-effect language       | side_effect_followup / high / min(due, 24h), risk medium |
//! | ROUTE-4 | intent is adherence_issue or side_effects    | priority >= high, due <= 24h |
//!
//! Every rule's output satisfies its own condition's effect, so running the
//! chain on its own output is a no-op.

use crate::pipeline::intake::types::{
    Intent, IntakeResult, Priority, Queue, RiskLevel, MAX_DUE_IN_HOURS, MIN_DUE_IN_HOURS,
};

use super::keywords::{has_discontinuation, has_side_effect_language, red_flag_signals};
use super::types::RoutingRule;

/// SLA for escalated tasks.
pub const URGENT_DUE_IN_HOURS: u32 = 1;
/// SLA cap for side-effect and adherence follow-up.
pub const FOLLOWUP_DUE_IN_HOURS: u32 = 24;
/// Default SLA for routine outreach.
pub const ROUTINE_DUE_IN_HOURS: u32 = 72;

pub const TAG_RED_FLAG: &str = "red_flag";
pub const TAG_SIDE_EFFECTS: &str = "side_effects";
pub const TAG_ADHERENCE: &str = "adherence";

pub const ESCALATION_NEXT_STEP: &str =
    "Escalate now: pharmacist to contact the patient within 1 hour and confirm they have \
     reached emergency services or urgent care.";

/// Staff-facing next step used when the record carries none.
pub fn default_next_step(queue: Queue) -> &'static str {
    match queue {
        Queue::UrgentEscalation => ESCALATION_NEXT_STEP,
        Queue::SideEffectFollowup => {
            "Pharmacist to contact the patient within 24 hours to review the reported \
             side effects and current medication use."
        }
        Queue::MtmOutreach => {
            "Route to pharmacist outreach queue for MTM follow-up; verify medication list \
             and barriers."
        }
        Queue::RefillRequest => {
            "Pharmacist to review the refill request and confirm prescription status with \
             the patient."
        }
        Queue::AppointmentScheduling => {
            "Schedule a pharmacist consultation and confirm the time with the patient."
        }
    }
}

/// Transcript facts the rules are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSignals {
    pub red_flags: Vec<String>,
    pub side_effects: bool,
    pub discontinuation: bool,
}

impl TranscriptSignals {
    pub fn detect(redacted_transcript: &str) -> Self {
        Self {
            red_flags: red_flag_signals(redacted_transcript),
            side_effects: has_side_effect_language(redacted_transcript),
            discontinuation: has_discontinuation(redacted_transcript),
        }
    }

    pub fn red_flag(&self) -> bool {
        !self.red_flags.is_empty()
    }
}

/// One entry of the precedence chain.
struct Rule {
    id: RoutingRule,
    applies: fn(&TranscriptSignals, &IntakeResult) -> bool,
    apply: fn(&mut IntakeResult, &TranscriptSignals),
}

/// The chain, highest precedence first.
static RULES: [Rule; 4] = [
    Rule {
        id: RoutingRule::RedFlagOverride,
        applies: red_flag_present,
        apply: apply_red_flag_override,
    },
    Rule {
        id: RoutingRule::UrgentDowngrade,
        applies: claims_urgent_queue,
        apply: apply_urgent_downgrade,
    },
    Rule {
        id: RoutingRule::SideEffectAdherence,
        applies: side_effects_with_discontinuation,
        apply: apply_side_effect_adherence,
    },
    Rule {
        id: RoutingRule::SlaTightening,
        applies: intent_needs_prompt_followup,
        apply: apply_sla_tightening,
    },
];

fn red_flag_present(signals: &TranscriptSignals, _: &IntakeResult) -> bool {
    signals.red_flag()
}

fn claims_urgent_queue(_: &TranscriptSignals, record: &IntakeResult) -> bool {
    record.pharmacist_task.queue == Queue::UrgentEscalation
}

fn side_effects_with_discontinuation(signals: &TranscriptSignals, _: &IntakeResult) -> bool {
    signals.discontinuation && signals.side_effects
}

fn intent_needs_prompt_followup(_: &TranscriptSignals, record: &IntakeResult) -> bool {
    record.intent.needs_prompt_followup()
}

/// Normalize a record's routing against the redacted transcript.
pub fn normalize(mut record: IntakeResult, redacted_transcript: &str) -> IntakeResult {
    normalize_in_place(&mut record, redacted_transcript);
    record
}

/// In-place variant; returns the rule that decided the routing.
pub fn normalize_in_place(record: &mut IntakeResult, redacted_transcript: &str) -> RoutingRule {
    let signals = TranscriptSignals::detect(redacted_transcript);
    normalize_with_signals(record, &signals)
}

pub fn normalize_with_signals(record: &mut IntakeResult, signals: &TranscriptSignals) -> RoutingRule {
    apply_task_defaults(record, signals);

    let fired = RULES
        .iter()
        .find(|rule| (rule.applies)(signals, record))
        .map(|rule| {
            (rule.apply)(record, signals);
            rule.id
        })
        .unwrap_or(RoutingRule::Unchanged);

    if record.recommended_next_step.trim().is_empty() {
        record.recommended_next_step = default_next_step(record.pharmacist_task.queue).to_string();
    }

    record.safety.red_flag_detected = signals.red_flag();
    record.safety.red_flag_signals = signals.red_flags.clone();

    tracing::info!(
        rule_id = fired.id(),
        queue = %record.pharmacist_task.queue,
        priority = ?record.pharmacist_task.priority,
        due_in_hours = record.pharmacist_task.due_in_hours,
        risk_level = ?record.risk_level,
        "Routing normalized"
    );

    fired
}

/// Structural defaults applied before any rule is evaluated.
fn apply_task_defaults(record: &mut IntakeResult, signals: &TranscriptSignals) {
    let task = &mut record.pharmacist_task;
    task.due_in_hours = task.due_in_hours.clamp(MIN_DUE_IN_HOURS, MAX_DUE_IN_HOURS);

    // Urgent priority and high risk are reserved for escalations.
    if !signals.red_flag() {
        if task.priority == Priority::Urgent {
            task.priority = Priority::High;
        }
        if record.risk_level == RiskLevel::High {
            record.risk_level = RiskLevel::Medium;
        }
    }

    if task.tags.is_empty() {
        task.add_tag(record.intent.as_str());
    }
}

fn apply_red_flag_override(record: &mut IntakeResult, _signals: &TranscriptSignals) {
    record.risk_level = RiskLevel::High;
    let task = &mut record.pharmacist_task;
    task.queue = Queue::UrgentEscalation;
    task.priority = Priority::Urgent;
    task.due_in_hours = URGENT_DUE_IN_HOURS;
    task.add_tag(TAG_RED_FLAG);
    if record.recommended_next_step.trim().is_empty() {
        record.recommended_next_step = ESCALATION_NEXT_STEP.to_string();
    }
}

fn apply_urgent_downgrade(record: &mut IntakeResult, signals: &TranscriptSignals) {
    if signals.side_effects && signals.discontinuation {
        // Same end state as ROUTE-3 so a second pass changes nothing.
        apply_side_effect_adherence(record, signals);
        record.pharmacist_task.due_in_hours = FOLLOWUP_DUE_IN_HOURS;
        return;
    }

    let intent = record.intent;
    let task = &mut record.pharmacist_task;
    if signals.side_effects || signals.discontinuation {
        task.queue = Queue::SideEffectFollowup;
        task.priority = Priority::High;
        task.due_in_hours = FOLLOWUP_DUE_IN_HOURS;
        task.add_tag(TAG_SIDE_EFFECTS);
        if signals.discontinuation {
            task.add_tag(TAG_ADHERENCE);
        }
    } else if intent.needs_prompt_followup() {
        // Keep the ROUTE-4 SLA so the record is already a fixed point.
        task.queue = Queue::MtmOutreach;
        task.priority = Priority::High;
        task.due_in_hours = FOLLOWUP_DUE_IN_HOURS;
    } else {
        task.queue = Queue::MtmOutreach;
        task.priority = Priority::Normal;
        task.due_in_hours = ROUTINE_DUE_IN_HOURS;
    }
}

fn apply_side_effect_adherence(record: &mut IntakeResult, _signals: &TranscriptSignals) {
    record.risk_level = RiskLevel::Medium;
    if record.intent == Intent::GeneralQuestion {
        record.intent = Intent::SideEffects;
    }
    let task = &mut record.pharmacist_task;
    task.queue = Queue::SideEffectFollowup;
    task.priority = Priority::High;
    task.due_in_hours = task.due_in_hours.min(FOLLOWUP_DUE_IN_HOURS);
    task.add_tag(TAG_SIDE_EFFECTS);
    task.add_tag(TAG_ADHERENCE);
}

fn apply_sla_tightening(record: &mut IntakeResult, _signals: &TranscriptSignals) {
    let task = &mut record.pharmacist_task;
    if task.priority != Priority::Urgent {
        task.priority = Priority::High;
    }
    task.due_in_hours = task.due_in_hours.min(FOLLOWUP_DUE_IN_HOURS);
}
