use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Category of identifying information removed by the redactor.
///
/// Variants are declared in label order so a `BTreeSet<RedactionTag>`
/// iterates alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionTag {
    Address,
    Date,
    Dob,
    Email,
    MemberId,
    Name,
    Phone,
    Ssn,
}

impl RedactionTag {
    /// Label used inside the bracketed placeholder, e.g. `EMAIL` for `[EMAIL]`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Address => "ADDRESS",
            Self::Date => "DATE",
            Self::Dob => "DOB",
            Self::Email => "EMAIL",
            Self::MemberId => "MEMBER_ID",
            Self::Name => "NAME",
            Self::Phone => "PHONE",
            Self::Ssn => "SSN",
        }
    }

    /// The placeholder written in place of a matched span.
    pub fn placeholder(self) -> String {
        format!("[{}]", self.label())
    }
}

impl std::fmt::Display for RedactionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of the redactor: scrubbed text plus the categories that fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Redaction {
    pub text: String,
    pub tags: BTreeSet<RedactionTag>,
}

/// Kind of clinical advice found in a candidate patient reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceCategory {
    /// "increase your dose", "double the dosage"
    DosageChange,
    /// "you should", "you shouldn't", "I recommend"
    Directive,
    /// "take the", "take your", "stop taking"
    MedicationInstruction,
    /// "switch to", "an alternative", "instead of"
    Substitution,
}

/// One advice phrase found in a candidate reply (audit only, never logged
/// with its text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdviceMatch {
    pub category: AdviceCategory,
    pub offset: usize,
    pub length: usize,
    pub reason: &'static str,
}

/// Which branch of the reply sanitizer produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Candidate was empty; the operational acknowledgement was used.
    EmptyReplaced,
    /// Candidate contained clinical advice and was discarded.
    AdviceReplaced,
    /// Candidate kept verbatim.
    Passed,
    /// Candidate kept with safety language appended.
    SafetyAppended,
}

/// Result of sanitizing a patient-facing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedReply {
    pub text: String,
    pub outcome: ReplyOutcome,
    pub advice_matches: Vec<AdviceMatch>,
}

impl SanitizedReply {
    /// True when the candidate had to be discarded for containing advice.
    pub fn advice_violation(&self) -> bool {
        self.outcome == ReplyOutcome::AdviceReplaced
    }
}

/// Which routing rule decided the task (audit trail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    RedFlagOverride,
    UrgentDowngrade,
    SideEffectAdherence,
    SlaTightening,
    /// No rule fired; candidate routing kept after defaulting.
    Unchanged,
}

impl RoutingRule {
    pub fn id(self) -> &'static str {
        match self {
            Self::RedFlagOverride => "ROUTE-1",
            Self::UrgentDowngrade => "ROUTE-2",
            Self::SideEffectAdherence => "ROUTE-3",
            Self::SlaTightening => "ROUTE-4",
            Self::Unchanged => "ROUTE-0",
        }
    }
}
