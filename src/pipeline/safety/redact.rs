//! PHI redaction boundary.
//!
//! A fixed, ordered list of detectors runs left to right over the transcript.
//! Each detector replaces its matches with a bracketed placeholder such as
//! `[EMAIL]` and records its tag when at least one span was replaced.
//!
//! Ordering matters:
//! 1. Name hints first. Only a handful of self-introduction phrases are
//!    recognised and only the captured name is replaced.
//! 2. Structured identifiers (email, phone, SSN, member ID, DOB, dates).
//!    DOB precedes the generic date detector so a birth date is tagged `DOB`.
//! 3. Street addresses last; the pattern is broad and must not swallow
//!    tokens a narrower detector would have claimed.
//!
//! Placeholders contain only brackets, capitals and underscores, which no
//! detector can match, so the function is idempotent on its own output.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::keywords::{has_discontinuation, has_red_flags, has_side_effect_language};
use super::types::{Redaction, RedactionTag};

/// A compiled detector with its redaction metadata.
struct Detector {
    tag: RedactionTag,
    regex: Regex,
    /// Extra check on the `span` capture (or the whole match).
    accept: fn(&str) -> bool,
}

impl Detector {
    /// Replace every accepted match. Returns the new text and whether
    /// anything was replaced.
    fn apply(&self, input: &str) -> (String, bool) {
        let placeholder = self.tag.placeholder();
        let mut replaced = false;
        let output = self.regex.replace_all(input, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let span = caps.name("span").map_or(whole, |m| m.as_str());
            if !(self.accept)(span) {
                return whole.to_string();
            }
            replaced = true;
            match caps.name("keep") {
                Some(keep) => format!("{}{placeholder}", keep.as_str()),
                None => placeholder.clone(),
            }
        });
        (output.into_owned(), replaced)
    }
}

fn any_span(_: &str) -> bool {
    true
}

fn has_digit(span: &str) -> bool {
    span.chars().any(|c| c.is_ascii_digit())
}

/// Words that show an address-shaped match is ordinary speech
/// ("2 pills and fainted in the street", "3 episodes ... my dr").
static CONVERSATIONAL_WORDS: &[&str] = &[
    "i", "my", "me", "and", "of", "is", "was", "had", "took", "pills", "pill", "tablets",
    "times", "days", "hours", "weeks", "episodes", "mg",
];

/// An address span must not carry clinical language or conversational
/// filler, so redaction never hides a red-flag phrase from routing.
fn plausible_address(span: &str) -> bool {
    if has_red_flags(span) || has_side_effect_language(span) || has_discontinuation(span) {
        return false;
    }
    !span
        .split_whitespace()
        .any(|word| CONVERSATIONAL_WORDS.contains(&word.to_lowercase().as_str()))
}

fn detector(tag: RedactionTag, regex_str: &str) -> Detector {
    Detector {
        tag,
        regex: Regex::new(regex_str).expect("Invalid redaction regex pattern"),
        accept: any_span,
    }
}

/// All detectors in application order.
static DETECTORS: LazyLock<Vec<Detector>> = LazyLock::new(|| {
    vec![
        // "My name is Maria Lopez", "soy Carlos Ruiz". The introduction is
        // case-insensitive, the name must be one to three capitalised words.
        detector(
            RedactionTag::Name,
            r"\b(?P<keep>(?i:my\s+name\s+is|this\s+is|i\s+am|i['’]m|me\s+llamo|mi\s+nombre\s+es|soy)\s+)(?P<span>\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+){0,2})\b",
        ),
        detector(
            RedactionTag::Email,
            r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
        ),
        detector(
            RedactionTag::Phone,
            r"(?:\+?\b1[-.\s]?)?\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
        ),
        detector(RedactionTag::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
        Detector {
            tag: RedactionTag::MemberId,
            regex: Regex::new(
                r"(?i)\b(?:MRN|member(?:\s*id)?|policy(?:\s*id)?|id)(?:\s*(?:(?:number|num|no|is)\b\.?|[:#]))*\s*(?P<span>[A-Z0-9-]{6,})\b",
            )
            .expect("Invalid redaction regex pattern"),
            accept: has_digit,
        },
        detector(
            RedactionTag::Dob,
            r"(?i)\b(?:DOB|date\s+of\s+birth|birth\s*date|born\s+on|fecha\s+de\s+nacimiento)\s*[:#]?\s*\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b",
        ),
        detector(RedactionTag::Date, r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b"),
        detector(
            RedactionTag::Date,
            r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{2,4}\b",
        ),
        Detector {
            tag: RedactionTag::Address,
            regex: Regex::new(
                r"(?i)\b\d{1,6}\s+(?:[A-Z0-9]+\s+){0,6}(?:st|street|ave|avenue|rd|road|blvd|boulevard|ln|lane|dr|drive|ct|court)\b",
            )
            .expect("Invalid redaction regex pattern"),
            accept: plausible_address,
        },
    ]
});

/// Redact identifying spans from a raw transcript.
///
/// Pure function: empty input yields empty text and no tags.
pub fn redact(transcript: &str) -> Redaction {
    let mut redaction = Redaction {
        text: transcript.to_string(),
        ..Redaction::default()
    };

    for detector in DETECTORS.iter() {
        let (text, replaced) = detector.apply(&redaction.text);
        if replaced {
            redaction.tags.insert(detector.tag);
            redaction.text = text;
        }
    }

    if !redaction.tags.is_empty() {
        tracing::debug!(
            tag_count = redaction.tags.len(),
            tags = ?redaction.tags,
            "PHI redaction applied"
        );
    }

    redaction
}
