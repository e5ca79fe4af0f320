//! Keyword classifiers over the redacted transcript, plus the clinical-advice
//! pattern set used on patient-facing replies.
//!
//! Transcript predicates are case-insensitive phrase lists, English and
//! Spanish, matched on whole words only ("retired" is not "tired"). They are
//! independent: a transcript can have symptoms without red flags and the
//! other way round.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{AdviceCategory, AdviceMatch};

// ── Transcript keyword sets ─────────────────────────────────

/// Emergency-indicative phrases. Any hit forces urgent escalation.
static RED_FLAG_KEYWORDS: &[(&str, &str)] = &[
    ("chest pain", "chest pain"),
    ("chest pressure", "chest pain"),
    ("chest tightness", "chest pain"),
    ("pain in my chest", "chest pain"),
    ("dolor de pecho", "chest pain"),
    ("difficulty breathing", "difficulty breathing"),
    ("trouble breathing", "difficulty breathing"),
    ("hard to breathe", "difficulty breathing"),
    ("can't breathe", "difficulty breathing"),
    ("cannot breathe", "difficulty breathing"),
    ("shortness of breath", "difficulty breathing"),
    ("short of breath", "difficulty breathing"),
    ("no puedo respirar", "difficulty breathing"),
    ("dificultad para respirar", "difficulty breathing"),
    ("fainted", "fainting"),
    ("fainting", "fainting"),
    ("passed out", "fainting"),
    ("blacked out", "fainting"),
    ("me desmayé", "fainting"),
    ("desmayo", "fainting"),
    ("severe allergic reaction", "severe allergic reaction"),
    ("anaphylaxis", "severe allergic reaction"),
    ("anaphylactic", "severe allergic reaction"),
    ("reacción alérgica grave", "severe allergic reaction"),
    ("facial swelling", "facial swelling"),
    ("face is swelling", "facial swelling"),
    ("face is swollen", "facial swelling"),
    ("swollen face", "facial swelling"),
    ("swelling in my face", "facial swelling"),
    ("lips are swelling", "facial swelling"),
    ("swollen lips", "facial swelling"),
    ("tongue is swelling", "facial swelling"),
    ("throat is closing", "facial swelling"),
    ("cara hinchada", "facial swelling"),
];

/// Non-emergency symptom phrases.
static SYMPTOM_KEYWORDS: &[&str] = &[
    "dizzy", "dizziness", "lightheaded", "light-headed", "vertigo",
    "nausea", "nauseous", "vomit", "vomited", "vomiting", "throwing up", "upset stomach",
    "diarrhea", "rash", "rashes", "itchy", "itching", "hives",
    "headache", "headaches", "migraine", "migraines",
    "fatigue", "tired", "tiredness", "drowsy", "sleepy",
    "muscle pain", "cramps", "cramping", "cough", "coughing", "dry mouth", "swelling",
    "side effect", "side effects", "side-effect", "side-effects",
    "mareo", "mareos", "mareada", "mareado", "náusea", "náuseas", "sarpullido",
    "dolor de cabeza", "efecto secundario", "efectos secundarios",
];

/// Phrases describing an adverse reaction without naming a symptom.
static SIDE_EFFECT_PHRASES: &[&str] = &[
    "side effect", "side effects", "side-effect", "side-effects", "makes me feel",
    "made me feel", "makes me",
    "made me", "reaction to", "since i started", "since starting", "feel weird",
    "feel sick", "me hace sentir", "me cae mal",
];

/// The patient stopped, skipped or is not taking a medication.
static DISCONTINUATION_KEYWORDS: &[&str] = &[
    "stopped taking", "stop taking", "quit taking", "not taking", "haven't been taking",
    "havent been taking", "haven't taken", "stopped my", "skipped", "skipping",
    "missed my", "missed doses", "missing doses", "off my medication", "off my meds",
    "dejé de tomar", "deje de tomar", "no estoy tomando", "no me la tomo",
];

/// Adherence language broader than discontinuation (used for intent).
static ADHERENCE_KEYWORDS: &[&str] = &[
    "forget to take", "forgot to take", "forgetting", "keep forgetting", "hard to remember",
    "adherence", "can't afford", "cannot afford", "too expensive", "se me olvida",
];

static REFILL_KEYWORDS: &[&str] = &[
    "refill", "refills", "refilled", "ran out", "run out", "running out", "renew",
    "renewal", "new prescription", "prescription ready", "pick up my", "resurtir",
    "receta", "recetas",
];

static APPOINTMENT_KEYWORDS: &[&str] = &[
    "appointment", "appointments", "schedule", "scheduled", "reschedule", "book a",
    "book an", "consultation", "visit", "cita", "citas", "consulta",
];

/// Compiled whole-word matchers for one phrase list.
struct PhraseSet {
    phrases: &'static [&'static str],
    regexes: Vec<Regex>,
}

impl PhraseSet {
    fn new(phrases: &'static [&'static str]) -> Self {
        let regexes = phrases.iter().map(|p| whole_word(p)).collect();
        Self { phrases, regexes }
    }

    fn matches_any(&self, text: &str) -> bool {
        self.regexes.iter().any(|r| r.is_match(text))
    }

    /// Matching phrases, in list order.
    fn mentions(&self, text: &str) -> Vec<&'static str> {
        self.phrases
            .iter()
            .zip(&self.regexes)
            .filter(|(_, r)| r.is_match(text))
            .map(|(phrase, _)| *phrase)
            .collect()
    }
}

fn whole_word(phrase: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase))).expect("Invalid keyword regex pattern")
}

static RED_FLAG_PHRASES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    RED_FLAG_KEYWORDS
        .iter()
        .map(|(phrase, signal)| (whole_word(phrase), *signal))
        .collect()
});

static SYMPTOMS: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet::new(SYMPTOM_KEYWORDS));
static SIDE_EFFECTS: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet::new(SIDE_EFFECT_PHRASES));
static DISCONTINUATION: LazyLock<PhraseSet> =
    LazyLock::new(|| PhraseSet::new(DISCONTINUATION_KEYWORDS));
static ADHERENCE: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet::new(ADHERENCE_KEYWORDS));
static REFILL: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet::new(REFILL_KEYWORDS));
static APPOINTMENT: LazyLock<PhraseSet> = LazyLock::new(|| PhraseSet::new(APPOINTMENT_KEYWORDS));

/// True if the transcript mentions an emergency-indicative symptom.
pub fn has_red_flags(text: &str) -> bool {
    RED_FLAG_PHRASES.iter().any(|(regex, _)| regex.is_match(text))
}

/// Short, deduplicated reasons for escalation, in first-listed order.
pub fn red_flag_signals(text: &str) -> Vec<String> {
    let mut signals: Vec<String> = Vec::new();
    for (regex, signal) in RED_FLAG_PHRASES.iter() {
        if regex.is_match(text) && !signals.iter().any(|s| s == signal) {
            signals.push((*signal).to_string());
        }
    }
    signals
}

/// True if the transcript mentions a non-emergency symptom.
pub fn has_symptoms(text: &str) -> bool {
    SYMPTOMS.matches_any(text)
}

/// Symptoms found in the transcript, in list order.
pub fn symptom_mentions(text: &str) -> Vec<&'static str> {
    SYMPTOMS.mentions(text)
}

/// Symptom language or any phrase describing an adverse reaction.
pub fn has_side_effect_language(text: &str) -> bool {
    has_symptoms(text) || SIDE_EFFECTS.matches_any(text)
}

/// True if the patient reports stopping or skipping a medication.
pub fn has_discontinuation(text: &str) -> bool {
    DISCONTINUATION.matches_any(text)
}

/// Discontinuation or other adherence-barrier language.
pub fn has_adherence_language(text: &str) -> bool {
    has_discontinuation(text) || ADHERENCE.matches_any(text)
}

pub fn has_refill_language(text: &str) -> bool {
    REFILL.matches_any(text)
}

pub fn has_appointment_language(text: &str) -> bool {
    APPOINTMENT.matches_any(text)
}

// ── Clinical-advice patterns (replies) ──────────────────────

/// A compiled advice pattern with its audit metadata.
struct AdvicePattern {
    regex: Regex,
    category: AdviceCategory,
    description: &'static str,
}

fn pattern(regex_str: &str, category: AdviceCategory, description: &'static str) -> AdvicePattern {
    AdvicePattern {
        regex: Regex::new(regex_str).expect("Invalid advice regex pattern"),
        category,
        description,
    }
}

/// Phrases that turn an operational reply into clinical advice.
static ADVICE_PATTERNS: LazyLock<Vec<AdvicePattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:increase|decrease|double|halve|reduce|lower|raise|adjust|cut)\s+(?:the\s+|your\s+)?(?:dose|dosage|medication|medicine|pills?)\b",
            AdviceCategory::DosageChange,
            "Dosage change: 'increase/reduce your dose'",
        ),
        pattern(
            r"(?i)\b(?:dose|dosage)\s+(?:should|can|could)\s+be\b",
            AdviceCategory::DosageChange,
            "Dosage change: 'the dose should be'",
        ),
        pattern(
            r"(?i)\byou\s+(?:should|shouldn['’]?t|should\s+not|ought\s+to|must|need\s+to)\b",
            AdviceCategory::Directive,
            "Directive: 'you should / you shouldn't'",
        ),
        pattern(
            r"(?i)\bI\s+(?:would\s+)?(?:recommend|suggest|advise)\b",
            AdviceCategory::Directive,
            "Directive: 'I recommend / I suggest'",
        ),
        pattern(
            r"(?i)\btake\s+(?:the|your|it|them|this|that|an?|one|two|three|half|\d+)\b",
            AdviceCategory::MedicationInstruction,
            "Medication instruction: 'take the / take your / take 2'",
        ),
        pattern(
            r"(?i)\b\d+(?:\.\d+)?\s*(?:mg|mcg|ml|milligrams?|tablets?|pills?|capsules?|puffs?|units?)\b",
            AdviceCategory::DosageChange,
            "Dose amount: '2 tablets / 500 mg'",
        ),
        pattern(
            r"(?i)\b(?:stop|start|skip|discontinue|resume|keep)\s+taking\b",
            AdviceCategory::MedicationInstruction,
            "Medication instruction: 'stop/keep taking'",
        ),
        pattern(
            r"(?i)\bswitch(?:ing)?\s+(?:to|from|over)\b",
            AdviceCategory::Substitution,
            "Substitution: 'switch to'",
        ),
        pattern(
            r"(?i)\b(?:an?\s+)?alternative\s+(?:medication|medicine|drug|treatment|to)\b|\binstead\s+of\b",
            AdviceCategory::Substitution,
            "Substitution: 'alternative medication / instead of'",
        ),
    ]
});

/// Scan a candidate reply for clinical-advice phrases.
pub fn scan_advice(text: &str) -> Vec<AdviceMatch> {
    let mut matches = Vec::new();
    for ap in ADVICE_PATTERNS.iter() {
        for mat in ap.regex.find_iter(text) {
            matches.push(AdviceMatch {
                category: ap.category,
                offset: mat.start(),
                length: mat.len(),
                reason: ap.description,
            });
        }
    }
    matches.sort_by_key(|m| (m.offset, std::cmp::Reverse(m.length)));
    matches
}

/// True if the reply contains any clinical-advice phrase.
pub fn contains_advice(text: &str) -> bool {
    ADVICE_PATTERNS.iter().any(|ap| ap.regex.is_match(text))
}
