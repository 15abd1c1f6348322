//! Table-driven classification of backend log messages.
//!
//! The backend logs free-form (mostly French) progress text. Messages are
//! routed to a pipeline step by phrase matching and tagged with a severity
//! by keyword matching. Classification is cosmetic: it drives log feeds and
//! colors, never the job state machine, so unmatched messages simply stay
//! with the currently active step at `Info` severity.

use crate::model::{Severity, Step};

/// Lowercase phrase fragments that pin a log line to a specific step.
/// First match wins, so more specific fragments go first.
const STEP_PHRASES: &[(&str, Step)] = &[
    ("chargement des données", Step::DataLoading),
    ("lecture du fichier", Step::DataLoading),
    ("données chargées", Step::DataLoading),
    ("données de test", Step::DataLoading),
    ("extraction des tags", Step::TagExtraction),
    ("tags extraits", Step::TagExtraction),
    ("analyse des réponses", Step::TagExtraction),
    ("normalisation des tags", Step::TagNormalization),
    ("normalisation", Step::TagNormalization),
    ("tags normalisés", Step::TagNormalization),
    ("fusion des tags", Step::TagNormalization),
    ("génération des synthèses", Step::SynthesisGeneration),
    ("synthèse", Step::SynthesisGeneration),
];

/// Keyword groups checked in order; error outranks success so a line like
/// "Erreur: extraction terminée prématurément" reads as an error.
const ERROR_KEYWORDS: &[&str] = &["erreur", "error", "échec", "failed"];
const SUCCESS_KEYWORDS: &[&str] = &["terminé", "terminée", "succès", "success"];
const IN_PROGRESS_KEYWORDS: &[&str] = &["en cours", "démarrage", "démarré", "starting"];

/// Classify one log message into an optional step hint and a severity.
///
/// Pure function over the tables above; `None` means "no phrase matched,
/// attribute to whatever step is currently active".
pub fn classify(message: &str) -> (Option<Step>, Severity) {
    let lower = message.to_lowercase();

    let step = STEP_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, step)| *step);

    let severity = if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::Error
    } else if SUCCESS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::Success
    } else if IN_PROGRESS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::InProgress
    } else {
        Severity::Info
    };

    (step, severity)
}
