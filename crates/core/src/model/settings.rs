use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("{activity} is not an activity of {subject}")]
    UnknownActivity { subject: String, activity: String },

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("activity registry must contain at least one subject")]
    EmptyRegistry,

    #[error("subject {0} must register at least one activity")]
    EmptySubject(String),

    #[error("subject {0} is registered twice")]
    DuplicateSubject(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(SettingsError::UnknownDifficulty(s.to_string())),
        }
    }
}

//
// ─── ACTIVITY REGISTRY ─────────────────────────────────────────────────────────
//

/// How answers to an activity are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Exact/rule-based comparison done by the submit endpoint.
    Exact,
    /// Free-text understanding; judged by the AI evaluator.
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub name: String,
    pub evaluation: EvaluationMode,
}

impl Activity {
    #[must_use]
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evaluation: EvaluationMode::Exact,
        }
    }

    #[must_use]
    pub fn free_text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evaluation: EvaluationMode::FreeText,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub name: String,
    pub activities: Vec<Activity>,
}

/// Fixed, ordered catalogue of subjects and their sub-activities.
///
/// The first subject is the default subject and the first activity of each
/// subject is that subject's default activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRegistry {
    subjects: Vec<SubjectEntry>,
}

impl ActivityRegistry {
    /// Build a registry from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the registry is empty, a subject has no
    /// activities, or a subject name repeats.
    pub fn new(subjects: Vec<SubjectEntry>) -> Result<Self, SettingsError> {
        if subjects.is_empty() {
            return Err(SettingsError::EmptyRegistry);
        }
        for (idx, entry) in subjects.iter().enumerate() {
            if entry.activities.is_empty() {
                return Err(SettingsError::EmptySubject(entry.name.clone()));
            }
            if subjects[..idx]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&entry.name))
            {
                return Err(SettingsError::DuplicateSubject(entry.name.clone()));
            }
        }
        Ok(Self { subjects })
    }

    /// The catalogue the game ships with.
    #[must_use]
    pub fn builtin() -> Self {
        let subject = |name: &str, activities: Vec<Activity>| SubjectEntry {
            name: name.to_string(),
            activities,
        };
        Self {
            subjects: vec![
                subject(
                    "Math",
                    vec![
                        Activity::exact("Addition/Subtraction"),
                        Activity::exact("Multiplication/Division"),
                        Activity::exact("Word Problems"),
                        Activity::exact("Mushroom Kingdom Calculations"),
                        Activity::exact("Fractions"),
                        Activity::exact("Time"),
                        Activity::exact("Money"),
                    ],
                ),
                subject(
                    "English",
                    vec![
                        Activity::free_text("Reading Comprehension"),
                        Activity::free_text("Grammar Correction"),
                        Activity::exact("Spelling"),
                        Activity::exact("Vocabulary"),
                        Activity::exact("Synonyms/Antonyms"),
                        Activity::exact("Opposites/Antonyms"),
                    ],
                ),
                subject(
                    "Science",
                    vec![
                        Activity::exact("Animals"),
                        Activity::exact("Plants"),
                        Activity::exact("Weather"),
                        Activity::exact("Seasons"),
                    ],
                ),
            ],
        }
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectEntry] {
        &self.subjects
    }

    /// Case-insensitive lookup of a subject entry.
    #[must_use]
    pub fn subject(&self, name: &str) -> Option<&SubjectEntry> {
        let name = name.trim();
        self.subjects
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive lookup of an activity under a subject.
    #[must_use]
    pub fn activity(&self, subject: &str, activity: &str) -> Option<&Activity> {
        let activity = activity.trim();
        self.subject(subject)?
            .activities
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(activity))
    }

    #[must_use]
    pub fn default_activity(&self, subject: &str) -> Option<&Activity> {
        self.subject(subject)?.activities.first()
    }

    /// Whether answers for this activity need free-text (AI) evaluation.
    ///
    /// Providers may file a question under another subject, so the activity
    /// name alone is used when the pair is not registered. Unknown activities
    /// are treated as exact.
    #[must_use]
    pub fn requires_free_text(&self, subject: &str, activity: &str) -> bool {
        let mode = self
            .activity(subject, activity)
            .or_else(|| {
                self.subjects
                    .iter()
                    .flat_map(|entry| entry.activities.iter())
                    .find(|a| a.name.eq_ignore_ascii_case(activity.trim()))
            })
            .map(|a| a.evaluation);
        mode == Some(EvaluationMode::FreeText)
    }

    fn first(&self) -> &SubjectEntry {
        // `new` and `builtin` both guarantee at least one subject.
        &self.subjects[0]
    }
}

impl Default for ActivityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// A player's current subject / sub-activity / difficulty selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    subject: String,
    sub_activity: String,
    difficulty: Difficulty,
}

impl Settings {
    /// Validate a selection against a registry, normalising names to their
    /// registered spelling.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the subject or activity is not registered.
    pub fn validated(
        registry: &ActivityRegistry,
        subject: &str,
        sub_activity: &str,
        difficulty: Difficulty,
    ) -> Result<Self, SettingsError> {
        let entry = registry
            .subject(subject)
            .ok_or_else(|| SettingsError::UnknownSubject(subject.to_string()))?;
        let activity = registry.activity(&entry.name, sub_activity).ok_or_else(|| {
            SettingsError::UnknownActivity {
                subject: entry.name.clone(),
                activity: sub_activity.to_string(),
            }
        })?;
        Ok(Self {
            subject: entry.name.clone(),
            sub_activity: activity.name.clone(),
            difficulty,
        })
    }

    /// First subject, its first activity, `Easy`.
    #[must_use]
    pub fn defaults(registry: &ActivityRegistry) -> Self {
        let entry = registry.first();
        Self {
            subject: entry.name.clone(),
            sub_activity: entry.activities[0].name.clone(),
            difficulty: Difficulty::default(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn sub_activity(&self) -> &str {
        &self.sub_activity
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// Partial settings change; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub subject: Option<String>,
    pub sub_activity: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl SettingsUpdate {
    #[must_use]
    pub fn subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sub_activity(mut self, sub_activity: impl Into<String>) -> Self {
        self.sub_activity = Some(sub_activity.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Holds the current selection and keeps `sub_activity` a member of the
/// current subject's activity set.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    registry: Arc<ActivityRegistry>,
    current: Settings,
}

impl SettingsStore {
    #[must_use]
    pub fn new(registry: Arc<ActivityRegistry>) -> Self {
        let current = Settings::defaults(&registry);
        Self { registry, current }
    }

    /// Start from a saved selection, falling back to defaults piece by piece
    /// when parts of it are no longer registered.
    #[must_use]
    pub fn with_preferences(
        registry: Arc<ActivityRegistry>,
        subject: &str,
        sub_activity: &str,
        difficulty: Difficulty,
    ) -> Self {
        let mut store = Self::new(registry);
        let _ = store.set_subject(subject);
        let _ = store.set_sub_activity(sub_activity);
        store.set_difficulty(difficulty);
        store
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ActivityRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Switch subject, replacing the sub-activity with the subject's default
    /// when it is not valid for the new subject.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::UnknownSubject` and leaves state unchanged if the
    /// subject is not registered.
    pub fn set_subject(&mut self, subject: &str) -> Result<(), SettingsError> {
        let entry = self
            .registry
            .subject(subject)
            .ok_or_else(|| SettingsError::UnknownSubject(subject.to_string()))?;
        let sub_activity = match self.registry.activity(&entry.name, &self.current.sub_activity) {
            Some(activity) => activity.name.clone(),
            None => entry.activities[0].name.clone(),
        };
        self.current.subject = entry.name.clone();
        self.current.sub_activity = sub_activity;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SettingsError::UnknownActivity` and leaves state unchanged if
    /// the activity is not registered under the current subject.
    pub fn set_sub_activity(&mut self, sub_activity: &str) -> Result<(), SettingsError> {
        let activity = self
            .registry
            .activity(&self.current.subject, sub_activity)
            .ok_or_else(|| SettingsError::UnknownActivity {
                subject: self.current.subject.clone(),
                activity: sub_activity.to_string(),
            })?;
        self.current.sub_activity = activity.name.clone();
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.current.difficulty = difficulty;
    }

    /// Apply subject, then sub-activity, then difficulty.
    ///
    /// Steps already applied stay applied when a later step is rejected.
    ///
    /// # Errors
    ///
    /// Returns the first rejection.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<(), SettingsError> {
        if let Some(subject) = update.subject.as_deref() {
            self.set_subject(subject)?;
        }
        if let Some(sub_activity) = update.sub_activity.as_deref() {
            self.set_sub_activity(sub_activity)?;
        }
        if let Some(difficulty) = update.difficulty {
            self.set_difficulty(difficulty);
        }
        Ok(())
    }

    /// Replace the whole selection after validating it.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` and leaves state unchanged if any part is invalid.
    pub fn replace(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        self.current = Settings::validated(
            &self.registry,
            &settings.subject,
            &settings.sub_activity,
            settings.difficulty,
        )?;
        Ok(())
    }
}
