mod feedback;
mod ids;
mod player;
mod question;
mod settings;

pub use feedback::{Feedback, default_message};
pub use ids::{ParseIdError, PlayerId, QuestionId};
pub use player::{NewPlayer, Player, PlayerError};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind};
pub use settings::{
    Activity, ActivityRegistry, Difficulty, EvaluationMode, Settings, SettingsError,
    SettingsStore, SettingsUpdate, SubjectEntry,
};
