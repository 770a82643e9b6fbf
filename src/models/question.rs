// src/models/question.rs

use serde::{Deserialize, Serialize};

/// One multiple-choice question as authored in a quiz definition file.
///
/// Immutable once loaded. `correct_answer` is an index into `options`;
/// definitions are validated at load time so it is always in range, but the
/// grading engine still guards against a stray `-1` in hand-edited content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A fully loaded quiz definition: the ordered question sequence for one
/// `(module, quiz_id)` key. Loaded fresh per request, never cached.
#[derive(Debug, Clone)]
pub struct QuizDefinition {
    pub module: String,
    pub quiz_id: String,
    pub title: Option<String>,
    pub questions: Vec<Question>,
}

impl QuizDefinition {
    /// Composite key scoping attempts to this quiz, e.g. `intro-ai/1`.
    pub fn quiz_key(&self) -> String {
        format!("{}/{}", self.module, self.quiz_id)
    }
}

/// DTO for sending a question to the client (excludes answer and explanation).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for delivering a whole quiz to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub module: String,
    pub quiz_id: String,
    pub title: Option<String>,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}
