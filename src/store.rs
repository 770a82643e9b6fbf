// src/store.rs

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tokio::fs;

use crate::error::AppError;
use crate::models::question::{Question, QuizDefinition};
use crate::utils::html::clean_html;

/// Module and quiz ids come straight from the URL path and are joined into a
/// filesystem path, so they must stay plain name segments.
static KEY_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// On-disk shape of a definition file. Older content packs are a bare
/// question array; newer ones wrap the array in a titled object.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuizFile {
    Titled {
        title: Option<String>,
        questions: Vec<Question>,
    },
    Bare(Vec<Question>),
}

/// File-backed quiz definition store.
///
/// Definitions live at `<root>/<module>/<quiz_id>.json` and are read fresh on
/// every load. The store owns validation and sanitization of content; callers
/// can trust that a returned definition has in-range answer indices and clean
/// displayable text.
#[derive(Debug, Clone)]
pub struct QuizStore {
    root: PathBuf,
}

impl QuizStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the ordered question sequence for `(module, quiz_id)`.
    ///
    /// Fails with `NotFound` when no definition file exists at that key and
    /// with `BadRequest` when either segment is not a plain name.
    pub async fn load(&self, module: &str, quiz_id: &str) -> Result<QuizDefinition, AppError> {
        validate_segment(module)?;
        validate_segment(quiz_id)?;

        let path = self.root.join(module).join(format!("{quiz_id}.json"));

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "Quiz '{module}/{quiz_id}' not found"
                )));
            }
            Err(e) => {
                tracing::error!("Failed to read quiz file {}: {:?}", path.display(), e);
                return Err(AppError::InternalServerError(e.to_string()));
            }
        };

        let file: QuizFile = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!("Corrupt quiz definition {}: {}", path.display(), e);
            AppError::InternalServerError(format!("Invalid quiz definition: {e}"))
        })?;

        let (title, questions) = match file {
            QuizFile::Titled { title, questions } => (title, questions),
            QuizFile::Bare(questions) => (None, questions),
        };

        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| check_question(module, quiz_id, i, q))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuizDefinition {
            module: module.to_string(),
            quiz_id: quiz_id.to_string(),
            title,
            questions,
        })
    }

    /// Lists module directories under the content root, sorted by name.
    pub async fn list_modules(&self) -> Result<Vec<String>, AppError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        let mut modules = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?
                .is_dir();
            if let (true, Ok(name)) = (is_dir, entry.file_name().into_string()) {
                if KEY_SEGMENT.is_match(&name) {
                    modules.push(name);
                }
            }
        }
        modules.sort();
        Ok(modules)
    }

    /// Lists the quiz ids (file stems) available for a module, sorted.
    pub async fn list_quizzes(&self, module: &str) -> Result<Vec<String>, AppError> {
        validate_segment(module)?;

        let mut entries = fs::read_dir(self.root.join(module))
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        let mut quizzes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
        {
            let name = entry.file_name();
            let path: &std::path::Path = name.as_ref();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if KEY_SEGMENT.is_match(stem) {
                        quizzes.push(stem.to_string());
                    }
                }
            }
        }
        quizzes.sort();
        Ok(quizzes)
    }
}

fn validate_segment(segment: &str) -> Result<(), AppError> {
    if KEY_SEGMENT.is_match(segment) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid module or quiz id '{segment}'"
        )))
    }
}

/// Enforces the definition invariants (2+ options, answer index in range)
/// and sanitizes all displayable text.
fn check_question(
    module: &str,
    quiz_id: &str,
    index: usize,
    q: Question,
) -> Result<Question, AppError> {
    if q.options.len() < 2 {
        return Err(AppError::InternalServerError(format!(
            "Invalid quiz definition {module}/{quiz_id}: question {index} has fewer than 2 options"
        )));
    }
    if q.correct_answer < 0 || q.correct_answer as usize >= q.options.len() {
        return Err(AppError::InternalServerError(format!(
            "Invalid quiz definition {module}/{quiz_id}: question {index} answer index out of range"
        )));
    }

    Ok(Question {
        id: q.id,
        text: clean_html(&q.text),
        options: q.options.iter().map(|o| clean_html(o)).collect(),
        correct_answer: q.correct_answer,
        explanation: q.explanation.map(|e| clean_html(&e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> (std::path::PathBuf, QuizStore) {
        let root = std::env::temp_dir().join(format!("quizhub-store-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("intro-ai")).unwrap();
        (root.clone(), QuizStore::new(root))
    }

    fn write_quiz(root: &std::path::Path, module: &str, quiz_id: &str, body: &str) {
        std::fs::create_dir_all(root.join(module)).unwrap();
        std::fs::write(root.join(module).join(format!("{quiz_id}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn loads_bare_array_definition() {
        let (root, store) = scratch_store();
        write_quiz(
            &root,
            "intro-ai",
            "1",
            r#"[{"id":"q1","text":"2+2?","options":["3","4"],"correctAnswer":1}]"#,
        );

        let def = store.load("intro-ai", "1").await.unwrap();
        assert_eq!(def.quiz_key(), "intro-ai/1");
        assert_eq!(def.title, None);
        assert_eq!(def.questions.len(), 1);
        assert_eq!(def.questions[0].correct_answer, 1);
    }

    #[tokio::test]
    async fn loads_titled_definition() {
        let (root, store) = scratch_store();
        write_quiz(
            &root,
            "intro-ai",
            "2",
            r#"{"title":"Search","questions":[{"id":"q1","text":"BFS?","options":["yes","no"],"correctAnswer":0,"explanation":"breadth first"}]}"#,
        );

        let def = store.load("intro-ai", "2").await.unwrap();
        assert_eq!(def.title.as_deref(), Some("Search"));
        assert_eq!(def.questions[0].explanation.as_deref(), Some("breadth first"));
    }

    #[tokio::test]
    async fn missing_definition_is_not_found() {
        let (_root, store) = scratch_store();
        let err = store.load("intro-ai", "99").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_path_traversal_segments() {
        let (_root, store) = scratch_store();
        let err = store.load("../etc", "passwd").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn rejects_out_of_range_answer_index() {
        let (root, store) = scratch_store();
        write_quiz(
            &root,
            "intro-ai",
            "bad",
            r#"[{"id":"q1","text":"?","options":["a","b"],"correctAnswer":5}]"#,
        );
        let err = store.load("intro-ai", "bad").await.unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
    }

    #[tokio::test]
    async fn sanitizes_markup_in_question_text() {
        let (root, store) = scratch_store();
        write_quiz(
            &root,
            "intro-ai",
            "3",
            r#"[{"id":"q1","text":"<script>alert(1)</script><b>Safe?</b>","options":["a","b"],"correctAnswer":0}]"#,
        );
        let def = store.load("intro-ai", "3").await.unwrap();
        assert!(!def.questions[0].text.contains("script"));
        assert!(def.questions[0].text.contains("Safe?"));
    }

    #[tokio::test]
    async fn lists_modules_and_quizzes() {
        let (root, store) = scratch_store();
        write_quiz(&root, "networking", "1", "[]");
        write_quiz(&root, "networking", "2", "[]");

        let modules = store.list_modules().await.unwrap();
        assert!(modules.contains(&"networking".to_string()));

        let quizzes = store.list_quizzes("networking").await.unwrap();
        assert_eq!(quizzes, vec!["1".to_string(), "2".to_string()]);
    }
}
