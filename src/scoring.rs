// src/scoring.rs
//
// The grading core: answer normalization and quiz scoring. Everything here is
// pure and synchronous; persistence and HTTP concerns live in the handlers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::attempt::{QuestionResult, QuizResult, SubmitQuizRequest};
use crate::models::question::QuizDefinition;

/// Canonical "no answer given" marker, distinct from any valid option index.
pub const UNANSWERED: i32 = -1;

static TIME_SPENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+):([0-5]?\d)$").unwrap());

/// The shapes a raw answers payload can arrive in. Submissions have drifted
/// across client revisions, so all of these remain accepted on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnswers {
    /// JSON-encoded array (or mapping) carried in a string field. Preferred,
    /// since it preserves position even when questions were skipped.
    Encoded(String),
    /// Native ordered sequence.
    Sequence(Vec<Value>),
    /// Legacy index-keyed mapping, values keyed by stringified index.
    Keyed(Map<String, Value>),
    /// No recognizable payload at all.
    Missing,
}

impl RawAnswers {
    /// Picks the answers payload out of a submission, `answersArray` first.
    pub fn from_submission(req: &SubmitQuizRequest) -> Self {
        if let Some(encoded) = &req.answers_array {
            return RawAnswers::Encoded(encoded.clone());
        }
        match &req.answers {
            Some(Value::String(encoded)) => RawAnswers::Encoded(encoded.clone()),
            Some(Value::Array(items)) => RawAnswers::Sequence(items.clone()),
            Some(Value::Object(map)) => RawAnswers::Keyed(map.clone()),
            _ => RawAnswers::Missing,
        }
    }
}

/// Reconciles a raw submission into exactly `question_count` answer indices.
///
/// Total: any malformed value or missing entry becomes [`UNANSWERED`], the
/// result is always `question_count` long, and this never fails. Favouring
/// availability over strictness here is deliberate; a garbled payload grades
/// as all-unanswered rather than erroring the request.
pub fn normalize_answers(raw: &RawAnswers, question_count: usize) -> Vec<i32> {
    match raw {
        RawAnswers::Encoded(encoded) => normalize_encoded(encoded, question_count),
        RawAnswers::Sequence(items) => normalize_sequence(items, question_count),
        RawAnswers::Keyed(map) => normalize_keyed(map, question_count),
        RawAnswers::Missing => vec![UNANSWERED; question_count],
    }
}

fn normalize_encoded(encoded: &str, question_count: usize) -> Vec<i32> {
    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Array(items)) => normalize_sequence(&items, question_count),
        Ok(Value::Object(map)) => normalize_keyed(&map, question_count),
        // Fallback: unparseable payload grades as fully unanswered.
        _ => vec![UNANSWERED; question_count],
    }
}

fn normalize_sequence(items: &[Value], question_count: usize) -> Vec<i32> {
    (0..question_count)
        .map(|i| items.get(i).map_or(UNANSWERED, parse_answer))
        .collect()
}

fn normalize_keyed(map: &Map<String, Value>, question_count: usize) -> Vec<i32> {
    (0..question_count)
        .map(|i| map.get(&i.to_string()).map_or(UNANSWERED, parse_answer))
        .collect()
}

fn parse_answer(value: &Value) -> i32 {
    match value {
        Value::Number(n) => n.as_i64().map_or(UNANSWERED, |n| n as i32),
        Value::String(s) => s.trim().parse().unwrap_or(UNANSWERED),
        _ => UNANSWERED,
    }
}

/// Parses the free-text "M:SS" time field into seconds.
/// Anything that doesn't match yields `None` rather than failing the attempt.
pub fn parse_time_spent(raw: &str) -> Option<i32> {
    let caps = TIME_SPENT.captures(raw.trim())?;
    let minutes: i32 = caps[1].parse().ok()?;
    let seconds: i32 = caps[2].parse().ok()?;
    Some(minutes * 60 + seconds)
}

/// Scores a normalized submission against a quiz definition.
///
/// Deterministic and side-effect free; `time_spent` is passed through
/// verbatim into the review record. The caller must have rejected
/// zero-question definitions already.
pub fn grade_quiz(definition: &QuizDefinition, answers: &[i32], time_spent: &str) -> QuizResult {
    let total_questions = definition.questions.len();
    debug_assert!(total_questions > 0, "zero-question quiz is a definition error");

    let mut correct_count = 0;

    let question_results: Vec<QuestionResult> = definition
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let user_answer = answers.get(index).copied().unwrap_or(UNANSWERED);
            // The sentinel can never equal a valid option index, but the
            // second clause guards a definition authored with -1.
            let is_correct = user_answer == question.correct_answer && user_answer != UNANSWERED;

            if is_correct {
                correct_count += 1;
            }

            let user_answer_text = if user_answer >= 0 {
                question
                    .options
                    .get(user_answer as usize)
                    .cloned()
                    .unwrap_or_else(|| "No answer selected".to_string())
            } else {
                "No answer selected".to_string()
            };

            QuestionResult {
                question_index: index,
                id: question.id.clone(),
                question: question.text.clone(),
                options: question.options.clone(),
                user_answer,
                correct_answer: question.correct_answer,
                is_correct,
                user_answer_text,
                correct_answer_text: usize::try_from(question.correct_answer)
                    .ok()
                    .and_then(|i| question.options.get(i))
                    .cloned()
                    .unwrap_or_default(),
                explanation: question.explanation.clone().unwrap_or_default(),
            }
        })
        .collect();

    let percentage = (correct_count as f64 / total_questions as f64 * 100.0).round() as i32;
    let (grade, message) = grade_for(percentage);

    QuizResult {
        total_questions,
        correct_count,
        incorrect_count: total_questions - correct_count,
        percentage,
        grade: grade.to_string(),
        message: message.to_string(),
        time_spent: time_spent.to_string(),
        question_results,
    }
}

/// Maps a score percentage to its grade band. First matching band from the
/// top wins; the strings are load-bearing for existing clients and stored
/// review records, so they must not change.
fn grade_for(percentage: i32) -> (&'static str, &'static str) {
    if percentage >= 90 {
        (
            "Excellent!",
            "Outstanding performance! You've mastered these concepts.",
        )
    } else if percentage >= 80 {
        ("Great Job!", "Very good understanding of the material.")
    } else if percentage >= 70 {
        (
            "Good Work!",
            "You've shown solid understanding of the concepts.",
        )
    } else if percentage >= 60 {
        (
            "Fair",
            "You have basic understanding, but there's room for improvement.",
        )
    } else {
        (
            "Needs Improvement",
            "Consider reviewing the material and trying again.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use serde_json::json;

    fn question(id: &str, correct: i32) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {id}"),
            options: vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ],
            correct_answer: correct,
            explanation: Some(format!("Because of {id}")),
        }
    }

    /// Four questions with correct answers [1, 3, 1, 2].
    fn fixture() -> QuizDefinition {
        QuizDefinition {
            module: "intro-ai".to_string(),
            quiz_id: "1".to_string(),
            title: Some("Introduction to AI - Quiz 1".to_string()),
            questions: vec![
                question("q1", 1),
                question("q2", 3),
                question("q3", 1),
                question("q4", 2),
            ],
        }
    }

    #[test]
    fn grades_the_reference_submission() {
        let def = fixture();
        let answers = normalize_answers(
            &RawAnswers::Encoded("[1,3,0,2]".to_string()),
            def.questions.len(),
        );
        let result = grade_quiz(&def, &answers, "2:30");

        assert_eq!(result.total_questions, 4);
        assert_eq!(result.correct_count, 3);
        assert_eq!(result.incorrect_count, 1);
        assert_eq!(result.percentage, 75);
        assert_eq!(result.grade, "Good Work!");
        assert_eq!(result.time_spent, "2:30");

        let missed = &result.question_results[2];
        assert!(!missed.is_correct);
        assert_eq!(missed.user_answer, 0);
        assert_eq!(missed.user_answer_text, "Option A");
        assert_eq!(missed.correct_answer_text, "Option B");
    }

    #[test]
    fn skipped_question_in_keyed_form_is_unanswered() {
        let def = fixture();
        // Mapping form with key "2" missing entirely.
        let raw = RawAnswers::Keyed(
            json!({"0": 1, "1": 3, "3": 2})
                .as_object()
                .unwrap()
                .clone(),
        );
        let answers = normalize_answers(&raw, def.questions.len());
        assert_eq!(answers, vec![1, 3, UNANSWERED, 2]);

        let result = grade_quiz(&def, &answers, "0:45");
        assert!(!result.question_results[2].is_correct);
        assert_eq!(result.question_results[2].user_answer_text, "No answer selected");
        assert_eq!(result.correct_count, 3);
    }

    #[test]
    fn counts_always_sum_to_total() {
        let def = fixture();
        for submission in [vec![1, 3, 1, 2], vec![0, 0, 0, 0], vec![-1, -1, -1, -1]] {
            let result = grade_quiz(&def, &submission, "1:00");
            assert_eq!(result.total_questions, def.questions.len());
            assert_eq!(result.correct_count + result.incorrect_count, result.total_questions);
        }
    }

    #[test]
    fn percentage_rounds_half_up() {
        let def = QuizDefinition {
            questions: (0..8).map(|i| question(&format!("q{i}"), 0)).collect(),
            ..fixture()
        };
        // 5 of 8 correct = 62.5% -> 63
        let answers = vec![0, 0, 0, 0, 0, 1, 1, 1];
        assert_eq!(grade_quiz(&def, &answers, "0:10").percentage, 63);

        // 1 of 3 correct = 33.33% -> 33, 2 of 3 = 66.67% -> 67
        let def3 = QuizDefinition {
            questions: (0..3).map(|i| question(&format!("q{i}"), 0)).collect(),
            ..fixture()
        };
        assert_eq!(grade_quiz(&def3, &[0, 1, 1], "0:10").percentage, 33);
        assert_eq!(grade_quiz(&def3, &[0, 0, 1], "0:10").percentage, 67);
    }

    #[test]
    fn percentage_matches_rounded_ratio_for_every_correct_count() {
        for total in [1usize, 3, 4, 7, 8, 10] {
            let def = QuizDefinition {
                questions: (0..total).map(|i| question(&format!("q{i}"), 0)).collect(),
                ..fixture()
            };
            for correct in 0..=total {
                let answers: Vec<i32> = (0..total)
                    .map(|i| if i < correct { 0 } else { 1 })
                    .collect();
                let expected = (correct as f64 / total as f64 * 100.0).round() as i32;
                assert_eq!(grade_quiz(&def, &answers, "0:01").percentage, expected);
            }
        }
    }

    #[test]
    fn grade_band_boundaries() {
        assert_eq!(grade_for(90).0, "Excellent!");
        assert_eq!(grade_for(89).0, "Great Job!");
        assert_eq!(grade_for(80).0, "Great Job!");
        assert_eq!(grade_for(79).0, "Good Work!");
        assert_eq!(grade_for(70).0, "Good Work!");
        assert_eq!(grade_for(69).0, "Fair");
        assert_eq!(grade_for(60).0, "Fair");
        assert_eq!(grade_for(59).0, "Needs Improvement");
        assert_eq!(grade_for(0).0, "Needs Improvement");
    }

    #[test]
    fn sentinel_never_matches_a_sentinel_answer_key() {
        // A definition authored with correctAnswer = -1 must not award points
        // for unanswered questions.
        let mut def = fixture();
        def.questions[0].correct_answer = -1;
        let result = grade_quiz(&def, &[-1, 3, 1, 2], "0:05");
        assert!(!result.question_results[0].is_correct);
        assert_eq!(result.correct_count, 3);
    }

    #[test]
    fn normalization_is_idempotent_for_valid_sequences() {
        let items: Vec<serde_json::Value> = vec![json!(1), json!(3), json!(0), json!(2)];
        let first = normalize_answers(&RawAnswers::Sequence(items), 4);
        let again = normalize_answers(
            &RawAnswers::Sequence(first.iter().map(|&a| json!(a)).collect()),
            4,
        );
        assert_eq!(first, again);
    }

    #[test]
    fn normalization_is_total_for_malformed_input() {
        for raw in [
            RawAnswers::Encoded("not json at all".to_string()),
            RawAnswers::Encoded("{\"weird\": true".to_string()),
            RawAnswers::Sequence(vec![json!(null), json!(true), json!("x")]),
            RawAnswers::Missing,
        ] {
            let answers = normalize_answers(&raw, 5);
            assert_eq!(answers.len(), 5);
            assert!(answers.iter().skip(3).all(|&a| a == UNANSWERED));
        }
    }

    #[test]
    fn short_sequences_are_padded_and_long_ones_truncated() {
        let short = normalize_answers(&RawAnswers::Encoded("[2]".to_string()), 3);
        assert_eq!(short, vec![2, UNANSWERED, UNANSWERED]);

        let long = normalize_answers(&RawAnswers::Encoded("[0,1,2,3,0,1]".to_string()), 3);
        assert_eq!(long, vec![0, 1, 2]);
    }

    #[test]
    fn string_indices_parse_and_junk_becomes_sentinel() {
        let raw = RawAnswers::Sequence(vec![json!("2"), json!(" 1 "), json!("two"), json!(1.5)]);
        assert_eq!(normalize_answers(&raw, 4), vec![2, 1, UNANSWERED, UNANSWERED]);
    }

    #[test]
    fn encoded_mapping_takes_the_keyed_path() {
        let raw = RawAnswers::Encoded(r#"{"0": "1", "2": 0}"#.to_string());
        assert_eq!(normalize_answers(&raw, 3), vec![1, UNANSWERED, 0]);
    }

    #[test]
    fn answers_array_takes_priority_over_answers() {
        let req = SubmitQuizRequest {
            answers_array: Some("[1,2]".to_string()),
            answers: Some(json!([0, 0])),
            time_spent: None,
        };
        assert_eq!(
            RawAnswers::from_submission(&req),
            RawAnswers::Encoded("[1,2]".to_string())
        );

        let legacy = SubmitQuizRequest {
            answers_array: None,
            answers: Some(json!({"0": 1})),
            time_spent: None,
        };
        assert!(matches!(RawAnswers::from_submission(&legacy), RawAnswers::Keyed(_)));

        let empty = SubmitQuizRequest {
            answers_array: None,
            answers: None,
            time_spent: None,
        };
        assert_eq!(RawAnswers::from_submission(&empty), RawAnswers::Missing);
    }

    #[test]
    fn parses_time_spent_minutes_and_seconds() {
        assert_eq!(parse_time_spent("2:30"), Some(150));
        assert_eq!(parse_time_spent("0:05"), Some(5));
        assert_eq!(parse_time_spent("12:00"), Some(720));
        assert_eq!(parse_time_spent(" 3:59 "), Some(239));
    }

    #[test]
    fn malformed_time_spent_is_none() {
        for raw in ["", "abc", "2:70", "1:2:3", "-1:30", ":30"] {
            assert_eq!(parse_time_spent(raw), None, "{raw:?}");
        }
    }
}
