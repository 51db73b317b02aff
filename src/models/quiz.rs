//! Quiz Models
//!
//! Generated commit-readiness quizzes, answer submissions, and grades.

use serde::{Deserialize, Serialize};

/// Minimum score (percent correct) to pass the quiz.
pub const QUIZ_PASS_PERCENT: u32 = 70;

/// One multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question id, unique within the quiz
    pub id: String,
    /// Question text
    pub prompt: String,
    /// Answer choices (at least two)
    pub choices: Vec<String>,
    /// Index of the correct choice in `choices`
    pub answer_index: u32,
    /// Optional explanation shown after grading
    pub explanation: Option<String>,
}

/// A generated quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// Questions in presentation order
    pub questions: Vec<QuizQuestion>,
    /// Files the quiz was generated from
    pub focus_files: Vec<String>,
}

/// Per-question grading outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionGrade {
    /// Question id
    pub question_id: String,
    /// Index the user selected
    pub selected_index: u32,
    /// Whether the selection matched the answer key
    pub correct: bool,
}

/// Result of grading a full answer submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGrade {
    /// Per-question outcomes, in question order
    pub questions: Vec<QuestionGrade>,
    /// Number of correct answers
    pub correct: u32,
    /// Total number of questions
    pub total: u32,
    /// Score as a rounded percentage
    pub score_percent: u32,
    /// Whether the score meets [`QUIZ_PASS_PERCENT`]
    pub passed: bool,
}

impl QuizGrade {
    /// Grade a submission against the quiz's answer key.
    ///
    /// Callers validate the submission length before grading.
    pub fn grade(quiz: &Quiz, answers: &[u32]) -> Self {
        let questions: Vec<QuestionGrade> = quiz
            .questions
            .iter()
            .zip(answers.iter())
            .map(|(question, &selected)| QuestionGrade {
                question_id: question.id.clone(),
                selected_index: selected,
                correct: selected == question.answer_index,
            })
            .collect();

        let correct = questions.iter().filter(|q| q.correct).count() as u32;
        let total = questions.len() as u32;
        let score_percent = if total == 0 {
            0
        } else {
            (correct * 100 + total / 2) / total
        };

        Self {
            questions,
            correct,
            total,
            score_percent,
            passed: score_percent >= QUIZ_PASS_PERCENT,
        }
    }
}
