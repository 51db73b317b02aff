//! Quiz Generation
//!
//! Prompt construction and tolerant normalization of the provider's raw quiz
//! payload into the typed `Quiz` shape.

use serde_json::Value;

use crate::models::quiz::{Quiz, QuizQuestion};
use crate::services::provider::{extract_json_object, QuizRequest};
use crate::utils::error::{AppError, AppResult};

/// Build the quiz generation prompt.
pub fn build_quiz_prompt(request: &QuizRequest) -> String {
    format!(
        r#"You are preparing a commit readiness quiz. The developer is about to commit the changes below; quiz them on what the changes actually do so careless commits get caught.

Write exactly {count} multiple-choice questions about these changes. Each question has 3-4 choices with exactly one correct answer. Ask about behavior, edge cases, and intent - not trivia.

Respond in this exact JSON format:
{{
  "questions": [
    {{
      "prompt": "What does the new retry loop do when the third attempt fails?",
      "choices": ["Returns the last error", "Panics", "Retries forever"],
      "answerIndex": 0,
      "explanation": "The loop propagates the final error after maxRetries."
    }}
  ]
}}

Changed files:
{files}

Diff:
```
{context}
```"#,
        count = request.question_count,
        files = request.focus_files.join("\n"),
        context = request.prompt_context,
    )
}

/// Normalize a raw provider payload into a `Quiz`.
///
/// Tolerant of provider sloppiness: questions missing a prompt or with fewer
/// than two choices are skipped, out-of-range answer indexes are clamped.
/// Fails (non-retryable) only when no usable question survives.
pub fn normalize_quiz_payload(
    raw: &Value,
    focus_files: Vec<String>,
) -> AppResult<Quiz> {
    let payload = match raw {
        Value::String(text) => extract_json_object(text).ok_or_else(|| {
            AppError::generation_failed("provider returned no JSON quiz payload", false)
        })?,
        other => other.clone(),
    };

    let raw_questions = payload
        .get("questions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut questions = Vec::new();
    for (i, entry) in raw_questions.iter().enumerate() {
        let Some(prompt) = entry.get("prompt").and_then(Value::as_str) else {
            continue;
        };
        let choices: Vec<String> = entry
            .get("choices")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if choices.len() < 2 {
            continue;
        }
        let answer_index = entry
            .get("answerIndex")
            .and_then(Value::as_u64)
            .map(|index| (index as u32).min(choices.len() as u32 - 1))
            .unwrap_or(0);
        let explanation = entry
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string);
        questions.push(QuizQuestion {
            id: format!("q{}", i + 1),
            prompt: prompt.to_string(),
            choices,
            answer_index,
            explanation,
        });
    }

    if questions.is_empty() {
        return Err(AppError::generation_failed(
            "provider payload contained no usable questions",
            false,
        ));
    }

    Ok(Quiz {
        questions,
        focus_files,
    })
}
