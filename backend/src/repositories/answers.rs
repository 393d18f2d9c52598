//! Questionnaire answer repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use fitness_reminders_shared::{QuestionAnswer, SelectedOption};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Answer joined with its question
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: Option<String>,
    pub answer_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Option selected for one of the user's answers
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SelectedOptionRecord {
    pub user_answer_id: Uuid,
    pub value: Option<String>,
    pub option_text: Option<String>,
}

/// Questionnaire answer repository
pub struct AnswerRepository;

impl AnswerRepository {
    /// All answers of a user with their questions and selected options,
    /// most recent first
    pub async fn get_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<QuestionAnswer>> {
        let answers = sqlx::query_as::<_, AnswerRecord>(
            r#"
            SELECT ua.id, q.question AS question_text, q.answer_type AS question_type,
                   ua.answer_text, ua.created_at
            FROM user_answers ua
            JOIN questions q ON q.id = ua.question_id
            WHERE ua.user_id = $1
            ORDER BY ua.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let options = sqlx::query_as::<_, SelectedOptionRecord>(
            r#"
            SELECT uao.user_answer_id, ao.value, ao.option_text
            FROM user_answer_options uao
            JOIN answer_options ao ON ao.id = uao.option_id
            JOIN user_answers ua ON ua.id = uao.user_answer_id
            WHERE ua.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut options_by_answer: HashMap<Uuid, Vec<SelectedOption>> = HashMap::new();
        for option in options {
            options_by_answer
                .entry(option.user_answer_id)
                .or_default()
                .push(SelectedOption {
                    value: option.value,
                    label: option.option_text,
                });
        }

        Ok(answers
            .into_iter()
            .map(|answer| QuestionAnswer {
                options: options_by_answer.remove(&answer.id).unwrap_or_default(),
                question_text: answer.question_text,
                question_type: answer.question_type,
                answer_text: answer.answer_text,
                created_at: answer.created_at,
            })
            .collect())
    }
}
