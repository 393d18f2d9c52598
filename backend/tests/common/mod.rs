//! Common test utilities for integration tests
//!
//! In-memory doubles for the reminder store and the push transport, so
//! scheduler ticks can be exercised without PostgreSQL or FCM.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use fitness_reminders_backend::error::NotifyResult;
use fitness_reminders_backend::push::{
    DeliveryError, NotificationDispatcher, PushMessage, PushTransport,
};
use fitness_reminders_backend::services::reminders::ReminderDeps;
use fitness_reminders_backend::store::{
    ReminderKind, ReminderStore, ReminderUser, UserTokenRecord, WeightSample,
};
use fitness_reminders_shared::{QuestionAnswer, UserProfile};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, ReminderUser>,
    weights: HashMap<Uuid, WeightSample>,
    photos: HashMap<Uuid, DateTime<Utc>>,
    answers: HashMap<Uuid, Vec<QuestionAnswer>>,
    steps: HashMap<(Uuid, NaiveDate), i64>,
    consumed: HashMap<(Uuid, NaiveDate), f64>,
    tokens: Vec<UserTokenRecord>,
    broken_users: HashSet<Uuid>,
    delete_calls: Vec<Vec<String>>,
}

/// Reminder store backed by hash maps
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        let user = ReminderUser {
            profile: UserProfile {
                id,
                is_active: true,
                ..Default::default()
            },
            ..Default::default()
        };
        self.inner.lock().unwrap().users.insert(id, user);
        id
    }

    pub fn add_token(&self, user_id: Uuid, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        let active = inner.users.get(&user_id).is_some_and(|u| u.profile.is_active);
        if active {
            inner.tokens.push(UserTokenRecord {
                user_id,
                token: token.to_string(),
            });
        }
    }

    pub fn set_weight(&self, user_id: Uuid, kg: f64, logged_at: DateTime<Utc>) {
        self.inner
            .lock()
            .unwrap()
            .weights
            .insert(user_id, WeightSample { kg, logged_at });
    }

    pub fn set_photo(&self, user_id: Uuid, taken_at: DateTime<Utc>) {
        self.inner.lock().unwrap().photos.insert(user_id, taken_at);
    }

    pub fn add_answer(&self, user_id: Uuid, answer: QuestionAnswer) {
        self.inner
            .lock()
            .unwrap()
            .answers
            .entry(user_id)
            .or_default()
            .push(answer);
    }

    pub fn set_steps(&self, user_id: Uuid, date: NaiveDate, steps: i64) {
        self.inner.lock().unwrap().steps.insert((user_id, date), steps);
    }

    pub fn set_consumed(&self, user_id: Uuid, date: NaiveDate, calories: f64) {
        self.inner
            .lock()
            .unwrap()
            .consumed
            .insert((user_id, date), calories);
    }

    pub fn set_last_reminder_at(&self, user_id: Uuid, kind: ReminderKind, at: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(&user_id) {
            match kind {
                ReminderKind::Weight => user.last_weight_reminder_at = Some(at),
                ReminderKind::ProgressPhoto => user.last_progress_photo_reminder_at = Some(at),
            }
        }
    }

    /// Make every read for this user fail
    pub fn break_user(&self, user_id: Uuid) {
        self.inner.lock().unwrap().broken_users.insert(user_id);
    }

    pub fn token_count(&self) -> usize {
        self.inner.lock().unwrap().tokens.len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .iter()
            .map(|r| r.token.clone())
            .collect()
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().delete_calls.clone()
    }

    pub fn reminder_user(&self, user_id: Uuid) -> ReminderUser {
        self.inner.lock().unwrap().users[&user_id].clone()
    }

    fn check(&self, user_id: Uuid) -> Result<()> {
        if self.inner.lock().unwrap().broken_users.contains(&user_id) {
            bail!("storage unavailable for user {}", user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for InMemoryStore {
    async fn latest_weight(&self, user_id: Uuid) -> Result<Option<WeightSample>> {
        self.check(user_id)?;
        Ok(self.inner.lock().unwrap().weights.get(&user_id).copied())
    }

    async fn latest_progress_photo_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        self.check(user_id)?;
        Ok(self.inner.lock().unwrap().photos.get(&user_id).copied())
    }

    async fn answers_for(&self, user_id: Uuid) -> Result<Vec<QuestionAnswer>> {
        self.check(user_id)?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .answers
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<ReminderUser>> {
        self.check(user_id)?;
        Ok(self.inner.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn steps_on(&self, user_id: Uuid, date: NaiveDate) -> Result<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .steps
            .get(&(user_id, date))
            .copied()
            .unwrap_or(0))
    }

    async fn consumed_calories_on(&self, user_id: Uuid, date: NaiveDate) -> Result<f64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .consumed
            .get(&(user_id, date))
            .copied()
            .unwrap_or(0.0))
    }

    async fn tokens_for_active_users(&self) -> Result<Vec<UserTokenRecord>> {
        Ok(self.inner.lock().unwrap().tokens.clone())
    }

    async fn all_tokens(&self) -> Result<Vec<String>> {
        Ok(self.tokens())
    }

    async fn delete_tokens(&self, tokens: &[String]) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls.push(tokens.to_vec());
        let before = inner.tokens.len();
        inner.tokens.retain(|r| !tokens.contains(&r.token));
        Ok((before - inner.tokens.len()) as u64)
    }

    async fn set_last_reminder(
        &self,
        user_id: Uuid,
        kind: ReminderKind,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.set_last_reminder_at(user_id, kind, at);
        Ok(())
    }
}

/// A message as the transport saw it
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// Push transport that records every batch
///
/// Tokens marked invalid fail as unregistered; everything else succeeds.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    invalid: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_invalid(&self, token: &str) {
        self.invalid.lock().unwrap().insert(token.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send_batch(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> NotifyResult<Vec<Result<(), DeliveryError>>> {
        self.sent.lock().unwrap().push(SentMessage {
            tokens: tokens.to_vec(),
            message: message.clone(),
        });
        let invalid = self.invalid.lock().unwrap();
        Ok(tokens
            .iter()
            .map(|t| {
                if invalid.contains(t) {
                    Err(DeliveryError::new(
                        "messaging/registration-token-not-registered",
                        "Requested entity was not found.",
                    ))
                } else {
                    Ok(())
                }
            })
            .collect())
    }
}

/// Reminder dependencies wired to the in-memory doubles
pub fn deps(store: &Arc<InMemoryStore>, transport: &Arc<RecordingTransport>) -> ReminderDeps {
    let dispatcher = NotificationDispatcher::new(transport.clone(), 500);
    ReminderDeps::new(store.clone(), dispatcher)
}

pub fn unconfigured_deps(store: &Arc<InMemoryStore>) -> ReminderDeps {
    ReminderDeps::new(store.clone(), NotificationDispatcher::unconfigured())
}

/// Questionnaire answer recorded `age_minutes` before now
pub fn answer(question: &str, text: &str, age_minutes: i64) -> QuestionAnswer {
    QuestionAnswer {
        question_text: question.to_string(),
        question_type: Some("text".to_string()),
        answer_text: Some(text.to_string()),
        options: Vec::new(),
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

/// User who wants to go from 80 kg to 75 kg in four weeks
pub fn seed_weight_loss_user(store: &InMemoryStore) -> Uuid {
    let user_id = store.add_user();
    store.add_answer(user_id, answer("What is your current weight?", "80 kg", 30));
    store.add_answer(user_id, answer("What is your goal weight?", "75 kg", 20));
    store.add_answer(
        user_id,
        answer("In how many weeks do you want to reach your goal?", "4 weeks", 10),
    );
    user_id
}
