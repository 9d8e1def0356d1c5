//! The dietitian orchestrator.
//!
//! Wires prompts, the oracle, extraction, assembly, the session store, and
//! the renderer into the session-facing operations: chat, profile
//! extraction, plan generation, finalize, export, reset. Every operation
//! checks its state guard before building a prompt, so an out-of-order
//! request is rejected without any oracle traffic, and a failed oracle call
//! or failed extraction leaves the session exactly as it was.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::assembler::{self, AggregateMismatch};
use crate::export::{ExportError, PlanRenderer, RenderedDocument};
use crate::extract::{extract_plan, extract_profile, ExtractError};
use crate::prompt;
use crate::providers::{CompletionRequest, LlmProvider, OracleError};
use crate::session::{Session, SessionState, SessionStore, StateGuardError};
use crate::types::{ChatMessage, UserProfile, WeeklyDietPlan};

/// Failure of a dietitian operation.
#[derive(Debug, Error)]
pub enum DietitianError {
    /// The session id is not known to the store.
    #[error("unknown session {0}")]
    UnknownSession(Uuid),
    /// The operation is not allowed in the session's current state.
    #[error(transparent)]
    Guard(#[from] StateGuardError),
    /// The oracle call failed.
    #[error("oracle call failed: {0}")]
    Oracle(#[from] OracleError),
    /// The oracle responded but its output failed validation.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Rendering the plan failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Result of a plan generation: the corrected plan plus any aggregates the
/// assembler had to fix.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// The assembled plan, as stored on the session.
    pub plan: WeeklyDietPlan,
    /// Aggregate corrections applied during assembly. Empty for a plan
    /// whose arithmetic checked out.
    pub corrections: Vec<AggregateMismatch>,
}

/// Session-facing orchestrator.
pub struct Dietitian {
    oracle: Arc<dyn LlmProvider>,
    renderer: Arc<dyn PlanRenderer>,
    sessions: SessionStore,
}

impl Dietitian {
    /// Create an orchestrator over the given oracle and renderer.
    pub fn new(
        oracle: Arc<dyn LlmProvider>,
        renderer: Arc<dyn PlanRenderer>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            oracle,
            renderer,
            sessions,
        }
    }

    /// The session store backing this orchestrator.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a fresh session.
    pub fn start_session(&self) -> Uuid {
        let id = self.sessions.create();
        info!(session = %id, "session started");
        id
    }

    fn session(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, DietitianError> {
        self.sessions.get(id).ok_or(DietitianError::UnknownSession(id))
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// On success the exchange is appended to the transcript and an idle
    /// session enters Chatting. On failure the transcript is untouched.
    pub async fn chat(&self, id: Uuid, message: &str) -> Result<String, DietitianError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.guard_chat()?;

        let user = ChatMessage::user(message);
        let mut transcript = session.transcript().to_vec();
        transcript.push(user.clone());

        let settings = prompt::CHAT_SETTINGS;
        let response = self
            .oracle
            .complete(CompletionRequest {
                messages: prompt::chat_payload(&transcript),
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            })
            .await?;

        debug!(session = %id, model = %response.model, "chat reply received");
        let reply = response.text;
        session.record_exchange(user, ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// Extract and validate the user's profile from the conversation.
    ///
    /// Repeatable: running it again after more conversation replaces the
    /// stored profile, and any existing plan is discarded with it.
    pub async fn extract_profile(&self, id: Uuid) -> Result<UserProfile, DietitianError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.guard_extract_profile()?;

        let settings = prompt::EXTRACTION_SETTINGS;
        let response = self
            .oracle
            .complete(CompletionRequest {
                messages: prompt::profile_extraction_payload(session.transcript()),
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            })
            .await?;

        let profile = extract_profile(&response.text)?;
        info!(session = %id, name = %profile.name, goal = profile.goal.as_str(), "profile extracted");
        session.set_profile(profile.clone());
        Ok(profile)
    }

    /// Generate, validate, and assemble a weekly plan from the profile.
    pub async fn generate_plan(&self, id: Uuid) -> Result<PlanOutcome, DietitianError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.guard_generate_plan()?;

        // The guard guarantees a profile is present.
        let Some(profile) = session.profile().cloned() else {
            return Err(StateGuardError {
                operation: "generate a plan",
                state: session.state(),
            }
            .into());
        };

        let settings = prompt::PLAN_SETTINGS;
        let response = self
            .oracle
            .complete(CompletionRequest {
                messages: prompt::plan_generation_payload(&profile),
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            })
            .await?;

        let plan = extract_plan(&response.text)?;
        let (plan, corrections) = assembler::assemble(plan);
        info!(
            session = %id,
            days = plan.daily_plans.len(),
            corrections = corrections.len(),
            "plan generated"
        );
        session.set_plan(plan.clone());
        Ok(PlanOutcome { plan, corrections })
    }

    /// Close the session out. Only export remains afterwards.
    pub async fn finalize(&self, id: Uuid) -> Result<(), DietitianError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.guard_finalize()?;
        session.finalize();
        info!(session = %id, "session finalized");
        Ok(())
    }

    /// Render the assembled plan into a document.
    pub async fn export(&self, id: Uuid) -> Result<RenderedDocument, DietitianError> {
        let session = self.session(id)?;
        let session = session.lock().await;
        session.guard_export()?;

        // The guard guarantees a plan is present.
        let Some(plan) = session.plan() else {
            return Err(StateGuardError {
                operation: "export the plan",
                state: session.state(),
            }
            .into());
        };

        let document = self.renderer.render(plan)?;
        info!(session = %id, bytes = document.len(), "plan exported");
        Ok(document)
    }

    /// Discard everything in the session and return it to Idle.
    pub async fn reset(&self, id: Uuid) -> Result<(), DietitianError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.reset();
        info!(session = %id, "session reset");
        Ok(())
    }

    /// Current state of a session.
    pub async fn state(&self, id: Uuid) -> Result<SessionState, DietitianError> {
        let session = self.session(id)?;
        let state = session.lock().await.state();
        Ok(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::export::MarkdownRenderer;
    use crate::providers::OracleResponse;

    // ── Mock oracle ──

    /// Returns scripted responses in order and counts calls.
    struct ScriptedOracle {
        responses: StdMutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<String>) -> Self {
            Self {
                responses: StdMutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedOracle {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<OracleResponse, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(OracleError::Unavailable("script exhausted".to_owned()));
            }
            Ok(OracleResponse {
                text: responses.remove(0),
                model: "scripted".to_owned(),
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn profile_json() -> String {
        json!({
            "name": "Maria",
            "age": 30,
            "gender": "female",
            "height_cm": 167.6,
            "weight_kg": 81.6,
            "target_weight_kg": 68.0,
            "activity_level": "sedentary",
            "goal": "weight_loss",
            "dietary_restrictions": ["none"],
            "cooking_skill": "beginner"
        })
        .to_string()
    }

    fn plan_json() -> String {
        let meal = json!({
            "meal_time": "breakfast",
            "meal_name": "Oatmeal",
            "description": "Oats with berries.",
            "ingredients": ["oats", "berries"],
            "instructions": ["simmer oats"],
            "nutrition_info": {"calories": 1500, "protein": 90.0, "carbs": 150.0, "fat": 50.0},
            "prep_time": "5 min",
            "cooking_time": "10 min",
            "difficulty": "easy"
        });
        let days: Vec<_> = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
            .iter()
            .map(|d| {
                json!({
                    "day": d,
                    "meals": [meal],
                    "total_calories": 1500,
                    "total_protein": 90.0,
                    "total_carbs": 150.0,
                    "total_fat": 50.0
                })
            })
            .collect();
        json!({
            "user_profile": serde_json::from_str::<serde_json::Value>(&profile_json()).unwrap(),
            "daily_plans": days,
            "weekly_summary": {"total_calories": 10500, "avg_protein": 90.0, "avg_carbs": 150.0, "avg_fat": 50.0},
            "recommendations": ["keep going"],
            "shopping_list": ["oats", "berries"],
            "created_date": "2026-08-30"
        })
        .to_string()
    }

    fn dietitian(oracle: Arc<ScriptedOracle>) -> Dietitian {
        Dietitian::new(oracle, Arc::new(MarkdownRenderer), SessionStore::new())
    }

    #[tokio::test]
    async fn test_plan_generation_rejected_without_profile_and_costs_no_call() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        let err = dietitian.generate_plan(id).await.unwrap_err();
        assert!(matches!(err, DietitianError::Guard(_)));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_extraction_rejected_from_idle_without_oracle_call() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        let err = dietitian.extract_profile(id).await.unwrap_err();
        assert!(matches!(err, DietitianError::Guard(_)));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_then_extract_then_plan() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            "Tell me more about your goals.".to_owned(),
            format!("```json\n{}\n```", profile_json()),
            plan_json(),
        ]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        let reply = dietitian.chat(id, "I want to lose weight").await.unwrap();
        assert_eq!(reply, "Tell me more about your goals.");
        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Chatting);

        let profile = dietitian.extract_profile(id).await.unwrap();
        assert_eq!(profile.name, "Maria");
        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::ProfileReady);

        let outcome = dietitian.generate_plan(id).await.unwrap();
        assert_eq!(outcome.plan.daily_plans.len(), 7);
        assert!(outcome.corrections.is_empty());
        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::PlanReady);
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_session_chatting() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            "Got it.".to_owned(),
            "this is not json".to_owned(),
        ]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        dietitian.chat(id, "hello").await.unwrap();
        let err = dietitian.extract_profile(id).await.unwrap_err();
        assert!(matches!(err, DietitianError::Extract(_)));

        // State and transcript survive the failure.
        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Chatting);
        let session = dietitian.sessions().get(id).unwrap();
        assert_eq!(session.lock().await.transcript().len(), 2);
        assert!(session.lock().await.profile().is_none());
    }

    #[tokio::test]
    async fn test_failed_chat_leaves_transcript_untouched() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        let err = dietitian.chat(id, "hello").await.unwrap_err();
        assert!(matches!(err, DietitianError::Oracle(_)));

        let session = dietitian.sessions().get(id).unwrap();
        assert!(session.lock().await.transcript().is_empty());
        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_finalize_then_export_but_no_chat() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            "Hi.".to_owned(),
            profile_json(),
            plan_json(),
        ]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        dietitian.chat(id, "hello").await.unwrap();
        dietitian.extract_profile(id).await.unwrap();
        dietitian.generate_plan(id).await.unwrap();
        dietitian.finalize(id).await.unwrap();

        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Finalized);
        let document = dietitian.export(id).await.unwrap();
        assert!(!document.is_empty());

        let err = dietitian.chat(id, "one more thing").await.unwrap_err();
        assert!(matches!(err, DietitianError::Guard(_)));
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let oracle = Arc::new(ScriptedOracle::new(vec!["Hi.".to_owned()]));
        let dietitian = dietitian(oracle.clone());
        let id = dietitian.start_session();

        dietitian.chat(id, "hello").await.unwrap();
        dietitian.reset(id).await.unwrap();

        assert_eq!(dietitian.state(id).await.unwrap(), SessionState::Idle);
        let session = dietitian.sessions().get(id).unwrap();
        assert!(session.lock().await.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let dietitian = dietitian(oracle);
        let err = dietitian.chat(Uuid::new_v4(), "hello").await.unwrap_err();
        assert!(matches!(err, DietitianError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn test_plan_corrections_surface_in_outcome() {
        let bad_plan = plan_json().replace("\"total_calories\":1500", "\"total_calories\":1600");
        let oracle = Arc::new(ScriptedOracle::new(vec![
            "Hi.".to_owned(),
            profile_json(),
            bad_plan,
        ]));
        let dietitian = dietitian(oracle);
        let id = dietitian.start_session();

        dietitian.chat(id, "hello").await.unwrap();
        dietitian.extract_profile(id).await.unwrap();
        let outcome = dietitian.generate_plan(id).await.unwrap();

        assert!(!outcome.corrections.is_empty());
        for day in &outcome.plan.daily_plans {
            assert_eq!(day.total_calories, 1500);
        }
    }
}
