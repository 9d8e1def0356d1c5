//! Session state machine and in-memory session store.
//!
//! A session moves through five states:
//!
//! ```text
//! Idle -> Chatting -> ProfileReady -> PlanReady -> Finalized
//! ```
//!
//! Chat advances Idle to Chatting and is allowed in every state except
//! Finalized. Extraction requires conversation to have happened, plan
//! generation requires a profile, export requires a plan. Guards are checked
//! here, before any oracle work is attempted, so an out-of-order request
//! never costs a network call. Reset returns to Idle from anywhere and
//! discards everything.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{ChatMessage, UserProfile, WeeklyDietPlan};

/// Where a session currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fresh session, no conversation yet.
    Idle,
    /// Conversation in progress, no validated profile.
    Chatting,
    /// Profile extracted and validated.
    ProfileReady,
    /// Weekly plan generated and assembled.
    PlanReady,
    /// Session closed out; only export remains.
    Finalized,
}

impl SessionState {
    /// Human-readable name, used in logs and guard errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Chatting => "chatting",
            Self::ProfileReady => "profile_ready",
            Self::PlanReady => "plan_ready",
            Self::Finalized => "finalized",
        }
    }
}

/// An operation was requested from a state that does not permit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} while session is {}", state.as_str())]
pub struct StateGuardError {
    /// The rejected operation.
    pub operation: &'static str,
    /// The state the session was in.
    pub state: SessionState,
}

/// One user's conversation, profile, and plan.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    transcript: Vec<ChatMessage>,
    profile: Option<UserProfile>,
    plan: Option<WeeklyDietPlan>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh idle session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            transcript: Vec::new(),
            profile: None,
            plan: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Full conversation so far, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// The validated profile, once extraction has succeeded.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// The assembled plan, once generation has succeeded.
    pub fn plan(&self) -> Option<&WeeklyDietPlan> {
        self.plan.as_ref()
    }

    // ── guards ──

    /// Check that chat is allowed. Finalized sessions are read-only.
    pub fn guard_chat(&self) -> Result<(), StateGuardError> {
        match self.state {
            SessionState::Finalized => Err(StateGuardError {
                operation: "chat",
                state: self.state,
            }),
            _ => Ok(()),
        }
    }

    /// Check that profile extraction is allowed.
    ///
    /// Requires at least one exchange. Re-extraction from ProfileReady or
    /// PlanReady is permitted; a successful re-run replaces the profile.
    pub fn guard_extract_profile(&self) -> Result<(), StateGuardError> {
        let err = || StateGuardError {
            operation: "extract a profile",
            state: self.state,
        };
        match self.state {
            SessionState::Idle | SessionState::Finalized => Err(err()),
            _ if self.transcript.is_empty() => Err(err()),
            _ => Ok(()),
        }
    }

    /// Check that plan generation is allowed. Requires a validated profile.
    pub fn guard_generate_plan(&self) -> Result<(), StateGuardError> {
        match self.state {
            SessionState::ProfileReady | SessionState::PlanReady if self.profile.is_some() => {
                Ok(())
            }
            _ => Err(StateGuardError {
                operation: "generate a plan",
                state: self.state,
            }),
        }
    }

    /// Check that export is allowed. Requires an assembled plan.
    pub fn guard_export(&self) -> Result<(), StateGuardError> {
        match self.state {
            SessionState::PlanReady | SessionState::Finalized if self.plan.is_some() => Ok(()),
            _ => Err(StateGuardError {
                operation: "export the plan",
                state: self.state,
            }),
        }
    }

    /// Check that finalization is allowed. Only PlanReady can finalize.
    pub fn guard_finalize(&self) -> Result<(), StateGuardError> {
        match self.state {
            SessionState::PlanReady => Ok(()),
            _ => Err(StateGuardError {
                operation: "finalize",
                state: self.state,
            }),
        }
    }

    // ── transitions ──

    /// Record one chat exchange and enter Chatting if still Idle.
    ///
    /// Callers must have passed [`Self::guard_chat`] first; the exchange is
    /// appended only after the oracle reply arrived, so a failed oracle call
    /// leaves the transcript untouched.
    pub fn record_exchange(&mut self, user: ChatMessage, assistant: ChatMessage) {
        self.transcript.push(user);
        self.transcript.push(assistant);
        if self.state == SessionState::Idle {
            self.state = SessionState::Chatting;
        }
    }

    /// Store a validated profile and enter ProfileReady.
    ///
    /// A re-extraction from PlanReady discards the existing plan, since it
    /// was built from the profile being replaced.
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
        self.plan = None;
        self.state = SessionState::ProfileReady;
    }

    /// Store an assembled plan and enter PlanReady.
    pub fn set_plan(&mut self, plan: WeeklyDietPlan) {
        self.plan = Some(plan);
        self.state = SessionState::PlanReady;
    }

    /// Close the session out. Transcript, profile, and plan stay readable.
    pub fn finalize(&mut self) {
        self.state = SessionState::Finalized;
    }

    /// Discard everything and return to Idle. Allowed from any state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// In-memory store of sessions keyed by id.
///
/// Each session sits behind its own async mutex, so operations on one
/// session serialize while distinct sessions proceed concurrently. The store
/// itself is cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<std::sync::Mutex<HashMap<Uuid, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session and return its id.
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(Session::new())));
        id
    }

    /// Look up a session by id.
    pub fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Look up a session, creating it under the given id if absent.
    pub fn get_or_create(&self, id: Uuid) -> Arc<Mutex<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// Drop a session entirely.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
