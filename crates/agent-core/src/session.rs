//! Session Management
//!
//! The [`SessionManager`] owns every session and its history. A turn gets
//! write access through a [`TurnLease`], which is the single-owner lock for
//! that session: a second concurrent turn is either rejected with
//! `SessionBusy` or queued, depending on [`BusyPolicy`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Owner
    pub user_id: String,

    /// Append-only history
    pub history: Vec<Message>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Turns started so far
    pub turns: usize,
}

impl Session {
    fn new(id: SessionId, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            turns: 0,
        }
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Title generated from the first user message
    pub fn title(&self) -> String {
        self.history
            .iter()
            .find(|m| m.role == crate::message::Role::User)
            .and_then(Message::text)
            .map_or_else(
                || format!("Session {}", &self.id.0[..8.min(self.id.0.len())]),
                |text| {
                    let preview: String = text.chars().take(50).collect();
                    if text.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                },
            )
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

/// What to do when a turn starts on a session that already has one running
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Fail with `SessionBusy`
    #[default]
    Reject,
    /// Wait for the running turn to finish
    Queue,
}

struct Slot {
    session: Session,
    turn_lock: Arc<Mutex<()>>,
}

/// In-memory owner of all sessions
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Slot>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Slot>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Slot>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh, empty session for `user_id`
    pub fn create_session(&self, user_id: impl Into<String>) -> Result<Session> {
        self.insert(SessionId::new(), user_id.into())
    }

    fn insert(&self, id: SessionId, user_id: String) -> Result<Session> {
        let mut sessions = self.write();
        if sessions.contains_key(&id) {
            tracing::error!(session = %id, "Session id collision");
            return Err(AgentError::SessionIdExhausted);
        }
        let session = Session::new(id.clone(), user_id);
        tracing::info!(session = %id, user = %session.user_id, "Session created");
        sessions.insert(
            id,
            Slot {
                session: session.clone(),
                turn_lock: Arc::default(),
            },
        );
        Ok(session)
    }

    /// Snapshot of a session
    pub fn get_session(&self, id: &SessionId) -> Result<Session> {
        self.read()
            .get(id)
            .map(|slot| slot.session.clone())
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    /// Copy of the history
    pub fn history(&self, id: &SessionId) -> Result<Vec<Message>> {
        self.read()
            .get(id)
            .map(|slot| slot.session.history.clone())
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    /// Append one message; returns its position in the history.
    ///
    /// Each append is a single push under the write lock, so a message is
    /// either fully present or absent.
    pub fn append(&self, id: &SessionId, message: Message) -> Result<usize> {
        let mut sessions = self.write();
        let slot = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        slot.session.history.push(message);
        slot.session.updated_at = Utc::now();
        Ok(slot.session.history.len() - 1)
    }

    /// Sessions owned by `user_id`, most recently active first
    pub fn list_sessions(&self, user_id: &str) -> Vec<Session> {
        let mut result: Vec<_> = self
            .read()
            .values()
            .filter(|slot| slot.session.user_id == user_id)
            .map(|slot| slot.session.clone())
            .collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result
    }

    /// Remove a session; refused while a turn is running on it
    pub fn delete_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.write();
        let slot = sessions
            .get(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        if slot.turn_lock.try_lock().is_err() {
            return Err(AgentError::SessionBusy(id.to_string()));
        }
        sessions.remove(id);
        tracing::info!(session = %id, "Session deleted");
        Ok(())
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Claim the session for one turn
    pub async fn begin_turn(self: &Arc<Self>, id: &SessionId, policy: BusyPolicy) -> Result<TurnLease> {
        let turn_lock = self
            .read()
            .get(id)
            .map(|slot| slot.turn_lock.clone())
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;

        let guard = match policy {
            BusyPolicy::Reject => turn_lock
                .try_lock_owned()
                .map_err(|_| AgentError::SessionBusy(id.to_string()))?,
            BusyPolicy::Queue => turn_lock.lock_owned().await,
        };

        let turn_index = {
            let mut sessions = self.write();
            let slot = sessions
                .get_mut(id)
                .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
            slot.session.turns += 1;
            slot.session.turns
        };
        tracing::debug!(session = %id, turn = turn_index, "Turn started");

        Ok(TurnLease {
            id: id.clone(),
            turn_index,
            manager: self.clone(),
            _guard: guard,
        })
    }
}

/// Exclusive write access to one session for the duration of a turn.
/// Released on drop.
pub struct TurnLease {
    id: SessionId,
    turn_index: usize,
    manager: Arc<SessionManager>,
    _guard: OwnedMutexGuard<()>,
}

impl TurnLease {
    pub const fn session_id(&self) -> &SessionId {
        &self.id
    }

    pub const fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Append a message stamped with this turn's index
    pub fn append(&self, mut message: Message) -> Result<usize> {
        message.turn_index = self.turn_index;
        self.manager.append(&self.id, message)
    }

    /// Current history
    pub fn history(&self) -> Result<Vec<Message>> {
        self.manager.history(&self.id)
    }
}

impl std::fmt::Debug for TurnLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnLease")
            .field("session", &self.id)
            .field("turn_index", &self.turn_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_session_creation() {
        let manager = SessionManager::new();
        let session = manager.create_session("alice").unwrap();
        assert_eq!(session.user_id, "alice");
        assert_eq!(session.message_count(), 0);

        let loaded = manager.get_session(&session.id).unwrap();
        assert_eq!(loaded.id, session.id);
    }

    #[test]
    fn test_unknown_session() {
        let manager = SessionManager::new();
        let err = manager.get_session(&SessionId::from_string("nope")).unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(id) if id == "nope"));
        assert!(manager.append(&SessionId::from_string("nope"), Message::user("x")).is_err());
    }

    #[test]
    fn test_id_collision_is_fatal() {
        let manager = SessionManager::new();
        let id = SessionId::from_string("fixed");
        manager.insert(id.clone(), "alice".into()).unwrap();
        assert!(matches!(
            manager.insert(id, "bob".into()),
            Err(AgentError::SessionIdExhausted)
        ));
    }

    #[test]
    fn test_append_preserves_order() {
        let manager = SessionManager::new();
        let id = manager.create_session("alice").unwrap().id;
        assert_eq!(manager.append(&id, Message::user("first")).unwrap(), 0);
        assert_eq!(manager.append(&id, Message::agent("second")).unwrap(), 1);

        let history = manager.history(&id).unwrap();
        assert_eq!(history[0].text(), Some("first"));
        assert_eq!(history[1].role, Role::Agent);
    }

    #[tokio::test]
    async fn test_second_turn_rejected_while_first_runs() {
        let manager = Arc::new(SessionManager::new());
        let id = manager.create_session("alice").unwrap().id;

        let lease = manager.begin_turn(&id, BusyPolicy::Reject).await.unwrap();
        assert_eq!(lease.turn_index(), 1);
        let err = manager.begin_turn(&id, BusyPolicy::Reject).await.unwrap_err();
        assert!(matches!(err, AgentError::SessionBusy(_)));
        assert!(matches!(manager.delete_session(&id), Err(AgentError::SessionBusy(_))));

        drop(lease);
        let lease = manager.begin_turn(&id, BusyPolicy::Reject).await.unwrap();
        assert_eq!(lease.turn_index(), 2);
    }

    #[tokio::test]
    async fn test_queued_turn_waits_for_release() {
        let manager = Arc::new(SessionManager::new());
        let id = manager.create_session("alice").unwrap().id;

        let first = manager.begin_turn(&id, BusyPolicy::Queue).await.unwrap();
        let waiter = {
            let manager = manager.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let lease = manager.begin_turn(&id, BusyPolicy::Queue).await.unwrap();
                lease.append(Message::user("second")).unwrap();
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        first.append(Message::user("first")).unwrap();
        drop(first);
        waiter.await.unwrap();

        let history = manager.history(&id).unwrap();
        assert_eq!(history[0].text(), Some("first"));
        assert_eq!(history[0].turn_index, 1);
        assert_eq!(history[1].turn_index, 2);
    }

    #[test]
    fn test_list_and_delete() {
        let manager = SessionManager::new();
        let a = manager.create_session("alice").unwrap().id;
        manager.create_session("alice").unwrap();
        manager.create_session("bob").unwrap();

        assert_eq!(manager.list_sessions("alice").len(), 2);
        manager.delete_session(&a).unwrap();
        assert_eq!(manager.list_sessions("alice").len(), 1);
        assert_eq!(manager.len(), 2);
    }
}
