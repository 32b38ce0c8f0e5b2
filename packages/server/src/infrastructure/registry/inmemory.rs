//! In-memory session registry.
//!
//! Membership is a `Vec` behind one `tokio::sync::Mutex`. Every operation,
//! fan-out included, runs to completion while holding the lock. Delivery into
//! a mailbox never waits, so the lock is never held across network I/O. A
//! recipient whose bounded mailbox is full has stopped reading and is evicted
//! like one whose writer has ended.
//!
//! Holding the lock for a whole login gives two guarantees:
//!
//! - the uniqueness check and the name assignment cannot interleave with
//!   another login, so at most one of two racing logins for a name wins;
//! - the newcomer's `online` list and the `online <newcomer>` fan-out describe
//!   the same membership, so nobody sees a presence event twice or misses one.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use natter_shared::protocol::ServerEvent;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{
    ChatError, Detached, LoginError, Outbox, SessionId, SessionInfo, SessionRegistry, UserName,
};

struct Entry {
    id: SessionId,
    name: Option<UserName>,
    outbox: Outbox,
    connected_at: DateTime<Utc>,
}

/// Registry implementation keeping every live session in process memory.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: Mutex<Vec<Entry>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn attach(&self, id: SessionId, outbox: Outbox) {
        let mut sessions = self.sessions.lock().await;
        sessions.push(Entry {
            id,
            name: None,
            outbox,
            connected_at: Utc::now(),
        });
        tracing::debug!("Session {} attached ({} live)", id, sessions.len());
    }

    async fn login(&self, id: SessionId, name: UserName) -> Result<(), LoginError> {
        let mut sessions = self.sessions.lock().await;

        let index = position(&sessions, id).ok_or(LoginError::Detached)?;
        if let Some(current) = &sessions[index].name {
            return Err(LoginError::AlreadyLoggedIn(current.to_string()));
        }
        if let Some(holder) = sessions
            .iter()
            .filter_map(|entry| entry.name.as_ref())
            .find(|held| held.collides_with(&name))
        {
            tracing::debug!("Login '{}' refused, held by '{}'", name, holder);
            return Err(LoginError::NameTaken(name.to_string()));
        }

        let mut greeting = vec![ServerEvent::LoginOk];
        greeting.extend(
            sessions
                .iter()
                .filter_map(|entry| entry.name.as_ref())
                .map(|other| ServerEvent::Online(other.to_string())),
        );

        let entry = &mut sessions[index];
        if let Some(failure) = greeting
            .into_iter()
            .find_map(|event| entry.outbox.push(event).err())
        {
            // Never visible to anyone else, so nobody is told it left.
            tracing::warn!("Login '{}' dropped: {}", name, undeliverable(&failure));
            entry.outbox.evict();
            sessions.remove(index);
            return Err(LoginError::Detached);
        }
        entry.name = Some(name.clone());

        tracing::info!("User '{}' logged in (session {})", name, id);
        broadcast(&mut sessions, ServerEvent::Online(name.to_string()), Some(id));

        Ok(())
    }

    async fn broadcast_message(&self, id: SessionId, body: String) -> Result<(), ChatError> {
        let mut sessions = self.sessions.lock().await;

        let index = position(&sessions, id).ok_or(ChatError::Detached)?;
        let from = sessions[index]
            .name
            .as_ref()
            .ok_or(ChatError::NotLoggedIn)?
            .to_string();

        tracing::info!("{}: {}", from, body);
        broadcast(&mut sessions, ServerEvent::Message { from, body }, None);

        Ok(())
    }

    async fn detach(&self, id: SessionId) -> Option<Detached> {
        let mut sessions = self.sessions.lock().await;

        let index = position(&sessions, id)?;
        let entry = sessions.remove(index);

        let notified = match &entry.name {
            Some(name) => broadcast(&mut sessions, ServerEvent::Offline(name.to_string()), None),
            None => 0,
        };
        tracing::debug!("Session {} detached ({} live)", id, sessions.len());

        Some(Detached {
            name: entry.name,
            notified,
        })
    }

    async fn snapshot(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|entry| SessionInfo {
                id: entry.id,
                name: entry.name.clone(),
                connected_at: entry.connected_at,
            })
            .collect()
    }

    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn position(sessions: &[Entry], id: SessionId) -> Option<usize> {
    sessions.iter().position(|entry| entry.id == id)
}

/// Deliver `event` to every authenticated session except `except`.
///
/// A recipient whose mailbox is closed or full is evicted on the spot and the
/// others are told it went offline, repeating until a round removes nobody.
/// Returns how many sessions received `event` itself.
fn broadcast(
    sessions: &mut Vec<Entry>,
    event: ServerEvent,
    except: Option<SessionId>,
) -> usize {
    let mut delivered = 0;
    let mut pending: VecDeque<UserName> =
        fan_out(sessions, &event, except, &mut delivered).into();
    while let Some(name) = pending.pop_front() {
        let offline = ServerEvent::Offline(name.to_string());
        pending.extend(fan_out(sessions, &offline, None, &mut 0));
    }

    delivered
}

fn fan_out(
    sessions: &mut Vec<Entry>,
    event: &ServerEvent,
    except: Option<SessionId>,
    delivered: &mut usize,
) -> Vec<UserName> {
    let mut departed = Vec::new();

    sessions.retain(|entry| {
        let Some(name) = &entry.name else {
            return true;
        };
        if Some(entry.id) == except {
            return true;
        }
        match entry.outbox.push(event.clone()) {
            Ok(()) => {
                *delivered += 1;
                tracing::debug!("Delivered '{}' to '{}'", event, name);
                true
            }
            Err(failure) => {
                tracing::warn!("Evicted '{}': {}", name, undeliverable(&failure));
                entry.outbox.evict();
                departed.push(name.clone());
                false
            }
        }
    });

    departed
}

fn undeliverable(failure: &TrySendError<ServerEvent>) -> &'static str {
    match failure {
        TrySendError::Full(_) => "mailbox full, client is not reading",
        TrySendError::Closed(_) => "connection is broken",
    }
}
