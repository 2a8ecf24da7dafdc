use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::metrics::BROADCAST_DELIVERIES;
use crate::protocol::ServerMessage;

pub type SessionId = Uuid;

/// One open push channel.
///
/// The sender is the only handle to the channel's writer; dropping the
/// session closes the outbound side.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    sender: mpsc::UnboundedSender<ServerMessage>,
    pub url: Option<String>,
    pub locales: Vec<String>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<i64>,
    pub connected_at: DateTime<Utc>,
}

/// Read-only view of a session for callers outside the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub url: Option<String>,
    pub locales: Vec<String>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<i64>,
    pub connected_at: DateTime<Utc>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            url: session.url.clone(),
            locales: session.locales.clone(),
            timezone: session.timezone.clone(),
            timezone_offset: session.timezone_offset,
            connected_at: session.connected_at,
        }
    }
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<SessionId, Session>,
    by_url: HashMap<String, HashSet<SessionId>>,
}

impl Sessions {
    fn unindex(&mut self, id: SessionId, url: &str) {
        if let Some(ids) = self.by_url.get_mut(url) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_url.remove(url);
            }
        }
    }

    fn set_url(&mut self, id: SessionId, url: &str) -> bool {
        let Some(session) = self.by_id.get_mut(&id) else {
            return false;
        };
        let previous = session.url.replace(url.to_string());
        if let Some(previous) = previous {
            self.unindex(id, &previous);
        }
        self.by_url.entry(url.to_string()).or_default().insert(id);
        true
    }
}

/// Registry of live sessions.
///
/// Interest in a URL is never stored as a subscription: a broadcast reaches
/// whoever displays the URL at the moment it is sent.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Sessions>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened channel. It displays nothing until mounted.
    pub fn register(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> SessionId {
        let id = Uuid::new_v4();
        let session = Session {
            id,
            sender,
            url: None,
            locales: Vec::new(),
            timezone: None,
            timezone_offset: None,
            connected_at: Utc::now(),
        };
        self.inner.lock().unwrap().by_id.insert(id, session);
        info!(session = %id, "Session registered");
        id
    }

    /// Record the client's environment and the URL it displays.
    pub fn mount(
        &self,
        id: SessionId,
        url: &str,
        locales: Vec<String>,
        timezone: Option<String>,
        timezone_offset: Option<i64>,
    ) -> bool {
        let mut sessions = self.inner.lock().unwrap();
        if !sessions.set_url(id, url) {
            return false;
        }
        if let Some(session) = sessions.by_id.get_mut(&id) {
            session.locales = locales;
            session.timezone = timezone;
            session.timezone_offset = timezone_offset;
        }
        debug!(session = %id, url, "Session mounted");
        true
    }

    /// Point the session at `url`. Returns false for unknown sessions.
    pub fn update_navigation(&self, id: SessionId, url: &str) -> bool {
        let updated = self.inner.lock().unwrap().set_url(id, url);
        if updated {
            debug!(session = %id, url, "Session navigated");
        }
        updated
    }

    /// Remove the session, dropping its channel sender.
    pub fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.inner.lock().unwrap();
        let Some(session) = sessions.by_id.remove(&id) else {
            return false;
        };
        if let Some(url) = &session.url {
            sessions.unindex(id, url);
        }
        info!(session = %id, "Session unregistered");
        true
    }

    /// Send to one session. A failed send unregisters it.
    pub fn send_to(&self, id: SessionId, message: ServerMessage) -> bool {
        let sender = {
            let sessions = self.inner.lock().unwrap();
            match sessions.by_id.get(&id) {
                Some(session) => session.sender.clone(),
                None => return false,
            }
        };
        if sender.send(message).is_ok() {
            true
        } else {
            self.unregister(id);
            false
        }
    }

    /// Deliver `message` to every session currently displaying `url`.
    ///
    /// Best effort: a failed delivery does not stop the others, and the
    /// failing session is unregistered. Returns the number of deliveries.
    pub fn broadcast_to(&self, url: &str, message: &ServerMessage) -> usize {
        let targets: Vec<(SessionId, mpsc::UnboundedSender<ServerMessage>)> = {
            let sessions = self.inner.lock().unwrap();
            match sessions.by_url.get(url) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| sessions.by_id.get(id))
                    .map(|session| (session.id, session.sender.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, sender) in targets {
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
                BROADCAST_DELIVERIES.with_label_values(&["delivered"]).inc();
            } else {
                BROADCAST_DELIVERIES.with_label_values(&["dropped"]).inc();
                debug!(session = %id, url, "Dropping session after failed delivery");
                self.unregister(id);
            }
        }
        delivered
    }

    /// Sessions currently displaying `url`.
    pub fn sessions_at(&self, url: &str) -> Vec<SessionId> {
        let sessions = self.inner.lock().unwrap();
        sessions
            .by_url
            .get(url)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: SessionId) -> Option<SessionSnapshot> {
        self.inner
            .lock()
            .unwrap()
            .by_id
            .get(&id)
            .map(SessionSnapshot::from)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str) -> ServerMessage {
        ServerMessage::update_text("#downloadProgress", t)
    }

    #[test]
    fn test_broadcast_reaches_only_matching_url() {
        let registry = SessionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(tx_a);
        let b = registry.register(tx_b);

        registry.mount(a, "/video/abc", vec!["en".into()], None, Some(0));
        registry.update_navigation(b, "/");

        assert_eq!(registry.broadcast_to("/video/abc", &text("1%")), 1);
        assert_eq!(rx_a.try_recv().unwrap(), text("1%"));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_navigating_away_stops_delivery() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);

        registry.update_navigation(id, "/video/abc");
        registry.broadcast_to("/video/abc", &text("1%"));
        registry.update_navigation(id, "/");
        registry.broadcast_to("/video/abc", &text("2%"));

        assert_eq!(rx.try_recv().unwrap(), text("1%"));
        assert!(rx.try_recv().is_err());
        assert!(registry.sessions_at("/video/abc").is_empty());
        assert_eq!(registry.sessions_at("/"), vec![id]);
    }

    #[test]
    fn test_failed_delivery_unregisters_only_that_session() {
        let registry = SessionRegistry::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let dead = registry.register(tx_dead);
        let live = registry.register(tx_live);
        registry.update_navigation(dead, "/video/abc");
        registry.update_navigation(live, "/video/abc");
        drop(rx_dead);

        assert_eq!(registry.broadcast_to("/video/abc", &text("5%")), 1);
        assert_eq!(rx_live.try_recv().unwrap(), text("5%"));
        assert!(registry.get(dead).is_none());
        assert!(registry.get(live).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_mount_records_environment() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);

        assert!(registry.mount(
            id,
            "/",
            vec!["en-US".into(), "fr".into()],
            Some("Europe/Paris".into()),
            Some(-60),
        ));

        let snapshot = registry.get(id).unwrap();
        assert_eq!(snapshot.url.as_deref(), Some("/"));
        assert_eq!(snapshot.locales, vec!["en-US", "fr"]);
        assert_eq!(snapshot.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(snapshot.timezone_offset, Some(-60));
    }

    #[test]
    fn test_snapshot_is_detached_from_session() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);
        registry.update_navigation(id, "/video/abc");

        let before = registry.get(id).unwrap();
        assert_eq!(registry.get(id), Some(before.clone()));

        registry.update_navigation(id, "/");
        assert_eq!(before.url.as_deref(), Some("/video/abc"));
        assert_ne!(registry.get(id), Some(before));
    }

    #[test]
    fn test_unknown_sessions_are_ignored() {
        let registry = SessionRegistry::new();
        let ghost = Uuid::new_v4();
        assert!(!registry.update_navigation(ghost, "/"));
        assert!(!registry.unregister(ghost));
        assert!(!registry.send_to(ghost, text("x")));
        assert_eq!(registry.broadcast_to("/nowhere", &text("x")), 0);
    }

    #[test]
    fn test_unregister_cleans_url_index() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);
        registry.update_navigation(id, "/video/abc");

        assert!(registry.unregister(id));
        assert!(registry.sessions_at("/video/abc").is_empty());
        assert!(registry.is_empty());
    }
}
