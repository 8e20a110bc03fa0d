//! Per-session directories.
//!
//! Hosts that serve many user sessions keep one [`ScopeDirectory`] per
//! session so that each session's capacity is independent. A
//! [`SessionRegistry`] creates those directories on demand with shared
//! settings and ends them when the session goes away.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::directory::{DirectorySettings, ScopeDirectory, ScopeDirectoryBuilder};
use crate::internal::FastMap;
use crate::key::{ScopeId, SessionId};
use crate::store::TeardownReport;
use crate::CacheResult;

/// Registry of one scope directory per session.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ScopeDirectory, SessionRegistry, FnFactory, Context};
///
/// let registry = SessionRegistry::new(ScopeDirectory::builder().max_active_scopes(1)).unwrap();
/// let factory = FnFactory::new(|_| 7u32).with_stable_id("seven").into_arc();
///
/// // Each session has its own capacity.
/// registry.directory_for("alice").store_for("view-1").get_or_create(&factory, Context::empty()).unwrap();
/// registry.directory_for("bob").store_for("view-1").get_or_create(&factory, Context::empty()).unwrap();
/// assert!(registry.directory_for("alice").contains("view-1"));
///
/// let report = registry.end_session("alice").unwrap();
/// assert_eq!(report.destroyed, 1);
/// assert_eq!(registry.len(), 1);
/// ```
pub struct SessionRegistry {
    sessions: RwLock<FastMap<SessionId, Arc<ScopeDirectory>>>,
    settings: DirectorySettings,
}

impl SessionRegistry {
    /// Creates a registry whose directories are configured like `builder`
    /// would configure a single one.
    pub fn new(builder: ScopeDirectoryBuilder) -> CacheResult<Self> {
        Ok(Self {
            sessions: RwLock::new(FastMap::default()),
            settings: builder.settings()?,
        })
    }

    /// Returns the directory for `session`, creating it if absent.
    pub fn directory_for(&self, session: impl Into<SessionId>) -> Arc<ScopeDirectory> {
        let session = session.into();
        if let Some(directory) = self.sessions.read().get(&session) {
            return directory.clone();
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session)
            .or_insert_with_key(|session| {
                tracing::debug!(session = %session, "session directory created");
                Arc::new(ScopeDirectory::from_settings(self.settings.clone()))
            })
            .clone()
    }

    /// Returns the directory for `session` without creating it.
    pub fn get(&self, session: impl Into<SessionId>) -> Option<Arc<ScopeDirectory>> {
        let session: SessionId = session.into();
        self.sessions.read().get(&session).cloned()
    }

    /// Removes `session` and ends every scope in it. `None` if the session
    /// is unknown.
    pub fn end_session(&self, session: impl Into<SessionId>) -> Option<TeardownReport> {
        let session: SessionId = session.into();
        let directory = self.sessions.write().remove(&session)?;
        let report = directory.end_all();
        tracing::debug!(
            session = %session,
            destroyed = report.destroyed,
            failed = report.failures.len(),
            "session ended"
        );
        Some(report)
    }

    /// Ends one scope of one session. `None` if either is unknown.
    pub fn end_scope(&self, session: impl Into<SessionId>, scope: impl Into<ScopeId>) -> Option<TeardownReport> {
        self.get(session)?.end(scope)
    }

    /// Known sessions, in no particular order.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ends every session.
    pub fn shutdown(&self) -> TeardownReport {
        let drained: Vec<_> = self.sessions.write().drain().collect();
        drained
            .into_iter()
            .map(|(_, directory)| directory.end_all())
            .collect()
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("max_active_scopes", &self.settings.max_active_scopes)
            .field("sessions", &self.len())
            .finish()
    }
}
