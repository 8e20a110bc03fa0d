/// Session registry tests

use ferrous_scopes::{CacheMetrics, Context, FnFactory, ScopeDirectory, SessionId, SessionRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting(destroyed: &Arc<AtomicUsize>) -> Arc<dyn ferrous_scopes::Factory> {
    let counter = destroyed.clone();
    FnFactory::new(|_| String::from("view state"))
        .with_stable_id("state")
        .on_destroy(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .into_arc()
}

#[test]
fn test_sessions_have_independent_capacity() {
    let registry = SessionRegistry::new(ScopeDirectory::builder().max_active_scopes(2)).unwrap();

    for session in ["alice", "bob"] {
        let directory = registry.directory_for(session);
        directory.store_for("v1");
        directory.store_for("v2");
    }

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.directory_for("alice").len(), 2);
    assert_eq!(registry.directory_for("bob").len(), 2);
}

#[test]
fn test_end_scope_and_session() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let factory = counting(&destroyed);
    let registry = SessionRegistry::new(ScopeDirectory::builder()).unwrap();

    let directory = registry.directory_for("alice");
    for view in ["v1", "v2", "v3"] {
        directory.store_for(view).get_or_create(&factory, Context::empty()).unwrap();
    }

    assert_eq!(registry.end_scope("alice", "v1").unwrap().destroyed, 1);
    assert!(registry.end_scope("alice", "v1").is_none());

    let report = registry.end_session("alice").unwrap();
    assert_eq!(report.destroyed, 2);
    assert_eq!(destroyed.load(Ordering::SeqCst), 3);
    assert!(registry.is_empty());

    // The handle outlives the session but holds nothing any more.
    assert!(directory.is_empty());
}

#[test]
fn test_shutdown_ends_everything() {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let factory = counting(&destroyed);
    let metrics = Arc::new(CacheMetrics::new());
    let registry = SessionRegistry::new(
        ScopeDirectory::builder()
            .max_active_scopes(4)
            .observer(metrics.clone()),
    )
    .unwrap();

    for session in 0..5 {
        registry
            .directory_for(format!("session-{session}"))
            .store_for("home")
            .get_or_create(&factory, Context::empty())
            .unwrap();
    }

    let mut sessions = registry.sessions();
    sessions.sort();
    assert_eq!(sessions.first(), Some(&SessionId::from("session-0")));

    let report = registry.shutdown();
    assert_eq!(report.destroyed, 5);
    assert!(report.is_clean());
    assert!(registry.is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.scopes_created, 5);
    assert_eq!(snapshot.scopes_ended, 5);
    assert_eq!(snapshot.live_instances(), 0);
}
