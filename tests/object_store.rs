/// Object store integration tests
///
/// Lookup, creation and identity behavior of a single store.

use ferrous_scopes::{
    BoxError, CacheError, Context, Factory, FnFactory, IdentityCache, Instance, ObjectStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===== Test Services =====

#[derive(Debug)]
struct ShoppingCart {
    owner: String,
}

struct CountingFactory {
    id: &'static str,
    creates: AtomicUsize,
}

impl CountingFactory {
    fn new(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            creates: AtomicUsize::new(0),
        })
    }
}

impl Factory for CountingFactory {
    fn create(&self, ctx: &Context) -> Result<Instance, BoxError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let owner = ctx.get::<&str>().copied().unwrap_or("anonymous");
        Ok(Arc::new(ShoppingCart {
            owner: owner.to_string(),
        }))
    }

    fn stable_id(&self) -> Option<&str> {
        Some(self.id)
    }
}

// ===== Tests =====

#[test]
fn test_get_or_create_reuses_instance() {
    let counting = CountingFactory::new("cart");
    let factory: Arc<dyn Factory> = counting.clone();
    let store = ObjectStore::new();

    let first = store.get_or_create(&factory, Context::new("ada")).unwrap();
    let second = store.get_or_create(&factory, Context::new("grace")).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(counting.creates.load(Ordering::SeqCst), 1);

    // The first caller's context is the one used for creation.
    let cart = store.get_typed::<ShoppingCart>(factory.as_ref()).unwrap().unwrap();
    assert_eq!(cart.owner, "ada");
}

#[test]
fn test_distinct_factories_with_same_identity_share_entry() {
    let first = FnFactory::new(|_| 1u32).with_stable_id("counter").into_arc();
    let second = FnFactory::new(|_| 2u32).with_stable_id("counter").into_arc();
    let store = ObjectStore::new();

    let a = store.get_or_create_typed::<u32>(&first, Context::empty()).unwrap();
    let b = store.get_or_create_typed::<u32>(&second, Context::empty()).unwrap();

    assert_eq!(*a, 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_get_does_not_create() {
    let factory = FnFactory::new(|_| ShoppingCart { owner: "x".into() })
        .with_stable_id("cart")
        .into_arc();
    let store = ObjectStore::new();

    assert!(store.get(factory.as_ref()).unwrap().is_none());
    assert!(!store.contains("cart"));
    assert!(store.is_empty());

    store.get_or_create(&factory, Context::empty()).unwrap();
    assert!(store.get(factory.as_ref()).unwrap().is_some());
    assert!(store.get_by_identity("cart").is_some());
}

#[test]
fn test_creation_failure_stores_nothing_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let factory = FnFactory::<String>::fallible(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err("first attempt fails".into())
        } else {
            Ok("ready".to_string())
        }
    })
    .with_stable_id("flaky")
    .into_arc();
    let store = ObjectStore::new();

    let error = store.get_or_create(&factory, Context::empty()).unwrap_err();
    assert_eq!(
        error,
        CacheError::CreationFailed {
            identity: "flaky".to_string(),
            message: "first attempt fails".to_string(),
        }
    );
    assert!(store.is_empty());

    let value = store.get_or_create_typed::<String>(&factory, Context::empty()).unwrap();
    assert_eq!(value.as_str(), "ready");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panicking_create_is_reported_as_failure() {
    let factory = FnFactory::<u8>::new(|_| panic!("constructor exploded"))
        .with_stable_id("boom")
        .into_arc();
    let store = ObjectStore::new();

    match store.get_or_create(&factory, Context::empty()) {
        Err(CacheError::CreationFailed { identity, message }) => {
            assert_eq!(identity, "boom");
            assert!(message.contains("constructor exploded"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(store.is_empty());
}

#[test]
fn test_identity_unavailable() {
    struct Nameless;

    impl Factory for Nameless {
        fn create(&self, _ctx: &Context) -> Result<Instance, BoxError> {
            Ok(Arc::new(()))
        }

        fn type_name(&self) -> Option<&'static str> {
            None
        }
    }

    let factory: Arc<dyn Factory> = Arc::new(Nameless);
    let store = ObjectStore::new();
    assert!(matches!(
        store.get_or_create(&factory, Context::empty()),
        Err(CacheError::IdentityUnavailable(_))
    ));
}

#[test]
fn test_typed_lookup_mismatch() {
    let factory = FnFactory::new(|_| 5u64).with_stable_id("number").into_arc();
    let other = FnFactory::new(|_| String::new()).with_stable_id("number").into_arc();
    let store = ObjectStore::new();

    store.get_or_create(&factory, Context::empty()).unwrap();
    let result = store.get_or_create_typed::<String>(&other, Context::empty());
    assert!(matches!(result, Err(CacheError::TypeMismatch { ref identity, .. }) if identity == "number"));
}

#[test]
fn test_explicit_identity() {
    let factory = FnFactory::new(|_| 1u8).into_arc();
    let store = ObjectStore::new();

    let a = store.get_or_create_with_identity("slot-a", &factory, Context::empty()).unwrap();
    let b = store.get_or_create_with_identity("slot-b", &factory, Context::empty()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    let identities: Vec<String> = store.identities().iter().map(ToString::to_string).collect();
    assert_eq!(identities, vec!["slot-a", "slot-b"]);
}

#[test]
fn test_shared_identity_cache() {
    let identities = IdentityCache::shared();
    let first = ObjectStore::new().with_identity_cache(identities.clone());
    let second = ObjectStore::new().with_identity_cache(identities.clone());
    let factory = FnFactory::new(|_| 0i32).with_stable_id("zero").into_arc();

    first.get_or_create(&factory, Context::empty()).unwrap();
    second.get_or_create(&factory, Context::empty()).unwrap();

    assert_eq!(identities.len(), 1);
}

#[test]
fn test_store_usable_after_teardown() {
    let factory = FnFactory::new(|_| vec![0u8; 4]).with_stable_id("buffer").into_arc();
    let store = ObjectStore::new();

    let before = store.get_or_create(&factory, Context::empty()).unwrap();
    assert_eq!(store.destroy_all().destroyed, 1);

    let after = store.get_or_create(&factory, Context::empty()).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(store.len(), 1);
}
