/// Property-based tests for directory capacity and eviction order
///
/// A directory is driven with random operation sequences and compared
/// against a plain least-recently-used model.

use ferrous_scopes::{Context, FnFactory, ObjectStore, ScopeDirectory};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Touch(u8),
    End(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8).prop_map(Op::Touch),
        1 => (0u8..8).prop_map(Op::End),
    ]
}

/// Least recently used first.
#[derive(Default)]
struct LruModel {
    order: Vec<String>,
}

impl LruModel {
    fn touch(&mut self, scope: &str, max: usize) -> Option<String> {
        if let Some(position) = self.order.iter().position(|s| s == scope) {
            let existing = self.order.remove(position);
            self.order.push(existing);
            return None;
        }
        self.order.push(scope.to_string());
        (self.order.len() > max).then(|| self.order.remove(0))
    }

    fn end(&mut self, scope: &str) -> bool {
        match self.order.iter().position(|s| s == scope) {
            Some(position) => {
                self.order.remove(position);
                true
            }
            None => false,
        }
    }
}

proptest! {
    #[test]
    fn directory_matches_lru_model(
        max in 1usize..5,
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = destroyed.clone();
        let factory = FnFactory::new(|_| ())
            .with_stable_id("unit")
            .on_destroy(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .into_arc();

        let directory = ScopeDirectory::new(max).unwrap();
        let mut model = LruModel::default();
        let mut expected_destroyed = 0;

        for op in ops {
            match op {
                Op::Touch(n) => {
                    let scope = format!("view-{n}");
                    directory.store_for(scope.as_str()).get_or_create(&factory, Context::empty()).unwrap();
                    if model.touch(&scope, max).is_some() {
                        expected_destroyed += 1;
                    }
                }
                Op::End(n) => {
                    let scope = format!("view-{n}");
                    let ended = directory.end(scope.as_str()).is_some();
                    prop_assert_eq!(ended, model.end(&scope));
                    if ended {
                        expected_destroyed += 1;
                    }
                }
            }

            prop_assert!(directory.len() <= max);
            let actual: Vec<String> = directory.scope_ids().iter().map(ToString::to_string).collect();
            prop_assert_eq!(&actual, &model.order);
            prop_assert_eq!(destroyed.load(Ordering::SeqCst), expected_destroyed);
        }
    }
}

proptest! {
    #[test]
    fn destroy_all_tears_down_each_entry_once(count in 0usize..20) {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let store = ObjectStore::new();

        for i in 0..count {
            let counter = destroyed.clone();
            let factory = FnFactory::new(move |_| i)
                .with_stable_id(format!("entry-{i}"))
                .on_destroy(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .into_arc();
            store.get_or_create(&factory, Context::empty()).unwrap();
        }

        let first = store.destroy_all();
        let second = store.destroy_all();

        prop_assert_eq!(first.destroyed, count);
        prop_assert!(second.is_empty());
        prop_assert_eq!(destroyed.load(Ordering::SeqCst), count);
    }
}
