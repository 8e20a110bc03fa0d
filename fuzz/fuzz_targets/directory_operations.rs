#![no_main]

use ferrous_scopes::{Context, FnFactory, ScopeDirectory};
use libfuzzer_sys::fuzz_target;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Some((&capacity, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(capacity % 8) + 1;

    let created = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let factories: Vec<_> = (0..4)
        .map(|id| {
            let created = created.clone();
            let destroyed = destroyed.clone();
            FnFactory::new(move |_| created.fetch_add(1, Ordering::SeqCst))
                .with_stable_id(format!("factory-{id}"))
                .on_destroy(move |_, _| {
                    destroyed.fetch_add(1, Ordering::SeqCst);
                    if id == 3 {
                        Err("factory-3 always fails".into())
                    } else {
                        Ok(())
                    }
                })
                .into_arc()
        })
        .collect();

    let directory = ScopeDirectory::new(capacity).unwrap();

    for &op in ops {
        let scope = format!("view-{}", op & 0x0f);
        match op >> 6 {
            0 | 1 => {
                let factory = &factories[usize::from((op >> 4) & 0x03)];
                let store = directory.store_for(scope);
                let first = store.get_or_create(factory, Context::empty()).unwrap();
                let second = store.get_or_create(factory, Context::empty()).unwrap();
                assert!(Arc::ptr_eq(&first, &second));
            }
            2 => {
                let _ = directory.end(scope);
                assert!(!directory.contains(format!("view-{}", op & 0x0f)));
            }
            _ => {
                let _ = directory.end_all();
                assert!(directory.is_empty());
            }
        }
        assert!(directory.len() <= capacity);
    }

    drop(directory);
    // Every created instance was handed to destroy exactly once.
    assert_eq!(created.load(Ordering::SeqCst), destroyed.load(Ordering::SeqCst));
});
