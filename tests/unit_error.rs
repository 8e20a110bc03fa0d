/// Unit tests for CacheError and CacheResult types

use ferrous_scopes::{CacheError, CacheResult};
use std::error::Error;

#[test]
fn test_error_display_identity_unavailable() {
    let error = CacheError::IdentityUnavailable("no id".to_string());
    assert_eq!(error.to_string(), "Factory identity unavailable: no id");
    assert_eq!(error.identity(), None);
}

#[test]
fn test_error_display_creation_failed() {
    let error = CacheError::CreationFailed {
        identity: "cart".to_string(),
        message: "backend offline".to_string(),
    };
    assert_eq!(error.to_string(), "Creation failed for cart: backend offline");
    assert_eq!(error.identity(), Some("cart"));
}

#[test]
fn test_error_display_destroy_failed() {
    let error = CacheError::DestroyFailed {
        identity: "cart".to_string(),
        message: "panicked: boom".to_string(),
    };
    let display_str = error.to_string();
    assert_eq!(display_str, "Destroy failed for cart: panicked: boom");
    assert_eq!(error.identity(), Some("cart"));
}

#[test]
fn test_error_display_capacity_misconfigured() {
    let error = CacheError::CapacityMisconfigured("session.max_active_views must be positive, got 0".to_string());
    let display_str = error.to_string();
    assert!(display_str.starts_with("Capacity misconfigured: "));
    assert!(display_str.contains("session.max_active_views"));
}

#[test]
fn test_error_display_type_mismatch() {
    let error = CacheError::TypeMismatch {
        identity: "cart".to_string(),
        expected: "u32",
    };
    assert_eq!(error.to_string(), "Type mismatch for cart: expected u32");
    assert_eq!(error.identity(), Some("cart"));
}

#[test]
fn test_error_trait_and_clone() {
    let error = CacheError::Config("bad file".to_string());
    let as_dyn: &dyn Error = &error;
    assert!(as_dyn.source().is_none());
    assert_eq!(error.clone(), error);
}

#[test]
fn test_result_alias() {
    fn fails() -> CacheResult<u32> {
        Err(CacheError::Config("missing".to_string()))
    }
    fn succeeds() -> CacheResult<u32> {
        Ok(3)
    }

    assert_eq!(succeeds(), Ok(3));
    assert!(matches!(fails(), Err(CacheError::Config(message)) if message == "missing"));
}
