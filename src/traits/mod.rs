//! Core traits for the scoped-object cache.

mod dispose;
mod factory;

pub use dispose::Dispose;
pub use factory::{Factory, FactoryResolver, FnFactory, Instance};
