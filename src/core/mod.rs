//! # Core Module
//!
//! Shared-ownership primitives used by the rest of the crate.
//!
//! The store is single-threaded by construction, so the only container here is
//! `StResource`, an `Rc<RefCell<T>>` wrapper. Registry hooks capture clones of
//! it instead of a pointer to their owner, which is what makes them survive a
//! move of the owning store.

pub mod st_resource;

pub use st_resource::StResource;
