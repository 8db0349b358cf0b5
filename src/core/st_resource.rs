use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// `StResource` lets several owners on the same thread share one mutable value.
/// The terrain store uses it to hand its instancing state to the registry hooks:
/// every hook closure holds a clone, so the hooks keep pointing at the live state
/// no matter where the store itself is moved.
///
/// # Examples
///
/// ```
/// use voxel_instancing::core::StResource;
///
/// let counter = StResource::new(0);
/// let shared = counter.clone();
///
/// *shared.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Panics
/// - Panics if a shared borrow is held while trying to borrow mutably
/// - Panics if a mutable borrow is held while trying to borrow at all
///
/// # Performance Considerations
/// - Not thread-safe - do not use across thread boundaries
/// - The `RefCell` adds a small runtime overhead for borrow checking
pub struct StResource<T> {
    resource: Rc<RefCell<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RefCell::new(resource)),
        }
    }

    /// Returns a guard that allows reading the contained value.
    ///
    /// # Panics
    /// Panics if the value is currently mutably borrowed.
    pub fn get(&self) -> Ref<'_, T> {
        self.resource.borrow()
    }

    /// Returns a guard that allows modifying the contained value.
    ///
    /// # Panics
    /// Panics if the value is currently borrowed.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.resource.borrow_mut()
    }

    /// Number of owners currently sharing the value.
    pub fn owners(&self) -> usize {
        Rc::strong_count(&self.resource)
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
