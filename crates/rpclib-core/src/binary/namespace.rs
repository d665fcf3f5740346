//! Registry mapping [`BinaryId`]s to their [`BinaryClass`].

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, trace};

use super::{BinaryClass, BinaryId, TypedObject};
use crate::error::{Error, Result};

/// Registry of every wire type a peer can decode.
///
/// Built once at startup and then shared (usually behind an `Arc`) with the
/// encoders, decoders and clients that need it. Registration is idempotent;
/// there is no removal.
#[derive(Default)]
pub struct Namespace {
    classes: RwLock<HashMap<BinaryId, &'static BinaryClass>>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace holding the builtin variant boxes.
    pub fn with_builtins() -> Result<Self> {
        let namespace = Self::new();
        crate::any::register_builtins(&namespace)?;
        Ok(namespace)
    }

    /// Register `class` under its id.
    ///
    /// Registering the same class twice is a no-op. A different class under
    /// an id that is already taken is a [`Error::RegistryConflict`] and
    /// leaves the existing entry untouched.
    pub fn register(&self, class: &'static BinaryClass) -> Result<()> {
        let mut classes = self.classes.write().unwrap_or_else(|e| e.into_inner());
        match classes.get(&class.id()) {
            Some(existing) if existing.same_type(class) => Ok(()),
            Some(existing) => Err(Error::RegistryConflict {
                id: class.id(),
                existing: existing.name(),
                incoming: class.name(),
            }),
            None => {
                trace!("Registered {} as {}", class.name(), class.id());
                classes.insert(class.id(), class);
                Ok(())
            }
        }
    }

    /// Register a statically known type.
    pub fn add<T: TypedObject>(&self) -> Result<()> {
        self.register(T::binary_class())
    }

    /// Find the class registered under `id`.
    pub fn lookup(&self, id: &BinaryId) -> Result<&'static BinaryClass> {
        let classes = self.classes.read().unwrap_or_else(|e| e.into_inner());
        classes.get(id).copied().ok_or_else(|| {
            debug!("Namespace lookup failed for {}", id);
            Error::UnknownType { id: *id }
        })
    }

    pub fn contains(&self, id: &BinaryId) -> bool {
        self.classes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("classes", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, OnceLock};

    use super::*;
    use crate::binary_object;

    binary_object! {
        struct Alpha("test.Alpha") {
            value: u32,
        }
    }

    binary_object! {
        struct Beta("test.Beta") {
            value: u32,
        }
    }

    /// A second class claiming Alpha's id, as a diverged schema would.
    fn impostor() -> &'static BinaryClass {
        static CLASS: OnceLock<BinaryClass> = OnceLock::new();
        CLASS.get_or_init(|| BinaryClass::new::<Beta>("test.Alpha", &[("value", "u32".into())]))
    }

    #[test]
    fn test_register_and_lookup() {
        let ns = Namespace::new();
        ns.add::<Alpha>().unwrap();

        let class = ns.lookup(&Alpha::binary_id()).unwrap();
        assert_eq!(class.name(), "test.Alpha");
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_register_same_class_twice_is_idempotent() {
        let ns = Namespace::new();
        ns.add::<Alpha>().unwrap();
        ns.add::<Alpha>().unwrap();

        assert_eq!(ns.len(), 1);
        let class = ns.lookup(&Alpha::binary_id()).unwrap();
        assert!(class.same_type(Alpha::binary_class()));
    }

    #[test]
    fn test_conflicting_class_is_rejected() {
        let ns = Namespace::new();
        ns.add::<Alpha>().unwrap();
        assert_eq!(impostor().id(), Alpha::binary_id());

        let err = ns.register(impostor()).unwrap_err();
        assert!(matches!(err, Error::RegistryConflict { .. }));
        assert!(err.is_fatal());

        // The original registration survives.
        let class = ns.lookup(&Alpha::binary_id()).unwrap();
        assert!(class.same_type(Alpha::binary_class()));
    }

    #[test]
    fn test_lookup_unknown_id() {
        let ns = Namespace::new();
        let err = ns.lookup(&Beta::binary_id()).unwrap_err();
        assert!(matches!(err, Error::UnknownType { id } if id == Beta::binary_id()));
    }

    #[test]
    fn test_concurrent_registration_is_idempotent() {
        let ns = Arc::new(Namespace::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ns = Arc::clone(&ns);
                std::thread::spawn(move || {
                    ns.add::<Alpha>().unwrap();
                    ns.add::<Beta>().unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn test_with_builtins_registers_boxes() {
        let ns = Namespace::with_builtins().unwrap();
        assert!(!ns.is_empty());
        assert!(ns.contains(&crate::any::StringBox::binary_id()));
    }
}
