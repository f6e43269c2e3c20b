use crate::ecs::{ComponentId, SystemDescriptor};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Handle assigned to each registered system; equals its position in the
/// run order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Errors that can occur while registering a system with the scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{name}' does not access any components")]
    EmptyAccess { name: String },
}

/// Validated, ordered set of system descriptors.
///
/// Several systems may write the same component; ordering between them is
/// the registration order. `writers_of` exposes that for diagnostics.
#[derive(Default)]
pub struct SystemRegistry {
    descriptors: Vec<SystemDescriptor>,
    by_name: HashMap<String, SystemHandle>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        if descriptor.is_empty() {
            return Err(SystemRegistrationError::EmptyAccess {
                name: descriptor.name().to_string(),
            });
        }
        if self.by_name.contains_key(descriptor.name()) {
            return Err(SystemRegistrationError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }

        let handle = SystemHandle(self.descriptors.len() as u32);
        self.by_name.insert(descriptor.name().to_string(), handle);
        self.descriptors.push(descriptor);
        Ok(handle)
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.descriptors.get(handle.index() as usize)
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.by_name.get(name).copied()
    }

    /// Names of systems declaring a write to `component`, in run order.
    pub fn writers_of(&self, component: ComponentId) -> Vec<&str> {
        self.descriptors
            .iter()
            .filter(|d| d.writes_to(component))
            .map(SystemDescriptor::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (SystemHandle(i as u32), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_and_empty_access() {
        let mut registry = SystemRegistry::new();
        let first = registry
            .register(SystemDescriptor::new("notes").writes([1]))
            .unwrap();
        assert_eq!(first.index(), 0);

        let dup = registry.register(SystemDescriptor::new("notes").reads([2]));
        assert_eq!(
            dup,
            Err(SystemRegistrationError::DuplicateName { name: "notes".into() })
        );

        let empty = registry.register(SystemDescriptor::new("idle"));
        assert_eq!(
            empty,
            Err(SystemRegistrationError::EmptyAccess { name: "idle".into() })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn shared_writers_are_listed_in_order() {
        let mut registry = SystemRegistry::new();
        registry
            .register(SystemDescriptor::new("interaction").writes([5, 6]))
            .unwrap();
        registry
            .register(SystemDescriptor::new("scoring").reads([6]).writes([7]))
            .unwrap();
        registry
            .register(SystemDescriptor::new("mood").writes([5]))
            .unwrap();

        assert_eq!(registry.writers_of(5), vec!["interaction", "mood"]);
        assert_eq!(registry.writers_of(6), vec!["interaction"]);
        assert!(registry.writers_of(99).is_empty());
        assert_eq!(registry.handle_of("scoring").map(SystemHandle::index), Some(1));
    }
}
