use crate::ecs::{Component, ComponentId};

/// Declares which components a system reads and writes.
///
/// The scheduler does not enforce access at runtime; descriptors feed
/// registration checks and the writer diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    reads: Vec<ComponentId>,
    writes: Vec<ComponentId>,
}

impl SystemDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Add a read-only component.
    pub fn read<T: Component>(mut self) -> Self {
        insert_sorted(&mut self.reads, T::ID);
        self
    }

    /// Add a written component.
    pub fn write<T: Component>(mut self) -> Self {
        insert_sorted(&mut self.writes, T::ID);
        self
    }

    /// Add raw component ids to the read set.
    pub fn reads<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        for id in components {
            insert_sorted(&mut self.reads, id);
        }
        self
    }

    pub fn writes<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        for id in components {
            insert_sorted(&mut self.writes, id);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_components(&self) -> &[ComponentId] {
        &self.reads
    }

    pub fn write_components(&self) -> &[ComponentId] {
        &self.writes
    }

    pub fn writes_to(&self, component: ComponentId) -> bool {
        self.writes.binary_search(&component).is_ok()
    }

    /// Whether the descriptor touches any components at all.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty()
    }
}

fn insert_sorted(list: &mut Vec<ComponentId>, id: ComponentId) {
    if let Err(pos) = list.binary_search(&id) {
        list.insert(pos, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    struct A;
    struct B;
    define_component!(A, 11, "A");
    define_component!(B, 10, "B");

    #[test]
    fn builder_dedups_and_sorts() {
        let desc = SystemDescriptor::new("mover")
            .read::<A>()
            .read::<A>()
            .write::<A>()
            .write::<B>()
            .reads([12, 10]);
        assert_eq!(desc.name(), "mover");
        assert_eq!(desc.read_components(), &[10, 11, 12]);
        assert_eq!(desc.write_components(), &[10, 11]);
        assert!(desc.writes_to(B::ID));
        assert!(!desc.writes_to(12));
        assert!(!desc.is_empty());
        assert!(SystemDescriptor::new("idle").is_empty());
    }
}
