// component.rs - Component identity
//
// Components are identified by stable u32 IDs declared next to the type,
// not by Rust TypeIds. Pools are keyed by these IDs.

pub type ComponentId = u32;

/// Static description of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
}

/// Trait for data attached to entities.
///
/// Implementors must pick an ID that is unique among all components used
/// with the same `World`. A clash is reported by `add_component` as
/// `WorldError::ComponentIdClash`.
pub trait Component: 'static + Sized {
    /// Stable component ID.
    const ID: ComponentId;

    /// Human-readable name for logging and system descriptors.
    const NAME: &'static str;

    fn meta() -> ComponentMeta {
        ComponentMeta {
            id: Self::ID,
            name: Self::NAME,
        }
    }
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, 1, "Position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
}
