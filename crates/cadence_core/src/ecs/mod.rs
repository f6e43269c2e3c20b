//! Entity Component System core types.
//!
//! A generational entity arena with sparse-set component pools, a
//! synchronous event bus and an ordered system scheduler. Everything here
//! is single-threaded; hosts own one `World`, one `EventBus` and one
//! `Scheduler` and pass them by reference.

mod component;
mod entity;
mod event_bus;
mod scheduler;
mod system_descriptor;
mod system_registry;
pub mod storage;
mod world;

pub use component::{Component, ComponentId, ComponentMeta};
pub use entity::Entity;
pub use event_bus::{BusEvent, EventBus, SubscriptionId};
pub use scheduler::{Scheduler, System, TickContext, TickReport};
pub use system_descriptor::SystemDescriptor;
pub use system_registry::{SystemHandle, SystemRegistrationError, SystemRegistry};
pub use world::{Query, World, WorldError};

/// Lazily iterate entities owning every listed component type.
///
/// ```ignore
/// for entity in query!(world, Position, Velocity) { .. }
/// ```
#[macro_export]
macro_rules! query {
    ($world:expr, $($ty:ty),+ $(,)?) => {
        $world.query(&[$(<$ty as $crate::ecs::Component>::ID),+])
    };
}

/// Spawn an entity into the world with the given components.
///
/// Evaluates to `Result<Entity, WorldError>`. If any component is rejected
/// the half-built entity is queued for destruction and the error returned.
#[macro_export]
macro_rules! spawn {
    ($world:expr $(, $component:expr)+ $(,)?) => {{
        let world: &mut $crate::ecs::World = &mut $world;
        let entity = world.create_entity();
        let built: ::std::result::Result<(), $crate::ecs::WorldError> = (|| {
            $(
                world.add_component(entity, $component)?;
            )+
            Ok(())
        })();
        match built {
            Ok(()) => Ok(entity),
            Err(err) => {
                world.destroy_entity(entity);
                Err(err)
            }
        }
    }};
}
