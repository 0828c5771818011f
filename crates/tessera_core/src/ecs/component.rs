// component.rs - Component identity and registration
//
// Components are identified by stable u32 IDs rather than Rust TypeIds, so
// archetype hashes and save data stay identical between builds. Registration
// also hands out a dense offset per component, which worlds use to index
// their stash tables and filters use to order their include lists.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::mem::{align_of, size_of};
use std::sync::{PoisonError, RwLock};

pub type ComponentId = u32;

/// Metadata describing a registered component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: String,
    pub size: usize,
    pub align: usize,
    /// Dense, process-wide registration index.
    pub offset: usize,
}

#[derive(Default)]
struct Registry {
    by_id: HashMap<ComponentId, ComponentMeta>,
    next_offset: usize,
}

/// Global registry shared by every world in the process.
static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Register a component, returning its metadata.
///
/// Registering the same id again is a no-op that returns the existing
/// entry; the name and layout must match the first registration.
pub fn register_component(id: ComponentId, name: &str, size: usize, align: usize) -> ComponentMeta {
    if let Some(meta) = meta_of(id) {
        check_matches(&meta, name, size, align);
        return meta;
    }

    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(meta) = registry.by_id.get(&id) {
        // Lost a race with another registering thread.
        check_matches(meta, name, size, align);
        return meta.clone();
    }

    let meta = ComponentMeta {
        id,
        name: name.to_string(),
        size,
        align,
        offset: registry.next_offset,
    };
    registry.next_offset += 1;
    registry.by_id.insert(id, meta.clone());
    tracing::debug!(id, name, offset = meta.offset, "registered component");
    meta
}

fn check_matches(prev: &ComponentMeta, name: &str, size: usize, align: usize) {
    assert_eq!(
        prev.name, name,
        "Component id {} registered as both {} and {}",
        prev.id, prev.name, name
    );
    assert_eq!(
        prev.size, size,
        "Component size mismatch for id {}: was {}, now {}",
        prev.id, prev.size, size
    );
    assert_eq!(
        prev.align, align,
        "Component align mismatch for id {}: was {}, now {}",
        prev.id, prev.align, align
    );
}

/// Look up component metadata by ID.
pub fn meta_of(id: ComponentId) -> Option<ComponentMeta> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_id
        .get(&id)
        .cloned()
}

/// Trait for component types.
///
/// Any `'static` value type can be a component. Implement it with
/// [`define_component!`](crate::define_component) rather than by hand.
pub trait Component: 'static + Sized + Send + Sync {
    /// Globally unique component ID.
    const ID: ComponentId;

    /// Human-readable name for debugging.
    const NAME: &'static str;

    /// Register this component with the global registry.
    /// Cheap after the first call.
    fn ensure_registered() -> ComponentMeta {
        register_component(Self::ID, Self::NAME, size_of::<Self>(), align_of::<Self>())
    }
}

/// Helper macro to implement Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, 1, "Position");
/// define_component!(Velocity, 2); // name defaults to the type name
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
    ($ty:ty, $id:expr) => {
        $crate::define_component!($ty, $id, stringify!($ty));
    };
}
