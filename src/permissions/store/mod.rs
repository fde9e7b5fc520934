/*!
 * Store Module
 * Actor directory and per-actor override store
 */

mod directory;

pub use directory::{
    load_overrides_or_empty, with_store_timeout, ActorDirectory, DirectorySnapshot,
    InMemoryDirectory, LoadedOverrides, OverrideStore,
};

#[cfg(test)]
pub use directory::{MockActorDirectory, MockOverrideStore};
