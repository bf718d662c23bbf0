//! Visualization hooks
//!
//! A viewer can observe geometry and topology changes. Headless use
//! installs [`NoViewHooks`].

use fmdb_types::Handle;

/// Callbacks invoked after entity mutations
#[cfg_attr(test, mockall::automock)]
pub trait ViewHooks: Send + Sync {
    /// Payload or placement of `entity` changed
    fn on_geometry_changed(&self, _entity: Handle) {}

    /// `entity` was connected, disconnected or erased
    fn on_topology_changed(&self, _entity: Handle) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoViewHooks;

impl ViewHooks for NoViewHooks {}
