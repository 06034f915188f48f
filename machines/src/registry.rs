//! Machine registry for front-end discovery.
//!
//! Each machine self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] holding its CLI name, a one-line description, and a
//! factory function. The front-end looks machines up at runtime without a
//! central list.

use a8remote_core::core::machine::Machine;

/// Describes a machine the host binary can drive.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "headless").
    pub name: &'static str,
    /// Shown in `--help` and in the unknown-machine error.
    pub description: &'static str,
    /// Factory: construct the machine in its power-on state.
    pub create: fn() -> Box<dyn Machine>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn() -> Box<dyn Machine>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
