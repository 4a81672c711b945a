//! Hook registry
//!
//! Keeps the detach handles a component installed so they can be removed one
//! by one or all at once (e.g. when a plugin is disabled).

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use crate::config::HookConfig;
use crate::detach::{attach_detachable, Detach, SlotOwner};
use crate::error::HookResult;
use crate::func::Hook;

new_key_type! {
    /// Handle for a hook held by a [`HookRegistry`]
    pub struct HookKey;
}

/// Storage for a registered hook
struct HookEntry {
    /// Attachment order, used to unwind stacked hooks newest first
    seq: u64,

    /// Restores the original slot
    detach: Detach,
}

#[derive(Default)]
struct Hooks {
    entries: SlotMap<HookKey, HookEntry>,
    next_seq: u64,
}

/// Registry of detachable hooks
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<Hooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a detachable hook and keep its handle
    ///
    /// # Errors
    /// [`HookError::InvalidTarget`](crate::HookError::InvalidTarget) if the slot is absent
    pub fn attach<O: SlotOwner>(
        &self,
        owner: &O,
        name: &str,
        config: HookConfig<
            <O::Slot as Hook>::Args,
            <O::Slot as Hook>::Output,
            <O::Slot as Hook>::Error,
        >,
    ) -> HookResult<HookKey> {
        let detach = attach_detachable(owner, name, config)?;
        Ok(self.adopt(detach))
    }

    /// Take ownership of an existing handle
    pub fn adopt(&self, detach: Detach) -> HookKey {
        let mut hooks = self.hooks.write();
        let seq = hooks.next_seq;
        hooks.next_seq += 1;

        tracing::debug!("Registered hook '{}'", detach.name());
        hooks.entries.insert(HookEntry { seq, detach })
    }

    /// Detach and forget one hook
    ///
    /// # Returns
    /// `true` if the hook was registered and this call restored it
    pub fn detach(&self, key: HookKey) -> bool {
        // Release the registry lock before restoring
        let entry = self.hooks.write().entries.remove(key);
        entry.map(|e| e.detach.detach()).unwrap_or(false)
    }

    /// Detach every hook, newest first, so stacked hooks on one slot unwind
    /// back to the original
    ///
    /// # Returns
    /// The number of hooks restored
    pub fn detach_all(&self) -> usize {
        let mut entries: Vec<HookEntry> = {
            let mut hooks = self.hooks.write();
            hooks.entries.drain().map(|(_, entry)| entry).collect()
        };
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));

        let restored = entries.iter().filter(|e| e.detach.detach()).count();
        if restored > 0 {
            tracing::info!("Detached {} hooks", restored);
        }
        restored
    }

    pub fn is_attached(&self, key: HookKey) -> bool {
        self.hooks.read().entries.contains_key(key)
    }

    /// Slot names of registered hooks in attachment order
    pub fn active(&self) -> Vec<String> {
        let hooks = self.hooks.read();
        let mut entries: Vec<&HookEntry> = hooks.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.iter().map(|e| e.detach.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().entries.is_empty()
    }
}
