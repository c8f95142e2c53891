//! Host delegation.
//!
//! A unit is either synchronized natively or hosted by an external scripting
//! layer. The choice is made once, at construction, through [`SyncStrategy`].
//! Hosted units turn each delegable operation into exactly one [`HostEvent`]
//! and skip their native path. The host runs the native behaviour when it
//! wants it through `RenderableUnit::native()`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::resources::material::MacroPatch;

/// Notification sent to the host instead of running the native path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    UpdateTransform { stamp: u32 },
    UpdateUniforms { stamp: u32 },
    UpdateInstancedAttributes { sub_unit: usize },
    UpdateLocalDescriptors { sub_unit: usize },
    UpdateShDescriptors { sub_unit: usize },
    UpdateWorldBoundDescriptors { sub_unit: usize },
}

pub trait ScriptBridge {
    /// Fire-and-forget, synchronous notification.
    fn emit(&mut self, event: HostEvent);

    /// Macro patches the host wants for a sub-unit.
    fn macro_patches(&mut self, sub_unit: usize) -> Vec<MacroPatch> {
        let _ = sub_unit;
        Vec::new()
    }
}

pub enum SyncStrategy {
    Native,
    HostDelegated(Box<dyn ScriptBridge>),
}

impl SyncStrategy {
    #[inline]
    #[must_use]
    pub fn is_host_delegated(&self) -> bool {
        matches!(self, Self::HostDelegated(_))
    }

    /// Forwards `event` to the host. Returns true when the caller must skip its
    /// native path.
    pub(crate) fn delegate(&mut self, event: HostEvent) -> bool {
        match self {
            Self::Native => false,
            Self::HostDelegated(bridge) => {
                bridge.emit(event);
                true
            }
        }
    }

    pub(crate) fn host_macro_patches(&mut self, sub_unit: usize) -> Option<Vec<MacroPatch>> {
        match self {
            Self::Native => None,
            Self::HostDelegated(bridge) => Some(bridge.macro_patches(sub_unit)),
        }
    }
}

impl std::fmt::Debug for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("Native"),
            Self::HostDelegated(_) => f.write_str("HostDelegated"),
        }
    }
}

/// Bridge that queues events for the host to drain later.
///
/// Clones share the same queue: hand one clone to the unit and keep the other
/// on the host side.
#[derive(Debug, Clone, Default)]
pub struct HostEventQueue {
    events: Rc<RefCell<VecDeque<HostEvent>>>,
    patches: Rc<RefCell<Vec<MacroPatch>>>,
}

impl HostEventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches answered for every sub-unit.
    pub fn set_macro_patches(&self, patches: Vec<MacroPatch>) {
        *self.patches.borrow_mut() = patches;
    }

    #[must_use]
    pub fn drain(&self) -> Vec<HostEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl ScriptBridge for HostEventQueue {
    fn emit(&mut self, event: HostEvent) {
        self.events.borrow_mut().push_back(event);
    }

    fn macro_patches(&mut self, _sub_unit: usize) -> Vec<MacroPatch> {
        self.patches.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_strategy_never_delegates() {
        let mut strategy = SyncStrategy::Native;
        assert!(!strategy.delegate(HostEvent::UpdateTransform { stamp: 1 }));
        assert!(strategy.host_macro_patches(0).is_none());
    }

    #[test]
    fn hosted_strategy_queues_one_event_per_call() {
        let queue = HostEventQueue::new();
        let mut strategy = SyncStrategy::HostDelegated(Box::new(queue.clone()));

        assert!(strategy.delegate(HostEvent::UpdateUniforms { stamp: 3 }));
        assert!(strategy.delegate(HostEvent::UpdateTransform { stamp: 4 }));

        assert_eq!(
            queue.drain(),
            vec![
                HostEvent::UpdateUniforms { stamp: 3 },
                HostEvent::UpdateTransform { stamp: 4 },
            ]
        );
        assert!(queue.is_empty());
    }
}
