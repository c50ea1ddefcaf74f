//! The module rack: owner of every module instance and its outgoing links.
//!
//! Messages travel synchronously. `send` delivers to each matching receiver
//! in link order; whatever a receiver emits while handling the message is
//! dispatched depth-first before `send` moves on to the next link.
//!
//! Two limits keep cycles in the patch graph finite: a nesting depth, and a
//! budget of deliveries shared by everything one top-level send sets off.

use std::collections::BTreeMap;

use super::context::TickContext;
use super::module_trait::{Module, ModuleId, Outbox};
use crate::patch::{PortDescriptor, RoutingError};

/// Default bound on nested deliveries within one `send`.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 32;

/// Default bound on the total deliveries one `send` may cause.
pub const DEFAULT_MAX_DELIVERIES_PER_SEND: usize = 4096;

struct Slot {
    module: Box<dyn Module>,
    /// Receiver descriptors, in the order they were patched.
    outgoing_links: Vec<PortDescriptor>,
}

/// Holds the modules of a session and routes their messages.
pub struct ModuleRack {
    slots: BTreeMap<ModuleId, Slot>,
    next_id: u64,
    max_dispatch_depth: usize,
    max_deliveries_per_send: usize,
}

/// Deliveries left to one top-level send.
struct Budget {
    remaining: usize,
    spent: bool,
}

impl Budget {
    fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            spent: false,
        }
    }

    fn take(&mut self) -> bool {
        if self.remaining == 0 {
            self.spent = true;
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl ModuleRack {
    pub fn new() -> Self {
        Self::with_max_dispatch_depth(DEFAULT_MAX_DISPATCH_DEPTH)
    }

    /// Creates a rack that drops messages nested deeper than `depth`.
    pub fn with_max_dispatch_depth(depth: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            next_id: 1,
            max_dispatch_depth: depth.max(1),
            max_deliveries_per_send: DEFAULT_MAX_DELIVERIES_PER_SEND,
        }
    }

    pub fn max_dispatch_depth(&self) -> usize {
        self.max_dispatch_depth
    }

    pub fn set_max_dispatch_depth(&mut self, depth: usize) {
        self.max_dispatch_depth = depth.max(1);
    }

    pub fn max_deliveries_per_send(&self) -> usize {
        self.max_deliveries_per_send
    }

    /// Caps how many `receive` calls a single send may trigger in total.
    pub fn set_max_deliveries_per_send(&mut self, limit: usize) {
        self.max_deliveries_per_send = limit.max(1);
    }

    /// Adds a module and returns its handle.
    pub fn add<M: Module>(&mut self, module: M) -> ModuleId {
        self.add_boxed(Box::new(module))
    }

    /// Adds an already boxed module, as produced by the registry.
    pub fn add_boxed(&mut self, module: Box<dyn Module>) -> ModuleId {
        let id = ModuleId(self.next_id);
        self.next_id += 1;
        log::debug!("{} added to rack as {}", module.info().id, id);
        self.slots.insert(
            id,
            Slot {
                module,
                outgoing_links: Vec::new(),
            },
        );
        id
    }

    /// Removes a module along with every link pointing at it.
    ///
    /// Links are normally gone already because the patcher tears down a
    /// module's connections first; any left over are logged.
    pub fn remove(&mut self, id: ModuleId) -> Option<Box<dyn Module>> {
        let slot = self.slots.remove(&id)?;
        for (owner, other) in self.slots.iter_mut() {
            let before = other.outgoing_links.len();
            other.outgoing_links.retain(|link| link.module != id);
            let dropped = before - other.outgoing_links.len();
            if dropped > 0 {
                log::warn!("{} still had {} link(s) into removed {}", owner, dropped, id);
            }
        }
        Some(slot.module)
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Module handles in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.slots.keys().copied()
    }

    pub fn module(&self, id: ModuleId) -> Option<&dyn Module> {
        self.slots.get(&id).map(|slot| slot.module.as_ref())
    }

    /// Borrows a module as its concrete type.
    pub fn module_ref<T: Module>(&self, id: ModuleId) -> Option<&T> {
        self.slots.get(&id)?.module.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows a module as its concrete type.
    pub fn module_mut<T: Module>(&mut self, id: ModuleId) -> Option<&mut T> {
        self.slots
            .get_mut(&id)?
            .module
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Receivers the module currently sends to, in patch order.
    pub fn outgoing_links(&self, id: ModuleId) -> &[PortDescriptor] {
        self.slots
            .get(&id)
            .map(|slot| slot.outgoing_links.as_slice())
            .unwrap_or(&[])
    }

    /// Appends `receiver` to the sender module's outgoing links.
    ///
    /// Only the patcher calls this; modules never wire themselves.
    pub(crate) fn add_outgoing_link(
        &mut self,
        sender: ModuleId,
        receiver: PortDescriptor,
    ) -> Result<(), RoutingError> {
        if !self.slots.contains_key(&receiver.module) {
            return Err(RoutingError::UnknownModule(receiver.module));
        }
        let slot = self
            .slots
            .get_mut(&sender)
            .ok_or(RoutingError::UnknownModule(sender))?;
        slot.outgoing_links.push(receiver);
        Ok(())
    }

    /// Removes the first outgoing link equal to `target`.
    ///
    /// Returns false if the module or the link is absent.
    pub fn remove_outgoing_link(&mut self, id: ModuleId, target: &PortDescriptor) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        match slot.outgoing_links.iter().position(|link| link == target) {
            Some(index) => {
                slot.outgoing_links.remove(index);
                true
            }
            None => false,
        }
    }

    /// Sends `payload` from module `id` to every outgoing link whose category
    /// equals `category`.
    ///
    /// Returns how many `receive` calls ran, nested deliveries included.
    pub fn send(&mut self, id: ModuleId, payload: &[f32], category: &str) -> usize {
        let mut budget = Budget::new(self.max_deliveries_per_send);
        let delivered = self.dispatch(id, payload, category, 0, &mut budget);
        self.report_spent(id, &budget);
        delivered
    }

    /// Polls every module once and routes what each emitted.
    ///
    /// Returns the number of deliveries made.
    pub fn tick(&mut self, context: &TickContext) -> usize {
        let ids: Vec<ModuleId> = self.slots.keys().copied().collect();
        let mut delivered = 0;
        for id in ids {
            let mut outbox = Outbox::new();
            match self.slots.get_mut(&id) {
                Some(slot) => slot.module.poll(context, &mut outbox),
                None => continue,
            }
            let mut budget = Budget::new(self.max_deliveries_per_send);
            delivered += self.flush(id, outbox, 0, &mut budget);
            self.report_spent(id, &budget);
        }
        delivered
    }

    fn report_spent(&self, origin: ModuleId, budget: &Budget) {
        if budget.spent {
            log::warn!(
                "messages from {} dropped: {} deliveries per send reached",
                origin,
                self.max_deliveries_per_send
            );
        }
    }

    fn dispatch(
        &mut self,
        from: ModuleId,
        payload: &[f32],
        category: &str,
        depth: usize,
        budget: &mut Budget,
    ) -> usize {
        if depth >= self.max_dispatch_depth {
            log::warn!(
                "dropping {} message from {}: dispatch depth {} reached",
                category,
                from,
                self.max_dispatch_depth
            );
            return 0;
        }

        let targets: Vec<ModuleId> = self
            .outgoing_links(from)
            .iter()
            .filter(|link| link.category == category)
            .map(|link| link.module)
            .collect();

        let mut delivered = 0;
        for target in targets {
            let mut outbox = Outbox::new();
            let Some(slot) = self.slots.get_mut(&target) else {
                log::warn!("{} links to missing {}", from, target);
                continue;
            };
            if !budget.take() {
                break;
            }
            log::trace!("{} -> {}: {} {:?}", from, target, category, payload);
            slot.module.receive(payload, category, &mut outbox);
            delivered += 1;
            delivered += self.flush(target, outbox, depth + 1, budget);
        }
        delivered
    }

    fn flush(&mut self, from: ModuleId, outbox: Outbox, depth: usize, budget: &mut Budget) -> usize {
        outbox
            .into_messages()
            .into_iter()
            .map(|message| self.dispatch(from, &message.payload, &message.category, depth, budget))
            .sum()
    }
}

impl Default for ModuleRack {
    fn default() -> Self {
        Self::new()
    }
}
