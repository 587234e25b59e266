//! Transition rule storage and the inherited read view.
//!
//! A [`RuleStore`] maps `attribute → phase → from → to → [hook]`. It is
//! append-only: declaring a rule never replaces an earlier one, and hooks
//! registered under the same key keep declaration order.
//!
//! Each machine owns exactly one store. A machine built with
//! [`MachineBuilder::extends`](crate::builder::MachineBuilder::extends)
//! shares its parent's stores and adds its own on top, so base rules are
//! never clobbered. [`Lineage`] is that ordered chain, root-most first.

use super::hook::Hook;
use super::phase::Phase;
use crate::core::StateId;
use std::collections::HashMap;
use std::sync::Arc;

type ToTable<E> = HashMap<StateId, Vec<Arc<Hook<E>>>>;
type FromTable<E> = HashMap<StateId, ToTable<E>>;
type PhaseTable<E> = HashMap<Phase, FromTable<E>>;

/// Hooks declared by one machine, keyed by attribute, phase and endpoints.
pub struct RuleStore<E> {
    rules: HashMap<String, PhaseTable<E>>,
    registrations: usize,
}

impl<E> RuleStore<E> {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            registrations: 0,
        }
    }

    /// Register `hook` for one concrete `(from, to)` pair of `attribute`.
    pub fn add(&mut self, attribute: &str, from: &StateId, to: &StateId, hook: Arc<Hook<E>>) {
        self.rules
            .entry(attribute.to_string())
            .or_default()
            .entry(hook.phase())
            .or_default()
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_default()
            .push(hook);
        self.registrations += 1;
    }

    /// Hooks for an exact key, in declaration order.
    pub fn hooks(&self, attribute: &str, phase: Phase, from: &str, to: &str) -> &[Arc<Hook<E>>] {
        self.rules
            .get(attribute)
            .and_then(|phases| phases.get(&phase))
            .and_then(|froms| froms.get(from))
            .and_then(|tos| tos.get(to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append every registration of `other` after the ones already held.
    pub fn absorb(&mut self, other: RuleStore<E>) {
        for (attribute, phases) in other.rules {
            let own_phases = self.rules.entry(attribute).or_default();
            for (phase, froms) in phases {
                let own_froms = own_phases.entry(phase).or_default();
                for (from, tos) in froms {
                    let own_tos = own_froms.entry(from).or_default();
                    for (to, hooks) in tos {
                        own_tos.entry(to).or_default().extend(hooks);
                    }
                }
            }
        }
        self.registrations += other.registrations;
    }

    /// Number of `(hook, from, to)` registrations.
    pub fn len(&self) -> usize {
        self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations == 0
    }
}

impl<E> Default for RuleStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for RuleStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("attributes", &self.rules.keys().collect::<Vec<_>>())
            .field("registrations", &self.registrations)
            .finish()
    }
}

/// The chain of rule stores visible to a machine, root-most first.
///
/// Computed once when the machine is built; reading hooks walks the chain
/// in order, so an ancestor's hooks always run before a descendant's for
/// the same key.
pub struct Lineage<E> {
    stores: Vec<Arc<RuleStore<E>>>,
}

impl<E> Lineage<E> {
    pub(crate) fn root(store: RuleStore<E>) -> Self {
        Self {
            stores: vec![Arc::new(store)],
        }
    }

    pub(crate) fn extend(&self, store: RuleStore<E>) -> Self {
        let mut stores = self.stores.clone();
        stores.push(Arc::new(store));
        Self { stores }
    }

    /// Number of machines in the chain, including the owner.
    pub fn depth(&self) -> usize {
        self.stores.len()
    }

    /// The owning machine's own store.
    pub fn own(&self) -> Option<&RuleStore<E>> {
        self.stores.last().map(Arc::as_ref)
    }

    /// Merged hooks for one key, ancestors first.
    pub fn hooks<'a>(
        &'a self,
        attribute: &'a str,
        phase: Phase,
        from: &'a str,
        to: &'a str,
    ) -> impl Iterator<Item = &'a Arc<Hook<E>>> + 'a
    where
        E: 'a,
    {
        self.stores
            .iter()
            .flat_map(move |store| store.hooks(attribute, phase, from, to).iter())
    }
}

impl<E> Clone for Lineage<E> {
    fn clone(&self) -> Self {
        Self {
            stores: self.stores.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Lineage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stores.iter()).finish()
    }
}
