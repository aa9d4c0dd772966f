// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Emitter implementation.
//!
//! ## Fan-out
//!
//! Fan-out works on a snapshot taken when the event fires. Listeners added
//! while it runs first fire on the next trigger. Listeners removed while it
//! runs still receive the in-flight event.
//!
//! ## Owners that are also the context
//!
//! When the emitter lives inside the context `C` its listeners receive, the
//! owner cannot lend out `&mut C` while the emitter is borrowed. Such owners
//! take a [`Emitter::snapshot`], release the emitter, and call [`fan_out`].

use std::collections::BTreeMap;
use std::rc::Rc;

/// A listener: receives the context and the event payload.
pub type Listener<C, A> = Rc<dyn Fn(&mut C, &A)>;

/// Wrap a closure as a [`Listener`].
pub fn listener<C, A>(f: impl Fn(&mut C, &A) + 'static) -> Listener<C, A> {
    Rc::new(f)
}

/// Returns true if `a` and `b` are the same listener.
pub fn same_listener<C, A>(a: &Listener<C, A>, b: &Listener<C, A>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Call every listener in `listeners` in order.
pub fn fan_out<C, A>(listeners: &[Listener<C, A>], cx: &mut C, args: &A) {
    for l in listeners {
        l(cx, args);
    }
}

struct Entry<C, A> {
    listener: Listener<C, A>,
    once: bool,
}

impl<C, A> Clone for Entry<C, A> {
    fn clone(&self) -> Self {
        Self {
            listener: Rc::clone(&self.listener),
            once: self.once,
        }
    }
}

/// Ordered listener lists keyed by event name.
pub struct Emitter<C, A> {
    events: BTreeMap<String, Vec<Entry<C, A>>>,
}

impl<C, A> core::fmt::Debug for Emitter<C, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut m = f.debug_map();
        for (name, entries) in &self.events {
            m.entry(name, &entries.len());
        }
        m.finish()
    }
}

impl<C, A> Default for Emitter<C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A> Emitter<C, A> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
        }
    }

    /// Append `listener` to `event`. Duplicates are kept.
    pub fn on(&mut self, event: &str, listener: Listener<C, A>) -> &mut Self {
        self.push(event, listener, false);
        self
    }

    /// Append a listener that is removed after it fires once.
    pub fn once(&mut self, event: &str, listener: Listener<C, A>) -> &mut Self {
        self.push(event, listener, true);
        self
    }

    /// Remove the first registration of `listener` for `event`.
    ///
    /// Returns false if nothing matched; that is not an error.
    pub fn off(&mut self, event: &str, listener: &Listener<C, A>) -> bool {
        let Some(entries) = self.events.get_mut(event) else {
            return false;
        };
        let Some(pos) = entries
            .iter()
            .position(|e| same_listener(&e.listener, listener))
        else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.events.remove(event);
        }
        true
    }

    /// Drop every listener for `event`, returning how many were removed.
    pub fn remove_event(&mut self, event: &str) -> usize {
        self.events.remove(event).map_or(0, |e| e.len())
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events.get(event).map_or(0, Vec::len)
    }

    /// Returns true if `event` has at least one listener.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Names of events with listeners, in sorted order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// The listeners that should receive `event` right now, in order.
    ///
    /// One-shot listeners are removed as part of taking the snapshot.
    pub fn snapshot(&mut self, event: &str) -> Vec<Listener<C, A>> {
        let Some(entries) = self.events.get_mut(event) else {
            return Vec::new();
        };
        let out = entries.iter().map(|e| Rc::clone(&e.listener)).collect();
        entries.retain(|e| !e.once);
        if entries.is_empty() {
            self.events.remove(event);
        }
        out
    }

    /// Fire `event`, returning the number of listeners called.
    pub fn trigger(&mut self, cx: &mut C, event: &str, args: &A) -> usize {
        let listeners = self.snapshot(event);
        tracing::trace!(event, listeners = listeners.len(), "trigger");
        fan_out(&listeners, cx, args);
        listeners.len()
    }

    fn push(&mut self, event: &str, listener: Listener<C, A>, once: bool) {
        self.events
            .entry(event.to_owned())
            .or_default()
            .push(Entry { listener, once });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn recorder(tag: &'static str) -> Listener<Log, u32> {
        listener(move |log: &mut Log, n: &u32| log.push(format!("{tag}:{n}")))
    }

    #[test]
    fn fires_in_registration_order_without_dedup() {
        let mut em = Emitter::new();
        let a = recorder("a");
        em.on("evt", Rc::clone(&a))
            .on("evt", recorder("b"))
            .on("evt", a);
        let mut log = Log::new();
        assert_eq!(em.trigger(&mut log, "evt", &1), 3);
        assert_eq!(log, ["a:1", "b:1", "a:1"]);
    }

    #[test]
    fn off_removes_first_match_only() {
        let mut em = Emitter::new();
        let a = recorder("a");
        em.on("evt", Rc::clone(&a)).on("evt", Rc::clone(&a));
        assert!(em.off("evt", &a));
        assert_eq!(em.listener_count("evt"), 1);
        assert!(em.off("evt", &a));
        assert!(!em.has_listeners("evt"));
        assert!(!em.off("evt", &a), "unknown listener is a no-op");
        assert!(!em.off("other", &a), "unknown event is a no-op");
    }

    #[test]
    fn once_fires_a_single_time() {
        let mut em = Emitter::new();
        em.once("evt", recorder("once")).on("evt", recorder("always"));
        let mut log = Log::new();
        em.trigger(&mut log, "evt", &1);
        em.trigger(&mut log, "evt", &2);
        assert_eq!(log, ["once:1", "always:1", "always:2"]);
    }

    #[test]
    fn trigger_without_listeners_is_quiet() {
        let mut em: Emitter<Log, u32> = Emitter::new();
        let mut log = Log::new();
        assert_eq!(em.trigger(&mut log, "nothing", &0), 0);
        assert!(log.is_empty());
    }

    /// An owner that stores the emitter inside the listener context.
    #[derive(Default)]
    struct Owner {
        emitter: Emitter<Self, u32>,
        log: Log,
        victim: Option<Listener<Self, u32>>,
    }

    impl Owner {
        fn emit(&mut self, event: &str, n: u32) {
            let listeners = self.emitter.snapshot(event);
            fan_out(&listeners, self, &n);
        }
    }

    #[test]
    fn removal_during_fan_out_does_not_affect_snapshot() {
        let mut owner = Owner::default();
        let victim: Listener<Owner, u32> = listener(|o: &mut Owner, n: &u32| {
            o.log.push(format!("victim:{n}"));
        });
        let remover: Listener<Owner, u32> = listener(|o: &mut Owner, n: &u32| {
            o.log.push(format!("remover:{n}"));
            if let Some(v) = o.victim.take() {
                o.emitter.off("evt", &v);
            }
        });
        owner.victim = Some(Rc::clone(&victim));
        owner.emitter.on("evt", remover).on("evt", victim);

        owner.emit("evt", 1);
        owner.emit("evt", 2);
        assert_eq!(owner.log, ["remover:1", "victim:1", "remover:2"]);
    }

    #[test]
    fn addition_during_fan_out_waits_for_next_trigger() {
        let mut owner = Owner::default();
        let adder: Listener<Owner, u32> = listener(|o: &mut Owner, n: &u32| {
            o.log.push(format!("adder:{n}"));
            o.emitter.on(
                "evt",
                listener(|o: &mut Owner, n: &u32| o.log.push(format!("late:{n}"))),
            );
        });
        owner.emitter.once("evt", adder);
        owner.emit("evt", 1);
        owner.emit("evt", 2);
        assert_eq!(owner.log, ["adder:1", "late:2"]);
    }

    #[test]
    fn events_are_listed_and_cleared() {
        let mut em = Emitter::new();
        em.on("b", recorder("x")).on("a", recorder("y"));
        assert_eq!(em.events().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(em.remove_event("a"), 1);
        em.clear();
        assert_eq!(em.events().count(), 0);
    }
}
