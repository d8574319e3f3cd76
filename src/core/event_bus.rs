//! Element-scoped Pub/Sub Event Bus with DOM-style bubbling.
//!
//! Architecture:
//! - Elements are connected into a tree (`connect()` / `disconnect()`)
//! - Components listen for an event type *on one element* with callbacks
//! - dispatch() delivers immediately: target first, then each ancestor
//! - A listener may stop propagation; listeners on the current element still run
//! - post() queues an event; pump() delivers queued events in FIFO order
//!
//! Callback order: FIFO (first-registered, first-called) per element and type.
//! The bus is single-threaded: no borrow is held while a callback runs, so
//! callbacks may freely listen, dispatch or post re-entrantly.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use log::{trace, warn};

use super::element::ElementId;

/// Maximum events delivered by one pump() call. Guards against listeners
/// that keep posting in response to their own events.
const MAX_PUMP_EVENTS: usize = 1000;

/// Marker trait for events. Any `'static + Debug` type qualifies.
pub trait Event: Any + std::fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

// Blanket impl for all qualifying types
impl<T: Any + std::fmt::Debug> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Type-erased callback
type Callback = Rc<dyn Fn(&mut Propagation, &dyn Any)>;

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

/// Handle returned by [`EventBus::listen`], used to remove the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-dispatch propagation state handed to every listener.
#[derive(Debug)]
pub struct Propagation {
    target: ElementId,
    current: ElementId,
    stopped: bool,
}

impl Propagation {
    /// Element the event was dispatched on.
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Element whose listener is running right now.
    pub fn current(&self) -> ElementId {
        self.current
    }

    /// Stop bubbling past the current element.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Result of a single dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatched {
    /// Number of listener invocations
    pub delivered: usize,
    /// Element at which propagation was stopped, if any
    pub stopped_at: Option<ElementId>,
}

struct Listener {
    id: ListenerId,
    callback: Callback,
}

#[derive(Default)]
struct BusState {
    parents: HashMap<ElementId, ElementId>,
    children: HashMap<ElementId, Vec<ElementId>>,
    listeners: HashMap<(ElementId, TypeId), Vec<Listener>>,
    queue: VecDeque<(ElementId, BoxedEvent)>,
    next_listener: u64,
}

/// Element tree + event bus.
///
/// Cloning is cheap; all clones share the same tree, listeners and queue.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventBus")
            .field("elements", &state.parents.len())
            .field("listener_slots", &state.listeners.len())
            .field("queue_len", &state.queue.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Element tree ==========

    /// Connect `child` under `parent`, appending it to the parent's children.
    /// A child already connected elsewhere is moved.
    pub fn connect(&self, child: ElementId, parent: ElementId) {
        let mut state = self.state.borrow_mut();
        if let Some(old) = state.parents.insert(child, parent) {
            if let Some(siblings) = state.children.get_mut(&old) {
                siblings.retain(|c| *c != child);
            }
        }
        state.children.entry(parent).or_default().push(child);
        trace!("EventBus: connected {} under {}", child, parent);
    }

    /// Disconnect `child` from its parent. Returns the former parent.
    pub fn disconnect(&self, child: ElementId) -> Option<ElementId> {
        let mut state = self.state.borrow_mut();
        let parent = state.parents.remove(&child)?;
        if let Some(siblings) = state.children.get_mut(&parent) {
            siblings.retain(|c| *c != child);
        }
        trace!("EventBus: disconnected {} from {}", child, parent);
        Some(parent)
    }

    pub fn parent_of(&self, element: ElementId) -> Option<ElementId> {
        self.state.borrow().parents.get(&element).copied()
    }

    /// Children of `element` in connection order.
    pub fn children_of(&self, element: ElementId) -> Vec<ElementId> {
        self.state
            .borrow()
            .children
            .get(&element)
            .cloned()
            .unwrap_or_default()
    }

    /// Bubbling path: `element` itself, then every ancestor up to the root.
    pub fn path(&self, element: ElementId) -> Vec<ElementId> {
        let state = self.state.borrow();
        let mut path = vec![element];
        let mut current = element;
        while let Some(parent) = state.parents.get(&current) {
            // Cycles cannot be built through connect(), but never loop forever
            if path.contains(parent) {
                warn!("EventBus: cycle detected above {}", current);
                break;
            }
            path.push(*parent);
            current = *parent;
        }
        path
    }

    // ========== Pub/Sub (immediate) ==========

    /// Listen for events of type E arriving at `element` (as target or
    /// while bubbling through it).
    ///
    /// # Example
    /// ```ignore
    /// let id = bus.listen::<EngineSettled, _>(carousel, move |ctx, _| {
    ///     ctx.stop();
    ///     // react to settle...
    /// });
    /// ```
    pub fn listen<E, F>(&self, element: ElementId, callback: F) -> ListenerId
    where
        E: Event,
        F: Fn(&mut Propagation, &E) + 'static,
    {
        let wrapped: Callback = Rc::new(move |ctx: &mut Propagation, any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(ctx, event);
            }
        });
        let mut state = self.state.borrow_mut();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state
            .listeners
            .entry((element, TypeId::of::<E>()))
            .or_default()
            .push(Listener { id, callback: wrapped });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let mut removed = false;
        state.listeners.retain(|_, slot| {
            let before = slot.len();
            slot.retain(|l| l.id != id);
            removed |= slot.len() != before;
            !slot.is_empty()
        });
        removed
    }

    /// Check if `element` has listeners for event type E
    pub fn has_listeners<E: Event>(&self, element: ElementId) -> bool {
        self.state
            .borrow()
            .listeners
            .get(&(element, TypeId::of::<E>()))
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Dispatch event on `target` and bubble it up the tree immediately.
    pub fn dispatch<E: Event>(&self, target: ElementId, event: E) -> Dispatched {
        self.dispatch_dyn(target, &event)
    }

    /// Dispatch a type-erased event.
    ///
    /// IMPORTANT: pass `&*boxed` for a [`BoxedEvent`], never `&boxed`. The
    /// blanket impl makes `Box<dyn Event>` an Event too, and its TypeId would
    /// match no listener.
    pub fn dispatch_dyn(&self, target: ElementId, event: &dyn Event) -> Dispatched {
        let type_id = Any::type_id(event.as_any());
        let mut ctx = Propagation {
            target,
            current: target,
            stopped: false,
        };
        let mut delivered = 0;

        for element in self.path(target) {
            // Snapshot callbacks so no borrow is held while they run
            let callbacks: Vec<Callback> = self
                .state
                .borrow()
                .listeners
                .get(&(element, type_id))
                .map(|slot| slot.iter().map(|l| Rc::clone(&l.callback)).collect())
                .unwrap_or_default();

            ctx.current = element;
            for cb in callbacks {
                cb(&mut ctx, event.as_any());
                delivered += 1;
            }
            if ctx.stopped {
                break;
            }
        }

        if delivered == 0 {
            trace!("EventBus: {} on {} had no listeners", event.type_name(), target);
        }

        Dispatched {
            delivered,
            stopped_at: ctx.stopped.then_some(ctx.current),
        }
    }

    // ========== Deferred Processing ==========

    /// Queue event for delivery on the next pump().
    pub fn post<E: Event>(&self, target: ElementId, event: E) {
        self.post_boxed(target, Box::new(event));
    }

    pub fn post_boxed(&self, target: ElementId, event: BoxedEvent) {
        self.state.borrow_mut().queue.push_back((target, event));
    }

    /// Deliver queued events in FIFO order, including events posted while
    /// pumping. Returns the number of events delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while delivered < MAX_PUMP_EVENTS {
            let next = self.state.borrow_mut().queue.pop_front();
            let Some((target, event)) = next else {
                return delivered;
            };
            self.dispatch_dyn(target, &*event);
            delivered += 1;
        }
        warn!(
            "EventBus: pump limit reached ({} events), {} still queued",
            MAX_PUMP_EVENTS,
            self.queue_len()
        );
        delivered
    }

    /// Check queue length
    pub fn queue_len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Drop all queued events without delivering them
    pub fn clear_queue(&self) {
        self.state.borrow_mut().queue.clear();
    }
}

/// Helper: downcast BoxedEvent to concrete type
///
/// Must explicitly deref to `dyn Event` before calling `as_any()`, see
/// [`EventBus::dispatch_dyn`].
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Clone, Debug)]
    struct TestEvent {
        value: i32,
    }

    #[derive(Clone, Debug)]
    struct OtherEvent;

    fn tree(bus: &EventBus) -> (ElementId, ElementId, ElementId) {
        let root = ElementId::new();
        let mid = ElementId::new();
        let leaf = ElementId::new();
        bus.connect(mid, root);
        bus.connect(leaf, mid);
        (root, mid, leaf)
    }

    #[test]
    fn test_bubbles_from_target_to_root() {
        let bus = EventBus::new();
        let (root, mid, leaf) = tree(&bus);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for el in [root, mid, leaf] {
            let seen = Rc::clone(&seen);
            bus.listen::<TestEvent, _>(el, move |ctx, e| {
                seen.borrow_mut().push((ctx.current(), ctx.target(), e.value));
            });
        }

        let out = bus.dispatch(leaf, TestEvent { value: 7 });
        assert_eq!(out.delivered, 3);
        assert_eq!(out.stopped_at, None);
        assert_eq!(
            *seen.borrow(),
            vec![(leaf, leaf, 7), (mid, leaf, 7), (root, leaf, 7)]
        );
    }

    #[test]
    fn test_stop_propagation_finishes_current_element() {
        let bus = EventBus::new();
        let (root, mid, leaf) = tree(&bus);
        let counter = Rc::new(Cell::new(0));

        let c = Rc::clone(&counter);
        bus.listen::<TestEvent, _>(mid, move |ctx, _| {
            ctx.stop();
            c.set(c.get() + 1);
        });
        let c = Rc::clone(&counter);
        bus.listen::<TestEvent, _>(mid, move |_, _| c.set(c.get() + 10));
        let c = Rc::clone(&counter);
        bus.listen::<TestEvent, _>(root, move |_, _| c.set(c.get() + 100));

        let out = bus.dispatch(leaf, TestEvent { value: 0 });
        assert_eq!(counter.get(), 11);
        assert_eq!(out.stopped_at, Some(mid));
    }

    #[test]
    fn test_listeners_are_type_scoped() {
        let bus = EventBus::new();
        let el = ElementId::new();
        let counter = Rc::new(Cell::new(0));
        let c = Rc::clone(&counter);
        bus.listen::<TestEvent, _>(el, move |_, e| c.set(c.get() + e.value));

        bus.dispatch(el, OtherEvent);
        assert_eq!(counter.get(), 0);
        bus.dispatch(el, TestEvent { value: 5 });
        assert_eq!(counter.get(), 5);
        assert!(bus.has_listeners::<TestEvent>(el));
        assert!(!bus.has_listeners::<OtherEvent>(el));
    }

    #[test]
    fn test_unlisten() {
        let bus = EventBus::new();
        let el = ElementId::new();
        let counter = Rc::new(Cell::new(0));
        let c = Rc::clone(&counter);
        let id = bus.listen::<TestEvent, _>(el, move |_, e| c.set(c.get() + e.value));

        bus.dispatch(el, TestEvent { value: 10 });
        assert!(bus.unlisten(id));
        assert!(!bus.unlisten(id));
        bus.dispatch(el, TestEvent { value: 10 });
        assert_eq!(counter.get(), 10);
    }

    #[test]
    fn test_children_keep_connection_order() {
        let bus = EventBus::new();
        let parent = ElementId::new();
        let other = ElementId::new();
        let (a, b, c) = (ElementId::new(), ElementId::new(), ElementId::new());
        bus.connect(a, parent);
        bus.connect(b, parent);
        bus.connect(c, parent);
        assert_eq!(bus.children_of(parent), vec![a, b, c]);

        assert_eq!(bus.disconnect(b), Some(parent));
        assert_eq!(bus.disconnect(b), None);
        assert_eq!(bus.children_of(parent), vec![a, c]);

        // Moving re-parents
        bus.connect(a, other);
        assert_eq!(bus.children_of(parent), vec![c]);
        assert_eq!(bus.parent_of(a), Some(other));
    }

    #[test]
    fn test_post_and_pump_fifo() {
        let bus = EventBus::new();
        let el = ElementId::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        bus.listen::<TestEvent, _>(el, move |_, e| s.borrow_mut().push(e.value));

        bus.post(el, TestEvent { value: 1 });
        bus.post(el, TestEvent { value: 2 });
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.queue_len(), 2);

        assert_eq!(bus.pump(), 2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn test_reentrant_post_is_delivered_in_same_pump() {
        let bus = EventBus::new();
        let el = ElementId::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let inner = bus.clone();
        bus.listen::<TestEvent, _>(el, move |ctx, e| {
            s.borrow_mut().push(e.value);
            if e.value < 3 {
                inner.post(ctx.target(), TestEvent { value: e.value + 1 });
            }
        });

        bus.post(el, TestEvent { value: 1 });
        assert_eq!(bus.pump(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_pump_is_bounded() {
        let bus = EventBus::new();
        let el = ElementId::new();
        let inner = bus.clone();
        bus.listen::<OtherEvent, _>(el, move |ctx, _| inner.post(ctx.target(), OtherEvent));

        bus.post(el, OtherEvent);
        assert_eq!(bus.pump(), MAX_PUMP_EVENTS);
        assert_eq!(bus.queue_len(), 1);
        bus.clear_queue();
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn test_downcast() {
        let boxed: BoxedEvent = Box::new(TestEvent { value: 42 });
        assert_eq!(downcast_event::<TestEvent>(&boxed).map(|e| e.value), Some(42));
        assert!(downcast_event::<OtherEvent>(&boxed).is_none());
    }
}
