//! Listener lists and hot event streams.
//!
//! Two delivery styles are offered:
//! - [`EventDispatcher`] calls registered closures synchronously, in
//!   registration order.
//! - [`EventStream`] multicasts events into per-subscriber queues that are
//!   drained at the subscriber's convenience. Nothing is replayed: a receiver
//!   only sees events emitted after it subscribed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifies a listener registered on an [`EventDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// An ordered list of event listeners.
pub struct EventDispatcher<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> EventDispatcher<E> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Listeners run in the order they were added.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Delivers an event to every listener.
    pub fn dispatch(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

type OneShot<C> = Box<dyn FnOnce(&mut C)>;

/// Handlers that run at most once, with mutable access to a context.
///
/// [`OneShotHandlers::run_all`] consumes every pending handler; a handler
/// removed before that never runs.
pub struct OneShotHandlers<C> {
    handlers: Vec<(ListenerId, OneShot<C>)>,
    next_id: u64,
}

impl<C> Default for OneShotHandlers<C> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<C> fmt::Debug for OneShotHandlers<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotHandlers")
            .field("pending", &self.handlers.len())
            .finish()
    }
}

impl<C> OneShotHandlers<C> {
    /// Creates an empty handler list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the next [`OneShotHandlers::run_all`].
    pub fn register(&mut self, handler: impl FnOnce(&mut C) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Removes a pending handler. Returns `false` if it already ran or was removed.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Runs and drops every pending handler in registration order.
    pub fn run_all(&mut self, context: &mut C) {
        for (_, handler) in std::mem::take(&mut self.handlers) {
            handler(context);
        }
    }

    /// Returns the number of pending handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is pending.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

type Queue<E> = Rc<RefCell<VecDeque<E>>>;

/// A hot, multicast stream of events.
///
/// Subscribers either register a callback, run synchronously on every
/// [`EventStream::emit`], or take an [`EventReceiver`] queue. A live receiver
/// buffers every event until it is drained, so holders must drain it
/// regularly or drop it.
pub struct EventStream<E> {
    subscribers: Vec<Weak<RefCell<VecDeque<E>>>>,
    callbacks: EventDispatcher<E>,
}

impl<E> Default for EventStream<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            callbacks: EventDispatcher::new(),
        }
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscribers", &self.subscriber_count())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl<E> EventStream<E> {
    /// Creates a stream with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run for every event emitted from now on.
    pub fn subscribe_with(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        self.callbacks.subscribe(listener)
    }

    /// Removes a callback registered with [`EventStream::subscribe_with`].
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    /// Returns the number of live receivers plus registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        let receivers = self
            .subscribers
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count();
        receivers + self.callbacks.len()
    }
}

impl<E: Clone> EventStream<E> {
    /// Returns a receiver queue for events emitted from now on.
    pub fn subscribe(&mut self) -> EventReceiver<E> {
        let queue: Queue<E> = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.push(Rc::downgrade(&queue));
        EventReceiver { queue }
    }

    /// Delivers an event to every callback, then to every live receiver.
    /// Dropped receivers are pruned.
    pub fn emit(&mut self, event: &E) {
        self.callbacks.dispatch(event);
        self.subscribers.retain(|subscriber| match subscriber.upgrade() {
            Some(queue) => {
                queue.borrow_mut().push_back(event.clone());
                true
            }
            None => false,
        });
    }
}

/// The receiving end of an [`EventStream`] subscription.
///
/// Events queue up until taken with [`EventReceiver::try_recv`] or
/// [`EventReceiver::drain`]. Dropping the receiver ends the subscription.
#[derive(Debug)]
pub struct EventReceiver<E> {
    queue: Queue<E>,
}

impl<E> EventReceiver<E> {
    /// Takes the oldest pending event.
    pub fn try_recv(&self) -> Option<E> {
        self.queue.borrow_mut().pop_front()
    }

    /// Takes every pending event, oldest first.
    pub fn drain(&self) -> Vec<E> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Returns true if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::<u32>::new();

        let first = Rc::clone(&log);
        dispatcher.subscribe(move |e| first.borrow_mut().push(("first", *e)));
        let second = Rc::clone(&log);
        dispatcher.subscribe(move |e| second.borrow_mut().push(("second", *e)));

        dispatcher.dispatch(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut dispatcher = EventDispatcher::<()>::new();
        let c = Rc::clone(&count);
        let id = dispatcher.subscribe(move |_| *c.borrow_mut() += 1);

        dispatcher.dispatch(&());
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.dispatch(&());

        assert_eq!(*count.borrow(), 1);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_one_shot_handlers_run_once() {
        let mut handlers = OneShotHandlers::<Vec<&'static str>>::new();
        handlers.register(|log| log.push("first"));
        let removed = handlers.register(|log| log.push("removed"));
        handlers.register(|log| log.push("last"));
        assert!(handlers.remove(removed));
        assert_eq!(handlers.len(), 2);

        let mut log = Vec::new();
        handlers.run_all(&mut log);
        handlers.run_all(&mut log);

        assert_eq!(log, vec!["first", "last"]);
        assert!(handlers.is_empty());
        assert!(!handlers.remove(removed));
    }

    #[test]
    fn test_stream_does_not_replay() {
        let mut stream = EventStream::<u32>::new();
        stream.emit(&1);

        let rx = stream.subscribe();
        assert!(rx.is_empty());

        stream.emit(&2);
        stream.emit(&3);
        assert_eq!(rx.drain(), vec![2, 3]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_stream_multicasts() {
        let mut stream = EventStream::<&'static str>::new();
        let a = stream.subscribe();
        let b = stream.subscribe();

        stream.emit(&"start");
        assert_eq!(a.try_recv(), Some("start"));
        assert_eq!(b.try_recv(), Some("start"));
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let mut stream = EventStream::<u8>::new();
        let kept = stream.subscribe();
        {
            let _dropped = stream.subscribe();
            assert_eq!(stream.subscriber_count(), 2);
        }
        stream.emit(&1);
        assert_eq!(stream.subscriber_count(), 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_callbacks_run_on_emit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut stream = EventStream::<u32>::new();
        stream.emit(&1);

        let log = Rc::clone(&seen);
        let id = stream.subscribe_with(move |e| log.borrow_mut().push(*e));
        assert_eq!(stream.subscriber_count(), 1);

        stream.emit(&2);
        assert!(stream.unsubscribe(id));
        stream.emit(&3);

        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn test_debug_without_clone() {
        struct Opaque;
        let stream = EventStream::<Opaque>::new();
        assert_eq!(
            format!("{stream:?}"),
            "EventStream { subscribers: 0, callbacks: 0 }"
        );
    }
}
