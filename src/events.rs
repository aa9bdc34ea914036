use std::cell::RefCell;
use std::rc::Rc;

use crate::attempt::Resolved;
use crate::session::SessionReport;
use crate::snake::SnakeTransition;
use crate::tune::TuneKey;
use crate::zone::Zone;

/// Everything a session tells the outside world about.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    TuneStarted {
        tune: TuneKey,
        zone: Zone,
        duration: f64,
    },
    TuneResolved(Resolved),
    HealthChanged {
        current: u32,
        max: u32,
    },
    PlayerDamaged(u32),
    PlayerHealed(u32),
    SnakeChanged(SnakeTransition),
    GameWon,
    GameOver,
    SessionEnded(SessionReport),
}

/// Receiver of session events.
pub trait EventSink {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&GameEvent),
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Subscribers for one session. Dropped with the session, so nothing leaks
/// into the next one.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<S: EventSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Delivers `event` to every subscriber, in subscription order.
    pub fn publish(&mut self, event: GameEvent) {
        for sink in self.sinks.iter_mut() {
            sink.on_event(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }
}

/// Sink that keeps every event it sees. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn last(&self) -> Option<GameEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn take(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn count(&self, pred: impl Fn(&GameEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_sink_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for id in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe(move |_: &GameEvent| order.borrow_mut().push(id));
        }
        bus.publish(GameEvent::GameWon);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn test_event_log_shares_storage_between_clones() {
        let log = EventLog::new();
        let mut bus = EventBus::new();
        bus.subscribe(log.clone());

        bus.publish(GameEvent::PlayerHealed(15));
        bus.publish(GameEvent::PlayerDamaged(20));

        assert_eq!(log.len(), 2);
        assert_eq!(log.last(), Some(GameEvent::PlayerDamaged(20)));
        assert_eq!(
            log.count(|e| matches!(e, GameEvent::PlayerHealed(_))),
            1
        );

        let drained = log.take();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_bus_without_sinks_is_a_no_op() {
        let mut bus = EventBus::new();
        bus.publish(GameEvent::GameOver);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
