use std::any::{Any, TypeId};
use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use crate::{Clock, ComponentId};

/// Entry type stored in the scheduler, including the event value, component ID, and the time when
/// it is supposed to occur.
///
/// Entries are ordered by time first, and by the order in which they were scheduled second,
/// so that events scheduled for the same instant are popped first-in-first-out.
#[derive(Debug)]
pub struct EventEntry {
    time: Reverse<Duration>,
    sequence: Reverse<u64>,
    pub(crate) component: usize,
    inner: Box<dyn Any>,
    event_type: TypeId,
    state_hash: u64,
}

impl EventEntry {
    /// Tries to downcast the event entry to one holding an event of type `E`.
    /// If fails, returns `None`.
    #[must_use]
    pub fn downcast<E: fmt::Debug + 'static>(&self) -> Option<EventEntryTyped<'_, E>> {
        if self.event_type == TypeId::of::<E>() {
            self.inner
                .downcast_ref::<E>()
                .map(|event| EventEntryTyped {
                    time: self.time.0,
                    component_id: ComponentId {
                        id: self.component,
                        state_hash: self.state_hash,
                        _marker: PhantomData,
                    },
                    component_idx: self.component,
                    event,
                })
        } else {
            None
        }
    }

    /// The time at which the event is (or was) to be processed.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.time.0
    }

    fn key(&self) -> (Reverse<Duration>, Reverse<u64>) {
        (self.time, self.sequence)
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Typed view of an [`EventEntry`], see [`EventEntry::downcast`].
#[derive(Debug)]
pub struct EventEntryTyped<'e, E: fmt::Debug> {
    /// Event time.
    pub time: Duration,
    /// The component the event is addressed to.
    pub component_id: ComponentId<E>,
    /// Index of the component in the component table.
    pub component_idx: usize,
    /// Event value.
    pub event: &'e E,
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
pub struct Scheduler {
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    next_sequence: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(Duration::default())),
            next_sequence: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + time`.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        time: Duration,
        component: ComponentId<E>,
        event: E,
    ) {
        let time = self.time() + time;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EventEntry {
            time: Reverse(time),
            sequence: Reverse(sequence),
            component: component.id,
            inner: Box::new(event),
            event_type: TypeId::of::<E>(),
            state_hash: component.state_hash,
        });
    }

    /// Schedules `event` to be executed for `component` at `self.time()`.
    ///
    /// The event still goes through the queue: anything already scheduled for the current
    /// instant is processed first.
    pub fn schedule_immediately<E: fmt::Debug + 'static>(
        &mut self,
        component: ComponentId<E>,
        event: E,
    ) {
        self.schedule(Duration::default(), component, event);
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Returns the time of the next scheduled event without removing it.
    #[must_use]
    pub fn peek_time(&self) -> Option<Duration> {
        self.events.peek().map(EventEntry::time)
    }

    /// Number of events waiting to be processed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Moves the clock forward to `time`. Does nothing if `time` is in the past.
    pub(crate) fn advance_to(&mut self, time: Duration) {
        if time > self.clock.get() {
            self.clock.replace(time);
        }
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.events.pop().map(|e| {
            self.clock.replace(e.time.0);
            e
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_entry(secs: u64, sequence: u64) -> EventEntry {
        EventEntry {
            time: Reverse(Duration::from_secs(secs)),
            sequence: Reverse(sequence),
            component: 2,
            event_type: TypeId::of::<String>(),
            state_hash: 17,
            inner: Box::new(String::from("inner")),
        }
    }

    #[test]
    fn test_event_entry_downcast() {
        let entry = make_entry(1, 0);
        assert!(entry.downcast::<String>().is_some());
        assert!(entry.downcast::<i32>().is_none());
    }

    #[test]
    fn test_event_entry_cmp() {
        assert_eq!(make_entry(1, 0), make_entry(1, 0));
        assert_eq!(make_entry(0, 5).cmp(&make_entry(1, 0)), Ordering::Greater);
        assert_eq!(make_entry(2, 0).cmp(&make_entry(1, 5)), Ordering::Less);
        // Same time: the earlier scheduled entry comes out of the max-heap first.
        assert_eq!(make_entry(1, 0).cmp(&make_entry(1, 1)), Ordering::Greater);
    }

    #[derive(Debug, Clone, Eq, PartialEq)]
    struct EventA;
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct EventB(usize);

    fn make_component<E>(id: usize) -> ComponentId<E> {
        ComponentId {
            id,
            state_hash: 17,
            _marker: PhantomData,
        }
    }

    #[test]
    fn test_scheduler() {
        let mut scheduler = Scheduler::default();
        assert_eq!(scheduler.time(), Duration::new(0, 0));
        assert_eq!(scheduler.pending(), 0);

        let component_a = make_component::<EventA>(0);
        let component_b = make_component::<EventB>(1);

        scheduler.schedule(Duration::from_secs(1), component_a, EventA);
        scheduler.schedule(Duration::from_secs(0), component_b, EventB(0));
        scheduler.schedule(Duration::from_secs(2), component_b, EventB(1));

        assert_eq!(scheduler.time(), Duration::from_secs(0));
        assert_eq!(scheduler.peek_time(), Some(Duration::from_secs(0)));

        let entry = scheduler.pop().unwrap();
        assert_eq!(entry.event_type, TypeId::of::<EventB>());
        let entry = entry.downcast::<EventB>().unwrap();
        assert_eq!(entry.time, Duration::from_secs(0));
        assert_eq!(entry.component_idx, 1);
        assert_eq!(entry.component_id, component_b);
        assert_eq!(entry.event, &EventB(0));

        let entry = scheduler.pop().unwrap();
        let entry = entry.downcast::<EventA>().unwrap();
        assert_eq!(entry.time, Duration::from_secs(1));
        assert_eq!(entry.component_id, component_a);
        assert_eq!(scheduler.time(), Duration::from_secs(1));

        let entry = scheduler.pop().unwrap();
        let entry = entry.downcast::<EventB>().unwrap();
        assert_eq!(entry.time, Duration::from_secs(2));
        assert_eq!(entry.event, &EventB(1));
        assert_eq!(scheduler.time(), Duration::from_secs(2));

        assert!(scheduler.pop().is_none());
        assert_eq!(scheduler.peek_time(), None);
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut scheduler = Scheduler::default();
        let component_b = make_component::<EventB>(0);
        for idx in 0..10 {
            scheduler.schedule(Duration::from_secs(3), component_b, EventB(idx));
        }
        scheduler.schedule_immediately(component_b, EventB(100));
        let order: Vec<usize> = std::iter::from_fn(|| scheduler.pop())
            .map(|e| e.downcast::<EventB>().unwrap().event.0)
            .collect();
        assert_eq!(order, vec![100, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_clock_ref_follows_scheduler() {
        let mut scheduler = Scheduler::default();
        let clock = scheduler.clock();
        scheduler.schedule(Duration::from_millis(1500), make_component::<EventA>(0), EventA);
        assert_eq!(clock.time(), Duration::default());
        let _ = scheduler.pop();
        assert_eq!(clock.time(), Duration::from_millis(1500));
        scheduler.advance_to(Duration::from_secs(1));
        assert_eq!(clock.time(), Duration::from_millis(1500));
        scheduler.advance_to(Duration::from_secs(40));
        assert_eq!(clock.time(), Duration::from_secs(40));
    }
}
