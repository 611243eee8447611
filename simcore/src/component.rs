use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::{Error, EventEntry, Scheduler, State};

/// Identifies a simulation component.
///
/// The ID is typed by the event the component accepts, so an event of a wrong type cannot be
/// scheduled for it.
pub struct ComponentId<E> {
    pub(crate) id: usize,
    pub(crate) state_hash: u64,
    pub(crate) _marker: PhantomData<E>,
}

impl<E> Clone for ComponentId<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }
}
impl<E> Copy for ComponentId<E> {}

impl<E> PartialEq for ComponentId<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.state_hash == other.state_hash
    }
}
impl<E> Eq for ComponentId<E> {}

impl<E> Hash for ComponentId<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.state_hash.hash(state);
    }
}

impl<E> fmt::Debug for ComponentId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentId").field("id", &self.id).finish()
    }
}

/// Interface of a simulation component.
///
/// A component reacts to events addressed to it. Whatever it needs to remember between two
/// events lives either in the component itself or in the event it schedules for later.
pub trait Component {
    /// The type of events this component processes.
    type Event: fmt::Debug + 'static;

    /// Processes a single event at the current simulation time.
    ///
    /// # Errors
    ///
    /// Any error is propagated out of the simulation step that delivered the event.
    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error>;
}

/// Type-erased component, so that components with different event types share one table.
trait ProcessEventEntry {
    fn process_event_entry(
        &mut self,
        entry: &EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error>;
}

impl<E, C> ProcessEventEntry for C
where
    E: fmt::Debug + 'static,
    C: Component<Event = E>,
{
    fn process_event_entry(
        &mut self,
        entry: &EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        let entry = entry
            .downcast::<E>()
            .expect("Event type must match the component it was scheduled for");
        log::trace!("[{:?}] [event] {:?}", entry.time, entry.event);
        self.process_event(entry.component_id, entry.event, scheduler, state)
    }
}

/// Container holding all components of a simulation.
pub struct Components {
    components: Vec<Box<dyn ProcessEventEntry>>,
    state_hash: u64,
}

impl Components {
    /// Creates an empty component table tied to the given state.
    #[must_use]
    pub fn new(state: &State) -> Self {
        Self {
            components: Vec::new(),
            state_hash: state.state_hash,
        }
    }

    /// Registers a new component and returns its ID.
    #[must_use]
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> ComponentId<E> {
        let id = self.components.len();
        self.components.push(Box::new(component));
        ComponentId {
            id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }

    /// Delivers the event held by `entry` to the component it is addressed to.
    pub(crate) fn process_event_entry(
        &mut self,
        entry: &EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), Error> {
        self.components
            .get_mut(entry.component)
            .expect("Component ID issued by this table")
            .process_event_entry(entry, scheduler, state)
    }
}
