use std::fmt;
use std::time::Duration;

use crate::{Component, ComponentId, Components, ContainerId, Error, Scheduler, State};

/// Why a call to [`Simulation::run_until`] has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The next scheduled event is later than the horizon.
    HorizonReached,
    /// No events were left to process before the horizon.
    Starved,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizonReached => write!(f, "horizon reached"),
            Self::Starved => write!(f, "no events left"),
        }
    }
}

/// The main simulation object.
pub struct Simulation {
    /// Current state of the simulation meant to be mutated by the components.
    pub state: State,
    /// Schedules events and maintains the clock.
    pub scheduler: Scheduler,
    components: Components,
}

impl Default for Simulation {
    fn default() -> Self {
        let state = State::default();
        let components = Components::new(&state);
        Self {
            state,
            components,
            scheduler: Scheduler::default(),
        }
    }
}

impl Simulation {
    /// Adds a new component.
    #[must_use]
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> ComponentId<E> {
        self.components.add_component(component)
    }

    /// Adds a new container.
    ///
    /// # Errors
    ///
    /// See [`Container::new`](crate::Container::new).
    pub fn add_container(&mut self, capacity: u64, level: u64) -> Result<ContainerId, Error> {
        self.state.new_container(capacity, level)
    }

    /// Schedules a new event to be executed at time `time` in component `component`.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        time: Duration,
        component: ComponentId<E>,
        event: E,
    ) {
        self.scheduler.schedule(time, component, event);
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` instead, which signifies that the simulation
    /// ended.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the component processing the event.
    pub fn step(&mut self) -> Result<bool, Error> {
        if let Some(event) = self.scheduler.pop() {
            self.components
                .process_event_entry(&event, &mut self.scheduler, &mut self.state)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Runs the simulation until the next event would happen after `horizon`, or no events are
    /// left. Events scheduled exactly at `horizon` are still processed.
    ///
    /// When the horizon is reached, the clock is moved to `horizon`; events scheduled past it
    /// remain in the scheduler.
    ///
    /// # Errors
    ///
    /// Stops at the first error raised by a component and returns it.
    pub fn run_until(&mut self, horizon: Duration) -> Result<StopReason, Error> {
        loop {
            match self.scheduler.peek_time() {
                None => {
                    log::warn!(
                        "[{:?}] No events left before horizon {:?}",
                        self.scheduler.time(),
                        horizon
                    );
                    return Ok(StopReason::Starved);
                }
                Some(time) if time > horizon => {
                    self.scheduler.advance_to(horizon);
                    return Ok(StopReason::HorizonReached);
                }
                Some(_) => {
                    self.step()?;
                }
            }
        }
    }
}
