#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! This is a general purpose discrete-event simulation that provides the mechanisms such as:
//! scheduler, state, bounded containers, etc.
//!
//! Components are explicit state machines. A component never blocks: it schedules an event for
//! itself (a timed hold) or hands its next event to a container (a withdrawal), and the
//! scheduler delivers that event back once the time has come or the container released it.
//!
//! ```
//! # use simcore::{Component, ComponentId, Error, Scheduler, Simulation, State, StopReason};
//! # use std::time::Duration;
//! #[derive(Debug)]
//! struct Tick;
//!
//! struct Counter(usize);
//!
//! impl Component for Counter {
//!     type Event = Tick;
//!     fn process_event(
//!         &mut self,
//!         self_id: ComponentId<Tick>,
//!         _event: &Tick,
//!         scheduler: &mut Scheduler,
//!         _state: &mut State,
//!     ) -> Result<(), Error> {
//!         self.0 += 1;
//!         scheduler.schedule(Duration::from_secs(1), self_id, Tick);
//!         Ok(())
//!     }
//! }
//!
//! let mut sim = Simulation::default();
//! let counter = sim.add_component(Counter(0));
//! sim.schedule(Duration::default(), counter, Tick);
//! let stop = sim.run_until(Duration::from_secs(5)).unwrap();
//! assert_eq!(stop, StopReason::HorizonReached);
//! assert_eq!(sim.scheduler.time(), Duration::from_secs(5));
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Simulation clock.
pub type Clock = Rc<Cell<Duration>>;

pub use component::{Component, ComponentId, Components};
pub use container::Container;
pub use error::Error;
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use simulation::{Simulation, StopReason};
pub use state::{ContainerId, Key, State};

mod component;
mod container;
mod error;
mod scheduler;
mod simulation;
mod state;
