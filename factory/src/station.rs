use std::time::Duration;

use serde::Serialize;
use simcore::{Component, ComponentId, Key, Scheduler, State};

use crate::config::{HoldTimes, StartMark};
use crate::trace::{Trace, UnitId};
use crate::{Pool, Pools};

/// The four production stations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StationKind {
    /// Makes bodies out of plastic.
    BodyMaker,
    /// Makes propellers out of plastic.
    PropellerMaker,
    /// Paints bodies and propellers.
    Painter,
    /// Puts together painted bodies, propellers, and electronics.
    Assembler,
}

impl StationKind {
    /// The activity performed by the station.
    #[must_use]
    pub fn activity(self) -> Activity {
        match self {
            Self::BodyMaker => Activity::BodyMaking,
            Self::PropellerMaker => Activity::PropellerMaking,
            Self::Painter => Activity::Painting,
            Self::Assembler => Activity::Assembling,
        }
    }
}

/// Activity names as they appear in trace labels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::EnumIter,
    strum::Display,
)]
pub enum Activity {
    /// See [`StationKind::BodyMaker`].
    #[strum(serialize = "Body Making")]
    #[serde(rename = "Body Making")]
    BodyMaking,
    /// See [`StationKind::PropellerMaker`].
    #[strum(serialize = "Propeller Making")]
    #[serde(rename = "Propeller Making")]
    PropellerMaking,
    /// See [`StationKind::Painter`].
    #[strum(serialize = "Painting")]
    #[serde(rename = "Painting")]
    Painting,
    /// See [`StationKind::Assembler`].
    #[strum(serialize = "Assembling")]
    #[serde(rename = "Assembling")]
    Assembling,
}

/// What a station consumes, how long it works, and what it produces, per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Inputs, withdrawn one after another in this order.
    pub inputs: Vec<(Pool, u64)>,
    /// Processing time.
    pub hold: Duration,
    /// Outputs, deposited in this order.
    pub outputs: Vec<(Pool, u64)>,
}

impl Recipe {
    /// The recipe of the given station.
    #[must_use]
    pub fn of(kind: StationKind, times: &HoldTimes) -> Self {
        match kind {
            StationKind::BodyMaker => Self {
                inputs: vec![(Pool::Plastic, 1)],
                hold: times.body,
                outputs: vec![(Pool::FirstBodyBuffer, 1)],
            },
            StationKind::PropellerMaker => Self {
                inputs: vec![(Pool::Plastic, 1)],
                hold: times.propeller,
                outputs: vec![(Pool::FirstPropellerBuffer, 4)],
            },
            StationKind::Painter => Self {
                inputs: vec![(Pool::FirstBodyBuffer, 2), (Pool::FirstPropellerBuffer, 8)],
                hold: times.painting,
                outputs: vec![
                    (Pool::SecondPropellerBuffer, 8),
                    (Pool::SecondBodyBuffer, 2),
                ],
            },
            StationKind::Assembler => Self {
                inputs: vec![
                    (Pool::SecondPropellerBuffer, 4),
                    (Pool::SecondBodyBuffer, 1),
                    (Pool::Electronic, 1),
                ],
                hold: times.assembly,
                outputs: vec![(Pool::Dispatch, 1)],
            },
        }
    }
}

/// Station events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begins a new cycle; only used to start the station up.
    Start,
    /// The input with the given index in the recipe has been acquired.
    Acquired(usize),
    /// Processing of the current unit has finished.
    Processed,
}

/// Where in its cycle a station is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StationState {
    /// Between cycles.
    Idle,
    /// Waiting for inputs.
    Acquiring,
    /// Holding for the processing time.
    Processing,
    /// Putting outputs into downstream pools.
    Depositing,
}

/// A station repeats the same cycle forever: it takes its inputs, works on them, and puts the
/// outputs in the downstream pools.
///
/// Inputs are acquired strictly one after another, in the recipe order, and each of them is
/// held while waiting for the next one. Every cycle appends a start record and an end record
/// to the trace; the end record is appended once all outputs are deposited.
pub struct Station {
    kind: StationKind,
    recipe: Recipe,
    pools: Pools,
    trace: Key<Trace>,
    start_mark: StartMark,
    product_id: UnitId,
    cycle_start: Duration,
    state: StationState,
}

impl Station {
    /// Constructs a station in the idle state, about to work on its first unit.
    #[must_use]
    pub fn new(
        kind: StationKind,
        recipe: Recipe,
        pools: Pools,
        trace: Key<Trace>,
        start_mark: StartMark,
    ) -> Self {
        Self {
            kind,
            recipe,
            pools,
            trace,
            start_mark,
            product_id: UnitId::FIRST,
            cycle_start: Duration::default(),
            state: StationState::Idle,
        }
    }

    /// The kind of this station.
    #[must_use]
    pub fn kind(&self) -> StationKind {
        self.kind
    }

    /// The unit currently worked on, or the next one if idle.
    #[must_use]
    pub fn product_id(&self) -> UnitId {
        self.product_id
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> StationState {
        self.state
    }

    fn transition(&mut self, state: StationState, scheduler: &Scheduler) {
        log::trace!(
            "[{:?}] {} {:?} -> {:?} (unit {})",
            scheduler.time(),
            self.kind,
            self.state,
            state,
            self.product_id
        );
        self.state = state;
    }

    fn record_start(&mut self, scheduler: &Scheduler, state: &mut State) {
        self.cycle_start = scheduler.time();
        state
            .get_mut(self.trace)
            .expect("Trace not found in state")
            .start(self.kind, self.product_id);
    }

    fn begin_cycle(
        &mut self,
        self_id: ComponentId<Event>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), simcore::Error> {
        self.transition(StationState::Acquiring, scheduler);
        if self.start_mark == StartMark::Request {
            self.record_start(scheduler, state);
        }
        self.acquire(0, self_id, scheduler, state)
    }

    /// Requests the input at `index`, or starts processing if all inputs are held.
    fn acquire(
        &mut self,
        index: usize,
        self_id: ComponentId<Event>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), simcore::Error> {
        match self.recipe.inputs.get(index) {
            Some(&(pool, quantity)) => state.withdraw(
                self.pools[pool],
                quantity,
                scheduler,
                self_id,
                Event::Acquired(index),
            ),
            None => {
                self.transition(StationState::Processing, scheduler);
                if self.start_mark == StartMark::Acquired {
                    self.record_start(scheduler, state);
                }
                scheduler.schedule(self.recipe.hold, self_id, Event::Processed);
                Ok(())
            }
        }
    }

    fn finish_cycle(
        &mut self,
        self_id: ComponentId<Event>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), simcore::Error> {
        self.transition(StationState::Depositing, scheduler);
        for &(pool, quantity) in &self.recipe.outputs {
            state.deposit(self.pools[pool], quantity, scheduler)?;
        }
        state
            .get_mut(self.trace)
            .expect("Trace not found in state")
            .end(self.kind, self.product_id, self.cycle_start);
        self.product_id = self.product_id.next();
        self.transition(StationState::Idle, scheduler);
        self.begin_cycle(self_id, scheduler, state)
    }
}

impl Component for Station {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<(), simcore::Error> {
        match event {
            Event::Start => {
                debug_assert_eq!(self.state, StationState::Idle);
                self.begin_cycle(self_id, scheduler, state)
            }
            Event::Acquired(index) => {
                debug_assert_eq!(self.state, StationState::Acquiring);
                self.acquire(index + 1, self_id, scheduler, state)
            }
            Event::Processed => {
                debug_assert_eq!(self.state, StationState::Processing);
                self.finish_cycle(self_id, scheduler, state)
            }
        }
    }
}
