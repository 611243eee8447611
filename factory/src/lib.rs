//! Drone factory simulation.
//!
//! Four stations share seven pools of materials and intermediate goods: a body maker and a
//! propeller maker turn plastic into parts, a painter paints them, and an assembler puts
//! painted parts and electronics together into finished drones. Each station is a
//! [`Station`] component cycling forever on top of the [`simcore`] engine, and every cycle
//! leaves a start and an end record in the [`Trace`] of the run.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::time::Duration;

use simcore::{Key, Simulation, StopReason};
use strum::IntoEnumIterator;
use thiserror::Error;

pub mod config;
pub use config::{Config, ConfigError, Parameter, Scenario, StartMark};

mod pool;
pub use pool::{Pool, PoolReport, Pools};

mod station;
pub use station::{Activity, Event as StationEvent, Recipe, Station, StationKind, StationState};

mod trace;
pub use trace::{ActivitySummary, EventRecord, Phase, Stage, Trace, UnitId};

/// Errors that abort a single scenario.
#[derive(Error, Debug)]
pub enum Error {
    /// The scenario is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A pool operation failed while running.
    #[error("simulation failed: {0}")]
    Simulation(#[from] simcore::Error),
}

/// A fully set up simulation of a single scenario.
pub struct Factory {
    simulation: Simulation,
    pools: Pools,
    trace: Key<Trace>,
    scenario: String,
}

impl Factory {
    /// Creates fresh pools, an empty trace, and the four stations of `scenario`, and schedules
    /// the first cycle of every station at time 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any of the scenario durations is invalid.
    pub fn build(scenario: &Scenario, start_mark: StartMark) -> Result<Self, Error> {
        let times = scenario.hold_times()?;
        log::warn!(
            "Scenario `{}`: setup time {:?} is not applied to any station",
            scenario.name,
            times.setup
        );
        let mut simulation = Simulation::default();
        let pools = Pools::create(&mut simulation)?;
        let trace = simulation
            .state
            .insert(Trace::new(simulation.scheduler.clock()));
        for kind in StationKind::iter() {
            let station = simulation.add_component(Station::new(
                kind,
                Recipe::of(kind, &times),
                pools.clone(),
                trace,
                start_mark,
            ));
            simulation.schedule(Duration::default(), station, StationEvent::Start);
        }
        Ok(Self {
            simulation,
            pools,
            trace,
            scenario: scenario.name.clone(),
        })
    }

    /// Processes a single event. Returns `false` if no events were left.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Simulation`] if a station failed to deposit its outputs.
    pub fn step(&mut self) -> Result<bool, Error> {
        Ok(self.simulation.step()?)
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.simulation.scheduler.time()
    }

    /// Trigger time of the next event, if any.
    #[must_use]
    pub fn next_event_time(&self) -> Option<Duration> {
        self.simulation.scheduler.peek_time()
    }

    /// Current figures of all pools.
    #[must_use]
    pub fn levels(&self) -> Vec<PoolReport> {
        self.pools.report(&self.simulation.state)
    }

    /// The trace recorded so far.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        self.simulation
            .state
            .get(self.trace)
            .expect("Trace not found in state")
    }

    /// Runs until `horizon` and hands over the trace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Simulation`] if a station failed to deposit its outputs.
    pub fn run(mut self, horizon: Duration) -> Result<RunReport, Error> {
        let stop = self.simulation.run_until(horizon)?;
        let levels = self.levels();
        let trace = self
            .simulation
            .state
            .remove(self.trace)
            .expect("Trace not found in state");
        Ok(RunReport {
            scenario: self.scenario,
            stop,
            time: self.simulation.scheduler.time(),
            trace,
            levels,
        })
    }
}

/// Outcome of a single scenario.
#[derive(Debug)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Why the run stopped.
    pub stop: StopReason,
    /// Simulation time at the end of the run.
    pub time: Duration,
    /// All records of the run.
    pub trace: Trace,
    /// Final figures of all pools.
    pub levels: Vec<PoolReport>,
}

impl RunReport {
    /// Final level of `pool`.
    #[must_use]
    pub fn level(&self, pool: Pool) -> u64 {
        self.levels
            .iter()
            .find(|report| report.pool == pool)
            .map_or(0, |report| report.level)
    }
}

/// Runs all scenarios of `config`, one after another, each in a fresh simulation.
///
/// A failing scenario is reported in its own slot and does not prevent the following ones
/// from running.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidHorizon`] if the horizon is invalid; no scenario is run then.
pub fn run_all(config: &Config) -> Result<Vec<Result<RunReport, Error>>, ConfigError> {
    let horizon = config.horizon()?;
    Ok(config
        .scenarios
        .iter()
        .map(|scenario| {
            log::info!("Running scenario `{}`", scenario.name);
            let result = Factory::build(scenario, config.start_mark)
                .and_then(|factory| factory.run(horizon));
            match &result {
                Ok(report) => log::info!(
                    "Scenario `{}` finished at {:?}: {} ({} records)",
                    report.scenario,
                    report.time,
                    report.stop,
                    report.trace.len()
                ),
                Err(err) => log::error!("Scenario `{}` aborted: {}", scenario.name, err),
            }
            result
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_registers_all_stations() {
        let factory = Factory::build(&Scenario::new("s", 0.5, 1.5, 1.1), StartMark::Request)
            .unwrap();
        assert_eq!(factory.time(), Duration::default());
        assert_eq!(factory.next_event_time(), Some(Duration::default()));
        assert!(factory.trace().is_empty());
        assert_eq!(factory.levels().len(), 7);
    }

    #[test]
    fn test_first_step_records_start() {
        let mut factory =
            Factory::build(&Scenario::new("s", 0.5, 1.5, 1.1), StartMark::Request).unwrap();
        assert!(factory.step().unwrap());
        let record = &factory.trace().records()[0];
        assert_eq!(record.station, StationKind::BodyMaker);
        assert_eq!(record.stage.phase, Phase::Start);
    }

    #[test]
    fn test_invalid_scenario() {
        let result = Factory::build(&Scenario::new("s", 0.5, -1.0, 1.1), StartMark::Request);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidDuration { parameter, .. })) if parameter == "painting"
        ));
    }

    #[test]
    fn test_run_all_keeps_going_after_failure() {
        let config = Config {
            horizon: 5.0,
            start_mark: StartMark::Acquired,
            scenarios: vec![
                Scenario::new("broken", 0.5, 1.5, 0.0),
                Scenario::new("fine", 0.5, 1.5, 1.1),
            ],
        };
        let results = run_all(&config).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        let report = results[1].as_ref().unwrap();
        assert_eq!(report.scenario, "fine");
        assert_eq!(report.stop, StopReason::HorizonReached);
        assert_eq!(report.time, Duration::from_secs(5));
    }

    #[test]
    fn test_run_all_rejects_horizon() {
        let config = Config {
            horizon: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            run_all(&config),
            Err(ConfigError::InvalidHorizon(_))
        ));
    }
}
