use std::fmt;
use std::io;
use std::time::Duration;

use derive_more::{Display, From, Into};
use serde::{Serialize, Serializer};
use simcore::ClockRef;
use strum::IntoEnumIterator;

use crate::station::{Activity, StationKind};

/// Station-local number of a produced unit, starting at 1.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct UnitId(usize);

impl UnitId {
    /// The first unit produced by any station.
    pub const FIRST: UnitId = UnitId(1);

    /// The unit following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Whether a record marks the start or the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum Phase {
    /// Beginning of a cycle.
    Start,
    /// Completion of a cycle, after the outputs were deposited.
    End,
}

/// Label of a trace record, such as "Start Painting".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stage {
    /// Start or end.
    pub phase: Phase,
    /// What is being done.
    pub activity: Activity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.phase, self.activity)
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn serialize_time<S: Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

fn serialize_optional_time<S: Serializer>(
    time: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(time) => serializer.serialize_some(&time.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

/// A single, immutable entry of the trace.
///
/// Times are serialized as real numbers of time units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// The unit being worked on.
    pub unit: UnitId,
    /// What happened.
    pub stage: Stage,
    /// When the cycle started.
    #[serde(serialize_with = "serialize_time")]
    pub start: Duration,
    /// When the cycle ended; not set for start records.
    #[serde(serialize_with = "serialize_optional_time")]
    pub end: Option<Duration>,
    /// Simulation time at which the record was appended.
    #[serde(serialize_with = "serialize_time")]
    pub time: Duration,
    /// The station that appended the record.
    pub station: StationKind,
}

/// Number of started and finished cycles of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    /// The activity.
    pub activity: Activity,
    /// Number of start records.
    pub started: usize,
    /// Number of end records.
    pub finished: usize,
}

impl fmt::Display for ActivitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}: {}/{}]", self.activity, self.finished, self.started)
    }
}

/// Ordered start and end records of all stations in a single run.
///
/// The trace is created empty together with a simulation, stored in its state while it runs,
/// and taken out when the run is over.
#[derive(Debug, Clone)]
pub struct Trace {
    records: Vec<EventRecord>,
    clock: ClockRef,
}

impl Trace {
    /// Constructs an empty trace; `clock` is the reference to the simulation clock.
    #[must_use]
    pub fn new(clock: ClockRef) -> Self {
        Self {
            records: Vec::new(),
            clock,
        }
    }

    /// Appends a start record of `unit` at the current time.
    pub fn start(&mut self, station: StationKind, unit: UnitId) {
        let time = self.clock.time();
        self.push(station, unit, Phase::Start, time, None);
    }

    /// Appends an end record of `unit` whose cycle has started at `start`.
    pub fn end(&mut self, station: StationKind, unit: UnitId, start: Duration) {
        let time = self.clock.time();
        self.push(station, unit, Phase::End, start, Some(time));
    }

    fn push(
        &mut self,
        station: StationKind,
        unit: UnitId,
        phase: Phase,
        start: Duration,
        end: Option<Duration>,
    ) {
        let record = EventRecord {
            unit,
            stage: Stage {
                phase,
                activity: station.activity(),
            },
            start,
            end,
            time: self.clock.time(),
            station,
        };
        log::debug!(
            "[{:?}] {} {} (unit {})",
            record.time,
            record.station,
            record.stage,
            record.unit
        );
        self.records.push(record);
    }

    /// All records in the order they were appended.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Iterates over all records in the order they were appended.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if no records were appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn with_stage(&self, phase: Phase, activity: Activity) -> impl Iterator<Item = &EventRecord> {
        self.records
            .iter()
            .filter(move |r| r.stage.phase == phase && r.stage.activity == activity)
    }

    /// Number of records with the given stage.
    #[must_use]
    pub fn count(&self, phase: Phase, activity: Activity) -> usize {
        self.with_stage(phase, activity).count()
    }

    /// The earliest record with the given stage.
    #[must_use]
    pub fn first(&self, phase: Phase, activity: Activity) -> Option<&EventRecord> {
        self.with_stage(phase, activity).next()
    }

    /// Started and finished cycles of each activity.
    #[must_use]
    pub fn summary(&self) -> Vec<ActivitySummary> {
        Activity::iter()
            .map(|activity| ActivitySummary {
                activity,
                started: self.count(Phase::Start, activity),
                finished: self.count(Phase::End, activity),
            })
            .collect()
    }

    /// Writes the trace in the CSV format, with a header.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the trace as JSON objects, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_json_lines<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)?;
            writeln!(writer)?;
        }
        writer.flush()
    }
}
