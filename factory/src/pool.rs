use std::ops::Index;

use serde::Serialize;
use simcore::{ContainerId, Simulation, State};
use strum::IntoEnumIterator;

/// Stocks of materials and intermediate goods shared by the stations.
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
#[serde(rename_all = "camelCase")]
pub enum Pool {
    /// Raw plastic used for both bodies and propellers.
    #[strum(serialize = "plastic")]
    Plastic,
    /// Electronic modules, put in during assembly.
    #[strum(serialize = "electronic")]
    Electronic,
    /// Bodies waiting for the painter.
    #[strum(serialize = "firstBodyBuffer")]
    FirstBodyBuffer,
    /// Propellers waiting for the painter.
    #[strum(serialize = "firstPropellerBuffer")]
    FirstPropellerBuffer,
    /// Painted bodies waiting for the assembler.
    #[strum(serialize = "secondBodyBuffer")]
    SecondBodyBuffer,
    /// Painted propellers waiting for the assembler.
    #[strum(serialize = "secondPropellerBuffer")]
    SecondPropellerBuffer,
    /// Finished goods.
    #[strum(serialize = "dispatch")]
    Dispatch,
}

impl Pool {
    /// Fixed capacity of the pool.
    #[must_use]
    pub fn capacity(self) -> u64 {
        match self {
            Self::Plastic => 1000,
            Self::Electronic | Self::FirstBodyBuffer | Self::FirstPropellerBuffer => 100,
            Self::SecondBodyBuffer | Self::SecondPropellerBuffer => 200,
            Self::Dispatch => 500,
        }
    }

    /// Level of the pool at the beginning of every run.
    #[must_use]
    pub fn initial_level(self) -> u64 {
        match self {
            Self::Plastic => 500,
            Self::Electronic => 100,
            _ => 0,
        }
    }
}

/// Containers of a single simulation, one per [`Pool`].
#[derive(Debug, Clone)]
pub struct Pools {
    containers: Vec<ContainerId>,
}

impl Pools {
    /// Registers all pools, at their initial levels, in `simulation`.
    ///
    /// # Errors
    ///
    /// Fails only if the capacity table is inconsistent, see [`simcore::Error::InvalidContainer`].
    pub fn create(simulation: &mut Simulation) -> Result<Self, simcore::Error> {
        let containers = Pool::iter()
            .map(|pool| simulation.add_container(pool.capacity(), pool.initial_level()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { containers })
    }

    /// Final (or current) figures of every pool.
    #[must_use]
    pub fn report(&self, state: &State) -> Vec<PoolReport> {
        Pool::iter()
            .map(|pool| {
                let container = self[pool];
                PoolReport {
                    pool,
                    capacity: state.capacity(container),
                    level: state.level(container),
                    withdrawn: state.total_withdrawn(container),
                    deposited: state.total_deposited(container),
                    waiting: state.waiting(container),
                }
            })
            .collect()
    }
}

impl Index<Pool> for Pools {
    type Output = ContainerId;
    fn index(&self, pool: Pool) -> &Self::Output {
        &self.containers[pool as usize]
    }
}

/// Snapshot of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    /// The pool this report is about.
    pub pool: Pool,
    /// Capacity of the pool.
    pub capacity: u64,
    /// Level at the time of the snapshot.
    pub level: u64,
    /// Total units taken out.
    pub withdrawn: u64,
    /// Total units put in.
    pub deposited: u64,
    /// Withdrawals still waiting.
    pub waiting: usize,
}
