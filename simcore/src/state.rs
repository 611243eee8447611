use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use rand::RngCore;

use crate::{ComponentId, Container, Error, Scheduler};

/// A type-safe key used to fetch values from the value store.
///
/// # Construction
///
/// A key can be constructed only by calling [`State::insert`]. The state assigns a new numerical
/// ID to the inserted value.
/// Additionally, the key holds a unique hash for the state object.
/// This prevents from using the key with a different instance of [`State`] object.
/// Such operation will panic:
///
/// ```should_panic
/// # use simcore::{Key, State};
/// let mut state_1 = State::default();
/// let mut state_2 = State::default();
/// let id = state_1.insert(1);
/// let _ = state_2.remove(id);
/// ```
///
/// # Type Safety
///
/// These keys are type-safe in a sense that a key used to insert a value of type `T` cannot be
/// used to access a value of another type `U`. An attempt to do so will result in a compile error.
/// It is achieved by having the key generic over `T`. However, `T` is just a marker, and no
/// values of type `T` are stored internally.
///
/// ```compile_fail
/// # use simcore::{Key, State};
/// let mut state = State::default();
/// let id = state.insert(String::from("1"));
/// let _: Option<i32> = state.remove(id);  // Error!
/// let _ = state.remove::<i32>(id);        // Error!
/// ```
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Key<V> {
    id: usize,
    state_hash: u64,
    _marker: PhantomData<V>,
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }
}
impl<T> Copy for Key<T> {}

/// Identifies a [`Container`] registered in a [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId {
    id: usize,
    state_hash: u64,
}

/// Saved continuation of a component waiting on a container.
///
/// When the withdrawal is served, the stored event is scheduled for the component at the
/// current simulation time.
struct Resume(Box<dyn FnOnce(&mut Scheduler)>);

impl Resume {
    fn new<E: fmt::Debug + 'static>(component: ComponentId<E>, event: E) -> Self {
        Self(Box::new(move |scheduler: &mut Scheduler| {
            scheduler.schedule_immediately(component, event);
        }))
    }

    fn resume(self, scheduler: &mut Scheduler) {
        (self.0)(scheduler);
    }
}

/// State of a simulation holding all containers and arbitrary values in a store value.
pub struct State {
    store: HashMap<TypeId, HashMap<usize, Box<dyn Any>>>,
    containers: Vec<Container<Resume>>,
    next_id: usize,
    pub(crate) state_hash: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            store: HashMap::new(),
            containers: Vec::new(),
            next_id: 0,
            state_hash: rand::thread_rng().next_u64(),
        }
    }
}

impl State {
    fn assert_hash(&self, state_hash: u64) {
        assert_eq!(
            state_hash, self.state_hash,
            "State hash of the key does not match the hash of the state"
        );
    }

    /// Inserts an arbitrary value to the value store. Learn more in the documentation for [`Key`].
    #[must_use = "Discarding key results in leaking inserted value"]
    pub fn insert<V: 'static>(&mut self, value: V) -> Key<V> {
        let id = self.next_id;
        self.next_id += 1;
        self.store
            .entry(TypeId::of::<V>())
            .or_default()
            .insert(id, Box::new(value));
        Key {
            id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }

    /// Removes a value of type `V` from the value store. Learn more in the documentation for [`Key`].
    pub fn remove<V: 'static>(&mut self, key: Key<V>) -> Option<V> {
        self.assert_hash(key.state_hash);
        self.store
            .get_mut(&TypeId::of::<V>())
            .and_then(|m| m.remove(&key.id))
            .and_then(|v| v.downcast::<V>().ok())
            .map(|v| *v)
    }

    /// Gets a immutable reference to a value of a type `V` from the value store.
    /// Learn more in the documentation for [`Key`].
    #[must_use]
    pub fn get<V: 'static>(&self, key: Key<V>) -> Option<&V> {
        self.assert_hash(key.state_hash);
        self.store
            .get(&TypeId::of::<V>())
            .and_then(|m| m.get(&key.id))
            .and_then(|v| v.downcast_ref::<V>())
    }

    /// Gets a mutable reference to a value of a type `V` from the value store.
    /// Learn more in the documentation for [`Key`].
    #[must_use]
    pub fn get_mut<V: 'static>(&mut self, key: Key<V>) -> Option<&mut V> {
        self.assert_hash(key.state_hash);
        self.store
            .get_mut(&TypeId::of::<V>())
            .and_then(|m| m.get_mut(&key.id))
            .and_then(|v| v.downcast_mut::<V>())
    }

    /// Creates a new container, returning its ID.
    ///
    /// # Errors
    ///
    /// See [`Container::new`].
    pub fn new_container(&mut self, capacity: u64, level: u64) -> Result<ContainerId, Error> {
        self.containers.push(Container::new(capacity, level)?);
        Ok(ContainerId {
            id: self.containers.len() - 1,
            state_hash: self.state_hash,
        })
    }

    fn container(&self, container: ContainerId) -> &Container<Resume> {
        self.assert_hash(container.state_hash);
        &self.containers[container.id]
    }

    fn container_mut(&mut self, container: ContainerId) -> &mut Container<Resume> {
        self.assert_hash(container.state_hash);
        &mut self.containers[container.id]
    }

    /// Requests `quantity` units from `container` on behalf of `component`.
    ///
    /// Once the request is served, `event` is scheduled for `component` at the time of serving.
    /// This is also the case when the request can be served right away: the component is
    /// resumed through the scheduler, never directly.
    ///
    /// # Errors
    ///
    /// See [`Container::withdraw`].
    pub fn withdraw<E: fmt::Debug + 'static>(
        &mut self,
        container: ContainerId,
        quantity: u64,
        scheduler: &mut Scheduler,
        component: ComponentId<E>,
        event: E,
    ) -> Result<(), Error> {
        let released = self
            .container_mut(container)
            .withdraw(quantity, Resume::new(component, event))?;
        for waiter in released {
            waiter.resume(scheduler);
        }
        Ok(())
    }

    /// Deposits `quantity` units to `container`, resuming every component whose pending
    /// withdrawal can now be served.
    ///
    /// # Errors
    ///
    /// See [`Container::deposit`].
    pub fn deposit(
        &mut self,
        container: ContainerId,
        quantity: u64,
        scheduler: &mut Scheduler,
    ) -> Result<(), Error> {
        let released = self.container_mut(container).deposit(quantity)?;
        for waiter in released {
            waiter.resume(scheduler);
        }
        Ok(())
    }

    /// Current level of `container`.
    #[must_use]
    pub fn level(&self, container: ContainerId) -> u64 {
        self.container(container).level()
    }

    /// Capacity of `container`.
    #[must_use]
    pub fn capacity(&self, container: ContainerId) -> u64 {
        self.container(container).capacity()
    }

    /// Number of withdrawals waiting on `container`.
    #[must_use]
    pub fn waiting(&self, container: ContainerId) -> usize {
        self.container(container).waiting()
    }

    /// Total units withdrawn from `container` so far.
    #[must_use]
    pub fn total_withdrawn(&self, container: ContainerId) -> u64 {
        self.container(container).total_withdrawn()
    }

    /// Total units deposited to `container` so far.
    #[must_use]
    pub fn total_deposited(&self, container: ContainerId) -> u64 {
        self.container(container).total_deposited()
    }

    /// Iterates over IDs of all registered containers.
    pub fn containers(&self) -> impl Iterator<Item = ContainerId> + '_ {
        (0..self.containers.len()).map(move |id| ContainerId {
            id,
            state_hash: self.state_hash,
        })
    }
}
