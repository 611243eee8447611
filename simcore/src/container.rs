use std::collections::VecDeque;

use crate::Error;

/// A bounded amount of a homogeneous resource with first-come-first-served withdrawals.
///
/// The container holds `level` units out of at most `capacity`. Withdrawals that cannot be
/// served right away wait in a queue together with a `waiter` value, which is handed back once
/// the withdrawal has been served. Withdrawals are always served in the order they were
/// requested: a small request that would fit right now still waits behind a larger one at the
/// head of the queue.
///
/// # Examples
///
/// ```
/// # use simcore::Container;
/// let mut container: Container<&str> = Container::new(10, 0).unwrap();
/// assert!(container.withdraw(5, "A").unwrap().is_empty());
/// assert!(container.withdraw(2, "B").unwrap().is_empty());
/// // Enough for B, but A is first.
/// assert!(container.deposit(3).unwrap().is_empty());
/// assert_eq!(container.deposit(2).unwrap(), vec!["A"]);
/// assert_eq!(container.deposit(2).unwrap(), vec!["B"]);
/// assert_eq!(container.level(), 0);
/// ```
pub struct Container<W> {
    capacity: u64,
    level: u64,
    waiting: VecDeque<(u64, W)>,
    withdrawn: u64,
    deposited: u64,
}

impl<W> Container<W> {
    /// Creates a container with the given capacity and initial level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if the capacity is zero or the level exceeds it.
    pub fn new(capacity: u64, level: u64) -> Result<Self, Error> {
        if capacity == 0 || level > capacity {
            return Err(Error::InvalidContainer { capacity, level });
        }
        Ok(Self {
            capacity,
            level,
            waiting: VecDeque::new(),
            withdrawn: 0,
            deposited: 0,
        })
    }

    /// Requests `quantity` units on behalf of `waiter`.
    ///
    /// The request joins the back of the waiting queue, and then the queue is served from the
    /// head. Returns the waiters whose requests have been served, in order; it contains
    /// `waiter` only if nobody was waiting before and the level was sufficient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `quantity` is zero or greater than the capacity,
    /// since such a request can never be served.
    pub fn withdraw(&mut self, quantity: u64, waiter: W) -> Result<Vec<W>, Error> {
        if quantity == 0 || quantity > self.capacity {
            return Err(Error::InvalidRequest {
                quantity,
                capacity: self.capacity,
            });
        }
        self.waiting.push_back((quantity, waiter));
        Ok(self.release())
    }

    /// Puts `quantity` units into the container, and serves as many waiting withdrawals as
    /// possible. Returns the waiters whose requests have been served, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `quantity` is zero, and
    /// [`Error::CapacityExceeded`] if the new level would be above capacity. In both cases,
    /// nothing is deposited.
    pub fn deposit(&mut self, quantity: u64) -> Result<Vec<W>, Error> {
        if quantity == 0 {
            return Err(Error::InvalidRequest {
                quantity,
                capacity: self.capacity,
            });
        }
        if quantity > self.capacity - self.level {
            return Err(Error::CapacityExceeded {
                quantity,
                level: self.level,
                capacity: self.capacity,
            });
        }
        self.level += quantity;
        self.deposited += quantity;
        Ok(self.release())
    }

    fn release(&mut self) -> Vec<W> {
        let mut released = Vec::new();
        while let Some((quantity, _)) = self.waiting.front() {
            if *quantity > self.level {
                break;
            }
            let (quantity, waiter) = self
                .waiting
                .pop_front()
                .expect("Front element was just inspected");
            self.level -= quantity;
            self.withdrawn += quantity;
            released.push(waiter);
        }
        released
    }

    /// Maximum number of units the container can hold.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of units currently in the container.
    #[must_use]
    pub fn level(&self) -> u64 {
        self.level
    }

    /// Number of withdrawals waiting to be served.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Total number of units handed out to served withdrawals so far.
    #[must_use]
    pub fn total_withdrawn(&self) -> u64 {
        self.withdrawn
    }

    /// Total number of units deposited so far.
    #[must_use]
    pub fn total_deposited(&self) -> u64 {
        self.deposited
    }
}
