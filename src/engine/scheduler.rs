use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::content::NodeId;

/// Deferred work the engine hands to its scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    SimulationTick,
    RepulsionFrame,
    Rebuild,
    Navigate(NodeId),
    Pulse(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

pub trait Clock {
    fn now(&self) -> Duration;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// One-shot timers. Nothing fires on its own: the owner polls `next_due`.
pub trait Scheduler {
    fn now(&self) -> Duration;
    fn schedule_tick(&mut self, task: Task, delay: Duration) -> TickHandle;
    fn cancel_tick(&mut self, handle: TickHandle) -> bool;
    /// Removes and returns the earliest timer whose deadline has passed.
    fn next_due(&mut self) -> Option<(TickHandle, Task)>;
    fn next_deadline(&self) -> Option<Duration>;
    fn pending(&self) -> usize;
    fn cancel_all(&mut self);
}

pub struct TimerQueue<C: Clock> {
    clock: C,
    timers: BTreeMap<(Duration, u64), Task>,
    deadlines: HashMap<u64, Duration>,
    next_handle: u64,
}

impl<C: Clock> TimerQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timers: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_scheduled(&self, handle: TickHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }
}

impl TimerQueue<MonotonicClock> {
    pub fn monotonic() -> Self {
        Self::new(MonotonicClock::default())
    }
}

impl<C: Clock> Scheduler for TimerQueue<C> {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn schedule_tick(&mut self, task: Task, delay: Duration) -> TickHandle {
        let handle = self.next_handle;
        self.next_handle += 1;

        let deadline = self.clock.now() + delay;
        self.timers.insert((deadline, handle), task);
        self.deadlines.insert(handle, deadline);
        TickHandle(handle)
    }

    fn cancel_tick(&mut self, handle: TickHandle) -> bool {
        let Some(deadline) = self.deadlines.remove(&handle.0) else {
            return false;
        };
        self.timers.remove(&(deadline, handle.0)).is_some()
    }

    fn next_due(&mut self) -> Option<(TickHandle, Task)> {
        let now = self.clock.now();
        let (&(deadline, handle), _) = self.timers.first_key_value()?;
        if deadline > now {
            return None;
        }

        let task = self.timers.remove(&(deadline, handle))?;
        self.deadlines.remove(&handle);
        Some((TickHandle(handle), task))
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pending(&self) -> usize {
        self.timers.len()
    }

    fn cancel_all(&mut self) {
        self.timers.clear();
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (ManualClock, TimerQueue<ManualClock>) {
        let clock = ManualClock::new();
        (clock.clone(), TimerQueue::new(clock))
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let (clock, mut queue) = queue();
        queue.schedule_tick(Task::Rebuild, Duration::from_millis(200));
        queue.schedule_tick(Task::SimulationTick, Duration::from_millis(16));
        queue.schedule_tick(Task::Navigate(4), Duration::from_millis(16));

        assert!(queue.next_due().is_none());

        clock.advance(Duration::from_millis(16));
        assert_eq!(queue.next_due().map(|(_, task)| task), Some(Task::SimulationTick));
        assert_eq!(queue.next_due().map(|(_, task)| task), Some(Task::Navigate(4)));
        assert!(queue.next_due().is_none());

        clock.advance(Duration::from_millis(500));
        assert_eq!(queue.next_due().map(|(_, task)| task), Some(Task::Rebuild));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cancel_tick_removes_only_that_timer() {
        let (clock, mut queue) = queue();
        let first = queue.schedule_tick(Task::Pulse(1), Duration::from_millis(10));
        let second = queue.schedule_tick(Task::Pulse(2), Duration::from_millis(10));

        assert!(queue.cancel_tick(first));
        assert!(!queue.cancel_tick(first));
        assert!(queue.is_scheduled(second));

        clock.advance(Duration::from_millis(10));
        assert_eq!(queue.next_due(), Some((second, Task::Pulse(2))));
    }

    #[test]
    fn test_cancel_all_and_next_deadline() {
        let (_, mut queue) = queue();
        assert_eq!(queue.next_deadline(), None);

        queue.schedule_tick(Task::RepulsionFrame, Duration::from_millis(30));
        queue.schedule_tick(Task::SimulationTick, Duration::from_millis(5));
        assert_eq!(queue.next_deadline(), Some(Duration::from_millis(5)));

        queue.cancel_all();
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.next_deadline(), None);
    }
}
