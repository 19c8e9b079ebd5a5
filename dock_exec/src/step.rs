//! # Step engine
//!
//! A [`Step`] is a long running operation broken down into ticks. Each call to [`Step::step`]
//! performs at most one tick's worth of mutation on the rig and reports whether the operation is
//! complete. Nothing here ever blocks, the executable alone decides when to call again.
//!
//! Composition:
//! - [`Sequence`] steps exactly one child per tick, moving on to the next child on the tick after
//!   the current one reports done.
//! - [`Parallel`] steps every unfinished child once per tick and is done once all children are.
//!   A finished child is dropped and never stepped again.
//!
//! Errors are precondition violations (missing devices), they are propagated straight up and
//! never retried.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::fmt::Debug;

use log::debug;

use crate::rig::{Rig, RigError, Structure};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Step: Debug {
    /// Advance the operation by one tick.
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of stepping an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    NotDone,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs its children one after another.
#[derive(Debug)]
pub struct Sequence {
    name: &'static str,
    steps: VecDeque<Box<dyn Step>>,
}

/// Runs its children side by side.
#[derive(Debug)]
pub struct Parallel {
    name: &'static str,
    children: Vec<Option<Box<dyn Step>>>,
}

/// A single-tick operation, done as soon as it has run once.
pub struct Action<F> {
    name: &'static str,
    f: F,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StepStatus {
    pub fn from_done(done: bool) -> Self {
        if done {
            StepStatus::Done
        } else {
            StepStatus::NotDone
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StepStatus::Done)
    }
}

impl Sequence {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: VecDeque::new(),
        }
    }

    /// Append a step to the end of the sequence.
    pub fn then<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Number of steps not yet complete, including the current one.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Step for Sequence {
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError> {
        let done = match self.steps.front_mut() {
            Some(current) => current.step(rig, structure)?.is_done(),
            None => return Ok(StepStatus::Done),
        };

        if done {
            if let Some(finished) = self.steps.pop_front() {
                debug!(
                    "{}: step complete, {} remaining ({:?})",
                    self.name,
                    self.steps.len(),
                    finished
                );
            }
        }

        Ok(StepStatus::from_done(self.steps.is_empty()))
    }
}

impl Parallel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    /// Add a child to run alongside the others.
    pub fn with<S: Step + 'static>(mut self, step: S) -> Self {
        self.children.push(Some(Box::new(step)));
        self
    }

    /// Number of children still running.
    pub fn num_running(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }
}

impl<S: Step + 'static> std::iter::FromIterator<S> for Parallel {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Parallel::new("parallel"), |p, s| p.with(s))
    }
}

impl Step for Parallel {
    fn step(&mut self, rig: &mut Rig, structure: &dyn Structure) -> Result<StepStatus, RigError> {
        for slot in self.children.iter_mut() {
            let done = match slot {
                Some(child) => child.step(rig, structure)?.is_done(),
                None => false,
            };

            if done {
                *slot = None;
            }
        }

        let running = self.num_running();
        if running > 0 {
            debug!("{}: {} of {} running", self.name, running, self.children.len());
        }

        Ok(StepStatus::from_done(running == 0))
    }
}

impl<F> Action<F>
where
    F: FnMut(&mut Rig) -> Result<(), RigError>,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Debug for Action<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.name)
    }
}

impl<F> Step for Action<F>
where
    F: FnMut(&mut Rig) -> Result<(), RigError>,
{
    fn step(&mut self, rig: &mut Rig, _structure: &dyn Structure) -> Result<StepStatus, RigError> {
        (self.f)(rig)?;
        Ok(StepStatus::Done)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::rig::{ActuatorId, RigFrame};
    use crate::sim::SimStructure;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every call in a shared log and reports done after `ticks` calls.
    #[derive(Debug)]
    struct Counter {
        label: char,
        ticks: usize,
        calls: usize,
        log: Rc<RefCell<Vec<char>>>,
    }

    impl Counter {
        fn new(label: char, ticks: usize, log: &Rc<RefCell<Vec<char>>>) -> Self {
            Self {
                label,
                ticks,
                calls: 0,
                log: log.clone(),
            }
        }
    }

    impl Step for Counter {
        fn step(&mut self, _: &mut Rig, _: &dyn Structure) -> Result<StepStatus, RigError> {
            self.calls += 1;
            self.log.borrow_mut().push(self.label);
            Ok(StepStatus::from_done(self.calls >= self.ticks))
        }
    }

    #[derive(Debug)]
    struct NeedsBack;

    impl Step for NeedsBack {
        fn step(&mut self, rig: &mut Rig, _: &dyn Structure) -> Result<StepStatus, RigError> {
            rig.actuator_mut(ActuatorId::Back)?;
            Ok(StepStatus::Done)
        }
    }

    fn run(step: &mut dyn Step, rig: &mut Rig, structure: &dyn Structure) -> Vec<StepStatus> {
        (0..6).map(|_| step.step(rig, structure).unwrap()).collect()
    }

    #[test]
    fn test_sequence_one_child_per_tick() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut rig = Rig::new(RigFrame::default());
        let structure = SimStructure::empty();

        let mut seq = Sequence::new("test")
            .then(Counter::new('a', 2, &log))
            .then(Counter::new('b', 1, &log))
            .then(Counter::new('c', 2, &log));

        let statuses = run(&mut seq, &mut rig, &structure);

        assert_eq!(*log.borrow(), vec!['a', 'a', 'b', 'c', 'c']);
        assert_eq!(
            statuses,
            vec![
                StepStatus::NotDone,
                StepStatus::NotDone,
                StepStatus::NotDone,
                StepStatus::NotDone,
                StepStatus::Done,
                StepStatus::Done
            ]
        );
    }

    #[test]
    fn test_parallel_caches_finished_children() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut rig = Rig::new(RigFrame::default());
        let structure = SimStructure::empty();

        let mut par = Parallel::new("test")
            .with(Counter::new('a', 1, &log))
            .with(Counter::new('b', 3, &log));

        assert_eq!(par.num_running(), 2);
        assert_eq!(par.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert_eq!(par.num_running(), 1);
        assert_eq!(par.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert_eq!(par.step(&mut rig, &structure), Ok(StepStatus::Done));
        assert_eq!(par.step(&mut rig, &structure), Ok(StepStatus::Done));

        // 'a' is only ever stepped once
        assert_eq!(*log.borrow(), vec!['a', 'b', 'b', 'b']);
    }

    #[test]
    fn test_empty_composites_are_done() {
        let mut rig = Rig::new(RigFrame::default());
        let structure = SimStructure::empty();

        assert_eq!(
            Sequence::new("empty").step(&mut rig, &structure),
            Ok(StepStatus::Done)
        );
        assert_eq!(
            Parallel::new("empty").step(&mut rig, &structure),
            Ok(StepStatus::Done)
        );
    }

    #[test]
    fn test_action_and_precondition() {
        let mut rig = Rig::new(RigFrame::default());
        let structure = SimStructure::empty();

        let mut seq = Sequence::new("test")
            .then(Action::new("weld on", |rig: &mut Rig| {
                rig.set_welders_enabled(true);
                Ok(())
            }))
            .then(NeedsBack);

        assert_eq!(seq.step(&mut rig, &structure), Ok(StepStatus::NotDone));
        assert_eq!(seq.remaining(), 1);
        assert_eq!(
            seq.step(&mut rig, &structure),
            Err(RigError::MissingActuator(ActuatorId::Back))
        );
    }
}
