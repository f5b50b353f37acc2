//! Transition path computation

use heapless::Vec;
use qp_core::{QError, QResult, QSignal};

use crate::hsm::{path_to_root, StatePath};
use crate::{QHsm, QStateMachine};

/// Exit and entry sequence of one transition.
///
/// Exits are listed deepest first, entries shallowest first. The plan is
/// computed before any action runs, so a transition either runs completely
/// or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct QTransition<S> {
    exits: StatePath<S>,
    entries: StatePath<S>,
    target: S,
}

impl<S: Copy + PartialEq + core::fmt::Debug> QTransition<S> {
    /// Plan the transition taken by `source` while `leaf` is current.
    ///
    /// States from `leaf` up to `source` are left first. A transition into a
    /// descendant of `source` keeps `source` active; any other target exits
    /// `source` and climbs to the nearest state that strictly contains the
    /// target. A self-transition therefore exits and re-enters its state,
    /// as does a transition to an ancestor.
    pub fn plan<M>(machine: &M, leaf: S, source: S, target: S) -> QResult<Self>
    where
        M: QStateMachine<State = S>,
    {
        let mut exits: StatePath<S> = Vec::new();

        let mut s = leaf;
        while s != source {
            exits.push(s).map_err(|_| QError::InvalidTransition)?;
            s = machine.superstate(s).ok_or(QError::InvalidTransition)?;
        }

        let target_path = path_to_root(machine, target)?;
        let strictly_contains_target = |s: S| s != target && target_path.contains(&s);

        let lca = if strictly_contains_target(source) {
            Some(source)
        } else {
            exits.push(source).map_err(|_| QError::InvalidTransition)?;
            let mut up = machine.superstate(source);
            loop {
                match up {
                    Some(p) if strictly_contains_target(p) => break Some(p),
                    Some(p) => {
                        exits.push(p).map_err(|_| QError::InvalidTransition)?;
                        up = machine.superstate(p);
                    }
                    None => break None,
                }
            }
        };

        let mut entries: StatePath<S> = Vec::new();
        for s in target_path.iter().rev().skip_while(|s| Some(**s) != lca) {
            if Some(*s) != lca {
                entries.push(*s).map_err(|_| QError::InvalidTransition)?;
            }
        }
        if lca.is_none() {
            for s in target_path.iter().rev() {
                entries.push(*s).map_err(|_| QError::InvalidTransition)?;
            }
        }

        Ok(Self { exits, entries, target })
    }

    pub fn exits(&self) -> &[S] {
        &self.exits
    }

    pub fn entries(&self) -> &[S] {
        &self.entries
    }

    pub fn target(&self) -> S {
        self.target
    }

    /// Run exit actions, then entry actions, and make the target current.
    pub fn execute<M>(&self, hsm: &mut QHsm<M>)
    where
        M: QStateMachine<State = S>,
    {
        for s in self.exits.iter() {
            hsm.trigger(*s, QSignal::EXIT);
        }
        for s in self.entries.iter() {
            hsm.trigger(*s, QSignal::ENTRY);
        }
        hsm.set_state(self.target);
    }
}
