//! Background execution of a simulation.
//!
//! The driver runs on its own thread; events and progress arrive on a
//! channel in round order so a front end can render them while the run
//! continues.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver};

use crate::report::{RoundEvent, SummaryReport};
use crate::runner::{run_simulation, CancelToken, SimulationConfig};

/// Message sent from the worker thread.
#[derive(Clone, Debug, PartialEq)]
pub enum SimulationMessage {
    /// One individual's outcome.
    Event(RoundEvent),
    /// A round finished.
    Progress { round: u64, total: u64 },
}

/// Handle to a simulation running on a worker thread.
#[derive(Debug)]
pub struct SimulationHandle {
    messages: Receiver<SimulationMessage>,
    cancel: CancelToken,
    join: JoinHandle<SummaryReport>,
}

impl SimulationHandle {
    /// Channel of events and progress updates. Closes when the run ends.
    pub fn messages(&self) -> &Receiver<SimulationMessage> {
        &self.messages
    }

    /// Token that stops the run before its next round.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to finish.
    pub fn join(self) -> thread::Result<SummaryReport> {
        self.join.join()
    }
}

/// Start `config` on a worker thread.
///
/// Per-individual events are forwarded only when `forward_events` is set;
/// progress is always forwarded.
pub fn spawn_simulation(config: SimulationConfig, forward_events: bool) -> SimulationHandle {
    let (tx, rx) = unbounded();
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let join = thread::spawn(move || {
        let events = tx.clone();
        // Send errors mean the receiver is gone; the run still completes.
        run_simulation(
            &config,
            |event| {
                if forward_events {
                    let _ = events.send(SimulationMessage::Event(event.clone()));
                }
            },
            |round, total| {
                let _ = tx.send(SimulationMessage::Progress { round, total });
            },
            Some(&token),
        )
    });

    SimulationHandle {
        messages: rx,
        cancel,
        join,
    }
}
