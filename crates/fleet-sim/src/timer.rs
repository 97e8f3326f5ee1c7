//! The background tick thread.
//!
//! The thread holds only a `Weak` reference to the engine, so it never keeps
//! the engine alive on its own.  It exits when the stop channel disconnects
//! (explicit `disconnect` or the engine being dropped) or when the engine
//! can no longer be upgraded.

use std::io;
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, tick};
use tracing::debug;

use crate::FleetEngine;
use crate::engine::EngineShared;

pub(crate) struct TimerHandle {
    stop: Sender<()>,
    join: JoinHandle<()>,
}

impl TimerHandle {
    pub(crate) fn spawn(engine: Weak<EngineShared>, period: Duration) -> io::Result<Self> {
        let (stop, stop_rx) = bounded::<()>(0);
        let join = thread::Builder::new()
            .name("fleet-tick".into())
            .spawn(move || run(engine, period, stop_rx))?;
        Ok(Self { stop, join })
    }

    /// Signal the thread and wait for it to finish its current tick.
    ///
    /// When called from the tick thread itself (a subscriber disconnecting
    /// the engine) the join is skipped; the loop exits after the tick.
    pub(crate) fn stop(self) {
        drop(self.stop);
        if self.join.thread().id() != thread::current().id() {
            let _ = self.join.join();
        }
    }

    /// Signal the thread without waiting for it.
    pub(crate) fn detach(self) {
        drop(self.stop);
    }
}

fn run(engine: Weak<EngineShared>, period: Duration, stop: Receiver<()>) {
    let ticker = tick(period);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                // `select!` picks randomly among ready arms; stop wins.
                if stopped(&stop) {
                    break;
                }
                let Some(shared) = engine.upgrade() else { break };
                FleetEngine { shared }.timer_tick(|| stopped(&stop));
            }
        }
    }
    debug!("fleet_timer_stopped");
}

fn stopped(stop: &Receiver<()>) -> bool {
    matches!(stop.try_recv(), Err(TryRecvError::Disconnected))
}
