// src/engine/signals.rs

//! Interrupt and terminate handling.
//!
//! The coordinator runs on its own task next to the control loop and shares
//! only the [`ProcessHandle`] with it. An interrupt kills a running child and
//! keeps supervising; an interrupt with nothing to kill, a terminate request,
//! or a third interrupt ends the supervisor with [`EXIT_SIGNAL`].

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{Result, EXIT_SIGNAL};
use crate::exec::ProcessHandle;

/// Number of interrupts after which the supervisor exits regardless.
pub const MAX_INTERRUPTS: u32 = 2;

/// Capability for ending the process; tests substitute a recorder.
pub trait ExitHandler: Send + Sync {
    fn exit(&self, code: i32);
}

/// Exits the real process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl ExitHandler for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

pub struct SignalCoordinator {
    process: ProcessHandle,
    exit: Arc<dyn ExitHandler>,
    interrupts: u32,
}

impl fmt::Debug for SignalCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalCoordinator")
            .field("interrupts", &self.interrupts)
            .finish_non_exhaustive()
    }
}

impl SignalCoordinator {
    pub fn new(process: ProcessHandle, exit: Arc<dyn ExitHandler>) -> Self {
        Self {
            process,
            exit,
            interrupts: 0,
        }
    }

    /// Interrupts seen so far. Never reset.
    pub fn interrupt_count(&self) -> u32 {
        self.interrupts
    }

    /// React to one signal.
    pub async fn handle(&mut self, signal: SupervisorSignal) {
        self.interrupts += 1;

        match signal {
            SupervisorSignal::Terminate => {
                info!("terminate requested; stopping child and exiting");
                self.process.terminate().await;
                self.exit.exit(EXIT_SIGNAL);
                return;
            }
            SupervisorSignal::Interrupt => {
                if !self.process.terminate().await {
                    info!("interrupt with no running child; exiting");
                    self.exit.exit(EXIT_SIGNAL);
                    return;
                }
                info!(count = self.interrupts, "interrupt stopped the running child");
            }
        }

        if self.interrupts > MAX_INTERRUPTS {
            warn!(count = self.interrupts, "repeated interrupts; exiting");
            self.exit.exit(EXIT_SIGNAL);
        }
    }

    /// Install the OS signal handlers and process signals on a new task.
    #[cfg(unix)]
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        Ok(tokio::spawn(async move {
            loop {
                let sig = tokio::select! {
                    Some(()) = interrupt.recv() => SupervisorSignal::Interrupt,
                    Some(()) = terminate.recv() => SupervisorSignal::Terminate,
                    else => break,
                };
                self.handle(sig).await;
            }
        }))
    }

    #[cfg(not(unix))]
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                self.handle(SupervisorSignal::Interrupt).await;
            }
        }))
    }
}
