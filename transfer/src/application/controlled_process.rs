// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Controlled Process
//!
//! A reusable long-running loop with an interactive control-command
//! channel, used as the base of both [`crate::application::uploader::UploadDaemon`]
//! and [`crate::application::downloader::DownloadDaemon`].
//!
//! State machine: Created -> Running (on `run()`) -> Stopping (on `q`/`quit`,
//! an OS shutdown signal, or natural completion) -> Stopped (after joins).
//! Transitions are one-way.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use transfer_bootstrap::create_signal_handler;

/// A command read from the interactive control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Quit,
    Check,
}

fn parse_control_command(line: &str) -> Option<ControlCommand> {
    match line.trim().to_lowercase().as_str() {
        "q" | "quit" => Some(ControlCommand::Quit),
        "c" | "check" => Some(ControlCommand::Check),
        _ => None,
    }
}

/// Spawns a daemon thread that reads lines from stdin and converts each
/// into a [`ControlCommand`], ignoring unrecognized input.
fn spawn_stdin_reader() -> Receiver<ControlCommand> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(cmd) = parse_control_command(&line) {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Hooks invoked by the control loop regardless of which run variant is
/// used. Implementors share this trait so a signal or `quit` command
/// always runs the same shutdown path.
pub trait ControlledProcessHooks: Send + Sync {
    /// Invoked when the `c`/`check` control command is received.
    fn on_check(&self) {}

    /// Invoked exactly once, when the process transitions to Stopping -
    /// either from a control command or an OS signal.
    fn on_shutdown(&self) {}
}

/// Shared bookkeeping: the `alive` flag, the control command channel, and
/// the liveness indicator. Both run variants wrap one of these.
pub struct ControlledProcessCore {
    alive: Arc<AtomicBool>,
    shutdown_started: Arc<AtomicBool>,
    update_seconds: i64,
    last_update: Instant,
    control_rx: Receiver<ControlCommand>,
}

impl ControlledProcessCore {
    /// `update_seconds < 0` suppresses the liveness indicator entirely.
    pub fn new(update_seconds: i64) -> Self {
        ControlledProcessCore {
            alive: Arc::new(AtomicBool::new(false)),
            shutdown_started: Arc::new(AtomicBool::new(false)),
            update_seconds,
            last_update: Instant::now(),
            control_rx: spawn_stdin_reader(),
        }
    }

    pub fn alive_flag(&self) -> Arc<AtomicBool> {
        self.alive.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the process Running. Must be called once before the first
    /// loop iteration.
    pub fn start(&mut self) {
        self.alive.store(true, Ordering::SeqCst);
        self.last_update = Instant::now();
    }

    /// Starts a background thread that calls `shutdown` the moment an OS
    /// shutdown signal (SIGINT/SIGTERM/SIGHUP) arrives - the Rust-native
    /// replacement for relying solely on an interactive stdin reader,
    /// since a daemon is not always attached to a terminal.
    pub fn spawn_signal_watcher(&self, hooks: Arc<dyn ControlledProcessHooks>) {
        let alive = self.alive.clone();
        let shutdown_started = self.shutdown_started.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to start signal-handling runtime");
            runtime.block_on(async move {
                let handler = create_signal_handler();
                handler
                    .wait_for_signal(Box::new(move || {
                        alive.store(false, Ordering::SeqCst);
                        if shutdown_started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                            hooks.on_shutdown();
                        }
                    }))
                    .await;
            });
        });
    }

    /// Prints a liveness mark at most once per `update_seconds`.
    pub fn print_still_alive(&mut self) {
        if self.update_seconds < 0 {
            return;
        }
        if self.last_update.elapsed() >= Duration::from_secs(self.update_seconds as u64) {
            tracing::debug!(".");
            self.last_update = Instant::now();
        }
    }

    /// Drains the control channel, dispatching each command immediately.
    pub fn check_control_command_queue(&mut self, hooks: &dyn ControlledProcessHooks) {
        while let Ok(cmd) = self.control_rx.try_recv() {
            match cmd {
                ControlCommand::Quit => {
                    self.alive.store(false, Ordering::SeqCst);
                    if self.shutdown_started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                        hooks.on_shutdown();
                    }
                }
                ControlCommand::Check => hooks.on_check(),
            }
        }
    }
}

/// Hooks for [`ControlledProcessSingleThread`].
pub trait SingleThreadHooks: ControlledProcessHooks {
    /// Runs once per iteration of the main loop.
    fn run_iteration(&self);
}

/// Runs `hooks.run_iteration()` in a loop on the calling thread until
/// shutdown, interleaved with liveness printing and control-command
/// dispatch - the single-thread variant of the controlled process.
pub struct ControlledProcessSingleThread<H: SingleThreadHooks> {
    core: ControlledProcessCore,
    hooks: H,
}

impl<H: SingleThreadHooks> ControlledProcessSingleThread<H> {
    pub fn new(hooks: H, update_seconds: i64) -> Self {
        ControlledProcessSingleThread {
            core: ControlledProcessCore::new(update_seconds),
            hooks,
        }
    }

    pub fn run(&mut self) {
        self.core.start();
        while self.core.is_alive() {
            self.hooks.run_iteration();
            self.core.print_still_alive();
            self.core.check_control_command_queue(&self.hooks);
        }
    }
}

/// Hooks for [`ControlledProcessMultiThreaded`].
pub trait MultiThreadHooks: ControlledProcessHooks {
    /// The body of one worker thread; must observe `alive` at the head of
    /// its own loop and return promptly once it flips to `false`.
    fn worker_loop(&self, worker_id: usize, alive: &AtomicBool);
}

/// Spawns `n_threads` workers, each running `hooks.worker_loop`, while the
/// calling thread only polls the control channel and prints liveness -
/// the multi-thread variant of the controlled process, used by both
/// daemons.
pub struct ControlledProcessMultiThreaded<H: MultiThreadHooks + 'static> {
    core: ControlledProcessCore,
    hooks: Arc<H>,
    n_threads: usize,
}

impl<H: MultiThreadHooks + 'static> ControlledProcessMultiThreaded<H> {
    pub fn new(hooks: Arc<H>, n_threads: usize, update_seconds: i64) -> Self {
        ControlledProcessMultiThreaded {
            core: ControlledProcessCore::new(update_seconds),
            hooks,
            n_threads,
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }

    pub fn run(&mut self) {
        self.core.start();
        self.core.spawn_signal_watcher(self.hooks.clone());

        let alive = self.core.alive_flag();
        let mut workers = Vec::with_capacity(self.n_threads);
        for worker_id in 0..self.n_threads {
            let hooks = self.hooks.clone();
            let alive = alive.clone();
            workers.push(thread::spawn(move || hooks.worker_loop(worker_id, &alive)));
        }

        while self.core.is_alive() {
            self.core.print_still_alive();
            self.core.check_control_command_queue(self.hooks.as_ref());
            thread::sleep(Duration::from_millis(50));
        }

        for worker in workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_case_insensitively() {
        assert_eq!(parse_control_command("Q"), Some(ControlCommand::Quit));
        assert_eq!(parse_control_command("quit"), Some(ControlCommand::Quit));
        assert_eq!(parse_control_command("C"), Some(ControlCommand::Check));
        assert_eq!(parse_control_command("check"), Some(ControlCommand::Check));
        assert_eq!(parse_control_command("whatever"), None);
    }

    struct CountingHooks {
        iterations: Arc<AtomicBool>,
    }

    impl ControlledProcessHooks for CountingHooks {}
    impl SingleThreadHooks for CountingHooks {
        fn run_iteration(&self) {
            self.iterations.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn single_thread_core_transitions_alive_then_stopped() {
        let mut core = ControlledProcessCore::new(-1);
        assert!(!core.is_alive());
        core.start();
        assert!(core.is_alive());
    }
}
