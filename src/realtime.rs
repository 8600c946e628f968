//! Real-time scheduling for the timing-critical part of a read.
//!
//! A general-purpose scheduler can preempt the sampling thread for
//! milliseconds, longer than the whole sensor frame. While a
//! [`RealtimeGuard`] is alive the thread runs at the highest `SCHED_FIFO`
//! priority with all pages locked; dropping the guard restores the previous
//! policy and releases the memory lock it took.
//!
//! Elevation needs `CAP_SYS_NICE`/`CAP_IPC_LOCK` (or root). Without them the
//! read still proceeds, only with worse timing.
//!
//! # Example
//!
//! ```ignore
//! use dht_pulse::realtime::{LinuxScheduler, RealtimeGuard};
//!
//! let mut scheduler = LinuxScheduler::new();
//! {
//!     let guard = RealtimeGuard::enter(&mut scheduler);
//!     // ... timing critical work ...
//! } // previous scheduling restored here
//! ```

/// Outcome of a request for real-time execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RealtimeMode {
    /// The thread runs under a real-time scheduling class.
    pub priority: bool,
    /// Process memory is locked into RAM.
    pub memory_locked: bool,
}

impl RealtimeMode {
    /// Neither request succeeded.
    pub const DEGRADED: Self = Self {
        priority: false,
        memory_locked: false,
    };

    /// Both requests succeeded.
    pub const FULL: Self = Self {
        priority: true,
        memory_locked: true,
    };

    /// Returns `true` when both priority and memory locking are in effect.
    pub fn is_full(&self) -> bool {
        self.priority && self.memory_locked
    }
}

/// Controls the scheduling class of the calling thread.
///
/// Implementations must tolerate failures: `enter_realtime` reports what it
/// achieved instead of failing, and `leave_realtime` undoes only that.
pub trait Scheduler {
    /// Elevates the calling thread and locks process memory.
    fn enter_realtime(&mut self) -> RealtimeMode;

    /// Restores the scheduling in effect before the matching `enter_realtime`.
    fn leave_realtime(&mut self);
}

impl<S: Scheduler + ?Sized> Scheduler for &mut S {
    fn enter_realtime(&mut self) -> RealtimeMode {
        (**self).enter_realtime()
    }

    fn leave_realtime(&mut self) {
        (**self).leave_realtime()
    }
}

/// Scoped real-time section.
///
/// Calls [`Scheduler::enter_realtime`] on creation and
/// [`Scheduler::leave_realtime`] exactly once on drop.
pub struct RealtimeGuard<'a, S: Scheduler + ?Sized> {
    scheduler: &'a mut S,
    mode: RealtimeMode,
}

impl<'a, S: Scheduler + ?Sized> RealtimeGuard<'a, S> {
    /// Enters the real-time section.
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Elevated now, restored when the guard is dropped.
    ///
    /// Incomplete elevation is logged and otherwise ignored; check
    /// [`RealtimeGuard::mode`] for what was achieved.
    pub fn enter(scheduler: &'a mut S) -> Self {
        let mode = scheduler.enter_realtime();
        if !mode.is_full() {
            tracing::warn!(
                priority = mode.priority,
                memory_locked = mode.memory_locked,
                "real-time elevation incomplete, continuing with best-effort timing"
            );
        }
        Self { scheduler, mode }
    }

    /// What `enter_realtime` achieved for this section.
    pub fn mode(&self) -> RealtimeMode {
        self.mode
    }
}

impl<S: Scheduler + ?Sized> Drop for RealtimeGuard<'_, S> {
    fn drop(&mut self) {
        self.scheduler.leave_realtime();
    }
}

impl<S: Scheduler + ?Sized> core::fmt::Debug for RealtimeGuard<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RealtimeGuard")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Scheduler that never changes anything.
///
/// For platforms without real-time scheduling, or callers that manage
/// priority themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopScheduler;

impl Scheduler for NoopScheduler {
    fn enter_realtime(&mut self) -> RealtimeMode {
        RealtimeMode::DEGRADED
    }

    fn leave_realtime(&mut self) {}
}

#[cfg(target_os = "linux")]
pub use linux::LinuxScheduler;

#[cfg(target_os = "linux")]
mod linux {
    use std::io;

    use super::{RealtimeMode, Scheduler};

    #[derive(Clone, Copy)]
    struct SavedPolicy {
        policy: libc::c_int,
        param: libc::sched_param,
    }

    /// `SCHED_FIFO` + `mlockall` for the calling thread.
    ///
    /// Memory that was already locked when entering (`VmLck` non-zero in
    /// `/proc/self/status`) is left locked on leave.
    #[derive(Default)]
    pub struct LinuxScheduler {
        saved: Option<SavedPolicy>,
        locked: bool,
    }

    /// Locked memory in kB from the contents of `/proc/self/status`.
    fn parse_vm_lck(status: &str) -> Option<u64> {
        status
            .lines()
            .find_map(|line| line.strip_prefix("VmLck:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse().ok())
    }

    fn memory_already_locked() -> bool {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(status) => parse_vm_lck(&status).is_some_and(|kb| kb > 0),
            Err(e) => {
                tracing::debug!("cannot read /proc/self/status: {}", e);
                false
            }
        }
    }

    impl LinuxScheduler {
        /// Creates a scheduler with nothing elevated.
        pub fn new() -> Self {
            Self::default()
        }

        fn current_policy() -> io::Result<SavedPolicy> {
            unsafe {
                let policy = libc::sched_getscheduler(0);
                if policy < 0 {
                    return Err(io::Error::last_os_error());
                }
                let mut param: libc::sched_param = std::mem::zeroed();
                if libc::sched_getparam(0, &mut param) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(SavedPolicy { policy, param })
            }
        }

        fn elevate(&mut self) -> io::Result<()> {
            let previous = Self::current_policy()?;
            unsafe {
                let max = libc::sched_get_priority_max(libc::SCHED_FIFO);
                if max < 0 {
                    return Err(io::Error::last_os_error());
                }
                let mut param: libc::sched_param = std::mem::zeroed();
                param.sched_priority = max;
                if libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) != 0 {
                    return Err(io::Error::last_os_error());
                }
                tracing::debug!(priority = max, "switched to SCHED_FIFO");
            }
            self.saved = Some(previous);
            Ok(())
        }

        /// Locks all pages, unless `already_locked`; only a lock taken here is
        /// released by `leave_realtime`.
        fn lock_memory(&mut self, already_locked: bool) -> io::Result<()> {
            if already_locked {
                tracing::debug!("memory already locked, leaving it to its owner");
                return Ok(());
            }
            if unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) } != 0 {
                return Err(io::Error::last_os_error());
            }
            self.locked = true;
            Ok(())
        }
    }

    impl Scheduler for LinuxScheduler {
        fn enter_realtime(&mut self) -> RealtimeMode {
            let priority = match self.elevate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("sched_setscheduler: {}", e);
                    false
                }
            };
            let memory_locked = match self.lock_memory(memory_already_locked()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("mlockall: {}", e);
                    false
                }
            };
            RealtimeMode {
                priority,
                memory_locked,
            }
        }

        fn leave_realtime(&mut self) {
            if let Some(saved) = self.saved.take() {
                let result = unsafe { libc::sched_setscheduler(0, saved.policy, &saved.param) };
                if result != 0 {
                    tracing::warn!(
                        "failed to restore scheduling policy: {}",
                        io::Error::last_os_error()
                    );
                } else {
                    tracing::debug!(policy = saved.policy, "restored scheduling policy");
                }
            }
            if self.locked {
                self.locked = false;
                if unsafe { libc::munlockall() } != 0 {
                    tracing::warn!("munlockall: {}", io::Error::last_os_error());
                }
            }
        }
    }

    impl std::fmt::Debug for LinuxScheduler {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LinuxScheduler")
                .field("elevated", &self.saved.is_some())
                .field("locked", &self.locked)
                .finish()
        }
    }

}
