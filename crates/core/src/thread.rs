//! Thread placement helpers for pipeline stages.
//!
//! Each stage runs on a dedicated OS thread pinned to one physical core;
//! the defaults use even-numbered cores to avoid SMT siblings. Real-time
//! scheduling is best-effort: unprivileged processes typically cannot set
//! SCHED_FIFO, and the pipeline runs fine without it.

/// Pin the current thread to `core_id`.
///
/// Returns `true` on success. Failure (unknown core, unsupported
/// platform) is non-fatal; the caller logs and continues unpinned.
pub fn pin_to_core(core_id: usize) -> bool {
    match core_affinity::get_core_ids() {
        Some(cores) => match cores.into_iter().find(|c| c.id == core_id) {
            Some(core) => core_affinity::set_for_current(core),
            None => {
                tracing::warn!(core_id, "requested core not present, running unpinned");
                false
            }
        },
        None => false,
    }
}

/// Request SCHED_FIFO with the given priority for the current thread.
///
/// Returns `true` on success; usually requires CAP_SYS_NICE.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> bool {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: pthread_setschedparam with a valid pointer to a sched_param;
    // the call only inspects the current thread.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    rc == 0
}

/// Non-Linux platforms have no SCHED_FIFO; always reports failure.
#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> bool {
    false
}
