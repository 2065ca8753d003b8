use crate::error::ShimError;
use core::sync::atomic::{AtomicI32, Ordering};
use libc::c_int;

// The exit code the helper reports is offset so that code 0 is
// distinguishable from a never-written semaphore.
const EXIT_CODE_OFFSET: c_int = 1000;

const WAIT_SECONDS: libc::c_uint = 86_400;

// Signal handlers only receive a signum, so the semaphore id they need
// lives in a process-global cell, stored before any handler is installed.
static EXIT_SEM_ID: AtomicI32 = AtomicI32::new(-1);

/// A private one-slot SysV semaphore, initialised to zero. The helper
/// stores `1000 + exit_code` into slot 0 and raises SIGALRM at the shim;
/// the SIGALRM handler reads it back, removes the semaphore, and exits.
pub struct ExitSemaphore {
    id: c_int,
}

impl ExitSemaphore {
    pub fn create() -> Result<Self, ShimError> {
        let id = unsafe {
            libc::semget(
                libc::IPC_PRIVATE,
                1,
                libc::IPC_CREAT | libc::IPC_EXCL | (libc::S_IRUSR | libc::S_IWUSR) as c_int,
            )
        };
        if id < 0 {
            return Err(ShimError::SemaphoreCreateFailed {
                os_code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0) as i64,
            });
        }
        Ok(Self { id })
    }

    pub fn id(&self) -> c_int {
        self.id
    }

    /// Removes the semaphore. Normal exits remove it from the SIGALRM
    /// handler instead; this is for error paths that still own it.
    pub fn destroy(self) {
        unsafe { libc::semctl(self.id, 0, libc::IPC_RMID) };
    }
}

/// Publishes the semaphore id for the handlers and installs them. Must
/// run before the payload is sent: a fast helper may signal completion
/// immediately.
pub fn install_handlers(semaphore: &ExitSemaphore) {
    EXIT_SEM_ID.store(semaphore.id(), Ordering::SeqCst);
    install(libc::SIGALRM, handle_alarm);
    install(libc::SIGINT, handle_interrupt);
    install(libc::SIGUSR1, handle_inhibit);
}

fn install(signum: c_int, handler: extern "C" fn(c_int)) {
    unsafe { libc::signal(signum, handler as libc::sighandler_t) };
}

/// Waits for the helper to finish the invocation. The normal exit
/// happens inside the SIGALRM handler; running to the end of the full
/// wait means the helper never answered.
pub fn block_for_completion() -> ShimError {
    loop {
        let unslept = unsafe { libc::sleep(WAIT_SECONDS) };
        if unslept == 0 {
            return ShimError::HelperTimeout;
        }
        // Interrupted by a signal whose handler returned (SIGUSR1):
        // keep waiting quietly
    }
}

// Everything below runs in signal context: syscalls and _exit only.

extern "C" fn handle_alarm(_signum: c_int) {
    let semid = EXIT_SEM_ID.load(Ordering::SeqCst);
    unsafe {
        let semval = libc::semctl(semid, 0, libc::GETVAL);
        libc::semctl(semid, 0, libc::IPC_RMID);
        if semval < 0 {
            libc::_exit(5);
        }
        libc::_exit(semval - EXIT_CODE_OFFSET);
    }
}

extern "C" fn handle_interrupt(_signum: c_int) {
    unsafe {
        let newline = b"\n";
        libc::write(libc::STDOUT_FILENO, newline.as_ptr().cast(), newline.len());
        // The broadcast below loops back to us; don't re-enter
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::killpg(libc::getpgrp(), libc::SIGINT);
        libc::_exit(128 + libc::SIGINT);
    }
}

extern "C" fn handle_inhibit(_signum: c_int) {
    // The worker is taking over the terminal: stop reacting to Ctrl-C
    // and leave the foreground to it
    unsafe { libc::signal(libc::SIGINT, libc::SIG_IGN) };
}
