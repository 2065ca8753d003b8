use crate::error::ShimError;
use core::ptr::null;
use kart_ipc::{HelperStream, HELPER_ENABLE_VAR};
use libc::c_char;
use log::debug;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::time::Duration;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Connects to the session helper, starting one first if none is
/// listening. A fresh helper gets a bounded grace period to bind the
/// socket before the shim gives up.
pub fn connect_or_spawn(socket_path: &Path, worker: &Path) -> Result<HelperStream, ShimError> {
    if let Ok(stream) = HelperStream::connect(socket_path) {
        return Ok(stream);
    }
    spawn_detached_helper(worker, socket_path)?;
    for attempt in 1..=CONNECT_ATTEMPTS {
        match HelperStream::connect(socket_path) {
            Ok(stream) => {
                debug!("connected to helper after {} attempts", attempt);
                return Ok(stream);
            }
            Err(_) => std::thread::sleep(CONNECT_RETRY_DELAY),
        }
    }
    Err(ShimError::HelperUnreachable {
        socket_path: socket_path.to_owned(),
    })
}

/// Double-forks a helper process running `<worker> helper --socket <path>`.
///
/// The first child exits as soon as it has forked a grandchild, and the
/// shim reaps it, so the helper ends up parented to init with no zombie
/// left behind. The grandchild starts its own session and marks the
/// inherited stdio close-on-exec: the helper must not hold the shim's
/// terminal, real streams arrive per-invocation as ancillary data. The
/// helper-enable variable is dropped from its environment so it cannot
/// recurse into a helper of its own.
fn spawn_detached_helper(worker: &Path, socket_path: &Path) -> Result<(), ShimError> {
    // Everything the grandchild needs after fork() is materialised now;
    // allocating between fork and exec is off-limits
    let exe = CString::new(worker.as_os_str().as_bytes()).map_err(|_| ShimError::SpawnFailed {
        description: "building helper command line",
        os_code: libc::EINVAL as i64,
    })?;
    let argv_owned: Vec<CString> = [
        worker.as_os_str().as_bytes(),
        &b"helper"[..],
        &b"--socket"[..],
        socket_path.as_os_str().as_bytes(),
    ]
    .into_iter()
    .map(CString::new)
    .collect::<Result<_, _>>()
    .map_err(|_| ShimError::SpawnFailed {
        description: "building helper command line",
        os_code: libc::EINVAL as i64,
    })?;
    let argv: Vec<*const c_char> = argv_owned
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(core::iter::once(null()))
        .collect();
    let envp_owned: Vec<CString> = std::env::vars_os()
        .filter(|(key, _)| key != HELPER_ENABLE_VAR)
        .filter_map(|(key, value)| {
            let mut pair = key.as_bytes().to_vec();
            pair.push(b'=');
            pair.extend_from_slice(value.as_bytes());
            CString::new(pair).ok()
        })
        .collect();
    let envp: Vec<*const c_char> = envp_owned
        .iter()
        .map(|pair| pair.as_ptr())
        .chain(core::iter::once(null()))
        .collect();

    debug!("spawning helper: {} helper --socket {}", worker.display(), socket_path.display());

    match unsafe { libc::fork() } {
        -1 => Err(ShimError::SpawnFailed {
            description: "fork()",
            os_code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0) as i64,
        }),
        0 => {
            // First child: detach a grandchild, then vanish. Only
            // async-signal-safe calls from here on.
            unsafe {
                if libc::fork() == 0 {
                    libc::setsid();
                    for fd in 0..3 {
                        libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
                    }
                    libc::execve(exe.as_ptr(), argv.as_ptr(), envp.as_ptr());
                    // exec failed; nothing to clean up in a forked image
                    libc::_exit(1);
                }
                libc::_exit(0);
            }
        }
        child => {
            let mut status: libc::c_int = 0;
            let res = unsafe { libc::waitpid(child, &mut status, 0) };
            if res < 0 {
                return Err(ShimError::SpawnFailed {
                    description: "waitpid()",
                    os_code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0) as i64,
                });
            }
            Ok(())
        }
    }
}
