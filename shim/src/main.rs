// kart: the launcher installed under the name users type. It either
// execs the full kart_cli in place, or hands the invocation to a
// persistent helper over a session-scoped Unix socket and relays the
// helper's exit code.

mod error;
mod exit_gate;
mod rendezvous;
mod worker;

use error::ShimError;
use exit_gate::{block_for_completion, install_handlers, ExitSemaphore};
use kart_ipc::{helper_socket_path, InvocationPayload};
use log::debug;
use rendezvous::connect_or_spawn;
use simple_logger::SimpleLogger;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use worker::{exec_worker, helper_enabled, resolve_worker_path};

fn main() {
    if cfg!(debug_assertions) && std::env::var_os("KART_HELPER_DEBUG").is_some() {
        let _ = SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
    }

    // run() only comes back on failure: the direct path execs the worker
    // and the helper path exits from a signal handler
    let err = run();
    eprintln!("kart: {}", err);
    std::process::exit(err.exit_code());
}

fn run() -> ShimError {
    let worker = match resolve_worker_path() {
        Ok(worker) => worker,
        Err(err) => return err,
    };

    if !helper_enabled() {
        return exec_worker(&worker);
    }

    // Lead our own process group so Ctrl-C handling can signal everything
    // we started. Must happen before any fork.
    unsafe { libc::setpgid(0, 0) };

    let home = match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home),
        None => return ShimError::HomeNotSet,
    };
    let session_id = unsafe { libc::getsid(0) };
    let socket_path = helper_socket_path(&home, session_id);
    debug!("helper socket: {}", socket_path.display());

    let mut stream = match connect_or_spawn(&socket_path, &worker) {
        Ok(stream) => stream,
        Err(err) => return err,
    };

    // The semaphore must exist before the payload is built (its id is
    // part of it), and the handlers must be live before the send: the
    // helper may answer immediately.
    let semaphore = match ExitSemaphore::create() {
        Ok(semaphore) => semaphore,
        Err(err) => return err,
    };
    install_handlers(&semaphore);

    let payload = InvocationPayload::capture(semaphore.id());
    let payload_bytes = match payload.to_json() {
        Ok(bytes) => bytes,
        Err(err) => {
            semaphore.destroy();
            return err.into();
        }
    };

    let cwd = match std::env::current_dir().and_then(File::open) {
        Ok(cwd) => cwd,
        Err(err) => {
            semaphore.destroy();
            return ShimError::CwdOpenFailed {
                os_code: err.raw_os_error().unwrap_or(0) as i64,
            };
        }
    };

    let fds = [
        libc::STDIN_FILENO,
        libc::STDOUT_FILENO,
        libc::STDERR_FILENO,
        cwd.as_raw_fd(),
    ];
    if let Err(err) = stream.send_with_fds(&payload_bytes, &fds) {
        semaphore.destroy();
        return err.into();
    }
    // The kernel has duplicated the descriptors into the helper; our cwd
    // handle can go
    drop(cwd);

    block_for_completion()
}
