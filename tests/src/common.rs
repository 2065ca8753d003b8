use log::{debug, info};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use tempfile::TempDir;

// Common functions used by all tests for setup / check / teardown
pub fn main() {
    panic!("This crate is not designed to be run directly, use 'cargo test' to run each module in tests/*.rs");
}

static INIT_LOGGING: Once = Once::new();
pub fn common_test_setup() {
    INIT_LOGGING.call_once(|| {
        SimpleLogger::new()
            .init()
            .expect("unable to initialize logging");
    });
    std::env::set_var("RUST_BACKTRACE", "full");
}

/// Absolute path of a workspace binary (the `kart` shim or the
/// `kart_cli` stub). Test executables run from target/<profile>/deps, so
/// the binaries proper sit one directory up.
pub fn get_bin_abs_path(name: &str) -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let candidates = [
        exe.parent().map(|deps| deps.with_file_name(name)),
        exe.parent().map(|deps| deps.join(name)),
    ];
    for candidate in candidates.into_iter().flatten() {
        debug!("Trying binary {}", candidate.display());
        if candidate.is_file() {
            info!("Using binary: {}", candidate.display());
            return candidate;
        }
    }
    panic!(
        "binary {} not found next to {}, run the whole workspace test suite so it gets built",
        name,
        exe.display()
    );
}

/// A scratch home directory, so each test gets its own rendezvous socket
/// namespace.
pub fn isolated_home() -> TempDir {
    TempDir::new().expect("unable to create scratch home directory")
}

/// Session id the spawned shim will observe: sessions are inherited
/// across fork/exec, so it is ours.
pub fn current_session_id() -> libc::pid_t {
    unsafe { libc::getsid(0) }
}

/// Launches the shim with the given arguments and an overridden HOME.
/// `use_helper` maps onto KART_USE_HELPER ("0" disables, None leaves the
/// default-enabled behaviour in place).
pub fn spawn_shim(
    home: &TempDir,
    use_helper: Option<&str>,
    args: &[&str],
    cwd: Option<&std::path::Path>,
) -> Child {
    let mut command = Command::new(get_bin_abs_path("kart"));
    command
        .args(args)
        .env("HOME", home.path())
        .env_remove("KART_USE_HELPER")
        .env_remove("KART_HELPER_DEBUG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(value) = use_helper {
        command.env("KART_USE_HELPER", value);
    }
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command.spawn().expect("unable to spawn the kart shim")
}

/// Stores `1000 + exit_code` in the exit semaphore, the way the helper
/// reports completion.
pub fn store_exit_code(semid: i32, exit_code: i32) {
    let res = unsafe { libc::semctl(semid, 0, libc::SETVAL, 1000 + exit_code) };
    assert_eq!(res, 0, "semctl(SETVAL) failed on semaphore {}", semid);
}

pub fn send_signal(pid: u32, signum: i32) {
    let res = unsafe { libc::kill(pid as libc::pid_t, signum) };
    assert_eq!(res, 0, "kill({}, {}) failed", pid, signum);
}
