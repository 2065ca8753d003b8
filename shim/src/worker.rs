use crate::error::ShimError;
use core::ptr::null;
use kart_ipc::HELPER_ENABLE_VAR;
use libc::c_char;
use log::debug;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Name of the full tool binary, expected as a sibling of the shim.
pub const WORKER_NAME: &str = "kart_cli";

/// Helper use is on by default; only a value starting with '0' disables it.
pub fn helper_enabled() -> bool {
    match std::env::var_os(HELPER_ENABLE_VAR) {
        None => true,
        Some(value) => !value.to_string_lossy().starts_with('0'),
    }
}

/// Locates the worker binary next to the shim.
///
/// The shim's own path comes from the OS (procfs on Linux, the
/// executable-path call on Darwin; `current_exe` wraps both), falling
/// back to resolving argv[0]. `kart_cli` is looked up next to that path
/// as-is, then next to its fully symlink-resolved form.
pub fn resolve_worker_path() -> Result<PathBuf, ShimError> {
    let self_path = match std::env::current_exe() {
        Ok(path) => path,
        Err(_) => {
            let argv0 = std::env::args_os()
                .next()
                .map(PathBuf::from)
                .ok_or(ShimError::WorkerNotFound { searched: vec![] })?;
            std::fs::canonicalize(&argv0).map_err(|_| ShimError::WorkerNotFound {
                searched: vec![argv0],
            })?
        }
    };

    let mut searched = Vec::new();
    for base in [Some(self_path.clone()), std::fs::canonicalize(&self_path).ok()]
        .into_iter()
        .flatten()
    {
        if let Some(dir) = base.parent() {
            let candidate = dir.join(WORKER_NAME);
            if candidate.is_file() {
                debug!("worker: {}", candidate.display());
                return Ok(candidate);
            }
            if !searched.contains(&candidate) {
                searched.push(candidate);
            }
        }
    }
    Err(ShimError::WorkerNotFound { searched })
}

/// Replaces the shim with the worker, keeping the original argv. Only
/// returns on failure.
pub fn exec_worker(worker: &Path) -> ShimError {
    let exe = match CString::new(worker.as_os_str().as_bytes()) {
        Ok(exe) => exe,
        Err(_) => {
            return ShimError::ExecFailed {
                path: worker.to_owned(),
                os_code: libc::EINVAL as i64,
            }
        }
    };
    let argv_owned: Vec<CString> = std::env::args_os()
        .filter_map(|arg| CString::new(arg.as_bytes()).ok())
        .collect();
    let argv: Vec<*const c_char> = argv_owned
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(core::iter::once(null()))
        .collect();
    // execv only returns on failure; argv outlives the call either way
    unsafe { libc::execv(exe.as_ptr(), argv.as_ptr()) };
    ShimError::ExecFailed {
        path: worker.to_owned(),
        os_code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0) as i64,
    }
}
