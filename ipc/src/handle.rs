use crate::IpcError;
use libc::{c_int, fcntl, FD_CLOEXEC, F_GETFD, F_SETFD};
use std::io::Error;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

/// Owner of one raw file descriptor. The descriptor is closed on drop,
/// duplicated on clone, and can be released to a caller taking over
/// ownership with `into_raw()`.
#[derive(Debug)]
pub struct Handle {
    fd: Option<RawFd>,
}

impl Handle {
    /// Takes ownership of `fd`. Unsafe because the caller must guarantee
    /// the descriptor is open and not owned by anything else.
    pub unsafe fn new(fd: RawFd) -> Result<Self, IpcError> {
        if fd < 0 {
            return Err(IpcError::InternalOsOperationFailed {
                description: "Handle::new() on negative file descriptor",
                os_code: fd as i64,
            });
        }
        Ok(Handle { fd: Some(fd) })
    }

    pub fn as_raw(&self) -> RawFd {
        self.fd.unwrap()
    }

    /// Releases ownership without closing.
    pub fn into_raw(mut self) -> RawFd {
        self.fd.take().unwrap()
    }

    /// Toggles FD_CLOEXEC. `allow_inherit = true` clears the flag so the
    /// descriptor survives an exec.
    pub fn set_inheritable(&mut self, allow_inherit: bool) -> Result<(), IpcError> {
        set_fd_inheritable(self.as_raw(), allow_inherit)
    }

    pub fn is_inheritable(&self) -> Result<bool, IpcError> {
        let current_flags = unsafe { fcntl(self.as_raw(), F_GETFD) };
        if current_flags < 0 {
            return Err(IpcError::last_os_error("fcntl(F_GETFD)"));
        }
        Ok((current_flags & FD_CLOEXEC) == 0)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(fd) = self.fd {
            let res = unsafe { libc::close(fd) };
            if res < 0 {
                panic!(
                    "close(fd={}) failed with error {}",
                    fd,
                    Error::last_os_error().raw_os_error().unwrap_or(0)
                );
            }
        }
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        let fd = self.as_raw();
        // The duplicated descriptor is owned by the new Handle and by it only
        unsafe {
            let res = libc::dup(fd);
            if res < 0 {
                panic!(
                    "dup() failed on file descriptor {}: error {}",
                    fd,
                    Error::last_os_error().raw_os_error().unwrap_or(0)
                );
            }
            Self::new(res).unwrap()
        }
    }
}

impl AsRawFd for Handle {
    fn as_raw_fd(&self) -> RawFd {
        self.as_raw()
    }
}

impl FromRawFd for Handle {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Handle::new(fd).unwrap()
    }
}

impl IntoRawFd for Handle {
    fn into_raw_fd(self) -> RawFd {
        self.into_raw()
    }
}

/// Takes ownership of any fd-backed resource as a plain Handle.
pub fn downcast_to_handle<T: IntoRawFd>(resource: T) -> Handle {
    unsafe { Handle::from_raw_fd(resource.into_raw_fd()) }
}

pub(crate) fn set_fd_inheritable(fd: c_int, allow_inherit: bool) -> Result<(), IpcError> {
    let current_flags = unsafe { fcntl(fd, F_GETFD) };
    if current_flags < 0 {
        return Err(IpcError::last_os_error("fcntl(F_GETFD)"));
    }
    let res = unsafe {
        fcntl(
            fd,
            F_SETFD,
            (current_flags & !FD_CLOEXEC) | if allow_inherit { 0 } else { FD_CLOEXEC },
        )
    };
    if res < 0 {
        return Err(IpcError::last_os_error("fcntl(F_SETFD, FD_CLOEXEC)"));
    }
    Ok(())
}
