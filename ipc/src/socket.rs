use crate::error::IpcError;
use crate::handle::Handle;
use crate::IPC_FD_COUNT;
use core::mem::size_of;
use core::ptr::null_mut;
use libc::{c_int, c_void};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Path of the rendezvous socket for one login session:
/// `{home}/.kart.{sid}.socket`. Scoping the filename by session id lets
/// concurrent shims in the same session share one helper while separate
/// sessions get their own.
pub fn helper_socket_path(home: &Path, session_id: libc::pid_t) -> PathBuf {
    home.join(format!(".kart.{}.socket", session_id))
}

/// One connected stream to the helper. Each shim invocation sends exactly
/// one message: the textual payload plus four descriptors attached as a
/// single rights-transfer control message, so the helper receives both
/// atomically.
pub struct HelperStream {
    stream: UnixStream,
}

impl HelperStream {
    pub fn connect<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            stream: UnixStream::connect(path)?,
        })
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Socketpair variant, for loopback tests of the ancillary plumbing.
    pub fn pair() -> std::io::Result<(Self, Self)> {
        let (a, b) = UnixStream::pair()?;
        Ok((Self { stream: a }, Self { stream: b }))
    }

    /// Sends `payload` and `fds` in one `sendmsg`. The descriptors are
    /// duplicated into the receiver by the kernel; the caller keeps
    /// ownership of its own copies and may close them afterwards.
    pub fn send_with_fds(&mut self, payload: &[u8], fds: &[RawFd]) -> Result<(), IpcError> {
        if fds.len() > IPC_FD_COUNT {
            return Err(IpcError::TooManyFileDescriptors { count: fds.len() });
        }
        // CMSG_SPACE is a C arithmetic macro translated by libc, safe to call
        let cmsg_space =
            unsafe { libc::CMSG_SPACE((fds.len() * size_of::<c_int>()) as u32) } as usize;
        let mut cbuf = [0u8; 128];
        if cmsg_space > cbuf.len() {
            return Err(IpcError::TooManyFileDescriptors { count: fds.len() });
        }
        // The libc calls below are pointer arithmetic macros plus one
        // sendmsg(2); `msg` and the buffers it points into stay alive for
        // the whole block
        let res = unsafe {
            let msg_iovec = libc::iovec {
                iov_base: payload.as_ptr() as *mut c_void,
                iov_len: payload.len(),
            };
            let msg = libc::msghdr {
                msg_name: null_mut(), // socket is already connected
                msg_namelen: 0,
                msg_iov: &msg_iovec as *const libc::iovec as *mut libc::iovec,
                msg_iovlen: 1,
                msg_control: cbuf.as_mut_ptr() as *mut c_void,
                msg_controllen: if fds.is_empty() { 0 } else { cmsg_space },
                msg_flags: 0, // unused
            };
            if !fds.is_empty() {
                let cmsghdr = libc::CMSG_FIRSTHDR(&msg as *const _ as *mut libc::msghdr);
                (*cmsghdr).cmsg_level = libc::SOL_SOCKET;
                (*cmsghdr).cmsg_type = libc::SCM_RIGHTS;
                (*cmsghdr).cmsg_len =
                    libc::CMSG_LEN((fds.len() * size_of::<c_int>()) as u32) as usize;
                let data = libc::CMSG_DATA(cmsghdr) as *mut c_int;
                for (i, fd) in fds.iter().enumerate() {
                    *data.add(i) = *fd;
                }
            }
            libc::sendmsg(
                self.stream.as_raw_fd(),
                &msg as *const libc::msghdr,
                libc::MSG_NOSIGNAL,
            )
        };
        if res < 0 {
            return Err(IpcError::last_os_error("sendmsg()"));
        }
        Ok(())
    }

    /// Receives one message into `buffer`, collecting any descriptors from
    /// the rights-transfer control data. Received descriptors arrive
    /// close-on-exec and owned by the returned handles.
    pub fn recv_with_fds<'a>(
        &mut self,
        buffer: &'a mut [u8],
    ) -> Result<(&'a [u8], Vec<Handle>), IpcError> {
        let cmsg_space =
            unsafe { libc::CMSG_SPACE((IPC_FD_COUNT * size_of::<c_int>()) as u32) } as usize;
        let mut cbuf = [0u8; 128];
        let msg_iovec = libc::iovec {
            iov_base: buffer.as_mut_ptr() as *mut c_void,
            iov_len: buffer.len(),
        };
        let mut msg = libc::msghdr {
            msg_name: null_mut(),
            msg_namelen: 0,
            msg_iov: &msg_iovec as *const libc::iovec as *mut libc::iovec,
            msg_iovlen: 1,
            msg_control: cbuf.as_mut_ptr() as *mut c_void,
            msg_controllen: cmsg_space,
            msg_flags: 0,
        };
        // This block encapsulates recvmsg(2) and the descriptors it hands
        // us; they are owned by this block until wrapped in Handles
        let (received_bytes, handles) = unsafe {
            let res = libc::recvmsg(
                self.stream.as_raw_fd(),
                &mut msg as *mut libc::msghdr,
                libc::MSG_NOSIGNAL | libc::MSG_CMSG_CLOEXEC,
            );
            if res < 0 {
                // No descriptor can have been received, safe to return
                return Err(IpcError::last_os_error("recvmsg()"));
            }
            let mut handles = Vec::new();
            if msg.msg_controllen > 0 {
                let mut cmsghdr = libc::CMSG_FIRSTHDR(&msg as *const libc::msghdr);
                while !cmsghdr.is_null() {
                    let (clevel, ctype) = ((*cmsghdr).cmsg_level, (*cmsghdr).cmsg_type);
                    if (clevel, ctype) != (libc::SOL_SOCKET, libc::SCM_RIGHTS) {
                        return Err(IpcError::UnexpectedAncillaryData { clevel, ctype });
                    }
                    let data_len =
                        (*cmsghdr).cmsg_len as usize - libc::CMSG_LEN(0) as usize;
                    let data = libc::CMSG_DATA(cmsghdr) as *const c_int;
                    for i in 0..(data_len / size_of::<c_int>()) {
                        handles.push(Handle::new(*data.add(i))?);
                    }
                    cmsghdr = libc::CMSG_NXTHDR(&mut msg as *mut libc::msghdr, cmsghdr);
                }
            }
            (res, handles)
        };
        if (msg.msg_flags & libc::MSG_CTRUNC) != 0 {
            return Err(IpcError::AncillaryDataTruncated);
        }
        if (msg.msg_flags & libc::MSG_TRUNC) != 0 {
            return Err(IpcError::MessageTruncated);
        }
        Ok((&buffer[..received_bytes as usize], handles))
    }
}
