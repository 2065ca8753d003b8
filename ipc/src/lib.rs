// Common modules

mod error;
mod handle;
mod payload;
mod socket;

pub use error::IpcError;
pub use handle::{downcast_to_handle, Handle};
pub use payload::InvocationPayload;
pub use socket::{helper_socket_path, HelperStream};

// Name of the environment variable gating helper use. It must never be
// forwarded to a spawned helper, or the helper would try to reach a helper
// of its own.
pub const HELPER_ENABLE_VAR: &str = "KART_USE_HELPER";

// Maximum number of bytes one invocation payload can take on the socket.
pub const IPC_MESSAGE_MAX_SIZE: usize = 64 * 1024;

// Number of file descriptors attached to every invocation message:
// stdin, stdout, stderr, and an open handle to the caller's working
// directory, in that order.
pub const IPC_FD_COUNT: usize = 4;
