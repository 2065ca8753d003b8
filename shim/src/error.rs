use core::fmt::{Display, Formatter};
use kart_ipc::IpcError;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ShimError {
    WorkerNotFound {
        searched: Vec<PathBuf>,
    },
    ExecFailed {
        path: PathBuf,
        os_code: i64,
    },
    HomeNotSet,
    SpawnFailed {
        description: &'static str,
        os_code: i64,
    },
    HelperUnreachable {
        socket_path: PathBuf,
    },
    CwdOpenFailed {
        os_code: i64,
    },
    SendFailed(IpcError),
    HelperTimeout,
    SemaphoreCreateFailed {
        os_code: i64,
    },
}

impl Display for ShimError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            ShimError::WorkerNotFound { searched } => {
                write!(f, "kart_cli not found, tried")?;
                for path in searched {
                    write!(f, " {}", path.display())?;
                }
                Ok(())
            }
            ShimError::ExecFailed { path, os_code } => {
                write!(f, "error running {}: error {}", path.display(), os_code)
            }
            ShimError::HomeNotSet => write!(f, "HOME is not set"),
            ShimError::SpawnFailed {
                description,
                os_code,
            } => write!(f, "error starting helper: {} failed with error {}", description, os_code),
            ShimError::HelperUnreachable { socket_path } => {
                write!(f, "timeout connecting to helper at {}", socket_path.display())
            }
            ShimError::CwdOpenFailed { os_code } => {
                write!(f, "cannot open working directory: error {}", os_code)
            }
            ShimError::SendFailed(err) => write!(f, "error sending command to helper: {}", err),
            ShimError::HelperTimeout => write!(f, "timed out, no response from helper"),
            ShimError::SemaphoreCreateFailed { os_code } => write!(
                f,
                "error setting up result communication with helper: error {}",
                os_code
            ),
        }
    }
}

impl From<IpcError> for ShimError {
    fn from(err: IpcError) -> Self {
        ShimError::SendFailed(err)
    }
}

impl ShimError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShimError::WorkerNotFound { .. }
            | ShimError::ExecFailed { .. }
            | ShimError::HomeNotSet => 1,
            ShimError::SpawnFailed { .. } | ShimError::HelperUnreachable { .. } => 2,
            ShimError::CwdOpenFailed { .. } | ShimError::SendFailed(_) => 3,
            ShimError::HelperTimeout => 4,
            ShimError::SemaphoreCreateFailed { .. } => 5,
        }
    }
}
