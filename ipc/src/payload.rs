use crate::error::IpcError;
use crate::HELPER_ENABLE_VAR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the helper needs to replay one CLI invocation: the caller's
/// pid (for the completion signal), its environment, its argv, and the id
/// of the exit-code semaphore. The working directory and standard streams
/// travel out-of-band as attached descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationPayload {
    pub pid: i32,
    pub environ: BTreeMap<String, String>,
    pub argv: Vec<String>,
    pub semid: i32,
}

impl InvocationPayload {
    /// Snapshots the calling process. The helper-enable variable is
    /// dropped from the captured environment so a helper replaying this
    /// invocation cannot recurse into helper mode itself.
    pub fn capture(semid: i32) -> Self {
        // Lossy conversion: the payload is textual JSON, and the helper
        // only replays variables that survive it
        let environ = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .filter(|(key, _)| key != HELPER_ENABLE_VAR)
            .collect();
        Self {
            pid: unsafe { libc::getpid() },
            environ,
            argv: std::env::args_os()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            semid,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, IpcError> {
        serde_json::to_vec(self).map_err(|e| IpcError::PayloadSerialization {
            description: e.to_string(),
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, IpcError> {
        serde_json::from_slice(bytes).map_err(|e| IpcError::PayloadDeserialization {
            description: e.to_string(),
        })
    }
}
