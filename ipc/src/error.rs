use core::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum IpcError {
    InternalOsOperationFailed {
        description: &'static str,
        os_code: i64,
    },
    MessageTruncated,
    AncillaryDataTruncated,
    UnexpectedAncillaryData {
        clevel: libc::c_int,
        ctype: libc::c_int,
    },
    TooManyFileDescriptors {
        count: usize,
    },
    PayloadSerialization {
        description: String,
    },
    PayloadDeserialization {
        description: String,
    },
}

impl Display for IpcError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            IpcError::InternalOsOperationFailed {
                description,
                os_code,
            } => write!(f, "{} failed with error {}", description, os_code),
            IpcError::MessageTruncated => write!(f, "message truncated"),
            IpcError::AncillaryDataTruncated => write!(f, "ancillary data truncated"),
            IpcError::UnexpectedAncillaryData { clevel, ctype } => write!(
                f,
                "unexpected ancillary data (level {} type {})",
                clevel, ctype
            ),
            IpcError::TooManyFileDescriptors { count } => {
                write!(f, "cannot attach {} file descriptors to one message", count)
            }
            IpcError::PayloadSerialization { description } => {
                write!(f, "cannot serialize payload: {}", description)
            }
            IpcError::PayloadDeserialization { description } => {
                write!(f, "cannot deserialize payload: {}", description)
            }
        }
    }
}

impl IpcError {
    pub(crate) fn last_os_error(description: &'static str) -> Self {
        IpcError::InternalOsOperationFailed {
            description,
            os_code: std::io::Error::last_os_error().raw_os_error().unwrap_or(0) as i64,
        }
    }
}
