use core::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum FilterError {
    /// The filter argument did not parse as four comma-separated floats.
    InvalidBounds { arg: String },
    /// An envelope column whose width cannot correspond to a legal
    /// bits-per-value setting.
    UnsupportedEnvelopeWidth { bytes: usize },
    /// An envelope whose width disagrees with the decoder in use.
    WrongEnvelopeWidth { expected: usize, actual: usize },
    IndexQuery(rusqlite::Error),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            FilterError::InvalidBounds { arg } => write!(
                f,
                "invalid bounds \"{}\", expected '<lng_w>,<lat_s>,<lng_e>,<lat_n>'",
                arg
            ),
            FilterError::UnsupportedEnvelopeWidth { bytes } => {
                write!(f, "stored envelopes are {} bytes wide, not decodable", bytes)
            }
            FilterError::WrongEnvelopeWidth { expected, actual } => write!(
                f,
                "envelope is {} bytes, decoder expects {}",
                actual, expected
            ),
            FilterError::IndexQuery(e) => write!(f, "querying envelope index: {}", e),
        }
    }
}

impl From<rusqlite::Error> for FilterError {
    fn from(err: rusqlite::Error) -> Self {
        FilterError::IndexQuery(err)
    }
}

impl FilterError {
    /// Code the host process should exit with when `init` fails.
    pub fn exit_code(&self) -> i32 {
        match self {
            FilterError::InvalidBounds { .. } => 2,
            _ => 1,
        }
    }
}
