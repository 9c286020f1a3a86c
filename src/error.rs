use crate::config::ConfigError;
use crate::port::PortError;
use std::fmt;

/// Top-level error for the `ringin` binary.
///
/// Everything that reaches this type ends the process; the answer loop
/// handles soft failures itself.
#[derive(Debug)]
pub enum RinginError {
    /// The serial line could not be opened or failed while running.
    Transport(PortError),
    Config(ConfigError),
    Io(std::io::Error),
}

/// A specialized `Result` type for the binary's setup path.
pub type RinginResult<T> = Result<T, RinginError>;

impl fmt::Display for RinginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "serial line error: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RinginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

// `From` conversions so `?` works across the setup path.
impl From<PortError> for RinginError {
    fn from(err: PortError) -> Self {
        RinginError::Transport(err)
    }
}

impl From<ConfigError> for RinginError {
    fn from(err: ConfigError) -> Self {
        RinginError::Config(err)
    }
}

impl From<std::io::Error> for RinginError {
    fn from(err: std::io::Error) -> Self {
        RinginError::Io(err)
    }
}
