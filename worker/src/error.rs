use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;
use safetensors::SafeTensorError;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Ml(MlErr),
    Json(serde_json::Error),
    SafeTensors(SafeTensorError),
    /// A parameter server replied with a message the protocol doesn't allow here.
    UnexpectedMessage {
        server: usize,
        got: &'static str,
    },
    /// A parameter server reported a failure.
    Server {
        server: usize,
        detail: String,
    },
    /// A parameter server has not been initialized by the chief yet.
    NotReady {
        server: usize,
    },
    /// A parameter server returned a different amount of variables than it holds.
    ParamsLengthMismatch {
        server: usize,
        got: usize,
        expected: usize,
    },
    /// A checkpoint file is missing a tensor or holds one of the wrong type.
    MalformedCheckpoint {
        path: PathBuf,
        detail: String,
    },
    /// The export directory for this model version already exists.
    ExportExists(PathBuf),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Ml(e) => write!(f, "{e}"),
            WorkerErr::Json(e) => write!(f, "json error: {e}"),
            WorkerErr::SafeTensors(e) => write!(f, "safetensors error: {e:?}"),
            WorkerErr::UnexpectedMessage { server, got } => {
                write!(f, "unexpected message from ps {server}: got {got}")
            }
            WorkerErr::Server { server, detail } => write!(f, "ps {server} failed: {detail}"),
            WorkerErr::NotReady { server } => write!(f, "ps {server} is not initialized yet"),
            WorkerErr::ParamsLengthMismatch {
                server,
                got,
                expected,
            } => write!(
                f,
                "params length mismatch from ps {server}: got {got}, expected {expected}"
            ),
            WorkerErr::MalformedCheckpoint { path, detail } => {
                write!(f, "malformed checkpoint {}: {detail}", path.display())
            }
            WorkerErr::ExportExists(path) => {
                write!(f, "export directory {} already exists", path.display())
            }
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Ml(e) => Some(e),
            WorkerErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<serde_json::Error> for WorkerErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SafeTensorError> for WorkerErr {
    fn from(value: SafeTensorError) -> Self {
        Self::SafeTensors(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
