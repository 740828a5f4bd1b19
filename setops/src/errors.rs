/// Errors produced by the set-operation engine.
///
/// Every error is fatal to the running scheme instance and propagates out
/// of `process` / `process_cardinality_only`; there are no internal
/// retries.
#[derive(Debug)]
pub enum Error {
    /// A malformed or out-of-range argument: missing configuration key,
    /// unsupported curve id, empty file path, zero-length point encoding.
    InvalidArgument(String),
    /// The two parties disagree on a protocol parameter.
    InconsistentParameter {
        /// Name of the parameter under check.
        label: String,
        /// Our value, stringified.
        ours: String,
        /// The peer's value, stringified.
        theirs: String,
    },
    /// Cuckoo insertion overflowed into the stash.
    StashNonEmpty,
    /// The peer hung up or sent fewer bytes than the protocol demands.
    ProtocolDesync(std::io::Error),
    /// An I/O error occurred on the transport or the filesystem.
    IoError(std::io::Error),
    /// Point deserialization or a curve operation failed.
    CryptoFault(String),
    /// The requested scheme has no registered constructor.
    NotRegistered(String),
    /// The underlying oblivious-transfer stack failed.
    OtError(obliv::Error),
    /// Reading or writing CSV data failed.
    CsvError(csv::Error),
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::ProtocolDesync(e)
        } else {
            Error::IoError(e)
        }
    }
}

impl From<obliv::Error> for Error {
    fn from(e: obliv::Error) -> Error {
        Error::OtError(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Error {
        Error::CsvError(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
            Error::InconsistentParameter { label, ours, theirs } => write!(
                f,
                "disagreement on parameter {}, {} vs {}",
                label, ours, theirs
            ),
            Error::StashNonEmpty => "stash of size is not zero".fmt(f),
            Error::ProtocolDesync(e) => write!(f, "protocol desync: {}", e),
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::CryptoFault(s) => write!(f, "crypto fault: {}", s),
            Error::NotRegistered(s) => write!(f, "scheme not registered: {}", s),
            Error::OtError(e) => write!(f, "oblivious transfer error: {}", e),
            Error::CsvError(e) => write!(f, "CSV error: {}", e),
        }
    }
}
