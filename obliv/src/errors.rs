/// Errors produced by the oblivious transfer protocols.
#[derive(Debug)]
pub enum Error {
    /// The input length is invalid.
    InvalidInputLength,
    /// An I/O error has occurred.
    IoError(std::io::Error),
    /// A received curve point failed to decompress.
    PointDecompression,
    /// The protocol was driven out of order (e.g. encode before send).
    ProtocolMisuse(&'static str),
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IoError(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidInputLength => "invalid input length".fmt(f),
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::PointDecompression => "unable to decompress curve point".fmt(f),
            Error::ProtocolMisuse(s) => write!(f, "protocol misuse: {}", s),
        }
    }
}
