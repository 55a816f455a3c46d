use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachError {
    /// The stream ended inside a fixed-size field.
    #[error("truncated input, fewer bytes than a fixed-size read requires")]
    TruncatedInput,
    /// A command tag outside the recognized set; the whole decode aborts.
    #[error("unsupported load command 0x{0:08x}")]
    UnsupportedLoadCommand(u32),
    /// A declared file offset cannot be honored.
    #[error("fail to seek to offset 0x{0:x}, out of range or stream not seekable")]
    SeekFailure(u64),
    /// The magic number does not match a 64-bit Mach-O constant.
    #[error("malformed header, unrecognized magic 0x{0:08x}")]
    MalformedHeader(u32),
    /// A cmdsize smaller than the command header, or than the bytes
    /// its body actually occupies.
    #[error("invalid load command size {0}")]
    InvalidCommandSize(u32),
    #[error("fail to do I/O operations, {0}")]
    IoError(io::Error),
}

impl From<io::Error> for MachError {
    fn from(err: io::Error) -> Self {
        // byteorder surfaces short reads as UnexpectedEof
        if err.kind() == io::ErrorKind::UnexpectedEof {
            MachError::TruncatedInput
        } else {
            MachError::IoError(err)
        }
    }
}

pub type Result<T> = ::std::result::Result<T, MachError>;
