use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure in this crate is terminal: the decoder is forward-only and a
/// misaligned tag stream cannot be safely guessed at, so nothing is retried
/// and nothing is resynchronized. Variants carry the byte offset of the
/// failed operation where one exists so the CLI can print a one-line
/// diagnostic naming both.
#[derive(Error, Debug)]
pub enum VmssError {
    #[error("can't open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("couldn't read VMSS header")]
    TruncatedHeader(#[source] io::Error),

    #[error("couldn't read {count} group descriptors")]
    TruncatedGroupTable { count: u32, source: io::Error },

    #[error("implausible group count {count} (limit is {limit})")]
    ImplausibleGroupCount { count: u32, limit: u32 },

    #[error("couldn't read tag at offset {offset:#x}")]
    TruncatedTag { offset: u64, source: io::Error },

    #[error("couldn't read name at offset {offset:#x}")]
    TruncatedName { offset: u64, source: io::Error },

    #[error("couldn't read index at offset {offset:#x}")]
    TruncatedIndices { offset: u64, source: io::Error },

    #[error("couldn't read block header at offset {offset:#x}")]
    TruncatedBlockHeader { offset: u64, source: io::Error },

    #[error("couldn't read value at offset {offset:#x}")]
    TruncatedValue { offset: u64, source: io::Error },

    #[error("can't read 32-bit VMSS file")]
    UnsupportedLegacyFormat,

    #[error("magic {magic:#010x} not recognized as a VMSS file")]
    UnrecognizedFormat { magic: u32 },

    #[error("couldn't seek to offset {offset:#x}")]
    SeekFailure { offset: u64, source: io::Error },

    #[error("found pendingNMI size to be unexpected value of {size} (expected 1)")]
    UnexpectedFieldSize { size: u8 },

    #[error("couldn't write value at offset {offset:#x}")]
    WriteFailure { offset: u64, source: io::Error },
}
