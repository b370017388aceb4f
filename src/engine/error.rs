//! Error types for registration and snapshot I/O.
//!
//! This module declares the focused error types used across the crate. The
//! split follows the handling policy of the public API:
//!
//! * **Programmer errors** (structural change during iteration, `get` on a
//!   dead entity, exceeding the component capacity) panic at the call site
//!   and have no error type.
//! * **Absent values** (`try_get`, `try_resource`, `alive` on a dead handle)
//!   are `Option`s and never raise.
//! * **Recoverable failures** (stable-name conflicts, malformed snapshot
//!   streams) are returned as the structured types below.
//!
//! Each error carries enough context to make failures actionable while
//! staying small and cheap to pass around. `Display` messages are short and
//! suitable for logs; `Debug` retains the full structure.

use std::fmt;
use std::io;

use crate::engine::types::ComponentID;

/// Returned when a stable-name registration collides with an earlier one.
///
/// A name maps to exactly one component ID and an ID to exactly one name.
/// Re-registering the same pair is idempotent and succeeds; any other overlap
/// fails with one of these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The name is already bound to a different component type.
    NameConflict {
        /// The name being registered.
        name: String,
        /// The component ID the name is already bound to.
        existing: ComponentID,
        /// The component ID the caller tried to bind.
        requested: ComponentID,
    },

    /// The component type is already registered under a different name.
    TypeAlreadyNamed {
        /// The name already bound to the component type.
        existing: String,
        /// The name the caller tried to bind.
        requested: String,
        /// The component ID in question.
        id: ComponentID,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NameConflict { name, existing, requested } => write!(
                f,
                "component name {:?} is already registered to id {} (requested id {})",
                name, existing, requested
            ),
            RegistryError::TypeAlreadyNamed { existing, requested, id } => write!(
                f,
                "component id {} is already registered as {:?} (requested name {:?})",
                id, existing, requested
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Failure while writing or reading a world snapshot stream.
///
/// Writer-side precondition violations (unregistered component types in a
/// non-empty archetype) are programmer errors and panic; everything that
/// depends on the input stream or the target process is reported here.
#[derive(Debug)]
pub enum SnapshotError {
    /// The stream does not start with the expected magic bytes.
    BadMagic {
        /// The four bytes actually found.
        found: [u8; 4],
    },

    /// The stream's format version is not supported by this build.
    UnsupportedVersion {
        /// The version number found in the stream.
        found: u32,
    },

    /// The target world already contains entities.
    WorldNotEmpty,

    /// The stream names a component that is not registered in this process.
    UnknownComponent {
        /// The stable name found in the stream.
        name: String,
    },

    /// The stream's recorded element size disagrees with the local type.
    SizeMismatch {
        /// The stable name of the component.
        name: String,
        /// Element size recorded in the stream.
        stored: u32,
        /// Element size of the locally registered type.
        local: u32,
    },

    /// The stream ended before a complete record could be read.
    UnexpectedEof,

    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::BadMagic { found } => {
                write!(f, "invalid snapshot magic: {:?}", found)
            }
            SnapshotError::UnsupportedVersion { found } => {
                write!(f, "unsupported snapshot version {}", found)
            }
            SnapshotError::WorldNotEmpty => {
                f.write_str("snapshot target world is not empty")
            }
            SnapshotError::UnknownComponent { name } => {
                write!(f, "snapshot references unregistered component {:?}", name)
            }
            SnapshotError::SizeMismatch { name, stored, local } => write!(
                f,
                "component {:?} size mismatch: stream has {} bytes, local type has {}",
                name, stored, local
            ),
            SnapshotError::UnexpectedEof => f.write_str("snapshot stream ended unexpectedly"),
            SnapshotError::Io(e) => write!(f, "snapshot i/o error: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SnapshotError::UnexpectedEof
        } else {
            SnapshotError::Io(e)
        }
    }
}
