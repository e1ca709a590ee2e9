//! # KIR Binary
//!
//! The `.kirb` container: a compact, checksummed encoding of a component tree and
//! its reactive manifest.
//!
//! ```text
//! header   "KIRB" | major | minor | flags | reserved | endianness marker
//! tree     components in preorder, each followed directly by its children
//! manifest variables, bindings, conditionals, loops   (flag bit 0)
//! trailer  CRC-32 of everything above
//! ```
//!
//! Writers validate before emitting anything. Readers never trust a length or count
//! they have not checked against the remaining input and the configured [`Limits`],
//! and can be asked to salvage what they can from damaged files.
//!
//! [`Limits`]: kir_model::Limits

mod decoder;
mod encoder;
pub mod error;
pub mod format;
mod manifest_codec;
pub mod migrate;
pub mod reader;
mod semantic;
mod style_codec;
pub mod validate;
pub mod writer;

pub use error::{FormatError, MigrateError, ReadError, ReadResult, WriteError, WriteResult};
pub use format::{ByteOrder, Header, MAGIC, VERSION_MAJOR, VERSION_MINOR};
pub use migrate::{upgrade, Upgrade};
pub use reader::{peek_header, read, Decoded, ReadOptions, Reader, RecoveryMode, ValidationLevel};
pub use validate::{validate, ValidationReport};
pub use writer::{write, Writer, WriterConfig};
