use crate::error::MigrateError;
use crate::format::{Header, VERSION_MINOR};
use crate::reader::{ReadOptions, Reader};
use crate::writer::{Writer, WriterConfig};
use kir_model::ValidationWarning;
use tracing::{info, instrument};

/// A file rewritten at a new minor version or byte order.
#[derive(Debug)]
pub struct Upgrade {
    pub from: Header,
    pub to: Header,
    pub bytes: Vec<u8>,
    /// Diagnostics from reading the source file.
    pub warnings: Vec<ValidationWarning>,
}

impl Upgrade {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Read `bytes` with full validation and write them back under `config`.
///
/// Fields an older file lacks come back as their defaults, so the result is what a
/// current writer would produce for the same tree.
#[instrument(skip_all, fields(target_minor = config.minor_version))]
pub fn upgrade(bytes: &[u8], config: &WriterConfig) -> Result<Upgrade, MigrateError> {
    let options = ReadOptions::default().with_limits(config.limits);
    let decoded = Reader::new(options).read(bytes)?;
    let out = Writer::new(*config).write(&decoded.tree, decoded.manifest.as_ref())?;
    let to = Header::new(config.minor_version, config.byte_order, decoded.manifest.is_some());

    if decoded.header.minor < VERSION_MINOR || decoded.header.byte_order != config.byte_order {
        info!("upgraded {} to {}", decoded.header, to);
    }
    Ok(Upgrade {
        from: decoded.header,
        to,
        bytes: out,
        warnings: decoded.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ByteOrder;
    use crate::reader::read;
    use kir_model::{Component, ComponentId, ComponentType, Layout};

    fn tree() -> Component {
        Component::new(ComponentId(1), ComponentType::Row).with_layout(Layout {
            aspect_ratio: 1.5,
            ..Layout::default()
        })
    }

    #[test]
    fn test_upgrade_from_minor_zero() {
        let old = Writer::new(WriterConfig {
            minor_version: 0,
            ..WriterConfig::default()
        })
        .write(&tree(), None)
        .expect("write");

        let upgraded = upgrade(&old, &WriterConfig::default()).expect("upgrade");
        assert!(upgraded.changed());
        assert_eq!(upgraded.from.minor, 0);
        assert_eq!(upgraded.to.minor, VERSION_MINOR);

        // The aspect ratio did not exist at minor 0.
        let decoded = read(&upgraded.bytes).expect("read");
        assert_eq!(decoded.header.minor, VERSION_MINOR);
        assert_eq!(decoded.tree.layout.map(|l| l.aspect_ratio), Some(0.0));
    }

    #[test]
    fn test_byte_order_conversion() {
        let little = Writer::default().write(&tree(), None).expect("write");
        let config = WriterConfig {
            byte_order: ByteOrder::Big,
            ..WriterConfig::default()
        };
        let upgraded = upgrade(&little, &config).expect("upgrade");
        assert!(upgraded.changed());
        assert_eq!(read(&upgraded.bytes).expect("read").tree, tree());
    }

    #[test]
    fn test_current_file_is_unchanged() {
        let bytes = Writer::default().write(&tree(), None).expect("write");
        let upgraded = upgrade(&bytes, &WriterConfig::default()).expect("upgrade");
        assert!(!upgraded.changed());
        assert_eq!(upgraded.bytes, bytes);
    }
}
