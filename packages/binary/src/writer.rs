use crate::encoder::Encoder;
use crate::error::{WriteError, WriteResult};
use crate::format::{checksum, ByteOrder, Header, VERSION_MINOR};
use crate::manifest_codec;
use crate::style_codec::{encode_layout, encode_style};
use kir_model::{validate_tree, Component, Limits, ReactiveManifest};
use serde::Deserialize;
use std::io;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriterConfig {
    pub byte_order: ByteOrder,
    /// Older minors omit the fields introduced after them.
    pub minor_version: u8,
    pub limits: Limits,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            minor_version: VERSION_MINOR,
            limits: Limits::default(),
        }
    }
}

/// Serializes a tree and its manifest into one checksummed artifact.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Validate `root` and encode it, followed by `manifest` when given.
    ///
    /// Nothing is emitted for an invalid tree: caps and limits are checked before the
    /// first byte is written.
    #[instrument(skip_all, fields(minor = self.config.minor_version, order = %self.config.byte_order))]
    pub fn write(&self, root: &Component, manifest: Option<&ReactiveManifest>) -> WriteResult<Vec<u8>> {
        let config = &self.config;
        if config.minor_version > VERSION_MINOR {
            return Err(WriteError::UnsupportedMinor {
                requested: config.minor_version,
                current: VERSION_MINOR,
            });
        }

        let stats = validate_tree(root, &config.limits)?;
        debug!("writing {} components, depth {}", stats.node_count, stats.max_depth);

        let mut enc = Encoder::new(config.byte_order, config.limits);
        let header = Header::new(config.minor_version, config.byte_order, manifest.is_some());
        enc.put_raw(&header.to_bytes());

        self.encode_tree(&mut enc, root)?;
        if let Some(manifest) = manifest {
            manifest_codec::encode(&mut enc, manifest)?;
        }

        let crc = checksum(enc.bytes());
        enc.put_u32(crc);
        config.limits.check_file_size(enc.len())?;

        debug!("wrote {} bytes, checksum {:#010x}", enc.len(), crc);
        Ok(enc.finish())
    }

    /// [`Writer::write`] into any sink. Returns the number of bytes written.
    pub fn write_to<W: io::Write>(
        &self,
        out: &mut W,
        root: &Component,
        manifest: Option<&ReactiveManifest>,
    ) -> WriteResult<usize> {
        let bytes = self.write(root, manifest)?;
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Preorder without recursion: each node is followed directly by its children.
    fn encode_tree(&self, enc: &mut Encoder, root: &Component) -> WriteResult<()> {
        let minor = self.config.minor_version;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            enc.ensure_room(0)?;
            enc.put_u32(node.id.get());
            enc.put_u8(node.kind.tag());
            enc.put_bool(node.style.is_some());
            enc.put_bool(node.layout.is_some());
            enc.put_bool(!node.events.is_empty());
            enc.put_u32(node.children().len() as u32);
            enc.put_string(node.text.as_deref())?;
            enc.put_string(node.custom_data.as_deref())?;

            if let Some(style) = &node.style {
                encode_style(enc, style, minor)?;
            }
            if let Some(layout) = &node.layout {
                encode_layout(enc, layout, minor);
            }
            if !node.events.is_empty() {
                enc.put_u32(node.events.len() as u32);
                for event in &node.events {
                    enc.put_tag(event.kind);
                    enc.put_str(&event.handler)?;
                    enc.put_string(event.data.as_deref())?;
                }
            }

            stack.extend(node.children().iter().rev());
        }
        Ok(())
    }
}

/// Write with the default configuration.
pub fn write(root: &Component, manifest: Option<&ReactiveManifest>) -> WriteResult<Vec<u8>> {
    Writer::default().write(root, manifest)
}
