use crate::decoder::Decoder;
use crate::error::{FormatError, ReadError, ReadResult};
use crate::format::{
    checksum, split_trailer, ByteOrder, Header, HEADER_SIZE, MAGIC, MARKER_OFFSET,
    MIN_COMPONENT_SIZE, MIN_FILE_SIZE, VERSION_MAJOR, VERSION_MINOR,
};
use crate::manifest_codec;
use crate::semantic::repair_tree;
use crate::style_codec::{decode_layout, decode_style};
use kir_model::{
    validate_tree, Component, ComponentId, ComponentType, EventHandler, EventType,
    HandlerRegistry, Limits, ReactiveManifest, StructuralError, Tagged, TreeStats,
    ValidationWarning, VariableId, WarningCode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use tracing::{debug, error, instrument, warn};

/// How much checking a read performs. Each level includes the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Header, checksum and decodability.
    Format,
    /// Id uniqueness, trailing bytes and manifest references.
    Structural,
    /// Value ranges, repaired with documented defaults.
    #[default]
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryMode {
    /// The first error fails the read.
    #[default]
    Strict,
    /// Return whatever decoded cleanly, with error diagnostics for the rest.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub level: ValidationLevel,
    pub verify_checksum: bool,
    pub recovery: RecoveryMode,
    pub limits: Limits,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            level: ValidationLevel::Semantic,
            verify_checksum: true,
            recovery: RecoveryMode::Strict,
            limits: Limits::default(),
        }
    }
}

impl ReadOptions {
    /// Tight caps for untrusted input.
    pub fn strict() -> Self {
        Self {
            limits: Limits {
                max_depth: 256,
                max_components: 10_000,
                ..Limits::default()
            },
            ..Self::default()
        }
    }

    /// Salvage as much as possible from damaged files.
    pub fn permissive() -> Self {
        Self {
            level: ValidationLevel::Format,
            verify_checksum: false,
            recovery: RecoveryMode::BestEffort,
            limits: Limits {
                max_depth: 4096,
                max_components: 1_000_000,
                ..Limits::default()
            },
        }
    }

    pub fn with_level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn best_effort(&self) -> bool {
        self.recovery == RecoveryMode::BestEffort
    }
}

/// Result of a successful read
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub header: Header,
    pub tree: Component,
    pub manifest: Option<ReactiveManifest>,
    pub warnings: Vec<ValidationWarning>,
    pub stats: TreeStats,
    /// False when best-effort recovery stopped before the end of the tree.
    pub complete: bool,
}

impl Decoded {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationWarning> {
        self.warnings.iter().filter(|w| w.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

pub struct Reader<'r> {
    options: ReadOptions,
    registry: Option<&'r HandlerRegistry>,
}

impl Default for Reader<'_> {
    fn default() -> Self {
        Self::new(ReadOptions::default())
    }
}

impl<'r> Reader<'r> {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            registry: None,
        }
    }

    /// At the semantic level, report extension components `registry` cannot handle.
    pub fn with_registry(mut self, registry: &'r HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read from a stream, never buffering more than the file-size cap allows.
    pub fn read_from<R: Read>(&self, source: R) -> ReadResult<Decoded> {
        let cap = self.options.limits.max_file_size as u64;
        let mut bytes = Vec::new();
        source.take(cap.saturating_add(1)).read_to_end(&mut bytes)?;
        self.read(&bytes)
    }

    #[instrument(skip_all, fields(len = bytes.len(), level = ?self.options.level))]
    pub fn read(&self, bytes: &[u8]) -> ReadResult<Decoded> {
        let options = &self.options;
        options.limits.check_file_size(bytes.len())?;
        if bytes.len() < MIN_FILE_SIZE {
            return Err(FormatError::Truncated {
                offset: bytes.len(),
                needed: MIN_FILE_SIZE - bytes.len(),
            }
            .into());
        }

        let mut warnings = Vec::new();
        let header = self.read_header(bytes, &mut warnings)?;
        let (body, _) = split_trailer(bytes, header.byte_order);

        // Fields a newer minor appended are skipped block by block.
        let layout_minor = header.minor.min(VERSION_MINOR);
        let mut dec = Decoder::new(body, HEADER_SIZE, header.byte_order, options.limits);
        let (mut tree, complete) = decode_tree(&mut dec, layout_minor, options, &mut warnings)?;

        let mut manifest = None;
        if header.has_manifest() {
            if complete {
                match manifest_codec::decode(&mut dec) {
                    Ok(decoded) => manifest = Some(decoded),
                    Err(ReadError::Format(err)) if options.best_effort() => {
                        warnings.push(
                            ValidationWarning::error(
                                WarningCode::PartialTree,
                                format!("manifest discarded: {}", err),
                            )
                            .at_offset(dec.position()),
                        );
                    }
                    Err(err) => return Err(err),
                }
            } else {
                warnings.push(ValidationWarning::error(
                    WarningCode::PartialTree,
                    "manifest skipped because the tree is incomplete",
                ));
            }
        }
        warnings.extend(dec.take_warnings());

        if complete && dec.remaining() > 0 {
            let message = format!("{} unexpected bytes before the checksum", dec.remaining());
            if options.level == ValidationLevel::Format {
                warnings.push(
                    ValidationWarning::warning(WarningCode::TrailingBytes, message)
                        .at_offset(dec.position()),
                );
            } else {
                self.fail_or_record(
                    FormatError::invalid_structure(dec.position(), message),
                    WarningCode::TrailingBytes,
                    &mut warnings,
                )?;
            }
        }

        let mut stats = TreeStats::measure(&tree);
        if options.level >= ValidationLevel::Structural {
            match validate_tree(&tree, &options.limits) {
                Ok(measured) => stats = measured,
                Err(StructuralError::ResourceLimit(limit)) => return Err(limit.into()),
                Err(err) => self.fail_or_record(
                    FormatError::InvalidStructure {
                        offset: None,
                        message: err.to_string(),
                    },
                    WarningCode::PartialTree,
                    &mut warnings,
                )?,
            }
            if let Some(manifest) = &manifest {
                check_references(&tree, manifest, &mut warnings);
            }
        }

        if options.level >= ValidationLevel::Semantic {
            repair_tree(&mut tree, &mut warnings);
            if let Some(registry) = self.registry {
                warnings.extend(registry.unhandled_extensions(&tree));
            }
        }

        debug!(
            "read {} components ({} warnings, complete: {})",
            stats.node_count,
            warnings.len(),
            complete
        );
        Ok(Decoded {
            header,
            tree,
            manifest,
            warnings,
            stats,
            complete,
        })
    }

    /// Checksum, magic, byte order and version, in that order. Verifying the
    /// checksum first makes any damaged byte read as corruption.
    fn read_header(&self, bytes: &[u8], warnings: &mut Vec<ValidationWarning>) -> ReadResult<Header> {
        if self.options.verify_checksum {
            self.verify_checksum(bytes, warnings)?;
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic { found: magic }.into());
        }

        let byte_order = detect_byte_order(bytes)?;

        let header = Header {
            major: bytes[4],
            minor: bytes[5],
            flags: bytes[6],
            reserved: bytes[7],
            byte_order,
        };
        if header.major != VERSION_MAJOR {
            return Err(FormatError::VersionMismatch {
                major: header.major,
                minor: header.minor,
                supported: VERSION_MAJOR,
            }
            .into());
        }
        if header.minor > VERSION_MINOR {
            let warning = ValidationWarning::warning(
                WarningCode::NewerMinorVersion,
                format!(
                    "file is version {}.{}, newer than {}.{}; unknown fields are skipped",
                    header.major, header.minor, VERSION_MAJOR, VERSION_MINOR
                ),
            )
            .at_offset(5);
            warn!("{}", warning);
            warnings.push(warning);
        }
        if header.unknown_flags() != 0 || header.reserved != 0 {
            warnings.push(
                ValidationWarning::warning(
                    WarningCode::ReservedBits,
                    format!(
                        "reserved header bits set (flags {:#04x}, reserved {:#04x})",
                        header.flags, header.reserved
                    ),
                )
                .at_offset(6),
            );
        }
        Ok(header)
    }

    /// The trailer is read in the marker's byte order. An unreadable marker accepts
    /// either order, so the marker itself is covered too.
    fn verify_checksum(&self, bytes: &[u8], warnings: &mut Vec<ValidationWarning>) -> ReadResult<()> {
        let (body, stored_le) = split_trailer(bytes, ByteOrder::Little);
        let (_, stored_be) = split_trailer(bytes, ByteOrder::Big);
        let computed = checksum(body);
        let stored = match marker_order(bytes) {
            Some(ByteOrder::Little) => stored_le,
            Some(ByteOrder::Big) => stored_be,
            None if stored_be == computed => stored_be,
            None => stored_le,
        };
        if stored != computed {
            let err = FormatError::CorruptChecksum { stored, computed };
            self.fail_or_record(err, WarningCode::ChecksumMismatch, warnings)?;
        }
        Ok(())
    }

    /// Fail in strict mode; record an error diagnostic in best-effort mode.
    fn fail_or_record(
        &self,
        err: FormatError,
        code: WarningCode,
        warnings: &mut Vec<ValidationWarning>,
    ) -> ReadResult<()> {
        if !self.options.best_effort() {
            error!("{}", err);
            return Err(err.into());
        }
        let mut diagnostic = ValidationWarning::error(code, err.to_string());
        diagnostic.offset = err.offset();
        warnings.push(diagnostic);
        Ok(())
    }
}

/// Read with the default options.
pub fn read(bytes: &[u8]) -> ReadResult<Decoded> {
    Reader::default().read(bytes)
}

/// Header of `bytes` if it starts with a recognizable one. Nothing else is checked.
pub fn peek_header(bytes: &[u8]) -> Option<Header> {
    if bytes.len() < HEADER_SIZE || bytes[..4] != MAGIC {
        return None;
    }
    Some(Header {
        major: bytes[4],
        minor: bytes[5],
        flags: bytes[6],
        reserved: bytes[7],
        byte_order: marker_order(bytes)?,
    })
}

fn marker_order(bytes: &[u8]) -> Option<ByteOrder> {
    let mut marker = [0u8; 4];
    marker.copy_from_slice(&bytes[MARKER_OFFSET..HEADER_SIZE]);
    ByteOrder::from_marker(marker)
}

fn detect_byte_order(bytes: &[u8]) -> ReadResult<ByteOrder> {
    marker_order(bytes).ok_or_else(|| {
        FormatError::invalid_structure(
            MARKER_OFFSET,
            format!(
                "unrecognized endianness marker {:02x?}",
                &bytes[MARKER_OFFSET..HEADER_SIZE]
            ),
        )
        .into()
    })
}

struct Frame {
    node: Component,
    remaining: usize,
}

/// Decode the preorder tree with an explicit stack. Depth and count caps are checked
/// before each node is decoded.
fn decode_tree(
    dec: &mut Decoder<'_>,
    minor: u8,
    options: &ReadOptions,
    warnings: &mut Vec<ValidationWarning>,
) -> ReadResult<(Component, bool)> {
    let limits = options.limits;
    limits.check_depth(1)?;
    limits.check_components(1)?;
    let (root, children) = decode_component(dec, minor)?;

    let mut count = 1;
    let mut complete = true;
    let mut stack = vec![Frame {
        node: root,
        remaining: children,
    }];
    let mut finished = None;

    while let Some(top) = stack.last_mut() {
        if top.remaining == 0 {
            if let Some(done) = stack.pop() {
                match stack.last_mut() {
                    Some(parent) => parent.node.push_child(done.node),
                    None => finished = Some(done.node),
                }
            }
            continue;
        }
        top.remaining -= 1;

        limits.check_depth(stack.len() + 1)?;
        count += 1;
        limits.check_components(count)?;

        let offset = dec.position();
        match decode_component(dec, minor) {
            Ok((node, children)) => stack.push(Frame {
                node,
                remaining: children,
            }),
            Err(ReadError::Format(err)) if options.best_effort() => {
                warn!("stopping at byte {}: {}", offset, err);
                warnings.push(
                    ValidationWarning::error(
                        WarningCode::PartialTree,
                        format!("tree truncated at the first undecodable component: {}", err),
                    )
                    .at_offset(offset),
                );
                complete = false;
                for frame in &mut stack {
                    frame.remaining = 0;
                }
            }
            Err(err) => return Err(err),
        }
    }

    finished
        .map(|tree| (tree, complete))
        .ok_or_else(|| dec.invalid("tree has no root").into())
}

/// One component without its children. Returns the declared child count.
fn decode_component(dec: &mut Decoder<'_>, minor: u8) -> ReadResult<(Component, usize)> {
    dec.set_component(None);
    let id = ComponentId(dec.get_u32()?);
    dec.set_component(Some(id));

    let tag = dec.get_u8()?;
    let kind = ComponentType::from_tag(tag).unwrap_or_else(|| {
        dec.warn(
            WarningCode::UnknownComponentType,
            format!("reserved component type tag {}, using Container", tag),
        );
        ComponentType::Container
    });

    let has_style = dec.get_flag("style")?;
    let has_layout = dec.get_flag("layout")?;
    let has_events = dec.get_flag("events")?;
    let child_count = dec.get_u32()? as usize;
    if child_count.saturating_mul(MIN_COMPONENT_SIZE) > dec.remaining() {
        return Err(FormatError::Truncated {
            offset: dec.position(),
            needed: child_count.saturating_mul(MIN_COMPONENT_SIZE) - dec.remaining(),
        }
        .into());
    }

    let mut node = Component::new(id, kind);
    node.text = dec.get_string("text")?;
    node.custom_data = dec.get_string("custom data")?;
    if has_style {
        node.set_style(decode_style(dec, minor)?);
    }
    if has_layout {
        node.set_layout(decode_layout(dec, minor)?);
    }
    if has_events {
        let count = dec.get_count("events", 1 + 4 + 4)?;
        for _ in 0..count {
            let tag = dec.get_u8()?;
            let handler = dec.get_required_string("event handler")?;
            let data = dec.get_string("event data")?;
            match EventType::from_tag(tag) {
                Some(kind) => node.add_event(EventHandler { kind, handler, data }),
                None => dec.warn(
                    WarningCode::DroppedEntry,
                    format!("dropped handler '{}' with unknown event type {}", handler, tag),
                ),
            }
        }
    }
    Ok((node, child_count))
}

/// Manifest entries must point at components in the tree and declared variables.
fn check_references(tree: &Component, manifest: &ReactiveManifest, warnings: &mut Vec<ValidationWarning>) {
    let components: HashSet<ComponentId> = tree.iter().map(|node| node.id).collect();
    let variables: HashSet<VariableId> = manifest.variables.iter().map(|v| v.id).collect();

    let mut dangling = |what: &str, component: Option<ComponentId>, variable: Option<VariableId>| {
        let missing = match (component, variable) {
            (Some(id), _) if !components.contains(&id) => format!("component {}", id),
            (_, Some(id)) if !variables.contains(&id) => format!("variable {}", id),
            _ => return,
        };
        let mut warning = ValidationWarning::warning(
            WarningCode::DanglingReference,
            format!("{} references missing {}", what, missing),
        );
        warning.component_id = component;
        warnings.push(warning);
    };

    for binding in &manifest.bindings {
        dangling("binding", Some(binding.component_id), Some(binding.variable_id));
    }
    for cond in &manifest.conditionals {
        dangling("conditional", Some(cond.component_id), None);
        for dep in &cond.dependencies {
            dangling("conditional dependency", None, Some(*dep));
        }
    }
    for for_loop in &manifest.loops {
        dangling("loop", Some(for_loop.parent_id), for_loop.collection_var);
        for child in &for_loop.children {
            dangling("loop child", Some(*child), None);
        }
    }
}
