use crate::error::{FormatError, ReadResult};
use crate::format::ByteOrder;
use kir_model::{
    Color, ComponentId, Dimension, DimensionKind, Limits, Rgba, Tagged, ValidationWarning,
    WarningCode,
};
use tracing::warn;

/// Bounds-checked cursor over the checksummed body of a file.
///
/// Every read is checked against the innermost open block, so a field can never be
/// decoded from bytes that belong to its neighbour.
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    order: ByteOrder,
    limits: Limits,
    component: Option<ComponentId>,
    warnings: Vec<ValidationWarning>,
}

/// An open length-prefixed block.
#[must_use]
pub(crate) struct Block {
    name: &'static str,
    end: usize,
    outer_end: usize,
}

macro_rules! get_number {
    ($($name:ident: $ty:ty),+ $(,)?) => {
        $(
            pub fn $name(&mut self) -> ReadResult<$ty> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                let mut raw = [0u8; SIZE];
                raw.copy_from_slice(self.take(SIZE)?);
                Ok(match self.order {
                    ByteOrder::Little => <$ty>::from_le_bytes(raw),
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                })
            }
        )+
    };
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], start: usize, order: ByteOrder, limits: Limits) -> Self {
        Self {
            data,
            pos: start,
            end: data.len(),
            order,
            limits,
            component: None,
            warnings: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Attribute subsequent warnings to `id`.
    pub fn set_component(&mut self, id: Option<ComponentId>) {
        self.component = id;
    }

    pub fn take_warnings(&mut self) -> Vec<ValidationWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn warn(&mut self, code: WarningCode, message: impl Into<String>) {
        let mut warning = ValidationWarning::warning(code, message).at_offset(self.pos);
        if let Some(id) = self.component {
            warning = warning.with_component(id);
        }
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn invalid(&self, message: impl Into<String>) -> FormatError {
        FormatError::invalid_structure(self.pos, message)
    }

    fn take(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        if n > self.remaining() {
            if self.end < self.data.len() {
                return Err(self.invalid("field runs past the end of its block").into());
            }
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            }
            .into());
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn get_u8(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    get_number!(
        get_u16: u16,
        get_u32: u32,
        get_i32: i32,
        get_i64: i64,
        get_f32: f32,
        get_f64: f64,
    );

    /// Lenient boolean: any non-zero byte is true.
    pub fn get_bool(&mut self) -> ReadResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    /// Strict presence flag: only 0 and 1 are valid.
    pub fn get_flag(&mut self, what: &str) -> ReadResult<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.pos -= 1;
                Err(self
                    .invalid(format!("{} flag must be 0 or 1, found {}", what, other))
                    .into())
            }
        }
    }

    /// Decode an enumeration tag, substituting `fallback` for tags outside the enumeration.
    pub fn get_tag<T: Tagged>(&mut self, what: &str, fallback: T) -> ReadResult<T> {
        let tag = self.get_u8()?;
        Ok(match T::from_tag(tag) {
            Some(value) => value,
            None => {
                self.warn(
                    WarningCode::UnknownEnumTag,
                    format!("unknown {} tag {}, using default", what, tag),
                );
                fallback
            }
        })
    }

    /// Length-prefixed string. The length is checked against the string cap before
    /// anything is allocated.
    pub fn get_string(&mut self, what: &str) -> ReadResult<Option<String>> {
        let start = self.pos;
        let len = self.get_u32()? as usize;
        if len == 0 {
            return Ok(None);
        }
        self.limits.check_string(len - 1)?;
        let bytes = self.take(len)?;
        let (text, nul) = bytes.split_at(len - 1);
        if nul[0] != 0 {
            return Err(FormatError::invalid_structure(
                start,
                format!("{} is not NUL-terminated", what),
            )
            .into());
        }
        match std::str::from_utf8(text) {
            Ok(s) => Ok(Some(s.to_owned())),
            Err(err) => Err(FormatError::invalid_structure(
                start,
                format!("{} is not valid UTF-8: {}", what, err),
            )
            .into()),
        }
    }

    /// A string that must be present. An absent marker is a structural error.
    pub fn get_required_string(&mut self, what: &str) -> ReadResult<String> {
        let start = self.pos;
        self.get_string(what)?.ok_or_else(|| {
            FormatError::invalid_structure(start, format!("{} is missing", what)).into()
        })
    }

    pub fn get_dimension(&mut self) -> ReadResult<Dimension> {
        let tag = self.get_u8()?;
        let value = self.get_f32()?;
        Ok(match DimensionKind::from_tag(tag) {
            Some(kind) => Dimension { kind, value },
            None => {
                self.warn(
                    WarningCode::UnknownEnumTag,
                    format!("unknown dimension kind {}, using auto", tag),
                );
                Dimension::auto()
            }
        })
    }

    pub fn get_color(&mut self) -> ReadResult<Color> {
        let tag = self.get_u8()?;
        let mut payload = [0u8; 4];
        payload.copy_from_slice(self.take(4)?);
        Ok(match tag {
            Color::TAG_TRANSPARENT => Color::Transparent,
            Color::TAG_SOLID => Color::Solid(Rgba::new(payload[0], payload[1], payload[2], payload[3])),
            Color::TAG_GRADIENT => Color::Gradient(self.order.u32_from(payload)),
            Color::TAG_VARIABLE => Color::Variable(self.order.u32_from(payload)),
            other => {
                self.warn(
                    WarningCode::UnknownEnumTag,
                    format!("unknown color tag {}, using transparent", other),
                );
                Color::Transparent
            }
        })
    }

    /// Read a u32 entry count and make sure the remaining bytes could hold that many
    /// entries of at least `min_entry_size` bytes.
    pub fn get_count(&mut self, what: &str, min_entry_size: usize) -> ReadResult<usize> {
        let count = self.get_u32()? as usize;
        let needed = count.saturating_mul(min_entry_size);
        if needed > self.remaining() {
            warn!("{} count {} cannot fit in the remaining input", what, count);
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: needed - self.remaining(),
            }
            .into());
        }
        Ok(count)
    }

    /// Open a u32-length-prefixed block. Reads are confined to it until
    /// [`Decoder::end_block`].
    pub fn begin_block(&mut self, name: &'static str) -> ReadResult<Block> {
        let len = self.get_u32()? as usize;
        if len > self.remaining() {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            }
            .into());
        }
        let block = Block {
            name,
            end: self.pos + len,
            outer_end: self.end,
        };
        self.end = block.end;
        Ok(block)
    }

    /// Close `block`, skipping bytes a newer minor version appended to it.
    pub fn end_block(&mut self, block: Block) {
        if self.pos < block.end {
            let skipped = block.end - self.pos;
            self.warn(
                WarningCode::NewerMinorVersion,
                format!("skipped {} unknown bytes at the end of the {} block", skipped, block.name),
            );
            self.pos = block.end;
        }
        self.end = block.outer_end;
    }
}
