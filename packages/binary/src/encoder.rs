use crate::format::{ByteOrder, TRAILER_SIZE};
use kir_model::{Color, Dimension, Limits, ResourceLimitExceeded, Tagged};

/// Append-only byte sink for one serialization.
pub(crate) struct Encoder {
    buf: Vec<u8>,
    order: ByteOrder,
    limits: Limits,
}

macro_rules! put_number {
    ($($name:ident: $ty:ty),+ $(,)?) => {
        $(
            pub fn $name(&mut self, v: $ty) {
                match self.order {
                    ByteOrder::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
                    ByteOrder::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
                }
            }
        )+
    };
}

impl Encoder {
    pub fn new(order: ByteOrder, limits: Limits) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            order,
            limits,
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Fails once `extra` more bytes plus the trailer would pass the file-size cap,
    /// so an oversized tree is rejected while it is still being encoded.
    pub fn ensure_room(&self, extra: usize) -> Result<(), ResourceLimitExceeded> {
        self.limits
            .check_file_size(self.buf.len() + extra + TRAILER_SIZE)
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_u8(u8::from(v));
    }

    put_number!(
        put_u16: u16,
        put_u32: u32,
        put_i32: i32,
        put_i64: i64,
        put_f32: f32,
        put_f64: f64,
    );

    pub fn put_tag<T: Tagged>(&mut self, value: T) {
        self.put_u8(value.tag());
    }

    /// Length-prefixed string: 0 absent, 1 empty, otherwise byte length + 1,
    /// followed by the bytes and a NUL.
    pub fn put_string(&mut self, value: Option<&str>) -> Result<(), ResourceLimitExceeded> {
        let Some(s) = value else {
            self.put_u32(0);
            return Ok(());
        };
        self.limits.check_string(s.len())?;
        self.ensure_room(s.len() + 5)?;
        self.put_u32(s.len() as u32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    pub fn put_str(&mut self, value: &str) -> Result<(), ResourceLimitExceeded> {
        self.put_string(Some(value))
    }

    pub fn put_dimension(&mut self, d: Dimension) {
        self.put_tag(d.kind);
        self.put_f32(d.value);
    }

    /// Tag plus four payload bytes: RGBA for solid colors, a u32 id for references.
    pub fn put_color(&mut self, color: Color) {
        self.put_u8(color.tag());
        match color {
            Color::Transparent => self.put_raw(&[0; 4]),
            Color::Solid(c) => self.put_raw(&[c.r, c.g, c.b, c.a]),
            Color::Gradient(id) | Color::Variable(id) => self.put_u32(id),
        }
    }

    /// Reserve a u32 length slot; pair with [`Encoder::end_block`].
    pub fn begin_block(&mut self) -> usize {
        let at = self.buf.len();
        self.put_u32(0);
        at
    }

    /// Backfill the length slot at `at` with the number of bytes written since.
    pub fn end_block(&mut self, at: usize) {
        let len = (self.buf.len() - at - 4) as u32;
        let raw = match self.order {
            ByteOrder::Little => len.to_le_bytes(),
            ByteOrder::Big => len.to_be_bytes(),
        };
        self.buf[at..at + 4].copy_from_slice(&raw);
    }
}
