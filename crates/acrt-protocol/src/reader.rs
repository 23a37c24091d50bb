//! Offset-addressed little-endian readers and writers over fixed-size records.
//!
//! Every field of a Remote Telemetry record is addressed by its absolute byte
//! offset. The reader validates the total length once up front, so a record is
//! either decoded completely or not at all.

use crate::error::CodecError;

pub(crate) struct PacketReader<'a> {
    packet: &'static str,
    data: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub(crate) fn new(
        packet: &'static str,
        data: &'a [u8],
        expected: usize,
    ) -> Result<Self, CodecError> {
        if data.len() < expected {
            return Err(CodecError::short(packet, expected, data.len()));
        }
        Ok(Self { packet, data })
    }

    pub(crate) fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], CodecError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| CodecError::short(self.packet, usize::MAX, self.data.len()))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| CodecError::short(self.packet, end, self.data.len()))
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], CodecError> {
        let bytes = self.slice(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub(crate) fn bool_at(&self, offset: usize) -> Result<bool, CodecError> {
        Ok(self.array::<1>(offset)?[0] != 0)
    }

    pub(crate) fn u16_at(&self, offset: usize) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.array(offset)?))
    }

    pub(crate) fn u32_at(&self, offset: usize) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array(offset)?))
    }

    pub(crate) fn i32_at(&self, offset: usize) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.array(offset)?))
    }

    pub(crate) fn f32_at(&self, offset: usize) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.array(offset)?))
    }

    /// Read a fixed-capacity UTF-16 text field of `units` code units.
    pub(crate) fn text_at(&self, offset: usize, units: usize) -> Result<String, CodecError> {
        let len = units
            .checked_mul(2)
            .ok_or_else(|| CodecError::short(self.packet, usize::MAX, self.data.len()))?;
        Ok(crate::text::decode_utf16_fixed(self.slice(offset, len)?))
    }
}

/// Writes fields at fixed offsets into a pre-sized, zeroed record buffer.
///
/// Offsets come from the layout constants, which are all within the record
/// size; writes past the end of the buffer are dropped.
pub(crate) struct PacketWriter<'a> {
    buf: &'a mut [u8],
}

impl<'a> PacketWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        let Some(end) = offset.checked_add(bytes.len()) else {
            return;
        };
        if let Some(dst) = self.buf.get_mut(offset..end) {
            dst.copy_from_slice(bytes);
        }
    }

    pub(crate) fn put_bool(&mut self, offset: usize, value: bool) {
        self.put(offset, &[u8::from(value)]);
    }

    pub(crate) fn put_u16(&mut self, offset: usize, value: u16) {
        self.put(offset, &value.to_le_bytes());
    }

    pub(crate) fn put_u32(&mut self, offset: usize, value: u32) {
        self.put(offset, &value.to_le_bytes());
    }

    pub(crate) fn put_i32(&mut self, offset: usize, value: i32) {
        self.put(offset, &value.to_le_bytes());
    }

    pub(crate) fn put_f32(&mut self, offset: usize, value: f32) {
        self.put(offset, &value.to_le_bytes());
    }

    pub(crate) fn put_text(&mut self, offset: usize, units: usize, value: &str) {
        let Some(len) = units.checked_mul(2) else {
            return;
        };
        let Some(end) = offset.checked_add(len) else {
            return;
        };
        if let Some(dst) = self.buf.get_mut(offset..end) {
            crate::text::encode_utf16_fixed(value, dst);
        }
    }
}
