//! Input records and their wire framing.
//!
//! The frame layout is stable across versions of the same cluster:
//! a one-byte content tag, the instance id as a big-endian `i32`, the
//! 16-byte submitter uuid, then the length-prefixed payload.

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Wire tag for a raw-bytes content frame. The only tag currently defined.
const CONTENT_TAG_BYTES: u8 = 0x01;

const UUID_LEN: usize = 16;

/// Opaque value produced by the state transformer for one applied input.
pub type Output = Bytes;

/// A client submission bound for a consensus slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Consensus instance number, strictly monotonic in allocation order
    pub id: i32,
    /// Submitter request token, independent of `id`
    pub uuid: Uuid,
    /// Opaque payload handed to the state transformer
    pub content: Bytes,
}

impl Input {
    /// Creates a new input record.
    pub fn new(id: i32, uuid: Uuid, content: impl Into<Bytes>) -> Self {
        Self {
            id,
            uuid,
            content: content.into(),
        }
    }

    /// Serializes this input into the frame fed to the coordinator.
    ///
    /// All multi-byte integers are big-endian.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if self.content.len() > u32::MAX as usize {
            return Err(Error::Codec(format!(
                "content of {} bytes exceeds frame limit",
                self.content.len()
            )));
        }

        let mut buf = BytesMut::with_capacity(1 + 4 + UUID_LEN + 4 + self.content.len());
        buf.put_u8(CONTENT_TAG_BYTES);
        buf.put_i32(self.id);
        buf.put_slice(self.uuid.as_bytes());
        buf.put_u32(self.content.len() as u32);
        buf.put_slice(&self.content);
        Ok(buf.freeze())
    }

    /// Decodes a frame produced by [`Input::to_bytes`].
    ///
    /// The whole buffer must be consumed; short frames, lengths running past
    /// the end, trailing bytes, and unknown content tags are codec errors.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = FrameReader::new(data);

        let tag = reader.read_u8()?;
        if tag != CONTENT_TAG_BYTES {
            return Err(Error::Codec(format!("unknown content tag 0x{tag:02x}")));
        }

        let id = reader.read_i32()?;
        let uuid = Uuid::from_bytes(reader.read_uuid_bytes()?);
        let len = reader.read_u32()? as usize;
        let content = Bytes::copy_from_slice(reader.read_slice(len)?);
        reader.expect_eof()?;

        Ok(Self { id, uuid, content })
    }
}

/// A position-tracked reader over one frame.
struct FrameReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Codec(format!(
                "frame truncated: wanted {len} bytes, {} remain",
                self.remaining()
            )));
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_slice(4)?);
        Ok(i32::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_slice(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn read_uuid_bytes(&mut self) -> Result<[u8; UUID_LEN]> {
        let mut buf = [0u8; UUID_LEN];
        buf.copy_from_slice(self.read_slice(UUID_LEN)?);
        Ok(buf)
    }

    fn expect_eof(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::Codec(format!(
                "{} trailing bytes after frame",
                self.remaining()
            )));
        }
        Ok(())
    }
}
