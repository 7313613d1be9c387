//! Byte-order aware primitive reads over a seekable stream.

use std::io::{Read, Seek, SeekFrom};

use super::{ByteOrder, DtaError};

/// Wraps a reader and decodes numbers in the file's byte order.
pub struct DtaCursor<R> {
    inner: R,
    order: ByteOrder,
}

impl<R: Read + Seek> DtaCursor<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&mut self) -> Result<u64, DtaError> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<(), DtaError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Bytes left between the current position and the end of the stream.
    pub fn remaining(&mut self) -> Result<u64, DtaError> {
        let start = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(start))?;
        Ok(end.saturating_sub(start))
    }

    pub fn skip(&mut self, count: u64) -> Result<(), DtaError> {
        self.inner.seek(SeekFrom::Current(count as i64))?;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DtaError> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DtaError> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DtaError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DtaError> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(buf),
            ByteOrder::Big => u16::from_be_bytes(buf),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, DtaError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(buf),
            ByteOrder::Big => u32::from_be_bytes(buf),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, DtaError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, DtaError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(match self.order {
            ByteOrder::Little => u64::from_le_bytes(buf),
            ByteOrder::Big => u64::from_be_bytes(buf),
        })
    }

    /// Reads a literal section tag such as `<map>`, failing on a mismatch.
    pub fn expect_tag(&mut self, tag: &str) -> Result<(), DtaError> {
        let found = self.read_bytes(tag.len())?;
        if found != tag.as_bytes() {
            return Err(DtaError::malformed(format!(
                "expected {} but found {:?}",
                tag,
                String::from_utf8_lossy(&found)
            )));
        }
        Ok(())
    }

    /// Reports whether the next bytes are `tag` without consuming them.
    pub fn peek_tag(&mut self, tag: &str) -> Result<bool, DtaError> {
        let start = self.position()?;
        let mut buf = vec![0u8; tag.len()];
        let matched = match self.inner.read_exact(&mut buf) {
            Ok(()) => buf == tag.as_bytes(),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(e) => return Err(DtaError::Io(e)),
        };
        self.seek_to(start)?;
        Ok(matched)
    }
}

/// Decodes an unsigned integer of 1..=8 bytes in the given byte order.
pub fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::Little => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64),
        ByteOrder::Big => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_numbers_little_endian() {
        let data = vec![0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut cursor = DtaCursor::new(Cursor::new(data), ByteOrder::Little);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_read_numbers_big_endian() {
        let data = vec![0x12, 0x34, 0x12, 0x34, 0x56, 0x78];
        let mut cursor = DtaCursor::new(Cursor::new(data), ByteOrder::Big);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_expect_and_peek_tag() {
        let data = b"<map>rest".to_vec();
        let mut cursor = DtaCursor::new(Cursor::new(data), ByteOrder::Little);
        assert!(cursor.peek_tag("<map>").unwrap());
        assert!(!cursor.peek_tag("<data>").unwrap());
        cursor.expect_tag("<map>").unwrap();
        assert!(cursor.expect_tag("<data>").is_err());
    }

    #[test]
    fn test_peek_past_end_is_false() {
        let mut cursor = DtaCursor::new(Cursor::new(b"<a".to_vec()), ByteOrder::Little);
        assert!(!cursor.peek_tag("<abc>").unwrap());
        assert_eq!(cursor.position().unwrap(), 0);
    }

    #[test]
    fn test_remaining_keeps_position() {
        let mut cursor = DtaCursor::new(Cursor::new(vec![0u8; 10]), ByteOrder::Little);
        cursor.skip(3).unwrap();
        assert_eq!(cursor.remaining().unwrap(), 7);
        assert_eq!(cursor.position().unwrap(), 3);
    }

    #[test]
    fn test_read_uint_widths() {
        assert_eq!(read_uint(&[0x01, 0x02], ByteOrder::Little), 0x0201);
        assert_eq!(read_uint(&[0x01, 0x02], ByteOrder::Big), 0x0102);
        assert_eq!(
            read_uint(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00], ByteOrder::Little),
            1
        );
    }
}
