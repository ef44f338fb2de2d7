use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::mem;
use std::path::Path;
use crate::dat::DatError;


/// skips up to this size are read and discarded instead of seeking
const SMALL_SKIP: usize = 128;


/// Forward-only little-endian reader over a finite seekable source.
///
/// The length of the source is taken once at construction, so every read and skip
/// is checked against it before touching the source. A short source is reported
/// as `DatError::TruncatedInput` with the offset where the read was attempted.
pub struct DatReader<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl DatReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, DatError> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<'a> DatReader<Cursor<&'a [u8]>> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        DatReader {
            inner: Cursor::new(bytes),
            position: 0,
            len: bytes.len() as u64,
        }
    }
}

impl<R: Read + Seek> DatReader<R> {
    pub fn new(mut inner: R) -> Result<Self, DatError> {
        let position = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;

        Ok(DatReader { inner, position, len })
    }

    /// current byte offset in the source
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// bytes left between the cursor and the end of the source
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    #[inline]
    fn ensure(&self, count: u64) -> Result<(), DatError> {
        if count > self.remaining() {
            return Err(DatError::TruncatedInput {
                position: self.position,
                expected: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// moves the cursor `offset` bytes forward, the skipped bytes are not interpreted
    pub fn seek_relative(&mut self, offset: u64) -> Result<(), DatError> {
        self.ensure(offset)?;
        if offset <= SMALL_SKIP as u64 {
            // seeking would drop the buffer of a BufReader
            let mut scratch = [0u8; SMALL_SKIP];
            self.inner.read_exact(&mut scratch[..offset as usize])?;
        } else {
            // i64::MAX is far beyond any length that passed `ensure`
            self.inner.seek(SeekFrom::Current(offset as i64))?;
        }
        self.position += offset;
        Ok(())
    }

    /// fills `buff` completely or fails without consuming anything
    pub fn read_into(&mut self, buff: &mut [u8]) -> Result<(), DatError> {
        self.ensure(buff.len() as u64)?;
        self.inner.read_exact(buff)?;
        self.position += buff.len() as u64;
        Ok(())
    }

    pub fn read_raw(&mut self, count: usize) -> Result<Vec<u8>, DatError> {
        self.ensure(count as u64)?;
        let mut buff = vec![0; count];
        self.read_into(&mut buff)?;
        Ok(buff)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DatError> {
        type V = u8;
        let mut buff = [0; mem::size_of::<V>()];
        self.read_into(&mut buff)?;
        Ok(V::from_le_bytes(buff))
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, DatError> {
        type V = u16;
        let mut buff = [0; mem::size_of::<V>()];
        self.read_into(&mut buff)?;
        Ok(V::from_le_bytes(buff))
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, DatError> {
        type V = u32;
        let mut buff = [0; mem::size_of::<V>()];
        self.read_into(&mut buff)?;
        Ok(V::from_le_bytes(buff))
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, DatError> {
        type V = u64;
        let mut buff = [0; mem::size_of::<V>()];
        self.read_into(&mut buff)?;
        Ok(V::from_le_bytes(buff))
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, DatError> {
        type V = f32;
        let mut buff = [0; mem::size_of::<V>()];
        self.read_into(&mut buff)?;
        Ok(V::from_le_bytes(buff))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_scalars() {
        let mut bytes = vec![0xAB];
        bytes.extend_from_slice(&0x1234u16.to_le_bytes());
        bytes.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        bytes.extend_from_slice(&0x0102030405060708u64.to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());

        let mut r = DatReader::from_bytes(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_u64().unwrap(), 0x0102030405060708);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.position(), 19);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn skip_moves_cursor_forward() {
        let bytes = [0, 0, 0, 7, 0];
        let mut r = DatReader::from_bytes(&bytes);
        r.seek_relative(3).unwrap();
        assert_eq!(r.position(), 3);
        assert_eq!(r.read_u8().unwrap(), 7);
    }

    #[test]
    fn short_read_reports_position_and_counts() {
        let bytes = [1, 2, 3, 4, 5];
        let mut r = DatReader::from_bytes(&bytes);
        r.seek_relative(2).unwrap();

        match r.read_u32() {
            Err(DatError::TruncatedInput { position, expected, available }) => {
                assert_eq!((position, expected, available), (2, 4, 3));
            }
            other => panic!("unexpected result {other:?}"),
        }
        // the failed read consumes nothing
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn skip_past_end_is_truncation() {
        let bytes = [0u8; 4];
        let mut r = DatReader::from_bytes(&bytes);
        assert!(matches!(r.seek_relative(5), Err(DatError::TruncatedInput { expected: 5, available: 4, .. })));
        assert!(r.seek_relative(4).is_ok());
        assert!(matches!(r.read_raw(1), Err(DatError::TruncatedInput { .. })));
    }

    struct CountingSeeks {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl Read for CountingSeeks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for CountingSeeks {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn small_skips_do_not_seek() {
        let mut bytes = vec![0u8; 300];
        bytes[2] = 5;
        bytes[299] = 9;
        let mut r = DatReader::new(CountingSeeks { inner: Cursor::new(bytes), seeks: 0 }).unwrap();
        let seeks_after_open = r.inner.seeks;

        r.seek_relative(2).unwrap();
        assert_eq!(r.read_u8().unwrap(), 5);
        r.seek_relative(SMALL_SKIP as u64).unwrap();
        assert_eq!(r.inner.seeks, seeks_after_open);

        // large skips still seek and stay in step with the source
        r.seek_relative(299 - 3 - SMALL_SKIP as u64).unwrap();
        assert_eq!(r.inner.seeks, seeks_after_open + 1);
        assert_eq!(r.read_u8().unwrap(), 9);
        assert_eq!(r.position(), 300);
    }

    #[test]
    fn generic_source_starts_at_its_current_offset() {
        let mut cursor = Cursor::new(vec![9u8, 8, 7, 6]);
        cursor.seek(SeekFrom::Start(1)).unwrap();
        let mut r = DatReader::new(cursor).unwrap();
        assert_eq!(r.position(), 1);
        assert_eq!(r.remaining(), 3);
        assert_eq!(r.read_raw(3).unwrap(), vec![8, 7, 6]);
    }
}
