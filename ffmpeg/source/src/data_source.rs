/*!
    Pull-based byte sources for in-memory or custom input.
*/

use std::io::{self, SeekFrom};
use std::sync::Arc;

/**
    A byte source the demuxer pulls from.

    Methods are called synchronously from inside FFmpeg's read and seek
    callbacks, on whatever thread is driving the decoder.
*/
pub trait DataSource: Send {
    /**
        Fill `buf` with up to `buf.len()` bytes.

        Returns 0 at end of input. `ErrorKind::WouldBlock` asks the demuxer
        to retry later; any other error aborts the read.
    */
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /**
        Reposition the source and return the new absolute offset.

        Non-seekable sources keep the default, which reports
        `ErrorKind::Unsupported`.
    */
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let _ = pos;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "data source is not seekable",
        ))
    }

    /**
        Total size in bytes, if known.
    */
    fn len(&self) -> Option<u64> {
        None
    }

    fn is_seekable(&self) -> bool {
        false
    }
}

/**
    A seekable source over an immutable shared buffer.

    Cloning is cheap and each clone keeps its own read position, so one
    buffer can back a stream listing and a decode at the same time.
*/
#[derive(Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
    position: u64,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl DataSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = (self.position as usize).min(self.bytes.len());
        let count = buf.len().min(self.bytes.len() - start);
        buf[..count].copy_from_slice(&self.bytes[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.bytes.len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
            SeekFrom::End(delta) => len + delta as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }

    fn len(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("len", &self.bytes.len())
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_until_exhausted() {
        let mut source = MemorySource::new(vec![1u8, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(source.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn seeks_from_every_origin() {
        let mut source = MemorySource::new(vec![0u8; 10]);
        assert_eq!(source.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(source.seek(SeekFrom::Current(-1)).unwrap(), 3);
        assert_eq!(source.seek(SeekFrom::End(-2)).unwrap(), 8);
        assert!(source.seek(SeekFrom::Current(-20)).is_err());
        assert_eq!(source.position(), 8);
    }

    #[test]
    fn read_past_end_after_seek_returns_zero() {
        let mut source = MemorySource::new(vec![7u8; 3]);
        source.seek(SeekFrom::Start(100)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn clones_keep_independent_positions() {
        let mut a = MemorySource::new(vec![1u8, 2, 3]);
        let mut b = a.clone();
        let mut buf = [0u8; 1];
        a.read(&mut buf).unwrap();
        a.read(&mut buf).unwrap();
        b.read(&mut buf).unwrap();
        assert_eq!(buf, [1]);
        assert_eq!(a.position(), 2);
        assert_eq!(a.len(), Some(3));
    }

    #[test]
    fn default_seek_is_unsupported() {
        struct Stream;
        impl DataSource for Stream {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Ok(0)
            }
        }
        let err = Stream.seek(SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(!Stream.is_seekable());
    }
}
