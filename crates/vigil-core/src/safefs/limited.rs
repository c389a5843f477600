//! Size-limiting reader.

use std::io::Read;

/// Wrapper reader that stops one byte past a configured limit.
///
/// Reading one byte beyond the limit is what distinguishes "exactly at the
/// limit" from "over the limit" without reading an unbounded amount of
/// data. Callers check [`LimitedReader::over_limit`] after draining the
/// reader.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use vigil_core::safefs::LimitedReader;
///
/// let data = b"hello world";
/// let mut reader = LimitedReader::new(&data[..], 5);
/// let mut buf = Vec::new();
/// reader.read_to_end(&mut buf)?;
///
/// assert!(reader.over_limit());
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct LimitedReader<R> {
    /// Inner reader being wrapped
    inner: R,
    /// Configured byte limit
    limit: u64,
    /// Total bytes successfully read
    bytes_read: u64,
}

impl<R> LimitedReader<R> {
    /// Creates a reader that will consume at most `limit + 1` bytes.
    #[must_use]
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            bytes_read: 0,
        }
    }

    /// Returns the total number of bytes read so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns true once more than `limit` bytes have been read.
    #[must_use]
    pub fn over_limit(&self) -> bool {
        self.bytes_read > self.limit
    }

    /// Consumes the reader and returns the inner reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // Budget is limit + 1 so oversize inputs are detectable.
        let budget = self.limit.saturating_add(1).saturating_sub(self.bytes_read);
        if budget == 0 {
            return Ok(0);
        }
        let cap = usize::try_from(budget.min(buf.len() as u64)).unwrap_or(buf.len());
        let n = self.inner.read(&mut buf[..cap])?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_under_limit() {
        let data = b"abc";
        let mut reader = LimitedReader::new(&data[..], 10);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert_eq!(buf, b"abc");
        assert_eq!(reader.bytes_read(), 3);
        assert!(!reader.over_limit());
    }

    #[test]
    fn test_exactly_at_limit() {
        let data = b"abcde";
        let mut reader = LimitedReader::new(&data[..], 5);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert_eq!(buf.len(), 5);
        assert!(!reader.over_limit());
    }

    #[test]
    fn test_one_over_limit() {
        let data = b"abcdef";
        let mut reader = LimitedReader::new(&data[..], 5);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        // Reads exactly one byte past the limit, not the whole input.
        assert_eq!(buf.len(), 6);
        assert!(reader.over_limit());
    }

    #[test]
    fn test_stops_reading_past_sentinel_byte() {
        let data = vec![0u8; 1024];
        let mut reader = LimitedReader::new(&data[..], 8);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert_eq!(buf.len(), 9);
        assert_eq!(reader.bytes_read(), 9);
        assert!(reader.over_limit());
    }

    #[test]
    fn test_zero_limit() {
        let data = b"x";
        let mut reader = LimitedReader::new(&data[..], 0);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert_eq!(buf.len(), 1);
        assert!(reader.over_limit());
    }

    #[test]
    fn test_empty_input() {
        let data = b"";
        let mut reader = LimitedReader::new(&data[..], 0);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert!(buf.is_empty());
        assert!(!reader.over_limit());
    }
}
