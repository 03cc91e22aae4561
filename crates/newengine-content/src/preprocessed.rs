use crate::error::{AssetError, ContentResult};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Container tag written at the start of every preprocessed file.
pub const PREPROCESSED_TAG: &str = "UVC0";

const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Writer handed to processors exporting a preprocessed asset.
///
/// Layout:
/// - tag string `"UVC0"`
/// - processor identifier string
/// - processor payload
///
/// Strings are UTF-8 with a 7-bit variable-length prefix. Numbers are little-endian.
pub struct PreprocessedWriter<'a> {
    inner: &'a mut dyn Write,
    path: PathBuf,
}

impl<'a> PreprocessedWriter<'a> {
    #[inline]
    pub fn new(inner: &'a mut dyn Write, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    /// Writes the container tag and the identifier of the processor that owns the payload.
    pub fn write_header(&mut self, processor_id: &str) -> ContentResult<()> {
        self.write_string(PREPROCESSED_TAG)?;
        self.write_string(processor_id)
    }

    #[inline]
    fn io(&mut self, bytes: &[u8]) -> ContentResult<()> {
        self.inner
            .write_all(bytes)
            .map_err(|e| AssetError::io(&self.path, e))
    }

    pub fn write_len(&mut self, mut len: usize) -> ContentResult<()> {
        let mut buf = [0u8; 10];
        let mut n = 0usize;
        loop {
            let byte = (len & 0x7f) as u8;
            len >>= 7;
            if len == 0 {
                buf[n] = byte;
                n += 1;
                break;
            }
            buf[n] = byte | 0x80;
            n += 1;
        }
        self.io(&buf[..n])
    }

    pub fn write_string(&mut self, s: &str) -> ContentResult<()> {
        self.write_len(s.len())?;
        self.io(s.as_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> ContentResult<()> {
        self.write_len(bytes.len())?;
        self.io(bytes)
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) -> ContentResult<()> {
        self.io(&[v])
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) -> ContentResult<()> {
        self.write_u8(v as u8)
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) -> ContentResult<()> {
        self.io(&v.to_le_bytes())
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) -> ContentResult<()> {
        self.io(&v.to_le_bytes())
    }

    #[inline]
    pub fn write_u64(&mut self, v: u64) -> ContentResult<()> {
        self.io(&v.to_le_bytes())
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) -> ContentResult<()> {
        self.io(&v.to_le_bytes())
    }

    pub fn flush(&mut self) -> ContentResult<()> {
        self.inner.flush().map_err(|e| AssetError::io(&self.path, e))
    }
}

/// Reader counterpart of [`PreprocessedWriter`].
pub struct PreprocessedReader<'a> {
    inner: &'a mut dyn Read,
    path: PathBuf,
}

impl<'a> PreprocessedReader<'a> {
    #[inline]
    pub fn new(inner: &'a mut dyn Read, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates the container tag and returns the recorded processor identifier.
    pub fn read_header(&mut self) -> ContentResult<String> {
        let tag = self.read_string().map_err(|e| self.header_error(e))?;
        if tag != PREPROCESSED_TAG {
            return Err(self.invalid(format!("bad container tag '{}'", tag.escape_debug())));
        }
        self.read_string().map_err(|e| self.header_error(e))
    }

    fn header_error(&self, e: AssetError) -> AssetError {
        match e {
            AssetError::Io { source, .. } if source.kind() == io::ErrorKind::UnexpectedEof => {
                self.invalid("truncated header")
            }
            other => other,
        }
    }

    #[inline]
    fn invalid(&self, reason: impl Into<String>) -> AssetError {
        AssetError::InvalidPreprocessedData {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    #[inline]
    fn io(&mut self, buf: &mut [u8]) -> ContentResult<()> {
        self.inner
            .read_exact(buf)
            .map_err(|e| AssetError::io(&self.path, e))
    }

    pub fn read_len(&mut self) -> ContentResult<usize> {
        let mut out = 0usize;
        for shift in (0..35).step_by(7) {
            let b = self.read_u8()?;
            out |= ((b & 0x7f) as usize) << shift;
            if b & 0x80 == 0 {
                if out > MAX_STRING_LEN {
                    return Err(self.invalid(format!("length {} too large", out)));
                }
                return Ok(out);
            }
        }
        Err(self.invalid("malformed length prefix"))
    }

    pub fn read_string(&mut self) -> ContentResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| self.invalid(format!("utf8: {e}")))
    }

    pub fn read_bytes(&mut self) -> ContentResult<Vec<u8>> {
        let len = self.read_len()?;
        let mut buf = vec![0u8; len];
        self.io(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    pub fn read_u8(&mut self) -> ContentResult<u8> {
        let mut b = [0u8; 1];
        self.io(&mut b)?;
        Ok(b[0])
    }

    #[inline]
    pub fn read_bool(&mut self) -> ContentResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    #[inline]
    pub fn read_i32(&mut self) -> ContentResult<i32> {
        let mut b = [0u8; 4];
        self.io(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    #[inline]
    pub fn read_u32(&mut self) -> ContentResult<u32> {
        let mut b = [0u8; 4];
        self.io(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    #[inline]
    pub fn read_u64(&mut self) -> ContentResult<u64> {
        let mut b = [0u8; 8];
        self.io(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    #[inline]
    pub fn read_f32(&mut self) -> ContentResult<f32> {
        let mut b = [0u8; 4];
        self.io(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_matches_container_format() {
        let mut out = Vec::new();
        {
            let mut w = PreprocessedWriter::new(&mut out, "a.uvc");
            w.write_header("content.text").unwrap();
        }
        assert_eq!(&out[..5], b"\x04UVC0");
        assert_eq!(out[5], 12);
        assert_eq!(&out[6..], b"content.text");

        let mut src = out.as_slice();
        let mut r = PreprocessedReader::new(&mut src, "a.uvc");
        assert_eq!(r.read_header().unwrap(), "content.text");
    }

    #[test]
    fn long_lengths_use_continuation_bytes() {
        let text = "x".repeat(300);
        let mut out = Vec::new();
        PreprocessedWriter::new(&mut out, "b.uvc")
            .write_string(&text)
            .unwrap();
        assert_eq!(&out[..2], &[0xac, 0x02]);

        let mut src = out.as_slice();
        let mut r = PreprocessedReader::new(&mut src, "b.uvc");
        assert_eq!(r.read_string().unwrap(), text);
    }

    #[test]
    fn payload_primitives_are_little_endian() {
        let mut out = Vec::new();
        {
            let mut w = PreprocessedWriter::new(&mut out, "p.uvc");
            w.write_bool(true).unwrap();
            w.write_i32(-2).unwrap();
            w.write_u64(1 << 40).unwrap();
            w.write_f32(1.5).unwrap();
            w.write_bytes(&[9, 8, 7]).unwrap();
        }
        assert_eq!(&out[1..5], &(-2i32).to_le_bytes());

        let mut src = out.as_slice();
        let mut r = PreprocessedReader::new(&mut src, "p.uvc");
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.read_u64().unwrap(), 1 << 40);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_bytes().unwrap(), vec![9, 8, 7]);
        assert!(matches!(r.read_u8(), Err(AssetError::Io { .. })));
    }

    #[test]
    fn bad_or_truncated_headers_are_rejected() {
        let mut src: &[u8] = b"\x04UVC9\x01x";
        let err = PreprocessedReader::new(&mut src, "c.uvc").read_header().unwrap_err();
        assert!(matches!(err, AssetError::InvalidPreprocessedData { .. }));

        let mut src: &[u8] = b"\x04UV";
        let err = PreprocessedReader::new(&mut src, "c.uvc").read_header().unwrap_err();
        assert!(matches!(err, AssetError::InvalidPreprocessedData { .. }));
    }
}
