//! PostScript - an in-memory vector-graphics document.

/// A PostScript document buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostScript {
    pub data: Vec<u8>,
    /// Header written
    pub has_header: bool,
    /// Trailer written; no more content may be appended
    pub closed: bool,
}

impl PostScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document from complete bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let has_header = data.starts_with(b"%!PS");
        let closed = data.windows(5).any(|w| w == b"%%EOF");
        Self { data, has_header, closed }
    }

    #[inline]
    pub fn n_bytes(&self) -> usize {
        self.data.len()
    }

    /// Append content; returns false once the document is closed.
    pub fn append(&mut self, chunk: &[u8]) -> bool {
        if self.closed {
            return false;
        }
        if self.data.is_empty() {
            self.has_header = chunk.starts_with(b"%!PS");
        }
        self.data.extend_from_slice(chunk);
        true
    }

    /// Write the trailer.
    pub fn close(&mut self) {
        if !self.closed {
            self.data.extend_from_slice(b"%%EOF\n");
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_until_closed() {
        let mut ps = PostScript::new();
        assert!(ps.append(b"%!PS-Adobe-3.0\n"));
        assert!(ps.has_header);
        ps.close();
        assert!(!ps.append(b"more"));
        assert!(PostScript::from_bytes(ps.data.clone()).closed);
    }
}
