use crate::error::FrameError;

/// Longest accepted length prefix, excluding the newline.
pub const MAX_PREFIX_LEN: usize = 31;

/// Default upper bound on a request payload.
pub const DEFAULT_MAX_REQUEST: usize = 65536;

/// Result of one decode step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    Frame(Vec<u8>),
    Malformed(FrameError),
}

/// Incremental decoder for `<decimal-length>\n<payload>` frames.
///
/// Bytes are appended as they arrive; `decode()` yields at most one frame
/// per call and returns `None` until a full frame is buffered.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_len: usize,
    // Payload bytes still to discard after an oversized prefix.
    skip: usize,
}

impl FrameDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
            skip: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn decode(&mut self) -> Option<Decoded> {
        if self.skip > 0 {
            let n = self.skip.min(self.buf.len());
            self.buf.drain(..n);
            self.skip -= n;
            if self.skip > 0 {
                return None;
            }
        }

        let Some(newline) = self.buf.iter().position(|&b| b == b'\n') else {
            if self.buf.len() > MAX_PREFIX_LEN {
                self.buf.clear();
                return Some(Decoded::Malformed(FrameError::BadPrefix));
            }
            return None;
        };

        let prefix = &self.buf[..newline];
        let len = if newline <= MAX_PREFIX_LEN && !prefix.is_empty() {
            parse_length(prefix)
        } else {
            None
        };
        let Some(len) = len else {
            self.buf.drain(..=newline);
            return Some(Decoded::Malformed(FrameError::BadPrefix));
        };

        if len == 0 {
            self.buf.drain(..=newline);
            return Some(Decoded::Malformed(FrameError::Empty));
        }
        if len > self.max_len {
            self.buf.drain(..=newline);
            self.skip = len;
            return Some(Decoded::Malformed(FrameError::TooLarge {
                len,
                max: self.max_len,
            }));
        }

        let end = newline + 1 + len;
        if self.buf.len() < end {
            return None;
        }
        let payload = self.buf[newline + 1..end].to_vec();
        self.buf.drain(..end);
        Some(Decoded::Frame(payload))
    }
}

fn parse_length(prefix: &[u8]) -> Option<usize> {
    if !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(prefix).ok()?.parse().ok()
}

/// Frame a payload for the wire.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{}\n", payload.len()).into_bytes();
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_terminator() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(b"12");
        assert_eq!(dec.decode(), None);
        assert_eq!(dec.pending(), 2);
    }

    #[test]
    fn waits_for_full_payload() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(b"5\nabc");
        assert_eq!(dec.decode(), None);
        dec.extend(b"de");
        assert_eq!(dec.decode(), Some(Decoded::Frame(b"abcde".to_vec())));
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn pipelined_frames_come_out_in_order() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(b"1\na2\nbc");
        assert_eq!(dec.decode(), Some(Decoded::Frame(b"a".to_vec())));
        assert_eq!(dec.decode(), Some(Decoded::Frame(b"bc".to_vec())));
        assert_eq!(dec.decode(), None);
    }

    #[test]
    fn zero_length_is_malformed() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(b"0\n");
        assert_eq!(dec.decode(), Some(Decoded::Malformed(FrameError::Empty)));
    }

    #[test]
    fn non_digit_prefix_is_malformed() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(b"-4\n1\nx");
        assert_eq!(dec.decode(), Some(Decoded::Malformed(FrameError::BadPrefix)));
        // The stream resynchronises on the next prefix.
        assert_eq!(dec.decode(), Some(Decoded::Frame(b"x".to_vec())));
    }

    #[test]
    fn runaway_prefix_is_malformed() {
        let mut dec = FrameDecoder::new(DEFAULT_MAX_REQUEST);
        dec.extend(&[b'9'; MAX_PREFIX_LEN + 1]);
        assert_eq!(dec.decode(), Some(Decoded::Malformed(FrameError::BadPrefix)));
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn oversized_payload_is_skipped() {
        let mut dec = FrameDecoder::new(4);
        dec.extend(b"6\nabc");
        assert_eq!(
            dec.decode(),
            Some(Decoded::Malformed(FrameError::TooLarge { len: 6, max: 4 }))
        );
        assert_eq!(dec.decode(), None);
        dec.extend(b"def2\nok");
        assert_eq!(dec.decode(), Some(Decoded::Frame(b"ok".to_vec())));
    }

    #[test]
    fn encode_prefixes_length() {
        assert_eq!(encode_frame(b"{}"), b"2\n{}".to_vec());
    }
}
