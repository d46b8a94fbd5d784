use crate::sentence::{Classification, classify};

/// Receive side of the serial link as seen by the framer.
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    fn has_data(&self) -> bool;

    /// Next byte. Only called after [`ByteSource::has_data`] returned `true`.
    fn get_char(&mut self) -> u8;

    /// Waits a little before the next poll. Lets the core sleep until more bytes come in.
    async fn idle(&mut self);
}

/// One in-flight sentence, from its `$` up to and including the line feed.
pub struct SentenceBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
    classification: Classification,
}

impl<const N: usize> Default for SentenceBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SentenceBuffer<N> {
    const MIN_SIZE: () = assert!(N >= 2, "a sentence buffer needs room for '$' and NUL");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::MIN_SIZE;
        Self {
            buf: [0; N],
            len: 0,
            classification: Classification::UNRECOGNIZED,
        }
    }

    /// Skips to the next `$` and collects bytes until a line feed or until only the NUL
    /// terminator still fits, then classifies what was collected.
    pub async fn read_from<S: ByteSource>(&mut self, src: &mut S) -> Classification {
        self.len = 0;
        self.classification = Classification::UNRECOGNIZED;

        loop {
            Self::wait(src).await;
            if src.get_char() == b'$' {
                break;
            }
        }
        self.buf[0] = b'$';
        self.len = 1;

        while self.len < N - 1 {
            Self::wait(src).await;
            let c = src.get_char();
            self.buf[self.len] = c;
            self.len += 1;
            if c == b'\n' {
                break;
            }
        }
        self.buf[self.len] = 0;

        self.classification = classify(self.as_bytes());
        self.classification
    }

    async fn wait<S: ByteSource>(src: &mut S) {
        while !src.has_data() {
            src.idle().await;
        }
    }

    /// The sentence without its NUL terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_truncated(&self) -> bool {
        self.as_bytes().last() != Some(&b'\n')
    }

    /// Whether the sentence is worth keeping: classified valid, complete up to its CR LF and
    /// printable text otherwise.
    pub fn is_loggable(&self) -> bool {
        match self.as_bytes() {
            [body @ .., b'\r', b'\n'] => {
                self.classification.is_valid() && body.iter().all(|c| (0x20..0x7f).contains(c))
            }
            _ => false,
        }
    }
}
