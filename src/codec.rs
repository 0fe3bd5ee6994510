use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Frames raw bytes in a non-UTF-8 charset into UTF-8 chunks.
///
/// Malformed sequences are replaced with U+FFFD; the first one is logged so a
/// wrong charset guess shows up without failing the whole read.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    charset: &'static encoding_rs::Encoding,
    saw_malformed: bool,
}

impl Utf8Transcoder {
    pub fn new(charset: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: charset.new_decoder(),
            charset,
            saw_malformed: false,
        }
    }

    fn note_malformed(&mut self, had_errors: bool) {
        if had_errors && !self.saw_malformed {
            self.saw_malformed = true;
            tracing::debug!(
                charset = self.charset.name(),
                "malformed input replaced while transcoding"
            );
        }
    }

    fn out_buffer(&self, input_len: usize) -> Vec<u8> {
        let cap = self
            .decoder
            .max_utf8_buffer_length(input_len)
            .unwrap_or_else(|| input_len * 3 + 4);
        vec![0; cap]
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut out = self.out_buffer(src.len());
        let (_result, read, written, had_errors) = self.decoder.decode_to_utf8(src, &mut out, false);
        self.note_malformed(had_errors);

        if read == 0 && written == 0 {
            return Ok(None);
        }

        src.advance(read);
        Ok(Some(BytesMut::from(&out[..written])))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        let mut out = self.out_buffer(buf.len());
        let (_result, _read, written, had_errors) = self.decoder.decode_to_utf8(buf, &mut out, true);
        self.note_malformed(had_errors);
        buf.clear();

        if written > 0 {
            Ok(Some(BytesMut::from(&out[..written])))
        } else {
            Ok(None)
        }
    }
}
