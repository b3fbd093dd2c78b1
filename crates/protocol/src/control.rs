//! Control-plane framing: one ticker symbol per `\n`-terminated line.
//!
//! Stream reads carry no message boundaries, so requests are reassembled
//! incrementally; a request split across reads or several requests in one
//! read decode the same way.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

use crate::error::ControlError;
use crate::ticker::Ticker;

/// Longest request line, excluding the terminator.
pub const MAX_REQUEST_LEN: usize = 64;

/// Codec for ticker-change requests.
///
/// Decoded items are `Ok(ticker)` or `Err(reason)` for a well-framed line that
/// is not a valid symbol, so a bad request does not end the stream. Lines are
/// framed as raw bytes, so a line that is not UTF-8 is a bad request too.
/// Framing violations (an over-long line) and I/O failures are stream errors.
#[derive(Debug, Clone)]
pub struct TickerCodec {
    lines: AnyDelimiterCodec,
}

impl TickerCodec {
    pub fn new() -> Self {
        Self {
            lines: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                MAX_REQUEST_LEN,
            ),
        }
    }
}

impl Default for TickerCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn map_framing_error(e: AnyDelimiterCodecError) -> ControlError {
    match e {
        AnyDelimiterCodecError::MaxChunkLengthExceeded => ControlError::LineTooLong {
            max: MAX_REQUEST_LEN,
        },
        AnyDelimiterCodecError::Io(e) => ControlError::Io(e),
    }
}

fn parse_line(line: Bytes) -> Result<Ticker, String> {
    let text =
        std::str::from_utf8(&line).map_err(|_| "request is not valid UTF-8".to_string())?;
    Ticker::parse(text)
}

impl Decoder for TickerCodec {
    type Item = Result<Ticker, String>;
    type Error = ControlError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let line = self.lines.decode(src).map_err(map_framing_error)?;
        Ok(line.map(parse_line))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let line = self.lines.decode_eof(src).map_err(map_framing_error)?;
        Ok(line.map(parse_line))
    }
}

impl Encoder<&Ticker> for TickerCodec {
    type Error = ControlError;

    fn encode(&mut self, ticker: &Ticker, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.lines
            .encode(ticker.as_str(), dst)
            .map_err(map_framing_error)
    }
}
