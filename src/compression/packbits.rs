//! Codec for PackBits run-length compressed data
//!
//! The stream is a sequence of control bytes, each followed by its
//! payload: a non-negative control n copies n+1 literal bytes, a
//! negative control n (except -128) repeats the following byte 1-n
//! times, and -128 is padding with no payload at all.

use crate::tiff::errors::{TiffError, TiffResult};
use super::codec::{Codec, CodecOptions};

/// PackBits codec (compression code 32773)
pub struct PackBitsCodec;

impl Codec for PackBitsCodec {
    fn decode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        // Worst case is all-literal, best is 128:2; start in between
        let mut out = Vec::with_capacity(data.len().saturating_mul(2));
        let mut rest = data;

        while let Some((&control, tail)) = rest.split_first() {
            let control = control as i8;

            if control == -128 {
                // Padding control, carries nothing
                rest = tail;
                continue;
            }

            if control >= 0 {
                let literal_len = control as usize + 1;
                if tail.len() < literal_len {
                    return Err(TiffError::codec(
                        format!(
                            "PackBits literal of {} bytes but only {} remain",
                            literal_len,
                            tail.len()
                        ),
                        None,
                    ));
                }
                let (literals, after) = tail.split_at(literal_len);
                out.extend_from_slice(literals);
                rest = after;
            } else {
                let repeat = 1 + (-(control as i32)) as usize;
                let (&value, after) = tail.split_first().ok_or_else(|| {
                    TiffError::codec("PackBits run control with no byte to repeat", None)
                })?;
                out.resize(out.len() + repeat, value);
                rest = after;
            }
        }

        Ok(out)
    }

    fn encode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut output = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            // Measure the run starting here
            let mut run = 1;
            while pos + run < data.len() && data[pos + run] == data[pos] && run < 128 {
                run += 1;
            }

            if run >= 2 {
                output.push((1i8 - run as i8) as u8);
                output.push(data[pos]);
                pos += run;
                continue;
            }

            // Literal stretch: until the next run of 3+ or 128 bytes
            let start = pos;
            pos += 1;
            while pos < data.len() && pos - start < 128 {
                let mut lookahead = 1;
                while pos + lookahead < data.len()
                    && data[pos + lookahead] == data[pos]
                    && lookahead < 3
                {
                    lookahead += 1;
                }
                if lookahead >= 3 {
                    break;
                }
                pos += 1;
            }
            output.push((pos - start - 1) as u8);
            output.extend_from_slice(&data[start..pos]);
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        32773
    }
}
