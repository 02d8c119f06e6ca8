//! Per-file horcrux reader/writer: headers, peeked block ids, block read/skip/write.
//!
//! A [`HorcruxReader`] always keeps `next_block_id` primed one record ahead
//! so a combiner can inspect it without consuming the pending `BlockData`.

use std::io::{Read, Seek, Write};

use crate::error::Result;
use crate::framing;
use crate::sss::Share;

/// `next_block_id` once a horcrux stream has been fully consumed.
pub const END: u64 = u64::MAX;

/// Reads one horcrux's headers and blocks from an underlying stream.
pub struct HorcruxReader<R> {
    stream: R,
    /// This horcrux's share's `X` coordinate, populated by `init_read`. Used
    /// to identify which horcrux a `DecryptionError` came from.
    pub hrcx_id: Option<usize>,
    pub share: Option<Share>,
    pub crypto_header: Option<Vec<u8>>,
    pub encrypted_filename: Option<Vec<u8>>,
    pub next_block_id: u64,
}

impl<R: Read> HorcruxReader<R> {
    pub fn new(stream: R) -> Self {
        HorcruxReader {
            stream,
            hrcx_id: None,
            share: None,
            crypto_header: None,
            encrypted_filename: None,
            next_block_id: END,
        }
    }

    /// Consume `ShareHeader` and `StreamHeader`, then prime `next_block_id`.
    pub fn init_read(&mut self) -> Result<()> {
        let share_body = framing::read_record(&mut self.stream)?
            .ok_or_else(|| crate::error::HorcruxError::Malformed("missing ShareHeader".into()))?;
        let share = framing::decode_share_header(&share_body)?;
        self.hrcx_id = Some(share.point.x as usize);

        let stream_header_body = framing::read_record(&mut self.stream)?
            .ok_or_else(|| crate::error::HorcruxError::Malformed("missing StreamHeader".into()))?;
        let (header, encrypted_filename) = framing::decode_stream_header(&stream_header_body)?;

        self.share = Some(share);
        self.crypto_header = Some(header);
        self.encrypted_filename = encrypted_filename;
        self.prime_next_block_id()?;
        Ok(())
    }

    fn prime_next_block_id(&mut self) -> Result<()> {
        match framing::read_record(&mut self.stream)? {
            None => {
                self.next_block_id = END;
            }
            Some(body) => {
                self.next_block_id = framing::decode_block_id(&body)?;
            }
        }
        Ok(())
    }

    /// Read the pending `BlockData`, returning the id that was peeked, then
    /// re-prime `next_block_id` for the next round.
    pub fn read_block(&mut self) -> Result<(u64, Vec<u8>)> {
        let this_id = self.next_block_id;
        let body = framing::read_record(&mut self.stream)?.ok_or_else(|| {
            crate::error::HorcruxError::Malformed("missing BlockData after BlockID".into())
        })?;
        let data = framing::decode_block_data(&body)?;
        self.prime_next_block_id()?;
        Ok((this_id, data))
    }

    /// Discard the pending `BlockData` without decoding it, then re-prime.
    pub fn skip_block(&mut self) -> Result<()> {
        framing::skip_record(&mut self.stream)?;
        self.prime_next_block_id()?;
        Ok(())
    }

    pub fn x(&self) -> Option<u16> {
        self.share.as_ref().map(|s| s.point.x)
    }
}

impl<R: Read + Seek> HorcruxReader<R> {
    /// Like [`skip_block`](Self::skip_block), but seeks past the pending
    /// `BlockData` instead of reading and discarding it.
    pub fn skip_block_seek(&mut self) -> Result<()> {
        framing::skip_record_seek(&mut self.stream)?;
        self.prime_next_block_id()?;
        Ok(())
    }
}

/// Writes one horcrux's headers and blocks to an underlying stream.
pub struct HorcruxWriter<W> {
    stream: W,
    pub hrcx_id: Option<usize>,
}

impl<W: Write> HorcruxWriter<W> {
    pub fn new(stream: W) -> Self {
        HorcruxWriter {
            stream,
            hrcx_id: None,
        }
    }

    /// Emit `ShareHeader` and `StreamHeader`, preparing the stream for
    /// `write_block` calls.
    pub fn init_write(
        &mut self,
        share: &Share,
        crypto_header: &[u8],
        encrypted_filename: Option<&[u8]>,
    ) -> Result<()> {
        self.hrcx_id = Some(share.point.x as usize);
        let share_body = framing::encode_share_header(share);
        framing::write_record(&mut self.stream, &share_body)?;
        let stream_header_body = framing::encode_stream_header(crypto_header, encrypted_filename);
        framing::write_record(&mut self.stream, &stream_header_body)?;
        Ok(())
    }

    /// Emit a `BlockID` record followed by a `BlockData` record.
    pub fn write_block(&mut self, id: u64, data: &[u8]) -> Result<()> {
        let id_body = framing::encode_block_id(id);
        framing::write_record(&mut self.stream, &id_body)?;
        let data_body = framing::encode_block_data(data);
        framing::write_record(&mut self.stream, &data_body)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}
