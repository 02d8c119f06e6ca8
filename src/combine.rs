//! Drives the multi-reader merge, decryption, and plaintext reassembly for
//! one combine operation.

use std::io::{Read, Seek, Write};

use zeroize::Zeroize;

use crate::error::{HorcruxError, Result};
use crate::horcrux_io::{HorcruxReader, END};
use crate::sss;
use crate::stream::StreamCipher;

/// Recovered alongside the plaintext: the filename the splitter sealed, if
/// any was given, and the split's 16-byte id (used by callers to build a
/// fallback output name when no filename was recovered).
pub struct CombineOutcome {
    pub filename: Option<String>,
    pub share_id: [u8; sss::SALT_LEN],
}

/// Open every horcrux source, combine their shares into the master key, and
/// initialize stream decryption. Returns live reader handles plus the ready
/// cipher so a caller can decide the output destination (which may depend
/// on the recovered filename) before any plaintext is written.
///
/// `R: Seek` so [`stream_to`] can skip past blocks on lagging horcruxes with
/// a seek instead of reading and discarding them; horcrux sources are always
/// real files, never pipes, so this bound costs real callers nothing.
pub fn prepare<R: Read + Seek>(
    sources: Vec<R>,
) -> Result<(Vec<HorcruxReader<R>>, StreamCipher, CombineOutcome)> {
    if sources.len() < 2 {
        return Err(HorcruxError::NotEnoughShares {
            needed: 2,
            have: sources.len(),
        });
    }

    let mut handles: Vec<HorcruxReader<R>> = sources.into_iter().map(HorcruxReader::new).collect();
    for h in handles.iter_mut() {
        h.init_read()?;
    }

    let shares: Vec<sss::Share> = handles
        .iter()
        .map(|h| h.share.clone().expect("init_read populates share"))
        .collect();
    let share_id = shares[0].id;
    let mut key = sss::combine(&shares).map_err(|e| {
        tracing::warn!(horcruxes = handles.len(), error = %e, "share combination failed");
        e
    })?;

    let filename = match handles[0].encrypted_filename.clone() {
        Some(sealed) => Some(crate::stream::open_filename(&key, &sealed)?),
        None => None,
    };

    let header = handles[0]
        .crypto_header
        .clone()
        .expect("init_read populates crypto_header");
    let header: [u8; crate::stream::HEADER_LEN] = header
        .try_into()
        .map_err(|_| HorcruxError::Malformed("crypto header has the wrong length".into()))?;
    let mut cipher = StreamCipher::new();
    cipher.init_decrypt(&header, &key)?;
    key.zeroize();

    tracing::info!(horcruxes = handles.len(), threshold = shares[0].threshold, "combine shares verified, key derived");

    Ok((handles, cipher, CombineOutcome { filename, share_id }))
}

/// Merge prepared horcrux handles in block-id order, decrypting each block
/// and writing the plaintext to `output`.
///
/// Lagging handles (`next_block_id < cursor`) are advanced with
/// [`HorcruxReader::skip_block_seek`], which seeks past the pending
/// `BlockData` instead of reading and discarding it — every handle here
/// came from [`prepare`], which requires `R: Seek`.
pub fn stream_to<R: Read + Seek, W: Write>(
    mut handles: Vec<HorcruxReader<R>>,
    mut cipher: StreamCipher,
    mut output: W,
) -> Result<()> {
    let mut cursor: u64 = 0;
    let mut live: Vec<usize> = (0..handles.len()).collect();

    while !live.is_empty() {
        let mut advanced = false;

        let mut i = 0;
        while i < live.len() {
            let idx = live[i];
            if handles[idx].next_block_id == cursor {
                let (_, ciphertext) = handles[idx].read_block()?;
                let plaintext = cipher.decrypt(&ciphertext).map_err(|_| {
                    let horcrux_id = handles[idx]
                        .hrcx_id
                        .expect("init_read populates hrcx_id");
                    tracing::warn!(horcrux_id, block_id = cursor, "decryption failed, horcrux appears corrupted");
                    HorcruxError::DecryptionError { horcrux_id }
                })?;
                output.write_all(&plaintext)?;
                cursor += 1;
                advanced = true;
                break;
            }
            i += 1;
        }
        if advanced {
            continue;
        }

        for &idx in &live {
            if handles[idx].next_block_id < cursor {
                handles[idx].skip_block_seek()?;
            }
        }

        live.retain(|&idx| handles[idx].next_block_id != END);

        if live.is_empty() {
            break;
        }
        if live.iter().all(|&idx| handles[idx].next_block_id > cursor) {
            tracing::warn!(block_id = cursor, live = live.len(), "no live horcrux carries the next block");
            return Err(HorcruxError::MissingBlock { id: cursor });
        }
    }

    tracing::info!(blocks = cursor, "combine complete");
    Ok(())
}

/// Convenience wrapper: combine at least `threshold` horcrux streams,
/// writing the reconstructed plaintext straight to `output`. Prefer
/// [`prepare`] + [`stream_to`] when the output destination depends on the
/// recovered filename (as the CLI's combine command does).
pub fn combine<R: Read + Seek, W: Write>(sources: Vec<R>, output: W) -> Result<CombineOutcome> {
    let (handles, cipher, outcome) = prepare(sources)?;
    stream_to(handles, cipher, output)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split;
    use std::io::Cursor;

    // `split::split` takes ownership of the sinks and returns nothing, so
    // tests capture the written bytes by handing it `Cursor<Vec<u8>>` wrapped
    // in a type that lets us read the buffer back out afterward.
    fn split_capturing(plaintext: &[u8], n: u8, k: u8, filename: Option<&str>) -> Vec<Vec<u8>> {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedSink(Rc<RefCell<Vec<u8>>>);
        impl std::io::Write for SharedSink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffers: Vec<Rc<RefCell<Vec<u8>>>> =
            (0..n).map(|_| Rc::new(RefCell::new(Vec::new()))).collect();
        let sinks: Vec<SharedSink> = buffers.iter().map(|b| SharedSink(b.clone())).collect();
        split::split(
            Cursor::new(plaintext.to_vec()),
            sinks,
            n,
            k,
            Some(plaintext.len() as u64),
            filename,
        )
        .unwrap();
        buffers.into_iter().map(|b| b.take()).collect()
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
        let horcruxes = split_capturing(&plaintext, 4, 2, None);
        let sources: Vec<Cursor<Vec<u8>>> = vec![
            Cursor::new(horcruxes[0].clone()),
            Cursor::new(horcruxes[2].clone()),
        ];
        let mut out = Vec::new();
        combine(sources, &mut out).unwrap();
        assert_eq!(out, plaintext);
    }

    #[test]
    fn recovers_filename_when_present() {
        let plaintext = b"small payload".to_vec();
        let horcruxes = split_capturing(&plaintext, 5, 3, Some("data.bin"));
        let sources: Vec<Cursor<Vec<u8>>> = horcruxes[..3]
            .iter()
            .map(|h| Cursor::new(h.clone()))
            .collect();
        let mut out = Vec::new();
        let outcome = combine(sources, &mut out).unwrap();
        assert_eq!(out, plaintext);
        assert_eq!(outcome.filename.as_deref(), Some("data.bin"));
    }

    #[test]
    fn no_filename_recovers_none() {
        let plaintext = b"no name here".to_vec();
        let horcruxes = split_capturing(&plaintext, 3, 2, None);
        let sources: Vec<Cursor<Vec<u8>>> = horcruxes[..2]
            .iter()
            .map(|h| Cursor::new(h.clone()))
            .collect();
        let mut out = Vec::new();
        let outcome = combine(sources, &mut out).unwrap();
        assert!(outcome.filename.is_none());
    }

    #[test]
    fn not_enough_shares_fails() {
        let plaintext = b"payload".to_vec();
        let horcruxes = split_capturing(&plaintext, 5, 3, None);
        let sources: Vec<Cursor<Vec<u8>>> = vec![Cursor::new(horcruxes[0].clone())];
        let mut out = Vec::new();
        assert!(matches!(
            combine(sources, &mut out),
            Err(HorcruxError::NotEnoughShares { .. })
        ));
    }

    #[test]
    fn tampered_block_fails_decryption() {
        let plaintext = b"tamper me please".to_vec();
        let mut horcruxes = split_capturing(&plaintext, 2, 2, None);
        let last = horcruxes[0].len() - 1;
        horcruxes[0][last] ^= 0xff;
        let sources: Vec<Cursor<Vec<u8>>> = horcruxes.into_iter().map(Cursor::new).collect();
        let mut out = Vec::new();
        assert!(matches!(
            combine(sources, &mut out),
            Err(HorcruxError::DecryptionError { .. })
        ));
    }

    #[test]
    fn mixed_splits_reject_with_id_mismatch() {
        let plaintext = b"same plaintext, two splits".to_vec();
        let a = split_capturing(&plaintext, 5, 3, None);
        let b = split_capturing(&plaintext, 5, 3, None);
        let sources = vec![Cursor::new(a[0].clone()), Cursor::new(b[1].clone())];
        let mut out = Vec::new();
        assert!(matches!(
            combine(sources, &mut out),
            Err(HorcruxError::IdMismatch)
        ));
    }
}
