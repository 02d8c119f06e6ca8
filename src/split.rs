//! Drives encryption, the planner's distribution decisions, and the N
//! horcrux writers end-to-end for one split operation.

use std::io::{Read, Write};

use sodiumoxide::randombytes::randombytes_into;
use zeroize::Zeroize;

use crate::config::MAX_CHUNK_SIZE;
use crate::error::{HorcruxError, Result};
use crate::horcrux_io::HorcruxWriter;
use crate::planner::{self, DistributionMode};
use crate::sss::{self, SALT_LEN};
use crate::stream::{self, StreamCipher};

/// Read up to `want` bytes from `r`, looping until either `want` bytes are
/// collected or the source is exhausted. Returns a shorter (possibly empty)
/// vector at end of stream.
fn read_up_to<R: Read>(r: &mut R, want: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; want];
    let mut filled = 0;
    while filled < want {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Split `input` into `n` encrypted horcruxes (`k` of which reconstruct it),
/// writing each to the corresponding sink in `sinks`.
///
/// `size_hint` enables smart distribution straight from the source when the
/// whole stream's length is known up front (e.g. reading a file, as opposed
/// to standard input). `filename`, if given, is sealed alongside the shares
/// so combine can recover it.
pub fn split<R: Read, W: Write>(
    mut input: R,
    sinks: Vec<W>,
    n: u8,
    k: u8,
    size_hint: Option<u64>,
    filename: Option<&str>,
) -> Result<()> {
    if sinks.len() != n as usize {
        return Err(HorcruxError::InvalidParameters(format!(
            "need {n} sinks, got {}",
            sinks.len()
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    randombytes_into(&mut salt);

    let mut key = stream::gen_key();
    let mut cipher = StreamCipher::new();
    let header = cipher.init_encrypt(&key);
    let shares = sss::split(n, k, &key, salt)?;
    let encrypted_filename = filename.map(|f| stream::seal_filename(&key, f));
    key.zeroize();

    let mut writers: Vec<HorcruxWriter<W>> = sinks.into_iter().map(HorcruxWriter::new).collect();
    for (writer, share) in writers.iter_mut().zip(shares.iter()) {
        writer.init_write(share, &header, encrypted_filename.as_deref())?;
    }

    let mut block_counter: u64 = 0;
    let mut round_robin = None;

    if let Some(size) = size_hint {
        if let Some(block_size) = planner::whole_stream_smart_block_size(size, n, k) {
            smart_distribute(
                &mut input,
                block_size,
                n,
                k,
                &mut writers,
                &mut cipher,
                &mut block_counter,
            )?;
            tracing::info!(n, k, mode = "smart", blocks = block_counter, "split complete");
            return Ok(());
        }
    }

    loop {
        let chunk = read_up_to(&mut input, MAX_CHUNK_SIZE as usize)?;
        if chunk.is_empty() {
            break;
        }
        let chunk_size = chunk.len() as u64;
        match planner::chunk_mode(chunk_size, n, k) {
            DistributionMode::Smart { block_size } => {
                let mut cursor = std::io::Cursor::new(chunk);
                smart_distribute(
                    &mut cursor,
                    block_size,
                    n,
                    k,
                    &mut writers,
                    &mut cipher,
                    &mut block_counter,
                )?;
            }
            DistributionMode::FullReplicate => {
                full_distribute(&chunk, &mut writers, &mut cipher, &mut block_counter)?;
            }
            DistributionMode::RoundRobin { block_size } => {
                let cycler = round_robin
                    .get_or_insert_with(|| planner::RoundRobinCycler::new(n, n - k + 1));
                let mut cursor = std::io::Cursor::new(chunk);
                round_robin_distribute(
                    &mut cursor,
                    block_size,
                    cycler,
                    &mut writers,
                    &mut cipher,
                    &mut block_counter,
                )?;
            }
        }
    }

    tracing::info!(n, k, mode = "chunked", blocks = block_counter, "split complete");
    Ok(())
}

fn smart_distribute<R: Read, W: Write>(
    chunk: &mut R,
    block_size: u64,
    n: u8,
    k: u8,
    writers: &mut [HorcruxWriter<W>],
    cipher: &mut StreamCipher,
    block_counter: &mut u64,
) -> Result<()> {
    let r = n - k + 1;
    let mut combos = planner::combinations_of_horcruxes(n, r);
    loop {
        let block = read_up_to(chunk, block_size as usize)?;
        if block.is_empty() {
            break;
        }
        let id = *block_counter;
        *block_counter += 1;
        let ciphertext = cipher.encrypt(&block)?;
        let targets = combos
            .next()
            .ok_or(HorcruxError::DistributionIncomplete)?;
        for h in targets {
            writers[h as usize].write_block(id, &ciphertext)?;
        }
    }
    if combos.next().is_some() {
        return Err(HorcruxError::DistributionIncomplete);
    }
    Ok(())
}

fn round_robin_distribute<R: Read, W: Write>(
    chunk: &mut R,
    block_size: u64,
    cycler: &mut planner::RoundRobinCycler,
    writers: &mut [HorcruxWriter<W>],
    cipher: &mut StreamCipher,
    block_counter: &mut u64,
) -> Result<()> {
    loop {
        let block = read_up_to(chunk, block_size as usize)?;
        if block.is_empty() {
            break;
        }
        let id = *block_counter;
        *block_counter += 1;
        let ciphertext = cipher.encrypt(&block)?;
        for h in cycler.next_group() {
            writers[h as usize].write_block(id, &ciphertext)?;
        }
    }
    Ok(())
}

fn full_distribute<W: Write>(
    chunk: &[u8],
    writers: &mut [HorcruxWriter<W>],
    cipher: &mut StreamCipher,
    block_counter: &mut u64,
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    let ciphertext = cipher.encrypt(chunk)?;
    let id = *block_counter;
    *block_counter += 1;
    for w in writers.iter_mut() {
        w.write_block(id, &ciphertext)?;
    }
    Ok(())
}
