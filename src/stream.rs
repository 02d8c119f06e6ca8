//! Authenticated streaming encryption: a thin, typed wrapper around
//! libsodium's `crypto_secretstream_xchacha20poly1305` construction, plus a
//! one-shot secretbox helper for sealing the optional filename.

use sodiumoxide::crypto::secretbox;
use sodiumoxide::crypto::secretstream::{self, Header, Key, Pull, Push, Stream as SodiumStream};

use crate::error::{HorcruxError, Result};

/// Length in bytes of the master key consumed by [`StreamCipher::init_encrypt`]
/// and [`StreamCipher::init_decrypt`].
pub const KEY_LEN: usize = secretstream::KEYBYTES;

/// Length in bytes of the opaque header produced by [`StreamCipher::init_encrypt`].
pub const HEADER_LEN: usize = secretstream::HEADERBYTES;

/// AEAD overhead added to every encrypted block (MAC + tag byte).
pub const BLOCK_OVERHEAD: usize = secretstream::ABYTES;

/// The four message tags the secretstream construction understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// An ordinary message, no special meaning.
    Message,
    /// Marks the end of a logical group of messages.
    Push,
    /// Rekeys the stream cipher after this message.
    Rekey,
    /// Ends the stream; also rekeys.
    Final,
}

impl From<Tag> for secretstream::Tag {
    fn from(t: Tag) -> Self {
        match t {
            Tag::Message => secretstream::Tag::Message,
            Tag::Push => secretstream::Tag::Push,
            Tag::Rekey => secretstream::Tag::Rekey,
            Tag::Final => secretstream::Tag::Final,
        }
    }
}

impl From<secretstream::Tag> for Tag {
    fn from(t: secretstream::Tag) -> Self {
        match t {
            secretstream::Tag::Message => Tag::Message,
            secretstream::Tag::Push => Tag::Push,
            secretstream::Tag::Rekey => Tag::Rekey,
            secretstream::Tag::Final => Tag::Final,
        }
    }
}

enum Direction {
    Encrypt(SodiumStream<Push>),
    Decrypt(SodiumStream<Pull>),
}

/// One direction (push or pull) of an XChaCha20-Poly1305 secretstream.
///
/// A given instance is either an encryptor or a decryptor, set up by
/// [`init_encrypt`](StreamCipher::init_encrypt) or
/// [`init_decrypt`](StreamCipher::init_decrypt) respectively. The block tag
/// defaults to [`Tag::Rekey`], hardening long-running streams by rekeying
/// after every block.
pub struct StreamCipher {
    direction: Option<Direction>,
    default_tag: Tag,
    last_tag: Option<Tag>,
}

impl StreamCipher {
    /// A stream cipher with the default block tag ([`Tag::Rekey`]).
    pub fn new() -> Self {
        StreamCipher {
            direction: None,
            default_tag: Tag::Rekey,
            last_tag: None,
        }
    }

    /// Reset internal state for push, returning the header the peer needs
    /// to start pulling.
    pub fn init_encrypt(&mut self, key: &[u8; KEY_LEN]) -> [u8; HEADER_LEN] {
        let key = Key(*key);
        let (stream, header) = SodiumStream::init_push(&key).expect("key is always valid-length");
        self.direction = Some(Direction::Encrypt(stream));
        header.0
    }

    /// Reset internal state for pull with a previously produced header.
    pub fn init_decrypt(&mut self, header: &[u8; HEADER_LEN], key: &[u8; KEY_LEN]) -> Result<()> {
        let key = Key(*key);
        let header = Header::from_slice(header)
            .ok_or_else(|| HorcruxError::Malformed("bad secretstream header length".into()))?;
        let stream = SodiumStream::init_pull(&header, &key)
            .map_err(|_| HorcruxError::Malformed("invalid secretstream header".into()))?;
        self.direction = Some(Direction::Decrypt(stream));
        Ok(())
    }

    /// Encrypt one plaintext chunk, ending the block with `tag`
    /// (`None` uses the stream's default tag).
    pub fn encrypt_tagged(&mut self, plaintext: &[u8], tag: Option<Tag>) -> Result<Vec<u8>> {
        if plaintext.is_empty() {
            return Err(HorcruxError::EmptyMessage);
        }
        let tag = tag.unwrap_or(self.default_tag);
        match &mut self.direction {
            Some(Direction::Encrypt(stream)) => stream
                .push(plaintext, None, tag.into())
                .map_err(|_| HorcruxError::Malformed("secretstream push failed".into())),
            _ => Err(HorcruxError::Malformed(
                "stream cipher not initialized for encryption".into(),
            )),
        }
    }

    /// Encrypt one plaintext chunk using the stream's default tag.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_tagged(plaintext, None)
    }

    /// Decrypt one ciphertext block, returning the plaintext. Fails with
    /// [`HorcruxError::DecryptionError`] (with `horcrux_id = 0`, to be
    /// re-annotated by the caller) if the AEAD tag does not verify.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match &mut self.direction {
            Some(Direction::Decrypt(stream)) => {
                let (plaintext, tag) = stream
                    .pull(ciphertext, None)
                    .map_err(|_| HorcruxError::DecryptionError { horcrux_id: 0 })?;
                self.last_tag = Some(tag.into());
                Ok(plaintext)
            }
            _ => Err(HorcruxError::Malformed(
                "stream cipher not initialized for decryption".into(),
            )),
        }
    }

    /// The tag attached to the most recently decrypted block, if any.
    pub fn last_tag(&self) -> Option<Tag> {
        self.last_tag
    }
}

impl Default for StreamCipher {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a fresh random 32-byte secretstream key.
pub fn gen_key() -> [u8; KEY_LEN] {
    secretstream::gen_key().0
}

/// Seal a UTF-8 filename with a one-shot secretbox under `key`. The returned
/// bytes carry the nonce, ciphertext and MAC.
pub fn seal_filename(key: &[u8; KEY_LEN], filename: &str) -> Vec<u8> {
    let nonce = secretbox::gen_nonce();
    let sb_key = secretbox::Key(*key);
    let mut out = secretbox::seal(filename.as_bytes(), &nonce, &sb_key);
    out.extend_from_slice(nonce.as_ref());
    out
}

/// Open a filename previously sealed by [`seal_filename`].
pub fn open_filename(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<String> {
    if sealed.len() < secretbox::NONCEBYTES {
        return Err(HorcruxError::Malformed("encrypted filename too short".into()));
    }
    let split = sealed.len() - secretbox::NONCEBYTES;
    let (ciphertext, nonce_bytes) = sealed.split_at(split);
    let nonce = secretbox::Nonce::from_slice(nonce_bytes)
        .ok_or_else(|| HorcruxError::Malformed("bad filename nonce length".into()))?;
    let sb_key = secretbox::Key(*key);
    let plaintext = secretbox::open(ciphertext, &nonce, &sb_key)
        .map_err(|_| HorcruxError::Malformed("encrypted filename failed to open".into()))?;
    String::from_utf8(plaintext)
        .map_err(|_| HorcruxError::Malformed("decrypted filename is not valid utf-8".into()))
}
