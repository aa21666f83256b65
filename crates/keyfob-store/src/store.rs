//! Encrypted record store — load, save, verify, and collection ops.
//!
//! A [`RecordStore`] owns the in-memory record collection and the active
//! key material. Keys are stretched once at construction (deliberately
//! slow, see `keyfob_crypto_core::kdf`) and reused for every file
//! operation until a passphrase rotation replaces them.
//!
//! # File Layout
//!
//! ```text
//! [16-byte cleartext header][AES-256-CBC ciphertext of: header copy ‖ JSON array]
//! ```
//!
//! `save` rewrites the whole file in place; there is no file lock and no
//! atomic rename, so two processes saving the same path race and the
//! last writer wins. Single-process ownership of the file is assumed.

use std::fs;
use std::path::Path;

use time::OffsetDateTime;
use zeroize::{Zeroize, Zeroizing};

use keyfob_crypto_core::{cipher, format, kdf, otp, CryptoError};

use crate::error::StoreError;
use crate::record::{ClientRecord, OtpMode, RecordFields};

/// Smallest structurally possible store file: cleartext header plus one
/// ciphertext block (the encrypted header copy).
const MIN_STORE_FILE_LEN: usize = format::HEADER_LEN + cipher::BLOCK_LEN;

/// A generated one-time passcode plus the state the caller needs to
/// display or persist alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratedCode {
    /// Counter-based code and the (already incremented) counter value it
    /// was generated for.
    Hotp {
        /// The passcode digits.
        code: String,
        /// The counter value used for this code.
        count: u64,
    },
    /// Time-based code and how long it remains valid.
    Totp {
        /// The passcode digits.
        code: String,
        /// Seconds until the current time step rolls over.
        valid_for: u64,
    },
}

/// Owns the record collection and the passphrase-derived key material.
pub struct RecordStore {
    key: Zeroizing<[u8; kdf::KEY_LEN]>,
    iv: [u8; kdf::IV_LEN],
    stretch_count: u32,
    records: Vec<ClientRecord>,
}

impl RecordStore {
    /// Create a store keyed by `passphrase` at the default stretch count.
    ///
    /// Runs the full stretch loop; expect a noticeable pause.
    #[must_use]
    pub fn new(passphrase: &str) -> Self {
        Self::with_stretch_count(passphrase, kdf::DEFAULT_STRETCH_COUNT)
    }

    /// Create a store keyed by `passphrase` with an explicit stretch
    /// count — for opening files written at a non-default cost factor
    /// (see [`Self::stored_stretch_count`]) and for fast tests.
    #[must_use]
    pub fn with_stretch_count(passphrase: &str, stretch_count: u32) -> Self {
        let key = kdf::derive_key(passphrase, stretch_count);
        let iv = kdf::derive_iv(&key);
        Self {
            key,
            iv,
            stretch_count,
            records: Vec::new(),
        }
    }

    /// Read the stretch count recorded in a store file's cleartext
    /// header, without deriving any key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for filesystem failures and a
    /// corruption error if the file is too short to carry a header.
    pub fn stored_stretch_count(path: &Path) -> Result<u32, StoreError> {
        let data = fs::read(path)?;
        let header = cleartext_header(&data)?;
        Ok(format::parse_stretch_count(&header))
    }

    /// The stretch count this store writes into saved headers.
    #[must_use]
    pub const fn stretch_count(&self) -> u32 {
        self.stretch_count
    }

    /// Probe whether this store's passphrase opens the file, decrypting
    /// only the first ciphertext block.
    ///
    /// A wrong passphrase (or wrong stretch count) returns `Ok(false)`
    /// rather than an error, so an interactive caller can re-prompt.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for filesystem failures and a
    /// [`CryptoError::FileCorruption`] error if the magic decrypts
    /// correctly but the header copies disagree.
    pub fn open_and_verify(&self, path: &Path) -> Result<bool, StoreError> {
        let data = fs::read(path)?;
        if data.len() < MIN_STORE_FILE_LEN {
            return Err(too_short(data.len()));
        }

        let cleartext = cleartext_header(&data)?;
        let mut probe = cipher::decrypt(
            &self.key,
            &self.iv,
            &data[format::HEADER_LEN..MIN_STORE_FILE_LEN],
            false,
        )?;
        let mut decrypted = [0u8; format::HEADER_LEN];
        decrypted.copy_from_slice(&probe[..format::HEADER_LEN]);
        probe.zeroize();

        match format::validate_header(&cleartext, &decrypted) {
            Ok(()) => Ok(true),
            Err(CryptoError::Decryption) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Load the record collection from an encrypted file, replacing the
    /// in-memory collection.
    ///
    /// An empty (or `null`) decrypted payload yields an empty collection,
    /// never an error.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Decryption`] for a wrong passphrase,
    /// [`CryptoError::FileCorruption`] for a tampered file,
    /// [`StoreError::Format`]/[`StoreError::Validation`] for a payload
    /// that decrypts but does not parse, and [`StoreError::Io`] for
    /// filesystem failures.
    pub fn load(&mut self, path: &Path) -> Result<&[ClientRecord], StoreError> {
        let data = fs::read(path)?;
        if data.len() < MIN_STORE_FILE_LEN {
            return Err(too_short(data.len()));
        }

        let cleartext = cleartext_header(&data)?;
        let mut plaintext = cipher::decrypt(&self.key, &self.iv, &data[format::HEADER_LEN..], true)?;

        let outcome = decode_payload(&cleartext, &plaintext);
        plaintext.zeroize();

        self.records = outcome?;
        Ok(&self.records)
    }

    /// Serialize the collection to deterministic JSON, encrypt it, and
    /// write `[cleartext header][ciphertext]` to `path`, overwriting any
    /// existing file.
    ///
    /// Supplying `new_passphrase` rotates the store key: the new key/IV
    /// are derived first (at this store's stretch count), the file is
    /// written under them, and they remain active for subsequent
    /// operations on this store.
    ///
    /// The write is not atomic against concurrent writers or a crash
    /// mid-write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Format`] if serialization fails and
    /// [`StoreError::Io`] for filesystem failures.
    pub fn save(&mut self, path: &Path, new_passphrase: Option<&str>) -> Result<(), StoreError> {
        let mut payload = render_records(&self.records)?;
        let header = format::build_header(self.stretch_count);

        if let Some(passphrase) = new_passphrase {
            self.rekey(passphrase);
        }

        let mut plaintext = Vec::with_capacity(format::HEADER_LEN.saturating_add(payload.len()));
        plaintext.extend_from_slice(&header);
        plaintext.extend_from_slice(&payload);
        payload.zeroize();

        let ciphertext = cipher::encrypt(&self.key, &self.iv, &plaintext);
        plaintext.zeroize();

        let mut out = Vec::with_capacity(format::HEADER_LEN.saturating_add(ciphertext.len()));
        out.extend_from_slice(&header);
        out.extend_from_slice(&ciphertext);
        fs::write(path, &out)?;
        Ok(())
    }

    // ── Collection operations ───────────────────────────────────────

    /// The current in-memory collection, in file order.
    #[must_use]
    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    /// Look up a record by client id.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<&ClientRecord> {
        self.records.iter().find(|r| r.client_id() == client_id)
    }

    /// Add a record to the collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateClientId`] if a record with the
    /// same client id already exists.
    pub fn add(&mut self, record: ClientRecord) -> Result<(), StoreError> {
        if self.get(record.client_id()).is_some() {
            return Err(StoreError::DuplicateClientId(record.client_id().to_owned()));
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove and return the record with the given client id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no record matches.
    pub fn delete(&mut self, client_id: &str) -> Result<ClientRecord, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.client_id() == client_id)
            .ok_or_else(|| StoreError::RecordNotFound(client_id.to_owned()))?;
        Ok(self.records.remove(index))
    }

    /// Change a record's client id, preserving uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no record matches,
    /// [`StoreError::DuplicateClientId`] if the new id is taken, and
    /// [`StoreError::Validation`] if the new id is empty.
    pub fn rename(&mut self, client_id: &str, new_client_id: &str) -> Result<(), StoreError> {
        if new_client_id != client_id && self.get(new_client_id).is_some() {
            return Err(StoreError::DuplicateClientId(new_client_id.to_owned()));
        }
        let record = self
            .records
            .iter_mut()
            .find(|r| r.client_id() == client_id)
            .ok_or_else(|| StoreError::RecordNotFound(client_id.to_owned()))?;
        record.rename(new_client_id.to_owned())
    }

    /// Generate a passcode for the record with the given client id.
    ///
    /// For a counter-based record the counter is incremented first and
    /// the code is generated for the new value — call [`Self::save`]
    /// afterwards to persist the advanced counter. `now` supplies both
    /// the TOTP instant and the counter-update timestamp, so callers can
    /// generate against a fixed clock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no record matches,
    /// [`StoreError::Validation`] if `now` precedes the Unix epoch, and
    /// OTP errors from the codec.
    pub fn generate_code(
        &mut self,
        client_id: &str,
        now: OffsetDateTime,
    ) -> Result<GeneratedCode, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.client_id() == client_id)
            .ok_or_else(|| StoreError::RecordNotFound(client_id.to_owned()))?;
        let secret = record.secret_bytes()?;

        match record.mode() {
            OtpMode::TimeBased => {
                let now_unix = u64::try_from(now.unix_timestamp()).map_err(|_| {
                    StoreError::Validation("current time precedes the Unix epoch".to_owned())
                })?;
                let (code, valid_for) = otp::generate_from_time(
                    &secret,
                    record.password_length(),
                    record.period(),
                    now_unix,
                )?;
                Ok(GeneratedCode::Totp { code, valid_for })
            }
            OtpMode::CounterBased => {
                let count = record.increment_count(now);
                let code =
                    otp::generate_from_counter(&secret, count, record.password_length())?;
                Ok(GeneratedCode::Hotp { code, count })
            }
        }
    }

    /// Derive a fresh key/IV pair and make them the active ones.
    fn rekey(&mut self, passphrase: &str) {
        self.key = kdf::derive_key(passphrase, self.stretch_count);
        self.iv = kdf::derive_iv(&self.key);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn too_short(len: usize) -> StoreError {
    CryptoError::FileCorruption(format!(
        "store file too short: {len} bytes (minimum {MIN_STORE_FILE_LEN})"
    ))
    .into()
}

/// Copy the cleartext header out of the raw file bytes.
fn cleartext_header(data: &[u8]) -> Result<[u8; format::HEADER_LEN], StoreError> {
    if data.len() < format::HEADER_LEN {
        return Err(too_short(data.len()));
    }
    let mut header = [0u8; format::HEADER_LEN];
    header.copy_from_slice(&data[..format::HEADER_LEN]);
    Ok(header)
}

/// Validate the decrypted header and parse the JSON payload behind it.
fn decode_payload(
    cleartext: &[u8; format::HEADER_LEN],
    plaintext: &[u8],
) -> Result<Vec<ClientRecord>, StoreError> {
    if plaintext.len() < format::HEADER_LEN {
        // Only reachable when decryption produced garbage.
        return Err(CryptoError::Decryption.into());
    }
    let mut decrypted = [0u8; format::HEADER_LEN];
    decrypted.copy_from_slice(&plaintext[..format::HEADER_LEN]);
    format::validate_header(cleartext, &decrypted)?;

    let payload = std::str::from_utf8(&plaintext[format::HEADER_LEN..]).map_err(|_| {
        StoreError::Format("decrypted payload is not valid UTF-8".to_owned())
    })?;
    parse_records(payload)
}

/// Parse the decrypted JSON payload into records.
fn parse_records(payload: &str) -> Result<Vec<ClientRecord>, StoreError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let fields: Vec<RecordFields> = serde_json::from_str(trimmed)
        .map_err(|e| StoreError::Format(format!("payload is not a JSON record array: {e}")))?;
    fields.into_iter().map(ClientRecord::try_from).collect()
}

/// Render the collection as deterministic JSON: sorted keys (by struct
/// declaration), 4-space indent.
fn render_records(records: &[ClientRecord]) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(&records, &mut serializer)
        .map_err(|e| StoreError::Format(format!("record serialization failed: {e}")))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
