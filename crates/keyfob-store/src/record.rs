//! Per-client HOTP/TOTP configuration records.
//!
//! A [`ClientRecord`] captures one client/server pairing: the shared
//! secret, counter or time mode, and display preferences. Records are
//! constructed through [`ClientRecordParams`] (named optional fields with
//! documented defaults) so every record in memory satisfies the field
//! invariants, whether it came from a caller or from a decrypted file.
//!
//! # Wire Representation
//!
//! Records serialize as JSON objects with the fields `clientId`,
//! `counterFromTime`, `lastCount`, `lastCountUpdateTime`, `note`,
//! `passwordLength`, `period`, `sharedSecret`, `tags` — declared here in
//! sorted key order so the serialized document is deterministic.
//! Timestamps render as ISO-8601 basic with an explicit numeric UTC
//! offset, e.g. `20260807T141500+0000`, with the year zero-padded to at
//! least four digits.

use serde::{Deserialize, Serialize, Serializer};
use time::macros::datetime;
use time::OffsetDateTime;
use zeroize::Zeroizing;

use keyfob_crypto_core::{base32, otp};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the HOTP counter is obtained for a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OtpMode {
    /// Counter-based (RFC 4226): an event counter incremented per code.
    CounterBased,
    /// Time-based (RFC 6238): the counter is the current time step.
    #[default]
    TimeBased,
}

/// Construction parameters for a [`ClientRecord`].
///
/// Only `client_id` and `shared_secret` have no usable default; fill the
/// rest with `..Default::default()`.
#[derive(Clone, Debug)]
pub struct ClientRecordParams {
    /// Identifies the client/server combination, e.g. `"12345654321@ops"`.
    pub client_id: String,
    /// Shared secret as RFC 4648 Base32 text (trailing `=` optional).
    pub shared_secret: String,
    /// Counter-based or time-based; default time-based.
    pub mode: OtpMode,
    /// Counter of the most recent counter-based generation; default 0.
    pub last_count: u64,
    /// When `last_count` last changed; default is the minimum timestamp.
    pub last_count_update_time: OffsetDateTime,
    /// Time step in seconds for time-based records; default 30.
    pub period: u32,
    /// Digits per generated code, in [1, 10]; default 6.
    pub password_length: u8,
    /// Filter labels; empty strings are dropped.
    pub tags: Vec<String>,
    /// Free-form note text.
    pub note: String,
}

impl Default for ClientRecordParams {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            shared_secret: String::new(),
            mode: OtpMode::TimeBased,
            last_count: 0,
            last_count_update_time: min_update_time(),
            period: otp::DEFAULT_PERIOD,
            password_length: otp::DEFAULT_CODE_LENGTH,
            tags: Vec::new(),
            note: String::new(),
        }
    }
}

/// One HOTP/TOTP configuration.
///
/// Fields are declared in sorted wire-key order — keep it that way so the
/// serialized document stays deterministic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RecordFields")]
pub struct ClientRecord {
    client_id: String,
    #[serde(rename = "counterFromTime", serialize_with = "serialize_mode")]
    mode: OtpMode,
    last_count: u64,
    #[serde(with = "wire_time")]
    last_count_update_time: OffsetDateTime,
    note: String,
    password_length: u8,
    period: u32,
    shared_secret: String,
    tags: Vec<String>,
}

impl ClientRecord {
    /// Build a record, validating every field invariant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an empty client id or
    /// secret, a password length outside [1, 10], or a zero period, and
    /// a Base32 [`StoreError::Crypto`] error if the secret text does not
    /// decode.
    pub fn new(params: ClientRecordParams) -> Result<Self, StoreError> {
        if params.client_id.is_empty() {
            return Err(StoreError::Validation(
                "clientId must be a non-empty string".to_owned(),
            ));
        }
        if params.shared_secret.is_empty() {
            return Err(StoreError::Validation(
                "sharedSecret must be a non-empty string".to_owned(),
            ));
        }
        // Reject undecodable secrets at ingestion, not at first use.
        base32::decode(&params.shared_secret)?;
        if !(otp::MIN_CODE_LENGTH..=otp::MAX_CODE_LENGTH).contains(&params.password_length) {
            return Err(StoreError::Validation(format!(
                "passwordLength must be in [{}, {}], got {}",
                otp::MIN_CODE_LENGTH,
                otp::MAX_CODE_LENGTH,
                params.password_length
            )));
        }
        if params.period == 0 {
            return Err(StoreError::Validation(
                "period must be a positive integer".to_owned(),
            ));
        }

        let mut tags = params.tags;
        tags.retain(|tag| !tag.is_empty());

        Ok(Self {
            client_id: params.client_id,
            mode: params.mode,
            last_count: params.last_count,
            last_count_update_time: params.last_count_update_time,
            note: params.note,
            password_length: params.password_length,
            period: params.period,
            shared_secret: params.shared_secret,
            tags,
        })
    }

    /// The string identifying the client/server combination.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The shared secret as Base32 text.
    #[must_use]
    pub fn shared_secret(&self) -> &str {
        &self.shared_secret
    }

    /// Decode the shared secret to raw bytes (zeroized on drop).
    ///
    /// # Errors
    ///
    /// Returns a Base32 [`StoreError::Crypto`] error — unreachable for
    /// records built through [`ClientRecord::new`], which decodes once at
    /// ingestion.
    pub fn secret_bytes(&self) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        Ok(Zeroizing::new(base32::decode(&self.shared_secret)?))
    }

    /// Counter-based or time-based.
    #[must_use]
    pub const fn mode(&self) -> OtpMode {
        self.mode
    }

    /// Counter value of the most recent counter-based generation.
    #[must_use]
    pub const fn last_count(&self) -> u64 {
        self.last_count
    }

    /// When the counter last changed.
    #[must_use]
    pub const fn last_count_update_time(&self) -> OffsetDateTime {
        self.last_count_update_time
    }

    /// Time step in seconds (meaningful in time-based mode).
    #[must_use]
    pub const fn period(&self) -> u32 {
        self.period
    }

    /// Digits per generated code.
    #[must_use]
    pub const fn password_length(&self) -> u8 {
        self.password_length
    }

    /// Filter labels, in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Free-form note text.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Advance the counter by exactly one and stamp the update time.
    ///
    /// Returns the new counter value. Meaningful in counter-based mode.
    pub fn increment_count(&mut self, now: OffsetDateTime) -> u64 {
        // The counter is monotonically non-decreasing; saturate rather
        // than wrap at the (unreachable in practice) u64 ceiling.
        self.last_count = self.last_count.saturating_add(1);
        self.last_count_update_time = now;
        self.last_count
    }

    /// Change the record's identity, leaving everything else untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the new id is empty.
    pub fn rename(&mut self, new_client_id: String) -> Result<(), StoreError> {
        if new_client_id.is_empty() {
            return Err(StoreError::Validation(
                "clientId must be a non-empty string".to_owned(),
            ));
        }
        self.client_id = new_client_id;
        Ok(())
    }
}

/// Tag order is display-only: two records with the same tags in a
/// different order are equal.
impl PartialEq for ClientRecord {
    fn eq(&self, other: &Self) -> bool {
        let mut own_tags = self.tags.clone();
        let mut other_tags = other.tags.clone();
        own_tags.sort_unstable();
        other_tags.sort_unstable();

        self.client_id == other.client_id
            && self.mode == other.mode
            && self.last_count == other.last_count
            && self.last_count_update_time == other.last_count_update_time
            && self.note == other.note
            && self.password_length == other.password_length
            && self.period == other.period
            && self.shared_secret == other.shared_secret
            && own_tags == other_tags
    }
}

impl Eq for ClientRecord {}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// The minimum representable wire timestamp, 0001-01-01T00:00:00Z — the
/// default `lastCountUpdateTime` for records that never generated a
/// counter-based code.
#[must_use]
pub fn min_update_time() -> OffsetDateTime {
    datetime!(0001-01-01 00:00:00 UTC)
}

/// Raw deserialization mirror of [`ClientRecord`].
///
/// Carries the wire defaults; [`ClientRecord::try_from`] applies the
/// field validation, so a malformed file surfaces a typed error instead
/// of an invalid record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordFields {
    client_id: String,
    shared_secret: String,
    #[serde(default = "default_counter_from_time")]
    counter_from_time: bool,
    #[serde(default)]
    last_count: u64,
    #[serde(
        default = "min_update_time",
        deserialize_with = "wire_time::deserialize"
    )]
    last_count_update_time: OffsetDateTime,
    #[serde(default = "default_period")]
    period: u32,
    #[serde(default = "default_password_length")]
    password_length: u8,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    note: String,
}

const fn default_counter_from_time() -> bool {
    true
}

const fn default_period() -> u32 {
    otp::DEFAULT_PERIOD
}

const fn default_password_length() -> u8 {
    otp::DEFAULT_CODE_LENGTH
}

impl TryFrom<RecordFields> for ClientRecord {
    type Error = StoreError;

    fn try_from(fields: RecordFields) -> Result<Self, StoreError> {
        Self::new(ClientRecordParams {
            client_id: fields.client_id,
            shared_secret: fields.shared_secret,
            mode: if fields.counter_from_time {
                OtpMode::TimeBased
            } else {
                OtpMode::CounterBased
            },
            last_count: fields.last_count,
            last_count_update_time: fields.last_count_update_time,
            period: fields.period,
            password_length: fields.password_length,
            tags: fields.tags,
            note: fields.note,
        })
    }
}

/// Serialize [`OtpMode`] as the wire boolean `counterFromTime`
/// (`true` = the counter is derived from the current time).
fn serialize_mode<S: Serializer>(mode: &OtpMode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(matches!(mode, OtpMode::TimeBased))
}

/// ISO-8601 basic timestamps with a mandatory numeric UTC offset.
pub(crate) mod wire_time {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;
    use time::OffsetDateTime;

    /// `YYYYMMDDTHHMMSS±HHMM`, year zero-padded to at least 4 digits.
    pub(crate) const FORMAT: &'static [BorrowedFormatItem<'static>] = format_description!(
        "[year][month][day]T[hour][minute][second][offset_hour sign:mandatory][offset_minute]"
    );

    pub(crate) fn serialize<S: Serializer>(
        timestamp: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = timestamp.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, FORMAT).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_params() -> ClientRecordParams {
        ClientRecordParams {
            client_id: "12345654321@what.me.worry".to_owned(),
            shared_secret: "MZXW6YTBOI======".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn new_applies_documented_defaults() {
        let record = ClientRecord::new(minimal_params()).expect("record should build");
        assert_eq!(record.mode(), OtpMode::TimeBased);
        assert_eq!(record.last_count(), 0);
        assert_eq!(record.last_count_update_time(), min_update_time());
        assert_eq!(record.period(), 30);
        assert_eq!(record.password_length(), 6);
        assert!(record.tags().is_empty());
        assert_eq!(record.note(), "");
    }

    #[test]
    fn new_rejects_empty_client_id() {
        let params = ClientRecordParams {
            client_id: String::new(),
            ..minimal_params()
        };
        let result = ClientRecord::new(params);
        assert!(
            matches!(result, Err(StoreError::Validation(_))),
            "empty clientId should yield Validation, got {result:?}"
        );
    }

    #[test]
    fn new_rejects_empty_secret() {
        let params = ClientRecordParams {
            shared_secret: String::new(),
            ..minimal_params()
        };
        assert!(matches!(
            ClientRecord::new(params),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn new_rejects_undecodable_secret() {
        let params = ClientRecordParams {
            shared_secret: "not base32!".to_owned(),
            ..minimal_params()
        };
        let result = ClientRecord::new(params);
        assert!(
            matches!(result, Err(StoreError::Crypto(_))),
            "bad Base32 should yield the Encoding error, got {result:?}"
        );
    }

    #[test]
    fn new_enforces_password_length_bounds() {
        for (length, ok) in [(0u8, false), (1, true), (6, true), (10, true), (11, false)] {
            let params = ClientRecordParams {
                password_length: length,
                ..minimal_params()
            };
            assert_eq!(
                ClientRecord::new(params).is_ok(),
                ok,
                "passwordLength {length} acceptance mismatch"
            );
        }
    }

    #[test]
    fn new_rejects_zero_period() {
        let params = ClientRecordParams {
            period: 0,
            ..minimal_params()
        };
        assert!(matches!(
            ClientRecord::new(params),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn new_drops_empty_tags() {
        let params = ClientRecordParams {
            tags: vec![
                "work".to_owned(),
                String::new(),
                "aws".to_owned(),
            ],
            ..minimal_params()
        };
        let record = ClientRecord::new(params).expect("record should build");
        assert_eq!(record.tags(), ["work", "aws"]);
    }

    #[test]
    fn increment_count_bumps_by_one_and_stamps_time() {
        let mut record = ClientRecord::new(ClientRecordParams {
            mode: OtpMode::CounterBased,
            ..minimal_params()
        })
        .expect("record should build");

        let now = datetime!(2026-08-07 14:15:00 UTC);
        assert_eq!(record.increment_count(now), 1);
        assert_eq!(record.increment_count(now), 2);
        assert_eq!(record.last_count(), 2);
        assert_eq!(record.last_count_update_time(), now);
    }

    #[test]
    fn rename_changes_identity_only() {
        let mut record = ClientRecord::new(minimal_params()).expect("record should build");
        let secret_before = record.shared_secret().to_owned();
        record.rename("new@identity".to_owned()).expect("rename");
        assert_eq!(record.client_id(), "new@identity");
        assert_eq!(record.shared_secret(), secret_before);

        assert!(matches!(
            record.rename(String::new()),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn equality_ignores_tag_order() {
        let a = ClientRecord::new(ClientRecordParams {
            tags: vec!["work".to_owned(), "aws".to_owned()],
            ..minimal_params()
        })
        .expect("record a");
        let b = ClientRecord::new(ClientRecordParams {
            tags: vec!["aws".to_owned(), "work".to_owned()],
            ..minimal_params()
        })
        .expect("record b");
        assert_eq!(a, b);
        // Display order is still insertion order.
        assert_eq!(a.tags(), ["work", "aws"]);
        assert_eq!(b.tags(), ["aws", "work"]);
    }

    #[test]
    fn serializes_sorted_keys_and_wire_names() {
        let record = ClientRecord::new(minimal_params()).expect("record should build");
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            json,
            concat!(
                "{\"clientId\":\"12345654321@what.me.worry\",",
                "\"counterFromTime\":true,",
                "\"lastCount\":0,",
                "\"lastCountUpdateTime\":\"00010101T000000+0000\",",
                "\"note\":\"\",",
                "\"passwordLength\":6,",
                "\"period\":30,",
                "\"sharedSecret\":\"MZXW6YTBOI======\",",
                "\"tags\":[]}"
            )
        );
    }

    #[test]
    fn deserializes_with_wire_defaults() {
        let record: ClientRecord =
            serde_json::from_str(r#"{"clientId": "a@b", "sharedSecret": "MY======"}"#)
                .expect("deserialize");
        assert_eq!(record.client_id(), "a@b");
        assert_eq!(record.mode(), OtpMode::TimeBased);
        assert_eq!(record.period(), 30);
        assert_eq!(record.password_length(), 6);
        assert_eq!(record.last_count_update_time(), min_update_time());
    }

    #[test]
    fn deserialization_validates_fields() {
        let result: Result<ClientRecord, _> = serde_json::from_str(
            r#"{"clientId": "a@b", "sharedSecret": "MY======", "passwordLength": 11}"#,
        );
        assert!(result.is_err(), "out-of-range passwordLength must not parse");

        let result: Result<ClientRecord, _> =
            serde_json::from_str(r#"{"clientId": "", "sharedSecret": "MY======"}"#);
        assert!(result.is_err(), "empty clientId must not parse");
    }

    #[test]
    fn serde_roundtrip_preserves_all_fields() {
        let original = ClientRecord::new(ClientRecordParams {
            client_id: "gh@octo".to_owned(),
            shared_secret: "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".to_owned(),
            mode: OtpMode::CounterBased,
            last_count: 41,
            last_count_update_time: datetime!(2026-08-07 09:30:00 -05:00),
            period: 60,
            password_length: 8,
            tags: vec!["work".to_owned()],
            note: "rotate quarterly\nsecond line".to_owned(),
        })
        .expect("record should build");

        let json = serde_json::to_string(&original).expect("serialize");
        let recovered: ClientRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered, original);
    }

    #[test]
    fn wire_timestamp_keeps_the_utc_offset() {
        let record = ClientRecord::new(ClientRecordParams {
            last_count_update_time: datetime!(2026-08-07 09:30:00 -05:00),
            ..minimal_params()
        })
        .expect("record should build");
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(
            json.contains("\"20260807T093000-0500\""),
            "offset must serialize as ±HHMM: {json}"
        );
    }
}
