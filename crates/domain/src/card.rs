//! Card and version records, and the reshaping from the reader service's
//! wire format into them.
//!
//! The wire uses `snake_case` keys and epoch-millisecond timestamps. Domain
//! records serialize with `camelCase` keys and carry real points in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Version
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /version: the service's self-reported version, passed through as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub major: i64,
    pub minor: i64,
    pub patch: i64,
    #[serde(default)]
    pub pre: String,
    #[serde(default)]
    pub text: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cards
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => f.write_str("M"),
            Sex::Female => f.write_str("F"),
        }
    }
}

/// One card as sent by the reader service (GET / and every live push).
///
/// `birth_date` and `issue_date` are the service's preformatted strings;
/// the domain record is built from the `*_timestamp` fields instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCard {
    pub reader_name: String,
    pub card_no: String,
    pub full_name: String,
    pub id_no: String,
    #[serde(default)]
    pub birth_date: String,
    pub birth_date_timestamp: i64,
    pub sex: Sex,
    #[serde(default)]
    pub issue_date: String,
    pub issue_date_timestamp: i64,
}

/// A card currently inserted in one of the service's readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub reader_name: String,
    pub card_no: String,
    pub full_name: String,
    pub id_no: String,
    pub birthday: DateTime<Utc>,
    pub sex: Sex,
    pub issue_date: DateTime<Utc>,
}

impl TryFrom<WireCard> for CardRecord {
    type Error = Error;

    fn try_from(wire: WireCard) -> Result<Self> {
        Ok(Self {
            birthday: from_epoch_millis("birth_date_timestamp", wire.birth_date_timestamp)?,
            issue_date: from_epoch_millis("issue_date_timestamp", wire.issue_date_timestamp)?,
            reader_name: wire.reader_name,
            card_no: wire.card_no,
            full_name: wire.full_name,
            id_no: wire.id_no,
            sex: wire.sex,
        })
    }
}

/// Reshape a wire card list into domain records, keeping wire order.
pub fn reshape_cards(wire: Vec<WireCard>) -> Result<Vec<CardRecord>> {
    wire.into_iter().map(CardRecord::try_from).collect()
}

/// Parse a raw JSON payload (HTTP body or live push) as a card list.
pub fn decode_card_list(text: &str) -> Result<Vec<CardRecord>> {
    let wire: Vec<WireCard> = serde_json::from_str(text)
        .map_err(|e| Error::Decode(format!("card list: {e}")))?;
    reshape_cards(wire)
}

fn from_epoch_millis(field: &str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::Decode(format!("{field} out of range: {ms}")))
}
