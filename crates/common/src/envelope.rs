//! Decoding of the uniform response envelope.
//!
//! Every successful response has the shape
//! `{"Response": [{"<Tag>": {...}}, {"<Tag>": {...}}, ...]}`. Lookups scan the
//! entries in order and match on the single key of each entry. A missing tag
//! is not an error: the server leaves out companion objects that do not apply
//! (for example `UserCompany` when the user is a person).

use error_stack::Report;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BunqError;

const RESPONSE_KEY: &str = "Response";
const ERROR_KEY: &str = "Error";

fn malformed(message: impl Into<String>) -> Report<BunqError> {
    Report::new(BunqError::MalformedEnvelope {
        message: message.into(),
    })
}

/// A parsed, ordered response envelope.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    entries: Vec<(String, Value)>,
}

impl ResponseEnvelope {
    /// # Errors
    ///
    /// Returns [`BunqError::MalformedEnvelope`] if `bytes` is not JSON, lacks a
    /// `Response` array, or holds an entry that is not a single-key object.
    pub fn parse(bytes: &[u8]) -> Result<Self, Report<BunqError>> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| malformed(format!("response is not valid JSON: {e}")))?;

        let Value::Object(mut root) = document else {
            return Err(malformed("response root is not an object"));
        };
        let items = match root.remove(RESPONSE_KEY) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(malformed("'Response' is not an array")),
            None => return Err(malformed("missing 'Response' key")),
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| single_entry(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags in envelope order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(tag, _)| tag.as_str())
    }

    /// Decode the first entry tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::MalformedEnvelope`] if the matched value does not
    /// deserialize into `T`.
    pub fn decode_one<T: DeserializeOwned>(&self, tag: &str) -> Result<Option<T>, Report<BunqError>> {
        self.matching(tag)
            .next()
            .map(|value| decode_value(tag, value))
            .transpose()
    }

    /// Decode every entry tagged `tag`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::MalformedEnvelope`] if any matched value does not
    /// deserialize into `T`.
    pub fn decode_many<T: DeserializeOwned>(&self, tag: &str) -> Result<Vec<T>, Report<BunqError>> {
        self.matching(tag)
            .map(|value| decode_value(tag, value))
            .collect()
    }

    /// Look up three tags independently.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::MalformedEnvelope`] if any matched value does not
    /// deserialize into its target type.
    #[allow(clippy::type_complexity)]
    pub fn decode_triplet<T1, T2, T3>(
        &self,
        tag1: &str,
        tag2: &str,
        tag3: &str,
    ) -> Result<(Option<T1>, Option<T2>, Option<T3>), Report<BunqError>>
    where
        T1: DeserializeOwned,
        T2: DeserializeOwned,
        T3: DeserializeOwned,
    {
        Ok((
            self.decode_one(tag1)?,
            self.decode_one(tag2)?,
            self.decode_one(tag3)?,
        ))
    }

    fn matching<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entries
            .iter()
            .filter(move |(entry_tag, _)| entry_tag == tag)
            .map(|(_, value)| value)
    }
}

fn single_entry(index: usize, item: Value) -> Result<(String, Value), Report<BunqError>> {
    let Value::Object(object) = item else {
        return Err(malformed(format!("entry {index} is not an object")));
    };
    if object.len() != 1 {
        return Err(malformed(format!(
            "entry {index} has {} keys, expected exactly one",
            object.len()
        )));
    }
    object
        .into_iter()
        .next()
        .ok_or_else(|| malformed(format!("entry {index} is empty")))
}

fn decode_value<T: DeserializeOwned>(tag: &str, value: &Value) -> Result<T, Report<BunqError>> {
    T::deserialize(value).map_err(|e| malformed(format!("cannot decode '{tag}' entry: {e}")))
}

/// Decode the first entry tagged `tag` from raw response bytes.
///
/// # Errors
///
/// See [`ResponseEnvelope::parse`] and [`ResponseEnvelope::decode_one`].
pub fn decode_one<T: DeserializeOwned>(bytes: &[u8], tag: &str) -> Result<Option<T>, Report<BunqError>> {
    ResponseEnvelope::parse(bytes)?.decode_one(tag)
}

/// Decode every entry tagged `tag` from raw response bytes.
///
/// # Errors
///
/// See [`ResponseEnvelope::parse`] and [`ResponseEnvelope::decode_many`].
pub fn decode_many<T: DeserializeOwned>(bytes: &[u8], tag: &str) -> Result<Vec<T>, Report<BunqError>> {
    ResponseEnvelope::parse(bytes)?.decode_many(tag)
}

/// Look up three tags in raw response bytes with a single parse.
///
/// # Errors
///
/// See [`ResponseEnvelope::parse`] and [`ResponseEnvelope::decode_triplet`].
#[allow(clippy::type_complexity)]
pub fn decode_triplet<T1, T2, T3>(
    bytes: &[u8],
    tag1: &str,
    tag2: &str,
    tag3: &str,
) -> Result<(Option<T1>, Option<T2>, Option<T3>), Report<BunqError>>
where
    T1: DeserializeOwned,
    T2: DeserializeOwned,
    T3: DeserializeOwned,
{
    ResponseEnvelope::parse(bytes)?.decode_triplet(tag1, tag2, tag3)
}

/// Human-readable detail from a server error payload.
///
/// Error responses look like `{"Error": [{"error_description": "..."}]}`;
/// anything else is returned as-is.
#[must_use]
pub fn error_detail(body: &str) -> String {
    let descriptions: Option<Vec<String>> = serde_json::from_str::<Map<String, Value>>(body)
        .ok()
        .and_then(|mut root| match root.remove(ERROR_KEY) {
            Some(Value::Array(errors)) => Some(errors),
            _ => None,
        })
        .map(|errors| {
            errors
                .iter()
                .filter_map(|error| error.get("error_description"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

    match descriptions {
        Some(descriptions) if !descriptions.is_empty() => descriptions.join("; "),
        _ => body.trim().to_string(),
    }
}
