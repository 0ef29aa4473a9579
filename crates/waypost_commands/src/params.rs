//! # Parameter Codec
//!
//! Commands arrive as `key=value&key=value` lines, percent-encoded the way
//! HTML forms are, and results go back the same way. List-valued fields
//! (permission names, shape overrides, terrain heights) are CSV.
//!
//! An empty value reads the same as a missing key.

use crate::error::{CommandError, CommandResult, ErrorCode};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use url::form_urlencoded;

/// Flat result of a successful command.
pub type ResultMap = BTreeMap<String, String>;

/// Decoded command parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Decodes a form-encoded line. The first occurrence of a key wins.
    #[must_use]
    pub fn decode(line: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(line.trim().as_bytes()))
    }

    /// Builds parameters from key/value pairs. The first occurrence of a
    /// key wins.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            values
                .entry(key.as_ref().trim().to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }
        Self { values }
    }

    /// Value of `key`, if present and not blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Value of `key`, or `missing`.
    pub fn require(&self, key: &str, missing: ErrorCode) -> CommandResult<&str> {
        self.get(key).ok_or(CommandError::new(missing))
    }

    /// Parses `key`; absent or unparsable values give `default`.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Parses `key`, failing with `invalid` when absent or malformed.
    pub fn parse_required<T: FromStr>(&self, key: &str, invalid: ErrorCode) -> CommandResult<T> {
        self.get(key)
            .and_then(|value| value.trim().parse().ok())
            .ok_or(CommandError::new(invalid))
    }

    /// Reads a boolean (`true`/`false`, any case); anything else gives
    /// `default`.
    #[must_use]
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Splits a CSV-valued `key`; absent gives an empty list.
    pub fn list(&self, key: &str) -> CommandResult<Vec<String>> {
        self.get(key).map_or_else(|| Ok(Vec::new()), split_csv)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encodes pairs as one form-encoded line.
pub fn encode<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Splits one CSV record.
pub fn split_csv(text: &str) -> CommandResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(error)) => Err(CommandError::with_detail(
            ErrorCode::InvalidParameter,
            error.to_string(),
        )),
        None => Ok(Vec::new()),
    }
}

/// Joins values into one CSV record.
pub fn join_csv<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if let Err(error) = writer.write_record(values) {
        tracing::warn!(%error, "could not encode csv record");
        return String::new();
    }
    match writer.into_inner() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim_end().to_string(),
        Err(error) => {
            tracing::warn!(%error, "could not flush csv record");
            String::new()
        }
    }
}

/// Pairs up a flat `name,value,name,value` list.
#[must_use]
pub fn pairs(values: &[String]) -> Vec<(&str, &str)> {
    values
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_percent_and_plus() {
        let params = Params::decode("command=lure&message=come+over%21&group=My%20Group");
        assert_eq!(params.get("command"), Some("lure"));
        assert_eq!(params.get("message"), Some("come over!"));
        assert_eq!(params.get("group"), Some("My Group"));
    }

    #[test]
    fn test_first_key_wins_and_blank_is_missing() {
        let params = Params::decode("item=first&item=second&folder=");
        assert_eq!(params.get("item"), Some("first"));
        assert_eq!(params.get("folder"), None);
        assert_eq!(
            params.require("folder", ErrorCode::NoFolderSpecified),
            Err(CommandError::new(ErrorCode::NoFolderSpecified))
        );
    }

    #[test]
    fn test_typed_getters() {
        let params = Params::decode("range=12.5&uniform=FALSE&scale=%3C1,2,3%3E&bogus=x");
        assert_eq!(params.parse_or("range", 64.0_f32), 12.5);
        assert_eq!(params.parse_or("bogus", 64.0_f32), 64.0);
        assert!(!params.flag("uniform", true));
        assert!(params.flag("missing", true));
        let scale: waypost_core::Vector3 = params
            .parse_required("scale", ErrorCode::InvalidScale)
            .unwrap();
        assert_eq!(scale, waypost_core::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(
            params
                .parse_required::<waypost_core::Vector3>("bogus", ErrorCode::InvalidScale)
                .unwrap_err()
                .code(),
            ErrorCode::InvalidScale
        );
    }

    #[test]
    fn test_csv_helpers() {
        assert_eq!(split_csv("copy, transfer ,\"a,b\"").unwrap(), ["copy", "transfer", "a,b"]);
        assert_eq!(join_csv(["item", "a,b", "asset"]), "item,\"a,b\",asset");
        let flat = split_csv("pathcurve,circle,profilehollow,0.5").unwrap();
        assert_eq!(
            pairs(&flat),
            [("pathcurve", "circle"), ("profilehollow", "0.5")]
        );
    }

    #[test]
    fn test_encode_escapes() {
        assert_eq!(
            encode([("success", "False"), ("detail", "a&b c")]),
            "success=False&detail=a%26b+c"
        );
    }
}
