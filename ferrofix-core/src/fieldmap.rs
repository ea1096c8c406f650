/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Ordered field collections with repeating-group support.
//!
//! This module provides:
//! - [`Field`]: a tag/value pair with cached wire totals
//! - [`FieldMap`]: an insertion-ordered map of fields plus nested
//!   repeating groups
//! - [`FieldOrder`]: traversal-order schema for header and trailer maps

use crate::convert::{
    self, UtcDate, UtcTime, UtcTimestamp,
};
use crate::error::{ConvertError, DecodeError};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::str::FromStr;

/// SOH field separator.
pub const SOH: u8 = 0x01;

/// A single FIX field: a positive tag and its raw value bytes.
///
/// Two totals are cached at construction for incremental message
/// assembly: the encoded byte length of `tag=value<SOH>` (BodyLength
/// input) and the byte sum of the same bytes (CheckSum input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    tag: u32,
    value: Vec<u8>,
    encoded_len: u32,
    byte_sum: u32,
}

impl Field {
    /// Creates a field, computing the cached wire totals.
    #[must_use]
    pub fn new(tag: u32, value: impl Into<Vec<u8>>) -> Self {
        let value = value.into();
        let mut len = 2 + value.len() as u32; // '=' and SOH
        let mut sum = u32::from(b'=') + u32::from(SOH);
        let mut t = tag;
        loop {
            len += 1;
            sum += u32::from(b'0') + t % 10;
            t /= 10;
            if t == 0 {
                break;
            }
        }
        for &b in &value {
            sum += u32::from(b);
        }
        Self {
            tag,
            value,
            encoded_len: len,
            byte_sum: sum,
        }
    }

    /// Creates a field from a string value.
    #[must_use]
    pub fn from_str_value(tag: u32, value: &str) -> Self {
        Self::new(tag, value.as_bytes().to_vec())
    }

    /// The field tag.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    /// The raw value bytes, without `=` or SOH.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The value as a string slice.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidUtf8` if the value is not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, DecodeError> {
        std::str::from_utf8(&self.value).map_err(DecodeError::from)
    }

    /// Encoded byte length of `tag=value<SOH>`.
    #[inline]
    #[must_use]
    pub const fn encoded_len(&self) -> u32 {
        self.encoded_len
    }

    /// Byte sum of `tag=value<SOH>`, the field's checksum contribution.
    #[inline]
    #[must_use]
    pub const fn byte_sum(&self) -> u32 {
        self.byte_sum
    }
}

/// Traversal-order schema for a [`FieldMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    /// Pure insertion order.
    #[default]
    Insertion,
    /// Header order: `BeginString (8)`, `BodyLength (9)`, `MsgType (35)`
    /// first, remaining fields in insertion order.
    Header,
    /// Trailer order: `CheckSum (10)` last.
    Trailer,
}

impl FieldOrder {
    /// Sort priority of a tag under this schema; ties keep insertion
    /// order.
    fn priority(self, tag: u32) -> u8 {
        match self {
            Self::Insertion => 1,
            Self::Header => match tag {
                8 => 0,
                9 => 1,
                35 => 2,
                _ => 3,
            },
            Self::Trailer => match tag {
                10 => 2,
                _ => 1,
            },
        }
    }
}

/// Insertion-ordered collection of fields and repeating groups.
///
/// The same tag appears at most once per nesting level; a second set
/// replaces the prior value in place. Groups are keyed by their count
/// tag and iterate in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    fields: Vec<Field>,
    groups: Vec<(u32, Vec<FieldMap>)>,
    order: FieldOrder,
}

impl FieldMap {
    /// Creates an empty map with insertion traversal order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with the given traversal-order schema.
    #[must_use]
    pub fn with_order(order: FieldOrder) -> Self {
        Self {
            fields: Vec::new(),
            groups: Vec::new(),
            order,
        }
    }

    /// Sets a field, replacing any prior value for the tag in place.
    pub fn set_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.tag == field.tag) {
            Some(slot) => *slot = field,
            None => self.fields.push(field),
        }
    }

    /// Sets a field from a string value.
    pub fn set_str(&mut self, tag: u32, value: &str) {
        self.set_field(Field::from_str_value(tag, value));
    }

    /// Sets a field from an unsigned integer value.
    pub fn set_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a field from a signed integer value.
    pub fn set_int(&mut self, tag: u32, value: i64) {
        let mut buf = itoa::Buffer::new();
        self.set_str(tag, buf.format(value));
    }

    /// Sets a boolean field as `Y`/`N`.
    pub fn set_bool(&mut self, tag: u32, value: bool) {
        self.set_field(Field::new(tag, convert::emit_bool(value).to_vec()));
    }

    /// Sets a UTC timestamp field.
    pub fn set_utc_timestamp(&mut self, tag: u32, value: UtcTimestamp) {
        self.set_str(tag, value.format().as_str());
    }

    /// Removes a field; returns it when present.
    pub fn remove_field(&mut self, tag: u32) -> Option<Field> {
        let idx = self.fields.iter().position(|f| f.tag == tag)?;
        Some(self.fields.remove(idx))
    }

    /// Looks up a field by tag.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// True when the tag is present at this level.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.get_field(tag).is_some()
    }

    /// The value of a field as a string slice.
    #[must_use]
    pub fn get_str(&self, tag: u32) -> Option<&str> {
        self.get_field(tag).and_then(|f| f.as_str().ok())
    }

    /// Typed access helper: looks the field up and converts it,
    /// attributing conversion failures to the tag.
    fn get_typed<T>(
        &self,
        tag: u32,
        parse: impl Fn(&[u8]) -> Result<T, ConvertError>,
    ) -> Result<T, DecodeError> {
        let field = self
            .get_field(tag)
            .ok_or(DecodeError::FieldNotFound { tag })?;
        parse(field.value()).map_err(|source| DecodeError::Convert { tag, source })
    }

    /// The value of a field as a signed integer.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_int(&self, tag: u32) -> Result<i64, DecodeError> {
        self.get_typed(tag, convert::parse_int)
    }

    /// The value of a field as a sequence number / positive integer.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_uint(&self, tag: u32) -> Result<u64, DecodeError> {
        self.get_typed(tag, convert::parse_positive_int)
    }

    /// The value of a field as a boolean.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_bool(&self, tag: u32) -> Result<bool, DecodeError> {
        self.get_typed(tag, convert::parse_bool)
    }

    /// The value of a field as a char.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_char(&self, tag: u32) -> Result<char, DecodeError> {
        self.get_typed(tag, convert::parse_char)
    }

    /// The value of a field as a double.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_double(&self, tag: u32) -> Result<f64, DecodeError> {
        self.get_typed(tag, convert::parse_double)
    }

    /// The value of a field as an exact decimal.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_decimal(&self, tag: u32) -> Result<Decimal, DecodeError> {
        let field = self
            .get_field(tag)
            .ok_or(DecodeError::FieldNotFound { tag })?;
        let s = field.as_str()?;
        Decimal::from_str(s).map_err(|_| DecodeError::Convert {
            tag,
            source: ConvertError::new(crate::error::ConvertKind::BadFormat, 0..s.len()),
        })
    }

    /// The value of a field as a UTC timestamp.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_utc_timestamp(&self, tag: u32) -> Result<UtcTimestamp, DecodeError> {
        self.get_typed(tag, convert::parse_utc_timestamp)
    }

    /// The value of a field as a UTC date.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_utc_date(&self, tag: u32) -> Result<UtcDate, DecodeError> {
        self.get_typed(tag, convert::parse_utc_date)
    }

    /// The value of a field as a UTC time of day.
    ///
    /// # Errors
    /// Returns `FieldNotFound` or a `Convert` error.
    pub fn get_utc_time(&self, tag: u32) -> Result<UtcTime, DecodeError> {
        self.get_typed(tag, convert::parse_utc_time)
    }

    /// Appends a repeating-group entry under `count_tag` and keeps the
    /// count field in sync with the number of entries.
    pub fn add_group(&mut self, count_tag: u32, entry: FieldMap) {
        let n = match self.groups.iter_mut().find(|(t, _)| *t == count_tag) {
            Some((_, entries)) => {
                entries.push(entry);
                entries.len()
            }
            None => {
                self.groups.push((count_tag, vec![entry]));
                1
            }
        };
        self.set_uint(count_tag, n as u64);
    }

    /// The entries of a repeating group, in insertion order.
    #[must_use]
    pub fn groups(&self, count_tag: u32) -> Option<&[FieldMap]> {
        self.groups
            .iter()
            .find(|(t, _)| *t == count_tag)
            .map(|(_, entries)| entries.as_slice())
    }

    /// True when the tag keys a repeating group at this level.
    #[must_use]
    pub fn has_group(&self, count_tag: u32) -> bool {
        self.groups.iter().any(|(t, _)| *t == count_tag)
    }

    /// Iterates over group count tags in insertion order.
    pub fn group_tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.iter().map(|(t, _)| *t)
    }

    /// Iterates over fields in traversal order (the ordering schema
    /// first, then insertion order).
    pub fn ordered_fields(&self) -> impl Iterator<Item = &Field> {
        let order = self.order;
        let mut indexed: SmallVec<[(u8, usize); 16]> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (order.priority(f.tag), i))
            .collect();
        indexed.sort_by_key(|&(p, i)| (p, i));
        indexed.into_iter().map(move |(_, i)| &self.fields[i])
    }

    /// Iterates over fields in raw insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Number of fields at this level (group entries not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the map holds no fields and no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    /// Total encoded byte length of this map: every field plus every
    /// group entry, recursively.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let fields: usize = self.fields.iter().map(|f| f.encoded_len as usize).sum();
        let groups: usize = self
            .groups
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .map(FieldMap::encoded_len)
            .sum();
        fields + groups
    }

    /// Total byte sum of this map, recursively.
    #[must_use]
    pub fn byte_sum(&self) -> u32 {
        let fields: u32 = self.fields.iter().map(Field::byte_sum).sum();
        let groups: u32 = self
            .groups
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .map(FieldMap::byte_sum)
            .sum();
        fields.wrapping_add(groups)
    }

    /// Clears all fields and groups.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_cached_totals() {
        // "35=D\x01" is 5 bytes
        let f = Field::from_str_value(35, "D");
        assert_eq!(f.encoded_len(), 5);
        let expected: u32 = b"35=D\x01".iter().map(|&b| u32::from(b)).sum();
        assert_eq!(f.byte_sum(), expected);
    }

    #[test]
    fn test_field_cached_totals_multidigit_tag() {
        let f = Field::from_str_value(108, "30");
        assert_eq!(f.encoded_len(), b"108=30\x01".len() as u32);
        let expected: u32 = b"108=30\x01".iter().map(|&b| u32::from(b)).sum();
        assert_eq!(f.byte_sum(), expected);
    }

    #[test]
    fn test_set_field_replaces_in_place() {
        let mut map = FieldMap::new();
        map.set_str(55, "MSFT");
        map.set_str(54, "1");
        map.set_str(55, "AAPL");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_str(55), Some("AAPL"));
        // replacement keeps the original position
        let tags: Vec<u32> = map.fields().map(Field::tag).collect();
        assert_eq!(tags, vec![55, 54]);
    }

    #[test]
    fn test_typed_getters() {
        let mut map = FieldMap::new();
        map.set_int(34, 7);
        map.set_bool(43, true);
        map.set_str(44, "15.25");
        map.set_str(52, "20240101-00:00:00");

        assert_eq!(map.get_int(34).unwrap(), 7);
        assert_eq!(map.get_uint(34).unwrap(), 7);
        assert!(map.get_bool(43).unwrap());
        assert_eq!(map.get_double(44).unwrap(), 15.25);
        assert_eq!(map.get_decimal(44).unwrap().to_string(), "15.25");
        assert_eq!(map.get_utc_timestamp(52).unwrap().date.year, 2024);
    }

    #[test]
    fn test_typed_getter_errors() {
        let mut map = FieldMap::new();
        map.set_str(34, "abc");

        assert!(matches!(
            map.get_int(99),
            Err(DecodeError::FieldNotFound { tag: 99 })
        ));
        assert!(matches!(
            map.get_int(34),
            Err(DecodeError::Convert { tag: 34, .. })
        ));
    }

    #[test]
    fn test_header_order() {
        let mut map = FieldMap::with_order(FieldOrder::Header);
        map.set_str(49, "SENDER");
        map.set_str(35, "A");
        map.set_str(8, "FIX.4.2");
        map.set_str(56, "TARGET");
        map.set_str(9, "100");

        let tags: Vec<u32> = map.ordered_fields().map(Field::tag).collect();
        assert_eq!(tags, vec![8, 9, 35, 49, 56]);
    }

    #[test]
    fn test_trailer_order() {
        let mut map = FieldMap::with_order(FieldOrder::Trailer);
        map.set_str(10, "123");
        map.set_str(89, "SIG");

        let tags: Vec<u32> = map.ordered_fields().map(Field::tag).collect();
        assert_eq!(tags, vec![89, 10]);
    }

    #[test]
    fn test_groups_keep_insertion_order_and_count() {
        let mut map = FieldMap::new();
        let mut e1 = FieldMap::new();
        e1.set_str(269, "0");
        let mut e2 = FieldMap::new();
        e2.set_str(269, "1");

        map.add_group(268, e1);
        map.add_group(268, e2);

        let entries = map.groups(268).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get_str(269), Some("0"));
        assert_eq!(entries[1].get_str(269), Some("1"));
        // count field tracks entry count
        assert_eq!(map.get_uint(268).unwrap(), 2);
    }

    #[test]
    fn test_aggregate_totals_include_groups() {
        let mut map = FieldMap::new();
        map.set_str(55, "X");
        let mut entry = FieldMap::new();
        entry.set_str(269, "0");
        map.add_group(268, entry);

        // 55=X| (5) + 268=1| (6) + 269=0| (6)
        assert_eq!(map.encoded_len(), 17);
        let wire = b"55=X\x01268=1\x01269=0\x01";
        let expected: u32 = wire.iter().map(|&b| u32::from(b)).sum();
        assert_eq!(map.byte_sum(), expected);
    }
}
