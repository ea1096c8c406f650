/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Dictionary-aware FIX message decoder.
//!
//! [`MessageDecoder`] parses one complete framed message into a
//! [`Message`]: fields are bucketed into header, body and trailer,
//! repeating groups are parsed per the dictionary's group definitions,
//! and length-prefixed data fields may contain embedded SOH bytes.
//! BodyLength and CheckSum are verified against the wire.

use crate::checksum::calculate_checksum;
use ferrofix_core::convert::{parse_checksum, parse_positive_int};
use ferrofix_core::error::DecodeError;
use ferrofix_core::fieldmap::{Field, FieldMap, FieldOrder};
use ferrofix_core::message::{Message, MessageStatus};
use ferrofix_core::types::tags;
use ferrofix_dictionary::{Dictionary, GroupDef};
use memchr::memchr;
use std::collections::HashMap;

/// SOH field separator.
pub const SOH: u8 = 0x01;

/// Equals sign between tag and value.
pub const EQUALS: u8 = b'=';

/// Constant-time check for the standard header tags common to all FIX
/// versions; the dictionary is consulted for anything else.
#[inline]
#[must_use]
pub const fn is_standard_header_tag(tag: u32) -> bool {
    matches!(
        tag,
        8 | 9
            | 35
            | 34
            | 43
            | 49
            | 50
            | 52
            | 56
            | 57
            | 90
            | 91
            | 97
            | 115
            | 116
            | 122
            | 128
            | 129
            | 142
            | 143
            | 144
            | 145
            | 212
            | 213
            | 347
            | 369
            | 1128
            | 1129
            | 1137
    )
}

/// Constant-time check for the standard trailer tags.
#[inline]
#[must_use]
pub const fn is_standard_trailer_tag(tag: u32) -> bool {
    matches!(tag, 10 | 89 | 93)
}

/// A tokenized field borrowed from the input buffer.
#[derive(Debug, Clone, Copy)]
struct RawField<'a> {
    tag: u32,
    value: &'a [u8],
    /// Byte offset of the tag's first digit within the message.
    offset: usize,
}

/// Sequential tokenizer over one framed message, with one-token
/// lookahead and length-prefixed data handling.
struct Scanner<'a, 'd> {
    input: &'a [u8],
    offset: usize,
    dict: &'d Dictionary,
    peeked: Option<RawField<'a>>,
    /// Byte count declared by the most recent Length-typed field; armed
    /// for exactly the next field and consumed only by a Data-typed tag.
    pending_data_len: Option<usize>,
}

impl<'a, 'd> Scanner<'a, 'd> {
    fn new(input: &'a [u8], dict: &'d Dictionary) -> Self {
        Self {
            input,
            offset: 0,
            dict,
            peeked: None,
            pending_data_len: None,
        }
    }

    fn peek(&mut self) -> Result<Option<RawField<'a>>, DecodeError> {
        if self.peeked.is_none() {
            self.peeked = self.scan()?;
        }
        Ok(self.peeked)
    }

    fn next(&mut self) -> Result<Option<RawField<'a>>, DecodeError> {
        if let Some(field) = self.peeked.take() {
            return Ok(Some(field));
        }
        self.scan()
    }

    fn scan(&mut self) -> Result<Option<RawField<'a>>, DecodeError> {
        if self.offset >= self.input.len() {
            return Ok(None);
        }
        let start = self.offset;
        let remaining = &self.input[start..];

        let eq_pos = memchr(EQUALS, remaining).ok_or(DecodeError::Incomplete)?;
        let tag = parse_tag(&remaining[..eq_pos])
            .ok_or(DecodeError::MalformedTag { offset: start })?;

        let value_start = eq_pos + 1;
        let pending = self.pending_data_len.take();

        let value = if let Some(declared) = pending.filter(|_| {
            self.dict
                .field_type(tag)
                .is_some_and(|t| t.is_data())
        }) {
            // data field: take exactly the declared byte count, SOH
            // bytes included, and require an SOH terminator after it
            let end = value_start
                .checked_add(declared)
                .filter(|&e| e < remaining.len())
                .ok_or(DecodeError::DataLengthMismatch { tag, declared })?;
            if remaining[end] != SOH {
                return Err(DecodeError::DataLengthMismatch { tag, declared });
            }
            self.offset = start + end + 1;
            &remaining[value_start..end]
        } else {
            let soh_pos = memchr(SOH, &remaining[value_start..])
                .ok_or(DecodeError::Incomplete)?;
            self.offset = start + value_start + soh_pos + 1;
            &remaining[value_start..value_start + soh_pos]
        };

        if self.dict.is_length_field(tag)
            && tag != tags::BODY_LENGTH
            && let Ok(n) = parse_positive_int(value)
        {
            self.pending_data_len = Some(n as usize);
        }

        Ok(Some(RawField {
            tag,
            value,
            offset: start,
        }))
    }
}

/// Parses a tag number from ASCII bytes.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }
    Some(result)
}

/// Which map a tokenized field lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Header,
    Body,
    Trailer,
}

/// Dictionary-aware decoder for one framed FIX message.
#[derive(Debug, Clone)]
pub struct MessageDecoder<'d> {
    dict: &'d Dictionary,
    app_dicts: HashMap<&'d str, &'d Dictionary>,
    validate_checksum: bool,
    validate_body_length: bool,
}

impl<'d> MessageDecoder<'d> {
    /// Creates a decoder over the session dictionary.
    #[must_use]
    pub fn new(dict: &'d Dictionary) -> Self {
        Self {
            dict,
            app_dicts: HashMap::new(),
            validate_checksum: true,
            validate_body_length: true,
        }
    }

    /// Registers an application dictionary selected by the header's
    /// ApplVerID (1128) under a FIXT session dictionary.
    #[must_use]
    pub fn with_app_dictionary(mut self, appl_ver_id: &'d str, dict: &'d Dictionary) -> Self {
        self.app_dicts.insert(appl_ver_id, dict);
        self
    }

    /// Controls checksum verification.
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Controls body-length verification.
    #[must_use]
    pub const fn with_body_length_validation(mut self, validate: bool) -> Self {
        self.validate_body_length = validate;
        self
    }

    /// The dictionary that defines the message body: under FIXT the
    /// header's ApplVerID selects an application dictionary, otherwise
    /// the session dictionary covers both layers.
    fn message_dict(&self, header: &FieldMap) -> &'d Dictionary {
        if self.dict.version.uses_fixt()
            && let Some(ver) = header.get_str(tags::APPL_VER_ID)
            && let Some(dict) = self.app_dicts.get(ver)
        {
            return dict;
        }
        self.dict
    }

    fn bucket_of(&self, tag: u32) -> Bucket {
        if tag == tags::CHECK_SUM || is_standard_trailer_tag(tag) || self.dict.is_trailer_field(tag)
        {
            Bucket::Trailer
        } else if is_standard_header_tag(tag) || self.dict.is_header_field(tag) {
            Bucket::Header
        } else {
            Bucket::Body
        }
    }

    /// Decodes one complete framed message.
    ///
    /// # Errors
    /// Framing errors (`MalformedTag`, bad BodyLength/CheckSum, group
    /// count mismatches, data-length overruns) are returned as
    /// [`DecodeError`]; recoverable irregularities (out-of-order tags)
    /// are recorded on the message's status instead.
    pub fn decode(&self, input: &[u8]) -> Result<Message, DecodeError> {
        let mut scanner = Scanner::new(input, self.dict);
        let mut status = MessageStatus::default();

        // framing prefix: 8 then 9, in exactly that order
        let begin = scanner.next()?.ok_or(DecodeError::Incomplete)?;
        if begin.tag != tags::BEGIN_STRING {
            return Err(DecodeError::InvalidBeginString);
        }
        let body_len_field = scanner.next()?.ok_or(DecodeError::MissingBodyLength)?;
        if body_len_field.tag != tags::BODY_LENGTH {
            return Err(DecodeError::MissingBodyLength);
        }
        let declared_len = parse_positive_int(body_len_field.value)
            .map_err(|_| DecodeError::InvalidBodyLength)? as usize;
        let body_start = scanner.offset;

        let mut header = FieldMap::with_order(FieldOrder::Header);
        let mut body = FieldMap::new();
        let mut trailer = FieldMap::with_order(FieldOrder::Trailer);
        header.set_field(Field::new(begin.tag, begin.value.to_vec()));
        header.set_field(Field::new(body_len_field.tag, body_len_field.value.to_vec()));

        let mut body_started = false;
        let mut trailer_started = false;
        let mut position = 2u32;
        let mut checksum_field: Option<RawField<'_>> = None;
        let mut msg_dict: Option<&Dictionary> = None;

        while let Some(field) = scanner.peek()? {
            if field.tag == tags::CHECK_SUM {
                scanner.next()?;
                checksum_field = Some(field);
                trailer.set_field(Field::new(field.tag, field.value.to_vec()));
                break;
            }

            let bucket = self.bucket_of(field.tag);

            // repeating group? only meaningful once the body has begun
            if bucket == Bucket::Body {
                let dict = *msg_dict.get_or_insert_with(|| self.message_dict(&header));
                let group_def = header
                    .get_str(tags::MSG_TYPE)
                    .and_then(|mt| dict.group(mt, field.tag));
                if let Some(def) = group_def {
                    scanner.next()?;
                    body_started = true;
                    let declared = parse_positive_int(field.value).map_err(|source| {
                        DecodeError::Convert {
                            tag: field.tag,
                            source,
                        }
                    })? as usize;
                    position += 1;
                    // count field keeps its wire position; add_group
                    // re-syncs its value with the entry count
                    body.set_field(Field::new(field.tag, field.value.to_vec()));
                    let entries =
                        parse_group_entries(&mut scanner, def, declared, &mut position)?;
                    for entry in entries {
                        body.add_group(field.tag, entry);
                    }
                    continue;
                }
            }

            scanner.next()?;
            let owned = Field::new(field.tag, field.value.to_vec());
            match bucket {
                Bucket::Header => {
                    // a header field arriving after the body has begun is
                    // out of required order; it still lands in the header
                    if body_started {
                        status.mark_out_of_order(position);
                    }
                    header.set_field(owned);
                }
                Bucket::Body => {
                    if trailer_started {
                        status.mark_out_of_order(position);
                    }
                    body_started = true;
                    body.set_field(owned);
                }
                Bucket::Trailer => {
                    trailer_started = true;
                    trailer.set_field(owned);
                }
            }
            position += 1;
        }

        if !header.contains(tags::MSG_TYPE) {
            return Err(DecodeError::MissingMsgType);
        }
        let checksum_field = checksum_field.ok_or(DecodeError::MissingCheckSum)?;

        if self.validate_body_length {
            let counted = checksum_field.offset - body_start;
            if counted != declared_len {
                return Err(DecodeError::BodyLengthMismatch {
                    declared: declared_len,
                    counted,
                });
            }
        }
        if self.validate_checksum {
            let declared =
                parse_checksum(checksum_field.value).map_err(|source| DecodeError::Convert {
                    tag: tags::CHECK_SUM,
                    source,
                })?;
            let computed = calculate_checksum(&input[..checksum_field.offset]);
            if computed != declared {
                return Err(DecodeError::ChecksumMismatch { computed, declared });
            }
        }

        Ok(Message::from_parts(header, body, trailer, status))
    }
}

/// Parses the entries of one repeating group. Entries are delimited by
/// the group's first tag and end at any tag outside the member set;
/// nested groups recurse.
fn parse_group_entries(
    scanner: &mut Scanner<'_, '_>,
    def: &GroupDef,
    declared: usize,
    position: &mut u32,
) -> Result<Vec<FieldMap>, DecodeError> {
    let mut entries = Vec::with_capacity(declared);

    while let Some(first) = scanner.peek()? {
        if first.tag != def.delimiter_tag {
            break;
        }
        scanner.next()?;
        *position += 1;
        let mut entry = FieldMap::new();
        entry.set_field(Field::new(first.tag, first.value.to_vec()));

        while let Some(field) = scanner.peek()? {
            if field.tag == def.delimiter_tag {
                break;
            }
            if let Some(nested) = def.group(field.tag) {
                scanner.next()?;
                *position += 1;
                let nested_declared =
                    parse_positive_int(field.value).map_err(|source| DecodeError::Convert {
                        tag: field.tag,
                        source,
                    })? as usize;
                let nested_entries =
                    parse_group_entries(scanner, nested, nested_declared, position)?;
                for e in nested_entries {
                    entry.add_group(field.tag, e);
                }
                continue;
            }
            if !def.is_member(field.tag) {
                break;
            }
            scanner.next()?;
            *position += 1;
            entry.set_field(Field::new(field.tag, field.value.to_vec()));
        }
        entries.push(entry);
    }

    if entries.len() != declared {
        return Err(DecodeError::GroupCountMismatch {
            count_tag: def.count_tag,
            declared,
            found: entries.len(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::message::MsgType;
    use ferrofix_dictionary::{FieldDef, FieldType, MessageCategory, MessageDef, Version};

    fn fix42_dict() -> Dictionary {
        let mut dict = Dictionary::session_defaults(Version::Fix42);
        dict.add_field(FieldDef::new(55, "Symbol", FieldType::String));
        dict.add_field(FieldDef::new(268, "NoMDEntries", FieldType::NumInGroup));
        dict.add_field(FieldDef::new(269, "MDEntryType", FieldType::Char));
        dict.add_field(FieldDef::new(270, "MDEntryPx", FieldType::Price));
        dict.add_field(FieldDef::new(299, "QuoteEntryID", FieldType::String));
        let group = ferrofix_dictionary::GroupDef::new(268, vec![269, 270]);
        dict.add_message(
            MessageDef::new("W", "MarketDataSnapshotFullRefresh", MessageCategory::App)
                .with_field(55, true)
                .with_group(group),
        );
        dict
    }

    /// Frames a body with correct BodyLength and CheckSum.
    fn frame(body: &str) -> Vec<u8> {
        let header = format!("8=FIX.4.2\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        format!("{without_checksum}10={checksum:03}\x01").into_bytes()
    }

    #[test]
    fn test_decode_heartbeat() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame("35=0\x0149=CLIENT\x0156=SERVER\x0134=2\x0152=20240101-00:00:00\x01");

        let msg = decoder.decode(&wire).unwrap();
        assert_eq!(msg.msg_type(), Some(MsgType::Heartbeat));
        assert_eq!(msg.seq_num(), Some(2));
        assert_eq!(msg.header.get_str(49), Some("CLIENT"));
        assert!(msg.is_admin());
        assert!(msg.status().is_valid());
        assert_eq!(msg.trailer.get_str(10).unwrap().len(), 3);
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = b"8=FIX.4.2\x019=5\x0135=0\x0110=000\x01";

        let err = decoder.decode(wire).unwrap_err();
        assert!(matches!(err, DecodeError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_decode_rejects_bad_body_length() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        // declared 99, actual body is 5 bytes
        let body = "35=0\x01";
        let without_checksum = format!("8=FIX.4.2\x019=99\x01{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        let wire = format!("{without_checksum}10={checksum:03}\x01").into_bytes();

        let err = decoder.decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::BodyLengthMismatch { declared: 99, .. }
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_tag() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame("35=0\x01x9=1\x01");

        let err = decoder.decode(&wire).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTag { .. }));
    }

    #[test]
    fn test_decode_requires_begin_string_first() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let err = decoder
            .decode(b"9=5\x018=FIX.4.2\x0135=0\x0110=000\x01")
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBeginString));
    }

    #[test]
    fn test_decode_buckets_header_body_trailer() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame(
            "35=W\x0149=CLIENT\x0156=SERVER\x0134=9\x0152=20240101-00:00:00\x0155=MSFT\x01",
        );

        let msg = decoder.decode(&wire).unwrap();
        assert!(msg.header.contains(34));
        assert!(msg.body.contains(55));
        assert!(!msg.body.contains(34));
        assert!(msg.trailer.contains(10));
    }

    #[test]
    fn test_decode_repeating_group() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame(
            "35=W\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
             55=MSFT\x01268=2\x01269=0\x01270=1.25\x01269=1\x01270=1.26\x01",
        );

        let msg = decoder.decode(&wire).unwrap();
        let entries = msg.body.groups(268).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get_str(269), Some("0"));
        assert_eq!(entries[0].get_str(270), Some("1.25"));
        assert_eq!(entries[1].get_str(269), Some("1"));
        assert_eq!(msg.body.get_uint(268).unwrap(), 2);
    }

    #[test]
    fn test_decode_group_count_mismatch() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame(
            "35=W\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
             55=MSFT\x01268=3\x01269=0\x01270=1.25\x01",
        );

        let err = decoder.decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::GroupCountMismatch {
                count_tag: 268,
                declared: 3,
                found: 1,
            }
        ));
    }

    #[test]
    fn test_decode_data_field_with_embedded_soh() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        // RawDataLength=5, RawData carries an embedded SOH
        let wire = frame(
            "35=A\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
             98=0\x01108=30\x0195=5\x0196=AB\x01CD\x01",
        );

        let msg = decoder.decode(&wire).unwrap();
        let raw = msg.body.get_field(96).unwrap();
        assert_eq!(raw.value(), b"AB\x01CD");
        assert_eq!(msg.body.get_uint(95).unwrap(), 5);
    }

    #[test]
    fn test_decode_data_length_overrun() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        // declared 50 bytes but the message ends first
        let wire = frame(
            "35=A\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
             98=0\x01108=30\x0195=50\x0196=AB\x01",
        );

        let err = decoder.decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DataLengthMismatch { tag: 96, .. }
        ));
    }

    #[test]
    fn test_body_length_is_not_a_data_prefix() {
        // tag 9 is Length-typed but must not arm data handling for 35
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame("35=0\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01");
        assert!(decoder.decode(&wire).is_ok());
    }

    #[test]
    fn test_header_field_after_body_marks_out_of_order() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        // SenderCompID appears after a body field
        let wire = frame("35=W\x0156=B\x0134=1\x0152=20240101-00:00:00\x0155=MSFT\x0149=A\x01");

        let msg = decoder.decode(&wire).unwrap();
        assert!(msg.status().has(MessageStatus::TAG_OUT_OF_ORDER));
        assert_eq!(msg.header.get_str(49), Some("A"));
    }

    #[test]
    fn test_missing_msg_type() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let wire = frame("49=A\x0156=B\x0134=1\x01");
        let err = decoder.decode(&wire).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMsgType));
    }

    #[test]
    fn test_missing_checksum() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict);
        let err = decoder
            .decode(b"8=FIX.4.2\x019=5\x0135=0\x01")
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingCheckSum));
    }

    #[test]
    fn test_checksum_validation_can_be_disabled() {
        let dict = fix42_dict();
        let decoder = MessageDecoder::new(&dict)
            .with_checksum_validation(false)
            .with_body_length_validation(false);
        let msg = decoder
            .decode(b"8=FIX.4.2\x019=5\x0135=0\x0110=000\x01")
            .unwrap();
        assert_eq!(msg.msg_type(), Some(MsgType::Heartbeat));
    }

    #[test]
    fn test_fixt_appl_ver_id_selects_app_dictionary() {
        let session_dict = Dictionary::session_defaults(Version::Fixt11);
        let mut app_dict = Dictionary::session_defaults(Version::Fix50Sp2);
        app_dict.add_field(FieldDef::new(55, "Symbol", FieldType::String));
        app_dict.add_field(FieldDef::new(268, "NoMDEntries", FieldType::NumInGroup));
        app_dict.add_field(FieldDef::new(269, "MDEntryType", FieldType::Char));
        app_dict.add_field(FieldDef::new(270, "MDEntryPx", FieldType::Price));
        app_dict.add_message(
            MessageDef::new("W", "MarketDataSnapshotFullRefresh", MessageCategory::App)
                .with_field(55, true)
                .with_group(ferrofix_dictionary::GroupDef::new(268, vec![269, 270])),
        );

        let decoder =
            MessageDecoder::new(&session_dict).with_app_dictionary("11", &app_dict);
        let body = "35=W\x011128=11\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
                    55=MSFT\x01268=1\x01269=0\x01270=1.5\x01";
        let header = format!("8=FIXT.1.1\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        let wire = format!("{without_checksum}10={checksum:03}\x01").into_bytes();

        let msg = decoder.decode(&wire).unwrap();
        // the group only parses because ApplVerID routed to the app dictionary
        let entries = msg.body.groups(268).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].get_str(270), Some("1.5"));
        assert_eq!(msg.header.get_str(1128), Some("11"));
    }

    #[test]
    fn test_parse_tag_bounds() {
        assert_eq!(parse_tag(b"8"), Some(8));
        assert_eq!(parse_tag(b"12345"), Some(12345));
        assert_eq!(parse_tag(b""), None);
        assert_eq!(parse_tag(b"12a"), None);
        assert_eq!(parse_tag(b"99999999999"), None);
    }
}
