/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoder.
//!
//! Serializes a [`Message`] to the tag=value wire form: header in its
//! canonical `8, 9, 35` prefix order, body fields and groups in
//! insertion order, trailer with `CheckSum` last. BodyLength and
//! CheckSum are computed from the field maps' cached totals and patched
//! into the message before serialization.

use bytes::{BufMut, BytesMut};
use ferrofix_core::convert::emit_checksum;
use ferrofix_core::error::EncodeError;
use ferrofix_core::fieldmap::{Field, FieldMap, SOH};
use ferrofix_core::message::Message;
use ferrofix_core::types::tags;

/// Serializes messages to wire bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageEncoder;

impl MessageEncoder {
    /// Creates an encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encodes a message, patching BodyLength (9) and CheckSum (10) in
    /// place first.
    ///
    /// # Errors
    /// `MissingRequiredField` when the header lacks BeginString (8) or
    /// MsgType (35).
    pub fn encode(&self, msg: &mut Message) -> Result<BytesMut, EncodeError> {
        for tag in [tags::BEGIN_STRING, tags::MSG_TYPE] {
            if !msg.header.contains(tag) {
                return Err(EncodeError::MissingRequiredField { tag });
            }
        }

        // BodyLength counts everything after its own SOH up to `10=`
        let skipped: u32 = [tags::BEGIN_STRING, tags::BODY_LENGTH]
            .iter()
            .filter_map(|&t| msg.header.get_field(t))
            .map(Field::encoded_len)
            .sum();
        let trailer_skipped: u32 = msg
            .trailer
            .get_field(tags::CHECK_SUM)
            .map(Field::encoded_len)
            .unwrap_or(0);
        let body_length = msg.header.encoded_len() as u32 - skipped
            + msg.body.encoded_len() as u32
            + msg.trailer.encoded_len() as u32
            - trailer_skipped;
        msg.header.set_uint(tags::BODY_LENGTH, u64::from(body_length));

        // CheckSum covers everything before `10=`, from the cached sums
        let checksum_skipped = msg
            .trailer
            .get_field(tags::CHECK_SUM)
            .map(Field::byte_sum)
            .unwrap_or(0);
        let sum = msg
            .header
            .byte_sum()
            .wrapping_add(msg.body.byte_sum())
            .wrapping_add(msg.trailer.byte_sum())
            .wrapping_sub(checksum_skipped);
        let checksum = emit_checksum((sum % 256) as u8);
        msg.trailer.set_field(Field::new(
            tags::CHECK_SUM,
            checksum.to_vec(),
        ));

        let capacity = msg.header.encoded_len() + msg.body.encoded_len() + msg.trailer.encoded_len();
        let mut out = BytesMut::with_capacity(capacity);
        write_map(&msg.header, &mut out);
        write_map(&msg.body, &mut out);
        write_map(&msg.trailer, &mut out);
        Ok(out)
    }
}

/// Writes a map in traversal order; a field that keys a repeating group
/// is followed by its entries, each in insertion order.
fn write_map(map: &FieldMap, out: &mut BytesMut) {
    for field in map.ordered_fields() {
        write_field(field, out);
        if let Some(entries) = map.groups(field.tag()) {
            for entry in entries {
                write_map(entry, out);
            }
        }
    }
}

#[inline]
fn write_field(field: &Field, out: &mut BytesMut) {
    let mut buf = itoa::Buffer::new();
    out.put_slice(buf.format(field.tag()).as_bytes());
    out.put_u8(b'=');
    out.put_slice(field.value());
    out.put_u8(SOH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::calculate_checksum;
    use crate::decoder::MessageDecoder;
    use ferrofix_core::convert::parse_checksum;
    use ferrofix_core::message::MsgType;
    use ferrofix_dictionary::{
        Dictionary, FieldDef, FieldType, GroupDef, MessageCategory, MessageDef, Version,
    };

    fn heartbeat() -> Message {
        let mut msg = Message::with_msg_type(&MsgType::Heartbeat);
        msg.header.set_str(8, "FIX.4.2");
        msg.header.set_str(49, "CLIENT");
        msg.header.set_str(56, "SERVER");
        msg.header.set_uint(34, 2);
        msg.header.set_str(52, "20240101-00:00:00");
        msg
    }

    #[test]
    fn test_encode_patches_body_length_and_checksum() {
        let mut msg = heartbeat();
        let wire = MessageEncoder::new().encode(&mut msg).unwrap();

        // declared body length equals counted bytes
        let text = wire.as_ref();
        let after_9 = {
            let start = text.windows(2).position(|w| w == b"9=").unwrap();
            let soh = text[start..].iter().position(|&b| b == SOH).unwrap();
            start + soh + 1
        };
        let checksum_start = text.windows(3).position(|w| w == b"10=").unwrap();
        let counted = checksum_start - after_9;
        let declared: usize = msg.header.get_uint(9).unwrap() as usize;
        assert_eq!(declared, counted);

        // declared checksum equals computed sum
        let declared_sum = parse_checksum(&text[checksum_start + 3..checksum_start + 6]).unwrap();
        assert_eq!(declared_sum, calculate_checksum(&text[..checksum_start]));
        assert_eq!(text.last(), Some(&SOH));
    }

    #[test]
    fn test_encode_canonical_header_prefix() {
        let mut msg = heartbeat();
        let wire = MessageEncoder::new().encode(&mut msg).unwrap();
        let s = String::from_utf8_lossy(&wire);
        assert!(s.starts_with("8=FIX.4.2\x019="));
        let after_len = s.split('\x01').nth(2).unwrap();
        assert!(after_len.starts_with("35="));
    }

    #[test]
    fn test_encode_missing_begin_string() {
        let mut msg = Message::with_msg_type(&MsgType::Heartbeat);
        let err = MessageEncoder::new().encode(&mut msg).unwrap_err();
        assert_eq!(err, EncodeError::MissingRequiredField { tag: 8 });
    }

    #[test]
    fn test_encode_missing_msg_type() {
        let mut msg = Message::new();
        msg.header.set_str(8, "FIX.4.2");
        let err = MessageEncoder::new().encode(&mut msg).unwrap_err();
        assert_eq!(err, EncodeError::MissingRequiredField { tag: 35 });
    }

    fn md_dict() -> Dictionary {
        let mut dict = Dictionary::session_defaults(Version::Fix42);
        dict.add_field(FieldDef::new(55, "Symbol", FieldType::String));
        dict.add_field(FieldDef::new(268, "NoMDEntries", FieldType::NumInGroup));
        dict.add_field(FieldDef::new(269, "MDEntryType", FieldType::Char));
        dict.add_field(FieldDef::new(270, "MDEntryPx", FieldType::Price));
        dict.add_message(
            MessageDef::new("W", "MarketDataSnapshotFullRefresh", MessageCategory::App)
                .with_field(55, true)
                .with_group(GroupDef::new(268, vec![269, 270])),
        );
        dict
    }

    #[test]
    fn test_roundtrip_message_to_wire_and_back() {
        let dict = md_dict();
        let mut msg = Message::with_msg_type(&MsgType::MarketDataSnapshotFullRefresh);
        msg.header.set_str(8, "FIX.4.2");
        msg.header.set_str(49, "A");
        msg.header.set_str(56, "B");
        msg.header.set_uint(34, 1);
        msg.header.set_str(52, "20240101-00:00:00");
        msg.body.set_str(55, "MSFT");
        let mut e1 = FieldMap::new();
        e1.set_str(269, "0");
        e1.set_str(270, "1.25");
        let mut e2 = FieldMap::new();
        e2.set_str(269, "1");
        e2.set_str(270, "1.26");
        msg.body.add_group(268, e1);
        msg.body.add_group(268, e2);

        let wire = MessageEncoder::new().encode(&mut msg).unwrap();
        let parsed = MessageDecoder::new(&dict).decode(&wire).unwrap();

        assert_eq!(parsed.msg_type(), Some(MsgType::MarketDataSnapshotFullRefresh));
        assert_eq!(parsed.body.get_str(55), Some("MSFT"));
        let entries = parsed.body.groups(268).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get_str(270), Some("1.25"));
        assert_eq!(entries[1].get_str(269), Some("1"));
        assert_eq!(parsed.body.get_uint(268).unwrap(), 2);
    }

    #[test]
    fn test_roundtrip_wire_to_message_and_back() {
        let dict = md_dict();
        let body = "35=W\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
                    55=MSFT\x01268=2\x01269=0\x01270=1.25\x01269=1\x01270=1.26\x01";
        let header = format!("8=FIX.4.2\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        let wire = format!("{without_checksum}10={checksum:03}\x01").into_bytes();

        let mut parsed = MessageDecoder::new(&dict).decode(&wire).unwrap();
        let emitted = MessageEncoder::new().encode(&mut parsed).unwrap();
        assert_eq!(emitted.as_ref(), wire.as_slice());
    }

    #[test]
    fn test_roundtrip_data_field_with_embedded_soh() {
        let dict = md_dict();
        let body = "35=A\x0149=A\x0156=B\x0134=1\x0152=20240101-00:00:00\x01\
                    98=0\x01108=30\x0195=5\x0196=AB\x01CD\x01";
        let header = format!("8=FIX.4.2\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        let wire = format!("{without_checksum}10={checksum:03}\x01").into_bytes();

        let mut parsed = MessageDecoder::new(&dict).decode(&wire).unwrap();
        assert_eq!(parsed.body.get_field(96).unwrap().value(), b"AB\x01CD");
        let emitted = MessageEncoder::new().encode(&mut parsed).unwrap();
        assert_eq!(emitted.as_ref(), wire.as_slice());
    }
}
