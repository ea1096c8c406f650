/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Schema definitions for FIX dictionaries.
//!
//! This module defines the structures that represent a FIX protocol
//! specification in memory:
//! - [`Version`]: FIX version with BeginString/ApplVerID mapping
//! - [`FieldDef`]: field tag, name, type and allowed values
//! - [`GroupDef`]: repeating group composition
//! - [`MessageDef`]: per-MsgType required and permitted fields
//! - [`Dictionary`]: the complete immutable schema shared by sessions

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// FIX protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    /// FIX 4.0
    Fix40,
    /// FIX 4.1
    Fix41,
    /// FIX 4.2
    Fix42,
    /// FIX 4.3
    Fix43,
    /// FIX 4.4
    Fix44,
    /// FIX 5.0
    Fix50,
    /// FIX 5.0 SP1
    Fix50Sp1,
    /// FIX 5.0 SP2
    Fix50Sp2,
    /// FIXT 1.1 (transport layer for FIX 5.0+)
    Fixt11,
}

impl Version {
    /// The BeginString carried on the wire for this version. FIX 5.0
    /// application versions all travel over FIXT.1.1; `ApplVerID`
    /// distinguishes them.
    #[must_use]
    pub const fn begin_string(&self) -> &'static str {
        match self {
            Self::Fix40 => "FIX.4.0",
            Self::Fix41 => "FIX.4.1",
            Self::Fix42 => "FIX.4.2",
            Self::Fix43 => "FIX.4.3",
            Self::Fix44 => "FIX.4.4",
            Self::Fix50 | Self::Fix50Sp1 | Self::Fix50Sp2 | Self::Fixt11 => "FIXT.1.1",
        }
    }

    /// The ApplVerID (1128) value selecting this application version
    /// under FIXT.1.1.
    #[must_use]
    pub const fn appl_ver_id(&self) -> Option<&'static str> {
        match self {
            Self::Fix50 => Some("9"),
            Self::Fix50Sp1 => Some("10"),
            Self::Fix50Sp2 => Some("11"),
            _ => None,
        }
    }

    /// Resolves an ApplVerID value to its application version.
    #[must_use]
    pub fn from_appl_ver_id(value: &str) -> Option<Self> {
        match value {
            "9" => Some(Self::Fix50),
            "10" => Some(Self::Fix50Sp1),
            "11" => Some(Self::Fix50Sp2),
            _ => None,
        }
    }

    /// Resolves a wire BeginString to a version. `FIXT.1.1` resolves to
    /// [`Version::Fixt11`]; the application version must then come from
    /// the header's ApplVerID.
    #[must_use]
    pub fn from_begin_string(value: &str) -> Option<Self> {
        match value {
            "FIX.4.0" => Some(Self::Fix40),
            "FIX.4.1" => Some(Self::Fix41),
            "FIX.4.2" => Some(Self::Fix42),
            "FIX.4.3" => Some(Self::Fix43),
            "FIX.4.4" => Some(Self::Fix44),
            "FIXT.1.1" => Some(Self::Fixt11),
            _ => None,
        }
    }

    /// True if this version uses the FIXT transport layer.
    #[must_use]
    pub const fn uses_fixt(&self) -> bool {
        matches!(
            self,
            Self::Fix50 | Self::Fix50Sp1 | Self::Fix50Sp2 | Self::Fixt11
        )
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.begin_string())
    }
}

/// FIX field data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed integer.
    Int,
    /// Byte count of a following data field.
    Length,
    /// Sequence number.
    SeqNum,
    /// Number of entries in a repeating group.
    NumInGroup,
    /// Tag number reference.
    TagNum,
    /// Day of month (1-31).
    DayOfMonth,
    /// Floating point number.
    Float,
    /// Quantity.
    Qty,
    /// Price.
    Price,
    /// Price offset.
    PriceOffset,
    /// Amount (price * quantity).
    Amt,
    /// Percentage.
    Percentage,
    /// Single character.
    Char,
    /// Boolean (Y/N).
    Boolean,
    /// String.
    String,
    /// Multiple string value (space-separated).
    MultipleValueString,
    /// Country code (ISO 3166).
    Country,
    /// Currency code (ISO 4217).
    Currency,
    /// Exchange code (ISO 10383 MIC).
    Exchange,
    /// Month-year.
    MonthYear,
    /// UTC timestamp.
    UtcTimestamp,
    /// UTC time only.
    UtcTimeOnly,
    /// UTC date only.
    UtcDateOnly,
    /// Local market date.
    LocalMktDate,
    /// Raw data preceded by a Length field; may contain SOH.
    Data,
    /// XML data preceded by a Length field.
    XmlData,
    /// Language code (ISO 639-1).
    Language,
}

impl FieldType {
    /// True for numeric types.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Length
                | Self::SeqNum
                | Self::NumInGroup
                | Self::TagNum
                | Self::DayOfMonth
                | Self::Float
                | Self::Qty
                | Self::Price
                | Self::PriceOffset
                | Self::Amt
                | Self::Percentage
        )
    }

    /// True for the length-prefixed binary types.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data | Self::XmlData)
    }
}

impl std::str::FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "INT" => Self::Int,
            "LENGTH" => Self::Length,
            "SEQNUM" => Self::SeqNum,
            "NUMINGROUP" => Self::NumInGroup,
            "TAGNUM" => Self::TagNum,
            "DAYOFMONTH" => Self::DayOfMonth,
            "FLOAT" => Self::Float,
            "QTY" | "QUANTITY" => Self::Qty,
            "PRICE" => Self::Price,
            "PRICEOFFSET" => Self::PriceOffset,
            "AMT" | "AMOUNT" => Self::Amt,
            "PERCENTAGE" => Self::Percentage,
            "CHAR" => Self::Char,
            "BOOLEAN" => Self::Boolean,
            "MULTIPLEVALUESTRING" | "MULTIPLESTRINGVALUE" | "MULTIPLECHARVALUE" => {
                Self::MultipleValueString
            }
            "COUNTRY" => Self::Country,
            "CURRENCY" => Self::Currency,
            "EXCHANGE" => Self::Exchange,
            "MONTHYEAR" => Self::MonthYear,
            "UTCTIMESTAMP" | "TIME" => Self::UtcTimestamp,
            "UTCTIMEONLY" => Self::UtcTimeOnly,
            "UTCDATEONLY" | "UTCDATE" | "DATE" => Self::UtcDateOnly,
            "LOCALMKTDATE" => Self::LocalMktDate,
            "DATA" => Self::Data,
            "XMLDATA" => Self::XmlData,
            "LANGUAGE" => Self::Language,
            _ => Self::String,
        })
    }
}

/// Definition of a FIX field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field tag number.
    pub tag: u32,
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Allowed values for enumerated fields; empty means unrestricted.
    pub allowed_values: Vec<String>,
}

impl FieldDef {
    /// Creates a new field definition with unrestricted values.
    #[must_use]
    pub fn new(tag: u32, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            tag,
            name: name.into(),
            field_type,
            allowed_values: Vec::new(),
        }
    }

    /// Restricts the field to an enumerated value set.
    #[must_use]
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Definition of a repeating group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDef {
    /// Tag of the count field (NumInGroup type).
    pub count_tag: u32,
    /// Tag of the first field in each entry; delimits entries.
    pub delimiter_tag: u32,
    /// Member tags in their defined order (delimiter first).
    pub member_tags: Vec<u32>,
    /// Nested groups keyed by their count tag.
    pub groups: HashMap<u32, GroupDef>,
    /// Whether at least one entry is required.
    pub required: bool,
}

impl GroupDef {
    /// Creates a group definition; the first member tag is the delimiter.
    #[must_use]
    pub fn new(count_tag: u32, member_tags: Vec<u32>) -> Self {
        let delimiter_tag = member_tags.first().copied().unwrap_or(0);
        Self {
            count_tag,
            delimiter_tag,
            member_tags,
            groups: HashMap::new(),
            required: false,
        }
    }

    /// Adds a nested group.
    #[must_use]
    pub fn with_group(mut self, group: GroupDef) -> Self {
        self.groups.insert(group.count_tag, group);
        self
    }

    /// True when the tag belongs to an entry of this group, either as a
    /// plain member or as a nested group's count tag.
    #[must_use]
    pub fn is_member(&self, tag: u32) -> bool {
        self.member_tags.contains(&tag) || self.groups.contains_key(&tag)
    }

    /// Looks up a nested group by count tag.
    #[must_use]
    pub fn group(&self, count_tag: u32) -> Option<&GroupDef> {
        self.groups.get(&count_tag)
    }
}

/// Message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Administrative message (session level).
    Admin,
    /// Application message.
    App,
}

/// Definition of a FIX message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDef {
    /// Message type value (tag 35).
    pub msg_type: String,
    /// Message name.
    pub name: String,
    /// Message category.
    pub category: MessageCategory,
    /// Permitted body fields, tag -> required.
    pub fields: HashMap<u32, bool>,
    /// Repeating groups keyed by count tag.
    pub groups: HashMap<u32, GroupDef>,
}

impl MessageDef {
    /// Creates an empty message definition.
    #[must_use]
    pub fn new(
        msg_type: impl Into<String>,
        name: impl Into<String>,
        category: MessageCategory,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            name: name.into(),
            category,
            fields: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Adds a permitted field.
    #[must_use]
    pub fn with_field(mut self, tag: u32, required: bool) -> Self {
        self.fields.insert(tag, required);
        self
    }

    /// Adds a repeating group.
    #[must_use]
    pub fn with_group(mut self, group: GroupDef) -> Self {
        self.fields.insert(group.count_tag, group.required);
        self.groups.insert(group.count_tag, group);
        self
    }

    /// Tags that must be present in the body.
    pub fn required_tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields
            .iter()
            .filter(|(_, required)| **required)
            .map(|(tag, _)| *tag)
    }

    /// True when the tag may appear in this message's body.
    #[must_use]
    pub fn permits(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// Looks up a group by its count tag.
    #[must_use]
    pub fn group(&self, count_tag: u32) -> Option<&GroupDef> {
        self.groups.get(&count_tag)
    }
}

/// Complete FIX dictionary for a specific version.
///
/// Dictionaries are loaded at startup, immutable thereafter, and shared
/// by every session speaking the same version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dictionary {
    /// FIX version.
    pub version: Version,
    /// Field definitions indexed by tag.
    fields: HashMap<u32, FieldDef>,
    /// Field tags indexed by name.
    fields_by_name: HashMap<String, u32>,
    /// Message definitions indexed by msg_type.
    messages: HashMap<String, MessageDef>,
    /// Header field tags, with required flag.
    header: HashMap<u32, bool>,
    /// Trailer field tags, with required flag.
    trailer: HashMap<u32, bool>,
    /// Whether unknown tags are rejected.
    strict: bool,
}

/// Inclusive range of user-defined tags accepted even in strict mode.
pub const USER_DEFINED_TAGS: std::ops::RangeInclusive<u32> = 5000..=9999;

impl Dictionary {
    /// Creates an empty dictionary for the specified version.
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self {
            version,
            fields: HashMap::new(),
            fields_by_name: HashMap::new(),
            messages: HashMap::new(),
            header: HashMap::new(),
            trailer: HashMap::new(),
            strict: false,
        }
    }

    /// Sets strict mode: unknown tags outside the user-defined range are
    /// rejected.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// True when strict mode is enabled.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Adds a field definition.
    pub fn add_field(&mut self, field: FieldDef) {
        self.fields_by_name.insert(field.name.clone(), field.tag);
        self.fields.insert(field.tag, field);
    }

    /// Adds a message definition.
    pub fn add_message(&mut self, message: MessageDef) {
        self.messages.insert(message.msg_type.clone(), message);
    }

    /// Declares a header field.
    pub fn add_header_field(&mut self, tag: u32, required: bool) {
        self.header.insert(tag, required);
    }

    /// Declares a trailer field.
    pub fn add_trailer_field(&mut self, tag: u32, required: bool) {
        self.trailer.insert(tag, required);
    }

    /// True when the tag belongs to the standard header.
    #[must_use]
    pub fn is_header_field(&self, tag: u32) -> bool {
        self.header.contains_key(&tag)
    }

    /// True when the tag belongs to the standard trailer.
    #[must_use]
    pub fn is_trailer_field(&self, tag: u32) -> bool {
        self.trailer.contains_key(&tag)
    }

    /// True when the MsgType value is defined.
    #[must_use]
    pub fn is_msg_type(&self, msg_type: &str) -> bool {
        self.messages.contains_key(msg_type)
    }

    /// True when the tag is defined.
    #[must_use]
    pub fn is_field(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// True when the value is permitted for the tag. Unrestricted and
    /// unknown fields accept any value.
    #[must_use]
    pub fn is_field_value_valid(&self, tag: u32, value: &str) -> bool {
        match self.fields.get(&tag) {
            Some(def) if !def.allowed_values.is_empty() => {
                def.allowed_values.iter().any(|v| v == value)
            }
            _ => true,
        }
    }

    /// Gets a field definition by tag.
    #[must_use]
    pub fn field(&self, tag: u32) -> Option<&FieldDef> {
        self.fields.get(&tag)
    }

    /// Gets a field definition by name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.fields_by_name.get(name).and_then(|t| self.fields.get(t))
    }

    /// The declared type of a tag.
    #[must_use]
    pub fn field_type(&self, tag: u32) -> Option<FieldType> {
        self.fields.get(&tag).map(|f| f.field_type)
    }

    /// True when the tag is a Length field prefixing a data field.
    #[must_use]
    pub fn is_length_field(&self, tag: u32) -> bool {
        self.field_type(tag) == Some(FieldType::Length)
    }

    /// Gets a message definition by type.
    #[must_use]
    pub fn message(&self, msg_type: &str) -> Option<&MessageDef> {
        self.messages.get(msg_type)
    }

    /// Looks up a group by message type and count tag.
    #[must_use]
    pub fn group(&self, msg_type: &str, count_tag: u32) -> Option<&GroupDef> {
        self.messages.get(msg_type)?.group(count_tag)
    }

    /// Required header tags.
    pub fn required_header_tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.header
            .iter()
            .filter(|(_, required)| **required)
            .map(|(tag, _)| *tag)
    }

    /// Required trailer tags.
    pub fn required_trailer_tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.trailer
            .iter()
            .filter(|(_, required)| **required)
            .map(|(tag, _)| *tag)
    }

    /// Iterates over all message definitions.
    pub fn messages(&self) -> impl Iterator<Item = &MessageDef> {
        self.messages.values()
    }

    /// MsgType values defined by this dictionary.
    #[must_use]
    pub fn msg_types(&self) -> HashSet<&str> {
        self.messages.keys().map(String::as_str).collect()
    }

    /// Builds the standard session-level dictionary for a version: the
    /// common header and trailer plus the seven admin message types.
    /// Sessions work from this without an XML file on disk.
    #[must_use]
    pub fn session_defaults(version: Version) -> Self {
        use MessageCategory::Admin;

        let mut dict = Self::new(version);

        for (tag, name, ftype) in [
            (7u32, "BeginSeqNo", FieldType::SeqNum),
            (8, "BeginString", FieldType::String),
            (9, "BodyLength", FieldType::Length),
            (10, "CheckSum", FieldType::String),
            (16, "EndSeqNo", FieldType::SeqNum),
            (34, "MsgSeqNum", FieldType::SeqNum),
            (35, "MsgType", FieldType::String),
            (36, "NewSeqNo", FieldType::SeqNum),
            (43, "PossDupFlag", FieldType::Boolean),
            (45, "RefSeqNum", FieldType::SeqNum),
            (49, "SenderCompID", FieldType::String),
            (50, "SenderSubID", FieldType::String),
            (52, "SendingTime", FieldType::UtcTimestamp),
            (56, "TargetCompID", FieldType::String),
            (57, "TargetSubID", FieldType::String),
            (58, "Text", FieldType::String),
            (89, "Signature", FieldType::Data),
            (93, "SignatureLength", FieldType::Length),
            (95, "RawDataLength", FieldType::Length),
            (96, "RawData", FieldType::Data),
            (97, "PossResend", FieldType::Boolean),
            (98, "EncryptMethod", FieldType::Int),
            (108, "HeartBtInt", FieldType::Int),
            (112, "TestReqID", FieldType::String),
            (122, "OrigSendingTime", FieldType::UtcTimestamp),
            (123, "GapFillFlag", FieldType::Boolean),
            (141, "ResetSeqNumFlag", FieldType::Boolean),
            (371, "RefTagID", FieldType::TagNum),
            (372, "RefMsgType", FieldType::String),
            (373, "SessionRejectReason", FieldType::Int),
            (1128, "ApplVerID", FieldType::String),
            (1137, "DefaultApplVerID", FieldType::String),
        ] {
            dict.add_field(FieldDef::new(tag, name, ftype));
        }

        for (tag, required) in [
            (8u32, true),
            (9, true),
            (35, true),
            (34, true),
            (43, false),
            (49, true),
            (50, false),
            (52, true),
            (56, true),
            (57, false),
            (97, false),
            (122, false),
        ] {
            dict.add_header_field(tag, required);
        }
        if version.uses_fixt() {
            dict.add_header_field(1128, false);
        }

        dict.add_trailer_field(93, false);
        dict.add_trailer_field(89, false);
        dict.add_trailer_field(10, true);

        dict.add_message(
            MessageDef::new("0", "Heartbeat", Admin).with_field(112, false),
        );
        dict.add_message(
            MessageDef::new("1", "TestRequest", Admin).with_field(112, true),
        );
        dict.add_message(
            MessageDef::new("2", "ResendRequest", Admin)
                .with_field(7, true)
                .with_field(16, true),
        );
        dict.add_message(
            MessageDef::new("3", "Reject", Admin)
                .with_field(45, true)
                .with_field(371, false)
                .with_field(372, false)
                .with_field(373, false)
                .with_field(58, false),
        );
        dict.add_message(
            MessageDef::new("4", "SequenceReset", Admin)
                .with_field(123, false)
                .with_field(36, true),
        );
        dict.add_message(
            MessageDef::new("5", "Logout", Admin).with_field(58, false),
        );
        let mut logon = MessageDef::new("A", "Logon", Admin)
            .with_field(98, true)
            .with_field(108, true)
            .with_field(95, false)
            .with_field(96, false)
            .with_field(141, false);
        if version.uses_fixt() {
            logon = logon.with_field(1137, true);
        }
        dict.add_message(logon);

        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_begin_string() {
        assert_eq!(Version::Fix42.begin_string(), "FIX.4.2");
        assert_eq!(Version::Fix44.begin_string(), "FIX.4.4");
        assert_eq!(Version::Fix50.begin_string(), "FIXT.1.1");
        assert_eq!(Version::Fix50Sp2.begin_string(), "FIXT.1.1");
    }

    #[test]
    fn test_appl_ver_id_table() {
        assert_eq!(Version::Fix44.appl_ver_id(), None);
        assert_eq!(Version::Fix50.appl_ver_id(), Some("9"));
        assert_eq!(Version::Fix50Sp1.appl_ver_id(), Some("10"));
        assert_eq!(Version::Fix50Sp2.appl_ver_id(), Some("11"));

        assert_eq!(Version::from_appl_ver_id("9"), Some(Version::Fix50));
        assert_eq!(Version::from_appl_ver_id("11"), Some(Version::Fix50Sp2));
        assert_eq!(Version::from_appl_ver_id("2"), None);
    }

    #[test]
    fn test_from_begin_string() {
        assert_eq!(Version::from_begin_string("FIX.4.2"), Some(Version::Fix42));
        assert_eq!(Version::from_begin_string("FIXT.1.1"), Some(Version::Fixt11));
        assert_eq!(Version::from_begin_string("FIX.9.9"), None);
    }

    #[test]
    fn test_field_type_from_str() {
        assert_eq!("INT".parse::<FieldType>().unwrap(), FieldType::Int);
        assert_eq!("NUMINGROUP".parse::<FieldType>().unwrap(), FieldType::NumInGroup);
        assert_eq!("DATA".parse::<FieldType>().unwrap(), FieldType::Data);
        assert_eq!("whatever".parse::<FieldType>().unwrap(), FieldType::String);
    }

    #[test]
    fn test_group_def_membership() {
        let nested = GroupDef::new(539, vec![524, 525]);
        let group = GroupDef::new(268, vec![269, 270, 271]).with_group(nested);

        assert_eq!(group.delimiter_tag, 269);
        assert!(group.is_member(270));
        assert!(group.is_member(539));
        assert!(!group.is_member(999));
        assert!(group.group(539).is_some());
    }

    #[test]
    fn test_session_defaults_admin_messages() {
        let dict = Dictionary::session_defaults(Version::Fix42);

        for mt in ["0", "1", "2", "3", "4", "5", "A"] {
            assert!(dict.is_msg_type(mt), "{mt} should be defined");
        }
        assert!(!dict.is_msg_type("D"));

        assert!(dict.is_header_field(8));
        assert!(dict.is_header_field(34));
        assert!(!dict.is_header_field(112));
        assert!(dict.is_trailer_field(10));

        let logon = dict.message("A").unwrap();
        assert!(logon.permits(108));
        let required: Vec<u32> = logon.required_tags().collect();
        assert!(required.contains(&98));
        assert!(required.contains(&108));
    }

    #[test]
    fn test_session_defaults_fixt_header() {
        let dict = Dictionary::session_defaults(Version::Fix50Sp2);
        assert!(dict.is_header_field(1128));

        let dict42 = Dictionary::session_defaults(Version::Fix42);
        assert!(!dict42.is_header_field(1128));
    }

    #[test]
    fn test_field_value_validation() {
        let mut dict = Dictionary::new(Version::Fix42);
        dict.add_field(FieldDef::new(54, "Side", FieldType::Char).with_values(["1", "2"]));
        dict.add_field(FieldDef::new(55, "Symbol", FieldType::String));

        assert!(dict.is_field_value_valid(54, "1"));
        assert!(!dict.is_field_value_valid(54, "9"));
        assert!(dict.is_field_value_valid(55, "anything"));
        // unknown tags accept anything at this layer
        assert!(dict.is_field_value_valid(9999, "x"));
    }

    #[test]
    fn test_length_field_detection() {
        let dict = Dictionary::session_defaults(Version::Fix42);
        assert!(dict.is_length_field(95));
        assert!(!dict.is_length_field(96));
        assert!(dict.field_type(96) == Some(FieldType::Data));
    }
}
