/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Dictionary-driven message validation.
//!
//! [`Validator`] checks a parsed message against a [`Dictionary`]:
//! message-type structure, required fields, unknown-tag policy, enum
//! values and repeating-group composition. Failures carry the FIX
//! SessionRejectReason (373) code the session layer puts on the Reject.

use crate::schema::{Dictionary, GroupDef, USER_DEFINED_TAGS};
use ferrofix_core::fieldmap::FieldMap;
use ferrofix_core::message::{Message, MessageStatus};
use ferrofix_core::types::tags;
use thiserror::Error;

/// A structural validation failure, mapped to a SessionRejectReason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Tag is not defined by the dictionary (strict mode).
    #[error("invalid tag number {tag}")]
    InvalidTagNumber {
        /// The unknown tag.
        tag: u32,
    },

    /// A required field is absent.
    #[error("required tag {tag} missing")]
    RequiredTagMissing {
        /// The missing tag.
        tag: u32,
    },

    /// The tag is defined but not permitted in this message type.
    #[error("tag {tag} not defined for message type {msg_type}")]
    TagNotDefinedForMessage {
        /// The offending tag.
        tag: u32,
        /// The message type.
        msg_type: String,
    },

    /// A field was present without a value.
    #[error("tag {tag} specified without a value")]
    TagWithoutValue {
        /// The offending tag.
        tag: u32,
    },

    /// The value is outside the field's enumerated set.
    #[error("value `{value}` incorrect for tag {tag}")]
    IncorrectValue {
        /// The offending tag.
        tag: u32,
        /// The offending value.
        value: String,
    },

    /// The MsgType value is not defined.
    #[error("invalid MsgType `{msg_type}`")]
    InvalidMsgType {
        /// The offending MsgType value.
        msg_type: String,
    },

    /// A tag appeared outside its required position.
    #[error("tag specified out of required order at position {position}")]
    TagOutOfOrder {
        /// Field position of the first out-of-order tag.
        position: u32,
    },

    /// A repeating group's composition disagrees with its definition.
    #[error("incorrect NumInGroup count for tag {count_tag}")]
    IncorrectGroupCount {
        /// The group count tag.
        count_tag: u32,
    },

    /// The message carried no MsgType at all.
    #[error("missing MsgType")]
    MissingMsgType,
}

impl ValidationError {
    /// The SessionRejectReason (373) code for this failure.
    #[must_use]
    pub const fn reject_reason(&self) -> u32 {
        match self {
            Self::InvalidTagNumber { .. } => 0,
            Self::RequiredTagMissing { .. } => 1,
            Self::TagNotDefinedForMessage { .. } => 2,
            Self::TagWithoutValue { .. } => 4,
            Self::IncorrectValue { .. } => 5,
            Self::InvalidMsgType { .. } | Self::MissingMsgType => 11,
            Self::TagOutOfOrder { .. } => 14,
            Self::IncorrectGroupCount { .. } => 16,
        }
    }

    /// The RefTagID (371) to report, when one applies.
    #[must_use]
    pub const fn ref_tag(&self) -> Option<u32> {
        match self {
            Self::InvalidTagNumber { tag }
            | Self::RequiredTagMissing { tag }
            | Self::TagNotDefinedForMessage { tag, .. }
            | Self::TagWithoutValue { tag }
            | Self::IncorrectValue { tag, .. } => Some(*tag),
            Self::IncorrectGroupCount { count_tag } => Some(*count_tag),
            Self::InvalidMsgType { .. } | Self::MissingMsgType => Some(tags::MSG_TYPE),
            Self::TagOutOfOrder { .. } => None,
        }
    }
}

/// Validates messages against a dictionary.
///
/// The boolean knobs mirror the session configuration switches; all
/// checks are idempotent and side-effect free.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'d> {
    dict: &'d Dictionary,
    check_fields_out_of_order: bool,
    check_fields_have_values: bool,
    check_user_defined_fields: bool,
}

impl<'d> Validator<'d> {
    /// Creates a validator with the default checks: out-of-order and
    /// empty-value checks on, user-defined tags (5000..=9999) exempt
    /// from the unknown-tag policy.
    #[must_use]
    pub const fn new(dict: &'d Dictionary) -> Self {
        Self {
            dict,
            check_fields_out_of_order: true,
            check_fields_have_values: true,
            check_user_defined_fields: false,
        }
    }

    /// Controls the out-of-order field check.
    #[must_use]
    pub const fn check_fields_out_of_order(mut self, check: bool) -> Self {
        self.check_fields_out_of_order = check;
        self
    }

    /// Controls the empty-value check.
    #[must_use]
    pub const fn check_fields_have_values(mut self, check: bool) -> Self {
        self.check_fields_have_values = check;
        self
    }

    /// Controls validation of user-defined tags (5000..=9999).
    #[must_use]
    pub const fn check_user_defined_fields(mut self, check: bool) -> Self {
        self.check_user_defined_fields = check;
        self
    }

    /// Checks the unknown-tag policy for one tag.
    ///
    /// # Errors
    /// `InvalidTagNumber` in strict mode for tags outside the dictionary,
    /// unless the tag is user-defined and user-defined tags are not
    /// themselves being validated.
    pub fn check_valid_tag_number(&self, tag: u32) -> Result<(), ValidationError> {
        if self.dict.is_field(tag) {
            return Ok(());
        }
        if USER_DEFINED_TAGS.contains(&tag) && !self.check_user_defined_fields {
            return Ok(());
        }
        if self.dict.is_strict() {
            return Err(ValidationError::InvalidTagNumber { tag });
        }
        Ok(())
    }

    /// Checks required header, trailer and body fields for a message
    /// type. Idempotent.
    ///
    /// # Errors
    /// `RequiredTagMissing` naming the first absent tag.
    pub fn check_has_required(&self, msg: &Message, msg_type: &str) -> Result<(), ValidationError> {
        for tag in self.dict.required_header_tags() {
            if !msg.header.contains(tag) {
                return Err(ValidationError::RequiredTagMissing { tag });
            }
        }
        for tag in self.dict.required_trailer_tags() {
            if !msg.trailer.contains(tag) {
                return Err(ValidationError::RequiredTagMissing { tag });
            }
        }
        if let Some(def) = self.dict.message(msg_type) {
            for tag in def.required_tags() {
                if !msg.body.contains(tag) && !msg.body.has_group(tag) {
                    return Err(ValidationError::RequiredTagMissing { tag });
                }
            }
        }
        Ok(())
    }

    /// Checks one repeating group's entries against its definition:
    /// every entry must start with the delimiter tag and contain only
    /// member tags, and the count field must equal the entry count.
    ///
    /// # Errors
    /// `IncorrectGroupCount` on any composition mismatch.
    pub fn check_group(&self, map: &FieldMap, def: &GroupDef) -> Result<(), ValidationError> {
        let err = || ValidationError::IncorrectGroupCount {
            count_tag: def.count_tag,
        };
        let Some(entries) = map.groups(def.count_tag) else {
            return Ok(());
        };
        let declared = map.get_uint(def.count_tag).map_err(|_| err())?;
        if declared as usize != entries.len() {
            return Err(err());
        }
        for entry in entries {
            if !entry.contains(def.delimiter_tag) {
                return Err(err());
            }
            for field in entry.fields() {
                if !def.is_member(field.tag()) {
                    return Err(err());
                }
            }
            for nested_tag in entry.group_tags() {
                let nested = def.group(nested_tag).ok_or_else(err)?;
                self.check_group(entry, nested)?;
            }
        }
        Ok(())
    }

    /// Full structural validation of a parsed message.
    ///
    /// # Errors
    /// The first [`ValidationError`] encountered, in check order:
    /// parse status, MsgType, unknown tags, empty values, enum values,
    /// body membership, required fields, group composition.
    pub fn validate(&self, msg: &Message) -> Result<(), ValidationError> {
        if self.check_fields_out_of_order && msg.status().has(MessageStatus::TAG_OUT_OF_ORDER) {
            return Err(ValidationError::TagOutOfOrder {
                position: msg.status().error_position(),
            });
        }

        let msg_type = msg
            .header
            .get_str(tags::MSG_TYPE)
            .ok_or(ValidationError::MissingMsgType)?
            .to_string();
        if !self.dict.is_msg_type(&msg_type) {
            return Err(ValidationError::InvalidMsgType { msg_type });
        }

        for map in [&msg.header, &msg.body, &msg.trailer] {
            self.check_fields(map)?;
        }

        let def = self.dict.message(&msg_type);
        for field in msg.body.fields() {
            let tag = field.tag();
            if USER_DEFINED_TAGS.contains(&tag) || !self.dict.is_field(tag) {
                continue;
            }
            if let Some(def) = def
                && !def.permits(tag)
            {
                return Err(ValidationError::TagNotDefinedForMessage {
                    tag,
                    msg_type: msg_type.clone(),
                });
            }
        }

        self.check_has_required(msg, &msg_type)?;

        if let Some(def) = def {
            for group in def.groups.values() {
                self.check_group(&msg.body, group)?;
            }
        }

        Ok(())
    }

    /// Per-field checks shared by the three maps.
    fn check_fields(&self, map: &FieldMap) -> Result<(), ValidationError> {
        for field in map.fields() {
            let tag = field.tag();
            self.check_valid_tag_number(tag)?;
            if self.check_fields_have_values && field.value().is_empty() {
                return Err(ValidationError::TagWithoutValue { tag });
            }
            if let Ok(value) = field.as_str()
                && !self.dict.is_field_value_valid(tag, value)
            {
                return Err(ValidationError::IncorrectValue {
                    tag,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
