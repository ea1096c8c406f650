/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! QuickFIX-format XML dictionary loader.
//!
//! Parses the `<fix>` document layout used by the standard FIX data
//! dictionaries: `<header>`, `<trailer>`, `<messages>`, `<components>`
//! and `<fields>` sections. Components are resolved inline into the
//! messages and groups that reference them.

use crate::schema::{Dictionary, FieldDef, GroupDef, MessageCategory, MessageDef, Version};
use std::collections::HashMap;
use thiserror::Error;
use xmltree::{Element, XMLNode};

/// Errors raised while loading an XML dictionary.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not well-formed XML.
    #[error("xml parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    /// The root element is not `<fix>`.
    #[error("root element is `{0}`, expected `fix`")]
    BadRoot(String),

    /// A required attribute is missing.
    #[error("missing attribute `{attribute}` on `{element}`")]
    MissingAttribute {
        /// The element lacking the attribute.
        element: String,
        /// The missing attribute name.
        attribute: String,
    },

    /// An attribute value could not be interpreted.
    #[error("bad value `{value}` for attribute `{attribute}` on `{element}`")]
    BadAttribute {
        /// The owning element.
        element: String,
        /// The attribute name.
        attribute: String,
        /// The offending value.
        value: String,
    },

    /// The fix version attributes do not name a supported version.
    #[error("unsupported fix version {major}.{minor} sp{servicepack}")]
    UnsupportedVersion {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
        /// Service pack.
        servicepack: u32,
    },

    /// A message or component references an undefined field name.
    #[error("reference to undefined field `{0}`")]
    UndefinedField(String),

    /// A message references an undefined component name.
    #[error("reference to undefined component `{0}`")]
    UndefinedComponent(String),
}

fn attr<'a>(element: &'a Element, name: &str) -> Result<&'a str, LoadError> {
    element
        .attributes
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| LoadError::MissingAttribute {
            element: element.name.clone(),
            attribute: name.to_string(),
        })
}

fn attr_u32(element: &Element, name: &str) -> Result<u32, LoadError> {
    let value = attr(element, name)?;
    value.parse().map_err(|_| LoadError::BadAttribute {
        element: element.name.clone(),
        attribute: name.to_string(),
        value: value.to_string(),
    })
}

fn attr_required(element: &Element) -> Result<bool, LoadError> {
    match element.attributes.get("required").map(String::as_str) {
        Some("Y") | Some("y") => Ok(true),
        Some("N") | Some("n") | None => Ok(false),
        Some(other) => Err(LoadError::BadAttribute {
            element: element.name.clone(),
            attribute: "required".to_string(),
            value: other.to_string(),
        }),
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

/// Field and group members collected from a message, component or group
/// body.
#[derive(Debug, Default)]
struct Members {
    fields: Vec<(u32, bool)>,
    groups: Vec<GroupDef>,
}

/// Resolution context shared while walking the document.
struct Context<'a> {
    fields_by_name: HashMap<&'a str, u32>,
    components: HashMap<&'a str, &'a Element>,
}

impl<'a> Context<'a> {
    fn field_tag(&self, name: &str) -> Result<u32, LoadError> {
        self.fields_by_name
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UndefinedField(name.to_string()))
    }

    /// Collects the members of a message/component/group body, resolving
    /// component references inline and recursing into groups.
    fn collect(&self, element: &Element) -> Result<Members, LoadError> {
        let mut members = Members::default();
        for child in child_elements(element) {
            match child.name.as_str() {
                "field" => {
                    let tag = self.field_tag(attr(child, "name")?)?;
                    members.fields.push((tag, attr_required(child)?));
                }
                "group" => {
                    let count_tag = self.field_tag(attr(child, "name")?)?;
                    let required = attr_required(child)?;
                    let inner = self.collect(child)?;
                    let mut group = GroupDef::new(
                        count_tag,
                        inner.fields.iter().map(|(t, _)| *t).collect(),
                    );
                    group.required = required;
                    for nested in inner.groups {
                        group = group.with_group(nested);
                    }
                    members.groups.push(group);
                }
                "component" => {
                    let name = attr(child, "name")?;
                    let component = self
                        .components
                        .get(name)
                        .ok_or_else(|| LoadError::UndefinedComponent(name.to_string()))?;
                    let inner = self.collect(component)?;
                    members.fields.extend(inner.fields);
                    members.groups.extend(inner.groups);
                }
                _ => {}
            }
        }
        Ok(members)
    }
}

fn version_of(root: &Element) -> Result<Version, LoadError> {
    let major = attr_u32(root, "major")?;
    let minor = attr_u32(root, "minor")?;
    let servicepack = root
        .attributes
        .get("servicepack")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let fixt = root.attributes.get("type").map(String::as_str) == Some("FIXT");

    let version = match (major, minor, servicepack, fixt) {
        (1, 1, _, true) => Version::Fixt11,
        (4, 0, _, _) => Version::Fix40,
        (4, 1, _, _) => Version::Fix41,
        (4, 2, _, _) => Version::Fix42,
        (4, 3, _, _) => Version::Fix43,
        (4, 4, _, _) => Version::Fix44,
        (5, 0, 0, _) => Version::Fix50,
        (5, 0, 1, _) => Version::Fix50Sp1,
        (5, 0, 2, _) => Version::Fix50Sp2,
        _ => {
            return Err(LoadError::UnsupportedVersion {
                major,
                minor,
                servicepack,
            });
        }
    };
    Ok(version)
}

impl Dictionary {
    /// Loads a dictionary from QuickFIX-format XML text.
    ///
    /// # Errors
    /// Returns [`LoadError`] when the document is malformed or references
    /// undefined fields or components.
    pub fn from_xml(xml: &str) -> Result<Self, LoadError> {
        let root = Element::parse(xml.as_bytes())?;
        if root.name != "fix" {
            return Err(LoadError::BadRoot(root.name));
        }

        let version = version_of(&root)?;
        let mut dict = Dictionary::new(version);

        // fields section first: everything else resolves names through it
        let mut fields_by_name: HashMap<&str, u32> = HashMap::new();
        if let Some(fields) = root.get_child("fields") {
            for field in child_elements(fields) {
                if field.name != "field" {
                    continue;
                }
                let tag = attr_u32(field, "number")?;
                let name = attr(field, "name")?;
                let field_type = attr(field, "type")?
                    .parse()
                    .unwrap_or(crate::schema::FieldType::String);
                let values: Vec<String> = child_elements(field)
                    .filter(|c| c.name == "value")
                    .filter_map(|c| c.attributes.get("enum").cloned())
                    .collect();
                fields_by_name.insert(name, tag);
                dict.add_field(FieldDef::new(tag, name, field_type).with_values(values));
            }
        }

        let components: HashMap<&str, &Element> = root
            .get_child("components")
            .map(|section| {
                child_elements(section)
                    .filter(|c| c.name == "component")
                    .filter_map(|c| Some((c.attributes.get("name")?.as_str(), c)))
                    .collect()
            })
            .unwrap_or_default();

        let ctx = Context {
            fields_by_name,
            components,
        };

        if let Some(header) = root.get_child("header") {
            let members = ctx.collect(header)?;
            for (tag, required) in members.fields {
                dict.add_header_field(tag, required);
            }
            for group in members.groups {
                // header groups (NoHops) classify their count tag as header
                dict.add_header_field(group.count_tag, group.required);
            }
        }
        if let Some(trailer) = root.get_child("trailer") {
            let members = ctx.collect(trailer)?;
            for (tag, required) in members.fields {
                dict.add_trailer_field(tag, required);
            }
        }

        if let Some(messages) = root.get_child("messages") {
            for message in child_elements(messages) {
                if message.name != "message" {
                    continue;
                }
                let msg_type = attr(message, "msgtype")?;
                let name = attr(message, "name")?;
                let category = match message.attributes.get("msgcat").map(String::as_str) {
                    Some("admin") => MessageCategory::Admin,
                    _ => MessageCategory::App,
                };
                let mut def = MessageDef::new(msg_type, name, category);
                let members = ctx.collect(message)?;
                for (tag, required) in members.fields {
                    def = def.with_field(tag, required);
                }
                for group in members.groups {
                    def = def.with_group(group);
                }
                dict.add_message(def);
            }
        }

        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    const SMALL_DICT: &str = r#"
<fix major="4" minor="2" servicepack="0" type="FIX">
 <header>
  <field name="BeginString" required="Y"/>
  <field name="BodyLength" required="Y"/>
  <field name="MsgType" required="Y"/>
  <field name="SenderCompID" required="Y"/>
  <field name="TargetCompID" required="Y"/>
  <field name="MsgSeqNum" required="Y"/>
  <field name="SendingTime" required="Y"/>
 </header>
 <trailer>
  <field name="CheckSum" required="Y"/>
 </trailer>
 <messages>
  <message name="Heartbeat" msgtype="0" msgcat="admin">
   <field name="TestReqID" required="N"/>
  </message>
  <message name="MarketDataSnapshotFullRefresh" msgtype="W" msgcat="app">
   <component name="Instrument" required="Y"/>
   <group name="NoMDEntries" required="Y">
    <field name="MDEntryType" required="Y"/>
    <field name="MDEntryPx" required="N"/>
   </group>
  </message>
 </messages>
 <components>
  <component name="Instrument">
   <field name="Symbol" required="Y"/>
  </component>
 </components>
 <fields>
  <field number="8" name="BeginString" type="STRING"/>
  <field number="9" name="BodyLength" type="LENGTH"/>
  <field number="10" name="CheckSum" type="STRING"/>
  <field number="34" name="MsgSeqNum" type="SEQNUM"/>
  <field number="35" name="MsgType" type="STRING"/>
  <field number="49" name="SenderCompID" type="STRING"/>
  <field number="52" name="SendingTime" type="UTCTIMESTAMP"/>
  <field number="55" name="Symbol" type="STRING"/>
  <field number="56" name="TargetCompID" type="STRING"/>
  <field number="112" name="TestReqID" type="STRING"/>
  <field number="268" name="NoMDEntries" type="NUMINGROUP"/>
  <field number="269" name="MDEntryType" type="CHAR">
   <value enum="0" description="BID"/>
   <value enum="1" description="OFFER"/>
  </field>
  <field number="270" name="MDEntryPx" type="PRICE"/>
 </fields>
</fix>
"#;

    #[test]
    fn test_load_small_dictionary() {
        let dict = Dictionary::from_xml(SMALL_DICT).unwrap();
        assert_eq!(dict.version, Version::Fix42);

        assert!(dict.is_header_field(49));
        assert!(dict.is_trailer_field(10));
        assert!(dict.is_msg_type("0"));
        assert!(dict.is_msg_type("W"));
        assert_eq!(dict.field_type(270), Some(FieldType::Price));
        assert_eq!(dict.field_by_name("Symbol").unwrap().tag, 55);
    }

    #[test]
    fn test_component_resolved_into_message() {
        let dict = Dictionary::from_xml(SMALL_DICT).unwrap();
        let md = dict.message("W").unwrap();
        assert!(md.permits(55), "Instrument component should contribute Symbol");
        let required: Vec<u32> = md.required_tags().collect();
        assert!(required.contains(&55));
    }

    #[test]
    fn test_group_parsed_with_delimiter() {
        let dict = Dictionary::from_xml(SMALL_DICT).unwrap();
        let group = dict.group("W", 268).unwrap();
        assert_eq!(group.delimiter_tag, 269);
        assert!(group.is_member(270));
        assert!(group.required);
    }

    #[test]
    fn test_enum_values_loaded() {
        let dict = Dictionary::from_xml(SMALL_DICT).unwrap();
        assert!(dict.is_field_value_valid(269, "0"));
        assert!(dict.is_field_value_valid(269, "1"));
        assert!(!dict.is_field_value_valid(269, "9"));
    }

    #[test]
    fn test_bad_root_rejected() {
        let err = Dictionary::from_xml("<notfix/>").unwrap_err();
        assert!(matches!(err, LoadError::BadRoot(_)));
    }

    #[test]
    fn test_undefined_field_reference_rejected() {
        let xml = r#"
<fix major="4" minor="2" type="FIX">
 <header><field name="Ghost" required="Y"/></header>
 <fields/>
</fix>"#;
        let err = Dictionary::from_xml(xml).unwrap_err();
        assert!(matches!(err, LoadError::UndefinedField(_)));
    }

    #[test]
    fn test_fixt_version_detected() {
        let xml = r#"
<fix major="1" minor="1" type="FIXT">
 <fields/>
</fix>"#;
        let dict = Dictionary::from_xml(xml).unwrap();
        assert_eq!(dict.version, Version::Fixt11);
    }
}
