/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Dictionary
//!
//! FIX specification schema, loading and validation for the ferrofix
//! engine.
//!
//! This crate provides:
//! - **Schema definitions**: field, message and group definitions
//! - **Dictionary loading**: QuickFIX XML format parser
//! - **Runtime validation**: message validation against dictionary rules
//!   with SessionRejectReason mapping
//! - **Session defaults**: programmatic header/trailer/admin schema per
//!   FIX version

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::LoadError;
pub use schema::{
    Dictionary, FieldDef, FieldType, GroupDef, MessageCategory, MessageDef, USER_DEFINED_TAGS,
    Version,
};
pub use validate::{ValidationError, Validator};
