//! # Definition Codecs
//!
//! A report definition (configuration, the three sections and the bound
//! data) can be written to and read from JSON and XML. Reading either format
//! back gives a tree that compares equal to the one written, and an equal
//! data store.
//!
//! The PDF bytes themselves go through [`crate::pdf`]; [`data_url`] wraps
//! them for embedding.

pub mod data_url;
pub mod json;
pub mod xml;

use crate::data::DataStore;
use crate::model::{ElementTree, ReportConfig};

/// Everything a definition document holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    pub config: ReportConfig,
    pub tree: ElementTree,
    pub data: DataStore,
}
