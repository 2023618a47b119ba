//! EBML parsing for the WebM subset
//!
//! This module provides:
//! - Variable-width integer decoding (ids, sizes, track numbers)
//! - The WebM element schema (names, master/leaf, nesting)
//! - An incremental tokenizer that preserves exact wire bytes
//! - A filtered element source with subtree skipping

pub mod element;
pub mod parser;
pub mod schema;
pub mod source;
pub mod varint;

pub use element::Element;
pub use parser::Tokenizer;
pub use source::ElementSource;
