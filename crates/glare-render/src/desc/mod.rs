//! Declarative resource descriptions.
//!
//! Shaders, sprite sheets and sprite animations can be described in small
//! XML documents. This module reads them into an owned [`DescNode`] tree with
//! lenient, default-carrying attribute getters.

mod node;

pub use node::DescNode;
