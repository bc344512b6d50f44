//! Version layers that ship with the crate.
//!
//! Each submodule exposes a `layer()` ready to be registered on a
//! [`VersionChain`](crate::VersionChain). Layers name their parent by version string; the chain
//! must also hold the parent (and its ancestors) before the grammar can be built.

pub mod v36;
