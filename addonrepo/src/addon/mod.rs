//! Add-on identity: ids, versions and self-descriptions.
//!
//! An add-on is an opaque directory tree with an `addon.ini` at its root.
//! This module only understands the descriptor; the rest of the tree is
//! archived as-is by the builder.

mod descriptor;
mod id;
mod version;

pub use descriptor::{
    has_descriptor, parse_descriptor, read_descriptor, AddonDescriptor, DescriptorError,
    DESCRIPTOR_FILENAME,
};
pub use id::{AddonId, MAX_ID_LEN};
pub use version::{AddonVersion, VersionScheme};
