//! Class descriptors: building, publishing and casting.

mod builder;
mod cast;
mod descriptor;

pub use builder::ClassBuilder;
pub(crate) use builder::ClassDraft;
pub use cast::{CastPath, MemberHit, apply_offset};
pub use descriptor::{BaseEdge, ClassDescriptor, PropertyEntry};
