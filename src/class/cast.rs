//! Inheritance-aware casting and member lookup through base classes.
//!
//! Casting is a depth-first search over base edges in registration order. The
//! first path that reaches the target wins and its accumulated byte offset is
//! the answer. Multiple inheritance may offer several paths to the same base;
//! [`ClassDescriptor::cast_offsets`] lists every distinct offset so callers can
//! detect the ambiguity.

use std::ops::ControlFlow;
use std::ptr::NonNull;

use nativebind_core::{OperatorKind, TypeHash};
use rustc_hash::FxHashSet;

use super::descriptor::{ClassDescriptor, PropertyEntry};
use crate::overload::Overload;

/// Result of a successful cast search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastPath {
    /// Byte offset to add to a pointer to the source object.
    pub offset: isize,
    /// Number of base edges crossed; 0 for the identity cast.
    pub depth: u32,
}

impl CastPath {
    /// The identity cast.
    pub const IDENTITY: CastPath = CastPath {
        offset: 0,
        depth: 0,
    };

    fn through(self, edge_offset: isize) -> CastPath {
        CastPath {
            offset: edge_offset + self.offset,
            depth: self.depth + 1,
        }
    }
}

/// An overload found on `owner` while walking from a receiver class.
#[derive(Debug, Clone, Copy)]
pub struct MemberHit<'a, M> {
    /// The class that registered the member.
    pub owner: &'a ClassDescriptor,
    /// Path from the receiver class to `owner`.
    pub path: CastPath,
    /// The member itself.
    pub member: &'a M,
}

/// Add `offset` bytes to `ptr`.
///
/// # Safety
///
/// `offset` must come from a cast search on the class of the object `ptr`
/// points to, so that the result addresses a sub-object of that allocation.
#[inline]
pub unsafe fn apply_offset(ptr: NonNull<()>, offset: isize) -> NonNull<()> {
    // SAFETY: the caller guarantees the adjusted pointer stays inside the object.
    unsafe { NonNull::new_unchecked(ptr.as_ptr().byte_offset(offset)) }
}

impl ClassDescriptor {
    /// Byte offset that converts a pointer to this class into a pointer to
    /// `target`, or `None` when `target` is not this class or one of its bases.
    pub fn cast(&self, target: TypeHash) -> Option<isize> {
        self.cast_path(target).map(|path| path.offset)
    }

    /// Like [`cast`](Self::cast) but also reports how many edges were crossed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn cast_path(&self, target: TypeHash) -> Option<CastPath> {
        if self.type_hash == target {
            return Some(CastPath::IDENTITY);
        }
        self.bases.iter().find_map(|edge| {
            edge.base
                .cast_path(target)
                .map(|path| path.through(edge.offset))
        })
    }

    /// Every distinct offset at which `target` appears in this class's
    /// ancestry, in depth-first discovery order.
    pub fn cast_offsets(&self, target: TypeHash) -> Vec<isize> {
        let mut offsets = Vec::new();
        self.collect_offsets(target, 0, &mut offsets);
        offsets
    }

    fn collect_offsets(&self, target: TypeHash, base_offset: isize, out: &mut Vec<isize>) {
        if self.type_hash == target {
            if !out.contains(&base_offset) {
                out.push(base_offset);
            }
            return;
        }
        for edge in &self.bases {
            edge.base
                .collect_offsets(target, base_offset + edge.offset, out);
        }
    }

    /// Check if `target` is this class or one of its bases.
    pub fn is_derived_from(&self, target: TypeHash) -> bool {
        self.cast_path(target).is_some()
    }

    // =========================================================================
    // Member lookup
    // =========================================================================

    /// Visit this class and every ancestor once, depth-first, with the first
    /// path that reached it.
    pub fn walk<'a, B>(
        &'a self,
        visit: &mut impl FnMut(&'a ClassDescriptor, CastPath) -> ControlFlow<B>,
    ) -> Option<B> {
        let mut seen = FxHashSet::default();
        match self.walk_from(CastPath::IDENTITY, &mut seen, visit) {
            ControlFlow::Break(value) => Some(value),
            ControlFlow::Continue(()) => None,
        }
    }

    fn walk_from<'a, B>(
        &'a self,
        path: CastPath,
        seen: &mut FxHashSet<TypeHash>,
        visit: &mut impl FnMut(&'a ClassDescriptor, CastPath) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        if !seen.insert(self.type_hash) {
            return ControlFlow::Continue(());
        }
        visit(self, path)?;
        for edge in &self.bases {
            let through = path.through(edge.offset);
            edge.base.walk_from(through, seen, visit)?;
        }
        ControlFlow::Continue(())
    }

    /// Method overloads named `name` on this class and all its bases.
    ///
    /// Overloads of this class come first, then each base in depth-first order.
    pub fn find_methods(&self, name: &str) -> Vec<MemberHit<'_, Overload>> {
        let mut hits = Vec::new();
        self.walk::<()>(&mut |owner, path| {
            hits.extend(owner.methods(name).iter().map(|member| MemberHit {
                owner,
                path,
                member,
            }));
            ControlFlow::Continue(())
        });
        hits
    }

    /// Operator overloads of `kind` on this class and all its bases.
    pub fn find_operators(&self, kind: OperatorKind) -> Vec<MemberHit<'_, Overload>> {
        let mut hits = Vec::new();
        self.walk::<()>(&mut |owner, path| {
            hits.extend(owner.operators(kind).iter().map(|member| MemberHit {
                owner,
                path,
                member,
            }));
            ControlFlow::Continue(())
        });
        hits
    }

    /// The first property named `name` found on this class or a base.
    pub fn find_property(&self, name: &str) -> Option<MemberHit<'_, PropertyEntry>> {
        self.walk(&mut |owner, path| match owner.property(name) {
            Some(member) => ControlFlow::Break(MemberHit {
                owner,
                path,
                member,
            }),
            None => ControlFlow::Continue(()),
        })
    }
}
