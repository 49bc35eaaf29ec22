//! Build-phase description of a native class.
//!
//! A [`ClassBuilder`] collects everything a class exposes and is consumed by
//! [`ClassRegistry::publish`], which validates it and freezes it into a
//! [`ClassDescriptor`]. Nothing can be added to a class after publishing.
//!
//! # Example
//!
//! ```ignore
//! #[repr(C)]
//! struct Circle {
//!     shape: Shape,
//!     radius: f64,
//! }
//!
//! let circle = ClassBuilder::<Circle>::new("Circle")
//!     .base::<Shape>(std::mem::offset_of!(Circle, shape))
//!     .field_readwrite("radius", |c: &Circle| &c.radius, |c: &mut Circle| &mut c.radius)
//!     .const_method("area", &[], |ctx| {
//!         let c = ctx.this::<Circle>()?;
//!         Ok(Value::Float(std::f64::consts::PI * c.radius * c.radius))
//!     });
//! engine.publish(circle)?;
//! ```
//!
//! [`ClassRegistry::publish`]: crate::ClassRegistry::publish
//! [`ClassDescriptor`]: super::ClassDescriptor

use std::marker::PhantomData;
use std::sync::Arc;

use nativebind_core::{
    Holder, NativeError, OperatorKind, ParamType, RawHolder, SmartHolder, SmartPointer, TypeHash,
};

use super::descriptor::PropertyEntry;
use crate::native_fn::{CallContext, NativeFn};
use crate::overload::Overload;
use crate::value::{FromValue, IntoValue, Value};

/// Type-erased content of a [`ClassBuilder`], consumed by publish.
pub(crate) struct ClassDraft {
    pub(crate) name: String,
    pub(crate) type_hash: TypeHash,
    pub(crate) holder: Arc<dyn Holder>,
    pub(crate) bases: Vec<(TypeHash, isize)>,
    pub(crate) methods: Vec<(String, Overload)>,
    pub(crate) properties: Vec<(String, PropertyEntry)>,
    pub(crate) operators: Vec<(OperatorKind, Overload)>,
    pub(crate) constructors: Vec<Overload>,
}

/// Builder for registering a native type `T`.
///
/// Every overload is recorded in registration order; publish assigns them
/// increasing sequence numbers so that later registrations of an identical
/// signature shadow earlier ones.
pub struct ClassBuilder<T> {
    draft: ClassDraft,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ClassBuilder<T> {
    /// Start describing `T` under the script-visible `name`.
    ///
    /// The class uses raw mode until [`held_by`](Self::held_by) or
    /// [`holder`](Self::holder) picks another representation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            draft: ClassDraft {
                name: name.into(),
                type_hash: TypeHash::of::<T>(),
                holder: Arc::new(RawHolder::<T>::new()),
                bases: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
                operators: Vec::new(),
                constructors: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Registered class name.
    pub fn name(&self) -> &str {
        &self.draft.name
    }

    // =========================================================================
    // Representation
    // =========================================================================

    /// Store objects of this class through the smart pointer `P`.
    pub fn held_by<P: SmartPointer<T>>(self) -> Self {
        self.holder(SmartHolder::<T, P>::new())
    }

    /// Store objects of this class through a custom holder.
    ///
    /// Implementing [`Holder`] is `unsafe`: object handles dereference the
    /// pointer it extracts and trust its uniqueness answer without checks.
    pub fn holder(mut self, holder: impl Holder) -> Self {
        self.draft.holder = Arc::new(holder);
        self
    }

    /// Declare `B` as a base class whose sub-object lives `offset` bytes into `T`.
    ///
    /// Use `std::mem::offset_of!` on the embedded base field of a `#[repr(C)]`
    /// struct. `B` must already be published.
    pub fn base<B: 'static>(self, offset: usize) -> Self {
        // Offsets of fields inside one allocation always fit in isize.
        self.base_with_offset(TypeHash::of::<B>(), offset as isize)
    }

    /// Declare a base by identity with an explicit signed byte offset.
    pub fn base_with_offset(mut self, base: TypeHash, offset: isize) -> Self {
        self.draft.bases.push((base, offset));
        self
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Add a method overload callable on mutable objects only.
    pub fn method<F>(self, name: impl Into<String>, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, NativeError> + Send + Sync + 'static,
    {
        self.push_method(name.into(), params, false, NativeFn::new(f))
    }

    /// Add a method overload callable on both const and mutable objects.
    pub fn const_method<F>(self, name: impl Into<String>, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, NativeError> + Send + Sync + 'static,
    {
        self.push_method(name.into(), params, true, NativeFn::new(f))
    }

    fn push_method(
        mut self,
        name: String,
        params: &[ParamType],
        is_const: bool,
        thunk: NativeFn,
    ) -> Self {
        let overload = Overload::new(&name, params.to_vec(), is_const, thunk);
        self.draft.methods.push((name, overload));
        self
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Add a read/write property from a typed getter and setter.
    pub fn property<V, G, S>(mut self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        V: IntoValue + FromValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let entry = PropertyEntry {
            getter: typed_getter(getter),
            setter: Some(NativeFn::new(move |ctx: &mut CallContext<'_>| {
                let value = ctx.arg::<V>(0)?;
                setter(&mut *ctx.this_mut::<T>()?, value);
                Ok(Value::Nil)
            })),
        };
        self.draft.properties.push((name.into(), entry));
        self
    }

    /// Add a read-only property from a typed getter.
    pub fn property_readonly<V, G>(mut self, name: impl Into<String>, getter: G) -> Self
    where
        V: IntoValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let entry = PropertyEntry {
            getter: typed_getter(getter),
            setter: None,
        };
        self.draft.properties.push((name.into(), entry));
        self
    }

    /// Expose a field by reference, read/write.
    pub fn field_readwrite<V>(
        self,
        name: impl Into<String>,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self
    where
        V: Clone + IntoValue + FromValue + 'static,
    {
        self.property(
            name,
            move |this: &T| get(this).clone(),
            move |this: &mut T, value: V| *get_mut(this) = value,
        )
    }

    /// Add a property from raw thunks. A missing setter makes it read-only.
    pub fn property_fn(
        mut self,
        name: impl Into<String>,
        getter: NativeFn,
        setter: Option<NativeFn>,
    ) -> Self {
        self.draft
            .properties
            .push((name.into(), PropertyEntry { getter, setter }));
        self
    }

    // =========================================================================
    // Operators and constructors
    // =========================================================================

    /// Add an operator overload. `operands` lists every operand including the
    /// receiver; at least one of them must be this class.
    pub fn operator<F>(mut self, kind: OperatorKind, operands: &[ParamType], f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value, NativeError> + Send + Sync + 'static,
    {
        let thunk = NativeFn::new(f);
        let overload = Overload::new(&kind.to_string(), operands.to_vec(), false, thunk);
        self.draft.operators.push((kind, overload));
        self
    }

    /// Add a constructor. The thunk builds the native value; the engine wraps
    /// it in a new object through the class holder.
    pub fn constructor<F>(mut self, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<T, NativeError> + Send + Sync + 'static,
    {
        let thunk = NativeFn::new(move |ctx: &mut CallContext<'_>| {
            let value = f(ctx)?;
            ctx.new_object(value)
        });
        let overload = Overload::new("constructor", params.to_vec(), false, thunk);
        self.draft.constructors.push(overload);
        self
    }

    pub(crate) fn into_draft(self) -> ClassDraft {
        self.draft
    }
}

fn typed_getter<T, V, G>(getter: G) -> NativeFn
where
    T: 'static,
    V: IntoValue,
    G: Fn(&T) -> V + Send + Sync + 'static,
{
    NativeFn::new(move |ctx: &mut CallContext<'_>| {
        Ok(getter(&*ctx.this::<T>()?).into_value())
    })
}
