//! Casting through base edges and inherited member access.

use std::mem::offset_of;

use nativebind::{
    CallContext, ClassBuilder, DispatchError, Engine, EngineProperty, IntoValue, NativeError,
    ParamType, TypeHash, Value,
};

use super::fixtures::{self, A, B, C};

// =============================================================================
// Cast offsets
// =============================================================================

#[test]
fn test_cast_offsets_match_layout() {
    let mut engine = Engine::new();
    fixtures::publish_abc(&mut engine);
    let class = engine.registry().find(TypeHash::of::<C>()).unwrap();

    let a = offset_of!(C, a) as isize;
    let b = offset_of!(C, b) as isize;
    assert_eq!(class.cast(TypeHash::of::<C>()), Some(0));
    assert_eq!(class.cast(TypeHash::of::<A>()), Some(a));
    assert_eq!(class.cast(TypeHash::of::<B>()), Some(b));
    assert_eq!(class.cast(TypeHash::of::<u8>()), None);
    assert!(class.is_derived_from(TypeHash::of::<B>()));
}

#[test]
fn test_adjusted_pointer_views_base_fields() {
    let mut engine = Engine::new();
    fixtures::publish_abc(&mut engine);
    let value = engine.push_object(fixtures::c(7, 11, -3)).unwrap();
    let handle = value.as_object().unwrap();

    let native = handle.get::<C>().unwrap();
    let as_b = handle.ptr_as(TypeHash::of::<B>()).unwrap();
    assert_eq!(as_b.as_ptr() as *const B, &native.b as *const B);
    // SAFETY: the cast located the `B` sub-object of a live `C`.
    assert_eq!(unsafe { as_b.cast::<B>().as_ref() }.b, 11);

    let as_a = handle.ptr_as(TypeHash::of::<A>()).unwrap();
    assert_eq!(unsafe { as_a.cast::<A>().as_ref() }.a, 7);
}

fn bump(ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
    let mut b = ctx.this_mut::<B>()?;
    b.b += 1;
    Ok((b.b as i64).into_value())
}

fn sum(ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
    let c = ctx.this::<C>()?;
    Ok((c.a.a as i64 + c.b.b as i64 + c.c as i64).into_value())
}

#[test]
fn test_inherited_methods_receive_adjusted_receiver() {
    let mut engine = Engine::new();
    engine.publish(ClassBuilder::<A>::new("A")).unwrap();
    let b = ClassBuilder::<B>::new("B").method("bump", &[], bump);
    engine.publish(b).unwrap();
    let c = ClassBuilder::<C>::new("C")
        .base::<A>(offset_of!(C, a))
        .base::<B>(offset_of!(C, b))
        .const_method("sum", &[], sum);
    engine.publish(c).unwrap();

    let value = engine.push_object(fixtures::c(1, 40, 100)).unwrap();
    let bumped = engine.call_method(&value, "bump", &[]).unwrap();
    assert_eq!(bumped, Value::Int(41));
    let total = engine.call_method(&value, "sum", &[]).unwrap();
    assert_eq!(total, Value::Int(142));
}

// =============================================================================
// Repeated base: Left and Right both embed Root
// =============================================================================

#[repr(C)]
struct Root {
    id: u32,
}

#[allow(dead_code)]
#[repr(C)]
struct Left {
    root: Root,
}

#[allow(dead_code)]
#[repr(C)]
struct Right {
    root: Root,
}

#[allow(dead_code)]
#[repr(C)]
struct Joined {
    left: Left,
    right: Right,
}

struct Printer;

fn left(id: u32) -> Left {
    Left { root: Root { id } }
}

fn right(id: u32) -> Right {
    Right { root: Root { id } }
}

fn joined() -> Joined {
    Joined {
        left: left(1),
        right: right(2),
    }
}

fn root_id(ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
    Ok(ctx.this::<Root>()?.id.into_value())
}

fn id_of(ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
    Ok(ctx.object::<Root>(0)?.id.into_value())
}

fn tagged(tag: &'static str) -> impl Fn(&mut CallContext<'_>) -> Result<Value, NativeError> {
    move |_| Ok(tag.into_value())
}

fn publish_joined(engine: &mut Engine, left: ClassBuilder<Left>, right: ClassBuilder<Right>) {
    let root = ClassBuilder::<Root>::new("Root").const_method("id", &[], root_id);
    engine.publish(root).unwrap();
    let left = left.base::<Root>(offset_of!(Left, root));
    engine.publish(left).unwrap();
    let right = right.base::<Root>(offset_of!(Right, root));
    engine.publish(right).unwrap();
    let joined = ClassBuilder::<Joined>::new("Joined")
        .base::<Left>(offset_of!(Joined, left))
        .base::<Right>(offset_of!(Joined, right));
    engine.publish(joined).unwrap();
}

fn joined_engine(engine: &mut Engine) {
    let left = ClassBuilder::<Left>::new("Left");
    let right = ClassBuilder::<Right>::new("Right");
    publish_joined(engine, left, right);
    let params = [ParamType::const_object::<Root>()];
    let printer = ClassBuilder::<Printer>::new("Printer").const_method("id_of", &params, id_of);
    engine.publish(printer).unwrap();
}

#[test]
fn test_repeated_base_first_path_wins() {
    let mut engine = Engine::new();
    joined_engine(&mut engine);
    let class = engine.registry().find(TypeHash::of::<Joined>()).unwrap();

    let left_root = (offset_of!(Joined, left) + offset_of!(Left, root)) as isize;
    let right_root = (offset_of!(Joined, right) + offset_of!(Right, root)) as isize;
    assert_eq!(class.cast(TypeHash::of::<Root>()), Some(left_root));
    let offsets = class.cast_offsets(TypeHash::of::<Root>());
    assert_eq!(offsets, [left_root, right_root]);

    let value = engine.push_object(joined()).unwrap();
    let id = engine.call_method(&value, "id", &[]).unwrap();
    assert_eq!(id, Value::Int(1));
    let printer = engine.push_object(Printer).unwrap();
    let id = engine.call_method(&printer, "id_of", &[value]).unwrap();
    assert_eq!(id, Value::Int(1));
}

#[test]
fn test_strict_casts_reject_repeated_base() {
    let mut engine = Engine::new();
    engine.set_engine_property(EngineProperty::StrictCasts, 1);
    joined_engine(&mut engine);

    let printer = engine.push_object(Printer).unwrap();
    let value = engine.push_object(joined()).unwrap();
    let err = engine.call_method(&printer, "id_of", &[value]).unwrap_err();
    assert!(matches!(err, DispatchError::NoMatch { .. }));
    assert!(err.to_string().contains("ambiguous cast to Root"));

    let left = engine.push_object(left(5)).unwrap();
    let id = engine.call_method(&printer, "id_of", &[left]).unwrap();
    assert_eq!(id, Value::Int(5));
}

#[test]
fn test_max_base_depth_limits_argument_casts() {
    let mut engine = Engine::new();
    engine.set_engine_property(EngineProperty::MaxBaseDepth, 1);
    joined_engine(&mut engine);

    let printer = engine.push_object(Printer).unwrap();
    let left = engine.push_object(left(5)).unwrap();
    let id = engine.call_method(&printer, "id_of", &[left]).unwrap();
    assert_eq!(id, Value::Int(5));

    let value = engine.push_object(joined()).unwrap();
    let err = engine.call_method(&printer, "id_of", &[value]).unwrap_err();
    assert!(err.to_string().contains("no cast path from Joined to Root"));
}

// =============================================================================
// Same member reached through distinct bases
// =============================================================================

#[test]
fn test_same_signature_from_distinct_bases_is_ambiguous() {
    let mut engine = Engine::new();
    let lhs = ClassBuilder::<Left>::new("Left").const_method("f", &[], tagged("left"));
    let rhs = ClassBuilder::<Right>::new("Right").const_method("f", &[], tagged("right"));
    publish_joined(&mut engine, lhs, rhs);

    let value = engine.push_object(joined()).unwrap();
    let err = engine.call_method(&value, "f", &[]).unwrap_err();
    let DispatchError::Ambiguous { candidates, .. } = &err else {
        panic!("expected Ambiguous, got {err:?}");
    };
    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].starts_with("Left:f() const  [tied"));
    assert!(candidates[1].starts_with("Right:f() const  [tied"));

    let left = engine.push_object(left(5)).unwrap();
    let picked = engine.call_method(&left, "f", &[]).unwrap();
    assert_eq!(picked, Value::Str("left".into()));
}
