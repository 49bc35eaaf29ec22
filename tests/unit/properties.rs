//! Property access through the engine.

use std::cell::Cell;
use std::f64::consts::PI;

use nativebind::{CallContext, ClassBuilder, DispatchError, Engine, NativeError, NativeFn, Value};

use super::fixtures::{self, Circle};

#[test]
fn test_field_read_write() {
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);
    let circle = engine.push_object(Circle::new(1.0)).unwrap();

    let radius = engine.get_property(&circle, "radius").unwrap();
    assert_eq!(radius, Value::Float(1.0));
    let wider = Value::Float(2.5);
    engine.set_property(&circle, "radius", wider).unwrap();
    let radius = engine.get_property(&circle, "radius").unwrap();
    assert_eq!(radius, Value::Float(2.5));
}

#[test]
fn test_inherited_property_reads_base_subobject() {
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);
    let circle = engine.push_object(Circle::new(2.0)).unwrap();
    let area = engine.get_property(&circle, "area").unwrap();
    assert_eq!(area, Value::Float(PI * 4.0));
}

#[test]
fn test_property_failures() {
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);
    let circle = engine.push_object(Circle::new(1.0)).unwrap();

    assert!(matches!(
        engine.set_property(&circle, "area", Value::Float(0.0)),
        Err(DispatchError::ReadOnlyProperty { .. })
    ));
    assert!(matches!(
        engine.get_property(&circle, "diameter"),
        Err(DispatchError::UnknownMember { .. })
    ));
    assert!(matches!(
        engine.set_property(&circle, "radius", Value::Str("big".into())),
        Err(DispatchError::Native(NativeError::Conversion(_)))
    ));
    assert!(matches!(
        engine.get_property(&Value::Int(3), "radius"),
        Err(DispatchError::NotAnObject { .. })
    ));

    let frozen = engine.push_const_object(Circle::new(1.0)).unwrap();
    let radius = engine.get_property(&frozen, "radius").unwrap();
    assert_eq!(radius, Value::Float(1.0));
    assert!(matches!(
        engine.set_property(&frozen, "radius", Value::Float(3.0)),
        Err(DispatchError::ConstViolation { .. })
    ));
}

struct Counter {
    hits: Cell<i64>,
}

#[test]
fn test_raw_property_thunks() {
    let mut engine = Engine::new();
    let hits = NativeFn::new(|ctx: &mut CallContext<'_>| {
        let counter = ctx.this::<Counter>()?;
        counter.hits.set(counter.hits.get() + 1);
        Ok(Value::Int(counter.hits.get()))
    });
    let class = ClassBuilder::<Counter>::new("Counter").property_fn("hits", hits, None);
    engine.publish(class).unwrap();

    let counter = Counter { hits: Cell::new(0) };
    let counter = engine.push_object(counter).unwrap();
    let first = engine.get_property(&counter, "hits").unwrap();
    let second = engine.get_property(&counter, "hits").unwrap();
    assert_eq!((first, second), (Value::Int(1), Value::Int(2)));
    assert!(matches!(
        engine.set_property(&counter, "hits", Value::Int(0)),
        Err(DispatchError::ReadOnlyProperty { .. })
    ));
}
