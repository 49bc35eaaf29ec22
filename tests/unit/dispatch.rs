//! Method and operator dispatch scenarios.

use std::f64::consts::PI;
use std::mem::offset_of;

use nativebind::{
    CallContext, Callee, ClassBuilder, DispatchError, Engine, EngineConfig, IntToFloat, IntoValue,
    NativeError, OperatorKind, ParamType, Selector, TypeHash, Value,
};

use super::fixtures::{self, A, B, C, Circle, Shape, Vector};
use super::init_tracing;

// =============================================================================
// Inherited methods
// =============================================================================

#[test]
fn test_area_inherited_from_shape() {
    init_tracing();
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);

    let circle = engine.push_object(Circle::new(2.0)).unwrap();
    let area = engine.call_method(&circle, "area", &[]).unwrap();
    assert_eq!(area, Value::Float(PI * 4.0));

    let circle_class = engine.registry().find(TypeHash::of::<Circle>()).unwrap();
    assert!(circle_class.methods("area").is_empty());
    assert_eq!(circle_class.find_methods("area").len(), 1);
}

#[test]
fn test_constructed_object_dispatches() {
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);

    let class = Callee::Class(TypeHash::of::<Circle>());
    let args = [Value::Float(1.0)];
    let circle = engine.call(class, Selector::Constructor, &args).unwrap();
    assert_eq!(engine.class_of(&circle).unwrap().name(), "Circle");
    let area = engine.call(Callee::Value(&circle), Selector::Method("area"), &[]);
    assert_eq!(area.unwrap(), Value::Float(PI));
    assert!(matches!(
        engine.construct(TypeHash::of::<Shape>(), &[]),
        Err(DispatchError::UnknownMember { .. })
    ));
}

// =============================================================================
// Operators and converters
// =============================================================================

#[test]
fn test_vector_plus_int_requires_converter() {
    init_tracing();
    let mut engine = Engine::new();
    fixtures::publish_vector(&mut engine);

    let args = [Value::Float(1.0), Value::Float(2.0)];
    let v = engine.construct(TypeHash::of::<Vector>(), &args).unwrap();

    let add = Selector::Operator(OperatorKind::Add);
    let three = [Value::Int(3)];
    let err = engine.call(Callee::Value(&v), add, &three).unwrap_err();
    let DispatchError::NoMatch {
        selector,
        arguments,
        candidates,
    } = &err
    else {
        panic!("expected NoMatch, got {err:?}");
    };
    assert_eq!(selector, "Vector:operator+");
    assert_eq!(arguments, "(Vector, int)");
    assert_eq!(candidates.len(), 2);
    let message = err.to_string();
    assert!(message.contains("Vector:operator+(const Vector, float)"));

    engine.register_converter(ParamType::FLOAT.identity(), IntToFloat);
    let sum = engine.call(Callee::Value(&v), add, &three).unwrap();
    assert_eq!(fixtures::vector_of(&sum), Vector::new(4.0, 5.0));
}

#[test]
fn test_converter_does_not_outrank_exact_match() {
    let mut engine = Engine::new();
    fixtures::publish_vector(&mut engine);
    engine.register_converter(ParamType::FLOAT.identity(), IntToFloat);

    let a = engine.push_object(Vector::new(1.0, 1.0)).unwrap();
    let b = engine.push_object(Vector::new(2.0, 3.0)).unwrap();
    let sum = engine.call_operator(OperatorKind::Add, &[a, b]).unwrap();
    assert_eq!(fixtures::vector_of(&sum), Vector::new(3.0, 4.0));
}

#[test]
fn test_to_string() {
    let mut engine = Engine::new();
    fixtures::publish_vector(&mut engine);
    fixtures::publish_shapes(&mut engine);

    let v = engine.push_object(Vector::new(1.5, -2.0)).unwrap();
    assert_eq!(engine.to_string(&v).unwrap(), "Vector(1.5, -2)");
    let circle = engine.push_object(Circle::new(1.0)).unwrap();
    assert_eq!(engine.to_string(&circle).unwrap(), "Circle object");
    assert_eq!(engine.to_string(&Value::Nil).unwrap(), "nil");
}

// =============================================================================
// Overload ranking
// =============================================================================

struct Printer;

fn tagged(tag: &'static str) -> impl Fn(&mut CallContext<'_>) -> Result<Value, NativeError> {
    move |_| Ok(tag.into_value())
}

#[test]
fn test_arity_selects_overload() {
    let mut engine = Engine::new();
    let pair = [ParamType::INT, ParamType::STR];
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("print", &[], tagged("none"))
        .const_method("print", &[ParamType::INT], tagged("int"))
        .const_method("print", &pair, tagged("int, string"))
        .const_method("print", &[ParamType::STR], tagged("string"));
    engine.publish(class).unwrap();
    let printer = engine.push_object(Printer).unwrap();

    let cases: [(&[Value], &str); 4] = [
        (&[], "none"),
        (&[Value::Int(1)], "int"),
        (&[Value::Int(1), Value::Str("x".into())], "int, string"),
        (&[Value::Str("x".into())], "string"),
    ];
    for (args, expected) in cases {
        let printed = engine.call_method(&printer, "print", args).unwrap();
        assert_eq!(printed, Value::Str(expected.into()));
    }
    assert!(matches!(
        engine.call_method(&printer, "print", &[Value::Bool(true)]),
        Err(DispatchError::NoMatch { .. })
    ));
}

#[test]
fn test_most_derived_parameter_wins() {
    let mut engine = Engine::new();
    fixtures::publish_abc(&mut engine);
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("show", &[ParamType::const_object::<B>()], tagged("B"))
        .const_method("show", &[ParamType::const_object::<C>()], tagged("C"));
    engine.publish(class).unwrap();
    let printer = engine.push_object(Printer).unwrap();
    let c = engine.push_object(fixtures::c(1, 2, 3)).unwrap();
    let b = engine.push_object(B { b: 2 }).unwrap();

    let shown = engine.call_method(&printer, "show", &[c]).unwrap();
    assert_eq!(shown, Value::Str("C".into()));
    let shown = engine.call_method(&printer, "show", &[b]).unwrap();
    assert_eq!(shown, Value::Str("B".into()));
}

#[test]
fn test_equal_cost_distinct_signatures_are_ambiguous() {
    let mut engine = Engine::new();
    fixtures::publish_abc(&mut engine);
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("show", &[ParamType::const_object::<A>()], tagged("A"))
        .const_method("show", &[ParamType::const_object::<B>()], tagged("B"))
        .const_method("show", &[ParamType::INT], tagged("int"));
    engine.publish(class).unwrap();
    let printer = engine.push_object(Printer).unwrap();
    let c = engine.push_object(fixtures::c(1, 2, 3)).unwrap();

    let err = engine.call_method(&printer, "show", &[c]).unwrap_err();
    let DispatchError::Ambiguous { candidates, .. } = &err else {
        panic!("expected Ambiguous, got {err:?}");
    };
    assert_eq!(candidates.len(), 3);
    assert!(candidates[0].contains("[tied, cost"));
    assert!(candidates[1].contains("[tied, cost"));
    assert!(candidates[2].starts_with("Printer:show(int)"));
}

#[test]
fn test_identical_signature_latest_registration_wins() {
    init_tracing();
    let mut engine = Engine::new();
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("f", &[ParamType::INT], tagged("first"))
        .const_method("f", &[ParamType::INT], tagged("second"));
    engine.publish(class).unwrap();
    let printer = engine.push_object(Printer).unwrap();
    let picked = engine.call_method(&printer, "f", &[Value::Int(0)]).unwrap();
    assert_eq!(picked, Value::Str("second".into()));
}

#[test]
fn test_strict_overloads_reject_duplicates() {
    let config = EngineConfig::new().with_strict_overloads(true);
    let mut engine = Engine::with_config(config);
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("f", &[ParamType::INT], tagged("first"))
        .const_method("f", &[ParamType::INT], tagged("second"));
    let err = engine.publish(class).unwrap_err();
    assert!(err.to_string().contains("twice"));
    assert!(engine.registry().is_empty());
}

#[test]
fn test_derived_override_beats_inherited_method() {
    let mut engine = Engine::new();
    let shape = ClassBuilder::<Shape>::new("Shape").const_method("name", &[], tagged("shape"));
    engine.publish(shape).unwrap();
    let circle = ClassBuilder::<Circle>::new("Circle")
        .base::<Shape>(offset_of!(Circle, shape))
        .const_method("name", &[], tagged("circle"));
    engine.publish(circle).unwrap();

    let circle = engine.push_object(Circle::new(1.0)).unwrap();
    let shape = engine.push_object(Shape { area: 0.0 }).unwrap();
    let name = engine.call_method(&circle, "name", &[]).unwrap();
    assert_eq!(name, Value::Str("circle".into()));
    let name = engine.call_method(&shape, "name", &[]).unwrap();
    assert_eq!(name, Value::Str("shape".into()));
}

// =============================================================================
// Re-entrancy and failures
// =============================================================================

fn measure(ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
    let shape = ctx.raw_value(0)?;
    let area = ctx
        .engine()
        .call_method(shape, "area", &[])
        .map_err(|err| NativeError::other(err.to_string()))?;
    Ok(format!("area={area}").into_value())
}

#[test]
fn test_thunk_reenters_engine() {
    let mut engine = Engine::new();
    fixtures::publish_shapes(&mut engine);
    let shape = [ParamType::const_object::<Shape>()];
    let class = ClassBuilder::<Printer>::new("Printer");
    let class = class.const_method("measure", &shape, measure);
    engine.publish(class).unwrap();

    let printer = engine.push_object(Printer).unwrap();
    let circle = engine.push_object(Circle::new(1.0)).unwrap();
    let measured = engine.call_method(&printer, "measure", &[circle]).unwrap();
    assert_eq!(measured, Value::Str(format!("area={PI}")));
}

#[test]
fn test_native_error_propagates() {
    let mut engine = Engine::new();
    let class = ClassBuilder::<Printer>::new("Printer")
        .const_method("fail", &[], |_| Err(NativeError::other("boom")));
    engine.publish(class).unwrap();
    let printer = engine.push_object(Printer).unwrap();
    let err = engine.call_method(&printer, "fail", &[]).unwrap_err();
    assert!(matches!(err, DispatchError::Native(_)));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn test_call_on_primitive_is_not_an_object() {
    let engine = Engine::new();
    assert!(matches!(
        engine.call_method(&Value::Str("s".into()), "len", &[]),
        Err(DispatchError::NotAnObject {
            actual: "string",
            ..
        })
    ));
}
