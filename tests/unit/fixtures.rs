//! Native types shared by the scenario modules.

use std::f64::consts::PI;
use std::mem::offset_of;

use nativebind::{ClassBuilder, Engine, IntoValue, OperatorKind, ParamType, Value};

// =============================================================================
// Shapes
// =============================================================================

#[repr(C)]
pub struct Shape {
    pub area: f64,
}

#[repr(C)]
pub struct Circle {
    pub shape: Shape,
    pub radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        Self {
            shape: Shape {
                area: PI * radius * radius,
            },
            radius,
        }
    }
}

/// `Shape` with a const `area()` and `Circle` deriving from it at offset 0.
pub fn publish_shapes(engine: &mut Engine) {
    let shape = ClassBuilder::<Shape>::new("Shape")
        .const_method("area", &[], |ctx| {
            let shape = ctx.this::<Shape>()?;
            Ok(shape.area.into_value())
        })
        .property_readonly("area", |s: &Shape| s.area);
    engine.publish(shape).unwrap();

    let circle = ClassBuilder::<Circle>::new("Circle")
        .base::<Shape>(offset_of!(Circle, shape))
        .constructor(&[ParamType::FLOAT], |ctx| Ok(Circle::new(ctx.arg(0)?)))
        .field_readwrite("radius", radius, radius_mut);
    engine.publish(circle).unwrap();
}

fn radius(circle: &Circle) -> &f64 {
    &circle.radius
}

fn radius_mut(circle: &mut Circle) -> &mut f64 {
    &mut circle.radius
}

// =============================================================================
// Vector
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `Vector` with `+` for `(Vector, Vector)` and `(Vector, float)`.
pub fn publish_vector(engine: &mut Engine) {
    let vector = ParamType::const_object::<Vector>();
    let class = ClassBuilder::<Vector>::new("Vector")
        .constructor(&[ParamType::FLOAT, ParamType::FLOAT], |ctx| {
            let (x, y) = (ctx.arg(0)?, ctx.arg(1)?);
            Ok(Vector::new(x, y))
        })
        .operator(OperatorKind::Add, &[vector, vector], |ctx| {
            let (a, b) = (*ctx.object::<Vector>(0)?, *ctx.object::<Vector>(1)?);
            ctx.new_object(Vector::new(a.x + b.x, a.y + b.y))
        })
        .operator(OperatorKind::Add, &[vector, ParamType::FLOAT], |ctx| {
            let (a, k) = (*ctx.object::<Vector>(0)?, ctx.arg::<f64>(1)?);
            ctx.new_object(Vector::new(a.x + k, a.y + k))
        })
        .operator(OperatorKind::ToString, &[vector], |ctx| {
            let v = ctx.object::<Vector>(0)?;
            Ok(format!("Vector({}, {})", v.x, v.y).into_value())
        });
    engine.publish(class).unwrap();
}

pub fn vector_of(value: &Value) -> Vector {
    let handle = value.as_object().expect("not an object");
    *handle.get::<Vector>().expect("not a Vector")
}

// =============================================================================
// Diamond-free multiple inheritance: C derives from A and B
// =============================================================================

#[repr(C)]
pub struct A {
    pub a: u32,
}

#[repr(C)]
pub struct B {
    pub b: u64,
}

#[repr(C)]
pub struct C {
    pub a: A,
    pub b: B,
    pub c: i32,
}

pub fn publish_abc(engine: &mut Engine) {
    engine.publish(ClassBuilder::<A>::new("A")).unwrap();
    engine.publish(ClassBuilder::<B>::new("B")).unwrap();
    let class = ClassBuilder::<C>::new("C")
        .base::<A>(offset_of!(C, a))
        .base::<B>(offset_of!(C, b));
    engine.publish(class).unwrap();
}

pub fn c(a: u32, b: u64, c: i32) -> C {
    C {
        a: A { a },
        b: B { b },
        c,
    }
}
