//! Property tests for casting, overload selection and held storage.

use std::ptr::NonNull;
use std::sync::Arc;

use proptest::prelude::*;

use nativebind::{
    CallContext, ClassBuilder, Engine, Holder, NativeError, ParamType, SmartHolder, TypeHash, Value,
};

use super::fixtures::{self, A, B, C};

struct L0;
struct L1;
struct L2;
struct L3;

/// Chain `L3 -> L2 -> L1 -> L0` with the given edge offsets.
fn chain(offsets: [isize; 3]) -> Engine {
    let mut engine = Engine::new();
    engine.publish(ClassBuilder::<L0>::new("L0")).unwrap();
    let base = TypeHash::of::<L0>();
    let l1 = ClassBuilder::<L1>::new("L1").base_with_offset(base, offsets[0]);
    engine.publish(l1).unwrap();
    let base = TypeHash::of::<L1>();
    let l2 = ClassBuilder::<L2>::new("L2").base_with_offset(base, offsets[1]);
    engine.publish(l2).unwrap();
    let base = TypeHash::of::<L2>();
    let l3 = ClassBuilder::<L3>::new("L3").base_with_offset(base, offsets[2]);
    engine.publish(l3).unwrap();
    engine
}

fn tag(index: i64) -> impl Fn(&mut CallContext<'_>) -> Result<Value, NativeError> {
    move |_| Ok(Value::Int(index))
}

struct Target;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cast_sums_edge_offsets(offsets in prop::array::uniform3(-256isize..256)) {
        let engine = chain(offsets);
        let l3 = engine.registry().find(TypeHash::of::<L3>()).unwrap();

        let path = l3.cast_path(TypeHash::of::<L0>()).unwrap();
        prop_assert_eq!(path.offset, offsets.iter().sum::<isize>());
        prop_assert_eq!(path.depth, 3);
        prop_assert_eq!(l3.cast(TypeHash::of::<L2>()), Some(offsets[2]));
        prop_assert_eq!(l3.cast(TypeHash::of::<L3>()), Some(0));

        let l0 = engine.registry().find(TypeHash::of::<L0>()).unwrap();
        prop_assert_eq!(l0.cast(TypeHash::of::<L3>()), None);
    }

    #[test]
    fn prop_base_view_matches_direct_view(a in any::<u32>(), b in any::<u64>(), c in any::<i32>()) {
        let mut engine = Engine::new();
        fixtures::publish_abc(&mut engine);
        let value = engine.push_object(fixtures::c(a, b, c)).unwrap();
        let handle = value.as_object().unwrap();
        let direct = handle.get::<C>().unwrap();

        let as_a = handle.ptr_as(TypeHash::of::<A>()).unwrap();
        let as_b = handle.ptr_as(TypeHash::of::<B>()).unwrap();
        // SAFETY: both casts address sub-objects of the live `C`.
        let (view_a, view_b) = unsafe { (as_a.cast::<A>().as_ref(), as_b.cast::<B>().as_ref()) };
        prop_assert_eq!(view_a.a, direct.a.a);
        prop_assert_eq!(view_b.b, direct.b.b);
        prop_assert!(std::ptr::eq(view_b, &direct.b));
    }

    #[test]
    fn prop_arity_picks_unique_overload(count in 1usize..6, call in 0usize..6) {
        let mut builder = ClassBuilder::<Target>::new("Target");
        for arity in 0..count {
            builder = builder.const_method("f", &vec![ParamType::INT; arity], tag(arity as i64));
        }
        let mut engine = Engine::new();
        engine.publish(builder).unwrap();
        let target = engine.push_object(Target).unwrap();

        let args = vec![Value::Int(0); call];
        let result = engine.call_method(&target, "f", &args);
        if call < count {
            prop_assert_eq!(result.unwrap(), Value::Int(call as i64));
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn prop_latest_identical_overload_wins(copies in 1i64..8) {
        let mut builder = ClassBuilder::<Target>::new("Target");
        for index in 0..copies {
            builder = builder.const_method("f", &[ParamType::INT], tag(index));
        }
        let mut engine = Engine::new();
        engine.publish(builder).unwrap();
        let target = engine.push_object(Target).unwrap();
        prop_assert_eq!(
            engine.call_method(&target, "f", &[Value::Int(1)]).unwrap(),
            Value::Int(copies - 1)
        );
    }

    #[test]
    fn prop_held_extract_returns_constructed_pointer(payload in any::<u64>()) {
        let holder = SmartHolder::<u64, Arc<u64>>::new();
        let layout = holder.storage_layout();
        let raw = NonNull::new(Arc::into_raw(Arc::new(payload)) as *mut ()).unwrap();

        // SAFETY: fresh slot with the holder's layout; `raw` comes from `Arc::into_raw`.
        let (extracted, seen) = unsafe {
            let slot = NonNull::new(std::alloc::alloc(layout)).unwrap();
            holder.construct(slot, raw);
            let extracted = holder.extract(slot);
            let seen = *extracted.cast::<u64>().as_ref();
            holder.destroy(slot);
            std::alloc::dealloc(slot.as_ptr(), layout);
            (extracted, seen)
        };
        prop_assert_eq!(extracted, raw);
        prop_assert_eq!(seen, payload);
    }
}
