//! Property-based invariant tests for the binding evaluator.
//!
//! **Read-set:**
//! 1. After any evaluation the dependencies are exactly the distinct sources
//!    that evaluation read, in first-read order.
//! 2. Changing a source outside the current read-set never re-evaluates.
//! 3. Changing a source inside the read-set re-evaluates exactly once.
//!
//! **Write-back:**
//! 4. Int, double, bool and string results land unchanged in a property of
//!    the same type.
//! 5. Double results written to an int property follow `ToInt32`.
//!
//! **Enable/disable:**
//! 6. Evaluations equal the number of disabled → enabled transitions, for
//!    any sequence of enable/disable calls.

use std::cell::RefCell;
use std::rc::Rc;

use propflow_core::coerce::to_int32;
use propflow_core::{
    ClassId, CompiledFunction, DynValue, Interpreter, NativeValue, Notifier, ObjectGraph, ObjectId, Scope,
    SourceLocation, TypeRegistry, TypeTag, WriteFlags,
};
use propflow_runtime::{Binding, BindingContext, BindingExpression, BindingOptions, BindingTarget};
use proptest::prelude::*;

const POOL: usize = 4;

fn graph() -> (ObjectGraph, ClassId) {
    let mut reg = TypeRegistry::new();
    let item = reg
        .define_class("Item", None)
        .property("width", TypeTag::Double)
        .property("count", TypeTag::Int)
        .property("flag", TypeTag::Bool)
        .property("label", TypeTag::String)
        .finish();
    (ObjectGraph::new(reg), item)
}

fn distinct_in_order(reads: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    for &r in reads {
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}

// ── Strategies ────────────────────────────────────────────────────────────

fn read_plan_strategy() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..POOL, 0..=8)
}

fn plans_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    proptest::collection::vec(read_plan_strategy(), 1..=6)
}

fn primitive_strategy() -> impl Strategy<Value = (&'static str, DynValue, NativeValue)> {
    prop_oneof![
        any::<i32>().prop_map(|i| ("count", DynValue::Int(i), NativeValue::Int(i))),
        (-1.0e12f64..1.0e12).prop_map(|d| ("width", DynValue::Double(d), NativeValue::Double(d))),
        any::<bool>().prop_map(|b| ("flag", DynValue::Bool(b), NativeValue::Bool(b))),
        "[a-zA-Z0-9 ]{0,16}".prop_map(|s| ("label", DynValue::string(&s), NativeValue::String(s))),
    ]
}

// ── Read-set ──────────────────────────────────────────────────────────────

struct PlanFixture {
    graph: ObjectGraph,
    sources: Vec<ObjectId>,
    plan: Rc<RefCell<Vec<usize>>>,
    binding: Rc<Binding>,
}

fn plan_fixture() -> PlanFixture {
    let (graph, item) = graph();
    let target = graph.create(item);
    let sources: Vec<ObjectId> = (0..POOL).map(|_| graph.create(item)).collect();
    let plan = Rc::new(RefCell::new(Vec::new()));

    let reads = Rc::clone(&plan);
    let objects = sources.clone();
    let f = CompiledFunction::native("sum", SourceLocation::new("plan.ui", 1, 1), move |cx| {
        let order = reads.borrow().clone();
        let mut total = 0.0;
        for i in order {
            total += cx.get(objects[i], "width")?.as_number().unwrap_or(0.0);
        }
        Ok(DynValue::Double(total))
    });
    let cx = BindingContext::new(graph.clone(), Rc::new(Interpreter));
    let binding = Binding::bind(&cx, target, "width", f).unwrap();
    PlanFixture {
        graph,
        sources,
        plan,
        binding,
    }
}

impl PlanFixture {
    fn dependency_objects(&self) -> Vec<usize> {
        self.binding
            .dependencies()
            .iter()
            .map(|e| {
                let object = e.object.unwrap();
                self.sources.iter().position(|s| *s == object).unwrap()
            })
            .collect()
    }
}

proptest! {
    #[test]
    fn read_set_matches_last_evaluation(plans in plans_strategy()) {
        let fx = plan_fixture();
        for plan in plans {
            *fx.plan.borrow_mut() = plan.clone();
            fx.binding.expression_changed();
            prop_assert_eq!(fx.dependency_objects(), distinct_in_order(&plan));
        }
    }
}

proptest! {
    #[test]
    fn only_read_sources_trigger(plan in read_plan_strategy(), poke in 0..POOL, value in 1.0f64..100.0) {
        let fx = plan_fixture();
        *fx.plan.borrow_mut() = plan.clone();
        fx.binding.expression_changed();
        let before = fx.binding.evaluation_count();

        fx.graph.set(fx.sources[poke], "width", NativeValue::Double(value)).unwrap();
        let expected = if plan.contains(&poke) { before + 1 } else { before };
        prop_assert_eq!(fx.binding.evaluation_count(), expected);
    }
}

// ── Write-back ────────────────────────────────────────────────────────────

fn bind_context_value(value: DynValue, path: &str) -> (ObjectGraph, ObjectId, Notifier<DynValue>) {
    let (graph, item) = graph();
    let target = graph.create(item);
    let v = Notifier::new("v", value);
    let cx = BindingContext::new(graph.clone(), Rc::new(Interpreter))
        .with_scope(Scope::new().with_context_value("v", v.clone()));
    Binding::bind(&cx, target, path, BindingExpression::source("v", "prop.ui", 1)).unwrap();
    (graph, target, v)
}

proptest! {
    #[test]
    fn primitive_results_round_trip((path, dynamic, native) in primitive_strategy()) {
        let (graph, target, _v) = bind_context_value(dynamic, path);
        prop_assert_eq!(graph.get(target, path).unwrap(), native);
    }
}

proptest! {
    #[test]
    fn double_to_int_follows_to_int32(d in -1.0e10f64..1.0e10) {
        let (graph, target, _v) = bind_context_value(DynValue::Double(d), "count");
        prop_assert_eq!(graph.get(target, "count").unwrap(), NativeValue::Int(to_int32(d)));
    }
}

// ── Enable/disable ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn evaluations_count_enable_transitions(ops in proptest::collection::vec(any::<bool>(), 0..=16)) {
        let (graph, item) = graph();
        let target = graph.create(item);
        let cx = BindingContext::new(graph.clone(), Rc::new(Interpreter));
        let binding = Binding::create(
            &cx,
            BindingTarget::resolve(&graph, target, "count").unwrap(),
            BindingExpression::source("1", "prop.ui", 1),
            BindingOptions::default(),
        )
        .unwrap();

        let mut enabled = false;
        let mut transitions = 0u64;
        for enable in ops {
            if enable && !enabled {
                transitions += 1;
            }
            enabled = enable;
            binding.set_enabled(enable, WriteFlags::empty());
            prop_assert_eq!(binding.is_enabled(), enabled);
        }
        prop_assert_eq!(binding.evaluation_count(), transitions);
    }
}
