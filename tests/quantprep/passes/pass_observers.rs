use std::collections::HashSet;

use anyhow::Result;
use quantprep::{
    insert_observer_nodes, insert_observer_nodes_for_function, insert_observer_nodes_for_method,
    AttrValue, Function, Graph, Module, NodeTemplate, QuantError, Scope, ValueType,
};

use crate::common::{self, OBSERVER_KIND};

#[test]
fn observes_activation_inputs_and_node_outputs() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    g.add_input("steps", ValueType::Int);
    let w = g.add_input("w", ValueType::Tensor);
    let shift = common::constant(&mut g, top, AttrValue::Float(0.5))?;
    let (_, outs) = common::op(&mut g, top, "aten::add", &[x, w, shift], &["a"])?;
    let a = outs[0];
    let (relu, r) = common::relu(&mut g, top, a, "r")?;
    g.register_output(r)?;

    // x and steps are activations, w is a parameter.
    let observers = insert_observer_nodes(&mut g, &common::observer(), 2)?;
    g.verify_uses()?;

    // x, a and r; steps is not a tensor and the constant is skipped.
    assert_eq!(observers.len(), 3);
    assert_eq!(common::nodes_of_kind(&g, OBSERVER_KIND).len(), 3);
    let observed: HashSet<_> = observers
        .iter()
        .map(|&node| g.node(node).map(|n| n.inputs()[0]))
        .collect::<Result<_>>()?;
    assert_eq!(observed, HashSet::from([x, a, r]));
    assert!(g.find_value("w.observed").is_none());
    assert!(g.find_value("steps.observed").is_none());

    // The observer of r sits right after the relu, and nothing was rewired.
    let r_observer = observers[2];
    assert_eq!(common::position(&g, r_observer)?, common::position(&g, relu)? + 1);
    assert_eq!(g.outputs(), &[r]);
    let out = common::output(&g, r_observer)?;
    assert_eq!(g.value(out)?.name(), "r.observed");
    assert_eq!(g.value(out)?.ty(), ValueType::Tensor);
    assert!(g.value(out)?.uses().is_empty());
    Ok(())
}

#[test]
fn observer_reads_value_and_its_name() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    common::relu(&mut g, top, x, "r")?;

    let observers = insert_observer_nodes(&mut g, &common::observer(), 1)?;
    for node in observers {
        let data = g.node(node)?;
        assert_eq!(data.inputs().len(), 2);
        let observed = g.value(data.inputs()[0])?.name().to_string();
        assert_eq!(
            common::constant_payload(&g, data.inputs()[1])?,
            AttrValue::Str(observed)
        );
    }
    Ok(())
}

#[test]
fn input_observers_lead_the_top_block() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let y = g.add_input("y", ValueType::Tensor);
    common::op(&mut g, top, "aten::add", &[x, y], &["s"])?;
    g.set_entry_scope(Scope::new("forward"));

    let observers = insert_observer_nodes(&mut g, &common::observer(), 2)?;
    assert_eq!(
        common::kinds_in(&g, top)?,
        vec![
            "prim::Constant",
            OBSERVER_KIND,
            "prim::Constant",
            OBSERVER_KIND,
            "prim::Constant",
            "aten::add",
            OBSERVER_KIND,
        ]
    );
    assert_eq!(g.node(observers[0])?.scope(), &Scope::new("forward"));
    assert_eq!(g.node(observers[0])?.inputs()[0], x);
    assert_eq!(g.node(observers[1])?.inputs()[0], y);
    Ok(())
}

#[test]
fn empty_graph_inputs_are_still_observed() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    g.add_input("x", ValueType::Tensor);
    let observers = insert_observer_nodes(&mut g, &common::observer(), 1)?;
    assert_eq!(observers.len(), 1);
    assert_eq!(
        common::kinds_in(&g, top)?,
        vec!["prim::Constant", OBSERVER_KIND]
    );
    Ok(())
}

#[test]
fn observers_are_not_observed_within_one_run() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    common::relu(&mut g, top, x, "r")?;

    let first = insert_observer_nodes(&mut g, &common::observer(), 1)?;
    assert_eq!(first.len(), 2);
    for node in common::nodes_of_kind(&g, OBSERVER_KIND) {
        let read = g.node(node)?.inputs()[0];
        let producer = g.producer_node(read)?;
        if let Some(producer) = producer {
            assert_ne!(g.node(producer)?.kind(), OBSERVER_KIND);
        }
    }

    // A second run only excludes its own clones: x, r and both earlier
    // observer outputs are observed again.
    let second = insert_observer_nodes(&mut g, &common::observer(), 1)?;
    assert_eq!(second.len(), 4);
    g.verify_uses()?;
    Ok(())
}

#[test]
fn observers_follow_values_into_sub_blocks() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let body_node = g.create_node("prim::Loop", Scope::root());
    let body = g.add_block_to_node(body_node)?;
    g.append_node(top, body_node)?;
    let (inner, _) =
        common::op_in_scope(&mut g, body, "aten::neg", &[x], &["n"], Scope::new("loop/neg"))?;

    let observers = insert_observer_nodes(&mut g, &common::observer(), 0)?;
    assert_eq!(observers.len(), 1);
    let observer = g.node(observers[0])?;
    assert_eq!(observer.owner(), Some(body));
    assert_eq!(observer.scope(), &Scope::new("loop/neg"));
    assert_eq!(common::position(&g, observers[0])?, common::position(&g, inner)? + 1);
    Ok(())
}

#[test]
fn clone_keeps_template_attributes_and_inputs() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let module = g.add_input("self", ValueType::None);
    common::relu(&mut g, top, x, "r")?;
    let template = NodeTemplate::new(OBSERVER_KIND)
        .with_attr("name", AttrValue::Str("histogram".to_string()))
        .with_input(module);

    let observers = insert_observer_nodes(&mut g, &template, 0)?;
    assert_eq!(observers.len(), 1);
    let data = g.node(observers[0])?;
    assert_eq!(
        data.attrs().get("name"),
        Some(&AttrValue::Str("histogram".to_string()))
    );
    assert_eq!(data.inputs()[0], module);
    assert_eq!(g.value(data.inputs()[1])?.name(), "r");
    Ok(())
}

#[test]
fn too_many_activation_inputs_is_a_precondition_violation() -> Result<()> {
    let mut g = Graph::new();
    g.add_input("x", ValueType::Tensor);
    let err = insert_observer_nodes(&mut g, &common::observer(), 2).unwrap_err();
    assert!(matches!(err, QuantError::PreconditionViolation(_)));
    assert_eq!(g.node_count(), 0);
    Ok(())
}

#[test]
fn template_without_kind_is_a_precondition_violation() -> Result<()> {
    let mut g = Graph::new();
    g.add_input("x", ValueType::Tensor);
    let err = insert_observer_nodes(&mut g, &NodeTemplate::new(""), 1).unwrap_err();
    assert!(matches!(err, QuantError::PreconditionViolation(_)));
    Ok(())
}

#[test]
fn foreign_template_input_leaves_graph_untouched() -> Result<()> {
    let mut other = Graph::new();
    for name in ["a", "b", "c", "d"] {
        other.add_input(name, ValueType::Tensor);
    }
    let foreign = other.add_input("foreign", ValueType::None);

    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    common::relu(&mut g, top, x, "r")?;
    let before = g.to_string();
    let nodes_before = g.node_count();

    let template = common::observer().with_input(foreign);
    let err = insert_observer_nodes(&mut g, &template, 1).unwrap_err();
    assert!(matches!(err, QuantError::PreconditionViolation(_)));
    assert_eq!(g.node_count(), nodes_before);
    assert_eq!(g.to_string(), before);
    Ok(())
}

fn method_graph() -> Result<Graph> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let weight = g.add_input("weight", ValueType::Tensor);
    common::op(&mut g, top, "aten::matmul", &[x, weight], &["y"])?;
    Ok(g)
}

#[test]
fn method_observation_uses_positional_input_count() -> Result<()> {
    let mut module = Module::new("Net");
    module.add_method(Function::new("forward", method_graph()?, 1)?);
    assert_eq!(module.method_names().collect::<Vec<_>>(), vec!["forward"]);

    let observers = insert_observer_nodes_for_method(&mut module, "forward", &common::observer())?;
    // x and y; the bound weight is not an activation.
    assert_eq!(observers.len(), 2);
    let graph = module.method("forward").expect("forward").graph();
    assert!(graph.find_value("x.observed").is_some());
    assert!(graph.find_value("weight.observed").is_none());
    Ok(())
}

#[test]
fn unknown_method_is_a_precondition_violation() -> Result<()> {
    let mut module = Module::new("Net");
    module.add_method(Function::new("forward", method_graph()?, 1)?);
    let err = insert_observer_nodes_for_method(&mut module, "backward", &common::observer())
        .unwrap_err();
    assert!(matches!(err, QuantError::PreconditionViolation(_)));
    Ok(())
}

#[test]
fn function_observation_covers_every_input() -> Result<()> {
    let mut function = Function::from_graph("matmul", method_graph()?);
    let observers = insert_observer_nodes_for_function(&mut function, &common::observer())?;
    assert_eq!(observers.len(), 3);
    assert!(function.graph().find_value("weight.observed").is_some());
    Ok(())
}

#[test]
fn function_rejects_input_count_beyond_graph() -> Result<()> {
    assert!(Function::new("forward", method_graph()?, 3).is_err());
    Ok(())
}
