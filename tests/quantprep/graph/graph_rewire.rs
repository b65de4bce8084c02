use anyhow::Result;
use std::collections::HashMap;

use quantprep::{
    describe_node, AttrValue, Graph, InsertPoint, NodeTemplate, Scope, Use, User, ValueRemap,
    ValueType,
};

use crate::common;

#[test]
fn replace_all_uses_moves_node_inputs_and_block_outputs() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let y = g.add_input("y", ValueType::Tensor);
    let (a, _) = common::unary(&mut g, top, "aten::neg", x, "a")?;
    let (b, _) = common::op(&mut g, top, "aten::add", &[x, x], &["b"])?;
    g.register_output(x)?;

    g.replace_all_uses_with(x, y)?;
    g.verify_uses()?;
    assert!(g.value(x)?.uses().is_empty());
    assert_eq!(g.value(y)?.uses().len(), 4);
    assert_eq!(g.node(a)?.inputs(), &[y]);
    assert_eq!(g.node(b)?.inputs(), &[y, y]);
    assert_eq!(g.outputs(), &[y]);
    // The producer of x never changes.
    assert_eq!(g.producer_node(x)?, None);
    Ok(())
}

#[test]
fn replace_input_touches_one_slot() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let y = g.add_input("y", ValueType::Tensor);
    let (b, _) = common::op(&mut g, top, "aten::add", &[x, x], &["b"])?;
    let (c, _) = common::unary(&mut g, top, "aten::neg", x, "c")?;

    let old = g.replace_input(b, 1, y)?;
    g.verify_uses()?;
    assert_eq!(old, x);
    assert_eq!(g.node(b)?.inputs(), &[x, y]);
    assert_eq!(g.node(c)?.inputs(), &[x]);
    assert_eq!(g.value(x)?.uses(), &[Use::node(b, 0), Use::node(c, 0)]);
    assert!(g.replace_input(b, 2, y).is_err());
    Ok(())
}

#[test]
fn insertion_points_are_relative_to_the_anchor() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let (mid, _) = common::relu(&mut g, top, x, "r")?;

    let before = g.create_node("test::before", Scope::root());
    let after = g.create_node("test::after", Scope::root());
    let end = g.create_node("test::end", Scope::root());
    g.insert(after, InsertPoint::After(mid))?;
    g.insert(before, InsertPoint::Before(mid))?;
    g.insert(end, InsertPoint::End(top))?;
    assert_eq!(
        common::kinds_in(&g, top)?,
        vec!["test::before", "aten::relu", "test::after", "test::end"]
    );

    // Neither an attached node nor a detached anchor can be used.
    assert!(g.insert_after(end, mid).is_err());
    let loose = g.create_node("test::loose", Scope::root());
    let anchor = g.create_node("test::anchor", Scope::root());
    assert!(g.insert_before(loose, anchor).is_err());
    Ok(())
}

#[test]
fn block_outputs_are_recorded_as_uses() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let (_, r) = common::relu(&mut g, top, x, "r")?;
    let offset = g.register_output(r)?;
    assert_eq!(offset, 0);
    assert_eq!(
        g.value(r)?.uses()[0],
        Use {
            user: User::BlockOutput(top),
            offset: 0
        }
    );
    Ok(())
}

#[test]
fn graph_dump_shows_nested_blocks_and_scopes() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let cond = g.add_input("cond", ValueType::Bool);
    let branch = g.create_node("prim::If", Scope::root());
    g.add_input_to_node(branch, cond)?;
    let then_block = g.add_block_to_node(branch)?;
    let out = g.add_output(branch, "out", ValueType::Tensor)?;
    g.append_node(top, branch)?;
    g.register_output(out)?;
    let (relu, r) =
        common::op_in_scope(&mut g, then_block, "aten::relu", &[x], &["r"], Scope::new("act"))?;
    g.register_block_output(then_block, r[0])?;

    assert_eq!(
        describe_node(&g, relu),
        "%r : Tensor = aten::relu(%x), scope: act"
    );
    let dump = g.to_string();
    assert!(dump.starts_with("graph(%x, %cond):\n"));
    assert!(dump.contains("  %out : Tensor = prim::If(%cond)\n"));
    assert!(dump.contains("    block0():\n"));
    assert!(dump.contains("      %r : Tensor = aten::relu(%x), scope: act\n"));
    assert!(dump.contains("      -> (%r)\n"));
    assert!(dump.ends_with("  -> (%out)\n"));
    Ok(())
}

#[test]
fn clone_remaps_template_inputs() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let proto = g.add_input("proto", ValueType::Tensor);
    let real = g.add_input("real", ValueType::Tensor);
    let template = NodeTemplate::new("test::probe")
        .with_attr("bins", AttrValue::Int(16))
        .with_input(proto);

    let remap = ValueRemap::Map(HashMap::from([(proto, real)]));
    let node = g.create_clone(&template, &remap, Scope::new("probe"))?;
    assert_eq!(g.node(node)?.owner(), None);
    g.append_node(top, node)?;
    g.set_attr(node, "signed", AttrValue::Bool(false))?;

    assert_eq!(g.node(node)?.inputs(), &[real]);
    assert!(g.value(proto)?.uses().is_empty());
    assert_eq!(
        describe_node(&g, node),
        "test::probe[bins=16, signed=false](%real), scope: probe"
    );
    assert!(g
        .create_clone(&NodeTemplate::new(""), &ValueRemap::Identity, Scope::root())
        .is_err());
    Ok(())
}

#[test]
fn constants_render_their_payload() -> Result<()> {
    let mut g = Graph::new();
    let top = g.top_block();
    let x = g.add_input("x", ValueType::Tensor);
    let (relu, _) = common::relu(&mut g, top, x, "r")?;
    let scale = g.insert_constant(AttrValue::Float(1.0), Scope::root(), InsertPoint::Before(relu))?;
    let producer = g.producer_node(scale)?.expect("constant node");
    assert_eq!(
        describe_node(&g, producer),
        format!("%{} : float = prim::Constant[value=1.0]()", scale.index())
    );
    Ok(())
}
