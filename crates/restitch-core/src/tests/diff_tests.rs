use crate::attrs;
use crate::host::{HostBackend, Mutation};
use crate::value::Value;
use crate::vnode::{h, text, NodeRef, VElement, VNode};

use super::{new_runtime, text_of};

#[test]
fn initial_render_builds_structure() {
    let (mut rt, root) = new_runtime();
    let view = h(
        "div",
        attrs! { "id" => "app" },
        vec![h("span", attrs! {}, vec![text("hi")]), text("tail")],
    );

    let node = rt.render(&view, root).expect("render");

    assert_eq!(rt.host().parent(node).unwrap(), Some(root));
    assert_eq!(rt.host().tag(node).unwrap().as_deref(), Some("div"));
    assert_eq!(
        rt.host().attribute(node, "id").unwrap(),
        Some(Value::from("app"))
    );
    assert_eq!(rt.host().child_count(node).unwrap(), 2);

    let span = rt.host().child_at(node, 0).unwrap().unwrap();
    assert_eq!(rt.host().tag(span).unwrap().as_deref(), Some("span"));
    assert_eq!(text_of(&rt, span), "hi");

    let tail = rt.host().child_at(node, 1).unwrap().unwrap();
    assert_eq!(rt.host().text(tail).unwrap(), "tail");
}

#[test]
fn identical_rerender_makes_no_mutations() {
    let (mut rt, root) = new_runtime();
    let view = h(
        "div",
        attrs! { "id" => "app" },
        vec![h("span", attrs! {}, vec![text("hi")]), text("tail")],
    );

    let node = rt.render(&view, root).expect("render");
    rt.host_mut().take_mutations();

    let again = rt.render_into(&view, root, Some(node)).expect("rerender");
    assert_eq!(again, node);
    assert_eq!(rt.host_mut().take_mutations(), Vec::new());
}

#[test]
fn unkeyed_text_child_mutates_in_place() {
    let (mut rt, root) = new_runtime();
    let before = h("div", attrs! {}, vec![text("a")]);
    let after = h("div", attrs! {}, vec![text("b")]);

    let node = rt.render(&before, root).expect("render");
    let child = rt.host().first_child(node).unwrap().unwrap();
    rt.host_mut().take_mutations();

    let again = rt.render_into(&after, root, Some(node)).expect("rerender");
    assert_eq!(again, node);
    assert_eq!(rt.host().first_child(node).unwrap(), Some(child));
    assert_eq!(
        rt.host_mut().take_mutations(),
        vec![Mutation::SetText {
            id: child,
            text: "b".into()
        }]
    );
}

// `h` coalesces adjacent text children, so sibling text nodes are built
// through `VElement` directly.
fn two_texts(first: &str, second: &str) -> VNode {
    VNode::Element(VElement {
        tag: "div".to_string(),
        attrs: attrs! {},
        children: vec![text(first), text(second)],
        key: None,
        node_ref: None,
    })
}

#[test]
fn unkeyed_sibling_text_children_patch_independently() {
    let (mut rt, root) = new_runtime();

    let node = rt.render(&two_texts("a", "b"), root).expect("render");
    let first = rt.host().child_at(node, 0).unwrap().unwrap();
    let second = rt.host().child_at(node, 1).unwrap().unwrap();
    rt.host_mut().take_mutations();

    rt.render_into(&two_texts("a", "c"), root, Some(node))
        .expect("rerender");

    assert_eq!(rt.host().child_at(node, 0).unwrap(), Some(first));
    assert_eq!(rt.host().child_at(node, 1).unwrap(), Some(second));
    assert_eq!(
        rt.host_mut().take_mutations(),
        vec![Mutation::SetText {
            id: second,
            text: "c".into()
        }]
    );
}

#[test]
fn keyed_children_reorder_without_rebuilding() {
    let (mut rt, root) = new_runtime();
    let before = h(
        "ul",
        attrs! {},
        vec![
            h("li", attrs! {}, vec![text("A")]).keyed("1"),
            h("li", attrs! {}, vec![text("B")]).keyed("2"),
            h("li", attrs! {}, vec![text("C")]).keyed("3"),
        ],
    );
    let after = h(
        "ul",
        attrs! {},
        vec![
            h("li", attrs! {}, vec![text("C")]).keyed("3"),
            h("li", attrs! {}, vec![text("A")]).keyed("1"),
        ],
    );

    let ul = rt.render(&before, root).expect("render");
    let a = rt.host().child_at(ul, 0).unwrap().unwrap();
    let b = rt.host().child_at(ul, 1).unwrap().unwrap();
    let c = rt.host().child_at(ul, 2).unwrap().unwrap();
    rt.host_mut().take_mutations();

    rt.render_into(&after, root, Some(ul)).expect("rerender");

    assert_eq!(rt.host().child_count(ul).unwrap(), 2);
    assert_eq!(rt.host().child_at(ul, 0).unwrap(), Some(c));
    assert_eq!(rt.host().child_at(ul, 1).unwrap(), Some(a));
    assert_eq!(rt.host().parent(b).unwrap(), None);

    let mutations = rt.host_mut().take_mutations();
    assert!(
        !mutations.iter().any(|m| matches!(
            m,
            Mutation::CreateElement { .. } | Mutation::CreateText { .. } | Mutation::SetText { .. }
        )),
        "keyed reorder rebuilt nodes: {mutations:?}"
    );
}

#[test]
fn attribute_diff_touches_only_changes() {
    let (mut rt, root) = new_runtime();
    let before = h("div", attrs! { "a" => 1, "b" => 2 }, vec![]);
    let after = h("div", attrs! { "b" => 2, "c" => 3 }, vec![]);

    let node = rt.render(&before, root).expect("render");
    rt.host_mut().take_mutations();

    rt.render_into(&after, root, Some(node)).expect("rerender");

    let mut mutations = rt.host_mut().take_mutations();
    mutations.sort_by_key(|m| match m {
        Mutation::SetAttribute { name, .. } => name.clone(),
        _ => String::new(),
    });
    assert_eq!(
        mutations,
        vec![
            Mutation::SetAttribute {
                id: node,
                name: "a".into(),
                value: None
            },
            Mutation::SetAttribute {
                id: node,
                name: "c".into(),
                value: Some(Value::from(3))
            },
        ]
    );
    assert_eq!(rt.host().attribute(node, "b").unwrap(), Some(Value::from(2)));
}

#[test]
fn empty_description_renders_empty_text() {
    let (mut rt, root) = new_runtime();
    let node = rt.render(&VNode::Empty, root).expect("render");
    assert_eq!(rt.host().tag(node).unwrap(), None);
    assert_eq!(rt.host().text(node).unwrap(), "");
}

#[test]
fn svg_subtree_creates_namespaced_nodes() {
    let (mut rt, root) = new_runtime();
    let view = h("svg", attrs! {}, vec![h("circle", attrs! { "r" => 4 }, vec![])]);

    let svg = rt.render(&view, root).expect("render");
    let circle = rt.host().first_child(svg).unwrap().unwrap();
    assert!(rt.host().is_svg(svg).unwrap());
    assert!(rt.host().is_svg(circle).unwrap());
}

#[test]
fn node_ref_tracks_lifetime() {
    let (mut rt, root) = new_runtime();
    let r = NodeRef::new();
    let before = h(
        "div",
        attrs! {},
        vec![h("span", attrs! {}, vec![]).with_node_ref(&r)],
    );
    let after = h("div", attrs! {}, vec![]);

    let node = rt.render(&before, root).expect("render");
    let span = rt.host().first_child(node).unwrap().unwrap();
    assert_eq!(r.get(), Some(span));

    rt.render_into(&after, root, Some(node)).expect("rerender");
    assert_eq!(rt.host().child_count(node).unwrap(), 0);
    assert_eq!(r.get(), None);
}

#[test]
fn matching_existing_tree_hydrates_without_mutations() {
    let (mut rt, root) = new_runtime();

    // Pre-built tree the engine has never reconciled.
    let div = rt.host_mut().create_element("div", false);
    rt.host_mut()
        .set_attribute(div, "id", None, Some(&Value::from("app")), false)
        .unwrap();
    let t = rt.host_mut().create_text("hello");
    rt.host_mut().append_child(div, t).unwrap();
    rt.host_mut().append_child(root, div).unwrap();
    rt.host_mut().take_mutations();

    let view = h("div", attrs! { "id" => "app" }, vec![text("hello")]);
    let out = rt.render_into(&view, root, Some(div)).expect("hydrate");

    assert_eq!(out, div);
    assert_eq!(rt.host().first_child(div).unwrap(), Some(t));
    assert_eq!(rt.host_mut().take_mutations(), Vec::new());
}

#[test]
fn mismatched_existing_tree_is_replaced() {
    let (mut rt, root) = new_runtime();

    let span = rt.host_mut().create_element("span", false);
    let t = rt.host_mut().create_text("old");
    rt.host_mut().append_child(span, t).unwrap();
    rt.host_mut().append_child(root, span).unwrap();

    let view = h("div", attrs! {}, vec![text("new")]);
    let out = rt.render_into(&view, root, Some(span)).expect("render");

    assert_ne!(out, span);
    assert_eq!(rt.host().tag(out).unwrap().as_deref(), Some("div"));
    assert_eq!(rt.host().parent(out).unwrap(), Some(root));
    assert_eq!(rt.host().parent(span).unwrap(), None);
    assert_eq!(text_of(&rt, out), "new");
}

#[test]
fn tag_change_rebuilds_node() {
    let (mut rt, root) = new_runtime();
    let before = h("div", attrs! {}, vec![text("x")]);
    let after = h("section", attrs! {}, vec![text("x")]);

    let node = rt.render(&before, root).expect("render");
    let again = rt.render_into(&after, root, Some(node)).expect("rerender");

    assert_ne!(again, node);
    assert_eq!(rt.host().tag(again).unwrap().as_deref(), Some("section"));
    assert_eq!(rt.host().parent(node).unwrap(), None);
    assert_eq!(text_of(&rt, again), "x");
}
