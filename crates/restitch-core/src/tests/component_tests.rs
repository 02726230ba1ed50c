use std::cell::RefCell;
use std::rc::Rc;

use crate::attrs;
use crate::component::{Component, ComponentInit, Props, Scope};
use crate::host::{HostBackend, Mutation};
use crate::value::AttrMap;
use crate::vnode::{component, h, text, ComponentKind, InstanceRef, VNode};

use super::{new_runtime, text_of};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn log_event(event: impl Into<String>) {
    EVENTS.with(|e| e.borrow_mut().push(event.into()));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|e| e.borrow_mut().drain(..).collect())
}

fn attr(map: &AttrMap, name: &str) -> String {
    map.get(name).map(|v| v.to_attr_string()).unwrap_or_default()
}

struct Counter;

impl ComponentInit for Counter {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Counter
    }

    fn initial_state(_: &Props, _: &AttrMap) -> AttrMap {
        attrs! { "count" => 0 }
    }
}

impl Component for Counter {
    fn render(&self, _props: &Props, state: &AttrMap, _context: &AttrMap) -> VNode {
        h("div", attrs! {}, vec![text(attr(state, "count"))])
    }
}

struct Alpha;

impl ComponentInit for Alpha {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Alpha
    }
}

impl Component for Alpha {
    fn render(&self, _props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("div", attrs! {}, vec![text("alpha")])
    }

    fn before_mount(&mut self, _scope: &mut Scope) {
        log_event("alpha:before_mount");
    }

    fn mounted(&mut self, _scope: &mut Scope) {
        log_event("alpha:mounted");
    }

    fn before_unmount(&mut self, _scope: &mut Scope) {
        log_event("alpha:before_unmount");
    }
}

struct Beta;

impl ComponentInit for Beta {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Beta
    }
}

impl Component for Beta {
    fn render(&self, _props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("p", attrs! {}, vec![text("beta")])
    }

    fn before_mount(&mut self, _scope: &mut Scope) {
        log_event("beta:before_mount");
    }

    fn mounted(&mut self, _scope: &mut Scope) {
        log_event("beta:mounted");
    }

    fn before_unmount(&mut self, _scope: &mut Scope) {
        log_event("beta:before_unmount");
    }
}

#[test]
fn set_state_rerenders_through_queue() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Counter>(attrs! {}, vec![]).with_instance_ref(&iref);

    let base = rt.render(&view, root).expect("mount");
    let id = iref.get().expect("instance resolved");
    assert_eq!(text_of(&rt, base), "0");

    rt.set_state(id, attrs! { "count" => 1 });
    assert_eq!(rt.pending_renders(), 1);
    rt.rerender().expect("flush");

    assert_eq!(text_of(&rt, base), "1");
    assert_eq!(rt.component_base(id), Some(base));
    assert_eq!(rt.pending_renders(), 0);
}

#[test]
fn swap_runs_lifecycle_in_order() {
    let (mut rt, root) = new_runtime();

    let base_a = rt
        .render(&component::<Alpha>(attrs! {}, vec![]), root)
        .expect("mount alpha");
    assert_eq!(take_events(), ["alpha:before_mount", "alpha:mounted"]);

    let base_b = rt
        .render_into(&component::<Beta>(attrs! {}, vec![]), root, Some(base_a))
        .expect("swap to beta");
    assert_eq!(
        take_events(),
        ["alpha:before_unmount", "beta:before_mount", "beta:mounted"]
    );
    assert_ne!(base_b, base_a);
    assert_eq!(rt.pool().retired_count(ComponentKind::of::<Alpha>()), 1);
}

#[test]
fn remount_reuses_recycled_base() {
    let (mut rt, root) = new_runtime();

    let b1 = rt
        .render(&component::<Alpha>(attrs! {}, vec![]), root)
        .expect("mount alpha");
    let b2 = rt
        .render_into(&component::<Beta>(attrs! {}, vec![]), root, Some(b1))
        .expect("swap to beta");
    rt.host_mut().take_mutations();
    take_events();

    let b3 = rt
        .render_into(&component::<Alpha>(attrs! {}, vec![]), root, Some(b2))
        .expect("swap back");

    assert_eq!(b3, b1);
    assert_eq!(text_of(&rt, b3), "alpha");
    assert_eq!(rt.pool().retired_count(ComponentKind::of::<Alpha>()), 0);
    assert_eq!(rt.pool().retired_count(ComponentKind::of::<Beta>()), 1);

    let mutations = rt.host_mut().take_mutations();
    assert!(
        !mutations.iter().any(|m| matches!(
            m,
            Mutation::CreateElement { .. } | Mutation::CreateText { .. }
        )),
        "recycled remount rebuilt nodes: {mutations:?}"
    );
}

struct Gate;

impl ComponentInit for Gate {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Gate
    }

    fn initial_state(_: &Props, _: &AttrMap) -> AttrMap {
        attrs! { "count" => 0 }
    }
}

impl Component for Gate {
    fn render(&self, _props: &Props, state: &AttrMap, _context: &AttrMap) -> VNode {
        log_event("gate:render");
        h("div", attrs! {}, vec![text(attr(state, "count"))])
    }

    fn should_update(&mut self, _p: &Props, _s: &AttrMap, _c: &AttrMap) -> bool {
        false
    }

    fn after_update(&mut self, _p: &Props, _s: &AttrMap, _c: &AttrMap, _scope: &mut Scope) {
        log_event("gate:after_update");
    }
}

#[test]
fn vetoed_update_commits_state_without_rendering() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Gate>(attrs! {}, vec![]).with_instance_ref(&iref);

    let base = rt.render(&view, root).expect("mount");
    let id = iref.get().unwrap();
    assert_eq!(take_events(), ["gate:render"]);

    rt.set_state(id, attrs! { "count" => 1 });
    rt.rerender().expect("flush");

    assert_eq!(take_events(), Vec::<String>::new());
    assert_eq!(text_of(&rt, base), "0");
    assert_eq!(
        attr(rt.component_state(id), "count"),
        "1",
        "state commits even when the render is vetoed"
    );
}

struct Parent;

impl ComponentInit for Parent {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Parent
    }

    fn initial_state(_: &Props, _: &AttrMap) -> AttrMap {
        attrs! { "name" => "ada" }
    }
}

impl Component for Parent {
    fn render(&self, _props: &Props, state: &AttrMap, _context: &AttrMap) -> VNode {
        h(
            "div",
            attrs! {},
            vec![component::<Child>(
                attrs! { "name" => attr(state, "name") },
                vec![],
            )],
        )
    }
}

struct Child;

impl ComponentInit for Child {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Child
    }
}

impl Component for Child {
    fn render(&self, props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("span", attrs! {}, vec![text(attr(&props.attrs, "name"))])
    }

    fn mounted(&mut self, _scope: &mut Scope) {
        log_event("child:mounted");
    }

    fn receive_props(&mut self, next_props: &Props, _ctx: &AttrMap, _scope: &mut Scope) {
        log_event(format!("child:receive_props:{}", attr(&next_props.attrs, "name")));
    }
}

struct ParentLogger;

impl ComponentInit for ParentLogger {
    fn init(_: &Props, _: &AttrMap) -> Self {
        ParentLogger
    }
}

impl Component for ParentLogger {
    fn render(&self, _props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("div", attrs! {}, vec![component::<Child>(attrs! {}, vec![])])
    }

    fn mounted(&mut self, _scope: &mut Scope) {
        log_event("parent:mounted");
    }
}

#[test]
fn nested_mounted_hooks_fire_child_first() {
    let (mut rt, root) = new_runtime();
    rt.render(&component::<ParentLogger>(attrs! {}, vec![]), root)
        .expect("mount");
    assert_eq!(take_events(), ["child:mounted", "parent:mounted"]);
}

#[test]
fn parent_update_pushes_props_into_child() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Parent>(attrs! {}, vec![]).with_instance_ref(&iref);

    let div = rt.render(&view, root).expect("mount");
    let id = iref.get().unwrap();
    assert_eq!(
        take_events(),
        ["child:mounted"],
        "first mount must not fire receive_props"
    );

    let span = rt.host().first_child(div).unwrap().unwrap();
    assert_eq!(text_of(&rt, span), "ada");

    rt.set_state(id, attrs! { "name" => "grace" });
    rt.rerender().expect("flush");

    assert_eq!(take_events(), ["child:receive_props:grace"]);
    assert_eq!(rt.host().first_child(div).unwrap(), Some(span));
    assert_eq!(text_of(&rt, span), "grace");
}

struct Shell;

impl ComponentInit for Shell {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Shell
    }

    fn initial_state(_: &Props, _: &AttrMap) -> AttrMap {
        attrs! { "n" => 1 }
    }
}

impl Component for Shell {
    fn render(&self, _props: &Props, state: &AttrMap, _context: &AttrMap) -> VNode {
        component::<Core>(attrs! { "n" => attr(state, "n") }, vec![])
    }
}

struct Core;

impl ComponentInit for Core {
    fn init(_: &Props, _: &AttrMap) -> Self {
        Core
    }
}

impl Component for Core {
    fn render(&self, props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("div", attrs! {}, vec![text(attr(&props.attrs, "n"))])
    }
}

#[test]
fn higher_order_chain_shares_one_base() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Shell>(attrs! {}, vec![]).with_instance_ref(&iref);

    let base = rt.render(&view, root).expect("mount");
    let shell = iref.get().unwrap();

    assert_eq!(text_of(&rt, base), "1");
    assert_eq!(rt.component_base(shell), Some(base));
    assert_eq!(rt.owners.get(&base), Some(&shell));

    let core = rt.instances[shell.0].child_component.expect("chain link");
    assert_eq!(rt.component_base(core), Some(base));

    rt.set_state(shell, attrs! { "n" => 2 });
    rt.rerender().expect("flush");

    assert_eq!(rt.component_base(shell), Some(base), "base survives the update");
    assert_eq!(text_of(&rt, base), "2");
}

#[test]
fn render_callbacks_run_in_request_order() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Counter>(attrs! {}, vec![]).with_instance_ref(&iref);
    rt.render(&view, root).expect("mount");
    let id = iref.get().unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&order);
    let second = Rc::clone(&order);
    rt.set_state_then(id, attrs! { "count" => 1 }, move || {
        first.borrow_mut().push("first")
    });
    rt.set_state_then(id, attrs! { "count" => 2 }, move || {
        second.borrow_mut().push("second")
    });
    assert_eq!(rt.pending_renders(), 1, "dirty flag deduplicates the queue");

    rt.rerender().expect("flush");
    assert_eq!(*order.borrow(), ["first", "second"]);
}

struct ThemeProvider;

impl ComponentInit for ThemeProvider {
    fn init(_: &Props, _: &AttrMap) -> Self {
        ThemeProvider
    }
}

impl Component for ThemeProvider {
    fn render(&self, _props: &Props, _state: &AttrMap, _context: &AttrMap) -> VNode {
        h("div", attrs! {}, vec![component::<ThemeReader>(attrs! {}, vec![])])
    }

    fn child_context(&self, _p: &Props, _s: &AttrMap, _c: &AttrMap) -> Option<AttrMap> {
        Some(attrs! { "theme" => "dark" })
    }
}

struct ThemeReader;

impl ComponentInit for ThemeReader {
    fn init(_: &Props, _: &AttrMap) -> Self {
        ThemeReader
    }
}

impl Component for ThemeReader {
    fn render(&self, _props: &Props, _state: &AttrMap, context: &AttrMap) -> VNode {
        h("span", attrs! {}, vec![text(attr(context, "theme"))])
    }
}

#[test]
fn child_context_reaches_descendants() {
    let (mut rt, root) = new_runtime();
    let div = rt
        .render(&component::<ThemeProvider>(attrs! {}, vec![]), root)
        .expect("mount");
    let span = rt.host().first_child(div).unwrap().unwrap();
    assert_eq!(text_of(&rt, span), "dark");
}

#[test]
fn instance_ref_clears_on_unmount() {
    let (mut rt, root) = new_runtime();
    let iref = InstanceRef::new();
    let view = component::<Alpha>(attrs! {}, vec![]).with_instance_ref(&iref);

    let base = rt.render(&view, root).expect("mount");
    assert!(iref.get().is_some());

    rt.render_into(&component::<Beta>(attrs! {}, vec![]), root, Some(base))
        .expect("swap");
    assert_eq!(iref.get(), None);
}
