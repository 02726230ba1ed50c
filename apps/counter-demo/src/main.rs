use restitch_core::{
    attrs, component, h, text, AttrMap, Component, ComponentInit, HostBackend, InstanceRef,
    MemoryHost, Props, Runtime, VNode,
};

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
    fn render(&self, props: &Props, state: &AttrMap, _context: &AttrMap) -> VNode {
        let label = props
            .attrs
            .get("label")
            .map(|v| v.to_attr_string())
            .unwrap_or_else(|| "count".to_string());
        let count = state
            .get("count")
            .map(|v| v.to_attr_string())
            .unwrap_or_default();
        h(
            "div",
            attrs! { "class" => "counter" },
            vec![
                h("span", attrs! {}, vec![text(label), text(": ")]),
                h("strong", attrs! {}, vec![text(count)]),
            ],
        )
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut rt = Runtime::new(MemoryHost::new());
    let root = rt.host_mut().create_element("root", false);

    let iref = InstanceRef::new();
    let view = component::<Counter>(attrs! { "label" => "clicks" }, vec![]).with_instance_ref(&iref);

    let base = rt.render(&view, root).expect("mount");
    let counter = iref.get().expect("instance resolved");
    log::info!("mounted counter instance {counter} with base {base}");

    println!("=== Restitch Counter Demo ===");
    println!("initial tree:\n{}", rt.host().dump_tree(base));
    rt.host_mut().take_mutations();

    for step in 1..=3 {
        rt.set_state(counter, attrs! { "count" => step });
        rt.rerender().expect("flush");
        let mutations = rt.host_mut().take_mutations();
        println!("after increment {step} ({} mutations):", mutations.len());
        println!("{}", rt.host().dump_tree(base));
    }
}
