mod common;

use common::{counting_factory, immediate_resolver};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use quiver::{Context, Definition, Resolver, ResolverConfig, Value};

#[test]
fn value_definitions_resolve_synchronously() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("config").value(Value::Int(9000)));

    assert_eq!(resolver.lookup("config"), Some(Value::Int(9000)));
    assert!(resolver.status().completed);
}

#[test]
fn source_text_publishes_as_text() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("widget/src").source_text("function widget() {}"));

    assert_eq!(
        resolver.lookup("widget/src"),
        Some(Value::from("function widget() {}"))
    );
}

#[test]
fn factory_receives_dependencies_in_declared_order() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("first").value(Value::Int(1)));
    resolver.define(Definition::named("second").value(Value::Int(2)));

    resolver.define(
        Definition::named("combined")
            .dependencies(["second", "first"])
            .factory(|ns, deps| {
                ns.set("left", deps[0].clone());
                ns.set("right", deps[1].clone());
                None
            }),
    );

    let combined = resolver.lookup("combined").unwrap();
    assert_eq!(combined.get("left"), Some(Value::Int(2)));
    assert_eq!(combined.get("right"), Some(Value::Int(1)));
}

#[test]
fn forward_references_resolve_when_the_dependency_arrives() {
    let resolver = immediate_resolver();
    let ran = Arc::new(AtomicBool::new(false));
    let ran_in_factory = ran.clone();

    resolver.define(
        Definition::named("app")
            .dependency("lib/later")
            .factory(move |_, deps| {
                ran_in_factory.store(true, Ordering::SeqCst);
                Some(deps[0].clone())
            }),
    );
    assert!(!ran.load(Ordering::SeqCst));
    assert!(resolver.lookup("app").is_none());

    resolver.define(Definition::named("lib/later").value(Value::from("arrived")));

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(resolver.lookup("app"), Some(Value::from("arrived")));
    assert!(resolver.status().completed);
}

#[test]
fn chains_resolve_regardless_of_definition_order() {
    let resolver = immediate_resolver();

    resolver.define(
        Definition::named("c")
            .dependency("b")
            .factory(|_, deps| Some(Value::Int(deps[0].as_int().unwrap_or(0) + 1))),
    );
    resolver.define(
        Definition::named("b")
            .dependency("a")
            .factory(|_, deps| Some(Value::Int(deps[0].as_int().unwrap_or(0) + 1))),
    );
    resolver.define(Definition::named("a").value(Value::Int(1)));

    assert_eq!(resolver.lookup("a"), Some(Value::Int(1)));
    assert_eq!(resolver.lookup("b"), Some(Value::Int(2)));
    assert_eq!(resolver.lookup("c"), Some(Value::Int(3)));
}

#[test]
fn instantiation_happens_at_most_once() {
    let resolver = immediate_resolver();
    let count = Arc::new(AtomicUsize::new(0));
    resolver.define(counting_factory("base", count.clone(), Value::Int(5)));

    // Dependents, repeated lookups, and fresh ticks never re-run the factory.
    resolver.define(
        Definition::named("user1")
            .dependency("base")
            .factory(|_, deps| Some(deps[0].clone())),
    );
    resolver.define(
        Definition::named("user2")
            .dependency("base")
            .factory(|_, deps| Some(deps[0].clone())),
    );
    let _ = resolver.lookup("base");
    let _ = resolver.lookup("base");

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn repeated_lookups_share_the_published_object() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("shared").factory(|ns, _| {
        ns.set("n", Value::Int(1));
        None
    }));

    let first = resolver.lookup("shared").unwrap();
    let second = resolver.lookup("shared").unwrap();
    assert!(Value::same_identity(&first, &second));

    // Mutations through one handle are visible through the other.
    first.set("n", Value::Int(2));
    assert_eq!(second.get("n"), Some(Value::Int(2)));
}

#[test]
fn hierarchical_keys_publish_intermediate_containers() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("app/views/home").value(Value::from("home view")));

    assert_eq!(
        resolver.lookup("app/views/home"),
        Some(Value::from("home view"))
    );

    let app = resolver.lookup("app").unwrap();
    assert!(app.is_container());
    assert_eq!(
        app.read_path(&["views", "home"]).unwrap(),
        Value::from("home view")
    );

    // Dotted notation reads the same tree.
    assert_eq!(
        resolver.lookup("app.views.home"),
        Some(Value::from("home view"))
    );
}

#[test]
fn anonymous_definitions_get_distinct_keys() {
    let resolver = immediate_resolver();
    resolver.define(Definition::anonymous().value(Value::Int(1)));
    resolver.define(Definition::anonymous().value(Value::Int(2)));

    assert_eq!(resolver.lookup("anonymous0"), Some(Value::Int(1)));
    assert_eq!(resolver.lookup("anonymous1"), Some(Value::Int(2)));
    assert_eq!(resolver.status().loaded, 2);
}

#[test]
fn redefinition_last_wins_and_republishes() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("flag").value(Value::from("first")));
    assert_eq!(resolver.lookup("flag"), Some(Value::from("first")));

    resolver.define(Definition::named("flag").value(Value::from("second")));
    assert_eq!(resolver.lookup("flag"), Some(Value::from("second")));
    assert!(resolver.status().completed);
}

#[test]
fn dependencies_solved_before_declaration_are_filtered() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("early").value(Value::Int(10)));

    // "early" is already in the solved set when this arrives.
    let ran = Arc::new(AtomicBool::new(false));
    let ran_inner = ran.clone();
    resolver.define(
        Definition::named("late")
            .dependency("early")
            .factory(move |_, deps| {
                ran_inner.store(true, Ordering::SeqCst);
                Some(deps[0].clone())
            }),
    );

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(resolver.lookup("late"), Some(Value::Int(10)));
}

#[test]
fn factory_return_replaces_the_namespace_object() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("replaced").factory(|ns, _| {
        ns.set("ignored", Value::Bool(true));
        Some(Value::from("the real value"))
    }));

    assert_eq!(resolver.lookup("replaced"), Some(Value::from("the real value")));
}

#[test]
fn factory_side_effects_publish_without_a_return() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("populated").factory(|ns, _| {
        ns.set("a", Value::Int(1));
        ns.set("b", Value::Int(2));
        None
    }));

    let ns = resolver.lookup("populated").unwrap();
    assert_eq!(ns.get("a"), Some(Value::Int(1)));
    assert_eq!(ns.get("b"), Some(Value::Int(2)));
}

#[test]
fn require_argument_supports_dynamic_lookup() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("target").value(Value::Int(77)));

    resolver.define(
        Definition::named("dynamic")
            .dependencies(["require", "target"])
            .factory(|_, deps| {
                let Value::Resolver(handle) = &deps[0] else {
                    return Some(Value::from("no handle"));
                };
                handle.lookup("target")
            }),
    );

    assert_eq!(resolver.lookup("dynamic"), Some(Value::Int(77)));
}

#[test]
fn factories_can_define_re_entrantly() {
    let resolver = immediate_resolver();

    resolver.define(
        Definition::named("outer")
            .dependency("require")
            .factory(|ns, deps| {
                let Value::Resolver(handle) = &deps[0] else {
                    return None;
                };
                handle.define(Definition::named("inner").value(Value::from("from outer")));
                ns.set("defined_inner", Value::Bool(true));
                None
            }),
    );

    // The nested definition is picked up by the running tick.
    assert_eq!(resolver.lookup("inner"), Some(Value::from("from outer")));
    assert!(resolver.status().completed);
}

#[test]
fn completion_fires_exactly_once_per_transition() {
    let resolver = immediate_resolver();
    let fired = Arc::new(AtomicUsize::new(0));

    let fired_cb = fired.clone();
    resolver.on_complete(move || {
        fired_cb.fetch_add(1, Ordering::SeqCst);
    });

    resolver.define(Definition::named("only").value(Value::Int(1)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // A consumed callback is not re-fired by later completions.
    resolver.define(Definition::named("more").value(Value::Int(2)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn completion_rearms_for_the_next_cycle() {
    let resolver = immediate_resolver();
    let fired = Arc::new(AtomicUsize::new(0));

    resolver.define(Definition::named("one").value(Value::Int(1)));

    let fired_cb = fired.clone();
    resolver.on_complete(move || {
        fired_cb.fetch_add(1, Ordering::SeqCst);
    });
    // Already quiescent; the callback waits for the next transition.
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    resolver.define(Definition::named("two").value(Value::Int(2)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn completion_never_fires_while_anything_is_pending() {
    let resolver = immediate_resolver();
    let fired = Arc::new(AtomicBool::new(false));

    let fired_cb = fired.clone();
    resolver.on_complete(move || {
        fired_cb.store(true, Ordering::SeqCst);
    });

    resolver.define(
        Definition::named("stuck")
            .dependency("never/arrives")
            .factory(|_, _| None),
    );

    assert!(!fired.load(Ordering::SeqCst));
    assert!(!resolver.status().completed);
}

#[test]
fn status_lists_missing_dependencies() {
    let resolver = immediate_resolver();
    resolver.define(
        Definition::named("waiting")
            .dependencies(["absent/a", "absent/b"])
            .factory(|_, _| None),
    );

    let status = resolver.status();
    assert_eq!(status.loaded, 0);
    let waiting = status
        .pending
        .iter()
        .find(|p| p.key == "waiting")
        .expect("waiting should be pending");
    assert_eq!(waiting.missing, vec!["absent/a", "absent/b"]);
    assert!(!waiting.fetched);
}

#[test]
fn lookup_prefers_host_context_over_local() {
    let host = Context::new();
    host.write("shared/key", Value::from("host value")).unwrap();
    let local = Context::new();
    local.write("shared/key", Value::from("local value")).unwrap();

    let resolver = Resolver::builder()
        .config(ResolverConfig::immediate())
        .host_context(host)
        .local_context(local)
        .build();

    assert_eq!(resolver.lookup("shared/key"), Some(Value::from("host value")));
}

#[test]
fn wait_chain_pulls_from_a_host_namespace() {
    let host = Context::new();
    let exports = Value::object();
    exports.set("_", Value::from("the underscore object"));
    host.write("vendor/underscore", exports).unwrap();

    let resolver = Resolver::builder()
        .config(ResolverConfig::immediate())
        .host_context(host)
        .build();

    resolver.define(
        Definition::named("templating")
            .dependency("vendor/underscore:_")
            .factory(|_, deps| Some(deps[0].clone())),
    );

    assert_eq!(
        resolver.lookup("templating"),
        Some(Value::from("the underscore object"))
    );
    // The located unit publishes the extracted value, not the wrapper.
    assert_eq!(
        resolver.lookup("vendor/underscore"),
        Some(Value::from("the underscore object"))
    );
}

#[test]
fn wait_chain_falls_back_to_a_root_level_name() {
    let host = Context::new();
    host.write("$", Value::from("jquery-like")).unwrap();

    let resolver = Resolver::builder()
        .config(ResolverConfig::immediate())
        .host_context(host)
        .build();

    resolver.define(
        Definition::named("plugin")
            .dependency("vendor/jquery:$")
            .factory(|_, deps| Some(deps[0].clone())),
    );

    assert_eq!(resolver.lookup("plugin"), Some(Value::from("jquery-like")));
}

#[test]
fn pull_chain_applies_to_locally_instantiated_targets() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("toolkit").factory(|ns, _| {
        ns.set("version", Value::Int(3));
        None
    }));

    resolver.define(
        Definition::named("version_user")
            .dependency("toolkit:version")
            .factory(|_, deps| Some(deps[0].clone())),
    );

    assert_eq!(resolver.lookup("version_user"), Some(Value::Int(3)));
}

#[test]
fn unresolvable_arguments_become_null() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("num").value(Value::Int(5)));

    // The pull chain dead-ends in a scalar; the argument degrades to null
    // instead of blocking the factory.
    resolver.define(
        Definition::named("strict")
            .dependency("num:missing_member")
            .factory(|_, deps| Some(Value::Bool(deps[0].is_null()))),
    );

    assert_eq!(resolver.lookup("strict"), Some(Value::Bool(true)));
}

#[test]
fn dropping_the_engine_kills_outstanding_handles() {
    let resolver = immediate_resolver();
    resolver.define(Definition::named("v").value(Value::Int(1)));
    let handle = resolver.handle();
    assert_eq!(handle.lookup("v"), Some(Value::Int(1)));

    drop(resolver);
    assert_eq!(handle.lookup("v"), None);
}
