//! Integration tests for building and running a component hierarchy.
//!
//! Everything is created through [`Runtime`], the way an embedding
//! application would do it.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use strata_component::{Component, Health, LifecycleState};
use strata_event::Payload;
use strata_runtime::composite::{CRITICAL_CHANNEL, STATE_CHANNEL};
use strata_runtime::{
    BreakerConfig, CircuitState, Composite, CompositeError, CompositeState, Machine, MachineError,
    MachineState, Runtime, RuntimeConfig,
};

// =============================================================================
// Fixtures
// =============================================================================

fn runtime() -> Runtime {
    let mut config = RuntimeConfig::default();
    config.composite.minimum_active_required = 2;
    config.environment.insert("site".into(), "test".into());
    Runtime::new(config)
}

/// Composite with `names` as ready leaves.
fn composite_with(runtime: &Runtime, reason: &str, names: &[&str]) -> Arc<Composite> {
    let composite = runtime
        .create_composite(reason, None)
        .expect("composite should be created");
    for name in names {
        let leaf = runtime
            .create_leaf(name, Some(&composite.id()))
            .expect("leaf should be created");
        composite.add(*name, leaf).expect("leaf should be added");
    }
    composite
}

fn machine_with(runtime: &Runtime, composites: &[&str]) -> Arc<Machine> {
    let machine = runtime
        .create_machine("plant", None)
        .expect("machine should be created");
    for reason in composites {
        let composite = runtime
            .create_composite(reason, Some(&machine.id()))
            .expect("composite should be created");
        for i in 0..2 {
            let leaf = runtime
                .create_leaf(&format!("{reason}-{i}"), Some(&composite.id()))
                .expect("leaf should be created");
            composite
                .add(format!("{reason}-{i}"), leaf)
                .expect("leaf should be added");
        }
        machine
            .add_composite(*reason, composite)
            .expect("composite should be added");
    }
    machine
}

// =============================================================================
// Lineage
// =============================================================================

mod lineage {
    use super::*;

    #[test]
    fn adam_and_child() {
        let rt = runtime();
        let adam = rt.create_identity("Adam", None).unwrap();
        let child = rt.create_identity("Child", Some(&adam.id())).unwrap();

        let address = rt.lineage().hierarchical_address(&child.id()).unwrap();
        let adam_at = address.find("Adam<").expect("address names the root");
        let child_at = address.find("Child<").expect("address names the child");
        assert!(adam_at < child_at);

        assert!(rt
            .lineage()
            .descendants(&adam.id())
            .unwrap()
            .contains(&child.id()));
        assert_eq!(child.environment()["site"], "test");
    }

    #[test]
    fn termination_archives_lineage() {
        let rt = runtime();
        let pump = composite_with(&rt, "pump", &["intake"]);
        let intake = pump.get("intake").unwrap();

        pump.terminate().unwrap();

        let last = intake.lineage().last().cloned().unwrap();
        assert!(last.starts_with("archived: terminated from ready"));
        assert!(rt.lineage().live_descendants(&pump.id()).unwrap().is_empty());
    }
}

// =============================================================================
// Composite aggregate
// =============================================================================

mod composite_state {
    use super::*;

    #[test]
    fn two_active_one_degraded_then_one_deactivated() {
        let rt = runtime();
        let pump = composite_with(&rt, "pump", &["a", "b", "c"]);
        pump.activate().unwrap();

        let c = pump.get("c").unwrap();
        c.transition(LifecycleState::Adapting).unwrap();
        c.transition(LifecycleState::Stable).unwrap();
        c.transition(LifecycleState::Degraded).unwrap();
        assert_eq!(pump.evaluate_aggregate_state(), CompositeState::Flowing);

        pump.get("b").unwrap().deactivate().unwrap();
        assert_eq!(pump.evaluate_aggregate_state(), CompositeState::Degraded);

        let labels: Vec<Value> = pump
            .drain_events()
            .into_iter()
            .filter(|e| e.channel == STATE_CHANNEL)
            .filter_map(|e| e.get("next").cloned())
            .collect();
        assert_eq!(labels, vec![Value::from("flowing"), Value::from("degraded")]);
    }

    #[test]
    fn connect_to_missing_child_leaves_graph_unchanged() {
        let rt = runtime();
        let pump = composite_with(&rt, "pump", &["a"]);

        let err = pump.connect("a", "b").unwrap_err();
        assert_eq!(err, CompositeError::UnknownChild("b".into()));
        assert!(pump.connections().is_empty());
    }

    #[test]
    fn nested_composite_counts_as_one_child() {
        let rt = runtime();
        let outer = composite_with(&rt, "outer", &["x"]);
        let inner = rt.create_composite("inner", Some(&outer.id())).unwrap();
        for name in ["p", "q"] {
            inner
                .add(name, rt.create_leaf(name, Some(&inner.id())).unwrap())
                .unwrap();
        }
        outer.add("inner", inner.clone()).unwrap();

        outer.activate().unwrap();
        assert_eq!(inner.health(), Health::Active);
        assert_eq!(outer.evaluate_aggregate_state(), CompositeState::Flowing);

        inner.get("p").unwrap().deactivate().unwrap();
        assert_eq!(inner.health(), Health::Degraded);
        assert_eq!(outer.evaluate_aggregate_state(), CompositeState::Degraded);
    }
}

// =============================================================================
// Routing and breakers
// =============================================================================

mod routing {
    use super::*;

    #[test]
    fn breaker_trips_and_recovers() {
        let rt = runtime();
        let pump = composite_with(&rt, "pump", &["reader", "parser"]);
        pump.connect("reader", "parser").unwrap();
        pump.enable_circuit_breaker(
            "reader",
            "parser",
            BreakerConfig::new(2, Duration::from_millis(30)),
        )
        .unwrap();

        let mut invoked = 0;
        for _ in 0..2 {
            let result = pump.route("reader", "parser", |_| {
                invoked += 1;
                Err::<(), _>(CompositeError::UnknownChild("downstream".into()))
            });
            assert!(result.is_err());
        }

        let rejected = pump.route("reader", "parser", |_| {
            invoked += 1;
            Ok::<_, CompositeError>(())
        });
        assert!(matches!(rejected, Err(CompositeError::CircuitOpen { .. })));
        assert_eq!(invoked, 2, "open breaker must not reach the target");

        std::thread::sleep(Duration::from_millis(60));
        pump.route("reader", "parser", |_| Ok::<_, CompositeError>(()))
            .expect("trial call should pass");
        assert_eq!(
            pump.breaker_stats("reader", "parser").unwrap().state,
            CircuitState::Closed
        );
    }

    #[test]
    fn fan_out_delivers_downstream() {
        let rt = runtime();
        let pump = composite_with(&rt, "pump", &["src", "left", "right"]);
        pump.connect("src", "left").unwrap();
        pump.connect("src", "right").unwrap();
        pump.activate().unwrap();

        let mut data = Payload::new();
        data.insert("level".into(), Value::from(7));
        let report = pump.fan_out("src", "level", &data).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.delivered, vec!["left".to_string(), "right".to_string()]);
        for name in ["left", "right"] {
            let events = pump.get(name).unwrap().drain_events();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].decode::<i64>("level").unwrap(), 7);
        }
    }
}

// =============================================================================
// Processing pipeline
// =============================================================================

mod pipeline {
    use super::*;

    #[test]
    fn readings_flow_through_stages_to_the_sink() {
        let rt = runtime();
        let line = composite_with(&rt, "line", &["intake", "scale", "sink"]);
        line.connect("intake", "scale").unwrap();
        line.connect("scale", "sink").unwrap();
        line.add_validator("scale", |data| data.contains_key("celsius"))
            .unwrap();
        line.add_transformer("scale", |mut data| {
            let c = data
                .get("celsius")
                .and_then(Value::as_f64)
                .ok_or_else(|| "celsius is not a number".to_string())?;
            data.insert("fahrenheit".into(), Value::from(c * 9.0 / 5.0 + 32.0));
            Ok(data)
        })
        .unwrap();
        line.activate().unwrap();

        let mut reading = Payload::new();
        reading.insert("celsius".into(), Value::from(100.0));
        let out = line.process("intake", reading).unwrap().unwrap();
        assert_eq!(out.get("fahrenheit"), Some(&Value::from(212.0)));

        // Refused by the validator: nothing reaches the sink.
        assert_eq!(line.process("intake", Payload::new()).unwrap(), None);
    }

    #[test]
    fn nesting_a_composite_inside_itself_is_refused() {
        let rt = runtime();
        let outer = composite_with(&rt, "outer", &[]);
        let inner = composite_with(&rt, "inner", &[]);
        outer.add("inner", inner.clone()).unwrap();

        assert_eq!(
            inner.add("outer", outer.clone()).unwrap_err(),
            CompositeError::CyclicContainment(outer.id())
        );
        assert_eq!(outer.evaluate_aggregate_state(), CompositeState::Degraded);
        outer.terminate().unwrap();
        assert_eq!(inner.state(), LifecycleState::Terminated);
    }
}

// =============================================================================
// Machine
// =============================================================================

mod machine {
    use super::*;

    #[test]
    fn start_evaluate_stop() {
        let rt = runtime();
        let machine = machine_with(&rt, &["intake", "outlet"]);
        machine.connect_composites("intake", "outlet").unwrap();

        let report = machine.start_machine().unwrap();
        assert_eq!(report.activated.len(), 2);
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Operational);

        machine.stop_machine().unwrap();
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Partial);
    }

    #[test]
    fn critical_composite_reaches_inbox() {
        let mut config = RuntimeConfig::default();
        config.composite.critical_error_threshold = 1;
        let rt = Runtime::new(config);
        let machine = machine_with(&rt, &["intake", "outlet"]);
        machine.start_machine().unwrap();

        let outlet = machine.composite("outlet").unwrap();
        outlet.get("outlet-0").unwrap().terminate().unwrap();

        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Impaired);
        let notices = machine.drain_events();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].channel, CRITICAL_CHANNEL);
        assert_eq!(notices[0].get("reason"), Some(&Value::from("outlet")));
    }

    #[test]
    fn pause_resume_and_fault_recovery() {
        let rt = runtime();
        let machine = machine_with(&rt, &["intake", "outlet"]);
        machine.start_machine().unwrap();
        assert_eq!(machine.version(), "1.0.0");

        machine.pause().unwrap();
        assert_eq!(machine.state(), LifecycleState::Waiting);
        assert_eq!(
            machine.composite("intake").unwrap().state(),
            LifecycleState::Ready
        );
        machine.resume().unwrap();
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Operational);

        assert!(machine.set_error_state("pressure sensor offline"));
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Impaired);
        assert!(matches!(machine.resume(), Err(MachineError::Faulted(_))));

        assert!(machine.reset_from_error().unwrap());
        assert_eq!(machine.state(), LifecycleState::Ready);
        machine.set_version("1.1.0").unwrap();
        machine.start_machine().unwrap();
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Operational);
    }

    #[test]
    fn composite_belongs_to_one_machine() {
        let rt = runtime();
        let first = machine_with(&rt, &["intake"]);
        let second = rt.create_machine("backup", None).unwrap();
        let intake = first.composite("intake").unwrap();

        assert_eq!(
            second.add_composite("intake", intake.clone()).unwrap_err(),
            MachineError::AlreadyAttached(intake.id())
        );
        first.remove_composite("intake").unwrap();
        assert!(second.add_composite("intake", intake).unwrap());
    }

    #[test]
    fn terminate_cascades_to_leaves() {
        let rt = runtime();
        let machine = machine_with(&rt, &["intake"]);
        machine.start_machine().unwrap();
        let intake = machine.composite("intake").unwrap();

        machine.terminate_machine().unwrap();

        assert_eq!(intake.state(), LifecycleState::Terminated);
        assert_eq!(
            intake.get("intake-0").unwrap().state(),
            LifecycleState::Terminated
        );
        assert_eq!(machine.evaluate_aggregate_state(), MachineState::Impaired);
    }
}

// =============================================================================
// Concurrency
// =============================================================================

mod concurrency {
    use super::*;

    #[test]
    fn concurrent_adds_with_same_name_admit_one() {
        let rt = Arc::new(runtime());
        let pump = rt.create_composite("pump", None).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rt = Arc::clone(&rt);
                let pump = Arc::clone(&pump);
                std::thread::spawn(move || {
                    let leaf = rt.create_leaf("racer", Some(&pump.id())).unwrap();
                    pump.add("racer", leaf).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(pump.len(), 1);
    }

    #[test]
    fn evaluation_during_mutation_never_panics() {
        let rt = Arc::new(runtime());
        let pump = rt.create_composite("pump", None).unwrap();
        pump.activate().unwrap();

        let writer = {
            let rt = Arc::clone(&rt);
            let pump = Arc::clone(&pump);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let name = format!("leaf-{i}");
                    let leaf = rt.create_leaf(&name, Some(&pump.id())).unwrap();
                    leaf.activate().unwrap();
                    pump.add(name, leaf).unwrap();
                }
            })
        };
        for _ in 0..50 {
            let _ = pump.evaluate_aggregate_state();
        }
        writer.join().unwrap();

        assert_eq!(pump.len(), 50);
        assert_eq!(pump.evaluate_aggregate_state(), CompositeState::Flowing);
    }
}
