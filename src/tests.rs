use super::*;
use crate::circuits::*;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

struct HalfAdder {
    sim: Sim,
    a: CarrierId,
    b: CarrierId,
    s: CarrierId,
    c: CarrierId,
}

fn make_half_adder() -> HalfAdder {
    let mut sim = Sim::default();
    let a = sim.add_carrier("a").unwrap();
    let b = sim.add_carrier("b").unwrap();
    let s = sim.add_carrier("s").unwrap();
    let c = sim.add_carrier("c").unwrap();
    half_adder(&mut sim, a, b, s, c, "ha").unwrap();
    HalfAdder { sim, a, b, s, c }
}

#[test]
fn truth_tables_after_quiescence() {
    for kind in [GateKind::And, GateKind::Or, GateKind::Nand, GateKind::Nor, GateKind::Xor] {
        for a in [false, true] {
            for b in [false, true] {
                let mut sim = Sim::default();
                let in_a = sim.add_carrier("a").unwrap();
                let in_b = sim.add_carrier("b").unwrap();
                let out = sim.add_carrier("y").unwrap();
                sim.add_gate(kind, &[in_a, in_b], out).unwrap();

                sim.set_signal(in_a, a).unwrap();
                sim.set_signal(in_b, b).unwrap();
                sim.settle().unwrap();
                assert_eq!(sim.signal(out), kind.table().eval(&[a, b]), "{kind} {a} {b}");
            }
        }
    }
}

#[test]
fn truth_tables_through_netlist() {
    let expected = [
        ("AND", [false, false, false, true]),
        ("OR", [false, true, true, true]),
        ("NAND", [true, true, true, false]),
        ("NOR", [true, false, false, false]),
        ("XOR", [false, true, true, false]),
    ];
    for (kind, outputs) in expected {
        let mut netlist = Netlist::builtin();
        netlist.add_instance(kind, "g").unwrap();
        let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
        for (i, output) in outputs.iter().enumerate() {
            sim.poke("g.a", i & 2 != 0).unwrap();
            sim.poke("g.b", i & 1 != 0).unwrap();
            sim.settle().unwrap();
            assert_eq!(sim.peek("g.y").unwrap(), *output, "{kind} row {i}");
        }
    }
}

#[test]
fn half_adder_scenario() {
    let HalfAdder { mut sim, a, b, s, c } = make_half_adder();

    sim.set_signal(a, true).unwrap();
    sim.set_signal(b, true).unwrap();
    sim.settle().unwrap();
    assert!(!sim.signal(s));
    assert!(sim.signal(c));

    sim.reset().unwrap();
    sim.settle().unwrap();
    sim.set_signal(a, true).unwrap();
    sim.set_signal(b, false).unwrap();
    sim.settle().unwrap();
    assert!(sim.signal(s));
    assert!(!sim.signal(c));
}

#[test]
fn half_adder_all_inputs() {
    let HalfAdder { mut sim, a, b, s, c } = make_half_adder();
    for (in_a, in_b) in [(false, false), (true, false), (true, true), (false, true), (false, false)] {
        sim.set_signal(a, in_a).unwrap();
        sim.set_signal(b, in_b).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.signal(s), in_a ^ in_b, "s for {in_a} {in_b}");
        assert_eq!(sim.signal(c), in_a && in_b, "c for {in_a} {in_b}");
    }
}

#[test]
fn half_adder_trace() {
    let HalfAdder { mut sim, a, b, .. } = make_half_adder();
    let trace = Rc::new(RefCell::new(vec![]));
    let sink = trace.clone();
    sim.observe_all(move |change| {
        if change.name == "s" || change.name == "c" {
            sink.borrow_mut().push(change.to_string());
        }
    });

    sim.set_signal(a, true).unwrap();
    sim.set_signal(b, true).unwrap();
    sim.settle().unwrap();

    // the sum glitches high until the inverted carry catches up
    assert_eq!(*trace.borrow(), vec!["T=1 c = 1", "T=2 s = 1", "T=3 s = 0"]);
}

#[test]
fn half_adder_netlist_scenario() {
    let netlist = half_adder_netlist().unwrap();
    assert!(netlist.is_feedback_free());
    assert_eq!(netlist.combinational_depth(), Some(3));

    let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
    sim.settle().unwrap();

    sim.poke("a", true).unwrap();
    sim.poke("b", true).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.peek("s"), Ok(false));
    assert_eq!(sim.peek("c"), Ok(true));

    sim.reset().unwrap();
    sim.settle().unwrap();
    sim.poke("a", true).unwrap();
    sim.poke("b", false).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.peek("s"), Ok(true));
    assert_eq!(sim.peek("c"), Ok(false));
}

#[test]
fn cascaded_parity() {
    let netlist = xor_cascade(3).unwrap();
    let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
    let inputs = ["xor0.a", "xor0.b", "xor1.b", "xor2.b"];

    for i in 0..16u32 {
        for (j, input) in inputs.iter().enumerate() {
            sim.poke(input, (i >> j) & 1 == 1).unwrap();
        }
        sim.settle().unwrap();
        assert_eq!(sim.peek("xor2.y").unwrap(), i.count_ones() % 2 == 1, "inputs {i:04b}");
        assert_eq!(sim.peek("parity"), sim.peek("xor2.y"));
    }
}

#[test]
fn acyclic_circuits_settle_within_critical_path() {
    for delay in [1, 3] {
        let netlist = half_adder_netlist().unwrap();
        let bound = netlist.critical_path(delay).unwrap();
        assert_eq!(bound, 3 * delay);

        let mut sim = netlist.elaborate(SimConfig::default().with_default_delay(delay)).unwrap();
        sim.settle().unwrap();
        for (a, b) in [(true, false), (true, true), (false, true), (false, false)] {
            sim.poke("a", a).unwrap();
            sim.poke("b", b).unwrap();
            let report = sim.settle().unwrap();
            assert!(report.elapsed() <= bound, "{report:?} exceeds {bound}");
        }
    }
}

fn run_parity_once() -> BTreeMap<String, Bit> {
    let mut sim = xor_cascade(4).unwrap().elaborate(SimConfig::default()).unwrap();
    sim.poke("xor0.a", true).unwrap();
    sim.poke("xor2.b", true).unwrap();
    sim.poke("xor3.b", true).unwrap();
    sim.settle().unwrap();
    sim.values()
}

#[test]
fn runs_are_deterministic() {
    assert_eq!(run_parity_once(), run_parity_once());

    let HalfAdder { mut sim, a, b, .. } = make_half_adder();
    sim.set_signal(a, true).unwrap();
    sim.set_signal(b, true).unwrap();
    sim.settle().unwrap();
    let first = sim.values();

    sim.reset().unwrap();
    sim.settle().unwrap();
    sim.set_signal(a, true).unwrap();
    sim.set_signal(b, true).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.values(), first);
}

#[test]
fn independent_simulations_do_not_interfere() {
    let mut left = make_half_adder();
    let mut right = make_half_adder();

    left.sim.set_signal(left.a, true).unwrap();
    right.sim.set_signal(right.b, true).unwrap();
    right.sim.set_signal(right.a, true).unwrap();
    assert_eq!(left.sim.pending(), 2);
    assert_eq!(right.sim.pending(), 4);

    left.sim.settle().unwrap();
    assert_eq!(right.sim.pending(), 4);
    right.sim.settle().unwrap();

    assert!(left.sim.signal(left.s));
    assert!(!left.sim.signal(left.c));
    assert!(!right.sim.signal(right.s));
    assert!(right.sim.signal(right.c));
}

#[test]
fn full_adder_sums() {
    let mut sim = Sim::default();
    let a = sim.add_carrier("a").unwrap();
    let b = sim.add_carrier("b").unwrap();
    let c_in = sim.add_carrier("c_in").unwrap();
    let sum = sim.add_carrier("sum").unwrap();
    let c_out = sim.add_carrier("c_out").unwrap();
    full_adder(&mut sim, a, b, c_in, sum, c_out, "fa").unwrap();

    for i in 0..8u32 {
        sim.set_signal(a, i & 1 != 0).unwrap();
        sim.set_signal(b, i & 2 != 0).unwrap();
        sim.set_signal(c_in, i & 4 != 0).unwrap();
        sim.settle().unwrap();
        let total = i.count_ones();
        assert_eq!(sim.signal(sum), total % 2 == 1, "sum for {i:03b}");
        assert_eq!(sim.signal(c_out), total >= 2, "carry for {i:03b}");
    }
}

#[test]
fn ripple_carry_adder_adds() {
    let mut sim = Sim::default();
    let a = bus(&mut sim, "a", 4).unwrap();
    let b = bus(&mut sim, "b", 4).unwrap();
    let sum = bus(&mut sim, "sum", 4).unwrap();
    let c_out = sim.add_carrier("c_out").unwrap();
    ripple_carry_adder(&mut sim, &a, &b, &sum, c_out, "add").unwrap();

    for (x, y) in [(0, 0), (1, 1), (3, 5), (7, 8), (9, 9), (15, 1), (15, 15)] {
        set_bus(&mut sim, &a, x).unwrap();
        set_bus(&mut sim, &b, y).unwrap();
        sim.settle().unwrap();
        let total = read_bus(&sim, &sum) + ((sim.signal(c_out) as u64) << 4);
        assert_eq!(total, x + y, "{x} + {y}");
    }
}

#[test]
fn ripple_carry_adder_checks_widths() {
    let mut sim = Sim::default();
    let a = bus(&mut sim, "a", 4).unwrap();
    let b = bus(&mut sim, "b", 3).unwrap();
    let sum = bus(&mut sim, "sum", 4).unwrap();
    let c_out = sim.add_carrier("c_out").unwrap();
    assert!(matches!(
        ripple_carry_adder(&mut sim, &a, &b, &sum, c_out, "add"),
        Err(SimError::ArityMismatch { .. }),
    ));
}

#[test]
fn ring_oscillator_does_not_settle() {
    let netlist = ring_oscillator(3).unwrap();
    assert!(!netlist.is_feedback_free());
    assert_eq!(netlist.combinational_depth(), None);

    let mut sim = netlist.elaborate(SimConfig::default().with_max_steps(Some(30))).unwrap();
    assert_eq!(sim.state(), DriverState::Running);
    match sim.settle() {
        Err(SimError::DidNotSettle { steps, .. }) => assert_eq!(steps, 30),
        other => panic!("expected DidNotSettle, got {other:?}"),
    }

    // still oscillating: each inverter toggles once per three timepoints
    let before = sim.peek("not0.y").unwrap();
    sim.step().unwrap();
    sim.step().unwrap();
    sim.step().unwrap();
    assert_ne!(sim.peek("not0.y").unwrap(), before);
}

#[test]
fn even_ring_is_a_latch() {
    let netlist = ring_oscillator(2).unwrap();
    let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
    sim.settle().unwrap();
    assert_ne!(sim.peek("not0.y").unwrap(), sim.peek("not1.y").unwrap());
}

#[test]
fn custom_kind_in_netlist() {
    let mut library = Library::with_builtins();
    library.register("IMPLIES", KindConfig::new(&["p", "q"], "r", TruthTable::binary(true, true, false, true))).unwrap();

    let mut netlist = Netlist::new(std::sync::Arc::new(library));
    netlist.add_instance_with_delay("IMPLIES", "imp", 4).unwrap();
    let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
    assert_eq!(sim.peek("imp.r"), Ok(true));

    sim.poke("imp.p", true).unwrap();
    let report = sim.settle().unwrap();
    assert_eq!(sim.peek("imp.r"), Ok(false));
    assert_eq!(report.settled_at, 4);
}
