use gatesim::Bit;
use gatesim::GateKind;
use gatesim::Netlist;
use gatesim::Sim;
use gatesim::SimConfig;
use gatesim::SimError;
use gatesim::Timeline;

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_timeline() {
    let mut timeline: Timeline<&str> = Timeline::new();
    timeline.add("late", 4).unwrap();
    timeline.add("first", 2).unwrap();
    timeline.add("second", 2).unwrap();

    assert_eq!(timeline.pop(), Some("first"));
    assert_eq!(timeline.current_origin(), 2);
    assert_eq!(timeline.add("past", 1), Err(SimError::NonCausal { requested: 1, origin: 2 }));
    timeline.add("now", 2).unwrap();

    assert_eq!(timeline.pop(), Some("second"));
    assert_eq!(timeline.pop(), Some("now"));
    assert_eq!(timeline.pop(), Some("late"));
    assert_eq!(timeline.pop(), None);
    assert_eq!(timeline.current_origin(), 4);
}

#[test]
fn test_sim() {
    let mut sim = Sim::new(SimConfig::default().with_default_delay(2));
    let a = sim.add_carrier("a").unwrap();
    let b = sim.add_carrier("b").unwrap();
    let n = sim.add_carrier("n").unwrap();
    let y = sim.add_carrier("y").unwrap();
    sim.add_gate(GateKind::Not, &[a], n).unwrap();
    let or = sim.add_gate(GateKind::Or, &[n, b], y).unwrap();
    assert!(sim.signal(y));

    let seen: Rc<RefCell<Vec<(u64, Bit)>>> = Rc::new(RefCell::new(vec![]));
    let sink = seen.clone();
    sim.observe(y, move |change| sink.borrow_mut().push((change.time, change.value))).unwrap();

    sim.set_signal(a, true).unwrap();
    sim.settle().unwrap();
    assert!(!sim.signal(y));

    sim.schedule_signal(b, true, 3).unwrap();
    sim.settle().unwrap();
    assert!(sim.signal(y));

    sim.reconfigure_gate(or, GateKind::Nor, 1).unwrap();
    sim.settle().unwrap();
    assert!(!sim.signal(y));

    assert_eq!(*seen.borrow(), vec![(4, false), (9, true), (10, false)]);
}

#[test]
fn test_netlist() {
    let mut netlist = Netlist::builtin();
    netlist.add_input("x").unwrap();
    netlist.add_instance("XOR", "flip").unwrap();
    netlist.add_instance_with_delay("NOT", "inv", 5).unwrap();
    netlist.connect_input("x", "flip", "a").unwrap();
    netlist.connect("flip", "y", "inv", "a").unwrap();
    netlist.expose("out", "inv").unwrap();
    assert_eq!(netlist.critical_path(1), Some(6));

    let mut sim = netlist.elaborate(SimConfig::default()).unwrap();
    assert_eq!(sim.peek("out"), Ok(true));

    sim.poke("x", true).unwrap();
    let report = sim.settle().unwrap();
    assert_eq!(report.elapsed(), 6);
    assert_eq!(sim.peek("out"), Ok(false));

    sim.poke("flip.b", true).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.peek("out"), Ok(true));
    assert_eq!(sim.peek("inv.b"), Err(SimError::NoSuchCarrier("inv.b".to_string())));
}
