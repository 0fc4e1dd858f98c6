//! Wiring for a handful of classic circuits.
//!
//! The functions taking a `&mut Sim` wire gates directly onto existing
//! carriers, naming any internal carriers under `scope`. The functions
//! returning a [`Netlist`] describe the same kind of thing structurally.
use super::*;

/// `s = a xor b`, `c = a and b`, built from OR, AND and NOT.
pub fn half_adder(sim: &mut Sim, a: CarrierId, b: CarrierId, s: CarrierId, c: CarrierId, scope: &str) -> Result<(), SimError> {
    let d = sim.add_carrier(format!("{scope}.d"))?;
    let e = sim.add_carrier(format!("{scope}.e"))?;
    sim.add_gate(GateKind::Or, &[a, b], d)?;
    sim.add_gate(GateKind::And, &[a, b], c)?;
    sim.add_gate(GateKind::Not, &[c], e)?;
    sim.add_gate(GateKind::And, &[d, e], s)?;
    Ok(())
}

/// Two half adders and an OR gate.
pub fn full_adder(
    sim: &mut Sim,
    a: CarrierId,
    b: CarrierId,
    c_in: CarrierId,
    sum: CarrierId,
    c_out: CarrierId,
    scope: &str,
) -> Result<(), SimError> {
    let s = sim.add_carrier(format!("{scope}.s"))?;
    let c1 = sim.add_carrier(format!("{scope}.c1"))?;
    let c2 = sim.add_carrier(format!("{scope}.c2"))?;
    half_adder(sim, b, c_in, s, c1, &format!("{scope}.ha1"))?;
    half_adder(sim, a, s, sum, c2, &format!("{scope}.ha2"))?;
    sim.add_gate(GateKind::Or, &[c1, c2], c_out)?;
    Ok(())
}

/// A ripple-carry adder over little-endian operands.
///
/// `a`, `b` and `sum` must have the same width. The carry into the lowest
/// bit is a carrier named `{scope}.c0` held at 0.
pub fn ripple_carry_adder(
    sim: &mut Sim,
    a: &[CarrierId],
    b: &[CarrierId],
    sum: &[CarrierId],
    c_out: CarrierId,
    scope: &str,
) -> Result<(), SimError> {
    if a.len() != b.len() || a.len() != sum.len() {
        return Err(SimError::ArityMismatch { expected: a.len(), actual: b.len().min(sum.len()) });
    }

    let mut carry = sim.add_carrier(format!("{scope}.c0"))?;
    for i in 0..a.len() {
        let next_carry = if i + 1 == a.len() {
            c_out
        } else {
            sim.add_carrier(format!("{scope}.c{}", i + 1))?
        };
        full_adder(sim, a[i], b[i], carry, sum[i], next_carry, &format!("{scope}.fa{i}"))?;
        carry = next_carry;
    }
    Ok(())
}

/// Carriers `{prefix}0` through `{prefix}{width - 1}`.
pub fn bus(sim: &mut Sim, prefix: &str, width: usize) -> Result<Vec<CarrierId>, SimError> {
    (0..width).map(|i| sim.add_carrier(format!("{prefix}{i}"))).collect()
}

/// Drive a little-endian bus with the low bits of `value`.
pub fn set_bus(sim: &mut Sim, bus: &[CarrierId], value: u64) -> Result<(), SimError> {
    for (i, carrier_id) in bus.iter().enumerate() {
        sim.set_signal(*carrier_id, (value >> i) & 1 == 1)?;
    }
    Ok(())
}

pub fn read_bus(sim: &Sim, bus: &[CarrierId]) -> u64 {
    bus.iter()
        .enumerate()
        .map(|(i, carrier_id)| (sim.signal(*carrier_id) as u64) << i)
        .sum()
}

/// The half adder as a netlist with inputs `a`, `b` and outputs `s`, `c`.
pub fn half_adder_netlist() -> Result<Netlist, NetlistError> {
    let mut netlist = Netlist::builtin();
    netlist.add_input("a")?;
    netlist.add_input("b")?;
    netlist.add_instance("OR", "or")?;
    netlist.add_instance("AND", "carry")?;
    netlist.add_instance("NOT", "inv")?;
    netlist.add_instance("AND", "sum")?;

    for gate in ["or", "carry"] {
        netlist.connect_input("a", gate, "a")?;
        netlist.connect_input("b", gate, "b")?;
    }
    netlist.connect("carry", "y", "inv", "a")?;
    netlist.connect("or", "y", "sum", "a")?;
    netlist.connect("inv", "y", "sum", "b")?;

    netlist.expose("s", "sum")?;
    netlist.expose("c", "carry")?;
    Ok(netlist)
}

/// `n` XOR gates, each one's output feeding the `a` input of the next.
///
/// The free inputs are `xor0.a` and every `xor{i}.b`; the output of the
/// last gate is exposed as `parity`.
pub fn xor_cascade(n: usize) -> Result<Netlist, NetlistError> {
    let mut netlist = Netlist::builtin();
    for i in 0..n {
        netlist.add_instance("XOR", &format!("xor{i}"))?;
    }
    for i in 1..n {
        netlist.connect(&format!("xor{}", i - 1), "y", &format!("xor{i}"), "a")?;
    }
    if n > 0 {
        netlist.expose("parity", &format!("xor{}", n - 1))?;
    }
    Ok(netlist)
}

/// `n` inverters in a loop. With `n` odd it never settles.
pub fn ring_oscillator(n: usize) -> Result<Netlist, NetlistError> {
    let mut netlist = Netlist::builtin();
    for i in 0..n {
        netlist.add_instance("NOT", &format!("not{i}"))?;
    }
    for i in 0..n {
        netlist.connect(&format!("not{i}"), "y", &format!("not{}", (i + 1) % n), "a")?;
    }
    Ok(netlist)
}
