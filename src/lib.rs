//! Discrete-event simulation of combinational logic.
//!
//! A [`Sim`] owns a graph of carriers (wires) and gates together with a
//! [`Timeline`] of pending actions. Setting a carrier schedules a recompute
//! of every gate reading it, one gate delay later. [`Sim::settle`] runs the
//! timeline until nothing is pending.
//!
//! ```
//! use gatesim::*;
//!
//! let mut sim = Sim::default();
//! let a = sim.add_carrier("a").unwrap();
//! let b = sim.add_carrier("b").unwrap();
//! let y = sim.add_carrier("y").unwrap();
//! sim.add_gate(GateKind::Xor, &[a, b], y).unwrap();
//!
//! sim.set_signal(a, true).unwrap();
//! sim.settle().unwrap();
//! assert!(sim.signal(y));
//! ```
//!
//! Circuits can also be described structurally with a [`Netlist`] and
//! elaborated into a `Sim`.

mod error;
mod config;
mod timeline;
mod carrier;
mod gate;
mod sim;
pub mod netlist;
pub mod circuits;

#[cfg(test)]
mod tests;

pub use error::*;
pub use config::*;
pub use timeline::*;
pub use carrier::*;
pub use gate::*;
pub use sim::*;
pub use netlist::{Connection, Endpoint, Instance, KindConfig, Library, Netlist, PinName};
