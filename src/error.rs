use super::*;

/// Structural errors raised while building a [`Library`] or a [`Netlist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetlistError {
    UnknownKind(String),
    KindAlreadyRegistered(String),
    InvalidKind(String, String),
    DuplicateInstance(String),
    NoSuchInstance(String),
    NotAnOutput(String, String),
    NotAnInput(String, String),
    MultipleDrivers(String, String),
    /// Top-level and instance names may not contain `.`, which separates
    /// an instance from its pin in carrier names.
    InvalidName(String),
}

/// Errors raised by a [`Sim`] while it is built or driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    Netlist(NetlistError),
    NoSuchCarrier(String),
    NoSuchGate(GateId),
    DuplicateCarrier(String),
    /// A second gate was bound onto a carrier that already has a driving gate.
    MultipleDrivers(String),
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    /// An action was scheduled behind the timeline's origin.
    NonCausal {
        requested: Timepoint,
        origin: Timepoint,
    },
    TimeOverflow {
        origin: Timepoint,
        delay: Timepoint,
    },
    /// The step or time budget ran out with actions still pending.
    DidNotSettle {
        steps: usize,
        time: Timepoint,
    },
}

impl std::fmt::Display for NetlistError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NetlistError::UnknownKind(kind) => write!(f, "Unknown component kind: {kind}"),
            NetlistError::KindAlreadyRegistered(kind) => write!(f, "Component kind already registered: {kind}"),
            NetlistError::InvalidKind(kind, reason) => write!(f, "Invalid component kind {kind}: {reason}"),
            NetlistError::DuplicateInstance(name) => write!(f, "Component of this name already exists: {name}"),
            NetlistError::NoSuchInstance(name) => write!(f, "No such component: {name}"),
            NetlistError::NotAnOutput(name, pin) => write!(f, "Not a valid output pin: {name}.{pin}"),
            NetlistError::NotAnInput(name, pin) => write!(f, "Not a valid input pin: {name}.{pin}"),
            NetlistError::MultipleDrivers(name, pin) => write!(f, "Input pin has multiple drivers: {name}.{pin}"),
            NetlistError::InvalidName(name) => write!(f, "Invalid name (contains '.'): {name}"),
        }
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SimError::Netlist(error) => write!(f, "Netlist error: {error}"),
            SimError::NoSuchCarrier(name) => write!(f, "No such carrier: {name}"),
            SimError::NoSuchGate(gate_id) => write!(f, "No such gate: #{gate_id}"),
            SimError::DuplicateCarrier(name) => write!(f, "Carrier of this name already exists: {name}"),
            SimError::MultipleDrivers(name) => write!(f, "Carrier already has a driving gate: {name}"),
            SimError::ArityMismatch { expected, actual } => {
                write!(f, "Gate expects {expected} inputs but {actual} were bound")
            },
            SimError::NonCausal { requested, origin } => {
                write!(f, "Cannot schedule an action at T={requested} when the origin is T={origin}")
            },
            SimError::TimeOverflow { origin, delay } => {
                write!(f, "Timepoint overflow scheduling {delay} after T={origin}")
            },
            SimError::DidNotSettle { steps, time } => {
                write!(f, "Circuit did not settle after {steps} steps (stopped at T={time})")
            },
        }
    }
}

impl std::error::Error for NetlistError {}

impl std::error::Error for SimError {}

impl From<NetlistError> for SimError {
    fn from(error: NetlistError) -> SimError {
        SimError::Netlist(error)
    }
}
