use super::*;

pub type GateId = usize;

/// The boolean function a gate computes.
///
/// A binary table is indexed `table[a][b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruthTable {
    Unary([Bit; 2]),
    Binary([[Bit; 2]; 2]),
}

impl TruthTable {
    pub const fn unary(o0: Bit, o1: Bit) -> TruthTable {
        TruthTable::Unary([o0, o1])
    }

    /// Outputs for the inputs 00, 01, 10 and 11, in that order.
    pub const fn binary(o00: Bit, o01: Bit, o10: Bit, o11: Bit) -> TruthTable {
        TruthTable::Binary([[o00, o01], [o10, o11]])
    }

    pub fn arity(&self) -> usize {
        match self {
            TruthTable::Unary(_) => 1,
            TruthTable::Binary(_) => 2,
        }
    }

    /// Evaluate the table. `inputs.len()` must equal [`TruthTable::arity`].
    pub fn eval(&self, inputs: &[Bit]) -> Bit {
        match (self, inputs) {
            (TruthTable::Unary(table), [a]) => table[*a as usize],
            (TruthTable::Binary(table), [a, b]) => table[*a as usize][*b as usize],
            _ => unreachable!("truth table of arity {} given {} inputs", self.arity(), inputs.len()),
        }
    }
}

/// The canonical gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Not,
}

impl GateKind {
    pub const ALL: [GateKind; 6] = [
        GateKind::And,
        GateKind::Or,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Not,
    ];

    pub fn table(self) -> TruthTable {
        match self {
            GateKind::And => TruthTable::binary(false, false, false, true),
            GateKind::Or => TruthTable::binary(false, true, true, true),
            GateKind::Nand => TruthTable::binary(true, true, true, false),
            GateKind::Nor => TruthTable::binary(true, false, false, false),
            GateKind::Xor => TruthTable::binary(false, true, true, false),
            GateKind::Not => TruthTable::unary(true, false),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Not => "NOT",
        }
    }
}

impl From<GateKind> for TruthTable {
    fn from(kind: GateKind) -> TruthTable {
        kind.table()
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A gate bound into a [`Sim`].
///
/// `version` is bumped whenever the gate is reconfigured. A pending
/// recompute carrying an older version is stale and is skipped.
#[derive(Debug, Clone)]
pub struct Gate {
    pub(crate) inputs: Vec<CarrierId>,
    pub(crate) output: CarrierId,
    pub(crate) table: TruthTable,
    pub(crate) delay: Timepoint,
    pub(crate) version: u64,
}

impl Gate {
    pub fn inputs(&self) -> &[CarrierId] {
        &self.inputs
    }

    pub fn output(&self) -> CarrierId {
        self.output
    }

    pub fn table(&self) -> TruthTable {
        self.table
    }

    pub fn delay(&self) -> Timepoint {
        self.delay
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
