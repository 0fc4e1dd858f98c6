use super::*;
use log::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

pub type PinName = String;

/// The pin topology and function of a component kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindConfig {
    inputs: Vec<PinName>,
    output: PinName,
    table: TruthTable,
}

impl KindConfig {
    pub fn new<T: Into<TruthTable>>(inputs: &[&str], output: &str, table: T) -> KindConfig {
        KindConfig {
            inputs: inputs.iter().map(|pin| pin.to_string()).collect(),
            output: output.to_string(),
            table: table.into(),
        }
    }

    /// Input pins, in the order they index the truth table.
    pub fn inputs(&self) -> &[PinName] {
        &self.inputs
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn table(&self) -> TruthTable {
        self.table
    }

    pub fn has_input(&self, pin: &str) -> bool {
        self.inputs.iter().any(|input| input == pin)
    }

    fn check(&self) -> Result<(), String> {
        if self.inputs.len() != self.table.arity() {
            return Err(format!(
                "{} input pins for a truth table of arity {}",
                self.inputs.len(),
                self.table.arity(),
            ));
        }
        for (i, pin) in self.inputs.iter().enumerate() {
            if self.inputs[..i].contains(pin) || *pin == self.output {
                return Err(format!("pin {pin} is declared twice"));
            }
        }
        Ok(())
    }
}

/// A registry of component kinds.
#[derive(Debug, Clone, Default)]
pub struct Library {
    kinds: BTreeMap<String, KindConfig>,
}

static BUILTIN: Lazy<Arc<Library>> = Lazy::new(|| Arc::new(Library::with_builtins()));

impl Library {
    pub fn new() -> Library {
        Library::default()
    }

    /// A library holding `AND`, `OR`, `NAND`, `NOR` and `XOR` (pins `a`, `b` -> `y`)
    /// and `NOT` (pin `a` -> `y`).
    pub fn with_builtins() -> Library {
        let mut library = Library::new();
        for kind in GateKind::ALL {
            let inputs: &[&str] = if kind == GateKind::Not { &["a"] } else { &["a", "b"] };
            library.kinds.insert(kind.name().to_string(), KindConfig::new(inputs, "y", kind));
        }
        library
    }

    /// The shared built-in library.
    pub fn builtin() -> Arc<Library> {
        BUILTIN.clone()
    }

    pub fn register(&mut self, kind: &str, config: KindConfig) -> Result<(), NetlistError> {
        if self.kinds.contains_key(kind) {
            return Err(NetlistError::KindAlreadyRegistered(kind.to_string()));
        }
        config.check().map_err(|reason| NetlistError::InvalidKind(kind.to_string(), reason))?;
        self.kinds.insert(kind.to_string(), config);
        Ok(())
    }

    pub fn kind(&self, kind: &str) -> Option<&KindConfig> {
        self.kinds.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(|kind| kind.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub kind: String,
    /// Overrides [`SimConfig::default_delay`] when set.
    pub delay: Option<Timepoint>,
}

/// What drives an input pin.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    /// A top-level input of the netlist.
    Port(String),
    /// The output pin of an instance.
    Pin(String, PinName),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Endpoint::Port(name) => write!(f, "{name}"),
            Endpoint::Pin(instance, pin) => write!(f, "{instance}.{pin}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Connection {
    pub source: Endpoint,
    pub sink: String,
    pub input: PinName,
}

/// A structural description of a circuit: instances of library kinds and
/// the point-to-point connections between their pins.
///
/// Every mutation is validated against the library, so a `Netlist` that
/// exists is always well formed and elaborates without error. Port, output
/// and instance names share one namespace and may not contain `.`, which
/// is reserved for `instance.pin` carrier names.
#[derive(Debug, Clone)]
pub struct Netlist {
    library: Arc<Library>,
    ports: Vec<String>,
    instances: Vec<Instance>,
    instance_id_by_name: BTreeMap<String, usize>,
    connections: Vec<Connection>,
    driver_by_input: BTreeMap<(String, PinName), Endpoint>,
    outputs: Vec<(String, String)>,
}

impl Netlist {
    pub fn new(library: Arc<Library>) -> Netlist {
        Netlist {
            library,
            ports: vec![],
            instances: vec![],
            instance_id_by_name: BTreeMap::new(),
            connections: vec![],
            driver_by_input: BTreeMap::new(),
            outputs: vec![],
        }
    }

    /// A netlist over [`Library::builtin`].
    pub fn builtin() -> Netlist {
        Netlist::new(Library::builtin())
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn outputs(&self) -> &[(String, String)] {
        &self.outputs
    }

    /// Fails if `name` cannot be used for a new port, output or instance.
    fn check_name(&self, name: &str) -> Result<(), NetlistError> {
        if name.is_empty() || name.contains('.') {
            Err(NetlistError::InvalidName(name.to_string()))
        } else if self.name_taken(name) {
            Err(NetlistError::DuplicateInstance(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.instance_id_by_name.contains_key(name)
            || self.ports.iter().any(|port| port == name)
            || self.outputs.iter().any(|(output, _instance)| output == name)
    }

    fn kind_of(&self, instance: &str) -> Result<&KindConfig, NetlistError> {
        let instance_id = self.instance_id_by_name
            .get(instance)
            .ok_or_else(|| NetlistError::NoSuchInstance(instance.to_string()))?;
        let kind = &self.instances[*instance_id].kind;
        self.library.kind(kind).ok_or_else(|| NetlistError::UnknownKind(kind.to_string()))
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instance_id_by_name.get(name).map(|instance_id| &self.instances[*instance_id])
    }

    pub fn add_instance(&mut self, kind: &str, name: &str) -> Result<(), NetlistError> {
        self.add(kind, name, None)
    }

    pub fn add_instance_with_delay(&mut self, kind: &str, name: &str, delay: Timepoint) -> Result<(), NetlistError> {
        self.add(kind, name, Some(delay))
    }

    fn add(&mut self, kind: &str, name: &str, delay: Option<Timepoint>) -> Result<(), NetlistError> {
        if self.library.kind(kind).is_none() {
            return Err(NetlistError::UnknownKind(kind.to_string()));
        }
        self.check_name(name)?;
        self.instance_id_by_name.insert(name.to_string(), self.instances.len());
        self.instances.push(Instance {
            name: name.to_string(),
            kind: kind.to_string(),
            delay,
        });
        Ok(())
    }

    /// Declare a top-level input. It becomes a carrier of the same name.
    pub fn add_input(&mut self, name: &str) -> Result<(), NetlistError> {
        self.check_name(name)?;
        self.ports.push(name.to_string());
        Ok(())
    }

    /// Give the output carrier of `instance` the top-level name `name`.
    pub fn expose(&mut self, name: &str, instance: &str) -> Result<(), NetlistError> {
        self.kind_of(instance)?;
        self.check_name(name)?;
        self.outputs.push((name.to_string(), instance.to_string()));
        Ok(())
    }

    /// Connect `source.output` to `sink.input`.
    pub fn connect(&mut self, source: &str, output: &str, sink: &str, input: &str) -> Result<(), NetlistError> {
        if self.kind_of(source)?.output() != output {
            return Err(NetlistError::NotAnOutput(source.to_string(), output.to_string()));
        }
        self.drive(Endpoint::Pin(source.to_string(), output.to_string()), sink, input)
    }

    /// Connect the top-level input `port` to `sink.input`.
    pub fn connect_input(&mut self, port: &str, sink: &str, input: &str) -> Result<(), NetlistError> {
        if !self.ports.iter().any(|name| name == port) {
            return Err(NetlistError::NoSuchInstance(port.to_string()));
        }
        self.drive(Endpoint::Port(port.to_string()), sink, input)
    }

    fn drive(&mut self, source: Endpoint, sink: &str, input: &str) -> Result<(), NetlistError> {
        if !self.kind_of(sink)?.has_input(input) {
            return Err(NetlistError::NotAnInput(sink.to_string(), input.to_string()));
        }

        let key = (sink.to_string(), input.to_string());
        match self.driver_by_input.get(&key) {
            // repeating a connection is harmless
            Some(driver) if *driver == source => return Ok(()),
            Some(_driver) => return Err(NetlistError::MultipleDrivers(key.0, key.1)),
            None => (),
        }

        self.driver_by_input.insert(key, source.clone());
        self.connections.push(Connection {
            source,
            sink: sink.to_string(),
            input: input.to_string(),
        });
        Ok(())
    }

    pub fn driver_of(&self, sink: &str, input: &str) -> Option<&Endpoint> {
        self.driver_by_input.get(&(sink.to_string(), input.to_string()))
    }

    /// Instances as nodes, instance-to-instance connections as edges.
    fn graph(&self) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.instances.len()).map(|instance_id| graph.add_node(instance_id)).collect();
        for connection in &self.connections {
            if let Endpoint::Pin(source, _pin) = &connection.source {
                let source_id = self.instance_id_by_name[source];
                let sink_id = self.instance_id_by_name[&connection.sink];
                graph.add_edge(nodes[source_id], nodes[sink_id], ());
            }
        }
        graph
    }

    /// Whether no gate output feeds back, directly or indirectly, into its own inputs.
    pub fn is_feedback_free(&self) -> bool {
        !is_cyclic_directed(&self.graph())
    }

    /// The number of gates on the longest path through the netlist, or
    /// `None` when it has feedback.
    pub fn combinational_depth(&self) -> Option<usize> {
        self.longest_path(|_instance| 1)
            .map(|depth| depth as usize)
    }

    /// The longest propagation delay through the netlist, or `None` when
    /// it has feedback. An acyclic netlist settles within this many
    /// timepoints of its last stimulus.
    pub fn critical_path(&self, default_delay: Timepoint) -> Option<Timepoint> {
        self.longest_path(|instance| instance.delay.unwrap_or(default_delay))
    }

    fn longest_path<F: Fn(&Instance) -> Timepoint>(&self, weight: F) -> Option<Timepoint> {
        let graph = self.graph();
        let order = toposort(&graph, None).ok()?;
        let mut arrival: Vec<Timepoint> = vec![0; self.instances.len()];
        for node in order {
            let instance_id = graph[node];
            let latest_input = graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .map(|pred| arrival[graph[pred]])
                .max()
                .unwrap_or(0);
            arrival[instance_id] = latest_input + weight(&self.instances[instance_id]);
        }
        Some(arrival.into_iter().max().unwrap_or(0))
    }

    /// Build a [`Sim`] for this netlist.
    ///
    /// Each top-level input and each instance output becomes one carrier.
    /// An input pin driven by a connection shares its driver's carrier and
    /// is registered as an alias for it; an undriven input pin gets a
    /// carrier of its own. All pins are named `instance.pin`.
    pub fn elaborate(&self, config: SimConfig) -> Result<Sim, SimError> {
        let default_delay = config.default_delay;
        let mut sim = Sim::new(config);

        let mut port_carriers: BTreeMap<&str, CarrierId> = BTreeMap::new();
        for port in &self.ports {
            port_carriers.insert(port.as_str(), sim.add_carrier(port.clone())?);
        }

        let mut output_carriers: Vec<CarrierId> = vec![];
        for instance in &self.instances {
            let kind = self.kind_of(&instance.name)?;
            output_carriers.push(sim.add_carrier(format!("{}.{}", instance.name, kind.output()))?);
        }

        let mut input_carriers: Vec<Vec<CarrierId>> = vec![];
        for instance in &self.instances {
            let kind = self.kind_of(&instance.name)?;
            let mut inputs = vec![];
            for pin in kind.inputs() {
                let pin_name = format!("{}.{pin}", instance.name);
                let carrier_id = match self.driver_of(&instance.name, pin) {
                    Some(Endpoint::Port(port)) => port_carriers[port.as_str()],
                    Some(Endpoint::Pin(source, _output)) => output_carriers[self.instance_id_by_name[source]],
                    None => {
                        inputs.push(sim.add_carrier(pin_name)?);
                        continue;
                    },
                };
                sim.alias(pin_name, carrier_id)?;
                inputs.push(carrier_id);
            }
            input_carriers.push(inputs);
        }

        for (name, instance) in &self.outputs {
            sim.alias(name.clone(), output_carriers[self.instance_id_by_name[instance]])?;
        }

        for (instance_id, instance) in self.instances.iter().enumerate() {
            let kind = self.kind_of(&instance.name)?;
            let delay = instance.delay.unwrap_or(default_delay);
            sim.add_gate_with_delay(kind.table(), &input_carriers[instance_id], output_carriers[instance_id], delay)?;
        }

        info!(
            "elaborated {} instances into {} carriers and {} gates",
            self.instances.len(),
            sim.carriers().len(),
            sim.gates().len(),
        );
        Ok(sim)
    }
}

impl std::fmt::Display for Netlist {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if !self.ports.is_empty() {
            writeln!(f, "IN {};", self.ports.join(", "))?;
        }
        if !self.outputs.is_empty() {
            let outputs: Vec<String> = self.outputs.iter().map(|(name, instance)| format!("{name} = {instance}")).collect();
            writeln!(f, "OUT {};", outputs.join(", "))?;
        }
        for instance in &self.instances {
            let kind = self.library.kind(&instance.kind);
            let pins: Vec<String> = kind
                .map(|kind| kind.inputs().to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|pin| match self.driver_of(&instance.name, &pin) {
                    Some(driver) => format!("{pin} = {driver}"),
                    None => pin,
                })
                .collect();
            write!(f, "{} {}({})", instance.kind, instance.name, pins.join(", "))?;
            if let Some(delay) = instance.delay {
                write!(f, " after {delay}")?;
            }
            writeln!(f, ";")?;
        }
        Ok(())
    }
}
