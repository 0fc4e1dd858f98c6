use super::*;
use log::*;

use std::collections::BTreeMap;

/// An entry on a [`Sim`]'s timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Re-evaluate a gate and set its output carrier.
    Recompute {
        gate: GateId,
        version: u64,
    },
    /// Externally scheduled stimulus.
    Drive {
        carrier: CarrierId,
        value: Bit,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettleReport {
    /// Actions popped from the timeline, stale ones included.
    pub steps: usize,
    /// Recomputes skipped because their gate was reconfigured after scheduling.
    pub stale: usize,
    pub started_at: Timepoint,
    pub settled_at: Timepoint,
}

impl SettleReport {
    pub fn elapsed(&self) -> Timepoint {
        self.settled_at - self.started_at
    }
}

/// A circuit graph together with the timeline that drives it.
///
/// The `Sim` owns every carrier and gate. They are referred to by index
/// and live until the `Sim` is dropped. Each `Sim` has its own timeline,
/// so independent simulations never share scheduling state.
pub struct Sim {
    config: SimConfig,
    carriers: Vec<Carrier>, // indexed by CarrierId
    gates: Vec<Gate>, // indexed by GateId
    observers: Vec<Observer>, // indexed by ObserverId
    global_observers: Vec<ObserverId>,
    carrier_id_by_name: BTreeMap<String, CarrierId>,
    timeline: Timeline<Action>,
}

impl Sim {
    pub fn new(config: SimConfig) -> Sim {
        Sim {
            config,
            carriers: vec![],
            gates: vec![],
            observers: vec![],
            global_observers: vec![],
            carrier_id_by_name: BTreeMap::new(),
            timeline: Timeline::new(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, gate_id: GateId) -> Option<&Gate> {
        self.gates.get(gate_id)
    }

    pub fn add_carrier<S: Into<String>>(&mut self, name: S) -> Result<CarrierId, SimError> {
        let name = name.into();
        if self.carrier_id_by_name.contains_key(&name) {
            return Err(SimError::DuplicateCarrier(name));
        }
        let carrier_id = self.carriers.len();
        self.carrier_id_by_name.insert(name.clone(), carrier_id);
        self.carriers.push(Carrier::new(name));
        Ok(carrier_id)
    }

    /// Make `name` an additional name for an existing carrier.
    pub fn alias<S: Into<String>>(&mut self, name: S, carrier_id: CarrierId) -> Result<(), SimError> {
        let name = name.into();
        self.check_carrier(carrier_id)?;
        if self.carrier_id_by_name.contains_key(&name) {
            return Err(SimError::DuplicateCarrier(name));
        }
        self.carrier_id_by_name.insert(name, carrier_id);
        Ok(())
    }

    pub fn carrier(&self, name: &str) -> Result<CarrierId, SimError> {
        self.carrier_id_by_name
            .get(name)
            .copied()
            .ok_or_else(|| SimError::NoSuchCarrier(name.to_string()))
    }

    /// The name a carrier was created with.
    ///
    /// Panics if `carrier_id` was not produced by this `Sim`.
    pub fn carrier_name(&self, carrier_id: CarrierId) -> &str {
        self.carriers[carrier_id].name()
    }

    fn check_carrier(&self, carrier_id: CarrierId) -> Result<(), SimError> {
        if carrier_id < self.carriers.len() {
            Ok(())
        } else {
            Err(SimError::NoSuchCarrier(format!("#{carrier_id}")))
        }
    }

    /// The current value of a carrier.
    ///
    /// Panics if `carrier_id` was not produced by this `Sim`.
    pub fn signal(&self, carrier_id: CarrierId) -> Bit {
        self.carriers[carrier_id].signal()
    }

    /// Set a carrier's value and fire its reactions.
    ///
    /// Nothing happens when the value is unchanged. Otherwise every
    /// reaction runs, in registration order, before this returns. Gate
    /// reactions only schedule work on the timeline.
    ///
    /// If any gate reaction cannot be scheduled, the error is returned
    /// before the value is stored, leaving the carrier and timeline as
    /// they were.
    pub fn set_signal(&mut self, carrier_id: CarrierId, value: Bit) -> Result<(), SimError> {
        self.check_carrier(carrier_id)?;
        if self.carriers[carrier_id].signal() == value {
            return Ok(());
        }
        for reaction in self.carriers[carrier_id].reactions() {
            if let Reaction::Gate(gate_id) = reaction {
                self.check_delay(self.gates[*gate_id].delay)?;
            }
        }
        self.carriers[carrier_id].update(value);

        let time = self.timeline.current_origin();
        trace!("T={time} {} = {}", self.carriers[carrier_id].name(), value as u8);

        for i in 0..self.carriers[carrier_id].reactions().len() {
            let reaction = self.carriers[carrier_id].reactions()[i];
            match reaction {
                Reaction::Gate(gate_id) => self.schedule_recompute(gate_id)?,
                Reaction::Observer(observer_id) => self.notify(observer_id, carrier_id, value, time),
            }
        }
        for i in 0..self.global_observers.len() {
            let observer_id = self.global_observers[i];
            self.notify(observer_id, carrier_id, value, time);
        }
        Ok(())
    }

    pub fn peek(&self, name: &str) -> Result<Bit, SimError> {
        Ok(self.signal(self.carrier(name)?))
    }

    pub fn poke(&mut self, name: &str, value: Bit) -> Result<(), SimError> {
        let carrier_id = self.carrier(name)?;
        self.set_signal(carrier_id, value)
    }

    /// Schedule `carrier` to be set to `value` after `delay` timepoints.
    pub fn schedule_signal(&mut self, carrier_id: CarrierId, value: Bit, delay: Timepoint) -> Result<Timepoint, SimError> {
        self.check_carrier(carrier_id)?;
        self.timeline.schedule_after(delay, Action::Drive { carrier: carrier_id, value })
    }

    fn notify(&mut self, observer_id: ObserverId, carrier_id: CarrierId, value: Bit, time: Timepoint) {
        let change = Change {
            carrier: carrier_id,
            name: self.carriers[carrier_id].name(),
            value,
            time,
        };
        let observer = &mut self.observers[observer_id];
        observer(&change);
    }

    /// Call `observer` whenever `carrier_id` changes value.
    pub fn observe<F: FnMut(&Change<'_>) + 'static>(&mut self, carrier_id: CarrierId, observer: F) -> Result<ObserverId, SimError> {
        self.check_carrier(carrier_id)?;
        let observer_id = self.observers.len();
        self.observers.push(Box::new(observer));
        self.carriers[carrier_id].add_reaction(Reaction::Observer(observer_id));
        Ok(observer_id)
    }

    /// Call `observer` whenever any carrier changes value.
    pub fn observe_all<F: FnMut(&Change<'_>) + 'static>(&mut self, observer: F) -> ObserverId {
        let observer_id = self.observers.len();
        self.observers.push(Box::new(observer));
        self.global_observers.push(observer_id);
        observer_id
    }

    pub fn add_gate<T: Into<TruthTable>>(&mut self, table: T, inputs: &[CarrierId], output: CarrierId) -> Result<GateId, SimError> {
        let delay = self.config.default_delay;
        self.add_gate_with_delay(table, inputs, output, delay)
    }

    /// Bind a gate to its carriers.
    ///
    /// The output is evaluated and set immediately, so a gate wired onto
    /// carriers that already hold a signal starts out consistent. Only
    /// then is the gate registered as a reaction on each of its inputs.
    ///
    /// Each carrier has at most one driving gate. Binding a second gate
    /// onto the same output fails with [`SimError::MultipleDrivers`].
    pub fn add_gate_with_delay<T: Into<TruthTable>>(
        &mut self,
        table: T,
        inputs: &[CarrierId],
        output: CarrierId,
        delay: Timepoint,
    ) -> Result<GateId, SimError> {
        let table = table.into();
        if inputs.len() != table.arity() {
            return Err(SimError::ArityMismatch { expected: table.arity(), actual: inputs.len() });
        }
        for carrier_id in inputs.iter().chain(std::iter::once(&output)) {
            self.check_carrier(*carrier_id)?;
        }
        if self.carriers[output].driver().is_some() {
            return Err(SimError::MultipleDrivers(self.carriers[output].name().to_string()));
        }

        let value = self.eval_table(table, inputs);
        self.set_signal(output, value)?;

        let gate_id = self.gates.len();
        self.gates.push(Gate {
            inputs: inputs.to_vec(),
            output,
            table,
            delay,
            version: 0,
        });
        self.carriers[output].set_driver(gate_id);
        for input in inputs {
            self.carriers[*input].add_reaction(Reaction::Gate(gate_id));
        }
        debug!(
            "gate #{gate_id}: {:?} -> {} (delay {delay})",
            inputs.iter().map(|input| self.carriers[*input].name()).collect::<Vec<_>>(),
            self.carriers[output].name(),
        );
        Ok(gate_id)
    }

    /// Swap the function and delay of a gate in the middle of a run.
    ///
    /// Recomputes already pending for the gate become stale and are
    /// skipped. A fresh recompute is scheduled with the new delay.
    pub fn reconfigure_gate<T: Into<TruthTable>>(&mut self, gate_id: GateId, table: T, delay: Timepoint) -> Result<(), SimError> {
        let table = table.into();
        let arity = self.gates.get(gate_id).ok_or(SimError::NoSuchGate(gate_id))?.inputs.len();
        if table.arity() != arity {
            return Err(SimError::ArityMismatch { expected: arity, actual: table.arity() });
        }
        self.check_delay(delay)?;

        let gate = &mut self.gates[gate_id];
        gate.table = table;
        gate.delay = delay;
        gate.version += 1;
        debug!("gate #{gate_id} reconfigured (version {})", gate.version);
        self.schedule_recompute(gate_id)
    }

    fn schedule_recompute(&mut self, gate_id: GateId) -> Result<(), SimError> {
        let gate = &self.gates[gate_id];
        let action = Action::Recompute { gate: gate_id, version: gate.version };
        self.timeline.schedule_after(gate.delay, action)?;
        Ok(())
    }

    /// Fails if an action `delay` after now would overflow the timeline.
    fn check_delay(&self, delay: Timepoint) -> Result<(), SimError> {
        let origin = self.timeline.current_origin();
        match origin.checked_add(delay) {
            Some(_t) => Ok(()),
            None => Err(SimError::TimeOverflow { origin, delay }),
        }
    }

    fn evaluate(&self, gate_id: GateId) -> Bit {
        let gate = &self.gates[gate_id];
        self.eval_table(gate.table, &gate.inputs)
    }

    fn eval_table(&self, table: TruthTable, inputs: &[CarrierId]) -> Bit {
        let mut bits = [false; 2];
        for (bit, input) in bits.iter_mut().zip(inputs) {
            *bit = self.carriers[*input].signal();
        }
        table.eval(&bits[..inputs.len()])
    }

    /// Run one action. Returns `false` when the action was stale.
    fn dispatch(&mut self, action: Action) -> Result<bool, SimError> {
        match action {
            Action::Recompute { gate, version } => {
                if self.gates[gate].version != version {
                    trace!("T={} skipping stale recompute of gate #{gate}", self.now());
                    return Ok(false);
                }
                let value = self.evaluate(gate);
                let output = self.gates[gate].output;
                self.set_signal(output, value)?;
            },
            Action::Drive { carrier, value } => self.set_signal(carrier, value)?,
        }
        Ok(true)
    }

    /// The timeline's origin: the timepoint of the last action run.
    pub fn now(&self) -> Timepoint {
        self.timeline.current_origin()
    }

    pub fn pending(&self) -> usize {
        self.timeline.len()
    }

    pub fn state(&self) -> DriverState {
        if self.timeline.is_empty() {
            DriverState::Settled
        } else {
            DriverState::Running
        }
    }

    /// Pop and run a single action. Returns its timepoint, or `None` once settled.
    pub fn step(&mut self) -> Result<Option<Timepoint>, SimError> {
        match self.timeline.pop() {
            Some(action) => {
                self.dispatch(action)?;
                Ok(Some(self.now()))
            },
            None => Ok(None),
        }
    }

    /// Run until no actions remain.
    ///
    /// Fails with [`SimError::DidNotSettle`] when the configured step or
    /// time budget runs out first. The remaining actions stay pending.
    pub fn settle(&mut self) -> Result<SettleReport, SimError> {
        self.drive(None)
    }

    /// Run every action scheduled at or before `horizon`.
    ///
    /// [`Sim::now`] is left at the last action run, not at `horizon`, so
    /// later stimuli are scheduled relative to that earlier timepoint. Use
    /// [`Sim::schedule_signal`] to place a stimulus at an absolute offset.
    pub fn run_until(&mut self, horizon: Timepoint) -> Result<SettleReport, SimError> {
        self.drive(Some(horizon))
    }

    fn drive(&mut self, horizon: Option<Timepoint>) -> Result<SettleReport, SimError> {
        let started_at = self.now();
        let mut report = SettleReport {
            started_at,
            settled_at: started_at,
            ..SettleReport::default()
        };

        while let Some(t) = self.timeline.peek_time() {
            if horizon.map_or(false, |horizon| t > horizon) {
                break;
            }
            let out_of_steps = self.config.max_steps.map_or(false, |max_steps| report.steps >= max_steps);
            let out_of_time = self.config.time_budget.map_or(false, |budget| t - started_at > budget);
            if out_of_steps || out_of_time {
                warn!("circuit did not settle: {} steps, T={}, {} actions pending", report.steps, self.now(), self.pending());
                return Err(SimError::DidNotSettle { steps: report.steps, time: self.now() });
            }

            if let Some(action) = self.timeline.pop() {
                report.steps += 1;
                if !self.dispatch(action)? {
                    report.stale += 1;
                }
            }
        }

        report.settled_at = self.now();
        debug!(
            "ran {} actions ({} stale) from T={} to T={}",
            report.steps,
            report.stale,
            report.started_at,
            report.settled_at,
        );
        Ok(report)
    }

    /// Start a new run over the same circuit graph.
    ///
    /// The timeline is replaced, every carrier goes back to 0 without
    /// firing reactions, and each gate is re-evaluated in construction
    /// order. Call [`Sim::settle`] afterwards to reach a consistent state.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.timeline = Timeline::new();
        for carrier in &mut self.carriers {
            carrier.clear();
        }
        for gate_id in 0..self.gates.len() {
            let value = self.evaluate(gate_id);
            let output = self.gates[gate_id].output;
            self.set_signal(output, value)?;
        }
        info!("reset {} carriers and {} gates", self.carriers.len(), self.gates.len());
        Ok(())
    }

    /// Every carrier's value, keyed by its primary name.
    pub fn values(&self) -> BTreeMap<String, Bit> {
        self.carriers
            .iter()
            .map(|carrier| (carrier.name().to_string(), carrier.signal()))
            .collect()
    }
}

impl Default for Sim {
    fn default() -> Sim {
        Sim::new(SimConfig::default())
    }
}

impl std::fmt::Debug for Sim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Sim at T={} ({} pending)", self.now(), self.pending())?;
        for (carrier_id, carrier) in self.carriers.iter().enumerate() {
            writeln!(f, "    {:>5}   {:>3}   {}", format!("#{carrier_id}"), carrier.signal() as u8, carrier.name())?;
        }
        Ok(())
    }
}
