use super::*;

/// A binary signal value.
pub type Bit = bool;

pub type CarrierId = usize;
pub type ObserverId = usize;

/// What a carrier does when its value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Schedule a recompute of the gate reading this carrier.
    Gate(GateId),
    /// Call back into a hook registered with [`Sim::observe`].
    Observer(ObserverId),
}

/// A named single-valued broadcast node.
///
/// A carrier knows nothing about delay. It only remembers which reactions
/// to fire, in registration order, when its value changes.
#[derive(Debug, Clone)]
pub struct Carrier {
    name: String,
    value: Bit,
    reactions: Vec<Reaction>,
    driver: Option<GateId>,
}

impl Carrier {
    pub fn new<S: Into<String>>(name: S) -> Carrier {
        Carrier {
            name: name.into(),
            value: false,
            reactions: vec![],
            driver: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signal(&self) -> Bit {
        self.value
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// The gate writing this carrier, if any.
    pub fn driver(&self) -> Option<GateId> {
        self.driver
    }

    pub(crate) fn set_driver(&mut self, gate_id: GateId) {
        self.driver = Some(gate_id);
    }

    pub(crate) fn add_reaction(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    /// Store `value`, returning whether it differs from the previous one.
    pub(crate) fn update(&mut self, value: Bit) -> bool {
        if self.value == value {
            false
        } else {
            self.value = value;
            true
        }
    }

    /// Overwrite the value without reporting a change. Used by [`Sim::reset`].
    pub(crate) fn clear(&mut self) {
        self.value = false;
    }
}

/// A value change, as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<'a> {
    pub carrier: CarrierId,
    pub name: &'a str,
    pub value: Bit,
    pub time: Timepoint,
}

impl std::fmt::Display for Change<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "T={} {} = {}", self.time, self.name, self.value as u8)
    }
}

pub type Observer = Box<dyn FnMut(&Change<'_>)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_reports_deltas_only() {
        let mut carrier = Carrier::new("a");
        assert!(!carrier.signal());
        assert!(!carrier.update(false));
        assert!(carrier.update(true));
        assert!(carrier.signal());
        assert!(!carrier.update(true));
    }

    #[test]
    fn reactions_keep_registration_order() {
        let mut carrier = Carrier::new("a");
        carrier.add_reaction(Reaction::Gate(2));
        carrier.add_reaction(Reaction::Observer(0));
        carrier.add_reaction(Reaction::Gate(2));
        assert_eq!(carrier.reactions(), &[Reaction::Gate(2), Reaction::Observer(0), Reaction::Gate(2)]);
    }

    #[test]
    fn change_display() {
        let change = Change { carrier: 0, name: "s", value: true, time: 3 };
        assert_eq!(change.to_string(), "T=3 s = 1");
    }
}
