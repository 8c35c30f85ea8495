use std::collections::BTreeMap;

use crate::error::DeviceError;
use crate::names::{NameId, Names};

/// The largest arity accepted for AND/NAND/OR/NOR gates.
pub const MAX_GATE_INPUTS: u32 = 16;

/// A 4-valued signal level.
///
/// `Rising` and `Falling` are transition markers: the simulator sets them on
/// an output for the pass in which it changes, and they are useful for
/// display, but all logic sees them collapsed to `High`/`Low` through
/// [`Signal::level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Signal {
    Low,
    High,
    Rising,
    Falling,
}

impl Signal {
    /// Collapse a transition marker to the level it is heading toward.
    pub fn level(self) -> Signal {
        match self {
            Signal::Low | Signal::Falling => Signal::Low,
            Signal::High | Signal::Rising => Signal::High,
        }
    }

    pub fn is_high(self) -> bool {
        self.level() == Signal::High
    }
}

impl From<bool> for Signal {
    fn from(x: bool) -> Signal {
        if x {
            Signal::High
        } else {
            Signal::Low
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Low => write!(f, "LOW"),
            Signal::High => write!(f, "HIGH"),
            Signal::Rising => write!(f, "RISING"),
            Signal::Falling => write!(f, "FALLING"),
        }
    }
}

/// The device type named in a declaration, before qualifier checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Clock,
    Switch,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Not,
    Dtype,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Clock => "CLOCK",
            DeviceType::Switch => "SWITCH",
            DeviceType::And => "AND",
            DeviceType::Nand => "NAND",
            DeviceType::Or => "OR",
            DeviceType::Nor => "NOR",
            DeviceType::Xor => "XOR",
            DeviceType::Not => "NOT",
            DeviceType::Dtype => "DTYPE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Not,
}

/// A device's kind together with its runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Gate { kind: GateKind, arity: u32 },
    Switch { state: Signal },
    Clock { half_period: u32, phase: u32 },
    DType { prev_clk: Signal },
}

/// An input terminal. `Pin(n)` is the gate input `I<n>`; the rest are the
/// D-type's named inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputPort {
    Pin(u32),
    Set,
    Clear,
    Data,
    Clk,
}

impl std::fmt::Display for InputPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputPort::Pin(n) => write!(f, "I{n}"),
            InputPort::Set => write!(f, "SET"),
            InputPort::Clear => write!(f, "CLEAR"),
            InputPort::Data => write!(f, "DATA"),
            InputPort::Clk => write!(f, "CLK"),
        }
    }
}

/// An output terminal. `Main` is the unnamed output every device except the
/// D-type has; `Q`/`Qbar` belong to the D-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputPort {
    Main,
    Q,
    Qbar,
}

impl std::fmt::Display for OutputPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputPort::Main => Ok(()),
            OutputPort::Q => write!(f, "Q"),
            OutputPort::Qbar => write!(f, "QBAR"),
        }
    }
}

/// Either end of a connection, as written in the definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortId {
    Input(InputPort),
    Output(OutputPort),
}

/// One declared circuit element: its kind, its input pins (each with an
/// optional driver), and its output values.
#[derive(Debug, Clone)]
pub struct Device {
    pub kind: DeviceKind,
    inputs: BTreeMap<InputPort, Option<(NameId, OutputPort)>>,
    outputs: BTreeMap<OutputPort, Signal>,
}

impl Device {
    fn new(kind: DeviceKind) -> Device {
        let mut inputs = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        match &kind {
            DeviceKind::Gate { arity, .. } => {
                for n in 1..=*arity {
                    inputs.insert(InputPort::Pin(n), None);
                }
                outputs.insert(OutputPort::Main, Signal::Low);
            }
            DeviceKind::Switch { state } => {
                outputs.insert(OutputPort::Main, *state);
            }
            DeviceKind::Clock { .. } => {
                outputs.insert(OutputPort::Main, Signal::Low);
            }
            DeviceKind::DType { .. } => {
                for port in [InputPort::Set, InputPort::Clear, InputPort::Data, InputPort::Clk] {
                    inputs.insert(port, None);
                }
                outputs.insert(OutputPort::Q, Signal::Low);
                outputs.insert(OutputPort::Qbar, Signal::Low);
            }
        }
        Device { kind, inputs, outputs }
    }

    pub fn is_type(&self, device_type: DeviceType) -> bool {
        match (&self.kind, device_type) {
            (DeviceKind::Gate { kind: GateKind::And, .. }, DeviceType::And) => true,
            (DeviceKind::Gate { kind: GateKind::Nand, .. }, DeviceType::Nand) => true,
            (DeviceKind::Gate { kind: GateKind::Or, .. }, DeviceType::Or) => true,
            (DeviceKind::Gate { kind: GateKind::Nor, .. }, DeviceType::Nor) => true,
            (DeviceKind::Gate { kind: GateKind::Xor, .. }, DeviceType::Xor) => true,
            (DeviceKind::Gate { kind: GateKind::Not, .. }, DeviceType::Not) => true,
            (DeviceKind::Switch { .. }, DeviceType::Switch) => true,
            (DeviceKind::Clock { .. }, DeviceType::Clock) => true,
            (DeviceKind::DType { .. }, DeviceType::Dtype) => true,
            _ => false,
        }
    }

    pub fn has_input(&self, port: InputPort) -> bool {
        self.inputs.contains_key(&port)
    }

    pub fn has_output(&self, port: OutputPort) -> bool {
        self.outputs.contains_key(&port)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = InputPort> + '_ {
        self.inputs.keys().copied()
    }

    pub fn output_ports(&self) -> impl Iterator<Item = OutputPort> + '_ {
        self.outputs.keys().copied()
    }

    /// The driver currently attached to `port`, if any.
    pub fn driver(&self, port: InputPort) -> Option<(NameId, OutputPort)> {
        self.inputs.get(&port).copied().flatten()
    }

    pub(crate) fn driver_slot(
        &mut self,
        port: InputPort,
    ) -> Option<&mut Option<(NameId, OutputPort)>> {
        self.inputs.get_mut(&port)
    }

    pub fn output(&self, port: OutputPort) -> Option<Signal> {
        self.outputs.get(&port).copied()
    }

    pub(crate) fn set_output(&mut self, port: OutputPort, signal: Signal) {
        self.outputs.insert(port, signal);
    }
}

/// All declared devices, keyed by the interned device name.
#[derive(Debug, Default)]
pub struct Devices {
    devices: BTreeMap<NameId, Device>,
}

impl Devices {
    pub fn new() -> Devices {
        Devices::default()
    }

    /// Creates the device `device_id` of the given type.
    ///
    /// The qualifier is the declaration's single numeric parameter: the arity
    /// for AND/NAND/OR/NOR, the initial level for SWITCH, the half-period for
    /// CLOCK, and absent for XOR/NOT/DTYPE. An out-of-range or misplaced
    /// qualifier adds nothing to the graph.
    pub fn make_device(
        &mut self,
        device_id: NameId,
        device_type: DeviceType,
        qualifier: Option<u32>,
    ) -> Result<(), DeviceError> {
        if self.devices.contains_key(&device_id) {
            return Err(DeviceError::DevicePresent);
        }
        let kind = match (device_type, qualifier) {
            (DeviceType::And, Some(n)) if (1..=MAX_GATE_INPUTS).contains(&n) => {
                DeviceKind::Gate { kind: GateKind::And, arity: n }
            }
            (DeviceType::Nand, Some(n)) if (1..=MAX_GATE_INPUTS).contains(&n) => {
                DeviceKind::Gate { kind: GateKind::Nand, arity: n }
            }
            (DeviceType::Or, Some(n)) if (1..=MAX_GATE_INPUTS).contains(&n) => {
                DeviceKind::Gate { kind: GateKind::Or, arity: n }
            }
            (DeviceType::Nor, Some(n)) if (1..=MAX_GATE_INPUTS).contains(&n) => {
                DeviceKind::Gate { kind: GateKind::Nor, arity: n }
            }
            (DeviceType::Xor, None) => DeviceKind::Gate { kind: GateKind::Xor, arity: 2 },
            (DeviceType::Not, None) => DeviceKind::Gate { kind: GateKind::Not, arity: 1 },
            (DeviceType::Switch, Some(level @ (0 | 1))) => {
                DeviceKind::Switch { state: Signal::from(level == 1) }
            }
            (DeviceType::Clock, Some(n)) if n >= 1 => {
                DeviceKind::Clock { half_period: n, phase: 0 }
            }
            (DeviceType::Dtype, None) => DeviceKind::DType { prev_clk: Signal::Low },
            _ => return Err(DeviceError::InvalidQualifier),
        };
        self.devices.insert(device_id, Device::new(kind));
        Ok(())
    }

    pub fn get(&self, device_id: NameId) -> Option<&Device> {
        self.devices.get(&device_id)
    }

    pub(crate) fn get_mut(&mut self, device_id: NameId) -> Option<&mut Device> {
        self.devices.get_mut(&device_id)
    }

    pub fn ids(&self) -> Vec<NameId> {
        self.devices.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameId, &Device)> {
        self.devices.iter().map(|(id, device)| (*id, device))
    }

    /// Ids of every device of the given type.
    pub fn find_devices(&self, device_type: DeviceType) -> Vec<NameId> {
        self.devices
            .iter()
            .filter(|(_id, device)| device.is_type(device_type))
            .map(|(id, _device)| *id)
            .collect()
    }

    /// Sets the stored level of the switch `device_id`. Returns false if the
    /// device is absent or not a switch.
    pub fn set_switch(&mut self, device_id: NameId, level: Signal) -> bool {
        match self.devices.get_mut(&device_id) {
            Some(Device { kind: DeviceKind::Switch { state }, .. }) => {
                *state = level.level();
                true
            }
            _ => false,
        }
    }

    /// Resets every device to its power-on state without touching the graph:
    /// switches to their stored level, clocks to phase 0 with a LOW output,
    /// D-types to LOW outputs, gates to LOW outputs.
    pub fn cold_startup(&mut self) {
        for device in self.devices.values_mut() {
            match &mut device.kind {
                DeviceKind::Switch { state } => {
                    let level = *state;
                    device.set_output(OutputPort::Main, level);
                }
                DeviceKind::Clock { phase, .. } => {
                    *phase = 0;
                    device.set_output(OutputPort::Main, Signal::Low);
                }
                DeviceKind::DType { prev_clk } => {
                    *prev_clk = Signal::Low;
                    device.set_output(OutputPort::Q, Signal::Low);
                    device.set_output(OutputPort::Qbar, Signal::Low);
                }
                DeviceKind::Gate { .. } => {
                    device.set_output(OutputPort::Main, Signal::Low);
                }
            }
        }
    }

    /// The current value of the output `port` on `device_id`.
    pub fn output_signal(&self, device_id: NameId, port: OutputPort) -> Option<Signal> {
        self.devices.get(&device_id)?.output(port)
    }

    /// The display string for a signal: `"NAME"` for an unnamed output,
    /// `"NAME.PORT"` otherwise. `None` if the device or port doesn't exist.
    pub fn get_signal_name(&self, names: &Names, device_id: NameId, port: PortId) -> Option<String> {
        let device = self.devices.get(&device_id)?;
        let name = names.get_name_string(device_id)?;
        match port {
            PortId::Output(OutputPort::Main) if device.has_output(OutputPort::Main) => {
                Some(name.to_string())
            }
            PortId::Output(p) if device.has_output(p) => Some(format!("{name}.{p}")),
            PortId::Input(p) if device.has_input(p) => Some(format!("{name}.{p}")),
            _ => None,
        }
    }

    /// Parses a display string (`"NAME"` or `"NAME.PORT"`) back to ids.
    /// `None` if the device doesn't exist or the port is not legal on it.
    pub fn get_signal_ids(&self, names: &Names, signal: &str) -> Option<(NameId, PortId)> {
        let (name, port) = match signal.split_once('.') {
            Some((name, port)) => (name, Some(port)),
            None => (signal, None),
        };
        let device_id = names.query(name)?;
        let device = self.devices.get(&device_id)?;
        let port = match port {
            None => PortId::Output(OutputPort::Main),
            Some("Q") => PortId::Output(OutputPort::Q),
            Some("QBAR") => PortId::Output(OutputPort::Qbar),
            Some("SET") => PortId::Input(InputPort::Set),
            Some("CLEAR") => PortId::Input(InputPort::Clear),
            Some("DATA") => PortId::Input(InputPort::Data),
            Some("CLK") => PortId::Input(InputPort::Clk),
            Some(p) => {
                let n = p.strip_prefix('I')?.parse::<u32>().ok()?;
                PortId::Input(InputPort::Pin(n))
            }
        };
        let legal = match port {
            PortId::Output(p) => device.has_output(p),
            PortId::Input(p) => device.has_input(p),
        };
        if legal {
            Some((device_id, port))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_and_devices() -> (Names, Devices) {
        (Names::new(), Devices::new())
    }

    #[test]
    fn make_device_validates_qualifiers() {
        let (mut names, mut devices) = names_and_devices();
        let g1 = names.lookup("G1");
        assert_eq!(
            devices.make_device(g1, DeviceType::And, Some(0)),
            Err(DeviceError::InvalidQualifier)
        );
        assert_eq!(
            devices.make_device(g1, DeviceType::And, Some(17)),
            Err(DeviceError::InvalidQualifier)
        );
        assert!(devices.get(g1).is_none());
        assert_eq!(devices.make_device(g1, DeviceType::And, Some(16)), Ok(()));

        let sw = names.lookup("SW");
        assert_eq!(
            devices.make_device(sw, DeviceType::Switch, Some(2)),
            Err(DeviceError::InvalidQualifier)
        );
        assert_eq!(devices.make_device(sw, DeviceType::Switch, Some(1)), Ok(()));
        assert_eq!(devices.output_signal(sw, OutputPort::Main), Some(Signal::High));

        let clk = names.lookup("CK");
        assert_eq!(
            devices.make_device(clk, DeviceType::Clock, Some(0)),
            Err(DeviceError::InvalidQualifier)
        );
        assert_eq!(devices.make_device(clk, DeviceType::Clock, Some(5)), Ok(()));

        let d = names.lookup("D1");
        assert_eq!(
            devices.make_device(d, DeviceType::Dtype, Some(1)),
            Err(DeviceError::InvalidQualifier)
        );
        assert_eq!(devices.make_device(d, DeviceType::Dtype, None), Ok(()));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (mut names, mut devices) = names_and_devices();
        let g1 = names.lookup("G1");
        assert_eq!(devices.make_device(g1, DeviceType::Xor, None), Ok(()));
        assert_eq!(
            devices.make_device(g1, DeviceType::And, Some(2)),
            Err(DeviceError::DevicePresent)
        );
        assert!(devices.get(g1).unwrap().is_type(DeviceType::Xor));
    }

    #[test]
    fn gates_get_numbered_pins() {
        let (mut names, mut devices) = names_and_devices();
        let g1 = names.lookup("G1");
        devices.make_device(g1, DeviceType::Nand, Some(3)).unwrap();
        let device = devices.get(g1).unwrap();
        assert!(device.has_input(InputPort::Pin(1)));
        assert!(device.has_input(InputPort::Pin(3)));
        assert!(!device.has_input(InputPort::Pin(4)));
        assert!(!device.has_input(InputPort::Pin(0)));
        assert!(device.has_output(OutputPort::Main));
        assert!(!device.has_output(OutputPort::Q));
    }

    #[test]
    fn set_switch_only_touches_switches() {
        let (mut names, mut devices) = names_and_devices();
        let sw = names.lookup("SW");
        let g1 = names.lookup("G1");
        devices.make_device(sw, DeviceType::Switch, Some(0)).unwrap();
        devices.make_device(g1, DeviceType::Not, None).unwrap();
        assert!(devices.set_switch(sw, Signal::High));
        assert!(!devices.set_switch(g1, Signal::High));
        assert!(!devices.set_switch(names.lookup("NOPE"), Signal::High));
    }

    #[test]
    fn cold_startup_resets_state() {
        let (mut names, mut devices) = names_and_devices();
        let sw = names.lookup("SW");
        let d = names.lookup("D1");
        devices.make_device(sw, DeviceType::Switch, Some(1)).unwrap();
        devices.make_device(d, DeviceType::Dtype, None).unwrap();
        devices.get_mut(d).unwrap().set_output(OutputPort::Q, Signal::High);
        devices.cold_startup();
        assert_eq!(devices.output_signal(sw, OutputPort::Main), Some(Signal::High));
        assert_eq!(devices.output_signal(d, OutputPort::Q), Some(Signal::Low));
        assert_eq!(devices.output_signal(d, OutputPort::Qbar), Some(Signal::Low));
    }

    #[test]
    fn find_devices_by_type() {
        let (mut names, mut devices) = names_and_devices();
        let a = names.lookup("A");
        let b = names.lookup("B");
        let c = names.lookup("C");
        devices.make_device(a, DeviceType::Switch, Some(0)).unwrap();
        devices.make_device(b, DeviceType::Switch, Some(1)).unwrap();
        devices.make_device(c, DeviceType::Clock, Some(2)).unwrap();
        assert_eq!(devices.find_devices(DeviceType::Switch), vec![a, b]);
        assert_eq!(devices.find_devices(DeviceType::Clock), vec![c]);
        assert_eq!(devices.find_devices(DeviceType::Dtype), vec![]);
    }

    #[test]
    fn signal_names_round_trip() {
        let (mut names, mut devices) = names_and_devices();
        let d = names.lookup("D1");
        let g = names.lookup("G1");
        devices.make_device(d, DeviceType::Dtype, None).unwrap();
        devices.make_device(g, DeviceType::And, Some(2)).unwrap();

        assert_eq!(
            devices.get_signal_name(&names, g, PortId::Output(OutputPort::Main)),
            Some("G1".to_string())
        );
        assert_eq!(
            devices.get_signal_name(&names, d, PortId::Output(OutputPort::Qbar)),
            Some("D1.QBAR".to_string())
        );
        assert_eq!(
            devices.get_signal_name(&names, g, PortId::Input(InputPort::Pin(2))),
            Some("G1.I2".to_string())
        );
        assert_eq!(devices.get_signal_name(&names, d, PortId::Output(OutputPort::Main)), None);

        assert_eq!(
            devices.get_signal_ids(&names, "G1.I1"),
            Some((g, PortId::Input(InputPort::Pin(1))))
        );
        assert_eq!(
            devices.get_signal_ids(&names, "D1.Q"),
            Some((d, PortId::Output(OutputPort::Q)))
        );
        assert_eq!(devices.get_signal_ids(&names, "G1"), Some((g, PortId::Output(OutputPort::Main))));
        assert_eq!(devices.get_signal_ids(&names, "G1.I3"), None);
        assert_eq!(devices.get_signal_ids(&names, "MISSING"), None);
        assert_eq!(devices.get_signal_ids(&names, "D1"), None);
    }
}
