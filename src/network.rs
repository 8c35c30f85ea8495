use log::*;

use crate::devices::{Device, DeviceKind, Devices, InputPort, OutputPort, PortId, Signal};
use crate::error::ConnectionError;
use crate::names::NameId;

/// The connected circuit: the device graph plus the settle-and-advance
/// simulation loop.
#[derive(Debug, Default)]
pub struct Network {
    devices: Devices,
}

/// One device's pending results for a settle pass.
struct DeviceUpdate {
    outputs: Vec<(OutputPort, Signal)>,
    prev_clk: Option<Signal>,
}

/// Moves a stored signal one step toward `target`. A change of level passes
/// through `Rising` or `Falling` for one settle pass before reaching the new
/// steady level, so an output takes two passes to flip.
fn update_signal(current: Signal, target: Signal) -> Signal {
    if target.is_high() {
        match current {
            Signal::Low | Signal::Falling => Signal::Rising,
            Signal::Rising | Signal::High => Signal::High,
        }
    } else {
        match current {
            Signal::High | Signal::Rising => Signal::Falling,
            Signal::Falling | Signal::Low => Signal::Low,
        }
    }
}

impl Network {
    pub fn new() -> Network {
        Network::default()
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices {
        &mut self.devices
    }

    /// Connects two signal ends, one of which must be an output and the other
    /// an input. The ends may come in either order.
    pub fn make_connection(
        &mut self,
        first_device: NameId,
        first_port: PortId,
        second_device: NameId,
        second_port: PortId,
    ) -> Result<(), ConnectionError> {
        self.connect(first_device, first_port, second_device, second_port, false)
    }

    /// Like [`Network::make_connection`], but an already-driven input has its
    /// old driver dropped instead of being an error.
    pub fn replace_connection(
        &mut self,
        first_device: NameId,
        first_port: PortId,
        second_device: NameId,
        second_port: PortId,
    ) -> Result<(), ConnectionError> {
        self.connect(first_device, first_port, second_device, second_port, true)
    }

    fn connect(
        &mut self,
        first_device: NameId,
        first_port: PortId,
        second_device: NameId,
        second_port: PortId,
        replace: bool,
    ) -> Result<(), ConnectionError> {
        for (device, port) in [(first_device, first_port), (second_device, second_port)] {
            let Some(device) = self.devices.get(device) else {
                return Err(ConnectionError::PortAbsent);
            };
            let present = match port {
                PortId::Input(p) => device.has_input(p),
                PortId::Output(p) => device.has_output(p),
            };
            if !present {
                return Err(ConnectionError::PortAbsent);
            }
        }
        let ((in_device, in_port), (out_device, out_port)) = match (first_port, second_port) {
            (PortId::Input(p1), PortId::Output(p2)) => {
                ((first_device, p1), (second_device, p2))
            }
            (PortId::Output(p1), PortId::Input(p2)) => {
                ((second_device, p2), (first_device, p1))
            }
            (PortId::Input(_), PortId::Input(_)) => return Err(ConnectionError::InputToInput),
            (PortId::Output(_), PortId::Output(_)) => return Err(ConnectionError::OutputToOutput),
        };
        let slot = self
            .devices
            .get_mut(in_device)
            .and_then(|d| d.driver_slot(in_port))
            .ok_or(ConnectionError::PortAbsent)?;
        if slot.is_some() && !replace {
            return Err(ConnectionError::InputConnected);
        }
        *slot = Some((out_device, out_port));
        Ok(())
    }

    /// The output end driving `(device_id, input_port)`, if connected.
    pub fn get_connected_output(
        &self,
        device_id: NameId,
        input_port: InputPort,
    ) -> Option<(NameId, OutputPort)> {
        self.devices.get(device_id)?.driver(input_port)
    }

    /// Every input pin in the circuit with its driver (or `None`).
    pub fn get_all_connections(
        &self,
    ) -> Vec<(NameId, InputPort, Option<(NameId, OutputPort)>)> {
        let mut connections = vec![];
        for (id, device) in self.devices.iter() {
            for port in device.input_ports() {
                connections.push((id, port, device.driver(port)));
            }
        }
        connections
    }

    /// True when every input pin of every device has a driver.
    pub fn check_network(&self) -> bool {
        self.get_all_connections()
            .iter()
            .all(|(_device, _port, driver)| driver.is_some())
    }

    /// The signal arriving at an input pin. `None` if the pin is absent or
    /// unconnected.
    pub fn get_input_signal(&self, device_id: NameId, input_port: InputPort) -> Option<Signal> {
        let (out_device, out_port) = self.get_connected_output(device_id, input_port)?;
        self.devices.output_signal(out_device, out_port)
    }

    /// Simulates one cycle: advances every clock, then re-executes devices
    /// in settle passes until no output changes. Returns false if an input is
    /// unconnected or the network fails to settle within the pass limit.
    pub fn execute_network(&mut self) -> bool {
        self.tick_clocks();
        let ids = self.devices.ids();
        let limit = self.settle_limit();
        for _pass in 0..limit {
            let mut changed = false;
            for &id in &ids {
                let Some(update) = self.evaluate_device(id) else {
                    warn!("device has an unconnected input, cannot execute network");
                    return false;
                };
                changed |= self.apply_update(id, update);
            }
            if !changed {
                return true;
            }
        }
        warn!("network failed to settle within {limit} passes, oscillation assumed");
        false
    }

    /// Two passes per device to let a flip propagate, plus slack for the
    /// transition markers at either end.
    fn settle_limit(&self) -> usize {
        2 * self.devices.len() + 4
    }

    fn tick_clocks(&mut self) {
        for id in self.devices.ids() {
            let device = match self.devices.get_mut(id) {
                Some(d) => d,
                None => continue,
            };
            if let DeviceKind::Clock { half_period, phase } = &mut device.kind {
                *phase += 1;
                if *phase >= *half_period {
                    *phase = 0;
                    // The marker collapses to a steady level during settling.
                    let flipped = match device.output(OutputPort::Main) {
                        Some(s) if s.is_high() => Signal::Falling,
                        _ => Signal::Rising,
                    };
                    device.set_output(OutputPort::Main, flipped);
                }
            }
        }
    }

    /// Computes one device's next outputs from the current network state.
    /// `None` means a required input is unconnected.
    fn evaluate_device(&self, device_id: NameId) -> Option<DeviceUpdate> {
        let device = self.devices.get(device_id)?;
        match &device.kind {
            // Switches and clocks hold their outputs between ticks.
            DeviceKind::Switch { state } => Some(DeviceUpdate {
                outputs: vec![(OutputPort::Main, *state)],
                prev_clk: None,
            }),
            DeviceKind::Clock { .. } => {
                let current = device.output(OutputPort::Main)?;
                Some(DeviceUpdate {
                    outputs: vec![(OutputPort::Main, current.level())],
                    prev_clk: None,
                })
            }
            DeviceKind::Gate { kind, .. } => {
                let target = self.evaluate_gate(device_id, device, *kind)?;
                let current = device.output(OutputPort::Main)?;
                Some(DeviceUpdate {
                    outputs: vec![(OutputPort::Main, update_signal(current, target))],
                    prev_clk: None,
                })
            }
            DeviceKind::DType { prev_clk } => {
                let set = self.get_input_signal(device_id, InputPort::Set)?.level();
                let clear = self.get_input_signal(device_id, InputPort::Clear)?.level();
                let data = self.get_input_signal(device_id, InputPort::Data)?.level();
                let clk = self.get_input_signal(device_id, InputPort::Clk)?.level();
                let q = device.output(OutputPort::Q)?;
                let qbar = device.output(OutputPort::Qbar)?;
                let target_q = if set.is_high() {
                    Signal::High
                } else if clear.is_high() {
                    Signal::Low
                } else if !prev_clk.is_high() && clk.is_high() {
                    data
                } else {
                    q.level()
                };
                let target_qbar = Signal::from(!target_q.is_high());
                Some(DeviceUpdate {
                    outputs: vec![
                        (OutputPort::Q, update_signal(q, target_q)),
                        (OutputPort::Qbar, update_signal(qbar, target_qbar)),
                    ],
                    prev_clk: Some(clk),
                })
            }
        }
    }

    fn evaluate_gate(
        &self,
        device_id: NameId,
        device: &Device,
        kind: crate::devices::GateKind,
    ) -> Option<Signal> {
        use crate::devices::GateKind;
        let mut inputs = vec![];
        for port in device.input_ports() {
            inputs.push(self.get_input_signal(device_id, port)?.is_high());
        }
        let value = match kind {
            GateKind::And => inputs.iter().all(|x| *x),
            GateKind::Nand => !inputs.iter().all(|x| *x),
            GateKind::Or => inputs.iter().any(|x| *x),
            GateKind::Nor => !inputs.iter().any(|x| *x),
            GateKind::Xor => inputs.iter().filter(|x| **x).count() % 2 == 1,
            GateKind::Not => !inputs[0],
        };
        Some(Signal::from(value))
    }

    fn apply_update(&mut self, device_id: NameId, update: DeviceUpdate) -> bool {
        let mut changed = false;
        let Some(device) = self.devices.get_mut(device_id) else {
            return false;
        };
        for (port, signal) in update.outputs {
            if device.output(port) != Some(signal) {
                device.set_output(port, signal);
                changed = true;
            }
        }
        if let Some(clk) = update.prev_clk {
            if let DeviceKind::DType { prev_clk } = &mut device.kind {
                *prev_clk = clk;
            }
        }
        changed
    }
}
