use std::collections::BTreeMap;

use crate::devices::{Devices, OutputPort, PortId, Signal};
use crate::error::MonitorError;
use crate::names::{NameId, Names};

/// The monitored outputs and their recorded traces, one sample per cycle.
///
/// A sample is `None` when the monitor existed but its signal could not be
/// read that cycle, or when the monitor was added after recording started;
/// those samples display as blanks.
#[derive(Debug, Default)]
pub struct Monitors {
    traces: BTreeMap<(NameId, OutputPort), Vec<Option<Signal>>>,
    cycles: usize,
}

impl Monitors {
    pub fn new() -> Monitors {
        Monitors::default()
    }

    /// Starts monitoring an output. New monitors are padded with blanks for
    /// every cycle already recorded.
    pub fn make_monitor(
        &mut self,
        devices: &Devices,
        device_id: NameId,
        port: PortId,
    ) -> Result<(), MonitorError> {
        let port = match port {
            PortId::Output(port) => port,
            PortId::Input(_) => return Err(MonitorError::NotOutput),
        };
        if !devices.get(device_id).map_or(false, |d| d.has_output(port)) {
            return Err(MonitorError::NotOutput);
        }
        if self.traces.contains_key(&(device_id, port)) {
            return Err(MonitorError::MonitorPresent);
        }
        self.traces.insert((device_id, port), vec![None; self.cycles]);
        Ok(())
    }

    pub fn remove_monitor(
        &mut self,
        device_id: NameId,
        port: OutputPort,
    ) -> Result<(), MonitorError> {
        self.traces
            .remove(&(device_id, port))
            .map(|_| ())
            .ok_or(MonitorError::MonitorAbsent)
    }

    /// Samples every monitored output once. The cycle still counts when no
    /// monitors exist, so a monitor added later is padded correctly.
    pub fn record_signals(&mut self, devices: &Devices) {
        for ((device_id, port), trace) in self.traces.iter_mut() {
            trace.push(devices.output_signal(*device_id, *port));
        }
        self.cycles += 1;
    }

    /// Discards all recorded samples but keeps the monitors.
    pub fn reset_monitors(&mut self) {
        for trace in self.traces.values_mut() {
            trace.clear();
        }
        self.cycles = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    fn monitored_labels(&self, names: &Names, devices: &Devices) -> Vec<String> {
        self.traces
            .keys()
            .filter_map(|(device_id, port)| {
                devices.get_signal_name(names, *device_id, PortId::Output(*port))
            })
            .collect()
    }

    /// Partitions every output in the circuit into monitored and
    /// not-monitored display names.
    pub fn get_signal_names(
        &self,
        names: &Names,
        devices: &Devices,
    ) -> (Vec<String>, Vec<String>) {
        let monitored = self.monitored_labels(names, devices);
        let mut not_monitored = vec![];
        for (device_id, device) in devices.iter() {
            for port in device.output_ports() {
                if !self.traces.contains_key(&(device_id, port)) {
                    if let Some(name) =
                        devices.get_signal_name(names, device_id, PortId::Output(port))
                    {
                        not_monitored.push(name);
                    }
                }
            }
        }
        (monitored, not_monitored)
    }

    /// Renders every trace as a text waveform, one line per monitor:
    /// `-` high, `_` low, blank for a missing sample.
    pub fn display_signals(&self, names: &Names, devices: &Devices) -> String {
        let labels: Vec<String> = self.monitored_labels(names, devices);
        let margin = labels.iter().map(|l| l.len()).max().unwrap_or(0);
        let mut out = String::new();
        for (label, trace) in labels.iter().zip(self.traces.values()) {
            out.push_str(&format!("{label:<margin$} : "));
            for sample in trace {
                out.push(match sample {
                    Some(Signal::High) => '-',
                    Some(Signal::Low) => '_',
                    Some(Signal::Rising) => '/',
                    Some(Signal::Falling) => '\\',
                    None => ' ',
                });
            }
            out.push('\n');
        }
        out
    }
}
