use log::*;

use crate::devices::{DeviceType, OutputPort, PortId};
use crate::error::{Category, Diagnostic, SourceContext};
use crate::monitors::Monitors;
use crate::names::{NameId, Names};
use crate::network::Network;
use crate::scanner::{Keyword, Scanner, Symbol, SymbolKind};

/// A fully parsed circuit, ready to simulate.
#[derive(Debug)]
pub struct Circuit {
    pub names: Names,
    pub network: Network,
    pub monitors: Monitors,
}

/// Recursive-descent parser for the three-section definition language.
///
/// Diagnostics are accumulated rather than raised: after a bad statement the
/// parser discards symbols through the next semicolon and carries on, so one
/// pass reports every error in the file.
pub struct Parser {
    scanner: Scanner,
    names: Names,
    network: Network,
    monitors: Monitors,
    diagnostics: Vec<Diagnostic>,
    symbol: Symbol,
}

impl Parser {
    pub fn new(mut scanner: Scanner) -> Parser {
        let mut names = Names::new();
        let symbol = scanner.next_symbol(&mut names, false);
        Parser {
            scanner,
            names,
            network: Network::new(),
            monitors: Monitors::new(),
            diagnostics: vec![],
            symbol,
        }
    }

    /// Parses the whole definition. Returns true iff no diagnostics were
    /// recorded. The symbol stream is always consumed to the end.
    pub fn parse_network(&mut self) -> bool {
        self.parse_section(Keyword::Devices);
        self.parse_section(Keyword::Connect);
        self.parse_section(Keyword::Monitor);
        while self.symbol.kind != SymbolKind::Eof {
            self.advance();
        }
        if !self.network.check_network() {
            self.diagnostics.push(Diagnostic::whole_file(
                "incomplete network, not every input is connected",
            ));
        }
        info!("parse finished with {} diagnostic(s)", self.diagnostics.len());
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_circuit(self) -> Circuit {
        Circuit {
            names: self.names,
            network: self.network,
            monitors: self.monitors,
        }
    }

    fn advance(&mut self) {
        let after_dot = self.symbol.kind == SymbolKind::Dot;
        self.symbol = self.scanner.next_symbol(&mut self.names, after_dot);
    }

    fn context_at(&self, pos: usize) -> SourceContext {
        let (line, line_no, col) = self.scanner.error_context(pos);
        SourceContext { line, line_no, col }
    }

    /// Records a diagnostic against an already-consumed symbol, without
    /// resynchronizing.
    fn error_at(&mut self, category: Category, message: impl Into<String>, pos: usize) {
        self.diagnostics.push(Diagnostic {
            category,
            message: message.into(),
            context: Some(self.context_at(pos)),
        });
    }

    /// Records a diagnostic at the current symbol, then discards symbols
    /// through the next semicolon so parsing resumes at a statement boundary.
    fn error(&mut self, category: Category, message: impl Into<String>) {
        self.error_at(category, message, self.symbol.pos);
        while !matches!(self.symbol.kind, SymbolKind::Semicolon | SymbolKind::Eof) {
            self.advance();
        }
        if self.symbol.kind == SymbolKind::Semicolon {
            self.advance();
        }
    }

    fn at_section_boundary(&self) -> bool {
        matches!(
            self.symbol.kind,
            SymbolKind::Eof
                | SymbolKind::Keyword(
                    Keyword::Devices | Keyword::Connect | Keyword::Monitor | Keyword::End
                )
        )
    }

    /// One section: its keyword, then statements until the next section
    /// keyword, `END`, or EOF. A missing keyword is flagged once and the
    /// section is parsed anyway.
    fn parse_section(&mut self, keyword: Keyword) {
        if self.symbol.kind == SymbolKind::Keyword(keyword) {
            self.advance();
        } else {
            self.error_at(
                Category::Syntax,
                format!("missing keyword: {}", keyword.as_str()),
                self.symbol.pos,
            );
        }
        while !self.at_section_boundary() {
            match keyword {
                Keyword::Devices => self.parse_assignment(),
                Keyword::Connect => self.parse_connection(),
                Keyword::Monitor => self.parse_monitor(),
                Keyword::End | Keyword::I => unreachable!("not a section keyword"),
            }
        }
    }

    /// `name {"," name} "=" device_spec ";"`
    fn parse_assignment(&mut self) {
        let mut device_names: Vec<(NameId, usize)> = vec![];
        loop {
            match &self.symbol.kind {
                SymbolKind::Name(id) => {
                    device_names.push((*id, self.symbol.pos));
                    self.advance();
                }
                SymbolKind::Device(t) => {
                    let message = format!("device type '{}' cannot be device name", t.as_str());
                    return self.error(Category::Syntax, message);
                }
                SymbolKind::DtypeInput(p) => {
                    let message = format!("port name '{p}' cannot be device name");
                    return self.error(Category::Syntax, message);
                }
                SymbolKind::DtypeOutput(p) => {
                    let message = format!("port name '{p}' cannot be device name");
                    return self.error(Category::Syntax, message);
                }
                SymbolKind::Keyword(k) => {
                    let message = format!("keyword '{}' cannot be device name", k.as_str());
                    return self.error(Category::Syntax, message);
                }
                _ => return self.error(Category::Syntax, "expected a device name"),
            }
            match &self.symbol.kind {
                SymbolKind::Comma => self.advance(),
                SymbolKind::Equals => {
                    self.advance();
                    break;
                }
                _ => return self.error(Category::Syntax, "missing symbol: ="),
            }
        }

        let SymbolKind::Device(device_type) = &self.symbol.kind else {
            return self.error(Category::Syntax, "expected a device type");
        };
        let device_type = *device_type;
        self.advance();

        let takes_argument = !matches!(
            device_type,
            DeviceType::Xor | DeviceType::Not | DeviceType::Dtype
        );
        let mut qualifier: Option<(u32, String, usize)> = None;
        if takes_argument {
            if self.symbol.kind != SymbolKind::OpenBracket {
                return self.error(Category::Syntax, "missing symbol: (");
            }
            self.advance();
            let SymbolKind::Number(text) = self.symbol.kind.clone() else {
                return self.error(Category::Syntax, "expected a number");
            };
            // Overflow saturates so it lands in the range diagnostic below.
            let value = text.parse::<u32>().unwrap_or(u32::MAX);
            qualifier = Some((value, text, self.symbol.pos));
            self.advance();
            if self.symbol.kind != SymbolKind::CloseBracket {
                return self.error(Category::Syntax, "missing symbol: )");
            }
            self.advance();
        }

        if self.symbol.kind != SymbolKind::Semicolon {
            return self.error(Category::Syntax, "missing symbol: ;");
        }
        self.advance();

        for (device_name, name_pos) in device_names {
            let result = self.network.devices_mut().make_device(
                device_name,
                device_type,
                qualifier.as_ref().map(|(value, _, _)| *value),
            );
            match result {
                Ok(()) => {}
                Err(crate::error::DeviceError::DevicePresent) => {
                    let name = self.name_string(device_name);
                    let message = format!("device name '{name}' is already defined");
                    return self.error_at(Category::Semantic, message, name_pos);
                }
                Err(crate::error::DeviceError::InvalidQualifier) => {
                    let (message, pos) = match &qualifier {
                        Some((_, text, pos)) => (
                            format!("argument '{text}' outside of accepted range"),
                            *pos,
                        ),
                        None => ("missing device argument".to_string(), name_pos),
                    };
                    return self.error_at(Category::Semantic, message, pos);
                }
            }
        }
    }

    /// `signal_name "->" signal_name {"," signal_name} ";"`
    fn parse_connection(&mut self) {
        let Some(source) = self.parse_signal_name() else {
            return;
        };
        if self.symbol.kind != SymbolKind::Arrow {
            return self.error(Category::Syntax, "missing symbol: ->");
        }
        self.advance();

        let mut targets = vec![];
        loop {
            let Some(target) = self.parse_signal_name() else {
                return;
            };
            targets.push(target);
            if self.symbol.kind == SymbolKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        if self.symbol.kind != SymbolKind::Semicolon {
            return self.error(Category::Syntax, "missing symbol: ;");
        }
        self.advance();

        for target in targets {
            if self.check_signal_exists(source).is_none()
                || self.check_signal_exists(target).is_none()
            {
                return;
            }
            let (source_device, source_port, _) = source;
            let (target_device, target_port, target_pos) = target;
            let result = self
                .network
                .make_connection(source_device, source_port, target_device, target_port);
            let message = match result {
                Ok(()) => continue,
                Err(crate::error::ConnectionError::InputConnected) => {
                    "input is already connected"
                }
                Err(crate::error::ConnectionError::InputToInput) => {
                    "cannot connect an input to an input"
                }
                Err(crate::error::ConnectionError::OutputToOutput) => {
                    "cannot connect an output to an output"
                }
                // Both ends were just checked.
                Err(crate::error::ConnectionError::PortAbsent) => "invalid connection",
            };
            return self.error_at(Category::Semantic, message, target_pos);
        }
    }

    /// `signal_name ";"`
    fn parse_monitor(&mut self) {
        let Some(signal) = self.parse_signal_name() else {
            return;
        };
        if self.symbol.kind != SymbolKind::Semicolon {
            return self.error(Category::Syntax, "missing symbol: ;");
        }
        self.advance();

        let Some((device_id, port, pos)) = self.check_signal_exists(signal) else {
            return;
        };
        if let PortId::Input(_) = port {
            return self.error_at(
                Category::Syntax,
                "inputs cannot be monitor targets",
                pos,
            );
        }
        let result = self
            .monitors
            .make_monitor(self.network.devices(), device_id, port);
        match result {
            Ok(()) => {}
            Err(crate::error::MonitorError::MonitorPresent) => {
                self.error_at(Category::Semantic, "signal is already monitored", pos);
            }
            Err(crate::error::MonitorError::NotOutput)
            | Err(crate::error::MonitorError::MonitorAbsent) => {
                let name = self.name_string(device_id);
                let message = format!("no such output on device '{name}'");
                self.error_at(Category::Semantic, message, pos);
            }
        }
    }

    /// `name ["." ("I" number | dtype_input | dtype_output)]`
    ///
    /// Syntax only. Existence of the device and port is checked later by
    /// [`Parser::check_signal_exists`], after the statement's semicolon.
    fn parse_signal_name(&mut self) -> Option<(NameId, PortId, usize)> {
        let pos = self.symbol.pos;
        let SymbolKind::Name(device_id) = &self.symbol.kind else {
            self.error(Category::Syntax, "expected a signal name");
            return None;
        };
        let device_id = *device_id;
        self.advance();

        if self.symbol.kind != SymbolKind::Dot {
            return Some((device_id, PortId::Output(OutputPort::Main), pos));
        }
        self.advance();

        let port = match &self.symbol.kind {
            SymbolKind::Keyword(Keyword::I) => {
                self.advance();
                let SymbolKind::Number(text) = self.symbol.kind.clone() else {
                    self.error(Category::Syntax, "expected a pin number");
                    return None;
                };
                let pin = text.parse::<u32>().unwrap_or(u32::MAX);
                PortId::Input(crate::devices::InputPort::Pin(pin))
            }
            SymbolKind::DtypeInput(p) => PortId::Input(*p),
            SymbolKind::DtypeOutput(p) => PortId::Output(*p),
            _ => {
                self.error(Category::Syntax, "expected a port name");
                return None;
            }
        };
        self.advance();
        Some((device_id, port, pos))
    }

    /// Emits a semantic diagnostic and returns `None` if the named device or
    /// port does not exist.
    fn check_signal_exists(
        &mut self,
        signal: (NameId, PortId, usize),
    ) -> Option<(NameId, PortId, usize)> {
        let (device_id, port, pos) = signal;
        let Some(device) = self.network.devices().get(device_id) else {
            let name = self.name_string(device_id);
            let message = format!("device '{name}' is absent");
            self.error_at(Category::Semantic, message, pos);
            return None;
        };
        let present = match port {
            PortId::Input(p) => device.has_input(p),
            PortId::Output(p) => device.has_output(p),
        };
        if !present {
            let name = self.name_string(device_id);
            let message = format!("no such port on device '{name}'");
            self.error_at(Category::Semantic, message, pos);
            return None;
        }
        Some(signal)
    }

    fn name_string(&self, id: NameId) -> String {
        self.names
            .get_name_string(id)
            .unwrap_or("<unknown>")
            .to_string()
    }
}
