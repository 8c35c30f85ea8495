use logsim::{Circuit, PortId, Signal};

pub struct Repl {
    circuit: Circuit,
    cycles_completed: usize,
    readline: rustyline::DefaultEditor,
}

impl Repl {
    pub fn new(circuit: Circuit) -> Repl {
        let readline = rustyline::DefaultEditor::new().unwrap();
        Repl {
            circuit,
            cycles_completed: 0,
            readline,
        }
    }

    fn readline(&mut self) -> Option<String> {
        loop {
            let result = self.readline.readline("> ");
            match result {
                Ok(line) => {
                    self.readline.add_history_entry(line.as_str()).unwrap();
                    return Some(line);
                }
                Err(rustyline::error::ReadlineError::Eof) => return None,
                Err(rustyline::error::ReadlineError::Interrupted) => (),
                Err(e) => panic!("{e:?}"),
            }
        }
    }

    pub fn run(&mut self) {
        println!("Logic Simulator: interactive command line user interface.");
        println!("Enter 'h' for a list of available commands.");
        loop {
            let Some(line) = self.readline() else {
                break;
            };
            let mut words = line.split_whitespace();
            match words.next() {
                None => (),
                Some("h") => self.help(),
                Some("q") => break,
                Some("r") => self.run_command(words.next()),
                Some("c") => self.continue_command(words.next()),
                Some("s") => self.switch_command(words.next(), words.next()),
                Some("m") => self.monitor_command(words.next()),
                Some("z") => self.zap_command(words.next()),
                Some(command) => {
                    println!("Invalid command '{command}'. Enter 'h' for help.")
                }
            }
        }
    }

    fn help(&self) {
        println!("User commands:");
        println!("r N       - run the simulation for N cycles");
        println!("c N       - continue the simulation for N cycles");
        println!("s X N     - set switch X to N (0 or 1)");
        println!("m X       - set a monitor on signal X");
        println!("z X       - zap the monitor on signal X");
        println!("h         - help (this command)");
        println!("q         - quit the program");
    }

    /// Executes up to `cycles` cycles, recording each settled one. Stops
    /// early on oscillation, crediting nothing past the last settled cycle.
    fn run_network(&mut self, cycles: usize) -> bool {
        for _ in 0..cycles {
            let Circuit {
                network, monitors, ..
            } = &mut self.circuit;
            if !network.execute_network() {
                println!("Error! Network oscillating.");
                return false;
            }
            monitors.record_signals(network.devices());
            self.cycles_completed += 1;
        }
        true
    }

    fn display_signals(&self) {
        print!(
            "{}",
            self.circuit
                .monitors
                .display_signals(&self.circuit.names, self.circuit.network.devices())
        );
    }

    fn run_command(&mut self, cycles: Option<&str>) {
        let Some(cycles) = cycles.and_then(|n| n.parse::<usize>().ok()) else {
            println!("Error! Expected a number of cycles.");
            return;
        };
        self.cycles_completed = 0;
        self.circuit.monitors.reset_monitors();
        self.circuit.network.devices_mut().cold_startup();
        println!("Running for {cycles} cycles");
        if self.run_network(cycles) {
            self.display_signals();
        }
    }

    fn continue_command(&mut self, cycles: Option<&str>) {
        let Some(cycles) = cycles.and_then(|n| n.parse::<usize>().ok()) else {
            println!("Error! Expected a number of cycles.");
            return;
        };
        if self.cycles_completed == 0 {
            println!("Error! Nothing to continue. Run first.");
            return;
        }
        if self.run_network(cycles) {
            println!(
                "Continuing for {cycles} cycles. Total: {}",
                self.cycles_completed
            );
            self.display_signals();
        }
    }

    fn switch_command(&mut self, name: Option<&str>, level: Option<&str>) {
        let level = match level {
            Some("0") => Signal::Low,
            Some("1") => Signal::High,
            _ => {
                println!("Error! Switch level must be 0 or 1.");
                return;
            }
        };
        let switch = name.and_then(|n| self.circuit.names.query(n));
        let set = match switch {
            Some(id) => self.circuit.network.devices_mut().set_switch(id, level),
            None => false,
        };
        if set {
            println!("Successfully set switch.");
        } else {
            println!("Error! Invalid switch.");
        }
    }

    fn monitor_command(&mut self, signal: Option<&str>) {
        let Some(signal) = signal else {
            println!("Error! Expected a signal name.");
            return;
        };
        let Circuit {
            names,
            network,
            monitors,
        } = &mut self.circuit;
        let target = network.devices().get_signal_ids(names, signal);
        match target {
            Some((device_id, port @ PortId::Output(_))) => {
                match monitors.make_monitor(network.devices(), device_id, port) {
                    Ok(()) => println!("Successfully made monitor."),
                    Err(_) => println!("Error! Could not make monitor."),
                }
            }
            _ => println!("Error! Could not make monitor."),
        }
    }

    fn zap_command(&mut self, signal: Option<&str>) {
        let Some(signal) = signal else {
            println!("Error! Expected a signal name.");
            return;
        };
        let Circuit {
            names,
            network,
            monitors,
        } = &mut self.circuit;
        let zapped = match network.devices().get_signal_ids(names, signal) {
            Some((device_id, PortId::Output(port))) => {
                monitors.remove_monitor(device_id, port).is_ok()
            }
            _ => false,
        };
        if zapped {
            println!("Successfully zapped monitor.");
        } else {
            println!("Error! Could not zap monitor.");
        }
    }
}
