use super::*;

fn load(text: &str) -> Circuit {
    match load_circuit_from_string(text) {
        Ok(circuit) => circuit,
        Err(diagnostics) => panic!("unexpected diagnostics: {diagnostics:?}"),
    }
}

/// Runs `cycles` cycles, recording each settled one. Returns the number of
/// cycles actually credited.
fn run(circuit: &mut Circuit, cycles: usize) -> usize {
    let Circuit {
        network, monitors, ..
    } = circuit;
    for cycle in 0..cycles {
        if !network.execute_network() {
            return cycle;
        }
        monitors.record_signals(network.devices());
    }
    cycles
}

fn display(circuit: &Circuit) -> String {
    circuit
        .monitors
        .display_signals(&circuit.names, circuit.network.devices())
}

#[test]
fn and_gate_follows_its_switches() {
    let mut circuit = load(
        "
        DEVICES
            SW1, SW2 = SWITCH(1);
            G1 = AND(2);
        CONNECT
            SW1 -> G1.I1;
            SW2 -> G1.I2;
        MONITOR
            G1;
        END
        ",
    );
    assert_eq!(run(&mut circuit, 1), 1);
    assert_eq!(display(&circuit), "G1 : -\n");

    let sw2 = circuit.names.query("SW2").unwrap();
    circuit.network.devices_mut().set_switch(sw2, Signal::Low);
    assert_eq!(run(&mut circuit, 1), 1);
    assert_eq!(display(&circuit), "G1 : -_\n");
}

#[test]
fn clock_with_unit_half_period_alternates() {
    let mut circuit = load(
        "
        DEVICES CK = CLOCK(1);
        CONNECT
        MONITOR CK;
        END
        ",
    );
    assert_eq!(run(&mut circuit, 4), 4);
    assert_eq!(display(&circuit), "CK : -_-_\n");
}

#[test]
fn dtype_delays_its_data_by_one_clock() {
    let mut circuit = load(
        "
        DEVICES
            CK = CLOCK(1);
            DIN = SWITCH(1);
            ZERO = SWITCH(0);
            D1 = DTYPE;
        CONNECT
            CK -> D1.CLK;
            DIN -> D1.DATA;
            ZERO -> D1.SET, D1.CLEAR;
        MONITOR
            D1.Q;
            D1.QBAR;
        END
        ",
    );
    // The clock rises on cycles 1 and 3.
    assert_eq!(run(&mut circuit, 2), 2);
    assert_eq!(display(&circuit), "D1.Q    : --\nD1.QBAR : __\n");

    let din = circuit.names.query("DIN").unwrap();
    circuit.network.devices_mut().set_switch(din, Signal::Low);
    assert_eq!(run(&mut circuit, 2), 2);
    assert_eq!(display(&circuit), "D1.Q    : --__\nD1.QBAR : __--\n");
}

#[test]
fn oscillation_credits_only_settled_cycles() {
    let mut circuit = load(
        "
        DEVICES
            SW1 = SWITCH(0);
            G1 = NAND(2);
        CONNECT
            SW1 -> G1.I1;
            G1 -> G1.I2;
        MONITOR
            G1;
        END
        ",
    );
    // With SW1 low the feedback NAND is stable high.
    assert_eq!(run(&mut circuit, 3), 3);
    assert_eq!(display(&circuit), "G1 : ---\n");

    // Driving SW1 high turns the loop into an oscillator: the cycle that
    // fails to settle is not recorded.
    let sw1 = circuit.names.query("SW1").unwrap();
    circuit.network.devices_mut().set_switch(sw1, Signal::High);
    assert_eq!(run(&mut circuit, 5), 0);
    assert_eq!(display(&circuit), "G1 : ---\n");
}

#[test]
fn cold_startup_gives_a_repeatable_run() {
    let mut circuit = load(
        "
        DEVICES
            CK = CLOCK(2);
            G1 = NOT;
        CONNECT
            CK -> G1.I1;
        MONITOR
            G1;
        END
        ",
    );
    assert_eq!(run(&mut circuit, 5), 5);
    let first = display(&circuit);

    circuit.monitors.reset_monitors();
    circuit.network.devices_mut().cold_startup();
    assert_eq!(run(&mut circuit, 5), 5);
    assert_eq!(display(&circuit), first);
}

#[test]
fn monitor_added_mid_run_is_blank_for_elapsed_cycles() {
    let mut circuit = load(
        "
        DEVICES
            SW1 = SWITCH(1);
            G1 = NOT;
        CONNECT
            SW1 -> G1.I1;
        MONITOR
            G1;
        END
        ",
    );
    assert_eq!(run(&mut circuit, 2), 2);
    let sw1 = circuit.names.query("SW1").unwrap();
    circuit
        .monitors
        .make_monitor(
            circuit.network.devices(),
            sw1,
            PortId::Output(OutputPort::Main),
        )
        .unwrap();
    assert_eq!(run(&mut circuit, 1), 1);
    assert_eq!(display(&circuit), "G1  : ___\nSW1 :   -\n");
}

#[test]
fn blanks_accumulate_while_nothing_is_monitored() {
    let mut circuit = load(
        "
        DEVICES
            SW1 = SWITCH(1);
            G1 = NOT;
        CONNECT
            SW1 -> G1.I1;
        MONITOR
            G1;
        END
        ",
    );
    assert_eq!(run(&mut circuit, 2), 2);
    let g1 = circuit.names.query("G1").unwrap();
    circuit.monitors.remove_monitor(g1, OutputPort::Main).unwrap();
    assert_eq!(run(&mut circuit, 1), 1);
    let sw1 = circuit.names.query("SW1").unwrap();
    circuit
        .monitors
        .make_monitor(
            circuit.network.devices(),
            sw1,
            PortId::Output(OutputPort::Main),
        )
        .unwrap();
    assert_eq!(run(&mut circuit, 1), 1);
    assert_eq!(display(&circuit), "SW1 :    -\n");
}

#[test]
fn full_adder_truth_table() {
    let mut circuit = load(
        "
        # One-bit full adder built from two half adders.
        DEVICES
            A, B, CIN = SWITCH(0);
            X1, X2 = XOR;
            A1, A2 = AND(2);
            O1 = OR(2);
        CONNECT
            A -> X1.I1, A1.I1;
            B -> X1.I2, A1.I2;
            X1 -> X2.I1, A2.I1;
            CIN -> X2.I2, A2.I2;
            A1 -> O1.I1;
            A2 -> O1.I2;
        MONITOR
            X2;
            O1;
        END
        ",
    );
    let a = circuit.names.query("A").unwrap();
    let b = circuit.names.query("B").unwrap();
    let cin = circuit.names.query("CIN").unwrap();
    let x2 = circuit.names.query("X2").unwrap();
    let o1 = circuit.names.query("O1").unwrap();

    for bits in 0u8..8 {
        let inputs = [(a, bits & 1 != 0), (b, bits & 2 != 0), (cin, bits & 4 != 0)];
        for (switch, high) in inputs {
            circuit
                .network
                .devices_mut()
                .set_switch(switch, Signal::from(high));
        }
        assert_eq!(run(&mut circuit, 1), 1);
        let ones = inputs.iter().filter(|(_, high)| *high).count();
        let sum = circuit
            .network
            .devices()
            .output_signal(x2, OutputPort::Main)
            .unwrap();
        let carry = circuit
            .network
            .devices()
            .output_signal(o1, OutputPort::Main)
            .unwrap();
        assert_eq!(sum.is_high(), ones % 2 == 1, "sum for inputs {bits:03b}");
        assert_eq!(carry.is_high(), ones >= 2, "carry for inputs {bits:03b}");
    }
}

#[test]
fn rejected_definition_reports_every_error() {
    let diagnostics = load_circuit_from_string(
        "
        DEVICES
            SW1 = SWITCH(3);
            G1 = AND(2);
            G1 = NOT;
        CONNECT
            SW1 -> G1.I1;
        MONITOR
            G1;
        END
        ",
    )
    .unwrap_err();
    let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "argument '3' outside of accepted range",
            "device name 'G1' is already defined",
            // SWITCH(3) was rejected, so SW1 never came into existence.
            "device 'SW1' is absent",
            "incomplete network, not every input is connected",
        ]
    );
}
