pub mod devices;
pub mod error;
pub mod monitors;
pub mod names;
pub mod network;
pub mod parse;
pub mod scanner;

#[cfg(test)]
mod tests;

pub use devices::{Device, DeviceKind, Devices, InputPort, OutputPort, PortId, Signal};
pub use error::{Category, Diagnostic, FileError};
pub use monitors::Monitors;
pub use names::{NameId, Names};
pub use network::Network;
pub use parse::{Circuit, Parser};
pub use scanner::Scanner;

/// Parses a definition file into a circuit. Diagnostics were all recorded
/// during the single parse pass, so an `Err` carries every error in the file.
pub fn load_circuit_from_file(
    path: impl AsRef<std::path::Path>,
) -> Result<Result<Circuit, Vec<Diagnostic>>, FileError> {
    let scanner = Scanner::open(path)?;
    Ok(load_circuit(scanner))
}

pub fn load_circuit_from_string(text: &str) -> Result<Circuit, Vec<Diagnostic>> {
    load_circuit(Scanner::from_string(text))
}

fn load_circuit(scanner: Scanner) -> Result<Circuit, Vec<Diagnostic>> {
    let mut parser = Parser::new(scanner);
    if parser.parse_network() {
        Ok(parser.into_circuit())
    } else {
        Err(parser.diagnostics().to_vec())
    }
}

pub fn init_logging(debug: bool) {
    use chrono::{DateTime, Utc};

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    if debug {
        dispatch = dispatch.level(log::LevelFilter::Debug);
    } else {
        dispatch = dispatch.level(log::LevelFilter::Warn);
    }

    // A second call leaves the first logger in place.
    let _ = dispatch.apply();
}
