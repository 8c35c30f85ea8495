mod repl;
use repl::Repl;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit definition file (.txt)
    filename: String,

    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logsim::init_logging(args.debug);

    let circuit = match logsim::load_circuit_from_file(&args.filename)? {
        Ok(circuit) => circuit,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            eprintln!("Circuit definition has {} errors.", diagnostics.len());
            std::process::exit(1);
        }
    };

    let mut repl = Repl::new(circuit);
    repl.run();
    Ok(())
}
