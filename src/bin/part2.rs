use anyhow::{Context, Result};
use clap::Parser;
use day10::CLIArgs;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Filtered by RUST_LOG, errors only when unset.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CLIArgs::parse();
    day10::init_thread_pool(args.jobs)?;
    let machines = day10::read_machines(&args.input_path).with_context(|| {
        format!(
            "Failed to read machines from given file({}).",
            args.input_path.display()
        )
    })?;

    let options = args.solve_options();
    let report = day10::sum_min_presses(
        &machines,
        |machine| day10::joltage::min_presses(machine, &options).map(|s| s.total()),
        args.skip_failed,
    )?;
    println!(
        "The fewest button presses to configure all machines' joltage is {}.",
        report.sum
    );
    if report.skipped > 0 {
        eprintln!("{} machine(s) skipped without an answer.", report.skipped);
    }

    Ok(())
}
