//! Background subtraction CLI tool
//!
//! Command-line interface for running frame sequences through the per-pixel
//! Gaussian mixture background model.

#[cfg(feature = "cli")]
use bgmodel::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
