use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const CHIP: &str = "STM32H743ZITx";
const TARGET: &str = "thumbv7em-none-eabihf";

pub fn run(release: bool) -> Result<()> {
    let profile = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("⚡ Building demo firmware ({profile})...")
            .cyan()
            .bold()
    );
    println!();

    let build_start = Instant::now();

    let mut build_args = vec![
        "build",
        "-p",
        "firmware",
        "--target",
        TARGET,
        "--features",
        "hardware",
    ];
    if release {
        build_args.push("--release");
    }

    let build_output = Command::new("cargo")
        .args(&build_args)
        .output()
        .context("Failed to run cargo build")?;

    if !build_output.status.success() {
        eprintln!("{}", "  ✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Firmware build failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ Build completed in {:.2}s",
            build_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    let binary = format!("target/{TARGET}/{profile}/firmware");

    println!(
        "{}",
        format!("  Flashing {binary} to {CHIP} via probe-rs...").cyan()
    );
    println!("  (RTT console attaches automatically; Ctrl-C to detach)");
    println!();

    // Inherit stdio so the defmt console streams straight to the terminal.
    let status = Command::new("probe-rs")
        .args(["run", "--chip", CHIP, &binary])
        .status()
        .context("Failed to run probe-rs (is it installed? `cargo install probe-rs-tools`)")?;

    if !status.success() {
        anyhow::bail!("probe-rs exited with {status}");
    }

    Ok(())
}
