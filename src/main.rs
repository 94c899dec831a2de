//! Cograph - tick-driven circuit simulator
//!
//! Runs one of the built-in reference circuits and prints the committed
//! line states after every tick.
//!
//! # Usage
//!
//! ```bash
//! cograph --circuit rc --ticks 10 --volts 5
//! ```

use clap::{Parser, ValueEnum};
use cograph::{
    error::Result, CircuitGraph, ComponentNode, PhysicalProperties, SimulatorConfig,
};

/// Reference circuits
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Reference {
    /// Source across a single 1 kΩ resistor
    Ohm,
    /// Source across two 1 kΩ resistors in series
    Divider,
    /// Source across two 1 kΩ resistors in parallel
    Parallel,
    /// Source charging 1 µF through 1 kΩ
    Rc,
}

/// Tick-driven circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reference circuit to run
    #[arg(short, long, value_enum, default_value_t = Reference::Ohm)]
    circuit: Reference,

    /// Number of ticks to advance
    #[arg(short, long, default_value_t = 5)]
    ticks: u64,

    /// Source voltage
    #[arg(long, default_value_t = 5.0)]
    volts: f64,

    /// Agreement tolerance
    #[arg(long, default_value_t = cograph::solver::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Maximum relaxation iterations per tick
    #[arg(long, default_value_t = cograph::solver::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
}

fn build(reference: Reference, volts: f64, config: SimulatorConfig) -> Result<CircuitGraph> {
    let wire = PhysicalProperties::HOOKUP_WIRE;
    let mut graph = CircuitGraph::with_config(config)?;
    graph.define("V1", ComponentNode::voltage_dc(volts))?;
    graph.define("R1", ComponentNode::resistor(1000.0))?;
    graph.link("W1", ("V1", "pos"), ("R1", "p1"), wire)?;

    match reference {
        Reference::Ohm => {
            graph.link("W2", ("R1", "p2"), ("V1", "neg"), wire)?;
        }
        Reference::Divider => {
            graph.define("R2", ComponentNode::resistor(1000.0))?;
            graph.link("W2", ("R1", "p2"), ("R2", "p1"), wire)?;
            graph.link("W3", ("R2", "p2"), ("V1", "neg"), wire)?;
        }
        Reference::Parallel => {
            graph.define("R2", ComponentNode::resistor(1000.0))?;
            graph.link("W2", ("V1", "pos"), ("R2", "p1"), wire)?;
            graph.link("W3", ("R1", "p2"), ("V1", "neg"), wire)?;
            graph.link("W4", ("R2", "p2"), ("V1", "neg"), wire)?;
        }
        Reference::Rc => {
            graph.define("C1", ComponentNode::capacitor(1e-6))?;
            graph.link("W2", ("R1", "p2"), ("C1", "p1"), wire)?;
            graph.link("W3", ("C1", "p2"), ("V1", "neg"), wire)?;
        }
    }
    Ok(graph)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = SimulatorConfig::new()
        .with_tolerance(args.tolerance)
        .with_max_iterations(args.max_iterations);
    let mut graph = build(args.circuit, args.volts, config)?;
    cograph::circuit::validate_circuit(&graph)?;
    print!("{graph}");

    for _ in 0..args.ticks {
        let result = graph.advance_tick()?;
        println!(
            "tick {} ({} iterations, residual {:.2e})",
            result.tick, result.iterations, result.residual
        );
        for (label, state) in &result.edges {
            println!("\t{label}: {state}");
        }
    }
    println!("Kirchhoff residual: {:.2e}", graph.kirchhoff_residual());

    Ok(())
}
