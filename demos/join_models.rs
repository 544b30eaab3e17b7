//! Example: compose ONNX models into a pipeline
//!
//! Joins the given models in order; outputs of model `i` feed the inputs of
//! model `i + 1` positionally.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example join_models -- first.onnx second.onnx [...] -o joined.onnx
//! ```

use std::env;

use onnx_compose::io::load_models;
use onnx_compose::prelude::*;

fn main() -> OnnxResult<()> {
    let args: Vec<String> = env::args().collect();

    let output_pos = args.iter().position(|a| a == "-o" || a == "--output");
    let (inputs, output_path) = match output_pos {
        Some(pos) if pos + 1 < args.len() => (&args[1..pos], args[pos + 1].as_str()),
        _ => (&args[1..], "joined.onnx"),
    };

    if inputs.is_empty() {
        eprintln!("Usage: {} <model.onnx>... [-o output.onnx]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output   Output path (default: joined.onnx)");
        eprintln!("  --no-sort      Keep concatenated node order");
        std::process::exit(1);
    }

    let no_sort = args.contains(&"--no-sort".to_string());
    let inputs: Vec<&String> = inputs.iter().filter(|a| !a.starts_with("--")).collect();

    println!("Loading {} models", inputs.len());
    let models = load_models(inputs.as_slice())?;
    for (path, model) in inputs.iter().zip(&models) {
        let graph = model.require_graph()?;
        println!(
            "  {}: {} nodes, {} inputs, {} outputs",
            path,
            graph.node.len(),
            graph.input.len(),
            graph.output.len()
        );
    }

    let joined = ModelJoiner::new()
        .sort_nodes(!no_sort)
        .producer_name("onnx-compose")
        .join(&models)?;

    let graph = joined.require_graph()?;
    println!();
    println!("Joined graph: {}", graph.name);
    println!("  Nodes: {}", graph.node.len());
    println!("  Initializers: {}", graph.initializer.len());
    println!(
        "  Inputs: {:?}",
        graph.input.iter().map(|vi| vi.name.as_str()).collect::<Vec<_>>()
    );
    println!(
        "  Outputs: {:?}",
        graph.output.iter().map(|vi| vi.name.as_str()).collect::<Vec<_>>()
    );
    println!(
        "  Opsets: {:?}",
        joined
            .opset_import
            .iter()
            .map(|o| (o.domain.as_str(), o.version))
            .collect::<Vec<_>>()
    );

    save_model(&joined, output_path)?;
    println!();
    println!("Saved to {}", output_path);

    Ok(())
}
