use combsim_engine::{Circuit, EngineResult, GateKind};
use log::info;

// two inputs into an AND, one output
fn demo_circuit() -> EngineResult<Circuit> {
    let mut c = Circuit::new();
    let a = c.add_input("A", true)?;
    let b = c.add_input("B", false)?;
    let and = c.create_gate(GateKind::And)?;
    let out = c.create_labeled_gate(GateKind::Output, "F")?;

    c.connect(a, and)?;
    c.connect(b, and)?;
    c.connect(and, out)?;
    Ok(c)
}

fn run() -> EngineResult<()> {
    let mut c = demo_circuit()?;
    c.evaluate()?;
    for g in c.gates() {
        println!("{}", g);
    }
    info!("simulation finished");

    let baseline = c.input_values();
    let table = c.truth_table()?;
    c.restore_inputs(&baseline)?;
    c.evaluate()?;

    for out in c.outputs() {
        println!("{} = {}", c.gate(out)?.display_name(), c.expression(out)?);
    }
    println!("{}", table);
    println!("{}", c.to_json()?);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        eprintln!("error [{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}
