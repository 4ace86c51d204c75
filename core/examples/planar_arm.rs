use ik_core::config::EngineConfig;
use ik_core::kinematics::{Manipulator, ManipulatorSpec};
use ik_core::solve::Solver;
use ik_core::symbolic::Bindings;
use ik_core::verify::verify;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let spec: ManipulatorSpec = serde_json::from_str(include_str!("../../demos/planar_2r.json"))?;
    let manipulator = Manipulator::try_from(spec)?;

    let report = Solver::new(EngineConfig::default()).solve(&manipulator)?;
    println!("{}", report.graph.render());

    let sample: Bindings = [("th_1".to_string(), 0.3), ("th_2".to_string(), 0.5)]
        .into_iter()
        .collect();
    let check = verify(&manipulator, &report, &sample)?;
    for e in &check.errors {
        println!(
            "{:>6}  expected {:+.6}  got {:+.6}  (branch {})",
            e.symbol, e.expected, e.actual, e.branch
        );
    }
    println!("max error {:.3e}", check.max_error);
    Ok(())
}
