use crate::config::{CompletionPolicy, EngineConfig};
use crate::error::{IkError, InvariantViolation};
use crate::kinematics::{Equation, JointVariable, Manipulator, MatrixEquation};
use crate::solve::engine::*;
use crate::solve::inventory::{EquationInventory, Level};
use crate::solve::strategy::{Attempt, SolvingStrategy};
use crate::solve::unknown::{Unknown, VariableKind};
use crate::symbolic::Expr;

fn planar_manipulator() -> Manipulator {
    let rows = [
        ["cos(th_1 + th_2)", "-sin(th_1 + th_2)", "0", "l_1*cos(th_1) + l_2*cos(th_1 + th_2)"],
        ["sin(th_1 + th_2)", "cos(th_1 + th_2)", "0", "l_1*sin(th_1) + l_2*sin(th_1 + th_2)"],
        ["0", "0", "1", "0"],
    ];
    let mut rhs = MatrixEquation::pose_target();
    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            rhs[(i, j)] = Expr::parse(cell).unwrap();
        }
    }
    Manipulator::new(
        "planar_2r",
        vec![JointVariable::revolute("th_1"), JointVariable::revolute("th_2")],
        vec![MatrixEquation::with_pose_target(rhs)],
    )
}

fn p(text: &str) -> Expr {
    Expr::parse(text).unwrap()
}

/// Solves one named variable with a fixed expression, from its best candidate.
struct Scripted {
    symbol: &'static str,
    solution: &'static str,
}

impl SolvingStrategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn attempt(&self, unknown: &mut Unknown, _inventory: &EquationInventory) -> Attempt {
        if unknown.symbol != self.symbol {
            return Attempt::NotSolved;
        }
        let Some(primary) = unknown.candidates.first().cloned() else {
            return Attempt::NotSolved;
        };
        unknown.propose(self.name(), vec![p(self.solution)], Vec::new(), primary, None);
        Attempt::Solved
    }
}

/// Claims success without producing anything.
struct Liar;

impl SolvingStrategy for Liar {
    fn name(&self) -> &str {
        "liar"
    }

    fn attempt(&self, unknown: &mut Unknown, _inventory: &EquationInventory) -> Attempt {
        let primary = Equation::new(Expr::sym("px"), Expr::sym(&unknown.symbol));
        unknown.propose(self.name(), Vec::new(), Vec::new(), primary, None);
        Attempt::Solved
    }
}

#[test]
fn test_prepare_normalizes_and_scans() {
    let ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();

    let symbols: Vec<&str> = ctx.unknowns.iter().map(|u| u.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["th_1", "th_2", "th_12"]);
    assert_eq!(ctx.unknowns[2].kind, VariableKind::Compound);
    assert_eq!(ctx.auxiliary, vec![Equation::parse("th_12", "th_1 + th_2").unwrap()]);

    assert_eq!(ctx.inventory.one.len(), 4);
    assert_eq!(ctx.inventory.two.len(), 2);
    assert_eq!(ctx.inventory.level_of(&ctx.auxiliary[0]), Some(Level::Many));
    assert_eq!(ctx.graph.nodes.len(), 3);
    assert_eq!(ctx.solve_counter, 0);
    assert!(!ctx.complete);
}

#[test]
fn test_prepare_without_sum_of_angles() {
    let config = EngineConfig {
        sum_of_angles: false,
        ..EngineConfig::default()
    };
    let ctx = Solver::new(config).prepare(&planar_manipulator()).unwrap();
    assert_eq!(ctx.unknowns.len(), 2);
    assert!(ctx.auxiliary.is_empty());
    assert!(ctx.inventory.one.is_empty());
    assert_eq!(ctx.inventory.two.len(), 6);
}

#[test]
fn test_prepare_rejects_bad_config() {
    let config = EngineConfig {
        max_iterations: 0,
        ..EngineConfig::default()
    };
    let err = Solver::new(config).prepare(&planar_manipulator()).unwrap_err();
    assert!(matches!(err, IkError::Config(_)));
}

#[test]
fn test_assigner_rotates_and_wraps() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    ctx.unknowns[1].solutions = vec![p("0")];
    ctx.unknowns[1].mark_solved(1);

    let mut offered = Vec::new();
    for _ in 0..4 {
        Assigner.run(&mut ctx).unwrap();
        offered.push(ctx.current.unwrap());
    }
    // th_2 is skipped; past the end the cursor resets and index 0 is exposed
    assert_eq!(offered, vec![0, 2, 0, 0]);
    assert_eq!(ctx.cursor, 1);
}

#[test]
fn test_assigner_exposes_first_when_all_solved() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    for (k, u) in ctx.unknowns.iter_mut().enumerate() {
        u.solutions = vec![p("0")];
        u.mark_solved(k as u32 + 1);
    }
    ctx.cursor = 2;
    Assigner.run(&mut ctx).unwrap();
    assert_eq!(ctx.current, Some(0));
    assert_eq!(ctx.cursor, 0);
}

#[test]
fn test_commit_reclassifies_equations() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    let strategies: Vec<Box<dyn SolvingStrategy>> = vec![Box::new(Scripted {
        symbol: "th_12",
        solution: "atan2(r_21, r_11)",
    })];
    let dispatch = StrategyDispatch::new(&strategies);
    let px = Equation::parse("px", "l_1*cos(th_1) + l_2*cos(th_12)").unwrap();
    assert_eq!(ctx.inventory.level_of(&px), Some(Level::Two));

    ctx.current = Some(2);
    assert_eq!(dispatch.run(&mut ctx).unwrap(), StepStatus::Success);

    let th_12 = ctx.unknown("th_12").unwrap();
    assert!(th_12.is_solved());
    assert_eq!(th_12.solve_order, 1);
    assert_eq!(ctx.solve_counter, 1);
    assert_eq!(ctx.inventory.level_of(&px), Some(Level::One));
    assert_eq!(ctx.inventory.level_of(&ctx.auxiliary[0]), Some(Level::Two));
    assert!(ctx.graph.by_symbol("th_12").unwrap().is_solved());
    // other unknowns see the new partition
    assert_eq!(ctx.unknown("th_1").unwrap().candidates.first(), Some(&px));
}

#[test]
fn test_dispatch_failure_counts_stall() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    let strategies: Vec<Box<dyn SolvingStrategy>> = vec![Box::new(Scripted {
        symbol: "th_12",
        solution: "0",
    })];
    let dispatch = StrategyDispatch::new(&strategies);

    ctx.current = Some(0);
    assert_eq!(dispatch.run(&mut ctx).unwrap(), StepStatus::Failure);
    assert_eq!(dispatch.run(&mut ctx).unwrap(), StepStatus::Failure);
    assert_eq!(ctx.failures, vec![2, 0, 0]);
    assert!(ctx.unknowns[0].solutions.is_empty());

    ctx.current = Some(2);
    dispatch.run(&mut ctx).unwrap();
    assert_eq!(ctx.failures, vec![0, 0, 0]);

    // an already-solved variable is skipped without counting
    dispatch.run(&mut ctx).unwrap();
    assert_eq!(ctx.failures, vec![0, 0, 0]);
    assert_eq!(ctx.solve_counter, 1);
}

#[test]
fn test_repeated_failures_on_one_variable_do_not_exhaust() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    ctx.unknowns[1].solutions = vec![p("0")];
    ctx.unknowns[1].mark_solved(1);

    ctx.failures[0] = 2;
    assert!(!ctx.exhausted(1));
    ctx.failures[2] = 1;
    assert!(ctx.exhausted(1));
    assert!(!ctx.exhausted(2));
    ctx.failures[2] = 2;
    assert!(ctx.exhausted(2));
}

#[test]
fn test_completion_detector() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    for (k, u) in ctx.unknowns.iter_mut().take(2).enumerate() {
        u.solutions = vec![p("0")];
        u.mark_solved(k as u32 + 1);
    }

    let succeed = CompletionDetector {
        policy: CompletionPolicy::SucceedWhenDone,
    };
    let fail = CompletionDetector {
        policy: CompletionPolicy::FailWhenDone,
    };
    assert_eq!(succeed.run(&mut ctx).unwrap(), StepStatus::Failure);
    assert!(!ctx.complete);
    assert_eq!(fail.run(&mut ctx).unwrap(), StepStatus::Success);
    assert!(!ctx.complete);

    ctx.unknowns[2].solutions = vec![p("0")];
    ctx.unknowns[2].mark_solved(3);
    assert_eq!(succeed.run(&mut ctx).unwrap(), StepStatus::Success);
    assert!(ctx.complete);
    assert_eq!(fail.run(&mut ctx).unwrap(), StepStatus::Failure);
    assert!(ctx.complete);
}

#[test]
fn test_solve_planar_arm() {
    let report = Solver::new(EngineConfig::default()).solve(&planar_manipulator()).unwrap();
    assert_eq!(report.outcome, SolveOutcome::Complete);
    assert_eq!(report.name, "planar_2r");
    assert_eq!(report.iterations, 5);

    let order: Vec<(&str, u32)> = report
        .solutions
        .iter()
        .map(|n| (n.symbol.as_str(), n.solve_order))
        .collect();
    assert_eq!(order, vec![("th_12", 1), ("th_1", 2), ("th_2", 3)]);

    let th_12 = report.unknown("th_12").unwrap();
    assert_eq!(th_12.solve_method.as_deref(), Some("atan2"));
    assert_eq!(th_12.solutions, vec![p("atan2(r_21, r_11)")]);

    let th_1 = report.unknown("th_1").unwrap();
    assert_eq!(th_1.solve_method.as_deref(), Some("atan2"));
    assert!(th_1.solutions[0].has_symbol("th_12"));

    let th_2 = report.unknown("th_2").unwrap();
    assert_eq!(th_2.solve_method.as_deref(), Some("algebraic"));
    assert_eq!(th_2.solutions, vec![p("th_12 - th_1")]);

    let edges: Vec<(&str, &str)> = report
        .edges
        .iter()
        .map(|e| (e.child.as_str(), e.parent.as_str()))
        .collect();
    assert_eq!(edges, vec![("th_1", "th_12"), ("th_2", "th_12"), ("th_2", "th_1")]);
}

#[test]
fn test_external_strategy_unlocks_position_equation() {
    use crate::solve::strategies::{AlgebraicSolver, InverseTrigSolver, SinCosPairSolver};

    let strategies: Vec<Box<dyn SolvingStrategy>> = vec![
        Box::new(Scripted {
            symbol: "th_1",
            solution: "atan2(py, px)",
        }),
        Box::new(SinCosPairSolver),
        Box::new(AlgebraicSolver),
        Box::new(InverseTrigSolver),
    ];
    let solver = Solver::with_strategies(EngineConfig::default(), strategies);
    let mut ctx = solver.prepare(&planar_manipulator()).unwrap();
    let px = Equation::parse("px", "l_1*cos(th_1) + l_2*cos(th_12)").unwrap();
    assert_eq!(ctx.inventory.level_of(&px), Some(Level::Two));

    // first pass: th_1 is claimed by the scripted strategy
    let scripted: Vec<Box<dyn SolvingStrategy>> = vec![Box::new(Scripted {
        symbol: "th_1",
        solution: "atan2(py, px)",
    })];
    let dispatch = StrategyDispatch::new(&scripted);
    Assigner.run(&mut ctx).unwrap();
    dispatch.run(&mut ctx).unwrap();
    assert_eq!(ctx.unknown("th_1").unwrap().solve_order, 1);
    assert_eq!(ctx.inventory.level_of(&px), Some(Level::One));

    let report = solver.run("planar_2r", ctx).unwrap();
    assert!(report.is_complete());
    let order: Vec<(&str, u32)> = report
        .solutions
        .iter()
        .map(|n| (n.symbol.as_str(), n.solve_order))
        .collect();
    assert_eq!(order, vec![("th_1", 1), ("th_12", 2), ("th_2", 3)]);
    assert!(report.graph.by_symbol("th_1").unwrap().is_root());
    assert_eq!(report.unknown("th_2").unwrap().solutions, vec![p("th_12 - th_1")]);
}

/// `px = d_1 + d_2`, `py = d_2 + d_3`, `pz = d_3`: only the last joint is
/// solvable at first, and the rest unlock one after another.
fn prismatic_chain() -> Manipulator {
    let mut rhs = MatrixEquation::pose_target();
    for i in 0..3 {
        for j in 0..3 {
            rhs[(i, j)] = if i == j { Expr::one() } else { Expr::zero() };
        }
    }
    rhs[(0, 3)] = p("d_1 + d_2");
    rhs[(1, 3)] = p("d_2 + d_3");
    rhs[(2, 3)] = p("d_3");
    Manipulator::new(
        "prismatic_chain",
        vec![
            JointVariable::prismatic("d_1"),
            JointVariable::prismatic("d_2"),
            JointVariable::prismatic("d_3"),
        ],
        vec![MatrixEquation::with_pose_target(rhs)],
    )
}

#[test]
fn test_solve_unlocks_backwards_after_wrap() {
    let report = Solver::new(EngineConfig::default()).solve(&prismatic_chain()).unwrap();
    assert_eq!(report.outcome, SolveOutcome::Complete);
    // d_1 d_2 (fail), d_3, wrap to d_1 twice (fail), d_2, wrap to d_1
    assert_eq!(report.iterations, 7);

    let order: Vec<(&str, u32)> = report
        .solutions
        .iter()
        .map(|n| (n.symbol.as_str(), n.solve_order))
        .collect();
    assert_eq!(order, vec![("d_3", 1), ("d_2", 2), ("d_1", 3)]);
    assert_eq!(report.unknown("d_3").unwrap().solutions, vec![p("pz")]);
    assert_eq!(report.unknown("d_2").unwrap().solutions, vec![p("py - d_3")]);
    assert_eq!(report.unknown("d_1").unwrap().solutions, vec![p("px - d_2")]);
}

#[test]
fn test_fail_when_done_still_terminates() {
    let config = EngineConfig {
        completion_policy: CompletionPolicy::FailWhenDone,
        ..EngineConfig::default()
    };
    let report = Solver::new(config).solve(&planar_manipulator()).unwrap();
    assert!(report.is_complete());
}

#[test]
fn test_stall_reports_reasons() {
    let solver = Solver::with_strategies(EngineConfig::default(), Vec::new());
    let report = solver.solve(&planar_manipulator()).unwrap();
    assert_eq!(report.iterations, 3);
    assert!(report.solutions.is_empty());
    match report.outcome {
        SolveOutcome::Incomplete { unsolved } => {
            assert_eq!(
                unsolved,
                vec![
                    UnsolvedVariable {
                        symbol: "th_1".to_string(),
                        reason: UnsolvedReason::NoMatchingStrategy,
                    },
                    UnsolvedVariable {
                        symbol: "th_2".to_string(),
                        reason: UnsolvedReason::NoUsableEquation,
                    },
                    UnsolvedVariable {
                        symbol: "th_12".to_string(),
                        reason: UnsolvedReason::NoMatchingStrategy,
                    },
                ]
            );
        }
        SolveOutcome::Complete => panic!("nothing can be solved without strategies"),
    }
}

#[test]
fn test_iteration_cap() {
    let config = EngineConfig {
        max_iterations: 1,
        ..EngineConfig::default()
    };
    let report = Solver::new(config).solve(&planar_manipulator()).unwrap();
    assert_eq!(report.iterations, 1);
    assert!(!report.is_complete());
}

#[test]
fn test_no_closed_form_without_normalization() {
    let config = EngineConfig {
        sum_of_angles: false,
        ..EngineConfig::default()
    };
    let report = Solver::new(config).solve(&planar_manipulator()).unwrap();
    match report.outcome {
        SolveOutcome::Incomplete { unsolved } => {
            assert_eq!(unsolved.len(), 2);
            assert!(unsolved.iter().all(|u| u.reason == UnsolvedReason::NoMatchingStrategy));
        }
        SolveOutcome::Complete => panic!("expected incomplete"),
    }
}

#[test]
fn test_empty_solutions_is_fatal() {
    let solver = Solver::with_strategies(EngineConfig::default(), vec![Box::new(Liar)]);
    let err = solver.solve(&planar_manipulator()).unwrap_err();
    match err {
        IkError::Invariant(InvariantViolation::EmptySolutions { symbol, method }) => {
            assert_eq!(symbol, "th_1");
            assert_eq!(method, "liar");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_commit_twice_is_rejected() {
    let mut ctx = Solver::new(EngineConfig::default()).prepare(&planar_manipulator()).unwrap();
    ctx.unknowns[2].propose(
        "manual",
        vec![p("atan2(r_21, r_11)")],
        Vec::new(),
        Equation::parse("r_21", "sin(th_12)").unwrap(),
        None,
    );
    ctx.commit(2).unwrap();
    let err = ctx.commit(2).unwrap_err();
    assert!(matches!(
        err,
        IkError::Invariant(InvariantViolation::AlreadySolved(ref s)) if s == "th_12"
    ));
}

#[test]
fn test_report_serializes() {
    let report = Solver::new(EngineConfig::default()).solve(&planar_manipulator()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"]["status"], "complete");
    assert_eq!(json["solutions"][0]["symbol"], "th_12");
    assert_eq!(json["solutions"][0]["solutions"][0], "atan2(r_21, r_11)");
    assert_eq!(json["auxiliary"][0]["lhs"], "th_12");
}
