use crate::error::InvariantViolation;
use crate::kinematics::Equation;
use crate::solve::graph::SolutionGraph;
use crate::solve::unknown::{Unknown, VariableId, VariableKind};
use crate::symbolic::Expr;

fn eq(lhs: &str, rhs: &str) -> Equation {
    Equation::parse(lhs, rhs).unwrap()
}

/// Mark `unknowns[index]` solved from `primary` and commit it.
fn solve(
    graph: &mut SolutionGraph,
    unknowns: &mut [Unknown],
    index: usize,
    order: u32,
    solution: &str,
    primary: Equation,
) -> Result<(), InvariantViolation> {
    let u = &mut unknowns[index];
    u.propose("test", vec![Expr::parse(solution).unwrap()], Vec::new(), primary, None);
    u.mark_solved(order);
    let snapshot = u.clone();
    graph.commit(&snapshot, unknowns)
}

fn planar() -> (SolutionGraph, Vec<Unknown>) {
    let unknowns = vec![
        Unknown::new("th_1", VariableKind::Revolute),
        Unknown::new("th_2", VariableKind::Revolute),
        Unknown::compound("th_12"),
    ];
    let mut graph = SolutionGraph::new();
    graph.generate_nodes(&unknowns);
    (graph, unknowns)
}

#[test]
fn test_generate_nodes() {
    let (graph, _) = planar();
    assert_eq!(graph.nodes.len(), 3);
    let node = graph.by_symbol("th_12").unwrap();
    assert!(node.is_root());
    assert!(!node.is_solved());
    assert!(graph.solved_nodes().is_empty());
}

#[test]
fn test_ensure_node_is_lazy_and_idempotent() {
    let mut graph = SolutionGraph::new();
    let a = graph.ensure_node("d_3");
    let b = graph.ensure_node("d_3");
    assert_eq!(a, b);
    assert_eq!(a, VariableId::for_symbol("d_3"));
    assert_eq!(graph.nodes.len(), 1);
}

#[test]
fn test_parents_from_used_equations() {
    let (mut graph, mut unknowns) = planar();
    solve(&mut graph, &mut unknowns, 2, 1, "atan2(r_21, r_11)", eq("r_21", "sin(th_12)")).unwrap();
    solve(
        &mut graph,
        &mut unknowns,
        0,
        2,
        "acos((px - l_2*cos(th_12))/l_1)",
        eq("px", "l_1*cos(th_1) + l_2*cos(th_12)"),
    )
    .unwrap();
    solve(&mut graph, &mut unknowns, 1, 3, "th_12 - th_1", eq("th_12", "th_1 + th_2")).unwrap();

    let th_1 = graph.by_symbol("th_1").unwrap();
    assert_eq!(th_1.parents.len(), 1);
    assert!(th_1.parents.contains(&VariableId::for_symbol("th_12")));
    assert_eq!(graph.by_symbol("th_2").unwrap().parents.len(), 2);

    assert_eq!(
        graph.edges(),
        vec![("th_1", "th_12"), ("th_2", "th_12"), ("th_2", "th_1")]
    );
    let roots: Vec<&str> = graph.roots().iter().map(|n| n.symbol.as_str()).collect();
    assert_eq!(roots, vec!["th_12"]);

    let dependents = graph.get_dependents(VariableId::for_symbol("th_12"));
    assert_eq!(
        dependents,
        vec![VariableId::for_symbol("th_1"), VariableId::for_symbol("th_2")]
    );
}

#[test]
fn test_sort_puts_parents_first() {
    let (mut graph, mut unknowns) = planar();
    solve(&mut graph, &mut unknowns, 2, 1, "atan2(r_21, r_11)", eq("r_21", "sin(th_12)")).unwrap();
    solve(
        &mut graph,
        &mut unknowns,
        0,
        2,
        "asin((py - l_2*sin(th_12))/l_1)",
        eq("py", "l_1*sin(th_1) + l_2*sin(th_12)"),
    )
    .unwrap();
    solve(&mut graph, &mut unknowns, 1, 3, "th_12 - th_1", eq("th_12", "th_1 + th_2")).unwrap();

    let order = graph.sort().unwrap();
    let pos = |s: &str| order.iter().position(|id| *id == VariableId::for_symbol(s)).unwrap();
    assert!(pos("th_12") < pos("th_1"));
    assert!(pos("th_1") < pos("th_2"));
    assert_eq!(graph.sort_order, order);
}

#[test]
fn test_unsolved_variables_are_not_parents() {
    let (mut graph, mut unknowns) = planar();
    // th_12 is mentioned but still unsolved
    solve(
        &mut graph,
        &mut unknowns,
        0,
        1,
        "acos(px)",
        eq("px", "l_1*cos(th_1) + l_2*cos(th_12)"),
    )
    .unwrap();
    assert!(graph.by_symbol("th_1").unwrap().is_root());
}

#[test]
fn test_commit_unknown_without_node() {
    let (mut graph, _) = planar();
    let mut stray = vec![Unknown::new("d_4", VariableKind::Prismatic)];
    let err = solve(&mut graph, &mut stray, 0, 1, "pz", eq("pz", "d_4")).unwrap_err();
    assert_eq!(err, InvariantViolation::MissingNode("d_4".to_string()));
}

#[test]
fn test_forward_reference_is_rejected() {
    let (mut graph, mut unknowns) = planar();
    // th_12 claims order 2 while th_1 (order 1) is about to be committed as its child
    unknowns[2].solutions = vec![Expr::parse("atan2(r_21, r_11)").unwrap()];
    unknowns[2].mark_solved(2);
    let err = solve(
        &mut graph,
        &mut unknowns,
        0,
        1,
        "acos(px)",
        eq("px", "l_1*cos(th_1) + l_2*cos(th_12)"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        InvariantViolation::ForwardReference { child_order: 1, parent_order: 2, .. }
    ));
}

#[test]
fn test_cycle_reports_path() {
    let (mut graph, _) = planar();
    let a = VariableId::for_symbol("th_1");
    let b = VariableId::for_symbol("th_2");
    graph.nodes.get_mut(&a).unwrap().parents.insert(b);
    graph.nodes.get_mut(&b).unwrap().parents.insert(a);

    match graph.sort() {
        Err(InvariantViolation::Cycle { path }) => {
            assert_eq!(path.len(), 3);
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"th_1".to_string()));
            assert!(path.contains(&"th_2".to_string()));
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_render_lists_solutions_and_edges() {
    let (mut graph, mut unknowns) = planar();
    solve(&mut graph, &mut unknowns, 2, 1, "atan2(r_21, r_11)", eq("r_21", "sin(th_12)")).unwrap();
    solve(&mut graph, &mut unknowns, 1, 2, "th_12 - th_1", eq("th_12", "th_1 + th_2")).unwrap();

    let text = graph.render();
    assert!(text.contains("1. th_12  [test]"));
    assert!(text.contains("th_12[0] = atan2(r_21, r_11)"));
    assert!(text.contains("th_2 -> th_12"));
}
