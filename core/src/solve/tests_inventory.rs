use std::collections::BTreeSet;

use crate::kinematics::{Equation, MatrixEquation};
use crate::solve::inventory::{EquationInventory, Level};
use crate::solve::unknown::{Unknown, VariableId, VariableKind};
use crate::symbolic::Expr;

fn eq(lhs: &str, rhs: &str) -> Equation {
    Equation::parse(lhs, rhs).unwrap()
}

fn set(symbols: &[&str]) -> BTreeSet<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

fn planar_matrix() -> MatrixEquation {
    let rows = [
        ["cos(th_12)", "-sin(th_12)", "0", "l_1*cos(th_1) + l_2*cos(th_12)"],
        ["sin(th_12)", "cos(th_12)", "0", "l_1*sin(th_1) + l_2*sin(th_12)"],
        ["0", "0", "1", "0"],
    ];
    let mut rhs = MatrixEquation::pose_target();
    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            rhs[(i, j)] = Expr::parse(cell).unwrap();
        }
    }
    MatrixEquation::with_pose_target(rhs)
}

fn planar_unknowns() -> Vec<Unknown> {
    vec![
        Unknown::new("th_1", VariableKind::Revolute),
        Unknown::new("th_2", VariableKind::Revolute),
        Unknown::compound("th_12"),
    ]
}

#[test]
fn test_scan_partitions_by_unknown_count() {
    let unknowns = planar_unknowns();
    let aux = vec![eq("th_12", "th_1 + th_2")];
    let inv = EquationInventory::scan(&[planar_matrix()], &aux, &unknowns).unwrap();

    assert_eq!(inv.one.len(), 4);
    assert!(inv.one.iter().all(|e| e.mentions("th_12") && !e.mentions("th_1")));
    assert_eq!(inv.two.len(), 2);
    assert!(inv.two.iter().all(|e| e.mentions("th_1") && e.mentions("th_12")));
    assert_eq!(inv.many, aux);
    // constant entries such as 0 = 0 drop out
    assert_eq!(inv.len(), 7);
}

#[test]
fn test_scan_requires_a_matrix_equation() {
    let err = EquationInventory::scan(&[], &[], &planar_unknowns()).unwrap_err();
    assert_eq!(
        err,
        crate::error::InputError::NotEnoughEquations { expected: 1, got: 0 }
    );
}

#[test]
fn test_duplicates_are_dropped() {
    let inv = EquationInventory::scan_equations(
        vec![eq("x", "sin(a)"), eq("x", "sin(a)"), eq("y", "a + b")],
        set(&["a", "b"]),
    );
    assert_eq!(inv.one, vec![eq("x", "sin(a)")]);
    assert_eq!(inv.two, vec![eq("y", "a + b")]);
}

#[test]
fn test_levels_are_ranked() {
    let inv = EquationInventory::scan_equations(
        vec![eq("x", "l_1*cos(a) + l_2"), eq("y", "cos(a)"), eq("z", "-cos(a)")],
        set(&["a"]),
    );
    assert_eq!(
        inv.one,
        vec![eq("y", "cos(a)"), eq("z", "-cos(a)"), eq("x", "l_1*cos(a) + l_2")]
    );
}

#[test]
fn test_repartition_moves_equations_down() {
    let mut unknowns = planar_unknowns();
    let aux = vec![eq("th_12", "th_1 + th_2")];
    let mut inv = EquationInventory::scan(&[planar_matrix()], &aux, &unknowns).unwrap();
    let px = eq("px", "l_1*cos(th_1) + l_2*cos(th_12)");
    assert_eq!(inv.level_of(&px), Some(Level::Two));

    unknowns[2].solutions = vec![Expr::parse("atan2(r_21, r_11)").unwrap()];
    unknowns[2].mark_solved(1);
    inv.repartition(&unknowns);

    assert_eq!(inv.level_of(&px), Some(Level::One));
    // equations in the solved variable alone leave the inventory
    assert_eq!(inv.level_of(&eq("r_11", "cos(th_12)")), None);
    assert_eq!(inv.level_of(&aux[0]), Some(Level::Two));
    assert!(!inv.is_unknown("th_12"));
    assert_eq!(inv.unsolved(), &set(&["th_1", "th_2"]));
}

#[test]
fn test_equations_with_orders_by_level() {
    let inv = EquationInventory::scan_equations(
        vec![eq("s", "a + b + c"), eq("t", "a + b"), eq("u", "sin(a)")],
        set(&["a", "b", "c"]),
    );
    let found = inv.equations_with("a");
    assert_eq!(found, vec![eq("u", "sin(a)"), eq("t", "a + b"), eq("s", "a + b + c")]);
    assert_eq!(inv.solvable_for("a"), vec![&eq("u", "sin(a)")]);
    assert!(inv.solvable_for("b").is_empty());
}

#[test]
fn test_variable_id_is_stable() {
    assert_eq!(VariableId::for_symbol("th_1"), VariableId::for_symbol("th_1"));
    assert_ne!(VariableId::for_symbol("th_1"), VariableId::for_symbol("th_2"));
    assert_eq!(Unknown::compound("th_12").id, VariableId::for_symbol("th_12"));
}

#[test]
fn test_unknown_scan_collects_matrix_entries() {
    let mut u = Unknown::new("th_1", VariableKind::Revolute);
    u.scan(&[planar_matrix()]);
    assert_eq!(
        u.candidates,
        vec![
            eq("px", "l_1*cos(th_1) + l_2*cos(th_12)"),
            eq("py", "l_1*sin(th_1) + l_2*sin(th_12)"),
        ]
    );
    assert!(!u.is_solved());
}

#[test]
fn test_unknown_attempt_lifecycle() {
    let mut u = Unknown::compound("th_12");
    u.propose(
        "atan2",
        vec![Expr::parse("atan2(r_21, r_11)").unwrap()],
        Vec::new(),
        eq("r_21", "sin(th_12)"),
        Some(eq("r_11", "cos(th_12)")),
    );
    assert_eq!(u.used_equations().len(), 2);
    assert!(!u.is_solved());

    u.reset_attempt();
    assert!(u.solutions.is_empty());
    assert!(u.used_equations().is_empty());
    assert_eq!(u.solve_method, None);
}

#[test]
fn test_kind_angularity() {
    assert!(VariableKind::Revolute.is_angular());
    assert!(VariableKind::Compound.is_angular());
    assert!(!VariableKind::Prismatic.is_angular());
}
