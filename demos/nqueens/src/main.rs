//! N-Queens Demo
//!
//! Places N queens on an NxN board so that no two threaten each other, and
//! enumerates every placement with a depth-first search.
//!
//! Usage: `nqueens [N]` (default 8). Set `RUST_LOG=cpforge_solver=debug` for
//! per-solution events.

use std::rc::Rc;

use cpforge::prelude::*;
use cpforge_test::{nqueens_model, FirstUnbound, SolutionRecorder};

fn print_board(rows: &[i64]) {
    let n = rows.len();
    println!("{}", "-".repeat(n * 2 + 1));
    for row in 0..n as i64 {
        print!("|");
        for &queen_row in rows {
            print!("{}", if queen_row == row { "Q|" } else { " |" });
        }
        println!();
    }
    println!("{}", "-".repeat(n * 2 + 1));
}

fn main() {
    cpforge::console::init();

    let n = match std::env::args().nth(1).map(|arg| arg.parse::<usize>()) {
        None => 8,
        Some(Ok(n)) if (1..=64).contains(&n) => n,
        Some(_) => {
            eprintln!("usage: nqueens [N], with N in 1..=64");
            std::process::exit(2);
        }
    };

    println!("cpforge N-Queens Demo");
    println!("=====================\n");
    println!("Problem: {n} queens on a {n}x{n} board\n");

    let mut solver = Solver::new();
    let queens = match nqueens_model(&mut solver, n) {
        Ok(queens) => queens,
        Err(_) => unreachable!("constraints added outside search are buffered"),
    };
    let recorder = monitor(SolutionRecorder::all(queens.clone()));
    let log = monitor(SearchLog::new(10_000));

    solver.solve(
        Rc::new(FirstUnbound::min_value(queens)),
        vec![recorder.clone() as MonitorRef, log as MonitorRef],
    );

    let recorder = recorder.borrow();
    match recorder.solutions().first() {
        Some(first) => {
            println!("First solution:");
            print_board(first);
        }
        None => println!("No solution."),
    }

    println!("\nSolutions found: {}", recorder.solutions().len());
    println!("{}", solver.statistics());
}
