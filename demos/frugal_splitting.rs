//! Runs the Douglas-Rachford scenario (two quadratics, `n=2`) end to end
//! and prints the converged average. Not part of the library's public
//! API; exists so the crate has a runnable demonstration.

use oars_core::{run_parallel, IterationConfig, Matrix, Point, Resolvent, WarmStart};

struct QuadResolvent {
    c: Point,
}

impl Resolvent for QuadResolvent {
    fn shape(&self) -> usize {
        self.c.shape()
    }

    fn prox(&mut self, y: &Point, tau: f64) -> Point {
        let mut out = y.clone();
        out.add_scaled(tau, &self.c);
        &out / (1.0 + tau)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let w = Matrix::from_rows(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
    let z = Matrix::from_rows(vec![vec![0.0, 0.0], vec![-2.0, 0.0]]).unwrap();
    let data = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let config = IterationConfig { itrs: 200, gamma: 0.5, alpha: 1.0, verbose: true, ..Default::default() };

    let (xbar, results) = run_parallel(
        2,
        data,
        |c| Box::new(QuadResolvent { c }) as Box<dyn Resolvent>,
        w,
        z,
        WarmStart::Zero,
        None,
        config,
    )
    .expect("setup is valid");

    println!("x_bar = {:?}", xbar.as_slice());
    for (i, r) in results.iter().enumerate() {
        println!("node {i}: x = {:?}, rounds = {}", r.x.as_slice(), r.rounds);
    }
}
