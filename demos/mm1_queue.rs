// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

//  Permission is hereby granted, free of charge, to any person obtaining a
//  copy of this software and associated documentation files (the "Software"),
//  to deal in the Software without restriction, including without limitation
//  the rights to use, copy, modify, merge, publish, distribute, sublicense,
//  and/or sell copies of the Software, and to permit persons to whom the
//  Software is furnished to do so, subject to the following conditions:
//
//  The above copyright notice and this permission notice shall be included in
//  all copies or substantial portions of the Software.
//
//  THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
//  OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//  FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//  AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//  LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
//  FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
//  DEALINGS IN THE SOFTWARE.

//! Single-server M/M/1 queue: Poisson arrivals, exponential service, one
//! server modeled as a resource pool of capacity 1. Reports the observed
//! mean system time against the theoretical `1/(mu-lambda)`.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

use desim::resource::pool::ResourcePool;
use desim::summary::RunningSummary;
use desim::{process, report, scheduler};

fn main() {
    env_logger::init();

    let lambda = 0.9_f64;
    let mu = 1.0_f64;
    let n_customers = 20_000u64;

    scheduler::queue_initialize(0.0);

    let mut server = ResourcePool::new("server", 1);
    let server_ptr: *mut ResourcePool = &mut server;

    let system_time = Rc::new(RefCell::new(RunningSummary::new()));
    let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(42)));
    let arrival_dist = Exp::new(lambda).unwrap();
    let service_dist = Exp::new(mu).unwrap();

    fn spawn_arrivals(
        n: u64,
        rng: Rc<RefCell<StdRng>>,
        arrival_dist: Exp<f64>,
        service_dist: Exp<f64>,
        server_ptr: *mut ResourcePool,
        system_time: Rc<RefCell<RunningSummary>>,
    ) {
        if n == 0 {
            return;
        }
        let dt = arrival_dist.sample(&mut *rng.borrow_mut());
        scheduler::schedule(scheduler::time() + dt, 0, move || {
            let arrival_time = scheduler::time();
            let service = service_dist.sample(&mut *rng.borrow_mut());
            let system_time2 = system_time.clone();
            let customer = process::create("customer", 0, move |_| {
                let server = unsafe { &mut *server_ptr };
                server.acquire(1);
                process::hold(service);
                server.release(1);
                system_time2.borrow_mut().add(scheduler::time() - arrival_time);
                0
            });
            // Never destroyed: this demo runs one replication and exits,
            // so the per-customer Process allocations live for the
            // process's lifetime rather than being reclaimed individually.
            process::start(customer, 0);
            spawn_arrivals(n - 1, rng.clone(), arrival_dist, service_dist, server_ptr, system_time);
        });
    }

    // Kick off the arrival stream as a self-scheduling appointment chain
    // (no "master" process needed — each arrival schedules the next).
    let n = n_customers;
    let rng2 = rng.clone();
    let system_time2 = system_time.clone();
    scheduler::schedule(0.0, 0, move || {
        spawn_arrivals(n, rng2, arrival_dist, service_dist, server_ptr, system_time2);
    });

    scheduler::queue_execute();

    let summary = system_time.borrow();
    report::print_summary_line(&mut std::io::stdout(), "system_time", &summary).unwrap();
    println!("theoretical mean: {:.4}", 1.0 / (mu - lambda));
}
