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

//! A low-priority process holds a resource pool to capacity; a higher
//! -priority process preempts part of it. Prints who holds what before and
//! after.

use desim::error::signal;
use desim::resource::pool::ResourcePool;
use desim::{process, scheduler};

fn main() {
    env_logger::init();
    scheduler::queue_initialize(0.0);

    let mut pool = ResourcePool::new("machines", 3);
    let pool_ptr: *mut ResourcePool = &mut pool;

    let a = process::create("low-priority", 0, move |_| {
        let pool = unsafe { &mut *pool_ptr };
        let sig = pool.acquire(3);
        println!("t={:.1} A acquired 3 (signal={})", scheduler::time(), sig);
        let r = process::hold(10.0);
        if r == signal::PREEMPTED {
            println!("t={:.1} A was preempted, now holds {}", scheduler::time(), pool.holder_amount(process::current_process().unwrap()));
        }
        0
    });
    process::start(a, 0);

    scheduler::schedule(1.0, 1, move || {
        let b = process::create("high-priority", 1, move |_| {
            let pool = unsafe { &mut *pool_ptr };
            let sig = pool.preempt(2);
            println!(
                "t={:.1} B preempted, now holds {} (signal={})",
                scheduler::time(),
                pool.holder_amount(process::current_process().unwrap()),
                sig
            );
            0
        });
        process::start(b, 0);
    });

    scheduler::queue_execute();
    println!("final in_use = {}", pool.in_use());
}
