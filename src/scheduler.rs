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

//! The event scheduler: a clock, a pending-event heap, and the dispatch
//! loop that drives simulated time forward.
//!
//! There is exactly one scheduler per OS thread — a replication's whole
//! universe (clock, heap, processes, resources) is thread-local, so
//! independent replications on different threads never share state; see
//! the concurrency model in the crate docs. An appointment's handler runs
//! directly on the scheduler's own stack (the thread's root coroutine,
//! [`crate::coroutine::main`]); for a process wake-up the handler transfers
//! into that process's coroutine, which runs until it holds, waits, or
//! finishes, then yields back here. Handlers reach the scheduler through
//! the free functions in this module rather than a threaded-through
//! reference, so one can freely call `schedule`/`cancel` from deep inside
//! process or resource code without the caller having to plumb a handle
//! to "the current scheduler" through every signature.

use std::cell::RefCell;
use std::cmp::Ordering;

use crate::error::contract;
use crate::heap::HashHeap;

pub use crate::heap::Handle;

#[derive(Clone, Copy, PartialEq, Debug)]
struct EventKey {
    time: f64,
    priority: i64,
    tiebreaker: u64,
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .partial_cmp(&other.time)
            .expect("event time must never be NaN")
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.tiebreaker.cmp(&other.tiebreaker))
    }
}

struct Appointment {
    handler: Box<dyn FnOnce()>,
}

struct Scheduler {
    t: f64,
    heap: HashHeap<EventKey, Appointment>,
    next_tiebreaker: u64,
    terminated: bool,
}

impl Scheduler {
    fn new() -> Scheduler {
        Scheduler {
            t: 0.0,
            heap: HashHeap::new(),
            next_tiebreaker: 0,
            terminated: true,
        }
    }
}

thread_local! {
    static SCHEDULER: RefCell<Scheduler> = RefCell::new(Scheduler::new());
}

/// Reset the clock to `t0` and clear any pending events. Must be called
/// before the first `schedule`/`queue_execute` of a replication.
pub fn queue_initialize(t0: f64) {
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        *s = Scheduler::new();
        s.t = t0;
        s.terminated = false;
    });
}

pub fn time() -> f64 {
    SCHEDULER.with(|s| s.borrow().t)
}

pub fn pending_count() -> usize {
    SCHEDULER.with(|s| s.borrow().heap.len())
}

/// Queue `handler` to run at `at_time`, which must not precede the current
/// time. Ties at equal time are broken by `priority` (higher fires first),
/// then by insertion order.
pub fn schedule<F>(at_time: f64, priority: i64, handler: F) -> Handle
where
    F: FnOnce() + 'static,
{
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        contract!(
            at_time >= s.t,
            "schedule() at_time {} precedes current time {}",
            at_time,
            s.t
        );
        let tiebreaker = s.next_tiebreaker;
        s.next_tiebreaker += 1;
        let key = EventKey {
            time: at_time,
            priority,
            tiebreaker,
        };
        s.heap.push(
            key,
            Appointment {
                handler: Box::new(handler),
            },
        )
    })
}

pub fn cancel(handle: Handle) -> bool {
    SCHEDULER.with(|s| s.borrow_mut().heap.remove(handle).is_some())
}

/// Drain the pending-event heap, dispatching each handler in turn. Returns
/// once the heap runs dry, or immediately if [`queue_terminate`] was called
/// from within a handler.
pub fn queue_execute() {
    loop {
        if SCHEDULER.with(|s| s.borrow().terminated) {
            break;
        }
        let next = SCHEDULER.with(|s| s.borrow_mut().heap.pop_min());
        let (key, appt) = match next {
            Some(entry) => entry,
            None => break,
        };
        SCHEDULER.with(|s| {
            let mut s = s.borrow_mut();
            contract!(
                key.time >= s.t,
                "dispatch would rewind the clock from {} to {}",
                s.t,
                key.time
            );
            s.t = key.time;
        });
        // No borrow held here: the handler is free to call back into
        // `schedule`, `cancel`, or transfer into a process that itself
        // calls `process::hold` and reaches back into this module.
        (appt.handler)();
    }
}

/// Abort the run: stop dispatching and drop all pending events.
pub fn queue_terminate() {
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        s.terminated = true;
        s.heap = HashHeap::new();
    });
}
