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

//! Resource guard: a predicate-evaluated waiter queue shared by every
//! concrete resource (condition, pool, queue, buffer) as its `front_guard`
//! / `rear_guard`.
//!
//! A waiter's predicate is a plain closure rather than the source's
//! `(predicate_fn, predicate_context)` pair — a `Box<dyn Fn() -> bool>`
//! already carries whatever state it needs to capture, which is the
//! idiomatic replacement for a function pointer plus an opaque context
//! pointer.

use crate::error::signal;
use crate::heap::{Handle, HashHeap};
use crate::process::{self, ProcessHandle, ProcessState, WaitToken};
use crate::scheduler;

struct Waiter {
    process: ProcessHandle,
    predicate: Box<dyn Fn() -> bool>,
}

/// A priority-ordered waiter queue plus an observer fan-out list. Embedded
/// as a resource's `front_guard`/`rear_guard`.
pub struct ResourceGuard {
    waiters: HashHeap<i64, Waiter>,
    subscribers: Vec<*mut ResourceGuard>,
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGuard {
    pub fn new() -> Self {
        ResourceGuard {
            waiters: HashHeap::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.waiters.len()
    }

    /// Enqueue the current process with `predicate` and transfer to the
    /// scheduler. Returns [`signal::SUCCESS`] once this guard's `signal`
    /// re-admits it (predicate now true), or an interrupt code.
    pub fn wait<F>(&mut self, predicate: F) -> i64
    where
        F: Fn() -> bool + 'static,
    {
        let me = process::current_process().expect("guard wait() called outside any process");
        let key = -me.priority();
        let waiter_handle = self.waiters.push(
            key,
            Waiter {
                process: me,
                predicate: Box::new(predicate),
            },
        );
        me.set_state(ProcessState::Waiting);
        me.set_wait_token(Some(WaitToken {
            guard: self as *mut ResourceGuard as *mut (),
            cancel: cancel_waiter,
            reprioritize: reprioritize_waiter,
            waiter_handle,
        }));

        crate::coroutine::yield_now(signal::SUCCESS)
    }

    /// Re-evaluate every waiter's predicate, highest priority first, and
    /// wake (schedule an immediate wake for) every one that now holds.
    /// Propagates to subscriber guards. Returns whether anything was woken
    /// (by this guard or a subscriber).
    pub fn signal(&mut self) -> bool {
        let mut woke_any = false;
        for handle in self.waiters.sorted_handles() {
            let ready = match self.waiters.get(handle) {
                Some(w) => (w.predicate)(),
                None => continue,
            };
            if ready {
                let (_, waiter) = self
                    .waiters
                    .remove(handle)
                    .expect("handle observed present above");
                waiter.process.set_wait_token(None);
                process::schedule_wake(waiter.process, scheduler::time(), signal::SUCCESS);
                woke_any = true;
            }
        }
        for &sub in &self.subscribers {
            woke_any |= unsafe { (*sub).signal() };
        }
        woke_any
    }

    /// Make `self` an observer of `publisher`: whenever `publisher.signal()`
    /// runs, `self.signal()` also runs. Cycles are the caller's
    /// responsibility to avoid; this runtime does not detect them.
    pub fn subscribe(&mut self, publisher: &mut ResourceGuard) {
        let me = self as *mut ResourceGuard;
        if !publisher.subscribers.iter().any(|&s| s == me) {
            publisher.subscribers.push(me);
        }
    }

    pub fn unsubscribe(&mut self, publisher: &mut ResourceGuard) {
        let me = self as *mut ResourceGuard;
        publisher.subscribers.retain(|&s| s != me);
    }
}

unsafe fn cancel_waiter(guard: *mut (), handle: Handle) -> bool {
    let guard = &mut *(guard as *mut ResourceGuard);
    guard.waiters.remove(handle).is_some()
}

unsafe fn reprioritize_waiter(guard: *mut (), handle: Handle, new_priority: i64) {
    let guard = &mut *(guard as *mut ResourceGuard);
    guard.waiters.reprioritize(handle, -new_priority);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process as proc_mod;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn signal_wakes_only_ready_predicates_highest_priority_first() {
        scheduler::queue_initialize(0.0);
        let guard: Rc<Cell<*mut ResourceGuard>> = Rc::new(Cell::new(std::ptr::null_mut()));
        let mut g = ResourceGuard::new();
        guard.set(&mut g as *mut ResourceGuard);

        let order: Rc<std::cell::RefCell<Vec<i64>>> = Rc::new(std::cell::RefCell::new(Vec::new()));
        let level = Rc::new(Cell::new(0i64));

        let mk = |name: &'static str, prio: i64, threshold: i64| {
            let guard = guard.clone();
            let order = order.clone();
            let level = level.clone();
            proc_mod::create(name, prio, move |_| {
                let g = unsafe { &mut *guard.get() };
                let lvl = level.clone();
                g.wait(move || lvl.get() >= threshold);
                order.borrow_mut().push(prio);
                0
            })
        };

        let low = mk("low", 0, 1);
        let high = mk("high", 5, 1);
        proc_mod::start(low, 0);
        proc_mod::start(high, 0);

        level.set(1);
        g.signal();
        scheduler::queue_execute();

        assert_eq!(*order.borrow(), vec![5, 0]);
        proc_mod::destroy(low);
        proc_mod::destroy(high);
    }
}
