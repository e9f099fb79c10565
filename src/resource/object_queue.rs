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

//! Bounded FIFO object queue: `front_guard` holds getters waiting on an
//! empty queue, `rear_guard` holds putters waiting on a full one.
//!
//! The source keeps queued items as a singly-linked chain of fixed-size
//! tags drawn from a thread-local pool; a `VecDeque` is the idiomatic
//! replacement for that chain here, since nothing outside this module ever
//! observes tag identity.

use crate::error::signal;
use crate::process;
use crate::resource::guard::ResourceGuard;
use crate::resource::UNLIMITED;
use crate::timeseries::Timeseries;
use std::collections::VecDeque;

pub struct ObjectQueue<T> {
    name: String,
    capacity: u64,
    items: VecDeque<T>,
    front_guard: ResourceGuard,
    rear_guard: ResourceGuard,
    history: Timeseries,
    is_recording: bool,
}

impl<T> ObjectQueue<T> {
    pub fn new(name: impl Into<String>, capacity: u64) -> ObjectQueue<T> {
        ObjectQueue {
            name: name.into(),
            capacity,
            items: VecDeque::new(),
            front_guard: ResourceGuard::new(),
            rear_guard: ResourceGuard::new(),
            history: Timeseries::new(),
            is_recording: false,
        }
    }

    pub fn unlimited(name: impl Into<String>) -> ObjectQueue<T> {
        Self::new(name, UNLIMITED)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn level(&self) -> u64 {
        self.items.len() as u64
    }

    pub fn recording_start(&mut self) {
        self.is_recording = true;
    }

    pub fn recording_stop(&mut self) {
        self.is_recording = false;
    }

    pub fn history(&self) -> &Timeseries {
        &self.history
    }

    fn record(&mut self) {
        if self.is_recording {
            let level = self.level() as f64;
            self.history.record(crate::scheduler::time(), level);
        }
    }

    /// Remove and return the head object, waiting if the queue is empty.
    /// Returns `(None, signal)` on interrupt; the object never existed to
    /// hand back in that case, matching the source's `NULL` return.
    pub fn get(&mut self) -> (Option<T>, i64) {
        loop {
            if let Some(item) = self.items.pop_front() {
                self.record();
                self.rear_guard.signal();
                return (Some(item), signal::SUCCESS);
            }
            let self_ptr: *const ObjectQueue<T> = self;
            let sig = self
                .front_guard
                .wait(move || unsafe { (*self_ptr).level() > 0 });
            if sig != signal::SUCCESS {
                return (None, sig);
            }
        }
    }

    /// Append `object`, waiting if the queue is at capacity. On interrupt
    /// the object is handed back to the caller untouched.
    pub fn put(&mut self, object: T) -> (Option<T>, i64) {
        let mut object = Some(object);
        loop {
            if self.level() < self.capacity {
                self.items.push_back(object.take().expect("object present on fast path"));
                self.record();
                self.front_guard.signal();
                return (None, signal::SUCCESS);
            }
            let self_ptr: *const ObjectQueue<T> = self;
            let sig = self
                .rear_guard
                .wait(move || unsafe { (*self_ptr).level() < (*self_ptr).capacity });
            if sig != signal::SUCCESS {
                return (object, sig);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fifo_order_and_capacity_blocking() {
        scheduler::queue_initialize(0.0);
        let mut q: ObjectQueue<i64> = ObjectQueue::new("q", 2);
        let q_ptr: *mut ObjectQueue<i64> = &mut q;

        let got = Rc::new(RefCell::new(Vec::new()));
        let got2 = got.clone();
        let getter = process::create("getter", 0, move |_| {
            let q = unsafe { &mut *q_ptr };
            let (a, _) = q.get();
            let (b, _) = q.get();
            let (c, _) = q.get();
            got2.borrow_mut().extend([a, b, c]);
            0
        });
        process::start(getter, 0);

        let putter = process::create("putter", 0, move |_| {
            let q = unsafe { &mut *q_ptr };
            q.put(1);
            q.put(2);
            q.put(3);
            0
        });
        process::start(putter, 0);
        scheduler::queue_execute();

        assert_eq!(*got.borrow(), vec![Some(1), Some(2), Some(3)]);
        assert_eq!(q.level(), 0);
    }

    #[test]
    fn interrupted_get_returns_none_and_put_keeps_the_object() {
        scheduler::queue_initialize(0.0);
        let mut q: ObjectQueue<i64> = ObjectQueue::new("q", 1);
        let q_ptr: *mut ObjectQueue<i64> = &mut q;

        let result = Rc::new(RefCell::new(None));
        let result2 = result.clone();
        let getter = process::create("getter", 0, move |_| {
            let q = unsafe { &mut *q_ptr };
            let (obj, sig) = q.get();
            *result2.borrow_mut() = Some((obj, sig));
            0
        });
        process::start(getter, 0);
        scheduler::schedule(1.0, 0, move || {
            process::interrupt(getter, 99);
        });
        scheduler::queue_execute();

        assert_eq!(*result.borrow(), Some((None, 99)));
        process::destroy(getter);
    }
}
