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

//! Bounded priority queue: `put` carries a caller-supplied priority and
//! returns a handle the caller can later `cancel` or `reprioritize`; `get`
//! dequeues the highest-priority object (FIFO among ties, via the backing
//! [`HashHeap`]'s insertion-order tiebreak).

use crate::error::signal;
use crate::heap::{Handle, HashHeap};
use crate::process;
use crate::resource::guard::ResourceGuard;
use crate::resource::UNLIMITED;
use crate::timeseries::Timeseries;

/// Max-heap ordering over a caller-supplied priority: negate it so the
/// min-heap underneath surfaces the highest priority first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct NegPriority(i64);

pub struct PriorityQueue<T> {
    name: String,
    capacity: u64,
    items: HashHeap<NegPriority, T>,
    front_guard: ResourceGuard,
    rear_guard: ResourceGuard,
    history: Timeseries,
    is_recording: bool,
}

impl<T> PriorityQueue<T> {
    pub fn new(name: impl Into<String>, capacity: u64) -> PriorityQueue<T> {
        PriorityQueue {
            name: name.into(),
            capacity,
            items: HashHeap::new(),
            front_guard: ResourceGuard::new(),
            rear_guard: ResourceGuard::new(),
            history: Timeseries::new(),
            is_recording: false,
        }
    }

    pub fn unlimited(name: impl Into<String>) -> PriorityQueue<T> {
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

    /// Dequeue the highest-priority object, waiting if the queue is empty.
    pub fn get(&mut self) -> (Option<T>, i64) {
        loop {
            if let Some((_, item)) = self.items.pop_min() {
                self.record();
                self.rear_guard.signal();
                return (Some(item), signal::SUCCESS);
            }
            let self_ptr: *const PriorityQueue<T> = self;
            let sig = self
                .front_guard
                .wait(move || unsafe { (*self_ptr).level() > 0 });
            if sig != signal::SUCCESS {
                return (None, sig);
            }
        }
    }

    /// Enqueue `object` at `priority`, waiting if the queue is full. Returns
    /// the handle for later `cancel`/`reprioritize` together with the
    /// signal (object is handed back untouched on interrupt, same as the
    /// object queue's `put`).
    pub fn put(&mut self, object: T, priority: i64) -> (Option<Handle>, Option<T>, i64) {
        let mut object = Some(object);
        loop {
            if self.level() < self.capacity {
                let h = self
                    .items
                    .push(NegPriority(-priority), object.take().expect("object present"));
                self.record();
                self.front_guard.signal();
                return (Some(h), None, signal::SUCCESS);
            }
            let self_ptr: *const PriorityQueue<T> = self;
            let sig = self
                .rear_guard
                .wait(move || unsafe { (*self_ptr).level() < (*self_ptr).capacity });
            if sig != signal::SUCCESS {
                return (None, object, sig);
            }
        }
    }

    /// Remove a still-queued item before it is ever `get`. Returns `false`
    /// if `handle` has already been dequeued or never existed.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        let removed = self.items.remove(handle).is_some();
        if removed {
            self.record();
            self.rear_guard.signal();
        }
        removed
    }

    /// Change a still-queued item's priority in place.
    pub fn reprioritize(&mut self, handle: Handle, new_priority: i64) -> bool {
        self.items.reprioritize(handle, NegPriority(-new_priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn get_dequeues_highest_priority_first() {
        scheduler::queue_initialize(0.0);
        let mut q: PriorityQueue<&str> = PriorityQueue::new("q", 10);
        q.put("low", 0);
        q.put("high", 5);
        q.put("mid", 2);

        assert_eq!(q.get().0, Some("high"));
        assert_eq!(q.get().0, Some("mid"));
        assert_eq!(q.get().0, Some("low"));
    }

    #[test]
    fn cancel_removes_before_get_and_unblocks_a_waiting_putter() {
        scheduler::queue_initialize(0.0);
        let mut q: PriorityQueue<i64> = PriorityQueue::new("q", 1);
        let q_ptr: *mut PriorityQueue<i64> = &mut q;
        let (h, _, sig) = q.put(1, 0);
        assert_eq!(sig, signal::SUCCESS);

        let put_result = Rc::new(RefCell::new(None));
        let put_result2 = put_result.clone();
        let putter = process::create("putter", 0, move |_| {
            let q = unsafe { &mut *q_ptr };
            let (_, _, sig) = q.put(2, 0);
            *put_result2.borrow_mut() = Some(sig);
            0
        });
        process::start(putter, 0);

        assert!(q.cancel(h.unwrap()));
        scheduler::queue_execute();

        assert_eq!(*put_result.borrow(), Some(signal::SUCCESS));
        assert_eq!(q.level(), 1);
        process::destroy(putter);
    }
}
