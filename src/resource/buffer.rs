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

//! Two-ended amount buffer: `get`/`put` move a quantity rather than an
//! object, fulfilled greedily across as many wait rounds as it takes. An
//! interrupt mid-transfer leaves the caller with exactly the amount already
//! obtained (get) or not yet accepted (put), surfaced as a return value
//! rather than through a caller-owned out-parameter.

use crate::error::signal;
use crate::process;
use crate::resource::guard::ResourceGuard;
use crate::resource::UNLIMITED;
use crate::timeseries::Timeseries;

pub struct Buffer {
    name: String,
    capacity: u64,
    level: u64,
    front_guard: ResourceGuard,
    rear_guard: ResourceGuard,
    history: Timeseries,
    is_recording: bool,
}

/// Outcome of a `get`/`put`: the signal the suspending wait returned
/// (`SUCCESS` once the full amount cleared, or an interrupt code if a wait
/// round was cut short), and `remaining` — the portion of the original
/// request left outstanding. Zero on success; on interrupt, the delta the
/// caller still needs to obtain (get) or still has left to hand over (put),
/// mirroring the source's caller-owned `*amount` out-parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub remaining: u64,
    pub signal: i64,
}

impl Buffer {
    pub fn new(name: impl Into<String>, capacity: u64) -> Buffer {
        Buffer {
            name: name.into(),
            capacity,
            level: 0,
            front_guard: ResourceGuard::new(),
            rear_guard: ResourceGuard::new(),
            history: Timeseries::new(),
            is_recording: false,
        }
    }

    pub fn unlimited(name: impl Into<String>) -> Buffer {
        Self::new(name, UNLIMITED)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn level(&self) -> u64 {
        self.level
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
            let level = self.level as f64;
            self.history.record(crate::scheduler::time(), level);
        }
    }

    /// Drain up to `amount` from the buffer, waiting for more to be `put`
    /// when it runs dry. Stops early on interrupt, reporting however much
    /// was drained before that happened.
    pub fn get(&mut self, amount: u64) -> Transfer {
        let mut remaining = amount;
        loop {
            let take = self.level.min(remaining);
            if take > 0 {
                self.level -= take;
                remaining -= take;
                self.record();
                self.rear_guard.signal();
            }
            if remaining == 0 {
                return Transfer { remaining: 0, signal: signal::SUCCESS };
            }
            let self_ptr: *const Buffer = self;
            let sig = self
                .front_guard
                .wait(move || unsafe { (*self_ptr).level() > 0 });
            if sig != signal::SUCCESS {
                return Transfer { remaining, signal: sig };
            }
        }
    }

    /// Add up to `amount` to the buffer, waiting for room when it's full.
    /// Stops early on interrupt, reporting however much is still unaccepted.
    pub fn put(&mut self, amount: u64) -> Transfer {
        let mut remaining = amount;
        loop {
            let room = self.capacity - self.level;
            let give = room.min(remaining);
            if give > 0 {
                self.level += give;
                remaining -= give;
                self.record();
                self.front_guard.signal();
            }
            if remaining == 0 {
                return Transfer { remaining: 0, signal: signal::SUCCESS };
            }
            let self_ptr: *const Buffer = self;
            let sig = self
                .rear_guard
                .wait(move || unsafe { (*self_ptr).level() < (*self_ptr).capacity() });
            if sig != signal::SUCCESS {
                return Transfer { remaining, signal: sig };
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
    fn get_and_put_move_the_full_amount_when_uninterrupted() {
        scheduler::queue_initialize(0.0);
        let mut buf = Buffer::new("b", 100);
        assert_eq!(buf.put(40), Transfer { remaining: 0, signal: signal::SUCCESS });
        assert_eq!(buf.get(40), Transfer { remaining: 0, signal: signal::SUCCESS });
        assert_eq!(buf.level(), 0);
    }

    #[test]
    fn interrupt_partial_buffer_get() {
        scheduler::queue_initialize(0.0);
        let mut buf = Buffer::new("b", 100);
        buf.put(40);
        let buf_ptr: *mut Buffer = &mut buf;

        let result = Rc::new(RefCell::new(None));
        let result2 = result.clone();
        let getter = process::create("getter", 0, move |_| {
            let buf = unsafe { &mut *buf_ptr };
            let r = buf.get(70);
            *result2.borrow_mut() = Some(r);
            0
        });
        process::start(getter, 0);

        scheduler::schedule(1.0, 0, move || {
            process::interrupt(getter, 7);
        });
        scheduler::queue_execute();

        assert_eq!(*result.borrow(), Some(Transfer { remaining: 30, signal: 7 }));
        process::destroy(getter);
    }
}
