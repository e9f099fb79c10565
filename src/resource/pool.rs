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

//! Resource pool: a counting semaphore with partial acquisition, release,
//! and strict priority-based preemption.
//!
//! A pool is the one resource kind that shows up in a process's
//! held-resource list, since it's the only one with per-process holdings
//! that survive across suspension points. Its address is captured by
//! [`crate::process::ProcessHandle::add_held_resource`] the first time a
//! process acquires from it, so **a pool must not move once anything has
//! acquired from it** — allocate it with `Box` (or otherwise pin its
//! storage) and treat that as a standing invariant, the same way processes
//! and coroutines are heap-pinned elsewhere in this crate.

use std::collections::HashMap;

use crate::error::{contract, signal};
use crate::heap::{Handle, HashHeap};
use crate::process::{self, ProcessHandle};
use crate::resource::guard::ResourceGuard;
use crate::resource::Holdable;

#[derive(Clone, Copy, PartialEq, Eq)]
struct HolderKey {
    priority: i64,
    /// Negated per-pool entry sequence number: among equal priority, the
    /// most recently granted holder sorts first ("entry-order desc").
    neg_entry: i64,
}

impl Ord for HolderKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.neg_entry.cmp(&other.neg_entry))
    }
}
impl PartialOrd for HolderKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct HolderEntry {
    process: ProcessHandle,
    amount: u64,
}

pub struct ResourcePool {
    name: String,
    capacity: u64,
    in_use: u64,
    /// Ordered "most preemptable first": lowest priority, then latest entry.
    holders: HashHeap<HolderKey, HolderEntry>,
    by_process: HashMap<ProcessHandle, Handle>,
    next_entry: u64,
    front_guard: ResourceGuard,
}

impl ResourcePool {
    pub fn new(name: impl Into<String>, capacity: u64) -> ResourcePool {
        ResourcePool {
            name: name.into(),
            capacity,
            in_use: 0,
            holders: HashHeap::new(),
            by_process: HashMap::new(),
            next_entry: 0,
            front_guard: ResourceGuard::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn in_use(&self) -> u64 {
        self.in_use
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.in_use
    }

    pub fn holder_amount(&self, p: ProcessHandle) -> u64 {
        self.by_process
            .get(&p)
            .and_then(|&h| self.holders.get(h))
            .map(|e| e.amount)
            .unwrap_or(0)
    }

    fn grant(&mut self, p: ProcessHandle, amount: u64) {
        self.in_use += amount;
        if let Some(&h) = self.by_process.get(&p) {
            self.holders
                .get_mut(h)
                .expect("by_process handle must be live")
                .amount += amount;
        } else {
            let entry_seq = self.next_entry;
            self.next_entry += 1;
            let key = HolderKey {
                priority: p.priority(),
                neg_entry: -(entry_seq as i64),
            };
            let h = self.holders.push(key, HolderEntry { process: p, amount });
            self.by_process.insert(p, h);
            p.add_held_resource(self as *mut ResourcePool as *mut dyn Holdable);
        }
    }

    fn release_amount(&mut self, p: ProcessHandle, amount: u64) {
        let h = *self
            .by_process
            .get(&p)
            .expect("release() on a process with no holdings in this pool");
        let empty = {
            let entry = self.holders.get_mut(h).expect("holder handle must be live");
            contract!(
                entry.amount >= amount,
                "release {} exceeds held {}",
                amount,
                entry.amount
            );
            entry.amount -= amount;
            entry.amount == 0
        };
        self.in_use -= amount;
        if empty {
            self.holders.remove(h);
            self.by_process.remove(&p);
            p.remove_held_resource(self as *mut ResourcePool as *mut dyn Holdable);
        }
        self.front_guard.signal();
    }

    /// Greedily take `min(available, remaining)` at a time until satisfied,
    /// waiting on the front guard between rounds. On any interrupt the
    /// partial grant is rolled back and the caller gets nothing.
    pub fn acquire(&mut self, amount: u64) -> i64 {
        let me = process::current_process().expect("acquire() called outside any process");
        let mut remaining = amount;
        let mut granted = 0u64;
        loop {
            let take = self.available().min(remaining);
            if take > 0 {
                self.grant(me, take);
                granted += take;
                remaining -= take;
            }
            if remaining == 0 {
                return signal::SUCCESS;
            }
            let pool_ptr: *const ResourcePool = self;
            let sig = self
                .front_guard
                .wait(move || unsafe { (*pool_ptr).available() > 0 });
            if sig != signal::SUCCESS {
                if granted > 0 {
                    self.release_amount(me, granted);
                }
                return sig;
            }
        }
    }

    /// Like `acquire`, but first steals from holders with strictly lower
    /// priority (the front of the holders heap) until either `amount` fits
    /// or no such victim remains. Victims are signaled [`signal::PREEMPTED`]
    /// and their holdings returned to the pool.
    pub fn preempt(&mut self, amount: u64) -> i64 {
        let me = process::current_process().expect("preempt() called outside any process");
        while self.available() < amount {
            let victim_handle = match self.holders.peek_min_handle() {
                Some(h) => h,
                None => break,
            };
            let (victim, victim_priority, victim_amount) = {
                let entry = self.holders.get(victim_handle).expect("peeked handle is live");
                (entry.process, entry.process.priority(), entry.amount)
            };
            if victim_priority >= me.priority() {
                break;
            }
            self.holders.remove(victim_handle);
            self.by_process.remove(&victim);
            victim.remove_held_resource(self as *mut ResourcePool as *mut dyn Holdable);
            self.in_use -= victim_amount;
            process::interrupt(victim, signal::PREEMPTED);
        }
        self.acquire(amount)
    }

    /// Give back `amount` of the current process's holdings.
    pub fn release(&mut self, amount: u64) {
        let me = process::current_process().expect("release() called outside any process");
        self.release_amount(me, amount);
    }
}

impl Holdable for ResourcePool {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn drop_holder(&mut self, process: ProcessHandle) {
        if let Some(h) = self.by_process.remove(&process) {
            if let Some((_, entry)) = self.holders.remove(h) {
                self.in_use -= entry.amount;
            }
            self.front_guard.signal();
        }
    }

    fn reprioritize_holder(&mut self, process: ProcessHandle, new_priority: i64) {
        if let Some(&h) = self.by_process.get(&process) {
            if let Some(old) = self.holders.key(h).copied() {
                self.holders.reprioritize(
                    h,
                    HolderKey {
                        priority: new_priority,
                        neg_entry: old.neg_entry,
                    },
                );
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
    fn acquire_and_release_round_trip() {
        scheduler::queue_initialize(0.0);
        let mut pool = ResourcePool::new("p", 3);
        let pool_ptr: *mut ResourcePool = &mut pool;
        let result = Rc::new(RefCell::new(None));
        let result2 = result.clone();

        let p = process::create("a", 0, move |_| {
            let pool = unsafe { &mut *pool_ptr };
            let sig = pool.acquire(3);
            *result2.borrow_mut() = Some((sig, pool.in_use()));
            pool.release(3);
            0
        });
        process::start(p, 0);
        scheduler::queue_execute();

        assert_eq!(*result.borrow(), Some((signal::SUCCESS, 3)));
        assert_eq!(pool.in_use(), 0);
        process::destroy(p);
    }

    #[test]
    fn priority_preemption_scenario() {
        scheduler::queue_initialize(0.0);
        let mut pool = ResourcePool::new("p", 3);
        let pool_ptr: *mut ResourcePool = &mut pool;

        let a_result = Rc::new(RefCell::new(None));
        let a_result2 = a_result.clone();
        let a = process::create("a", 0, move |_| {
            let pool = unsafe { &mut *pool_ptr };
            let sig = pool.acquire(3);
            let r = process::hold(10.0);
            a_result2.borrow_mut().replace((sig, r, pool.holder_amount(process::current_process().unwrap())));
            0
        });
        process::start(a, 0);

        let b_result = Rc::new(RefCell::new(None));
        let b_result2 = b_result.clone();
        scheduler::schedule(1.0, 1, move || {
            let pool = unsafe { &mut *pool_ptr };
            let b = process::create("b", 1, move |_| {
                let pool = unsafe { &mut *pool_ptr };
                let sig = pool.preempt(2);
                b_result2.borrow_mut().replace((sig, pool.holder_amount(process::current_process().unwrap())));
                0
            });
            process::start(b, 0);
        });

        scheduler::queue_execute();

        assert_eq!(*b_result.borrow(), Some((signal::SUCCESS, 2)));
        // A's acquire already succeeded before t=1; it is the subsequent
        // `hold` that gets cut short, returning PREEMPTED, with its entire
        // holding (not just the 2 B needed) evicted back to the pool.
        assert_eq!(*a_result.borrow(), Some((signal::SUCCESS, signal::PREEMPTED, 0)));
        assert_eq!(pool.in_use(), 2);
    }
}
