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

//! Condition: a named guard with no resource semantics of its own. Every
//! `wait` carries its own predicate; `signal` just re-evaluates waiters and
//! wakes whichever now return true, same as the base guard. Useful for
//! gluing together state that doesn't fit the pool/queue/buffer shapes, and
//! as an observer of another resource's guard.

use crate::resource::guard::ResourceGuard;

pub struct Condition {
    name: String,
    guard: ResourceGuard,
}

impl Condition {
    pub fn new(name: impl Into<String>) -> Condition {
        Condition {
            name: name.into(),
            guard: ResourceGuard::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guard(&mut self) -> &mut ResourceGuard {
        &mut self.guard
    }

    /// Suspend until `predicate` holds (re-checked on every `signal`).
    pub fn wait<F>(&mut self, predicate: F) -> i64
    where
        F: Fn() -> bool + 'static,
    {
        self.guard.wait(predicate)
    }

    /// Wake every waiter whose predicate currently holds.
    pub fn signal(&mut self) -> bool {
        self.guard.signal()
    }

    pub fn subscribe_to(&mut self, publisher: &mut ResourceGuard) {
        self.guard.subscribe(publisher);
    }

    pub fn unsubscribe_from(&mut self, publisher: &mut ResourceGuard) {
        self.guard.unsubscribe(publisher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process;
    use crate::scheduler;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn observer_chain_wakes_only_matching_waiters() {
        scheduler::queue_initialize(0.0);

        let mut condition = Condition::new("c");
        let mut upstream = ResourceGuard::new();
        condition.subscribe_to(&mut upstream);

        let cond_ptr: *mut Condition = &mut condition;
        let level = Rc::new(Cell::new(0));
        let woke: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let woke_a = woke.clone();
        let level_a = level.clone();
        let a = process::create("a", 0, move |_| {
            let c = unsafe { &mut *cond_ptr };
            let level = level_a.clone();
            c.wait(move || level.get() >= 5);
            woke_a.borrow_mut().push("a");
            0
        });
        let woke_b = woke.clone();
        let level_b = level.clone();
        let b = process::create("b", 0, move |_| {
            let c = unsafe { &mut *cond_ptr };
            let level = level_b.clone();
            c.wait(move || level.get() >= 100);
            woke_b.borrow_mut().push("b");
            0
        });
        process::start(a, 0);
        process::start(b, 0);

        level.set(5);
        upstream.signal();
        scheduler::queue_execute();

        assert_eq!(*woke.borrow(), vec!["a"]);
        process::destroy(a);
        // b is still waiting on its predicate; stop it before reclaiming.
        process::stop(b, 0);
        process::destroy(b);
    }
}
