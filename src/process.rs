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

//! Processes: a coroutine plus priority, lifecycle state, and the
//! bookkeeping needed to hold, wait, be interrupted, and be killed.
//!
//! A process owns its coroutine exclusively. Like [`crate::coroutine`],
//! ownership is manual: [`create`] leaks a `Box<Process>` into a raw
//! pointer and [`destroy`] reclaims it, mirroring the create/destroy
//! pairing used throughout this crate's data model rather than reaching
//! for `Rc`, since resources and the scheduler both need to hold bare
//! back-references to a process without sharing ownership of it.

use std::any::Any;
use std::cell::Cell;

use crate::coroutine::{self, Coroutine, CoroutineRef};
use crate::error::{contract, signal};
use crate::resource::Holdable;
use crate::scheduler;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProcessState {
    Created,
    Ready,
    Running,
    Waiting,
    Finished,
}

/// Where a waiting process is parked, so `interrupt` can evict it in O(log
/// n) without the guard knowing about processes at all.
pub struct WaitToken {
    pub guard: *mut (),
    pub cancel: unsafe fn(*mut (), crate::heap::Handle) -> bool,
    pub reprioritize: unsafe fn(*mut (), crate::heap::Handle, i64),
    pub waiter_handle: crate::heap::Handle,
}

struct Process {
    name: String,
    coroutine: Coroutine,
    priority: Cell<i64>,
    state: Cell<ProcessState>,
    held_resources: Vec<*mut dyn Holdable>,
    pending_appointment: Cell<Option<scheduler::Handle>>,
    wait_token: Cell<Option<WaitToken>>,
    context: Option<Box<dyn Any>>,
}

/// A `Copy` reference to a process. Valid until the process is
/// [`destroy`]ed; using it afterward is a contract violation (use-after-free
/// at the application level, not memory-unsafety — the slot is simply gone).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(*mut Process);

impl ProcessHandle {
    fn inner(&self) -> &Process {
        unsafe { &*self.0 }
    }

    pub fn name(&self) -> &str {
        &self.inner().name
    }

    pub fn priority(&self) -> i64 {
        self.inner().priority.get()
    }

    pub fn state(&self) -> ProcessState {
        self.inner().state.get()
    }

    pub fn context<T: 'static>(&self) -> Option<&T> {
        self.inner().context.as_deref().and_then(|c| c.downcast_ref())
    }

    pub fn set_context<T: 'static>(&self, value: T) {
        let inner = unsafe { &mut *self.0 };
        inner.context = Some(Box::new(value));
    }

    pub(crate) fn add_held_resource(&self, r: *mut dyn Holdable) {
        let inner = unsafe { &mut *self.0 };
        if !inner.held_resources.iter().any(|h| std::ptr::eq(*h, r)) {
            inner.held_resources.push(r);
        }
    }

    pub(crate) fn remove_held_resource(&self, r: *mut dyn Holdable) {
        let inner = unsafe { &mut *self.0 };
        inner.held_resources.retain(|h| !std::ptr::eq(*h, r));
    }

    pub(crate) fn set_pending_appointment(&self, handle: Option<scheduler::Handle>) {
        self.inner().pending_appointment.set(handle);
    }

    pub(crate) fn take_pending_appointment(&self) -> Option<scheduler::Handle> {
        self.inner().pending_appointment.take()
    }

    pub(crate) fn set_wait_token(&self, token: Option<WaitToken>) {
        self.inner().wait_token.set(token);
    }

    pub(crate) fn take_wait_token(&self) -> Option<WaitToken> {
        self.inner().wait_token.take()
    }

    pub(crate) fn set_state(&self, s: ProcessState) {
        self.inner().state.set(s);
    }

    fn handle(&self) -> CoroutineRef {
        self.inner().coroutine.handle()
    }
}

/// Create a process. `entry` runs once [`start`] is called; it receives the
/// message `start` was called with and its return value becomes the
/// process's exit signal.
pub fn create<F>(name: impl Into<String>, priority: i64, entry: F) -> ProcessHandle
where
    F: FnOnce(i64) -> i64 + 'static,
{
    let name = name.into();
    let boxed = Box::new(Process {
        name: name.clone(),
        coroutine: coroutine::create(entry, Some(name), crate::stack::DEFAULT_STACK_SIZE),
        priority: Cell::new(priority),
        state: Cell::new(ProcessState::Created),
        held_resources: Vec::new(),
        pending_appointment: Cell::new(None),
        wait_token: Cell::new(None),
        context: None,
    });
    let handle = ProcessHandle(Box::into_raw(boxed));
    handle.handle().set_context(handle);
    handle
}

/// The process whose coroutine is currently executing, or `None` if the
/// scheduler itself (not any process) is running.
pub fn current_process() -> Option<ProcessHandle> {
    coroutine::current().get_context::<ProcessHandle>().copied()
}

/// First resume of a newly created process.
pub fn start(p: ProcessHandle, msg: i64) -> i64 {
    contract!(
        p.state() == ProcessState::Created,
        "start() called on a process that is not Created"
    );
    p.inner().state.set(ProcessState::Running);
    let result = coroutine::start(&p.inner().coroutine, msg);
    settle_state_after_switch(p);
    result
}

/// Resume a process that is currently suspended mid-run.
pub(crate) fn resume(p: ProcessHandle, msg: i64) -> i64 {
    contract!(
        p.state() != ProcessState::Finished,
        "resume() called on a Finished process"
    );
    p.inner().state.set(ProcessState::Running);
    let result = coroutine::resume(&p.inner().coroutine, msg);
    settle_state_after_switch(p);
    result
}

/// After switching into a process's coroutine and getting control back,
/// check whether the entry function ran to completion instead of
/// suspending, and if so finish the process the same way `stop` would
/// (minus the redundant unwind, since the coroutine already exited on its
/// own). Shared by `start`/`resume`/`wake`.
fn settle_state_after_switch(p: ProcessHandle) {
    if p.handle().status() != coroutine::Status::Finished {
        return;
    }
    if let Some(appt) = p.take_pending_appointment() {
        scheduler::cancel(appt);
    }
    if let Some(token) = p.take_wait_token() {
        unsafe { (token.cancel)(token.guard, token.waiter_handle) };
    }
    let inner = unsafe { &mut *p.0 };
    for res in std::mem::take(&mut inner.held_resources) {
        unsafe { (*res).drop_holder(p) };
    }
    inner.state.set(ProcessState::Finished);
}

/// Schedule a wake-up for `p` at `at_time` delivering `signal`, recording it
/// as the process's pending appointment so `interrupt`/`stop` can cancel it.
/// Shared by `hold`'s self-wake and by guard `signal`/`interrupt`'s
/// immediate wake.
pub(crate) fn schedule_wake(p: ProcessHandle, at_time: f64, signal: i64) {
    let appt = scheduler::schedule(at_time, p.priority(), move || {
        p.set_pending_appointment(None);
        wake(p, signal);
    });
    p.set_pending_appointment(Some(appt));
}

/// Suspend the running process until `t + dt`, then return control to the
/// scheduler. Returns [`signal::SUCCESS`] on a normal wake, or an interrupt
/// signal if [`interrupt`] fired first.
pub fn hold(dt: f64) -> i64 {
    let me = current_process().expect("hold() called outside any process");
    contract!(dt >= 0.0, "hold() with negative dt {}", dt);

    let t = scheduler::time();
    me.set_state(ProcessState::Waiting);
    schedule_wake(me, t + dt, signal::SUCCESS);

    let result = coroutine::yield_now(signal::SUCCESS);
    me.set_state(ProcessState::Running);
    result
}

/// Transfer control into `p`, running it until it next suspends. Used by
/// appointment handlers (hold wake-ups, guard signals) to hand control to a
/// specific process rather than through `resume`'s "must already be
/// Running" contract.
pub(crate) fn wake(p: ProcessHandle, signal: i64) {
    match p.state() {
        ProcessState::Created => {
            p.inner().state.set(ProcessState::Running);
            let _ = coroutine::start(&p.inner().coroutine, signal);
            settle_state_after_switch(p);
        }
        ProcessState::Waiting | ProcessState::Ready => {
            p.inner().state.set(ProcessState::Running);
            let _ = coroutine::transfer(p.handle(), signal);
            settle_state_after_switch(p);
        }
        ProcessState::Running => {
            contract!(false, "wake() called on a process that is already Running");
        }
        ProcessState::Finished => {}
    }
}

/// Cancel whatever `p` is suspended on and deliver `signal` as the return
/// value of its suspending call, as soon as the scheduler next runs it.
pub fn interrupt(p: ProcessHandle, signal: i64) {
    if p.state() != ProcessState::Waiting {
        return;
    }
    if let Some(appt) = p.take_pending_appointment() {
        scheduler::cancel(appt);
    }
    if let Some(token) = p.take_wait_token() {
        unsafe { (token.cancel)(token.guard, token.waiter_handle) };
    }
    schedule_wake(p, scheduler::time(), signal);
}

/// Stop `p`: walk its held-resource list invoking each resource's
/// drop-on-kill hook, cancel any pending appointment/wait, force-unwind its
/// coroutine (running `Drop` glue), and mark it `Finished`.
pub fn stop(p: ProcessHandle, retval: i64) {
    if p.state() == ProcessState::Finished {
        return;
    }
    if let Some(appt) = p.take_pending_appointment() {
        scheduler::cancel(appt);
    }
    if let Some(token) = p.take_wait_token() {
        unsafe { (token.cancel)(token.guard, token.waiter_handle) };
    }
    let inner = unsafe { &mut *p.0 };
    for res in std::mem::take(&mut inner.held_resources) {
        unsafe { (*res).drop_holder(p) };
    }
    coroutine::stop(&mut inner.coroutine, retval);
    inner.state.set(ProcessState::Finished);
}

/// Alias for `stop` with the process's own current exit intent of 0; kept
/// distinct from `stop` since they're independent lifecycle points (stop
/// from another process vs. the replication tearing everything down).
pub fn terminate(p: ProcessHandle) {
    stop(p, signal::SUCCESS);
}

/// Reclaim a `Finished` (or not-yet-started) process's storage.
pub fn destroy(p: ProcessHandle) {
    contract!(
        p.state() == ProcessState::Finished || p.state() == ProcessState::Created,
        "destroy() called on a process that is still running or waiting"
    );
    unsafe {
        drop(Box::from_raw(p.0));
    }
}

/// Re-sort `p` in every guard queue it is currently waiting on and in every
/// holder structure of every resource it currently holds.
pub fn reprioritize(p: ProcessHandle, new_priority: i64) {
    p.inner().priority.set(new_priority);

    if let Some(token) = p.inner().wait_token.take() {
        unsafe { (token.reprioritize)(token.guard, token.waiter_handle, new_priority) };
        p.inner().wait_token.set(Some(token));
    }

    let inner = unsafe { &mut *p.0 };
    for res in &inner.held_resources {
        unsafe { (**res).reprioritize_holder(p, new_priority) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc;

    #[test]
    fn hold_suspends_and_wakes_at_the_right_time() {
        scheduler::queue_initialize(0.0);
        let log: Rc<StdRefCell<Vec<f64>>> = Rc::new(StdRefCell::new(Vec::new()));
        let log2 = log.clone();

        let p = create("worker", 0, move |_| {
            log2.borrow_mut().push(scheduler::time());
            let r = hold(5.0);
            log2.borrow_mut().push(scheduler::time());
            r
        });
        start(p, 0);
        scheduler::queue_execute();

        assert_eq!(*log.borrow(), vec![0.0, 5.0]);
        assert_eq!(p.state(), ProcessState::Finished);
        destroy(p);
    }

    #[test]
    fn interrupt_wakes_a_held_process_early_with_its_signal() {
        scheduler::queue_initialize(0.0);
        let log: Rc<StdRefCell<Vec<i64>>> = Rc::new(StdRefCell::new(Vec::new()));
        let log2 = log.clone();

        let p = create("worker", 0, move |_| {
            let r = hold(100.0);
            log2.borrow_mut().push(r);
            r
        });
        start(p, 0);

        scheduler::schedule(1.0, 0, move || {
            interrupt(p, 42);
        });
        scheduler::queue_execute();

        assert_eq!(*log.borrow(), vec![42]);
        destroy(p);
    }
}
