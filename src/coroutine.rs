// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Stackful coroutine substrate.
//!
//! A [`Coroutine`] is a stack plus a saved CPU register context. Messages
//! passed across a switch are a single `i64`, mirroring the signal values
//! that flow through the rest of this crate (see [`crate::error::signal`]);
//! richer per-process state lives in the `context` payload (a `Box<dyn
//! Any>` slot) rather than in the switch message itself.
//!
//! `parent` is whoever first `start`ed this coroutine — where control flows
//! if its entry function returns. `caller` is whoever last `resume`d or
//! `transfer`ed into it — where [`yield_now`] returns to. The two coincide
//! until something other than the parent resumes the coroutine directly
//! (as the scheduler does for a process that was `transfer`-woken).

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use context::{Context, Transfer};

use crate::error::contract;
use crate::stack::{Stack, StackPool, DEFAULT_STACK_SIZE};

/// Lifecycle of a coroutine. Distinct from (and coarser than) a
/// [`crate::process::ProcessState`]: a process layered on top of a
/// `Running` coroutine may additionally be `Ready` or `Waiting`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Created,
    Running,
    Finished,
}

/// Thrown inside a coroutine's own stack to force it to unwind — the
/// mechanism behind [`stop`]. Never allowed to escape `catch_unwind`.
struct ForceUnwind;

struct Inner {
    /// How someone else resumes us. `None` while we are the one executing.
    self_ctx: Option<Context>,
    /// How we get back to our caller. `None` until we've been entered once.
    return_ctx: Option<Context>,
    stack: Option<Stack>,
    status: Status,
    want_unwind: bool,
    parent: *mut Inner,
    caller: *mut Inner,
    name: Option<String>,
    payload: Option<Box<dyn Any>>,
    exit_value: Option<i64>,
    entry: Option<Box<dyn FnOnce(i64) -> i64>>,
}

thread_local! {
    static STACKS: std::cell::RefCell<StackPool> = std::cell::RefCell::new(StackPool::new());
    static CURRENT: Cell<*mut Inner> = Cell::new(ptr::null_mut());
    static MAIN: std::cell::RefCell<Option<Box<Inner>>> = std::cell::RefCell::new(None);
}

fn main_ptr() -> *mut Inner {
    MAIN.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            let mut inner = Box::new(Inner {
                self_ctx: None,
                return_ctx: None,
                stack: None,
                status: Status::Running,
                want_unwind: false,
                parent: ptr::null_mut(),
                caller: ptr::null_mut(),
                name: Some("<main>".to_string()),
                payload: None,
                exit_value: None,
                entry: None,
            });
            let p: *mut Inner = &mut *inner;
            inner.parent = p;
            inner.caller = p;
            *slot = Some(inner);
        }
        slot.as_mut().map(|b| &mut **b as *mut Inner).unwrap()
    })
}

fn current_ptr() -> *mut Inner {
    CURRENT.with(|c| {
        if c.get().is_null() {
            c.set(main_ptr());
        }
        c.get()
    })
}

/// A lightweight, `Copy` reference to a live coroutine. Does not own it —
/// compare to a raw handle into the owning [`Coroutine`] value.
#[derive(Clone, Copy)]
pub struct CoroutineRef(*mut Inner);

impl CoroutineRef {
    pub fn status(&self) -> Status {
        unsafe { (*self.0).status }
    }

    pub fn name(&self) -> Option<&str> {
        unsafe { (*self.0).name.as_deref() }
    }

    pub fn get_context<T: 'static>(&self) -> Option<&T> {
        unsafe { (*self.0).payload.as_deref().and_then(|p| p.downcast_ref()) }
    }

    pub fn set_context<T: 'static>(&self, value: T) {
        unsafe { (*self.0).payload = Some(Box::new(value)) };
    }

    pub fn get_exit_value(&self) -> Option<i64> {
        unsafe { (*self.0).exit_value }
    }

    pub fn is_main(&self) -> bool {
        self.0 == main_ptr()
    }
}

impl PartialEq for CoroutineRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for CoroutineRef {}

/// An owned, stackful coroutine. Dropping it forcibly unwinds it (if still
/// running) and returns its stack to the thread-local pool.
pub struct Coroutine(Box<Inner>);

extern "C" fn trampoline(t: Transfer) -> ! {
    let me_ptr = current_ptr();
    unsafe {
        (*me_ptr).return_ctx = Some(t.context);
        (*me_ptr).status = Status::Running;
        let entry = (*me_ptr)
            .entry
            .take()
            .expect("coroutine trampoline entered more than once");
        let initial = t.data as i64;

        let result = panic::catch_unwind(AssertUnwindSafe(|| entry(initial)));
        (*me_ptr).status = Status::Finished;

        let exit_val = match result {
            Ok(v) => v,
            Err(payload) => {
                if payload.downcast_ref::<ForceUnwind>().is_none() {
                    let err = match payload.downcast_ref::<crate::error::Error>() {
                        Some(crate::error::Error::Contract(m)) => {
                            crate::error::Error::Contract(m.clone())
                        }
                        Some(crate::error::Error::Panicked(m)) => {
                            crate::error::Error::Panicked(m.clone())
                        }
                        None => crate::error::Error::Panicked(describe_panic(&payload)),
                    };
                    log::error!(
                        "process '{}' aborted: {}",
                        (*me_ptr).name.as_deref().unwrap_or("<unnamed>"),
                        err
                    );
                }
                0
            }
        };
        (*me_ptr).exit_value = Some(exit_val);

        // Cooperative termination: repeatedly hand control back to whoever
        // last resumed us. Transferring into us again from here on is the
        // fatal "resumed a Finished coroutine" case, caught by `transfer`'s
        // contract check before it would ever reach us.
        loop {
            let ret_ctx = (*me_ptr)
                .return_ctx
                .take()
                .expect("finished coroutine has no caller to exit into");
            let t = ret_ctx.resume(exit_val as usize);
            (*me_ptr).return_ctx = Some(t.context);
        }
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Low-level engine behind `start`/`resume`/`transfer`: switch execution
/// into `target`, recording it as our callee's caller, and block (in the
/// cooperative sense) until it switches back.
fn switch(target: *mut Inner, msg: i64) -> i64 {
    let prev = current_ptr();
    unsafe {
        (*target).caller = prev;
        if (*target).parent.is_null() {
            (*target).parent = prev;
        }
        CURRENT.with(|c| c.set(target));
        let ctx = (*target)
            .self_ctx
            .take()
            .expect("transfer into a coroutine that is not suspended");
        let t = ctx.resume(msg as usize);
        (*target).self_ctx = Some(t.context);
        CURRENT.with(|c| c.set(prev));
        t.data as i64
    }
}

/// Create a coroutine. `entry` runs on the new stack once [`start`] is
/// called; its return value becomes the coroutine's [`get_exit_value`].
pub fn create<F>(entry: F, name: Option<String>, stack_size: usize) -> Coroutine
where
    F: FnOnce(i64) -> i64 + 'static,
{
    let stack_size = if stack_size == 0 { DEFAULT_STACK_SIZE } else { stack_size };
    let stack = STACKS.with(|pool| pool.borrow_mut().take_stack(stack_size));
    let ctx = unsafe { Context::new(&stack, trampoline) };

    let inner = Box::new(Inner {
        self_ctx: Some(ctx),
        return_ctx: None,
        stack: Some(stack),
        status: Status::Created,
        want_unwind: false,
        parent: ptr::null_mut(),
        caller: ptr::null_mut(),
        name,
        payload: None,
        exit_value: None,
        entry: Some(Box::new(entry)),
    });

    Coroutine(inner)
}

impl Coroutine {
    pub fn handle(&self) -> CoroutineRef {
        CoroutineRef(self.0.as_ref() as *const Inner as *mut Inner)
    }

    pub fn status(&self) -> Status {
        self.0.status
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn get_context<T: 'static>(&self) -> Option<&T> {
        self.0.payload.as_deref().and_then(|p| p.downcast_ref())
    }

    pub fn set_context<T: 'static>(&mut self, value: T) {
        self.0.payload = Some(Box::new(value));
    }

    pub fn get_exit_value(&self) -> Option<i64> {
        self.0.exit_value
    }
}

/// First resume of a `Created` coroutine.
pub fn start(c: &Coroutine, msg: i64) -> i64 {
    contract!(
        c.status() == Status::Created,
        "start() called on a coroutine that is {:?}, not Created",
        c.status()
    );
    switch(c.handle().0, msg)
}

/// Resume a coroutine that has already been started and has not finished.
pub fn resume(c: &Coroutine, msg: i64) -> i64 {
    contract!(
        c.status() == Status::Running,
        "resume() called on a coroutine that is {:?}",
        c.status()
    );
    switch(c.handle().0, msg)
}

/// Switch directly into any live coroutine, symmetric-transfer style.
pub fn transfer(to: CoroutineRef, msg: i64) -> i64 {
    contract!(
        to.status() != Status::Finished,
        "transfer into a Finished coroutine"
    );
    switch(to.0, msg)
}

/// Suspend the running coroutine, returning control to its caller. Returns
/// whatever the next `resume`/`transfer` into this coroutine passes.
pub fn yield_now(msg: i64) -> i64 {
    let me = current_ptr();
    unsafe {
        let caller = (*me).caller;
        CURRENT.with(|c| c.set(caller));
        let ret_ctx = (*me)
            .return_ctx
            .take()
            .expect("yield_now called with no caller to return to");
        let t = ret_ctx.resume(msg as usize);
        CURRENT.with(|c| c.set(me));
        (*me).return_ctx = Some(t.context);
        if (*me).want_unwind {
            panic::panic_any(ForceUnwind);
        }
        t.data as i64
    }
}

/// Handle of the coroutine currently executing on this OS thread.
pub fn current() -> CoroutineRef {
    CoroutineRef(current_ptr())
}

/// Handle of the root pseudo-coroutine representing this OS thread itself
/// (the scheduler's native call stack, before any process is running).
pub fn main() -> CoroutineRef {
    CoroutineRef(main_ptr())
}

/// Forcibly terminate a coroutine, unwinding its Rust stack (running `Drop`
/// glue) without letting its entry function observe the request as a
/// normal suspension result — the mechanism behind `Process::stop`'s
/// "drop on kill".
pub fn stop(c: &mut Coroutine, retval: i64) {
    match c.0.status {
        Status::Finished => {}
        Status::Created => {
            c.0.status = Status::Finished;
            c.0.exit_value = Some(retval);
        }
        Status::Running => {
            c.0.want_unwind = true;
            let _ = switch(c.handle().0, retval);
            debug_assert_eq!(c.0.status, Status::Finished);
        }
    }
}

impl Drop for Coroutine {
    fn drop(&mut self) {
        stop(self, 0);
        if let Some(stack) = self.0.stack.take() {
            STACKS.with(|pool| pool.borrow_mut().give_stack(stack));
        }
    }
}
