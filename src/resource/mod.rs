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

//! Resource base: the vtable every concrete resource kind implements so a
//! [`crate::process::ProcessHandle`] can hold a bare `*mut dyn Holdable` in
//! its held-resource list without knowing whether it's a pool, a queue, or
//! a buffer.
//!
//! A C-style "base struct first, pointer-cast to concrete kind" layout has
//! no stable equivalent in Rust, so the shared interface here is a trait
//! object instead: every concrete resource implements `Holdable` directly
//! and is referenced by processes as `*mut dyn Holdable`.

use crate::process::ProcessHandle;

pub mod buffer;
pub mod condition;
pub mod guard;
pub mod object_queue;
pub mod pool;
pub mod priority_queue;

/// Implemented by every concrete resource kind that processes can hold
/// quantity or tenancy in. Drives drop-on-kill and reprioritize-on-priority
/// -change.
pub trait Holdable {
    fn resource_name(&self) -> &str;

    /// Called once per held resource when a process is stopped. Must
    /// release the process's holdings without resuming it ("no resume" per
    /// the drop-on-kill contract — interrupting would re-enter the already
    /// -finishing coroutine).
    fn drop_holder(&mut self, process: ProcessHandle);

    /// Called when a process holding (or waiting on) this resource changes
    /// priority, so the resource can re-sort its holders/waiters heap.
    fn reprioritize_holder(&mut self, process: ProcessHandle, new_priority: i64);
}

/// `u64::MAX` spells "unlimited capacity" per the data model.
pub const UNLIMITED: u64 = u64::MAX;
