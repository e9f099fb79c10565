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

//! Per-process stacks.
//!
//! A process's stack is a guard-paged, 16-byte-aligned region of memory that
//! `context` builds a CPU register context on top of. Stacks are pooled per
//! replication thread so that short-lived processes — the common case in a
//! busy simulation — don't pay for an `mmap`/`mprotect` pair every time one
//! is created.

pub use self::stack_pool::StackPool;

pub use context::stack::ProtectedFixedSizeStack as Stack;

pub mod stack_pool;

/// Safe default for processes that don't call deeply into user code. Per
/// the coroutine substrate contract, sizing the stack correctly is the
/// caller's responsibility; running out of it is undefined behavior.
pub const DEFAULT_STACK_SIZE: usize = 24 * 1024;
