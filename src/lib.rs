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

//! A single-threaded, cooperative discrete-event simulation runtime built on
//! stackful coroutines.
//!
//! A replication lives entirely on one OS thread: [`scheduler`] drives an
//! advancing simulated clock and a heap of pending appointments;
//! [`process`] layers priority and suspend/resume/interrupt lifecycle on top
//! of a [`coroutine`]; [`resource`] provides the synchronization primitives
//! processes wait on (guards, a condition variable, a preemptible counting
//! pool, bounded object/priority queues, a two-ended buffer); [`summary`]
//! and [`timeseries`] record the numbers a replication produces so they can
//! be combined across replications and reported with [`report`].
//!
//! Independent replications run on independent threads with entirely
//! thread-local state (clock, heap, processes, resources); this crate never
//! spawns threads itself. The only cross-replication operation is merging
//! [`summary::RunningSummary`]/[`summary::WeightedRunningSummary`] values,
//! which are plain `Copy` data.
//!
//! ```
//! use desim::{process, scheduler};
//!
//! scheduler::queue_initialize(0.0);
//! let p = process::create("worker", 0, |_| {
//!     process::hold(5.0);
//!     0
//! });
//! process::start(p, 0);
//! scheduler::queue_execute();
//! assert_eq!(scheduler::time(), 5.0);
//! process::destroy(p);
//! ```

pub mod coroutine;
pub mod error;
pub mod heap;
pub mod process;
pub mod report;
pub mod resource;
pub mod scheduler;
mod stack;
pub mod summary;
pub mod timeseries;

pub use error::{Error, Result};
