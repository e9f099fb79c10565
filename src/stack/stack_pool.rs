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

use super::Stack;

/// Per-thread cache of retired stacks, keyed loosely by size so a request
/// for a smaller stack than what's cached is still satisfied from the pool.
#[derive(Default)]
pub struct StackPool {
    stacks: Vec<Stack>,
}

const MAX_CACHED_STACKS: usize = 64;

impl StackPool {
    pub fn new() -> StackPool {
        StackPool { stacks: Vec::new() }
    }

    /// Take a stack at least `min_size` bytes, reusing a cached one if one
    /// is large enough, falling back to a fresh allocation otherwise.
    pub fn take_stack(&mut self, min_size: usize) -> Stack {
        match self.stacks.iter().position(|s| min_size <= s.len()) {
            Some(idx) => self.stacks.swap_remove(idx),
            None => Stack::new(min_size).expect("failed to allocate a guarded process stack"),
        }
    }

    /// Return a stack to the pool for reuse by a future process, unless the
    /// pool is already full.
    pub fn give_stack(&mut self, stack: Stack) {
        if self.stacks.len() < MAX_CACHED_STACKS {
            self.stacks.push(stack);
        }
    }

    pub fn cached_len(&self) -> usize {
        self.stacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_pool_reuses_large_enough_stack() {
        let mut pool = StackPool::new();
        let s = pool.take_stack(64 * 1024);
        let size = s.len();
        pool.give_stack(s);

        let s2 = pool.take_stack(32 * 1024);
        assert_eq!(s2.len(), size);
    }

    #[test]
    fn stack_pool_allocates_when_empty() {
        let mut pool = StackPool::new();
        assert_eq!(pool.cached_len(), 0);
        let s = pool.take_stack(24 * 1024);
        assert!(s.len() >= 24 * 1024);
    }
}
