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

//! Recorded `(time, value)` history for a resource's level over a run.
//!
//! Every object queue, priority queue, and buffer can optionally record its
//! level each time it changes (`recording_start`/`recording_stop`); the
//! result is a `Timeseries` a caller can re-sort for reporting (by time for
//! a trace, by value for a quick five-number read) without disturbing the
//! original.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub time: f64,
    pub value: f64,
}

#[derive(Clone, Default)]
pub struct Timeseries {
    points: Vec<Point>,
}

impl Timeseries {
    pub fn new() -> Timeseries {
        Timeseries { points: Vec::new() }
    }

    pub fn record(&mut self, time: f64, value: f64) {
        self.points.push(Point { time, value });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn copy(&self) -> Timeseries {
        self.clone()
    }

    /// Sort in place by time, ascending; ties keep their relative order.
    pub fn sort_by_time(&mut self) {
        self.points
            .sort_by(|a, b| a.time.partial_cmp(&b.time).expect("NaN in timeseries"));
    }

    /// Sort in place by value, ascending; ties keep their relative order.
    pub fn sort_by_value(&mut self) {
        self.points
            .sort_by(|a, b| a.value.partial_cmp(&b.value).expect("NaN in timeseries"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_by_value_then_by_time_restores_chronological_order() {
        let mut ts = Timeseries::new();
        ts.record(0.0, 3.0);
        ts.record(1.0, 1.0);
        ts.record(2.0, 2.0);
        let original = ts.copy();

        ts.sort_by_value();
        assert_eq!(ts.as_slice()[0].value, 1.0);
        ts.sort_by_time();
        assert_eq!(ts.as_slice(), original.as_slice());
    }

    #[test]
    fn copy_then_sort_is_idempotent_under_resort() {
        let mut ts = Timeseries::new();
        for i in 0..10 {
            ts.record(i as f64, (10 - i) as f64);
        }
        let mut a = ts.copy();
        a.sort_by_time();
        let mut b = a.copy();
        b.sort_by_time();
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
