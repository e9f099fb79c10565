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

//! Minimal human-readable reporting: tab-separated summary lines, an ASCII
//! bar histogram, and a correlogram drawn between ±1.
//!
//! This is deliberately not a general plotting package — just the three
//! output shapes a run needs to be eyeballed without pulling in a plotting
//! dependency. Anything richer is an external presentation layer's job.

use std::io::{self, Write};

use crate::summary::RunningSummary;
use crate::timeseries::Timeseries;

/// `label\tcount\tmin\tmean\tmax\tstddev\n` (label omitted when empty).
pub fn print_summary_line(w: &mut impl Write, label: &str, s: &RunningSummary) -> io::Result<()> {
    if label.is_empty() {
        writeln!(
            w,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            s.count(),
            s.min(),
            s.mean(),
            s.max(),
            s.stddev()
        )
    } else {
        writeln!(
            w,
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            label,
            s.count(),
            s.min(),
            s.mean(),
            s.max(),
            s.stddev()
        )
    }
}

/// An ASCII bar histogram of `ts`'s values over `buckets` equal-width bins
/// spanning `[min, max]`. Each row is `"#"` for a full bar, `"="` once the
/// bucket count passes half the tallest bucket's, `"-"` otherwise.
pub fn print_histogram(w: &mut impl Write, ts: &Timeseries, buckets: usize) -> io::Result<()> {
    let points = ts.as_slice();
    if points.is_empty() || buckets == 0 {
        return Ok(());
    }
    let min = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);

    let mut counts = vec![0u64; buckets];
    for p in points {
        let mut idx = (((p.value - min) / span) * buckets as f64) as usize;
        if idx >= buckets {
            idx = buckets - 1;
        }
        counts[idx] += 1;
    }
    let tallest = *counts.iter().max().unwrap_or(&0);

    for (i, &count) in counts.iter().enumerate() {
        let lo = min + span * i as f64 / buckets as f64;
        let hi = min + span * (i + 1) as f64 / buckets as f64;
        let bar = if tallest == 0 {
            String::new()
        } else if count == tallest {
            "#".repeat(((count * 40) / tallest.max(1)) as usize)
        } else if count * 2 >= tallest {
            "=".repeat(((count * 40) / tallest.max(1)).max(1) as usize)
        } else if count > 0 {
            "-".repeat(((count * 40) / tallest.max(1)).max(1) as usize)
        } else {
            String::new()
        };
        writeln!(w, "{:>12.4}\t{:>12.4}\t{:>8}\t{}", lo, hi, count, bar)?;
    }
    Ok(())
}

/// Pearson autocorrelation at lags `1..=max_lag`, one row per lag, each
/// drawn as a bar between `-1` and `1` (`"-"` marks the axis, `"="` fills
/// toward the value, `"#"` marks the tip).
pub fn print_correlogram(w: &mut impl Write, ts: &Timeseries, max_lag: usize) -> io::Result<()> {
    let values: Vec<f64> = ts.as_slice().iter().map(|p| p.value).collect();
    let n = values.len();
    if n < 2 {
        return Ok(());
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if variance == 0.0 {
        return Ok(());
    }

    const WIDTH: usize = 41;
    const MID: usize = WIDTH / 2;

    for lag in 1..=max_lag.min(n.saturating_sub(1)) {
        let cov: f64 = (0..n - lag).map(|i| (values[i] - mean) * (values[i + lag] - mean)).sum();
        let r = cov / variance;
        let offset = (r * MID as f64).round() as isize;
        let pos = (MID as isize + offset).clamp(0, WIDTH as isize - 1) as usize;

        let mut line = vec!['-'; WIDTH];
        line[MID] = '|';
        if pos < MID {
            for c in line.iter_mut().take(MID).skip(pos) {
                *c = '=';
            }
        } else if pos > MID {
            for c in line.iter_mut().take(pos + 1).skip(MID + 1) {
                *c = '=';
            }
        }
        line[pos] = '#';
        writeln!(w, "{:>4}\t{:>7.4}\t{}", lag, r, line.iter().collect::<String>())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_is_tab_separated() {
        let mut s = RunningSummary::new();
        s.add(1.0);
        s.add(2.0);
        s.add(3.0);
        let mut out = Vec::new();
        print_summary_line(&mut out, "latency", &s).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\t').count(), 5);
        assert!(text.starts_with("latency\t3\t"));
    }

    #[test]
    fn histogram_rows_cover_every_bucket() {
        let mut ts = Timeseries::new();
        for i in 0..100 {
            ts.record(i as f64, (i % 10) as f64);
        }
        let mut out = Vec::new();
        print_histogram(&mut out, &ts, 5).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn correlogram_stays_within_axis_bounds() {
        let mut ts = Timeseries::new();
        for i in 0..50 {
            ts.record(i as f64, (i as f64 * 0.3).sin());
        }
        let mut out = Vec::new();
        print_correlogram(&mut out, &ts, 5).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        for line in text.lines() {
            let bar = line.rsplit('\t').next().unwrap();
            assert_eq!(bar.chars().count(), 41);
        }
    }
}
