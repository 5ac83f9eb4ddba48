// ============================================================
// Layer 6 — Text Progress Bar
// ============================================================
// A single-line terminal progress bar.
//
//   update(4, "- loss: 0.1234 ") on total = 10, width = 10:
//   \r 4/10 [====>.....] ( 40%) - loss: 0.1234
//
//   done(0.1234) afterwards returns:
//    4/10 [==========] - 0.1234s/step - loss: 0.1234
//
// `update` redraws in place with a leading carriage return.
// `done` does not write anything; it returns the summary line
// so the caller decides where it goes (stdout, a file logger).
//
// Counts are multiplied by `num` before printing, so a bar over
// 10 batches of 32 samples reads 320/320 at the end. Both counts
// are right-aligned to the digit count of `total` (not total*num).

use std::io::{self, Stderr, Write};

use anyhow::{ensure, Context, Result};

pub struct ProgressBar<W: Write = Stderr> {
    total:   usize,
    num:     usize,
    width:   usize,
    symbol:  char,
    remain:  char,
    out:     W,
    current: usize,
    metrics: String,
}

impl ProgressBar<Stderr> {
    /// A bar of `width` cells drawn to stderr.
    pub fn new(total: usize, num: usize, width: usize) -> Result<Self> {
        Self::with_writer(total, num, width, '=', '.', io::stderr())
    }
}

impl<W: Write> ProgressBar<W> {
    pub fn with_writer(
        total:  usize,
        num:    usize,
        width:  usize,
        symbol: char,
        remain: char,
        out:    W,
    ) -> Result<Self> {
        ensure!(total > 0, "Progress bar total must be positive");
        Ok(Self {
            total,
            num,
            width,
            symbol,
            remain,
            out,
            current: 0,
            metrics: String::new(),
        })
    }

    /// Redraw the bar at step `current` with a free-form metrics string.
    pub fn update(&mut self, current: usize, metrics: &str) -> Result<()> {
        self.current = current;
        self.metrics = metrics.to_string();

        let fraction = current as f64 / self.total as f64;
        let filled   = ((self.width as f64 * fraction) as usize).min(self.width);
        let mut bar  = String::with_capacity(self.width + 3);
        bar.push('[');
        bar.extend(std::iter::repeat(self.symbol).take(filled));
        bar.push('>');
        bar.extend(std::iter::repeat(self.remain).take(self.width.saturating_sub(filled + 1)));
        bar.push(']');

        let line = format!(
            "\r{} {} ({:>3}%) {}",
            self.counts(),
            bar,
            (fraction * 100.0) as i64,
            metrics,
        );
        self.out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.flush())
            .context("Cannot draw progress bar")
    }

    /// The final summary line for the last `update`, with a full bar.
    pub fn done(&self, step_time: f64) -> String {
        let bar: String = std::iter::repeat(self.symbol).take(self.width).collect();
        format!("{} [{}] - {:.4}s/step {}", self.counts(), bar, step_time, self.metrics)
    }

    /// Start over with a new total and multiplier; the writer is kept.
    pub fn reset(&mut self, total: usize, num: usize) -> Result<()> {
        ensure!(total > 0, "Progress bar total must be positive");
        self.total   = total;
        self.num     = num;
        self.current = 0;
        self.metrics.clear();
        Ok(())
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn counts(&self) -> String {
        let digits = self.total.to_string().len();
        format!(
            "{:>w$}/{:>w$}",
            self.current * self.num,
            self.total * self.num,
            w = digits
        )
    }
}

/// Render `(key, value)` pairs as one string, e.g. `"- loss: 0.1234 - acc: 0.5000 "`.
pub fn metrics_string<'a>(
    pairs:     impl IntoIterator<Item = (&'a str, f64)>,
    prefix:    &str,
    precision: usize,
) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| format!("{prefix}{key}: {value:.precision$} "))
        .collect()
}
