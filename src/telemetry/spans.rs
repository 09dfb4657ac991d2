// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span helpers for pipeline steps.

use std::time::Instant;
use tracing::{info_span, Span};

/// RAII guard for timing one pipeline step.
///
/// Records the step name and duration on its span.
pub struct StepSpan {
    step: &'static str,
    start: Instant,
    span: Span,
}

impl StepSpan {
    /// Start a new step span.
    pub fn start(step: &'static str) -> Self {
        let span = info_span!(
            "step",
            step = %step,
            duration_ms = tracing::field::Empty,
            success = tracing::field::Empty,
        );

        Self {
            step,
            start: Instant::now(),
            span,
        }
    }

    /// Get the underlying tracing span.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the span context.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Get elapsed time so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Finish the span, recording duration and success.
    pub fn finish(self, success: bool) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.span.record("duration_ms", duration_ms);
        self.span.record("success", success);

        tracing::info!(parent: &self.span, step = self.step, duration_ms, success, "step complete");
    }

    /// Finish with a result, automatically determining success.
    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) {
        self.finish(result.is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_span_lifecycle() {
        let span = StepSpan::start("Loading packages");
        {
            let _entered = span.enter();
        }
        span.finish(true);
    }

    #[test]
    fn test_step_span_with_result() {
        let span = StepSpan::start("Writing diff file");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(span.elapsed().as_micros() > 0);
        let result: Result<(), &str> = Err("boom");
        span.finish_with_result(&result);
    }
}
