use std::time::Instant;

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: &'static str,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The span name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stops the timer, logs the duration at trace level and returns it.
    pub fn finish(self) -> f64 {
        let elapsed = self.elapsed_ms();
        tracing::trace!(span = self.name, elapsed_ms = elapsed, "Span finished");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("extract");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.name(), "extract");
        assert!(timer.finish() >= 5.0);
    }
}
