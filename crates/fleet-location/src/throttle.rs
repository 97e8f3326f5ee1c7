//! Time-or-distance gate for fix streams.

use crate::{Fix, WatchOptions};

/// Passes a fix when at least `min_interval` has elapsed **or** at least
/// `min_distance_m` has been covered since the last fix it passed.  The
/// first fix always passes.
#[derive(Clone, Debug)]
pub struct Throttle {
    options: WatchOptions,
    last:    Option<Fix>,
}

impl Throttle {
    pub fn new(options: WatchOptions) -> Self {
        Self { options, last: None }
    }

    /// Decide on `fix`, remembering it if it passes.
    pub fn admit(&mut self, fix: &Fix) -> bool {
        let pass = match &self.last {
            None => true,
            Some(last) => {
                let elapsed_ms = fix.timestamp.millis_since(last.timestamp);
                let moved_m = last.position.point.distance_m(fix.position.point);
                elapsed_ms >= self.options.min_interval.as_millis() as i64
                    || moved_m >= self.options.min_distance_m
            }
        };
        if pass {
            self.last = Some(*fix);
        }
        pass
    }

    pub fn last(&self) -> Option<&Fix> {
        self.last.as_ref()
    }
}
