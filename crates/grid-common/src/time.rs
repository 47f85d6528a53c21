//! Valid-time handling and the time axis representation.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Valid times before this cutoff are treated as decoding garbage and
/// rejected during classification.
pub fn sanity_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap()
}

/// The time axis of one assembled dataset.
///
/// More than two consecutive times with uniform spacing are stored as a
/// (start, end, step) range; anything else is an explicit list. The two
/// forms are content-equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeAxis {
    List(Vec<DateTime<Utc>>),
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    },
}

impl TimeAxis {
    /// Build an axis from deduplicated, ascending valid times.
    ///
    /// Collapses to a range when all gaps are equal and there are more
    /// than two entries.
    pub fn from_times(times: Vec<DateTime<Utc>>) -> Self {
        if times.len() > 2 {
            let step = times[1] - times[0];
            let uniform = times.windows(2).all(|w| w[1] - w[0] == step);
            if uniform && step > Duration::zero() {
                return TimeAxis::Range {
                    start: times[0],
                    end: *times.last().unwrap(),
                    step,
                };
            }
        }
        TimeAxis::List(times)
    }

    /// Number of times on the axis.
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::List(times) => times.len(),
            TimeAxis::Range { start, end, step } => {
                ((*end - *start).num_seconds() / step.num_seconds()) as usize + 1
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Axis index of a valid time, if present.
    pub fn index_of(&self, t: DateTime<Utc>) -> Option<usize> {
        match self {
            TimeAxis::List(times) => times.iter().position(|x| *x == t),
            TimeAxis::Range { start, end, step } => {
                if t < *start || t > *end {
                    return None;
                }
                let offset = (t - *start).num_seconds();
                let step_s = step.num_seconds();
                if offset % step_s == 0 {
                    Some((offset / step_s) as usize)
                } else {
                    None
                }
            }
        }
    }

    /// Expand to an explicit list of times.
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        match self {
            TimeAxis::List(times) => times.clone(),
            TimeAxis::Range { start, step, .. } => {
                (0..self.len()).map(|i| *start + *step * i as i32).collect()
            }
        }
    }
}
