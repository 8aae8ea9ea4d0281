use std::collections::HashMap;
use std::time::Duration;

/// Computes per-entity startup stagger offsets so entities sharing an
/// `update_interval` don't all poll in lockstep (§4.5 "Scheduler").
///
/// Within each interval bucket, the N entities are offset evenly at
/// `interval / N` apart; the Nth entity's offset wraps back toward zero
/// rather than accumulating past a full interval.
pub struct Scheduler;

impl Scheduler {
    pub fn stagger_offsets(intervals: &[Duration]) -> Vec<Duration> {
        let mut buckets: HashMap<Duration, Vec<usize>> = HashMap::new();
        for (index, interval) in intervals.iter().enumerate() {
            buckets.entry(*interval).or_default().push(index);
        }

        let mut offsets = vec![Duration::ZERO; intervals.len()];
        for (interval, indices) in buckets {
            let n = indices.len() as u32;
            if n <= 1 {
                continue;
            }
            for (position, index) in indices.into_iter().enumerate() {
                offsets[index] = (interval / n) * position as u32;
            }
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_entity_gets_no_offset() {
        let offsets = Scheduler::stagger_offsets(&[Duration::from_secs(60)]);
        assert_eq!(offsets, vec![Duration::ZERO]);
    }

    #[test]
    fn entities_sharing_an_interval_are_spread_evenly() {
        let offsets = Scheduler::stagger_offsets(&[
            Duration::from_secs(60),
            Duration::from_secs(60),
            Duration::from_secs(60),
        ]);
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(20),
                Duration::from_secs(40),
            ]
        );
    }

    #[test]
    fn different_intervals_are_bucketed_independently() {
        let offsets = Scheduler::stagger_offsets(&[
            Duration::from_secs(60),
            Duration::from_secs(300),
            Duration::from_secs(60),
        ]);
        assert_eq!(offsets[0], Duration::ZERO);
        assert_eq!(offsets[1], Duration::ZERO);
        assert_eq!(offsets[2], Duration::from_secs(30));
    }
}
