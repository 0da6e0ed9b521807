use crate::config::SizingPolicy;

pub const MIN_GROUP_SIZE: usize = 2;
pub const MAX_GROUP_SIZE: usize = 4;

/// Chooses group sizes for one homogeneous bucket of `n` users. Every returned size
/// lies in `MIN_GROUP_SIZE..=MAX_GROUP_SIZE` and the sizes sum to at most `n`; the
/// difference becomes leftover.
pub trait SizingStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn group_sizes(&self, n: usize) -> Vec<usize>;
}

/// Fours first; a remainder of two turns the last four into 3+3, five becomes 3+2.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedSizing;

impl SizingStrategy for BalancedSizing {
    fn name(&self) -> &'static str {
        "balanced"
    }

    fn group_sizes(&self, n: usize) -> Vec<usize> {
        match n {
            0 | 1 => Vec::new(),
            2..=4 => vec![n],
            5 => vec![3, 2],
            _ => {
                let fours = n / 4;
                match n % 4 {
                    2 => {
                        let mut sizes = vec![4; fours - 1];
                        sizes.extend([3, 3]);
                        sizes
                    }
                    3 => {
                        let mut sizes = vec![4; fours];
                        sizes.push(3);
                        sizes
                    }
                    // 0 divides evenly; 1 leaves a single user over.
                    _ => vec![4; fours],
                }
            }
        }
    }
}

/// Drain the queue four at a time, then take a three or a two.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueDrainSizing;

impl SizingStrategy for QueueDrainSizing {
    fn name(&self) -> &'static str {
        "queue_drain"
    }

    fn group_sizes(&self, n: usize) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(n / MAX_GROUP_SIZE + 1);
        let mut remaining = n;
        while remaining >= MAX_GROUP_SIZE {
            sizes.push(MAX_GROUP_SIZE);
            remaining -= MAX_GROUP_SIZE;
        }
        if remaining >= MIN_GROUP_SIZE {
            sizes.push(remaining);
        }
        sizes
    }
}

pub(crate) fn sizing_for(policy: SizingPolicy) -> Box<dyn SizingStrategy> {
    match policy {
        SizingPolicy::Balanced => Box::new(BalancedSizing),
        SizingPolicy::QueueDrain => Box::new(QueueDrainSizing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_sizes_match_documented_examples() {
        let sizing = BalancedSizing;
        assert_eq!(sizing.group_sizes(0), Vec::<usize>::new());
        assert_eq!(sizing.group_sizes(1), Vec::<usize>::new());
        assert_eq!(sizing.group_sizes(2), vec![2]);
        assert_eq!(sizing.group_sizes(3), vec![3]);
        assert_eq!(sizing.group_sizes(4), vec![4]);
        assert_eq!(sizing.group_sizes(5), vec![3, 2]);
        assert_eq!(sizing.group_sizes(6), vec![3, 3]);
        assert_eq!(sizing.group_sizes(7), vec![4, 3]);
        assert_eq!(sizing.group_sizes(13), vec![4, 4, 4]);
        assert_eq!(sizing.group_sizes(14), vec![4, 4, 3, 3]);
        assert_eq!(sizing.group_sizes(16), vec![4, 4, 4, 4]);
        assert_eq!(sizing.group_sizes(40), vec![4; 10]);
    }

    #[test]
    fn queue_drain_leaves_a_single_when_five_arrive() {
        let sizing = QueueDrainSizing;
        assert_eq!(sizing.group_sizes(5), vec![4]);
        assert_eq!(sizing.group_sizes(14), vec![4, 4, 4, 2]);
        assert_eq!(sizing.group_sizes(11), vec![4, 4, 3]);
        assert_eq!(sizing.group_sizes(1), Vec::<usize>::new());
    }

    #[test]
    fn every_strategy_respects_bounds_and_conservation() {
        let strategies: [&dyn SizingStrategy; 2] = [&BalancedSizing, &QueueDrainSizing];
        for strategy in strategies {
            for n in 0..=200 {
                let sizes = strategy.group_sizes(n);
                let total: usize = sizes.iter().sum();
                assert!(total <= n, "{} n={n}", strategy.name());
                assert!(n - total <= 1, "{} n={n} leftover {}", strategy.name(), n - total);
                assert!(
                    sizes
                        .iter()
                        .all(|size| (MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(size)),
                    "{} n={n} sizes {sizes:?}",
                    strategy.name()
                );
            }
        }
    }
}
