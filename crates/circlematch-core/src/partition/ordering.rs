use crate::config::OrderingPolicy;
use crate::models::EligibleUser;

/// Arranges a bucket before it is cut into consecutive groups of `sizes`; users
/// past the sum of `sizes` become leftover. Implementations must return a
/// permutation of the input.
pub trait OrderingStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn arrange(&self, users: Vec<EligibleUser>, sizes: &[usize], seed: &str) -> Vec<EligibleUser>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StableOrdering;

impl OrderingStrategy for StableOrdering {
    fn name(&self) -> &'static str {
        "stable"
    }

    fn arrange(&self, users: Vec<EligibleUser>, _sizes: &[usize], _seed: &str) -> Vec<EligibleUser> {
        users
    }
}

/// Pseudo-random but reproducible: users are sorted by `blake3(seed:user_id)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffledOrdering;

impl OrderingStrategy for ShuffledOrdering {
    fn name(&self) -> &'static str {
        "shuffled"
    }

    fn arrange(&self, mut users: Vec<EligibleUser>, _sizes: &[usize], seed: &str) -> Vec<EligibleUser> {
        users.sort_by_cached_key(|user| *blake3::hash(format!("{seed}:{}", user.id).as_bytes()).as_bytes());
        users
    }
}

/// Greedy fill: each group starts from the earliest remaining user and then takes
/// whoever shares the most interests with the members so far, with a bonus for a
/// gender not yet present in the group. Ties go to input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestBalancedOrdering;

const SHARED_INTEREST_WEIGHT: usize = 2;
const NEW_GENDER_BONUS: usize = 1;

impl InterestBalancedOrdering {
    fn score(candidate: &EligibleUser, group: &[EligibleUser]) -> usize {
        let shared: usize = group
            .iter()
            .map(|member| candidate.shared_interest_count(member))
            .sum();
        let new_gender = candidate
            .gender
            .is_some_and(|gender| group.iter().all(|member| member.gender != Some(gender)));
        shared * SHARED_INTEREST_WEIGHT + if new_gender { NEW_GENDER_BONUS } else { 0 }
    }
}

impl OrderingStrategy for InterestBalancedOrdering {
    fn name(&self) -> &'static str {
        "interest_balanced"
    }

    fn arrange(&self, users: Vec<EligibleUser>, sizes: &[usize], _seed: &str) -> Vec<EligibleUser> {
        let mut remaining = users;
        let mut arranged = Vec::with_capacity(remaining.len());

        for &size in sizes {
            if remaining.is_empty() {
                break;
            }
            let mut group = vec![remaining.remove(0)];
            while group.len() < size && !remaining.is_empty() {
                let mut best_index = 0;
                let mut best_score = Self::score(&remaining[0], &group);
                for (index, candidate) in remaining.iter().enumerate().skip(1) {
                    let score = Self::score(candidate, &group);
                    if score > best_score {
                        best_index = index;
                        best_score = score;
                    }
                }
                group.push(remaining.remove(best_index));
            }
            arranged.append(&mut group);
        }

        arranged.append(&mut remaining);
        arranged
    }
}

pub(crate) fn ordering_for(policy: OrderingPolicy) -> Box<dyn OrderingStrategy> {
    match policy {
        OrderingPolicy::Stable => Box::new(StableOrdering),
        OrderingPolicy::Shuffled => Box::new(ShuffledOrdering),
        OrderingPolicy::InterestBalanced => Box::new(InterestBalancedOrdering),
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Gender;

    use super::*;

    fn ids(users: &[EligibleUser]) -> Vec<&str> {
        users.iter().map(|user| user.id.as_str()).collect()
    }

    fn users(n: usize) -> Vec<EligibleUser> {
        (0..n).map(|i| EligibleUser::new(format!("u{i:02}"))).collect()
    }

    #[test]
    fn shuffled_is_a_reproducible_permutation() {
        let first = ShuffledOrdering.arrange(users(12), &[4, 4, 4], "2025-05-01:11AM");
        let second = ShuffledOrdering.arrange(users(12), &[4, 4, 4], "2025-05-01:11AM");
        assert_eq!(ids(&first), ids(&second));

        let mut sorted = ids(&first);
        sorted.sort_unstable();
        assert_eq!(sorted, ids(&users(12)));
    }

    #[test]
    fn shuffled_order_depends_on_seed() {
        let a = ShuffledOrdering.arrange(users(12), &[4, 4, 4], "2025-05-01:11AM");
        let b = ShuffledOrdering.arrange(users(12), &[4, 4, 4], "2025-05-01:2PM");
        assert_ne!(ids(&a), ids(&b));
    }

    #[test]
    fn interest_balanced_clusters_shared_interests() {
        let input = vec![
            EligibleUser::new("a").with_interests(["chess"]),
            EligibleUser::new("b").with_interests(["surfing"]),
            EligibleUser::new("c").with_interests(["chess"]),
            EligibleUser::new("d").with_interests(["surfing"]),
        ];
        let arranged = InterestBalancedOrdering.arrange(input, &[2, 2], "");
        assert_eq!(ids(&arranged), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn interest_balanced_prefers_mixed_gender_on_ties() {
        let input = vec![
            EligibleUser::new("a").with_gender(Gender::Male),
            EligibleUser::new("b").with_gender(Gender::Male),
            EligibleUser::new("c").with_gender(Gender::Female),
            EligibleUser::new("d").with_gender(Gender::Female),
        ];
        let arranged = InterestBalancedOrdering.arrange(input, &[2, 2], "");
        assert_eq!(ids(&arranged), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn interest_balanced_puts_leftover_last() {
        let arranged = InterestBalancedOrdering.arrange(users(5), &[4], "");
        assert_eq!(arranged.len(), 5);
        assert_eq!(arranged[4].id, "u04");
    }
}
