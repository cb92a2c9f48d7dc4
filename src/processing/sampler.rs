use ndarray::Array1;
use rand::seq::index::sample;
use rand::Rng;

/// Randomly demotes excess foreground labels to ignore (-1), leaving at most
/// `max_positive` of them. The choice is uniform without replacement over the
/// current foreground set; a set already at or under budget is untouched.
/// The generator is caller-supplied so training runs and tests can seed it.
pub fn subsample_positive_labels<R: Rng>(
    labels: &mut Array1<i32>,
    max_positive: usize,
    rng: &mut R,
) {
    subsample(labels, 1, max_positive, rng);
}

/// Counterpart of [`subsample_positive_labels`] for background labels (0).
pub fn subsample_negative_labels<R: Rng>(
    labels: &mut Array1<i32>,
    max_negative: usize,
    rng: &mut R,
) {
    subsample(labels, 0, max_negative, rng);
}

fn subsample<R: Rng>(labels: &mut Array1<i32>, class: i32, budget: usize, rng: &mut R) {
    let class_inds: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == class)
        .map(|(i, _)| i)
        .collect();

    if class_inds.len() <= budget {
        return;
    }

    let excess = class_inds.len() - budget;
    for picked in sample(rng, class_inds.len(), excess).iter() {
        labels[class_inds[picked]] = -1;
    }
}

/// Caps the labeled set at `batch_size` entries: positives are trimmed to
/// `batch_size * positive_fraction` first, then negatives fill whatever the
/// surviving positives leave open. Never pads; short sides stay short.
pub fn balance<R: Rng>(
    labels: &mut Array1<i32>,
    batch_size: usize,
    positive_fraction: f32,
    rng: &mut R,
) {
    let max_positive = (batch_size as f32 * positive_fraction) as usize;
    subsample_positive_labels(labels, max_positive, rng);

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let max_negative = batch_size.saturating_sub(positives);
    subsample_negative_labels(labels, max_negative, rng);
}

#[cfg(test)]
mod tests {
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::processing::sampler::{
        balance, subsample_negative_labels, subsample_positive_labels,
    };

    fn count(labels: &Array1<i32>, class: i32) -> usize {
        labels.iter().filter(|&&l| l == class).count()
    }

    #[test]
    fn test_subsample_positive_reduces() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut labels = Array1::<i32>::ones(1000);

        subsample_positive_labels(&mut labels, 128, &mut rng);

        assert_eq!(count(&labels, 1), 128);
        assert_eq!(count(&labels, -1), 872);
    }

    #[test]
    fn test_subsample_positive_under_budget_is_noop() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut labels = Array1::<i32>::ones(10);

        subsample_positive_labels(&mut labels, 128, &mut rng);

        assert_eq!(labels, Array1::<i32>::ones(10));
    }

    #[test]
    fn test_subsample_negative_reduces() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut labels = Array1::<i32>::zeros(1000);

        subsample_negative_labels(&mut labels, 256, &mut rng);

        assert_eq!(count(&labels, 0), 256);
    }

    #[test]
    fn test_balance_noop_when_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);

        let mut zeros = Array1::<i32>::zeros(91);
        balance(&mut zeros, 256, 0.5, &mut rng);
        assert_eq!(zeros, Array1::<i32>::zeros(91));

        let mut ones = Array1::<i32>::ones(91);
        balance(&mut ones, 256, 0.5, &mut rng);
        assert_eq!(ones, Array1::<i32>::ones(91));
    }

    #[test]
    fn test_balance_caps_total() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut labels = Array1::<i32>::ones(1000);
        // Half the vector starts as background.
        for i in 500..1000 {
            labels[i] = 0;
        }

        balance(&mut labels, 256, 0.5, &mut rng);

        let positives = count(&labels, 1);
        let negatives = count(&labels, 0);
        assert_eq!(positives, 128);
        assert_eq!(negatives, 128);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = Array1::<i32>::ones(1000);
        let mut b = Array1::<i32>::ones(1000);

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        subsample_positive_labels(&mut a, 128, &mut rng_a);
        subsample_positive_labels(&mut b, 128, &mut rng_b);

        assert_eq!(a, b);
    }
}
