use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffled train/validation split that keeps class proportions.
///
/// Each class contributes `round(count * test_size)` samples to validation,
/// but never all of them, and at least one when it has two or more. Returns
/// `(train, validation)` sample indices.
pub fn stratified_split<R: Rng>(
    labels: &[usize],
    test_size: f64,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let classes = labels.iter().max().map_or(0, |&m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();
    for mut members in by_class {
        members.shuffle(rng);
        let count = members.len();
        let held_out = if count < 2 || test_size <= 0.0 {
            0
        } else {
            ((count as f64 * test_size).round() as usize).clamp(1, count - 1)
        };
        validation.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    train.shuffle(rng);
    validation.shuffle(rng);
    (train, validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_class_lands_in_both_partitions() {
        let labels: Vec<usize> = (0..3).flat_map(|c| std::iter::repeat(c).take(51)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let (train, validation) = stratified_split(&labels, 0.2, &mut rng);

        assert_eq!(train.len() + validation.len(), labels.len());
        for class in 0..3 {
            let held = validation.iter().filter(|&&i| labels[i] == class).count();
            let kept = train.iter().filter(|&&i| labels[i] == class).count();
            assert_eq!(held, 10);
            assert_eq!(kept, 41);
        }
    }

    #[test]
    fn small_classes_still_get_a_validation_sample() {
        let labels = vec![0, 0, 1, 1, 1, 2];
        let mut rng = StdRng::seed_from_u64(1);
        let (train, validation) = stratified_split(&labels, 0.2, &mut rng);
        let held: Vec<usize> = validation.iter().map(|&i| labels[i]).collect();
        assert_eq!(validation.len(), 2);
        assert!(held.contains(&0) && held.contains(&1));
        // A singleton class stays in training
        assert!(train.iter().any(|&i| labels[i] == 2));
    }

    #[test]
    fn indices_are_disjoint() {
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let (mut train, validation) = stratified_split(&labels, 0.25, &mut rng);
        train.extend(&validation);
        train.sort_unstable();
        assert_eq!(train, (0..40).collect::<Vec<_>>());
    }
}
