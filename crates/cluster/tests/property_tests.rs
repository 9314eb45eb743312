use opinion_cluster::{ClusterEvent, ClusterSet, ClusterSetConfig};
use opinion_embeddings::{cosine_similarity, Embedding};
use proptest::prelude::*;

const WORDS: [&str; 6] = ["人参", "大根", "白菜", "野菜", "桶", "バケツ"];

fn stream() -> impl Strategy<Value = Vec<(usize, Vec<f32>)>> {
    prop::collection::vec(
        (0..WORDS.len(), prop::collection::vec(-1.0f32..1.0, 3)),
        1..40,
    )
}

proptest! {
    #[test]
    fn prop_counts_and_centroids_consistent(items in stream(), threshold in 0.3f32..0.95) {
        let mut set = ClusterSet::new(ClusterSetConfig::new(threshold, 3).unwrap());
        for (word, vector) in &items {
            set.assign(WORDS[*word], &Embedding::new(vector.clone())).unwrap();

            for cluster in set.clusters() {
                let members: u64 = cluster.members().iter().map(|m| m.count()).sum();
                prop_assert_eq!(cluster.count(), members);

                let sum = cluster.vector_sum().to_vec();
                let expected: Vec<f32> = sum.iter().map(|v| v / cluster.count() as f32).collect();
                prop_assert_eq!(cluster.centroid(), expected);
            }
        }
    }

    #[test]
    fn prop_sweep_reaches_fixed_point(items in stream(), threshold in 0.3f32..0.95) {
        let mut set = ClusterSet::new(ClusterSetConfig::new(threshold, 3).unwrap());
        for (word, vector) in &items {
            set.assign(WORDS[*word], &Embedding::new(vector.clone())).unwrap();
        }

        let clusters = set.clusters();
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let score = cosine_similarity(&clusters[i].centroid(), &clusters[j].centroid());
                prop_assert!(score <= threshold, "clusters {} and {} at {}", i, j, score);
            }
        }
        prop_assert!(set.merge_sweep().is_empty());
    }

    #[test]
    fn prop_singleton_representative(word in 0..WORDS.len(), vector in prop::collection::vec(-1.0f32..1.0, 3)) {
        let mut set = ClusterSet::new(ClusterSetConfig::new(0.63, 3).unwrap());
        let events = set.assign(WORDS[word], &Embedding::new(vector)).unwrap();
        prop_assert!(matches!(&events[0], ClusterEvent::Created { .. }), "expected first event to be Created");
        prop_assert_eq!(set.clusters()[0].representative(), WORDS[word]);
    }

    #[test]
    fn prop_self_similarity(vector in prop::collection::vec(-10.0f32..10.0, 1..16)) {
        prop_assume!(vector.iter().any(|v| v.abs() > 1e-3));
        prop_assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-4);
        prop_assert_eq!(cosine_similarity(&vec![0.0; vector.len()], &vector), 0.0);
    }

    #[test]
    fn prop_total_occurrences_preserved(items in stream(), threshold in 0.3f32..0.95) {
        let mut set = ClusterSet::new(ClusterSetConfig::new(threshold, 3).unwrap());
        for (word, vector) in &items {
            set.assign(WORDS[*word], &Embedding::new(vector.clone())).unwrap();
        }
        let total: u64 = set.clusters().iter().map(|c| c.count()).sum();
        prop_assert_eq!(total, items.len() as u64);
    }
}
