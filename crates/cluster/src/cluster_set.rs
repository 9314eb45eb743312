use crate::cluster::Cluster;
use crate::error::{ClusterError, Result};
use crate::events::ClusterEvent;
use crate::representative::RepresentativePolicy;
use opinion_embeddings::{cosine_similarity, Embedding};

/// What to do with a word the embedding provider does not know.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OovPolicy {
    /// Cluster it with a zero vector. It can then only join a cluster through
    /// the exact-representative override.
    #[default]
    ZeroVector,
    /// Skip it entirely.
    Drop,
}

impl OovPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zero" | "zero_vector" => Some(Self::ZeroVector),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroVector => "zero",
            Self::Drop => "drop",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClusterSetConfig {
    threshold: f32,
    dimension: usize,
    representative: RepresentativePolicy,
    oov: OovPolicy,
}

impl ClusterSetConfig {
    /// `threshold` must lie in the open interval (0, 1). It is used both for
    /// word assignment and for cluster merging.
    pub fn new(threshold: f32, dimension: usize) -> Result<Self> {
        if threshold.is_nan() || threshold <= 0.0 || threshold >= 1.0 {
            return Err(ClusterError::InvalidThreshold(threshold));
        }
        if dimension == 0 {
            return Err(ClusterError::ZeroDimension);
        }
        Ok(Self {
            threshold,
            dimension,
            representative: RepresentativePolicy::default(),
            oov: OovPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_representative(mut self, policy: RepresentativePolicy) -> Self {
        self.representative = policy;
        self
    }

    #[must_use]
    pub const fn with_oov(mut self, policy: OovPolicy) -> Self {
        self.oov = policy;
        self
    }

    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub const fn representative(&self) -> RepresentativePolicy {
        self.representative
    }

    pub const fn oov(&self) -> OovPolicy {
        self.oov
    }
}

/// The live collection of clusters.
///
/// Single owner: `assign` calls are sequential and a merge sweep assumes no
/// concurrent mutation.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    config: ClusterSetConfig,
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    pub const fn new(config: ClusterSetConfig) -> Self {
        Self {
            config,
            clusters: Vec::new(),
        }
    }

    /// Starts from existing clusters, kept in the given order. No merge sweep
    /// is run; call [`merge_sweep`](Self::merge_sweep) to reach a fixed point.
    pub fn with_clusters(config: ClusterSetConfig, clusters: Vec<Cluster>) -> Self {
        Self { config, clusters }
    }

    pub const fn config(&self) -> &ClusterSetConfig {
        &self.config
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// `(representative, count)` for every live cluster.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.clusters
            .iter()
            .map(|c| (c.representative().to_string(), c.count()))
            .collect()
    }

    /// Places one occurrence of `word`, then runs a merge sweep.
    ///
    /// Returns every mutation in order: the assignment itself followed by any
    /// merges it triggered.
    pub fn assign(&mut self, word: &str, embedding: &Embedding) -> Result<Vec<ClusterEvent>> {
        let zero;
        let vector: &[f32] = if embedding.valid {
            if embedding.dimension() != self.config.dimension {
                return Err(ClusterError::InvalidDimension {
                    expected: self.config.dimension,
                    actual: embedding.dimension(),
                });
            }
            if embedding.vector.iter().any(|v| !v.is_finite()) {
                return Err(ClusterError::NonFiniteVector(word.to_string()));
            }
            &embedding.vector
        } else {
            match self.config.oov {
                OovPolicy::Drop => {
                    log::warn!("No vector for '{word}'. dropping.");
                    return Ok(vec![ClusterEvent::Dropped {
                        word: word.to_string(),
                    }]);
                }
                OovPolicy::ZeroVector => {
                    log::warn!("No vector for '{word}'. treating as unique.");
                    zero = vec![0.0; self.config.dimension];
                    &zero
                }
            }
        };

        let mut events = Vec::new();
        match self.best_match(word, vector) {
            Some((idx, score)) => {
                let cluster = &mut self.clusters[idx];
                let previous = cluster.representative().to_string();
                cluster.assign(word, vector);
                let representative = cluster.representative().to_string();

                if previous == representative {
                    log::info!(
                        "Merged '{word}' into '{representative}' (Score: {score:.2}) -> {}",
                        cluster.log_descriptor()
                    );
                } else {
                    log::info!(
                        "Renamed cluster: '{previous}' -> '{representative}' (Triggered by '{word}', Score: {score:.2}) -> {}",
                        cluster.log_descriptor()
                    );
                }

                events.push(ClusterEvent::Joined {
                    word: word.to_string(),
                    score,
                    previous,
                    representative,
                    count: cluster.count(),
                });
            }
            None => {
                self.clusters.push(Cluster::create(
                    word,
                    vector,
                    self.config.representative,
                ));
                log::info!("Created '{word}'");
                events.push(ClusterEvent::Created {
                    word: word.to_string(),
                });
            }
        }

        events.extend(self.merge_sweep());
        Ok(events)
    }

    /// Cluster with the strictly greatest score above the threshold; the first
    /// one found wins ties. A cluster whose current representative equals
    /// `word` scores 1.0 regardless of geometry.
    fn best_match(&self, word: &str, vector: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, cluster) in self.clusters.iter().enumerate() {
            let score = if cluster.representative() == word {
                1.0
            } else {
                cosine_similarity(vector, &cluster.centroid())
            };
            if score.is_nan() || score <= self.config.threshold {
                continue;
            }
            if best.map_or(true, |(_, max)| score > max) {
                best = Some((idx, score));
            }
        }
        best
    }

    /// Agglomerates clusters whose centroids are more similar than the
    /// threshold, repeating full passes until one performs no merge.
    ///
    /// Within a pass, pairs `(i, j)` with `i < j` are visited over the cluster
    /// order at the start of the pass; `j` is absorbed into `i` and not
    /// compared again until the next pass.
    pub fn merge_sweep(&mut self) -> Vec<ClusterEvent> {
        let mut events = Vec::new();
        let threshold = self.config.threshold;

        loop {
            let mut slots: Vec<Option<Cluster>> =
                std::mem::take(&mut self.clusters).into_iter().map(Some).collect();
            let mut merged = false;

            for i in 0..slots.len() {
                if slots[i].is_none() {
                    continue;
                }
                for j in (i + 1)..slots.len() {
                    let score = match (&slots[i], &slots[j]) {
                        (Some(a), Some(b)) => cosine_similarity(&a.centroid(), &b.centroid()),
                        _ => continue,
                    };
                    if score.is_nan() || score <= threshold {
                        continue;
                    }

                    let Some(absorbed) = slots[j].take() else {
                        continue;
                    };
                    let Some(survivor) = slots[i].as_mut() else {
                        break;
                    };

                    let absorbed_rep = absorbed.representative().to_string();
                    let previous = survivor.representative().to_string();
                    survivor.absorb(absorbed);
                    let representative = survivor.representative().to_string();

                    log::info!(
                        "Cluster merge: '{absorbed_rep}' -> '{previous}' => Now '{representative}' (Score: {score:.2}) -> {}",
                        survivor.log_descriptor()
                    );

                    events.push(ClusterEvent::Merged {
                        absorbed: absorbed_rep,
                        previous,
                        representative,
                        count: survivor.count(),
                        score,
                    });
                    merged = true;
                }
            }

            self.clusters = slots.into_iter().flatten().collect();
            if !merged {
                break;
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(threshold: f32) -> ClusterSet {
        ClusterSet::new(ClusterSetConfig::new(threshold, 2).unwrap())
    }

    fn emb(x: f32, y: f32) -> Embedding {
        Embedding::new(vec![x, y])
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        assert_eq!(
            ClusterSetConfig::new(1.0, 2).unwrap_err(),
            ClusterError::InvalidThreshold(1.0)
        );
        assert!(ClusterSetConfig::new(0.0, 2).is_err());
        assert!(ClusterSetConfig::new(f32::NAN, 2).is_err());
        assert_eq!(
            ClusterSetConfig::new(0.5, 0).unwrap_err(),
            ClusterError::ZeroDimension
        );
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut set = set(0.63);
        let err = set
            .assign("x", &Embedding::new(vec![1.0, 0.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ClusterError::InvalidDimension {
                expected: 2,
                actual: 3
            }
        );
        assert!(set.is_empty());
    }

    #[test]
    fn rejects_non_finite_vectors() {
        let mut set = set(0.63);
        for word in ["a", "b", "c"] {
            let vector = match word {
                "a" => emb(1.0, 0.0),
                "b" => emb(0.0, 1.0),
                _ => emb(-1.0, 0.0),
            };
            set.assign(word, &vector).unwrap();
        }

        for broken in [emb(f32::NAN, 0.0), emb(f32::INFINITY, 1.0)] {
            let err = set.assign("broken", &broken).unwrap_err();
            assert_eq!(err, ClusterError::NonFiniteVector("broken".to_string()));
        }
        assert_eq!(
            set.snapshot(),
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 1),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn sweep_ignores_non_finite_centroids() {
        let mut set = set(0.5);
        let policy = RepresentativePolicy::Centroid;
        set.clusters.push(Cluster::create("a", &[1.0, 0.0], policy));
        set.clusters.push(Cluster::create("nan", &[f32::NAN, 0.0], policy));
        set.clusters.push(Cluster::create("b", &[0.0, 1.0], policy));

        assert!(set.merge_sweep().is_empty());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn externally_grown_clusters_report_current_label() {
        let policy = RepresentativePolicy::Centroid;
        let mut grown = Cluster::create("A", &[1.0, 0.2], policy);
        grown.assign("B", &[1.0, -0.2]);
        grown.assign("C", &[1.0, 0.0]);
        let mut set = ClusterSet::with_clusters(
            ClusterSetConfig::new(0.5, 2).unwrap(),
            vec![grown, Cluster::create("D", &[1.0, 0.05], policy)],
        );

        let events = set.merge_sweep();
        assert_eq!(events.len(), 1);
        assert!(
            matches!(
                &events[0],
                ClusterEvent::Merged { absorbed, previous, .. } if absorbed == "D" && previous == "C"
            ),
            "unexpected event: {:?}",
            events[0]
        );
    }

    #[test]
    fn oov_word_starts_its_own_cluster() {
        let mut set = set(0.63);
        set.assign("a", &emb(1.0, 0.0)).unwrap();
        let events = set.assign("謎", &Embedding::zero(2)).unwrap();
        assert_eq!(
            events,
            vec![ClusterEvent::Created {
                word: "謎".to_string()
            }]
        );
        assert_eq!(set.len(), 2);

        // same OOV word again reattaches through its label
        let events = set.assign("謎", &Embedding::zero(2)).unwrap();
        assert!(matches!(
            &events[0],
            ClusterEvent::Joined { representative, count: 2, .. } if representative == "謎"
        ));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn oov_drop_policy_leaves_set_untouched() {
        let config = ClusterSetConfig::new(0.63, 2)
            .unwrap()
            .with_oov(OovPolicy::Drop);
        let mut set = ClusterSet::new(config);
        let events = set.assign("謎", &Embedding::zero(2)).unwrap();
        assert_eq!(
            events,
            vec![ClusterEvent::Dropped {
                word: "謎".to_string()
            }]
        );
        assert!(set.is_empty());
    }

    #[test]
    fn best_score_wins_and_ties_keep_first() {
        let mut set = set(0.5);
        set.assign("x", &emb(1.0, 0.0)).unwrap();
        set.assign("y", &emb(0.0, 1.0)).unwrap();
        assert_eq!(set.len(), 2);

        // equidistant from both: the first cluster takes it
        let events = set.assign("diag", &emb(1.0, 1.0)).unwrap();
        assert!(matches!(
            &events[0],
            ClusterEvent::Joined { previous, .. } if previous == "x"
        ));
    }

    #[test]
    fn rename_is_reported() {
        let mut set = set(0.1);
        set.assign("A", &emb(1.0, 0.2)).unwrap();
        set.assign("B", &emb(1.0, -0.2)).unwrap();
        let events = set.assign("C", &emb(1.0, 0.0)).unwrap();
        let joined = &events[0];
        assert!(joined.renamed(), "expected rename, got {joined:?}");
        assert_eq!(set.snapshot(), vec![("C".to_string(), 3)]);
    }

    #[test]
    fn merge_sweep_is_transitive() {
        let mut set = set(0.9);
        // a and c start 35 degrees apart; b at 20 degrees pulls a towards c
        for (word, vector) in [
            ("a", [1.0, 0.0]),
            ("c", [0.8192, 0.5736]),
            ("b", [0.9397, 0.3420]),
        ] {
            set.clusters
                .push(Cluster::create(word, &vector, RepresentativePolicy::Centroid));
        }

        let events = set.merge_sweep();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ClusterEvent::Merged { absorbed, previous, .. } if absorbed == "b" && previous == "a"
        ));
        assert!(matches!(
            &events[1],
            ClusterEvent::Merged { absorbed, count: 3, .. } if absorbed == "c"
        ));
        assert_eq!(set.snapshot(), vec![("b".to_string(), 3)]);
    }
}
