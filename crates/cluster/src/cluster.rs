use crate::representative::RepresentativePolicy;
use ndarray::{Array1, ArrayView1};
use std::collections::HashMap;
use std::fmt;

/// One distinct word inside a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    word: String,
    count: u64,
    vector: Vec<f32>,
}

impl Member {
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Occurrences of this word absorbed into the cluster.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Last embedding seen for this word. Only used for representative
    /// selection; the centroid comes from the running sum.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

/// A mutable semantic group of words.
///
/// Members keep insertion order so representative tie-breaks are
/// reproducible. `count` always equals the sum of member counts, and the
/// centroid is `vector_sum / count`, computed on demand.
#[derive(Debug, Clone)]
pub struct Cluster {
    members: Vec<Member>,
    positions: HashMap<String, usize>,
    vector_sum: Array1<f32>,
    count: u64,
    representative: String,
    policy: RepresentativePolicy,
}

impl Cluster {
    /// Singleton cluster. The accumulator owns a copy of `vector`.
    pub fn create(word: &str, vector: &[f32], policy: RepresentativePolicy) -> Self {
        let mut positions = HashMap::new();
        positions.insert(word.to_string(), 0);
        Self {
            members: vec![Member {
                word: word.to_string(),
                count: 1,
                vector: vector.to_vec(),
            }],
            positions,
            vector_sum: Array1::from(vector.to_vec()),
            count: 1,
            representative: word.to_string(),
            policy,
        }
    }

    /// Records one more occurrence of `word`.
    ///
    /// # Panics
    ///
    /// If `vector` does not have the cluster's dimension.
    pub fn assign(&mut self, word: &str, vector: &[f32]) {
        self.upsert_member(word, 1, vector);
        self.vector_sum += &ArrayView1::from(vector);
        self.count += 1;
        self.refresh_representative();
    }

    /// Merges `other` into this cluster. Member counts are summed; member
    /// vectors from `other` overwrite ours for shared words.
    ///
    /// # Panics
    ///
    /// If the two clusters have different dimensions.
    pub fn absorb(&mut self, other: Cluster) {
        let Cluster {
            members,
            vector_sum,
            count,
            ..
        } = other;
        for member in members {
            self.upsert_member(&member.word, member.count, &member.vector);
        }
        self.vector_sum += &vector_sum;
        self.count += count;
        self.refresh_representative();
    }

    fn upsert_member(&mut self, word: &str, count: u64, vector: &[f32]) {
        if let Some(&idx) = self.positions.get(word) {
            let member = &mut self.members[idx];
            member.count += count;
            member.vector = vector.to_vec();
            return;
        }
        self.positions.insert(word.to_string(), self.members.len());
        self.members.push(Member {
            word: word.to_string(),
            count,
            vector: vector.to_vec(),
        });
    }

    /// Display label under the cluster's policy, current after every mutation.
    pub fn representative(&self) -> &str {
        &self.representative
    }

    fn refresh_representative(&mut self) {
        let idx = self.policy.select(self);
        if self.members[idx].word != self.representative {
            self.representative = self.members[idx].word.clone();
        }
    }

    pub fn centroid(&self) -> Vec<f32> {
        #[allow(clippy::cast_precision_loss)]
        let divisor = self.count as f32;
        (&self.vector_sum / divisor).to_vec()
    }

    pub fn vector_sum(&self) -> ArrayView1<'_, f32> {
        self.vector_sum.view()
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn word_count(&self, word: &str) -> Option<u64> {
        self.positions.get(word).map(|&idx| self.members[idx].count)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.positions.contains_key(word)
    }

    pub fn dimension(&self) -> usize {
        self.vector_sum.len()
    }

    pub const fn policy(&self) -> RepresentativePolicy {
        self.policy
    }

    /// `representative:count[word,word,...]` with words in insertion order.
    pub fn log_descriptor(&self) -> String {
        let words: Vec<&str> = self.members.iter().map(|m| m.word.as_str()).collect();
        format!(
            "{}:{}[{}]",
            self.representative,
            self.count,
            words.join(",")
        )
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_descriptor())
    }
}
