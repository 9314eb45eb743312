use crate::cluster::Cluster;
use opinion_embeddings::euclidean_distance;

/// How a cluster picks its display label.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RepresentativePolicy {
    /// Member whose embedding lies nearest (Euclidean) to the occurrence-weighted
    /// centroid. Frequent words pull the centroid towards themselves but a rare
    /// word sitting right at the centre can still win.
    #[default]
    Centroid,
    /// Most frequent member word.
    Majority,
}

impl RepresentativePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "centroid" => Some(Self::Centroid),
            "majority" => Some(Self::Majority),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centroid => "centroid",
            Self::Majority => "majority",
        }
    }

    /// Index into `cluster.members()` of the chosen word. Ties go to the
    /// member inserted first.
    pub(crate) fn select(self, cluster: &Cluster) -> usize {
        let members = cluster.members();
        if members.len() <= 1 {
            return 0;
        }

        match self {
            Self::Centroid => {
                let centroid = cluster.centroid();
                let mut best = 0;
                let mut min_dist = f32::INFINITY;
                for (idx, member) in members.iter().enumerate() {
                    let dist = euclidean_distance(member.vector(), &centroid);
                    if dist < min_dist {
                        min_dist = dist;
                        best = idx;
                    }
                }
                best
            }
            Self::Majority => {
                let mut best = 0;
                for (idx, member) in members.iter().enumerate().skip(1) {
                    if member.count() > members[best].count() {
                        best = idx;
                    }
                }
                best
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(policy: RepresentativePolicy) -> Cluster {
        let mut cluster = Cluster::create("A", &[1.0, 0.0], policy);
        cluster.assign("B", &[-1.0, 0.0]);
        cluster.assign("C", &[0.0, 0.0]);
        cluster
    }

    #[test]
    fn centroid_prefers_geometric_centre() {
        let mut cluster = balanced(RepresentativePolicy::Centroid);
        assert_eq!(cluster.representative(), "C");

        // centroid moves to [0.25, 0]: C is 0.25 away, A is 0.75 away
        cluster.assign("A", &[1.0, 0.0]);
        assert_eq!(cluster.representative(), "C");
    }

    #[test]
    fn centroid_follows_heavy_skew() {
        let mut cluster = balanced(RepresentativePolicy::Centroid);
        for _ in 0..10 {
            cluster.assign("A", &[1.0, 0.0]);
        }
        assert_eq!(cluster.representative(), "A");
    }

    #[test]
    fn majority_picks_most_frequent() {
        let mut cluster = balanced(RepresentativePolicy::Majority);
        assert_eq!(cluster.representative(), "A");

        cluster.assign("B", &[-1.0, 0.0]);
        cluster.assign("B", &[-1.0, 0.0]);
        assert_eq!(cluster.representative(), "B");
    }

    #[test]
    fn ties_keep_first_member() {
        let mut cluster = Cluster::create("left", &[1.0, 0.0], RepresentativePolicy::Centroid);
        cluster.assign("right", &[-1.0, 0.0]);
        // both are exactly 1.0 away from the origin centroid
        assert_eq!(cluster.representative(), "left");
    }

    #[test]
    fn parse_policy_names() {
        assert_eq!(
            RepresentativePolicy::parse("Majority"),
            Some(RepresentativePolicy::Majority)
        );
        assert_eq!(
            RepresentativePolicy::parse("centroid"),
            Some(RepresentativePolicy::Centroid)
        );
        assert_eq!(RepresentativePolicy::parse("mode"), None);
    }
}
