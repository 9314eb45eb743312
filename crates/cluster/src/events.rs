/// One observable mutation of the cluster set, in the order it happened.
///
/// Consumers mirroring cluster state elsewhere replay these in sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEvent {
    /// A word matched nothing and started a singleton cluster.
    Created { word: String },

    /// A word joined an existing cluster.
    Joined {
        word: String,
        score: f32,
        previous: String,
        representative: String,
        count: u64,
    },

    /// The cluster labelled `absorbed` was merged into the one labelled `previous`.
    Merged {
        absorbed: String,
        previous: String,
        representative: String,
        count: u64,
        score: f32,
    },

    /// A word without a usable embedding was skipped.
    Dropped { word: String },
}

impl ClusterEvent {
    /// Whether a surviving cluster changed its label.
    pub fn renamed(&self) -> bool {
        match self {
            Self::Joined {
                previous,
                representative,
                ..
            }
            | Self::Merged {
                previous,
                representative,
                ..
            } => previous != representative,
            Self::Created { .. } | Self::Dropped { .. } => false,
        }
    }
}
