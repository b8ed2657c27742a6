use derive_more::Display;

pub type Result<T> = core::result::Result<T, ProbePlacementError>;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ProbePlacementError {
    /// A transform carried NaN or infinite translation, rotation or scale.
    #[display("transform contains non-finite values")]
    NonFiniteTransform,
    /// A plain input value (merge distance, probe position, volume origin/size/density) was NaN or infinite.
    #[display("non-finite {what}")]
    NonFiniteInput { what: &'static str },
    /// The cluster merger hit its pass cap before every pair was at least the merge distance apart.
    #[display("merge did not converge after {passes} passes")]
    MergeDidNotConverge { passes: usize },
    /// A volume's lattice would hold more samples than the sampler accepts.
    #[display("volume lattice needs {samples} samples, limit is {limit}")]
    LatticeTooLarge { samples: usize, limit: usize },
}

impl std::error::Error for ProbePlacementError {}
