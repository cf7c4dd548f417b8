/// Standard patient orientations of an image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

/// Presence requirement of a tag.
#[derive(Debug, Clone, Copy)]
pub enum RequirementLevel {
    Required,
    /// Required when the condition holds for the data set; with no
    /// condition the tag is always required.
    RequiredIfApplicable(Option<fn(&crate::data_set::DataSet) -> bool>),
    Optional,
}

/// Where the per-slice write phase of the assembler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Processor {
    Serial,
    #[default]
    Parallel,
}

/// Tolerance used when a filled gap lands on the next real position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToleranceTier {
    Base,
    Wide,
    Widest,
}

impl ToleranceTier {
    pub const REAL_WORLD_EPSILON: f64 = 1e-4;

    pub fn epsilon(self) -> f64 {
        match self {
            ToleranceTier::Base => Self::REAL_WORLD_EPSILON,
            ToleranceTier::Wide => Self::REAL_WORLD_EPSILON * 10.0,
            ToleranceTier::Widest => Self::REAL_WORLD_EPSILON * 100.0,
        }
    }

    /// Smallest tier that accepts the residual.
    pub fn classify(residual: f64) -> Option<Self> {
        let residual = residual.abs();
        [ToleranceTier::Base, ToleranceTier::Wide, ToleranceTier::Widest]
            .into_iter()
            .find(|tier| residual <= tier.epsilon())
    }
}
