use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegError {
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    #[error("Unsupported value for tag {tag}: {value}")]
    UnsupportedTagValue { tag: &'static str, value: String },

    #[error("Unsupported dimension organization: {0}")]
    UnsupportedDimensionOrganization(String),

    #[error("Missing segment sequence")]
    MissingSegmentSequence,

    #[error("Frame {frame} references unknown segment {segment}")]
    UnknownSegmentReference { frame: usize, segment: u16 },

    #[error("Multiple orientations are not supported")]
    MultiOrientationUnsupported,

    #[error("Multiple spacings are not supported")]
    MultiSpacingUnsupported,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Missing orientation information")]
    MissingOrientation,

    #[error("Orientation matrix has no inverse")]
    DegenerateOrientation,

    #[error("Intermediate position distance increased: {previous} -> {current}")]
    IntermediatePositionDivergence { previous: f64, current: f64 },

    #[error("Segmentation would expand to {slices} slices, limit is {limit}")]
    SliceCountExceeded { slices: f64, limit: usize },

    #[error("Frame {frame} position does not match any slice")]
    SliceIndexNotFound { frame: usize },

    #[error("Frame count mismatch: {0}")]
    FrameCountMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}
