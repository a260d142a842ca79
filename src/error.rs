use crate::bbox::BoundingBox;
use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bounding box after clamping: {bbox:?}")]
    InvalidGeometry { bbox: BoundingBox },

    #[error("frame {index} out of range, video has {len} frames")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("video `{video}` has no annotated first frame")]
    MissingFirstAnnotation { video: String },

    #[error("example generator used before reset")]
    SamplerNotReset,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("estimator error: {0}")]
    Estimator(#[source] BoxedError),

    #[error("trainer error: {0}")]
    Trainer(#[source] BoxedError),

    #[error("frame source error: {0}")]
    FrameSource(#[source] BoxedError),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
