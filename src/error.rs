use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Resample buffer error: {0}")]
    ResampleBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Resample error: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("Resampled buffer does not match the requested size")]
    Resample,

    #[error("Metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist '{direction}' capture: {source}")]
    Persist {
        direction: String,
        #[source]
        source: Box<EnrollError>,
    },
}

pub type Result<T> = std::result::Result<T, EnrollError>;
