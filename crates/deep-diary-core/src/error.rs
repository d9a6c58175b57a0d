use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported image type: {0} (expected jpg, jpeg or png)")]
    UnsupportedImage(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("request interrupted: {0}")]
    Interrupted(String),
}

impl DiaryError {
    /// Text shown to the user after an operation's notice prefix.
    ///
    /// Backend failures surface the raw response body verbatim; local and
    /// transport failures fall back to the error's display text.
    pub fn detail(&self) -> String {
        match self {
            DiaryError::Status { body, .. } | DiaryError::Decode { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiaryError>;
