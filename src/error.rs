pub type CinecrawlResult<T> = Result<T, CinecrawlError>;

#[derive(thiserror::Error, Debug)]
pub enum CinecrawlError {
    #[error("resource error: {0}")]
    Resource(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CinecrawlError {
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CinecrawlError::resource("x")
                .to_string()
                .contains("resource error:")
        );
        assert!(
            CinecrawlError::audio("x")
                .to_string()
                .contains("audio error:")
        );
        assert!(
            CinecrawlError::layout("x")
                .to_string()
                .contains("layout error:")
        );
        assert!(
            CinecrawlError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CinecrawlError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
