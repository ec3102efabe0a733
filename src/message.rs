use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Inline binary image, sent to the backend as a base64 data URL.
    Image {
        media_type: String,
        data: Vec<u8>,
    },
    ImageUrl(String),
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image { .. } | Self::ImageUrl(_) => None,
        }
    }

    /// URL form of an image part; `None` for text.
    pub fn image_url(&self) -> Option<String> {
        match self {
            Self::Text(_) => None,
            Self::Image { media_type, data } => {
                Some(format!("data:{media_type};base64,{}", STANDARD.encode(data)))
            }
            Self::ImageUrl(url) => Some(url.clone()),
        }
    }
}

/// One message sent to an agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub contents: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn new(role: Role, contents: Vec<ContentPart>) -> Self {
        Self { role, contents }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::Text(text.into())])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::Text(text.into())])
    }

    pub fn with_image(mut self, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.contents.push(ContentPart::Image {
            media_type: media_type.into(),
            data,
        });
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.contents.push(ContentPart::ImageUrl(url.into()));
        self
    }

    /// Text parts joined in order; image parts are skipped.
    pub fn text(&self) -> String {
        self.contents
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn has_images(&self) -> bool {
        self.contents
            .iter()
            .any(|part| !matches!(part, ContentPart::Text(_)))
    }
}

impl From<&str> for ChatMessage {
    fn from(text: &str) -> Self {
        Self::user(text)
    }
}

impl From<String> for ChatMessage {
    fn from(text: String) -> Self {
        Self::user(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CitationSource {
    Url { url: String, title: Option<String> },
    File { file_id: String, quote: Option<String> },
}

/// Backend metadata tying a span of the answer to a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Citation {
    /// Marker or span in the answer text, when the backend provides one.
    pub text: Option<String>,
    pub source: CitationSource,
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(text) = &self.text {
            write!(f, "{text} ")?;
        }
        match &self.source {
            CitationSource::Url {
                url,
                title: Some(title),
            } => write!(f, "{title} <{url}>"),
            CitationSource::Url { url, title: None } => write!(f, "<{url}>"),
            CitationSource::File {
                file_id,
                quote: Some(quote),
            } => write!(f, "file {file_id}: \"{quote}\""),
            CitationSource::File {
                file_id,
                quote: None,
            } => write!(f, "file {file_id}"),
        }
    }
}
