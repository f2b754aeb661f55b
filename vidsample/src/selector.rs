/*!
    Stream selectors: `video`, `audio:1`, `cc`, ...
*/

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use ffmpeg_types::{Error, MediaType, Result, StreamIndex};

fn selector_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-zA-Z_]+)(?::([1-9][0-9]*|0))?$")
            .expect("stream selector regex should compile")
    })
}

/**
    A media type plus an optional container stream index.

    Without an index the selector picks the best stream of that type.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamSelector {
    pub media_type: MediaType,
    pub stream: StreamIndex,
}

impl StreamSelector {
    pub fn new(media_type: MediaType, stream: StreamIndex) -> Self {
        Self { media_type, stream }
    }

    pub fn best(media_type: MediaType) -> Self {
        Self::new(media_type, StreamIndex::Best)
    }

    pub fn parse(selector: &str) -> Result<Self> {
        if selector.is_empty() {
            return Err(Error::configuration("stream selector must not be empty"));
        }

        let Some(captures) = selector_pattern().captures(selector) else {
            return Err(Error::configuration(format!(
                "invalid stream selector '{selector}'"
            )));
        };

        let name = &captures[1];
        let Some(media_type) = MediaType::from_name(name) else {
            return Err(Error::configuration(format!(
                "unknown stream type '{name}', expected one of video, audio, subtitle, cc"
            )));
        };

        let stream = match captures.get(2) {
            None => StreamIndex::Best,
            Some(index) => {
                let index = index.as_str().parse::<u32>().map_err(|_| {
                    Error::configuration(format!(
                        "stream index '{}' in '{selector}' is out of range",
                        index.as_str()
                    ))
                })?;
                StreamIndex::Index(index)
            }
        };

        Ok(Self { media_type, stream })
    }
}

impl Default for StreamSelector {
    fn default() -> Self {
        Self::best(MediaType::Video)
    }
}

impl FromStr for StreamSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stream {
            StreamIndex::Index(index) => write!(f, "{}:{index}", self.media_type),
            _ => write!(f, "{}", self.media_type),
        }
    }
}
