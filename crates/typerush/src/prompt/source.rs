use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::{LyricLine, LyricTrack, Prompt, VideoId};
use crate::error::{Error, Result};

/// Supplies the prompt list. One attempt per call; failures are reported, not retried.
pub trait PromptSource {
    fn fetch_prompts(&self) -> Result<Vec<Prompt>>;
}

/// Supplies the caption track for a video.
pub trait LyricSource {
    fn fetch_track(&self, video_id: &VideoId) -> Result<LyricTrack>;
}

/// In-memory prompt list
#[derive(Debug, Clone, Default)]
pub struct StaticPrompts {
    prompts: Vec<Prompt>,
}

impl StaticPrompts {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    /// A small built-in set for offline play
    pub fn builtin() -> Self {
        Self::new(vec![
            Prompt::new(1, "こんにちは", "konnichiwa", 300),
            Prompt::new(2, "ありがとうございます", "arigatougozaimasu", 500),
            Prompt::new(3, "すばやいきつね", "subayaikitsune", 350),
            Prompt::new(4, "タイプスクリプト", "taipusukuriputo", 700),
            Prompt::new(5, "しんかんせん", "shinkansen", 320),
            Prompt::new(6, "ちょっとまって", "chottomatte", 420),
            Prompt::new(7, "ふじさん", "fujisan", 200),
            Prompt::new(8, "じゅうしょ", "juusho", 380),
        ])
    }
}

impl PromptSource for StaticPrompts {
    fn fetch_prompts(&self) -> Result<Vec<Prompt>> {
        Ok(self.prompts.clone())
    }
}

/// Prompt list read from a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonPromptSource {
    path: PathBuf,
}

impl JsonPromptSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PromptSource for JsonPromptSource {
    fn fetch_prompts(&self) -> Result<Vec<Prompt>> {
        let content = fs::read_to_string(&self.path)?;
        let prompts: Vec<Prompt> = serde_json::from_str(&content)?;
        debug!("Read {} prompts from {}", prompts.len(), self.path.display());
        if prompts.is_empty() {
            return Err(Error::DataUnavailable(format!(
                "{} contains no prompts",
                self.path.display()
            )));
        }
        Ok(prompts)
    }
}

/// Track files are either `{"title": ..., "lines": [...]}` or a bare line array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TrackFile {
    Titled { title: String, lines: Vec<LyricLine> },
    Bare(Vec<LyricLine>),
}

/// Caption tracks read from `<dir>/<video id>.json`, or one fixed file
#[derive(Debug, Clone)]
pub struct JsonLyricSource {
    path: PathBuf,
}

impl JsonLyricSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn file_for(&self, video_id: &VideoId) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.json", video_id))
        } else {
            self.path.clone()
        }
    }
}

impl LyricSource for JsonLyricSource {
    fn fetch_track(&self, video_id: &VideoId) -> Result<LyricTrack> {
        let path = self.file_for(video_id);
        let content = fs::read_to_string(&path)?;
        let track = match serde_json::from_str::<TrackFile>(&content)? {
            TrackFile::Titled { title, lines } => LyricTrack::new(title, lines),
            TrackFile::Bare(lines) => LyricTrack::new(video_id.as_str(), lines),
        };
        if let Err(e) = &track {
            warn!("Rejected track {}: {}", path.display(), e);
        }
        track
    }
}

#[cfg(feature = "api")]
mod http {
    use std::time::Duration;

    use tracing::debug;

    use super::{LyricSource, PromptSource};
    use crate::error::{Error, Result};
    use crate::prompt::{LyricLine, LyricTrack, Prompt, VideoId};

    const TIMEOUT_SECS: u64 = 15;

    fn agent() -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(TIMEOUT_SECS)))
            .build();
        config.into()
    }

    fn http_err(e: ureq::Error) -> Error {
        Error::Http(e.to_string())
    }

    /// `GET {base}/api/prompts`
    #[derive(Debug, Clone)]
    pub struct HttpPromptSource {
        base_url: String,
    }

    impl HttpPromptSource {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into(),
            }
        }
    }

    impl PromptSource for HttpPromptSource {
        fn fetch_prompts(&self) -> Result<Vec<Prompt>> {
            let url = format!("{}/api/prompts", self.base_url.trim_end_matches('/'));
            debug!("GET {}", url);
            let mut response = agent().get(&url).call().map_err(http_err)?;
            let prompts: Vec<Prompt> = response.body_mut().read_json().map_err(http_err)?;
            if prompts.is_empty() {
                return Err(Error::DataUnavailable("server returned no prompts".into()));
            }
            Ok(prompts)
        }
    }

    /// `GET {base}/api/sudden-death/captions?videoId=...`
    #[derive(Debug, Clone)]
    pub struct HttpLyricSource {
        base_url: String,
    }

    impl HttpLyricSource {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into(),
            }
        }
    }

    impl LyricSource for HttpLyricSource {
        fn fetch_track(&self, video_id: &VideoId) -> Result<LyricTrack> {
            let url = format!(
                "{}/api/sudden-death/captions",
                self.base_url.trim_end_matches('/')
            );
            debug!("GET {}?videoId={}", url, video_id);
            let mut response = agent()
                .get(&url)
                .query("videoId", video_id.as_str())
                .call()
                .map_err(http_err)?;
            let lines: Vec<LyricLine> = response.body_mut().read_json().map_err(http_err)?;
            LyricTrack::new(video_id.as_str(), lines)
        }
    }
}

#[cfg(feature = "api")]
pub use http::{HttpLyricSource, HttpPromptSource};
