use gobmovie_media::Fps;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub movie: MovieConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Frame file extension, matched case-insensitively
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "jpg".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MovieConfig {
    /// Frame rate used by `convert` when neither the command line nor the
    /// container name provides one ("30", "29.97", "30000/1001")
    #[serde(default)]
    pub fps: Option<String>,

    /// Write the 36-byte audio descriptor read by older players
    #[serde(default)]
    pub legacy_header: bool,
}

impl MovieConfig {
    /// Parsed fallback frame rate.
    pub fn fps(&self) -> gobmovie_media::Result<Option<Fps>> {
        self.fps.as_deref().map(str::parse).transpose()
    }
}
