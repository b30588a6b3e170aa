use serde::{Deserialize, Serialize};

/// Clip metadata. Lengths come from the sample count, never from wall-clock timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioClip {
    pub name: String,
    pub samples: u64,
    pub frequency: u32,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, samples: u64, frequency: u32) -> Self {
        Self {
            name: name.into(),
            samples,
            frequency,
        }
    }

    pub fn length_seconds(&self) -> f64 {
        if self.frequency == 0 {
            return 0.0;
        }
        self.samples as f64 / self.frequency as f64
    }

    pub fn is_playable(&self) -> bool {
        self.samples > 0 && self.frequency > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: String,
    #[serde(default)]
    pub intro: Option<AudioClip>,
    #[serde(default, rename = "loop")]
    pub loop_clip: Option<AudioClip>,
    #[serde(default = "default_looping")]
    pub looping: bool,
}

fn default_looping() -> bool {
    true
}

impl MusicTrack {
    pub fn new(id: impl Into<String>, intro: Option<AudioClip>, loop_clip: Option<AudioClip>) -> Self {
        Self {
            id: id.into(),
            intro,
            loop_clip,
            looping: true,
        }
    }

    pub fn playable_intro(&self) -> Option<&AudioClip> {
        self.intro.as_ref().filter(|clip| clip.is_playable())
    }

    pub fn playable_loop(&self) -> Option<&AudioClip> {
        self.loop_clip.as_ref().filter(|clip| clip.is_playable())
    }

    /// A track needs at least one playable clip.
    pub fn is_valid(&self) -> bool {
        self.playable_intro().is_some() || self.playable_loop().is_some()
    }
}
