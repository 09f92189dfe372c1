//! Extracted frame sets and their partition into detection batches.

use serde::Deserialize;

use super::error::PipelineError;

/// Frames produced by the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameSet {
    /// Folder holding the extracted frames.
    #[serde(rename = "frames_path")]
    pub location: String,
    /// Frame file names, in playback order. Empty when the extraction
    /// stage only reports the folder.
    #[serde(default)]
    pub frames: Vec<String>,
}

/// One detection sub-call's worth of frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBatch {
    pub index: usize,
    /// Empty means "every frame in the folder".
    pub frames: Vec<String>,
}

impl FrameSet {
    pub fn new(location: impl Into<String>, frames: Vec<String>) -> Self {
        Self {
            location: location.into(),
            frames,
        }
    }

    /// Reads the extraction stage's response body.
    ///
    /// Accepts `{"frames_path": "...", "frames": [...]}`, a bare JSON
    /// string, or a plain-text folder path.
    pub fn from_response(body: &str) -> Result<Self, PipelineError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::MalformedExtraction(
                "empty response body".to_string(),
            ));
        }

        let frame_set = match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::String(location)) => Self::new(location, Vec::new()),
            Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value::<FrameSet>(value)
                .map_err(|e| PipelineError::MalformedExtraction(e.to_string()))?,
            Ok(other) => {
                return Err(PipelineError::MalformedExtraction(format!(
                    "unexpected JSON response: {}",
                    other
                )))
            }
            Err(_) => Self::new(trimmed, Vec::new()),
        };

        if frame_set.location.trim().is_empty() {
            return Err(PipelineError::MalformedExtraction(
                "frames_path is empty".to_string(),
            ));
        }
        Ok(frame_set)
    }

    /// Splits the frames into batches of at most `size` frames.
    ///
    /// A set without a frame list yields a single batch covering the
    /// whole folder.
    pub fn batches(&self, size: usize) -> Vec<FrameBatch> {
        if self.frames.is_empty() {
            return vec![FrameBatch {
                index: 0,
                frames: Vec::new(),
            }];
        }
        self.frames
            .chunks(size.max(1))
            .enumerate()
            .map(|(index, chunk)| FrameBatch {
                index,
                frames: chunk.to_vec(),
            })
            .collect()
    }
}
