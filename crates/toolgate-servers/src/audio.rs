// Audio tool server
//
// Operates on PCM WAV files under a root directory. Slicing is
// frame-aligned: byte offsets into the data chunk are always a multiple of
// the frame size (channels * bytes per sample), so a slice is itself a
// valid WAV file.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

use toolgate_core::{Tool, ToolExecution, ToolServer};

use crate::paths::resolve;

/// Audio tool server rooted at a directory
pub struct AudioServer {
    root: PathBuf,
}

impl AudioServer {
    /// Create a server rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ToolServer for AudioServer {
    fn name(&self) -> &str {
        "audio"
    }

    fn description(&self) -> &str {
        "Inspect and slice PCM WAV audio files under a sandboxed root directory."
    }

    fn system_prompt_addition(&self) -> Option<&str> {
        Some("You have access to audio tools for PCM WAV files. Use audio_info to inspect a file before slicing it.")
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        vec![
            Box::new(AudioInfoTool {
                root: self.root.clone(),
            }),
            Box::new(SliceAudioTool {
                root: self.root.clone(),
            }),
        ]
    }
}

// ============================================================================
// WAV parsing
// ============================================================================

/// Parsed layout of a PCM WAV file
#[derive(Debug, Clone, Copy)]
struct WavLayout {
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_len: usize,
}

impl WavLayout {
    fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    fn frames(&self) -> usize {
        let frame = self.bytes_per_frame();
        if frame == 0 {
            0
        } else {
            self.data_len / frame
        }
    }

    fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

fn le_u16(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

fn le_u32(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}

/// Walk the RIFF chunk list, extracting the fmt and data chunks
fn parse_wav(bytes: &[u8]) -> Result<WavLayout, String> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err("not a RIFF/WAVE file".to_string());
    }

    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut data: Option<(usize, usize)> = None;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = le_u32(bytes, pos + 4) as usize;
        let body = pos + 8;
        if body + size > bytes.len() {
            return Err("truncated chunk".to_string());
        }

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err("fmt chunk too small".to_string());
                }
                let audio_format = le_u16(bytes, body);
                let channels = le_u16(bytes, body + 2);
                let sample_rate = le_u32(bytes, body + 4);
                let bits_per_sample = le_u16(bytes, body + 14);
                fmt = Some((audio_format, channels, sample_rate, bits_per_sample));
            }
            b"data" => {
                data = Some((body, size));
            }
            _ => {}
        }

        // Chunks are word-aligned
        pos = body + size + (size & 1);
    }

    let (audio_format, channels, sample_rate, bits_per_sample) =
        fmt.ok_or_else(|| "missing fmt chunk".to_string())?;
    let (data_offset, data_len) = data.ok_or_else(|| "missing data chunk".to_string())?;

    if audio_format != 1 {
        return Err(format!(
            "unsupported audio format {} (only PCM is supported)",
            audio_format
        ));
    }
    if channels == 0 || sample_rate == 0 || bits_per_sample == 0 || bits_per_sample % 8 != 0 {
        return Err("invalid fmt chunk".to_string());
    }

    Ok(WavLayout {
        channels,
        sample_rate,
        bits_per_sample,
        data_offset,
        data_len,
    })
}

/// Build a minimal PCM WAV file around a data payload
fn build_wav(layout: &WavLayout, data: &[u8]) -> Vec<u8> {
    let byte_rate = layout.sample_rate * layout.channels as u32 * (layout.bits_per_sample as u32 / 8);
    let block_align = layout.channels * (layout.bits_per_sample / 8);

    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&layout.channels.to_le_bytes());
    out.extend_from_slice(&layout.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&layout.bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

// ============================================================================
// Tool: audio_info
// ============================================================================

/// Reports format and duration of a WAV file
pub struct AudioInfoTool {
    root: PathBuf,
}

impl AudioInfoTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for AudioInfoTool {
    fn name(&self) -> &str {
        "audio_info"
    }

    fn description(&self) -> &str {
        "Inspect a PCM WAV file: channels, sample rate, bit depth and duration."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "WAV file path relative to the root"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let Some(raw) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolExecution::tool_error("Missing required parameter: path");
        };

        let file = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        let bytes = match tokio::fs::read(&file).await {
            Ok(b) => b,
            Err(e) => return ToolExecution::tool_error(format!("Cannot read '{}': {}", raw, e)),
        };

        match parse_wav(&bytes) {
            Ok(layout) => ToolExecution::success(json!({
                "path": raw,
                "channels": layout.channels,
                "sample_rate": layout.sample_rate,
                "bits_per_sample": layout.bits_per_sample,
                "frames": layout.frames(),
                "duration_seconds": layout.duration_seconds()
            })),
            Err(msg) => ToolExecution::tool_error(format!("Cannot parse '{}': {}", raw, msg)),
        }
    }
}

// ============================================================================
// Tool: slice_audio
// ============================================================================

/// Cuts a time range out of a WAV file into a new file
pub struct SliceAudioTool {
    root: PathBuf,
}

impl SliceAudioTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for SliceAudioTool {
    fn name(&self) -> &str {
        "slice_audio"
    }

    fn description(&self) -> &str {
        "Extract a time range from a PCM WAV file into a new WAV file. Times are in seconds; the end is clamped to the file duration."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Source WAV file path relative to the root"
                },
                "start_seconds": {
                    "type": "number",
                    "description": "Slice start in seconds (>= 0)"
                },
                "end_seconds": {
                    "type": "number",
                    "description": "Slice end in seconds (> start)"
                },
                "output_path": {
                    "type": "string",
                    "description": "Destination WAV file path relative to the root"
                }
            },
            "required": ["path", "start_seconds", "end_seconds", "output_path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecution {
        let Some(raw) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolExecution::tool_error("Missing required parameter: path");
        };
        let Some(raw_out) = arguments.get("output_path").and_then(|v| v.as_str()) else {
            return ToolExecution::tool_error("Missing required parameter: output_path");
        };
        let start = arguments
            .get("start_seconds")
            .and_then(|v| v.as_f64())
            .unwrap_or(-1.0);
        let end = arguments
            .get("end_seconds")
            .and_then(|v| v.as_f64())
            .unwrap_or(-1.0);

        if start < 0.0 || end <= start {
            return ToolExecution::tool_error(
                "start_seconds must be >= 0 and end_seconds must be greater than start_seconds",
            );
        }

        let source = match resolve(&self.root, raw) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };
        let dest = match resolve(&self.root, raw_out) {
            Ok(p) => p,
            Err(msg) => return ToolExecution::tool_error(msg),
        };

        let bytes = match tokio::fs::read(&source).await {
            Ok(b) => b,
            Err(e) => return ToolExecution::tool_error(format!("Cannot read '{}': {}", raw, e)),
        };

        let layout = match parse_wav(&bytes) {
            Ok(layout) => layout,
            Err(msg) => {
                return ToolExecution::tool_error(format!("Cannot parse '{}': {}", raw, msg))
            }
        };

        let frame = layout.bytes_per_frame();
        let total_frames = layout.frames();
        let start_frame = (start * layout.sample_rate as f64) as usize;
        let end_frame = ((end * layout.sample_rate as f64) as usize).min(total_frames);

        if start_frame >= total_frames {
            return ToolExecution::tool_error(format!(
                "start_seconds {} is beyond the file duration {:.3}s",
                start,
                layout.duration_seconds()
            ));
        }

        let from = layout.data_offset + start_frame * frame;
        let to = layout.data_offset + end_frame * frame;
        let sliced = build_wav(&layout, &bytes[from..to]);

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolExecution::internal_error(format!(
                    "Failed to create parent directories for '{}': {}",
                    raw_out, e
                ));
            }
        }

        let written = sliced.len();
        if let Err(e) = tokio::fs::write(&dest, sliced).await {
            return ToolExecution::tool_error(format!("Cannot write '{}': {}", raw_out, e));
        }

        ToolExecution::success(json!({
            "path": raw,
            "output_path": raw_out,
            "start_seconds": start_frame as f64 / layout.sample_rate as f64,
            "duration_seconds": (end_frame - start_frame) as f64 / layout.sample_rate as f64,
            "frames": end_frame - start_frame,
            "bytes": written
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
