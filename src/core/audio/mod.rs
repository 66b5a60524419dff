//! Call audio recording.
//!
//! The media stream carries G.711 mu-law at 8kHz. During a call the bridge
//! accumulates raw mu-law bytes per track; on `stop` the [`Recorder`] decodes
//! them to 16-bit PCM and writes one playable WAV per track.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;
use tracing::info;

/// Sample rate of telephony audio.
pub const SAMPLE_RATE: u32 = 8000;

/// Errors from recording finalization.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
}

/// Decode one G.711 mu-law byte to a linear 16-bit sample.
pub fn ulaw_to_linear(byte: u8) -> i16 {
    let u = !byte;
    let sign = u & 0x80 != 0;
    let exponent = (u >> 4) & 0x07;
    let mantissa = (u & 0x0F) as i16;

    let magnitude = ((mantissa << 3) + 0x84) << exponent;
    let sample = magnitude - 0x84;

    if sign {
        -sample
    } else {
        sample
    }
}

/// Decode a mu-law buffer to PCM samples.
pub fn decode_ulaw(data: &[u8]) -> Vec<i16> {
    data.iter().copied().map(ulaw_to_linear).collect()
}

/// Paths of the files produced for one call.
#[derive(Debug, Clone, Default)]
pub struct RecordingPaths {
    pub inbound: Option<PathBuf>,
    pub outbound: Option<PathBuf>,
}

/// Finalizes per-call audio buffers into WAV files on disk.
#[derive(Debug, Clone)]
pub struct Recorder {
    dir: PathBuf,
}

impl Recorder {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding one call's recordings.
    pub fn call_dir(&self, stream_sid: &str) -> PathBuf {
        self.dir.join(stream_sid)
    }

    /// Path of one track's WAV file. `track` is `inbound` or `outbound`.
    pub fn track_path(&self, stream_sid: &str, track: &str) -> PathBuf {
        self.call_dir(stream_sid).join(format!("{track}.wav"))
    }

    /// Write both tracks for a finished call. Empty buffers produce no file,
    /// so a call that never carried media leaves nothing behind.
    pub fn finalize(
        &self,
        stream_sid: &str,
        inbound_ulaw: &[u8],
        outbound_ulaw: &[u8],
    ) -> Result<RecordingPaths, AudioError> {
        let mut paths = RecordingPaths::default();

        if inbound_ulaw.is_empty() && outbound_ulaw.is_empty() {
            return Ok(paths);
        }

        std::fs::create_dir_all(self.call_dir(stream_sid))?;

        if !inbound_ulaw.is_empty() {
            let path = self.track_path(stream_sid, "inbound");
            write_wav(&path, inbound_ulaw)?;
            paths.inbound = Some(path);
        }
        if !outbound_ulaw.is_empty() {
            let path = self.track_path(stream_sid, "outbound");
            write_wav(&path, outbound_ulaw)?;
            paths.outbound = Some(path);
        }

        info!(
            stream_sid,
            inbound_bytes = inbound_ulaw.len(),
            outbound_bytes = outbound_ulaw.len(),
            "Recording finalized"
        );
        Ok(paths)
    }
}

fn write_wav(path: &Path, ulaw: &[u8]) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in decode_ulaw(ulaw) {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulaw_silence_decodes_to_zero() {
        // 0xFF and 0x7F are the two mu-law encodings of zero.
        assert_eq!(ulaw_to_linear(0xFF), 0);
        assert_eq!(ulaw_to_linear(0x7F), 0);
    }

    #[test]
    fn test_ulaw_extremes() {
        assert_eq!(ulaw_to_linear(0x80), 32124);
        assert_eq!(ulaw_to_linear(0x00), -32124);
    }

    #[test]
    fn test_decode_buffer_length() {
        let pcm = decode_ulaw(&[0xFF, 0x80, 0x00]);
        assert_eq!(pcm, vec![0, 32124, -32124]);
    }

    #[test]
    fn test_finalize_writes_wav_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf());

        let paths = recorder
            .finalize("MZtest", &[0xFF; 160], &[0x80; 320])
            .unwrap();

        let inbound = paths.inbound.unwrap();
        let outbound = paths.outbound.unwrap();
        assert!(inbound.ends_with("MZtest/inbound.wav"));
        assert!(outbound.ends_with("MZtest/outbound.wav"));

        let reader = hound::WavReader::open(&inbound).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 160);
    }

    #[test]
    fn test_finalize_with_no_audio_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf());

        let paths = recorder.finalize("MZempty", &[], &[]).unwrap();
        assert!(paths.inbound.is_none());
        assert!(paths.outbound.is_none());
        assert!(!recorder.call_dir("MZempty").exists());
    }

    #[test]
    fn test_finalize_skips_empty_track() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf());

        let paths = recorder.finalize("MZhalf", &[0xFF; 10], &[]).unwrap();
        assert!(paths.inbound.is_some());
        assert!(paths.outbound.is_none());
    }
}
