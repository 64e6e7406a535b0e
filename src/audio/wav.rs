//! WAV container framing for the accumulated PCM payload.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

use crate::config::BufferConfig;
use crate::protocol::ProtocolError;

/// If `data` begins with the `RIFF` tag, parse it as a WAV container and
/// return the PCM payload. Otherwise the bytes are already raw PCM.
///
/// Parse failures fall back to the raw-PCM interpretation rather than
/// propagating an error — the source's `_extract_pcm_from_wav` does the
/// same, since a malformed WAV header is a client mistake, not a reason to
/// drop the audio.
pub fn extract_pcm(data: &[u8]) -> Vec<u8> {
    if data.len() < 4 || &data[0..4] != b"RIFF" {
        return data.to_vec();
    }

    match hound::WavReader::new(Cursor::new(data)) {
        Ok(mut reader) => {
            let spec = reader.spec();
            if spec.sample_format == SampleFormat::Int && spec.bits_per_sample == 16 {
                reader
                    .samples::<i16>()
                    .filter_map(Result::ok)
                    .flat_map(|s| s.to_le_bytes())
                    .collect()
            } else {
                data.to_vec()
            }
        }
        Err(_) => data.to_vec(),
    }
}

/// Like [`extract_pcm`], but a WAV container that parses successfully and
/// declares a sample rate or channel count other than `config`'s is a
/// client error, not a fallback case (§6: "any other sample rate or channel
/// count is a client error ... do not attempt conversion in the core"). A
/// WAV header that fails to parse at all still falls back to raw PCM.
pub fn extract_pcm_checked(data: &[u8], config: &BufferConfig) -> Result<Vec<u8>, ProtocolError> {
    if data.len() < 4 || &data[0..4] != b"RIFF" {
        return Ok(data.to_vec());
    }

    match hound::WavReader::new(Cursor::new(data)) {
        Ok(mut reader) => {
            let spec = reader.spec();
            if spec.sample_rate != config.sample_rate || spec.channels != config.channels {
                return Err(ProtocolError::UnsupportedAudioFormat {
                    message: format!(
                        "expected {}Hz/{}ch PCM, got {}Hz/{}ch",
                        config.sample_rate, config.channels, spec.sample_rate, spec.channels
                    ),
                });
            }
            if spec.sample_format == SampleFormat::Int && spec.bits_per_sample == 16 {
                Ok(reader
                    .samples::<i16>()
                    .filter_map(Result::ok)
                    .flat_map(|s| s.to_le_bytes())
                    .collect())
            } else {
                Ok(data.to_vec())
            }
        }
        Err(_) => Ok(data.to_vec()),
    }
}

/// Wrap raw 16-bit LE PCM in a self-describing WAV container for the given
/// buffer config.
pub fn wrap_pcm(pcm: &[u8], config: &BufferConfig) -> Vec<u8> {
    let spec = WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: config.sample_width * 8,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec).expect("valid wav spec");
        for chunk in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            writer.write_sample(sample).expect("write within allocated buffer");
        }
        writer.finalize().expect("finalize wav header");
    }
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_pcm_passes_through_untouched() {
        let pcm = vec![1u8, 2, 3, 4];
        assert_eq!(extract_pcm(&pcm), pcm);
    }

    #[test]
    fn malformed_riff_falls_back_to_raw() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&[0, 1, 2, 3]);
        // Not a valid WAV container past the tag — must not panic or error.
        let extracted = extract_pcm(&data);
        assert_eq!(extracted, data);
    }

    #[test]
    fn checked_accepts_matching_format() {
        let config = BufferConfig::default();
        let pcm: Vec<u8> = (0..100u8).collect();
        let wrapped = wrap_pcm(&pcm, &config);
        assert_eq!(extract_pcm_checked(&wrapped, &config).unwrap(), pcm);
    }

    #[test]
    fn checked_rejects_mismatched_sample_rate() {
        let config = BufferConfig::default();
        let mut other = config;
        other.sample_rate = 8_000;
        let wrapped = wrap_pcm(&[0u8; 4], &other);
        assert!(extract_pcm_checked(&wrapped, &config).is_err());
    }

    #[test]
    fn checked_rejects_mismatched_channel_count() {
        let config = BufferConfig::default();
        let mut other = config;
        other.channels = 2;
        let wrapped = wrap_pcm(&[0u8; 4], &other);
        assert!(extract_pcm_checked(&wrapped, &config).is_err());
    }

    #[test]
    fn checked_falls_back_to_raw_on_malformed_riff() {
        let config = BufferConfig::default();
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&[0, 1, 2, 3]);
        assert_eq!(extract_pcm_checked(&data, &config).unwrap(), data);
    }

    #[test]
    fn wrap_then_extract_round_trips_pcm() {
        let config = BufferConfig::default();
        let pcm: Vec<u8> = (0..100u8).collect();
        let wrapped = wrap_pcm(&pcm, &config);
        assert_eq!(&wrapped[0..4], b"RIFF");
        let extracted = extract_pcm(&wrapped);
        assert_eq!(extracted, pcm);
    }
}
