use std::{fs, io::Cursor, path::Path};

use metronome_core::{Click, ClickOutput, MetronomeError, Result, SamplePaths};
use rodio::{source::Buffered, Decoder, OutputStream, OutputStreamHandle, Source};

type Sample = Buffered<Decoder<Cursor<Vec<u8>>>>;

/// Both click samples, decoded once and replayed from memory.
pub struct ClickSamples {
    low: Sample,
    high: Sample,
}

impl ClickSamples {
    /// Reads and decodes `low.wav` and `high.wav`. Either one failing is a
    /// start-up error.
    pub fn load(paths: &SamplePaths) -> Result<Self> {
        paths.ensure_present()?;
        Ok(Self {
            low: decode(paths.path(Click::Low))?,
            high: decode(paths.path(Click::High))?,
        })
    }

    fn get(&self, click: Click) -> &Sample {
        match click {
            Click::Low => &self.low,
            Click::High => &self.high,
        }
    }
}

fn decode(path: &Path) -> Result<Sample> {
    let sample_error = |reason: String| MetronomeError::SampleLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|err| sample_error(err.to_string()))?;
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|err| sample_error(err.to_string()))?;
    let sample = decoder.buffered();
    if sample.clone().next().is_none() {
        return Err(sample_error("sample contains no audio frames".to_string()));
    }
    tracing::debug!(path = %path.display(), "loaded click sample");
    Ok(sample)
}

/// Click output on the default audio device.
pub struct DeviceOutput {
    // Dropping the stream silences the handle, so it lives as long as we do.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    samples: ClickSamples,
}

impl DeviceOutput {
    pub fn open(samples: ClickSamples) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| MetronomeError::AudioDevice(err.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
            samples,
        })
    }
}

impl ClickOutput for DeviceOutput {
    fn play(&mut self, click: Click) {
        let source = self.samples.get(click).clone().convert_samples::<f32>();
        if let Err(err) = self.handle.play_raw(source) {
            tracing::warn!(%err, ?click, "dropped click");
        }
    }
}

impl std::fmt::Debug for DeviceOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceOutput").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_samples_decode() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../snd");
        assert!(ClickSamples::load(&SamplePaths::in_dir(dir)).is_ok());
    }

    #[test]
    fn missing_directory_is_a_sample_error() {
        let paths = SamplePaths::in_dir("definitely/not/a/sound/dir");
        let err = ClickSamples::load(&paths).err().expect("load must fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn undecodable_sample_is_a_sample_error() {
        let dir = std::env::temp_dir().join("metronome-app-garbage-samples");
        fs::create_dir_all(&dir).unwrap();
        let paths = SamplePaths::in_dir(&dir);
        fs::write(&paths.low, b"this is not a wave file").unwrap();
        fs::write(&paths.high, b"neither is this").unwrap();

        match ClickSamples::load(&paths) {
            Err(MetronomeError::SampleLoad { path, .. }) => assert_eq!(path, paths.low),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("garbage decoded as audio"),
        }
    }
}
