// FILE: src/core/audio.rs
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use lewton::inside_ogg::OggStreamReader;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Everything the game needs from a sound device. Implementations must never panic on a
/// missing or broken file; they report it through the `Result` and the caller falls back.
pub trait AudioOutput {
    /// Decodes a music track and makes it current. Returns its length. A decode that has
    /// not finished within `timeout` is abandoned and reported as an error.
    fn load_music(&mut self, path: &Path, timeout: Duration) -> Result<Duration, Box<dyn Error>>;
    fn play_music(&mut self, from_start: bool);
    fn pause_music(&mut self);
    fn stop_music(&mut self);
    fn set_music_volume(&mut self, volume: f32);
    fn music_finished(&self) -> bool;

    fn load_sfx(&mut self, key: &str, path: &Path) -> Result<(), Box<dyn Error>>;
    fn play_sfx(&mut self, key: &str, volume: f32, looped: bool);
    fn stop_sfx(&mut self, key: &str);
}

impl<T: AudioOutput + ?Sized> AudioOutput for Box<T> {
    fn load_music(&mut self, path: &Path, timeout: Duration) -> Result<Duration, Box<dyn Error>> {
        (**self).load_music(path, timeout)
    }
    fn play_music(&mut self, from_start: bool) {
        (**self).play_music(from_start)
    }
    fn pause_music(&mut self) {
        (**self).pause_music()
    }
    fn stop_music(&mut self) {
        (**self).stop_music()
    }
    fn set_music_volume(&mut self, volume: f32) {
        (**self).set_music_volume(volume)
    }
    fn music_finished(&self) -> bool {
        (**self).music_finished()
    }
    fn load_sfx(&mut self, key: &str, path: &Path) -> Result<(), Box<dyn Error>> {
        (**self).load_sfx(key, path)
    }
    fn play_sfx(&mut self, key: &str, volume: f32, looped: bool) {
        (**self).play_sfx(key, volume, looped)
    }
    fn stop_sfx(&mut self, key: &str) {
        (**self).stop_sfx(key)
    }
}

// --- Null backend ---

/// Silent backend used when no output device is available. Files are still checked so
/// load failures surface the same way they do with a real device.
#[derive(Default)]
pub struct NullAudio;

impl AudioOutput for NullAudio {
    fn load_music(&mut self, path: &Path, timeout: Duration) -> Result<Duration, Box<dyn Error>> {
        let owned = path.to_path_buf();
        decode_off_thread(path, timeout, move || {
            decode_ogg(&owned).map(|d| d.duration()).map_err(|e| e.to_string())
        })
    }

    fn play_music(&mut self, _from_start: bool) {}
    fn pause_music(&mut self) {}
    fn stop_music(&mut self) {}
    fn set_music_volume(&mut self, _volume: f32) {}

    fn music_finished(&self) -> bool {
        false
    }

    fn load_sfx(&mut self, _key: &str, path: &Path) -> Result<(), Box<dyn Error>> {
        if path.is_file() {
            Ok(())
        } else {
            Err(format!("No such file: {:?}", path).into())
        }
    }

    fn play_sfx(&mut self, _key: &str, _volume: f32, _looped: bool) {}
    fn stop_sfx(&mut self, _key: &str) {}
}

// --- Device backend ---

pub struct DeviceAudio {
    _stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    sfx_cache: HashMap<String, Arc<Vec<f32>>>,
    device_sample_rate: u32,
    device_channels: usize,
}

impl DeviceAudio {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No audio output device")?;
        let config = device
            .default_output_config()
            .map_err(|e| format!("No default audio config: {}", e))?;
        let stream_config: StreamConfig = config.into();

        let device_sample_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels as usize;

        let mixer = Arc::new(Mutex::new(Mixer::new(device_channels)));
        let mixer_for_callback = mixer.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    // Real-time callback: never block for long, never allocate.
                    match mixer_for_callback.lock() {
                        Ok(mut mixer) => mixer.mix(data),
                        Err(_) => data.iter_mut().for_each(|s| *s = 0.0),
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("Failed to build audio stream: {}", e))?;
        stream
            .play()
            .map_err(|e| format!("Failed to play audio stream: {}", e))?;

        info!(
            "Audio engine initialized ({} Hz, {} ch).",
            device_sample_rate, device_channels
        );
        Ok(Self {
            _stream: stream,
            mixer,
            sfx_cache: HashMap::new(),
            device_sample_rate,
            device_channels,
        })
    }

    fn decode_for_device(&self, path: &Path) -> Result<Arc<Vec<f32>>, Box<dyn Error>> {
        let decoded = decode_ogg(path)?;
        let samples = resample_linear(
            &decoded.samples,
            decoded.channels,
            decoded.sample_rate,
            self.device_channels,
            self.device_sample_rate,
        );
        Ok(Arc::new(samples))
    }

    fn with_mixer(&self, f: impl FnOnce(&mut Mixer)) {
        match self.mixer.lock() {
            Ok(mut mixer) => f(&mut mixer),
            Err(_) => error!("Failed to lock audio mixer."),
        }
    }
}

impl AudioOutput for DeviceAudio {
    fn load_music(&mut self, path: &Path, timeout: Duration) -> Result<Duration, Box<dyn Error>> {
        info!("Loading music from: {:?}", path);
        let owned = path.to_path_buf();
        let (out_ch, out_hz) = (self.device_channels, self.device_sample_rate);
        let samples = decode_off_thread(path, timeout, move || {
            let decoded = decode_ogg(&owned).map_err(|e| e.to_string())?;
            Ok(Arc::new(resample_linear(
                &decoded.samples,
                decoded.channels,
                decoded.sample_rate,
                out_ch,
                out_hz,
            )))
        })?;
        let frames = samples.len() / out_ch.max(1);
        let length = Duration::from_secs_f64(frames as f64 / out_hz as f64);
        self.with_mixer(|mixer| mixer.set_music(samples));
        Ok(length)
    }

    fn play_music(&mut self, from_start: bool) {
        self.with_mixer(|mixer| mixer.play_music(from_start));
    }

    fn pause_music(&mut self) {
        self.with_mixer(|mixer| mixer.pause_music());
    }

    fn stop_music(&mut self) {
        self.with_mixer(|mixer| mixer.stop_music());
    }

    fn set_music_volume(&mut self, volume: f32) {
        self.with_mixer(|mixer| mixer.music_volume = volume.clamp(0.0, 1.0));
    }

    fn music_finished(&self) -> bool {
        self.mixer
            .lock()
            .map(|mixer| mixer.music_finished())
            .unwrap_or(false)
    }

    fn load_sfx(&mut self, key: &str, path: &Path) -> Result<(), Box<dyn Error>> {
        let samples = self.decode_for_device(path)?;
        self.sfx_cache.insert(key.to_string(), samples);
        debug!("Cached SFX: {}", key);
        Ok(())
    }

    fn play_sfx(&mut self, key: &str, volume: f32, looped: bool) {
        let Some(samples) = self.sfx_cache.get(key).cloned() else {
            warn!("Attempted to play unloaded SFX: {}", key);
            return;
        };
        let key = key.to_string();
        self.with_mixer(|mixer| mixer.start_voice(key, samples, volume, looped));
    }

    fn stop_sfx(&mut self, key: &str) {
        self.with_mixer(|mixer| mixer.stop_voice(key));
    }
}

// --- Mixer ---

struct MusicVoice {
    samples: Arc<Vec<f32>>,
    cursor: usize,
    playing: bool,
}

struct SfxVoice {
    key: String,
    samples: Arc<Vec<f32>>,
    cursor: usize,
    volume: f32,
    looped: bool,
}

/// Sums the current music track and every active effect voice into the device buffer.
pub(crate) struct Mixer {
    channels: usize,
    music: Option<MusicVoice>,
    music_volume: f32,
    voices: Vec<SfxVoice>,
}

impl Mixer {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            music: None,
            music_volume: 1.0,
            voices: Vec::new(),
        }
    }

    fn set_music(&mut self, samples: Arc<Vec<f32>>) {
        self.music = Some(MusicVoice { samples, cursor: 0, playing: false });
    }

    fn play_music(&mut self, from_start: bool) {
        if let Some(music) = self.music.as_mut() {
            if from_start {
                music.cursor = 0;
            }
            music.playing = true;
        }
    }

    fn pause_music(&mut self) {
        if let Some(music) = self.music.as_mut() {
            music.playing = false;
        }
    }

    fn stop_music(&mut self) {
        if let Some(music) = self.music.as_mut() {
            music.playing = false;
            music.cursor = 0;
        }
    }

    fn music_finished(&self) -> bool {
        self.music
            .as_ref()
            .is_some_and(|m| !m.samples.is_empty() && m.cursor >= m.samples.len())
    }

    fn start_voice(&mut self, key: String, samples: Arc<Vec<f32>>, volume: f32, looped: bool) {
        // Restarting a cue rewinds it instead of layering a second copy.
        self.voices.retain(|v| v.key != key);
        self.voices.push(SfxVoice { key, samples, cursor: 0, volume, looped });
    }

    fn stop_voice(&mut self, key: &str) {
        self.voices.retain(|v| v.key != key);
    }

    pub(crate) fn mix(&mut self, out: &mut [f32]) {
        out.iter_mut().for_each(|s| *s = 0.0);
        // Keep whole frames so channels never drift.
        let usable = out.len() - out.len() % self.channels;

        if let Some(music) = self.music.as_mut().filter(|m| m.playing) {
            let available = music.samples.len().saturating_sub(music.cursor);
            let n = available.min(usable);
            for (o, s) in out[..n].iter_mut().zip(&music.samples[music.cursor..music.cursor + n]) {
                *o += s * self.music_volume;
            }
            music.cursor += n;
            if music.cursor >= music.samples.len() {
                music.playing = false;
            }
        }

        self.voices.retain_mut(|voice| {
            let mut written = 0;
            while written < usable {
                if voice.cursor >= voice.samples.len() {
                    if voice.looped && !voice.samples.is_empty() {
                        voice.cursor = 0;
                    } else {
                        return false;
                    }
                }
                let n = (voice.samples.len() - voice.cursor).min(usable - written);
                for (o, s) in out[written..written + n]
                    .iter_mut()
                    .zip(&voice.samples[voice.cursor..voice.cursor + n])
                {
                    *o += s * voice.volume;
                }
                voice.cursor += n;
                written += n;
            }
            voice.looped || voice.cursor < voice.samples.len()
        });

        out.iter_mut().for_each(|s| *s = s.clamp(-1.0, 1.0));
    }
}

// --- Decoding ---

struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl DecodedAudio {
    fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels.max(1);
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Runs a music decode on its own thread and waits at most `timeout` for it. A decoder that
/// overruns keeps going in the background and its result is dropped.
fn decode_off_thread<T: Send + 'static>(
    path: &Path,
    timeout: Duration,
    job: impl FnOnce() -> Result<T, String> + Send + 'static,
) -> Result<T, Box<dyn Error>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("music-decoder".to_string())
        .spawn(move || {
            let _ = tx.send(job());
        })
        .map_err(|e| format!("Failed to spawn decoder thread: {}", e))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(Into::into),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(format!("Timed out after {:?} loading {:?}", timeout, path).into())
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(format!("Decoder thread for {:?} exited without a result", path).into())
        }
    }
}

/// Loads an Ogg Vorbis file fully into memory as interleaved f32 samples.
fn decode_ogg(path: &Path) -> Result<DecodedAudio, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("Failed to open {:?}: {}", path, e))?;
    let mut ogg = OggStreamReader::new(BufReader::new(file))
        .map_err(|e| format!("Failed to decode {:?}: {}", path, e))?;
    let channels = ogg.ident_hdr.audio_channels as usize;
    let sample_rate = ogg.ident_hdr.audio_sample_rate;

    let mut samples = Vec::new();
    while let Some(packet) = ogg
        .read_dec_packet_itl()
        .map_err(|e| format!("Corrupt packet in {:?}: {}", path, e))?
    {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }
    if samples.is_empty() {
        return Err(format!("{:?} decoded to zero samples", path).into());
    }
    Ok(DecodedAudio { samples, channels, sample_rate })
}

/// Linear-interpolating resampler with simple channel mapping (output channel `c` reads
/// input channel `c % in_ch`).
pub(crate) fn resample_linear(
    input: &[f32],
    in_ch: usize,
    in_hz: u32,
    out_ch: usize,
    out_hz: u32,
) -> Vec<f32> {
    if in_ch == 0 || out_ch == 0 || in_hz == 0 || out_hz == 0 {
        return Vec::new();
    }
    let in_frames = input.len() / in_ch;
    if in_frames == 0 {
        return Vec::new();
    }
    if in_hz == out_hz && in_ch == out_ch {
        return input[..in_frames * in_ch].to_vec();
    }

    let step = in_hz as f64 / out_hz as f64;
    let out_frames = (in_frames as f64 / step).floor() as usize;
    let mut out = Vec::with_capacity(out_frames * out_ch);
    for i in 0..out_frames {
        let pos = i as f64 * step;
        let i0 = (pos.floor() as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let t = (pos - i0 as f64) as f32;
        for c in 0..out_ch {
            let src = c % in_ch;
            let a = input[i0 * in_ch + src];
            let b = input[i1 * in_ch + src];
            out.push(a + (b - a) * t);
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_identity_copies_whole_frames() {
        let input = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(resample_linear(&input, 2, 44100, 2, 44100), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn resample_upmixes_mono_and_doubles_rate() {
        let input = [0.0, 1.0];
        let out = resample_linear(&input, 1, 22050, 2, 44100);
        assert_eq!(out.len(), 8);
        assert_eq!(&out[0..2], &[0.0, 0.0]);
        assert!((out[2] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], out[3]);
    }

    #[test]
    fn mixer_plays_music_to_the_end() {
        let mut mixer = Mixer::new(1);
        mixer.set_music(Arc::new(vec![0.5; 6]));
        let mut buf = [0.0f32; 4];
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.0; 4]);

        mixer.play_music(true);
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.5; 4]);
        assert!(!mixer.music_finished());
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.5, 0.5, 0.0, 0.0]);
        assert!(mixer.music_finished());
    }

    #[test]
    fn mixer_sums_voices_and_clamps() {
        let mut mixer = Mixer::new(1);
        mixer.start_voice("a".into(), Arc::new(vec![0.75; 2]), 1.0, false);
        mixer.start_voice("b".into(), Arc::new(vec![0.75; 4]), 1.0, false);
        let mut buf = [0.0f32; 4];
        mixer.mix(&mut buf);
        assert_eq!(buf, [1.0, 1.0, 0.75, 0.75]);
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.0; 4]);
    }

    #[test]
    fn looped_voice_wraps_until_stopped() {
        let mut mixer = Mixer::new(1);
        mixer.start_voice("loop".into(), Arc::new(vec![0.1, 0.2]), 1.0, true);
        let mut buf = [0.0f32; 5];
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.1, 0.2, 0.1, 0.2, 0.1]);
        mixer.stop_voice("loop");
        mixer.mix(&mut buf);
        assert_eq!(buf, [0.0; 5]);
    }

    #[test]
    fn null_audio_reports_missing_files() {
        let mut audio = NullAudio::default();
        assert!(audio.load_sfx("x", Path::new("/definitely/not/here.ogg")).is_err());
        assert!(audio
            .load_music(Path::new("/definitely/not/here.ogg"), Duration::from_secs(1))
            .is_err());
    }

    #[test]
    fn slow_decode_gives_up_at_the_timeout() {
        let started = std::time::Instant::now();
        let result = decode_off_thread(Path::new("slow.ogg"), Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(1u32)
        });
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.starts_with("Timed out"), "{}", err);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn decode_result_comes_back_from_the_worker() {
        let ok = decode_off_thread(Path::new("fast.ogg"), Duration::from_secs(5), || Ok(7u32));
        assert_eq!(ok.ok(), Some(7));

        let failed: Result<u32, _> =
            decode_off_thread(Path::new("bad.ogg"), Duration::from_secs(5), || Err("corrupt".to_string()));
        assert_eq!(failed.err().map(|e| e.to_string()).as_deref(), Some("corrupt"));
    }
}
