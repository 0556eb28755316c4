//! Audio decoding using symphonia.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::io::Cursor;

use audiolet_core::{Error, Result};
use bytes::Bytes;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_OPUS},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::opus_decode::{OpusPacketDecoder, OPUS_SAMPLE_RATE};

/// Interleaved PCM as it came out of the codec.
#[derive(Debug, Clone)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Pcm {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Rate and channel count of the decoded signal.
///
/// The first decoded packet fixes the layout. Decoded chunks are concatenated
/// into one buffer, so a later change is rejected rather than mislabeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamLayout {
    sample_rate: u32,
    channels: u16,
    locked: bool,
}

impl StreamLayout {
    const fn announced(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            locked: false,
        }
    }

    fn observe(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        if self.locked && (sample_rate != self.sample_rate || channels != self.channels) {
            return Err(Error::DecodeFailure(format!(
                "Stream changed from {} Hz/{} channels to {sample_rate} Hz/{channels} channels mid-file",
                self.sample_rate, self.channels
            )));
        }
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.locked = true;
        Ok(())
    }
}

/// Codec behind a demuxed track.
enum PacketDecoder {
    Symphonia(Box<dyn Decoder>),
    /// Opus tracks, which symphonia can demux but not decode.
    Opus(OpusPacketDecoder),
}

/// Audio decoder wrapping symphonia.
pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: PacketDecoder,
    track_id: u32,
    layout: StreamLayout,
}

impl AudioDecoder {
    /// Create a new decoder from a byte buffer.
    pub fn from_bytes(data: Bytes, mime_hint: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(data)),
            MediaSourceStreamOptions::default(),
        );

        let mut hint = Hint::new();
        if let Some(ext) = mime_hint.and_then(extension_for_mime) {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };

        let detected = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| Error::DecodeFailure(format!("Failed to detect format: {e}")))?;

        let format = detected.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::DecodeFailure("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let params = &track.codec_params;
        let mut sample_rate = params.sample_rate.unwrap_or(48000);
        let mut channels = params.channels.map_or(2, |c| c.count() as u16);

        let decoder = match symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
        {
            Ok(decoder) => PacketDecoder::Symphonia(decoder),
            Err(SymphoniaError::Unsupported(_)) if params.codec == CODEC_TYPE_OPUS => {
                debug!("No symphonia codec for Opus track {track_id}, using libopus");
                let opus = OpusPacketDecoder::from_track(
                    params.extra_data.as_deref(),
                    params.channels.map(|c| c.count() as u16),
                )?;
                sample_rate = OPUS_SAMPLE_RATE;
                channels = opus.channels();
                PacketDecoder::Opus(opus)
            }
            Err(e) => {
                return Err(Error::DecodeFailure(format!("Failed to create decoder: {e}")));
            }
        };

        debug!(
            "Audio track: id={}, sample_rate={}, channels={}",
            track_id, sample_rate, channels
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            layout: StreamLayout::announced(sample_rate, channels),
        })
    }

    pub const fn sample_rate(&self) -> u32 {
        self.layout.sample_rate
    }

    pub const fn channels(&self) -> u16 {
        self.layout.channels
    }

    /// Decode the next packet and return interleaved f32 samples.
    ///
    /// The reported rate and channel count follow the decoded signal, which
    /// can differ from what the container header announced. A stream whose
    /// layout changes after the first packet fails with `DecodeFailure`.
    pub fn decode_next(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None); // End of stream
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => {
                    return Err(Error::DecodeFailure(format!("Failed to read packet: {e}")));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match &mut self.decoder {
                PacketDecoder::Symphonia(decoder) => match decoder.decode(&packet) {
                    Ok(decoded) => {
                        let spec = *decoded.spec();
                        self.layout
                            .observe(spec.rate, spec.channels.count() as u16)?;

                        let mut samples =
                            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                        samples.copy_interleaved_ref(decoded);
                        return Ok(Some(samples.samples().to_vec()));
                    }
                    Err(SymphoniaError::DecodeError(e)) => {
                        // Log and skip corrupt frames
                        warn!("Decode error (skipping): {e}");
                    }
                    Err(e) => {
                        return Err(Error::DecodeFailure(format!("Decode failed: {e}")));
                    }
                },
                PacketDecoder::Opus(decoder) => match decoder.decode(&packet.data) {
                    Ok(samples) => {
                        let channels = decoder.channels();
                        self.layout.observe(OPUS_SAMPLE_RATE, channels)?;
                        return Ok(Some(samples));
                    }
                    Err(e) => warn!("{e} (skipping)"),
                },
            }
        }
    }

    /// Decode every remaining packet.
    pub fn decode_to_end(mut self) -> Result<Pcm> {
        let mut samples = Vec::new();
        while let Some(chunk) = self.decode_next()? {
            samples.extend_from_slice(&chunk);
        }

        if samples.is_empty() {
            return Err(Error::DecodeFailure("Stream contained no audio".to_string()));
        }

        Ok(Pcm {
            samples,
            sample_rate: self.layout.sample_rate,
            channels: self.layout.channels,
        })
    }
}

/// Decode a complete in-memory file.
pub fn decode_bytes(data: Bytes, mime_hint: Option<&str>) -> Result<Pcm> {
    debug!("Decoding {} bytes", data.len());
    AudioDecoder::from_bytes(data, mime_hint)?.decode_to_end()
}

/// Map a MIME type (or bare extension) to a container hint.
fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("webm") || mime.contains("weba") {
        Some("webm")
    } else if mime.contains("opus") || mime.contains("ogg") || mime.contains("vorbis") {
        Some("ogg")
    } else if mime.contains("mp4") || mime.contains("m4a") || mime.contains("aac") {
        Some("m4a")
    } else if mime.contains("mp3") || mime.contains("mpeg") {
        Some("mp3")
    } else if mime.contains("wav") || mime.contains("wave") {
        Some("wav")
    } else if mime.contains("flac") {
        Some("flac")
    } else {
        None
    }
}

/// Convert interleaved samples between channel layouts.
///
/// Mono fans out to every channel, downmixing to mono averages, and any other
/// change maps output channels onto input channels cyclically.
pub fn remix_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = usize::from(from.max(1));
    let to = usize::from(to.max(1));
    if from == to {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut output = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            output.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for ch in 0..to {
                output.push(frame[ch % from]);
            }
        }
    }

    output
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a 16-bit PCM WAV file in memory.
    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Bytes {
        let data_len = (frames * usize::from(channels) * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);

        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * u32::from(channels) * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());

        for frame in 0..frames {
            // Square wave at half scale
            let value: i16 = if (frame / 8) % 2 == 0 { 16384 } else { -16384 };
            for _ in 0..channels {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        Bytes::from(out)
    }

    /// MPEG-1 Layer III frames of digital silence (128 kbps, 44.1 kHz, mono).
    pub(crate) fn mp3_silence(frames: usize) -> Bytes {
        // 144 * 128000 / 44100, no padding
        const FRAME_LEN: usize = 417;
        let mut out = Vec::with_capacity(frames * FRAME_LEN);
        for _ in 0..frames {
            let mut frame = vec![0u8; FRAME_LEN];
            frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
            // Zeroed side info: no main data, every granule empty
            out.extend_from_slice(&frame);
        }
        Bytes::from(out)
    }

    fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len());
        out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn mp4_full_box(kind: &[u8; 4], flags: u32, payload: &[u8]) -> Vec<u8> {
        let mut body = flags.to_be_bytes().to_vec(); // version 0
        body.extend_from_slice(payload);
        mp4_box(kind, &body)
    }

    /// An M4A file holding silent AAC-LC frames (48 kHz, mono).
    pub(crate) fn m4a_silence(frames: u32) -> Bytes {
        // Single channel element, no scale factor bands, then END
        const SILENT_FRAME: [u8; 4] = [0x00, 0xC8, 0x00, 0x07];
        const RATE: u32 = 48_000;
        let duration = frames * 1024;

        let unity_matrix: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];
        let matrix: Vec<u8> = unity_matrix.iter().flat_map(|v| v.to_be_bytes()).collect();

        let mut mvhd = Vec::new();
        mvhd.extend_from_slice(&[0; 8]); // creation, modification
        mvhd.extend_from_slice(&RATE.to_be_bytes());
        mvhd.extend_from_slice(&duration.to_be_bytes());
        mvhd.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate
        mvhd.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
        mvhd.extend_from_slice(&[0; 10]);
        mvhd.extend_from_slice(&matrix);
        mvhd.extend_from_slice(&[0; 24]);
        mvhd.extend_from_slice(&2u32.to_be_bytes()); // next track id

        let mut tkhd = Vec::new();
        tkhd.extend_from_slice(&[0; 8]);
        tkhd.extend_from_slice(&1u32.to_be_bytes()); // track id
        tkhd.extend_from_slice(&[0; 4]);
        tkhd.extend_from_slice(&duration.to_be_bytes());
        tkhd.extend_from_slice(&[0; 8]);
        tkhd.extend_from_slice(&[0, 0, 0, 0, 0x01, 0x00, 0, 0]); // layer, group, volume
        tkhd.extend_from_slice(&matrix);
        tkhd.extend_from_slice(&[0; 8]); // width, height

        let mut mdhd = Vec::new();
        mdhd.extend_from_slice(&[0; 8]);
        mdhd.extend_from_slice(&RATE.to_be_bytes());
        mdhd.extend_from_slice(&duration.to_be_bytes());
        mdhd.extend_from_slice(&0x55C4u16.to_be_bytes()); // "und"
        mdhd.extend_from_slice(&[0; 2]);

        let mut hdlr = vec![0; 4];
        hdlr.extend_from_slice(b"soun");
        hdlr.extend_from_slice(&[0; 12]);
        hdlr.extend_from_slice(b"audio\0");

        // ES descriptor: AAC-LC, 48 kHz, mono
        let esds = [
            0x03, 0x19, 0x00, 0x01, 0x00, //
            0x04, 0x11, 0x40, 0x15, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, //
            0x05, 0x02, 0x11, 0x88, //
            0x06, 0x01, 0x02,
        ];
        let mut mp4a = vec![0; 6];
        mp4a.extend_from_slice(&1u16.to_be_bytes()); // data reference index
        mp4a.extend_from_slice(&[0; 8]);
        mp4a.extend_from_slice(&1u16.to_be_bytes()); // channels
        mp4a.extend_from_slice(&16u16.to_be_bytes()); // sample size
        mp4a.extend_from_slice(&[0; 4]);
        mp4a.extend_from_slice(&(RATE << 16).to_be_bytes());
        mp4a.extend_from_slice(&mp4_full_box(b"esds", 0, &esds));

        let mut stsd = 1u32.to_be_bytes().to_vec();
        stsd.extend_from_slice(&mp4_box(b"mp4a", &mp4a));

        let mut stts = 1u32.to_be_bytes().to_vec();
        stts.extend_from_slice(&frames.to_be_bytes());
        stts.extend_from_slice(&1024u32.to_be_bytes());

        let mut stsc = 1u32.to_be_bytes().to_vec();
        stsc.extend_from_slice(&1u32.to_be_bytes());
        stsc.extend_from_slice(&frames.to_be_bytes());
        stsc.extend_from_slice(&1u32.to_be_bytes());

        let mut stsz = 0u32.to_be_bytes().to_vec();
        stsz.extend_from_slice(&frames.to_be_bytes());
        for _ in 0..frames {
            stsz.extend_from_slice(&(SILENT_FRAME.len() as u32).to_be_bytes());
        }

        let ftyp = mp4_box(b"ftyp", b"M4A \0\0\0\0M4A mp42isom");

        let moov_with_offset = |offset: u32| {
            let mut stco = 1u32.to_be_bytes().to_vec();
            stco.extend_from_slice(&offset.to_be_bytes());

            let stbl = [
                mp4_full_box(b"stsd", 0, &stsd),
                mp4_full_box(b"stts", 0, &stts),
                mp4_full_box(b"stsc", 0, &stsc),
                mp4_full_box(b"stsz", 0, &stsz),
                mp4_full_box(b"stco", 0, &stco),
            ]
            .concat();

            let mut dref = 1u32.to_be_bytes().to_vec();
            dref.extend_from_slice(&mp4_full_box(b"url ", 1, &[]));

            let minf = [
                mp4_full_box(b"smhd", 0, &[0; 4]),
                mp4_box(b"dinf", &mp4_full_box(b"dref", 0, &dref)),
                mp4_box(b"stbl", &stbl),
            ]
            .concat();

            let mdia = [
                mp4_full_box(b"mdhd", 0, &mdhd),
                mp4_full_box(b"hdlr", 0, &hdlr),
                mp4_box(b"minf", &minf),
            ]
            .concat();

            let trak = [
                mp4_full_box(b"tkhd", 7, &tkhd),
                mp4_box(b"mdia", &mdia),
            ]
            .concat();

            mp4_box(
                b"moov",
                &[mp4_full_box(b"mvhd", 0, &mvhd), mp4_box(b"trak", &trak)].concat(),
            )
        };

        // The moov size does not depend on the chunk offset it carries.
        let moov_len = moov_with_offset(0).len();
        let data_offset = (ftyp.len() + moov_len + 8) as u32;
        let samples: Vec<u8> = (0..frames).flat_map(|_| SILENT_FRAME).collect();

        Bytes::from(
            [
                ftyp,
                moov_with_offset(data_offset),
                mp4_box(b"mdat", &samples),
            ]
            .concat(),
        )
    }

    fn ogg_crc(data: &[u8]) -> u32 {
        let mut crc = 0u32;
        for &byte in data {
            crc ^= u32::from(byte) << 24;
            for _ in 0..8 {
                crc = if crc & 0x8000_0000 == 0 {
                    crc << 1
                } else {
                    (crc << 1) ^ 0x04C1_1DB7
                };
            }
        }
        crc
    }

    /// Append one Ogg page carrying a single packet.
    fn ogg_page(out: &mut Vec<u8>, header_type: u8, granule: u64, sequence: u32, packet: &[u8]) {
        let start = out.len();
        out.extend_from_slice(b"OggS");
        out.push(0);
        out.push(header_type);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&0x4155_4449u32.to_le_bytes()); // serial
        out.extend_from_slice(&sequence.to_le_bytes());
        out.extend_from_slice(&[0; 4]); // checksum, filled below

        let mut lacing = vec![255u8; packet.len() / 255];
        lacing.push((packet.len() % 255) as u8);
        out.push(lacing.len() as u8);
        out.extend_from_slice(&lacing);
        out.extend_from_slice(packet);

        let crc = ogg_crc(&out[start..]);
        out[start + 22..start + 26].copy_from_slice(&crc.to_le_bytes());
    }

    /// An Ogg Opus file: `packets` 20 ms frames of a 440 Hz tone at half scale.
    pub(crate) fn ogg_opus(packets: usize, pre_skip: u16) -> Bytes {
        const FRAME: usize = 960;

        let mut head = b"OpusHead".to_vec();
        head.extend_from_slice(&[1, 1]); // version, mono
        head.extend_from_slice(&pre_skip.to_le_bytes());
        head.extend_from_slice(&48_000u32.to_le_bytes());
        head.extend_from_slice(&[0, 0, 0]); // gain, mapping family

        let mut tags = b"OpusTags".to_vec();
        tags.extend_from_slice(&4u32.to_le_bytes());
        tags.extend_from_slice(b"test");
        tags.extend_from_slice(&0u32.to_le_bytes());

        let mut out = Vec::new();
        ogg_page(&mut out, 0x02, 0, 0, &head);
        ogg_page(&mut out, 0x00, 0, 1, &tags);

        let mut encoder =
            ::opus::Encoder::new(48_000, ::opus::Channels::Mono, ::opus::Application::Audio)
                .unwrap();
        let mut packet = vec![0u8; 4000];
        for i in 0..packets {
            let pcm: Vec<f32> = (0..FRAME)
                .map(|n| {
                    let t = (i * FRAME + n) as f32 / 48_000.0;
                    0.5 * (std::f32::consts::TAU * 440.0 * t).sin()
                })
                .collect();
            let len = encoder.encode_float(&pcm, &mut packet).unwrap();

            let header_type = if i + 1 == packets { 0x04 } else { 0x00 };
            let granule = ((i + 1) * FRAME) as u64;
            ogg_page(&mut out, header_type, granule, (i + 2) as u32, &packet[..len]);
        }

        Bytes::from(out)
    }

    #[test]
    fn test_decode_wav() {
        let pcm = decode_bytes(wav_bytes(8000, 1, 800), Some("audio/wav")).unwrap();
        assert_eq!(pcm.sample_rate, 8000);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.frames(), 800);
        assert!((pcm.samples[0] - 0.5).abs() < 0.01);
        assert!((pcm.samples[8] + 0.5).abs() < 0.01);
    }

    #[test]
    fn test_decode_without_hint() {
        let pcm = decode_bytes(wav_bytes(22050, 2, 300), None).unwrap();
        assert_eq!(pcm.channels, 2);
        assert_eq!(pcm.frames(), 300);
    }

    #[test]
    fn test_decode_mp3() {
        let pcm = decode_bytes(mp3_silence(10), Some("audio/mpeg")).unwrap();
        assert_eq!(pcm.sample_rate, 44100);
        assert_eq!(pcm.channels, 1);
        assert!(pcm.frames() > 0 && pcm.frames() <= 10 * 1152);
        assert!(pcm.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_decode_m4a() {
        let pcm = decode_bytes(m4a_silence(8), Some("audio/mp4")).unwrap();
        assert_eq!(pcm.sample_rate, 48000);
        assert_eq!(pcm.channels, 1);
        assert!(pcm.frames() > 0 && pcm.frames() <= 8 * 1024);
        assert!(pcm.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_decode_ogg_opus() {
        let pcm = decode_bytes(ogg_opus(25, 312), Some("audio/ogg")).unwrap();
        assert_eq!(pcm.sample_rate, 48000);
        assert_eq!(pcm.channels, 1);
        // 25 packets of 960 frames, less the pre-skip
        assert!(pcm.frames() <= 25 * 960 - 312);
        assert!(pcm.frames() > 24 * 960 - 312);

        let peak = pcm.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.2, "peak {peak}");
    }

    #[test]
    fn test_decode_ogg_opus_without_hint() {
        let pcm = decode_bytes(ogg_opus(5, 0), None).unwrap();
        assert_eq!(pcm.sample_rate, 48000);
        assert!(pcm.frames() > 4 * 960 && pcm.frames() <= 5 * 960);
    }

    #[test]
    fn test_layout_change_rejected() {
        let mut layout = StreamLayout::announced(48000, 2);
        // The first packet may correct what the container announced
        layout.observe(44100, 2).unwrap();
        layout.observe(44100, 2).unwrap();

        assert!(matches!(
            layout.observe(44100, 1),
            Err(Error::DecodeFailure(_))
        ));
        assert!(matches!(
            layout.observe(22050, 2),
            Err(Error::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_bytes(Bytes::from_static(b"definitely not audio"), None).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }

    #[test]
    fn test_decode_empty_fails() {
        let err = decode_bytes(Bytes::new(), Some("audio/mpeg")).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for_mime("audio/webm"), Some("webm"));
        assert_eq!(extension_for_mime("audio/mp4"), Some("m4a"));
        assert_eq!(extension_for_mime("audio/wav"), Some("wav"));
        assert_eq!(extension_for_mime("text/plain"), None);
    }

    #[test]
    fn test_remix_mono_to_stereo() {
        assert_eq!(remix_channels(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_remix_stereo_to_mono() {
        let mono = remix_channels(&[0.2, 0.4, -1.0, 1.0], 2, 1);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn test_remix_same_layout() {
        assert_eq!(remix_channels(&[0.1, 0.2], 2, 2), vec![0.1, 0.2]);
    }
}
