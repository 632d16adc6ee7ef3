//! 端到端集成测试: 原始输入 → 编码 → 交错 → framecrc 输出.
//!
//! 使用透传编码器 (rawvideo + pcm_s16le), 输出为 framecrc 文本,
//! 解析文本后检查流信息、每路数据包与交错顺序.

use videopack::core::PackError;
use videopack::format::{OutputTarget, SharedBuffer};
use videopack::{
    PackConfig, PackStats, default_codec_registry, default_format_registry, pack, pack_readers,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FRAME_BYTES: usize = (WIDTH * HEIGHT * 3 / 2) as usize;

/// 生成视频输入: `count` 帧纯色 YUV420P, 每帧时间戳间隔 1000/fps 毫秒
fn make_video_input(count: u32, fps: u32) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..count {
        let ts_ms = i * 1000 / fps;
        out.extend_from_slice(&ts_ms.to_le_bytes());
        let y = FRAME_BYTES * 2 / 3;
        out.extend(std::iter::repeat_n(16 + (i % 200) as u8, y));
        out.extend(std::iter::repeat_n(128u8, FRAME_BYTES - y));
    }
    out
}

/// 生成音频输入: 立体声正弦波, 按 `chunk_size` 字节分块,
/// 时间戳取分块首个采样的毫秒时刻
fn make_audio_input(duration_ms: u32, sample_rate: u32, chunk_size: usize) -> Vec<u8> {
    let total = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
    let mut pcm = Vec::with_capacity(total * 4);
    for i in 0..total {
        let t = i as f64 / sample_rate as f64;
        let v = ((t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 8000.0) as i16;
        pcm.extend_from_slice(&v.to_le_bytes());
        pcm.extend_from_slice(&v.to_le_bytes());
    }
    let mut out = Vec::new();
    for (k, chunk) in pcm.chunks(chunk_size).enumerate() {
        let first_sample = (k * chunk_size / 4) as u64;
        let ts_ms = (first_sample * 1000 / sample_rate as u64) as u32;
        out.extend_from_slice(&ts_ms.to_le_bytes());
        out.extend_from_slice(chunk);
    }
    out
}

fn native_config() -> PackConfig {
    PackConfig {
        width: WIDTH,
        height: HEIGHT,
        video_codec: "rawvideo".into(),
        audio_codec: "pcm_s16le".into(),
        format: Some("framecrc".into()),
        ..PackConfig::default()
    }
}

/// framecrc 中的一行数据包记录
#[derive(Debug, Clone, PartialEq)]
struct CrcPacket {
    stream: usize,
    dts: i64,
    pts: i64,
    duration: i64,
    size: usize,
    crc: String,
}

fn parse_framecrc(text: &str) -> (Vec<String>, Vec<CrcPacket>) {
    let mut header = Vec::new();
    let mut packets = Vec::new();
    for line in text.lines() {
        if line.starts_with('#') {
            header.push(line.to_string());
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        assert!(fields.len() >= 6, "无效的数据包行: {line}");
        packets.push(CrcPacket {
            stream: fields[0].parse().unwrap(),
            dts: fields[1].parse().unwrap(),
            pts: fields[2].parse().unwrap(),
            duration: fields[3].parse().unwrap(),
            size: fields[4].parse().unwrap(),
            crc: fields[5].to_string(),
        });
    }
    (header, packets)
}

fn run_in_memory(config: &PackConfig, audio: &[u8], video: &[u8]) -> (String, PackStats) {
    let buffer = SharedBuffer::new();
    let stats = pack_readers(
        config,
        &default_codec_registry(),
        &default_format_registry(),
        audio,
        video,
        OutputTarget::Memory(buffer.clone()),
    )
    .unwrap();
    (buffer.to_string_lossy(), stats)
}

fn stream_packets(packets: &[CrcPacket], stream: usize) -> Vec<&CrcPacket> {
    packets.iter().filter(|p| p.stream == stream).collect()
}

#[test]
fn test_一秒音视频_framecrc() {
    let config = native_config();
    let audio = make_audio_input(1000, 44_100, config.audio_chunk_size);
    let video = make_video_input(25, 25);
    let (text, stats) = run_in_memory(&config, &audio, &video);
    let (header, packets) = parse_framecrc(&text);

    // 视频流在前, 音频流在后
    for expected in [
        "#tb 0: 1/25",
        "#media_type 0: video",
        "#codec_id 0: rawvideo",
        "#dimensions 0: 64x48",
        "#tb 1: 1/44100",
        "#media_type 1: audio",
        "#codec_id 1: pcm_s16le",
        "#sample_rate 1: 44100",
        "#channel_layout_name 1: stereo",
    ] {
        assert!(header.iter().any(|h| h == expected), "缺少头部行: {expected}");
    }
    assert!(text.ends_with('\n'));

    let video_pkts = stream_packets(&packets, 0);
    assert_eq!(video_pkts.len(), 25);
    assert!(video_pkts.iter().all(|p| p.size == FRAME_BYTES));
    let last = video_pkts[24];
    assert_eq!(last.pts + last.duration, 25, "视频应覆盖 1 秒");

    // 44100 个采样 / 1024 → 43 个完整帧, 不足一帧的尾部被丢弃
    let audio_pkts = stream_packets(&packets, 1);
    assert_eq!(audio_pkts.len(), 43);
    assert!(audio_pkts.iter().all(|p| p.size == 4096 && p.duration == 1024));
    for (i, p) in audio_pkts.iter().enumerate() {
        assert_eq!(p.pts, i as i64 * 1024);
    }
    let audio_end = (audio_pkts[42].pts + 1024) as f64 / 44_100.0;
    assert!((audio_end - 1.0).abs() < 0.03, "音频时长 {audio_end}");

    assert_eq!(stats.video.packets_out, 25);
    assert_eq!(stats.audio.packets_out, 43);
    assert_eq!(stats.video.end_time_us, 1_000_000);
    assert!((stats.audio.duration_secs() - 1.0).abs() < 0.03);
}

#[test]
fn test_交错顺序单调() {
    let config = native_config();
    let audio = make_audio_input(1000, 44_100, config.audio_chunk_size);
    let video = make_video_input(25, 25);
    let (text, _) = run_in_memory(&config, &audio, &video);
    let (_, packets) = parse_framecrc(&text);

    let seconds = |p: &CrcPacket| match p.stream {
        0 => p.pts as f64 / 25.0,
        _ => p.pts as f64 / 44_100.0,
    };
    // 每路 dts 严格递增
    for stream in [0, 1] {
        let pkts = stream_packets(&packets, stream);
        assert!(pkts.windows(2).all(|w| w[0].dts < w[1].dts));
    }
    // 全局按时间先后写出, 时间相同时视频在前
    for w in packets.windows(2) {
        let (a, b) = (seconds(&w[0]), seconds(&w[1]));
        assert!(a <= b + 1e-5, "交错顺序错误: {:?} 在 {:?} 之前", w[0], w[1]);
    }
    assert_eq!(packets[0].stream, 0);
    assert_eq!(packets[1].stream, 1);
}

#[test]
fn test_音频分块大小不影响输出() {
    let video = make_video_input(10, 25);
    let mut reference: Option<Vec<CrcPacket>> = None;
    // 10 ms, 20 ms, 40 ms 的分块
    for chunk_size in [1764usize, 3528, 7056] {
        let config = PackConfig {
            audio_chunk_size: chunk_size,
            ..native_config()
        };
        let audio = make_audio_input(400, 44_100, chunk_size);
        let (text, _) = run_in_memory(&config, &audio, &video);
        let (_, packets) = parse_framecrc(&text);
        let audio_pkts: Vec<CrcPacket> =
            stream_packets(&packets, 1).into_iter().cloned().collect();
        assert_eq!(audio_pkts.len(), 17);
        if let Some(r) = &reference {
            assert_eq!(r, &audio_pkts, "chunk_size={chunk_size}");
            continue;
        }
        reference = Some(audio_pkts);
    }
}

#[test]
fn test_文件输入输出() {
    let dir = tempfile::tempdir().unwrap();
    let video_path = dir.path().join("camera.i420");
    let audio_path = dir.path().join("mic.pcm");
    let output_path = dir.path().join("out.crc");

    let config = native_config();
    let audio = make_audio_input(1000, 44_100, config.audio_chunk_size);
    let video = make_video_input(25, 25);
    std::fs::write(&video_path, &video).unwrap();
    std::fs::write(&audio_path, &audio).unwrap();

    // 格式由 .crc 扩展名推断
    let config = PackConfig {
        format: None,
        video_input_path: Some(video_path),
        audio_input_path: Some(audio_path),
        output_path: Some(output_path.clone()),
        ..config
    };
    let stats = pack(&config).unwrap();
    assert_eq!(stats.total_packets(), 68);

    let written = std::fs::read_to_string(&output_path).unwrap();
    let (in_memory, _) = run_in_memory(&native_config(), &audio, &video);
    assert_eq!(written, in_memory);
}

#[test]
fn test_截断输入正常结束() {
    let config = native_config();
    let mut video = make_video_input(25, 25);
    video.truncate(video.len() - 100);
    let mut audio = make_audio_input(1000, 44_100, config.audio_chunk_size);
    audio.extend_from_slice(&1000u32.to_le_bytes());
    audio.extend_from_slice(&[0u8; 7]);

    let (text, stats) = run_in_memory(&config, &audio, &video);
    let (_, packets) = parse_framecrc(&text);
    assert_eq!(stream_packets(&packets, 0).len(), 24);
    assert_eq!(stats.video.frames_in, 24);
    // 尾部 1 个完整采样 + 3 字节残余不足一帧
    assert_eq!(stream_packets(&packets, 1).len(), 43);
}

#[test]
fn test_null_格式只计数() {
    let config = PackConfig {
        format: Some("null".into()),
        ..native_config()
    };
    let audio = make_audio_input(200, 44_100, config.audio_chunk_size);
    let video = make_video_input(5, 25);
    let (text, stats) = run_in_memory(&config, &audio, &video);
    assert!(text.is_empty());
    assert_eq!(stats.video.packets_out, 5);
    assert_eq!(stats.audio.packets_out, 8);
    assert_eq!(stats.total_bytes(), 5 * FRAME_BYTES as u64 + 8 * 4096);
}

#[test]
fn test_输入文件不存在() {
    let dir = tempfile::tempdir().unwrap();
    let config = PackConfig {
        video_input_path: Some(dir.path().join("missing.i420")),
        audio_input_path: Some(dir.path().join("missing.pcm")),
        output_path: Some(dir.path().join("out.crc")),
        ..native_config()
    };
    let err = pack(&config).unwrap_err();
    assert!(matches!(err, PackError::Io(_)), "{err}");
    assert!(!dir.path().join("out.crc").exists());
}

#[test]
fn test_未知编码器() {
    let config = PackConfig {
        video_codec: "vp9".into(),
        ..native_config()
    };
    let err = pack_readers(
        &config,
        &default_codec_registry(),
        &default_format_registry(),
        std::io::empty(),
        std::io::empty(),
        OutputTarget::Memory(SharedBuffer::new()),
    )
    .unwrap_err();
    assert!(matches!(err, PackError::InvalidArgument(_)));
}

#[cfg(not(feature = "ffmpeg"))]
#[test]
fn test_容器格式需要_ffmpeg() {
    let config = PackConfig {
        format: Some("flv".into()),
        ..native_config()
    };
    let err = pack_readers(
        &config,
        &default_codec_registry(),
        &default_format_registry(),
        std::io::empty(),
        std::io::empty(),
        OutputTarget::Memory(SharedBuffer::new()),
    )
    .unwrap_err();
    assert!(matches!(err, PackError::FormatNotFound(_)));
}
