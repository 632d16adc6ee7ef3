//! 端到端集成测试: h264 + aac 经 FFmpeg 写入真实容器, 再用 FFmpeg 读回验证.
//!
//! 需要 `ffmpeg` 特性以及系统安装的 libav* (含 H.264 编码器).

use std::path::Path;

use ffmpeg_next as ffmpeg;
use videopack::{PackConfig, pack};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn write_video_input(path: &Path, count: u32) {
    let frame_bytes = (WIDTH * HEIGHT * 3 / 2) as usize;
    let mut out = Vec::new();
    for i in 0..count {
        out.extend_from_slice(&(i * 40).to_le_bytes());
        out.extend(std::iter::repeat_n(80 + (i * 4) as u8, frame_bytes));
    }
    std::fs::write(path, out).unwrap();
}

/// 1 秒 44.1 kHz 立体声静音, 3528 字节 (20 ms) 一块
fn write_audio_input(path: &Path) {
    let mut out = Vec::new();
    for k in 0..50u32 {
        out.extend_from_slice(&(k * 20).to_le_bytes());
        out.extend(std::iter::repeat_n(0u8, 3528));
    }
    std::fs::write(path, out).unwrap();
}

/// 读回输出文件, 返回每条流的 (媒体类型, 编码器名, 时长秒)
fn probe(path: &Path) -> Vec<(ffmpeg::media::Type, String, f64)> {
    ffmpeg::init().unwrap();
    let mut ictx = ffmpeg::format::input(&path).unwrap();
    let mut info: Vec<(ffmpeg::media::Type, String, f64)> = ictx
        .streams()
        .map(|s| {
            let params = s.parameters();
            (params.medium(), format!("{:?}", params.id()), 0.0)
        })
        .collect();
    let time_bases: Vec<ffmpeg::Rational> = ictx.streams().map(|s| s.time_base()).collect();
    for (stream, packet) in ictx.packets() {
        let idx = stream.index();
        if let Some(pts) = packet.pts() {
            let tb = time_bases[idx];
            let end = (pts + packet.duration()) as f64 * f64::from(tb.numerator())
                / f64::from(tb.denominator());
            if end > info[idx].2 {
                info[idx].2 = end;
            }
        }
    }
    info
}

fn pack_to(output: &str) -> Vec<(ffmpeg::media::Type, String, f64)> {
    let dir = tempfile::tempdir().unwrap();
    let video_path = dir.path().join("camera.i420");
    let audio_path = dir.path().join("mic.pcm");
    let output_path = dir.path().join(output);
    write_video_input(&video_path, 25);
    write_audio_input(&audio_path);

    let config = PackConfig {
        width: WIDTH,
        height: HEIGHT,
        video_bit_rate: 200_000,
        video_input_path: Some(video_path),
        audio_input_path: Some(audio_path),
        output_path: Some(output_path.clone()),
        ..PackConfig::default()
    };
    let stats = pack(&config).unwrap();
    assert_eq!(stats.video.frames_in, 25);
    // AAC 固定帧长 1024 → 43 个完整帧
    assert_eq!(stats.audio.frames_in, 43);
    assert!(stats.video.packets_out > 0);
    assert!(stats.audio.packets_out >= 43);
    probe(&output_path)
}

fn check_streams(streams: &[(ffmpeg::media::Type, String, f64)]) {
    assert_eq!(streams.len(), 2, "{streams:?}");
    let video = streams
        .iter()
        .find(|s| s.0 == ffmpeg::media::Type::Video)
        .unwrap();
    let audio = streams
        .iter()
        .find(|s| s.0 == ffmpeg::media::Type::Audio)
        .unwrap();
    assert_eq!(video.1, "H264");
    assert_eq!(audio.1, "AAC");
    assert!((video.2 - 1.0).abs() < 0.1, "视频时长 {}", video.2);
    assert!((audio.2 - 1.0).abs() < 0.1, "音频时长 {}", audio.2);
}

#[test]
fn test_h264_aac_写入_mp4() {
    check_streams(&pack_to("out.mp4"));
}

#[test]
fn test_h264_aac_写入_flv() {
    check_streams(&pack_to("out.flv"));
}

#[test]
fn test_h264_aac_写入_mkv() {
    check_streams(&pack_to("out.mkv"));
}
