//! 交错编码驱动.
//!
//! [`Packer`] 每次比较两路帧源的下一帧时间戳 (微秒), 推进较早的一路:
//! 读帧, 编码, 把产生的数据包按顺序交给封装器. 某一路输入结束时,
//! 对其编码器做一次排空调用, 写出尾部数据包后该路停止. 两路都停止时结束.
//!
//! [`pack`] / [`pack_readers`] 在此之上完成整个任务: 按配置创建编码器,
//! 帧源与封装器, 写头部, 驱动交错, 写尾部.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};
use videopack_codec::{CodecParameters, CodecRegistry};
use videopack_core::{MediaType, NOPTS_VALUE, PackError, PackResult, Rational, rescale_q};
use videopack_format::{FormatRegistry, Muxer, OutputContext, OutputTarget, WriteOutcome};

use crate::config::PackConfig;
use crate::encode::StreamEncoder;
use crate::source::{AudioSource, FrameSource, SourceFrame, VideoSource};

/// 单路流的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// 读入的完整帧数
    pub frames_in: u64,
    /// 写出的数据包数
    pub packets_out: u64,
    /// 写出的负载字节数
    pub bytes: u64,
    /// 被封装器跳过的空包数
    pub skipped: u64,
    /// 最后写出的数据包 pts (编码器时间基)
    pub last_pts: Option<i64>,
    /// 已写出数据的结束时间 (微秒, pts + duration 的最大值)
    pub end_time_us: i64,
}

impl StreamStats {
    /// 已写出数据覆盖的时长 (秒)
    pub fn duration_secs(&self) -> f64 {
        self.end_time_us as f64 / 1_000_000.0
    }
}

/// 一次封装任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackStats {
    pub audio: StreamStats,
    pub video: StreamStats,
}

impl PackStats {
    pub fn total_packets(&self) -> u64 {
        self.audio.packets_out + self.video.packets_out
    }

    pub fn total_bytes(&self) -> u64 {
        self.audio.bytes + self.video.bytes
    }
}

/// 一路流: 编码器 + 输出流索引 + 活跃标志
struct Lane {
    encoder: StreamEncoder,
    stream_index: usize,
    active: bool,
    stats: StreamStats,
}

impl Lane {
    fn new(encoder: StreamEncoder, stream_index: usize) -> Self {
        Self {
            encoder,
            stream_index,
            active: true,
            stats: StreamStats::default(),
        }
    }

    fn next_pts(&self, source: &mut dyn FrameSource) -> PackResult<Option<i64>> {
        source
            .next_pts()
            .map_err(|e| e.in_stream(self.encoder.media_type(), "读取"))
    }

    /// 推进一步: 读一帧并编码, 或在输入结束时排空编码器
    fn advance(&mut self, source: &mut dyn FrameSource, muxer: &mut dyn Muxer) -> PackResult<()> {
        let media = self.encoder.media_type();
        let frame = source.read_frame().map_err(|e| e.in_stream(media, "读取"))?;
        let packets = match frame {
            SourceFrame::Frame { data, pts } => {
                self.stats.frames_in += 1;
                self.encoder
                    .encode(Some(data), self.stream_index, pts, Rational::MICRO)
                    .map_err(|e| e.in_stream(media, "编码"))?
            }
            SourceFrame::End => {
                debug!(
                    "{}输入结束 ({} 帧), 排空编码器 {}",
                    media,
                    source.frames_read(),
                    self.encoder.name()
                );
                self.active = false;
                self.encoder
                    .encode(None, self.stream_index, NOPTS_VALUE, Rational::MICRO)
                    .map_err(|e| e.in_stream(media, "排空"))?
            }
        };

        for packet in packets {
            let size = packet.size() as u64;
            let (pts, duration, time_base) = (packet.pts, packet.duration, packet.time_base);
            trace!(
                "{}包: stream={} pts={} dur={} size={}",
                media, self.stream_index, pts, duration, size
            );
            match muxer
                .write_packet(packet)
                .map_err(|e| e.in_stream(media, "写包"))?
            {
                WriteOutcome::Written => {
                    self.stats.packets_out += 1;
                    self.stats.bytes += size;
                    if pts != NOPTS_VALUE {
                        self.stats.last_pts = Some(pts);
                        let end = rescale_q(pts + duration.max(0), time_base, Rational::MICRO);
                        self.stats.end_time_us = self.stats.end_time_us.max(end);
                    }
                }
                WriteOutcome::Skipped => self.stats.skipped += 1,
            }
        }
        Ok(())
    }
}

/// 交错编码驱动器
pub struct Packer {
    audio: Lane,
    video: Lane,
}

impl Packer {
    /// 创建驱动器, 编码器须已打开, 流索引为它们在封装器中的位置
    pub fn new(
        audio: StreamEncoder,
        audio_stream_index: usize,
        video: StreamEncoder,
        video_stream_index: usize,
    ) -> Self {
        Self {
            audio: Lane::new(audio, audio_stream_index),
            video: Lane::new(video, video_stream_index),
        }
    }

    /// 驱动两路帧源直到都结束
    ///
    /// 时间戳相同时先推进视频. 任何编码或封装失败都会终止任务,
    /// 错误中带有出错的流与操作.
    pub fn run(
        &mut self,
        audio: &mut dyn FrameSource,
        video: &mut dyn FrameSource,
        muxer: &mut dyn Muxer,
    ) -> PackResult<PackStats> {
        if audio.media_type() != MediaType::Audio || video.media_type() != MediaType::Video {
            return Err(PackError::InvalidArgument(format!(
                "帧源类型不符: audio={}, video={}",
                audio.media_type(),
                video.media_type()
            )));
        }

        loop {
            let advance_video = match (self.video.active, self.audio.active) {
                (false, false) => break,
                (true, false) => true,
                (false, true) => false,
                (true, true) => {
                    let video_next = self.video.next_pts(video)?;
                    let audio_next = self.audio.next_pts(audio)?;
                    match (video_next, audio_next) {
                        // 已无下一帧的一路先走结束流程
                        (None, _) => true,
                        (_, None) => false,
                        (Some(v), Some(a)) => v <= a,
                    }
                }
            };
            if advance_video {
                self.video.advance(video, muxer)?;
            } else {
                self.audio.advance(audio, muxer)?;
            }
        }

        Ok(PackStats {
            audio: self.audio.stats.clone(),
            video: self.video.stats.clone(),
        })
    }
}

fn required_path<'a>(path: &'a Option<PathBuf>, what: &str) -> PackResult<&'a Path> {
    path.as_deref()
        .ok_or_else(|| PackError::InvalidArgument(format!("未指定{what}路径")))
}

fn open_input(path: &Path) -> PackResult<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        PackError::Io(std::io::Error::new(
            e.kind(),
            format!("无法打开输入 '{}': {e}", path.display()),
        ))
    })?;
    Ok(BufReader::new(file))
}

/// 按配置执行完整的封装任务 (输入输出都是文件, 使用默认注册表)
pub fn pack(config: &PackConfig) -> PackResult<PackStats> {
    config.validate()?;
    let video = open_input(required_path(&config.video_input_path, "视频输入")?)?;
    let audio = open_input(required_path(&config.audio_input_path, "音频输入")?)?;
    let output = required_path(&config.output_path, "输出")?;
    pack_readers(
        config,
        &crate::default_codec_registry(),
        &crate::default_format_registry(),
        audio,
        video,
        OutputTarget::File(output.to_path_buf()),
    )
}

/// 打开编码器, 返回打开后的参数
fn open_encoder(
    codecs: &CodecRegistry,
    params: &CodecParameters,
) -> PackResult<(StreamEncoder, CodecParameters)> {
    let mut encoder = StreamEncoder::new(codecs.create_encoder(params.codec_id)?);
    let opened = encoder.open(params)?.clone();
    Ok((encoder, opened))
}

/// 从任意读取器执行封装任务
///
/// 输入路径字段被忽略; 输出格式取 `config.format`, 未指定时按输出文件名猜测.
pub fn pack_readers<A: Read, V: Read>(
    config: &PackConfig,
    codecs: &CodecRegistry,
    formats: &FormatRegistry,
    audio_input: A,
    video_input: V,
    target: OutputTarget,
) -> PackResult<PackStats> {
    config.validate_params()?;
    let format_id = config.format_id()?;

    let (video_encoder, video_params) = open_encoder(codecs, &config.video_params()?)?;
    let (audio_encoder, audio_params) = open_encoder(codecs, &config.audio_params()?)?;

    // 固定帧长的编码器 (如 AAC) 在打开后回填帧长
    let frame_size = audio_params
        .audio()
        .map(|a| a.frame_size)
        .filter(|&n| n > 0)
        .unwrap_or(config.audio_frame_size);
    let mut audio = AudioSource::new(
        audio_input,
        config.audio_chunk_size,
        config.channels,
        config.sample_rate,
        frame_size,
    )?;
    let mut video = VideoSource::new(video_input, config.width, config.height)?;

    info!(
        "视频: {} {}x{} @ {} fps, 时间基 {}",
        video_encoder.name(),
        config.width,
        config.height,
        config.fps,
        video_params.time_base
    );
    info!(
        "音频: {} {} Hz {}, 帧长 {} 采样, 时间基 {}",
        audio_encoder.name(),
        config.sample_rate,
        audio_params
            .audio()
            .map(|a| a.channel_layout.to_string())
            .unwrap_or_default(),
        frame_size,
        audio_params.time_base
    );

    let writer = formats.create_writer(format_id, target.clone())?;
    let mut muxer = OutputContext::new(writer);
    let video_index = muxer.add_stream(&video_params)?;
    let audio_index = muxer.add_stream(&audio_params)?;
    muxer.open()?;
    muxer.write_header()?;
    info!("输出: {} ({})", target, muxer.format_name());

    let mut packer = Packer::new(audio_encoder, audio_index, video_encoder, video_index);
    let stats = packer.run(&mut audio, &mut video, &mut muxer)?;
    muxer.write_trailer()?;

    info!(
        "封装完成: 视频 {} 帧 / {} 包 ({:.3}s), 音频 {} 帧 / {} 包 ({:.3}s), 共 {} 字节",
        stats.video.frames_in,
        stats.video.packets_out,
        stats.video.duration_secs(),
        stats.audio.frames_in,
        stats.audio.packets_out,
        stats.audio.duration_secs(),
        stats.total_bytes()
    );
    if stats.audio.skipped + stats.video.skipped > 0 {
        info!(
            "跳过空包: 视频 {}, 音频 {}",
            stats.video.skipped, stats.audio.skipped
        );
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use videopack_codec::{
        AudioCodecParams, CodecId, Encoder, Frame, Packet, VideoCodecParams,
    };
    use videopack_core::{ChannelLayout, PixelFormat, SampleFormat};
    use videopack_format::{FormatId, MuxerState, SharedBuffer, Stream};

    use super::*;

    /// 预先排好的帧序列
    struct VecSource {
        media: MediaType,
        frames: VecDeque<(Vec<u8>, i64)>,
        current: Vec<u8>,
        read: u64,
    }

    impl VecSource {
        fn new(media: MediaType, size: usize, pts: &[i64]) -> Self {
            Self {
                media,
                frames: pts.iter().map(|&p| (vec![0u8; size], p)).collect(),
                current: Vec::new(),
                read: 0,
            }
        }
    }

    impl FrameSource for VecSource {
        fn media_type(&self) -> MediaType {
            self.media
        }

        fn next_pts(&mut self) -> PackResult<Option<i64>> {
            Ok(self.frames.front().map(|(_, pts)| *pts))
        }

        fn read_frame(&mut self) -> PackResult<SourceFrame<'_>> {
            match self.frames.pop_front() {
                Some((data, pts)) => {
                    self.current = data;
                    self.read += 1;
                    Ok(SourceFrame::Frame {
                        data: &self.current,
                        pts,
                    })
                }
                None => Ok(SourceFrame::End),
            }
        }

        fn frames_read(&self) -> u64 {
            self.read
        }
    }

    /// 记录写入顺序的封装器
    #[derive(Default)]
    struct RecordingMuxer {
        written: Vec<(usize, i64)>,
        fail_on_stream: Option<usize>,
    }

    impl Muxer for RecordingMuxer {
        fn add_stream(&mut self, _params: &CodecParameters) -> PackResult<usize> {
            Ok(0)
        }

        fn open(&mut self) -> PackResult<()> {
            Ok(())
        }

        fn write_header(&mut self) -> PackResult<()> {
            Ok(())
        }

        fn write_packet(&mut self, packet: Packet) -> PackResult<WriteOutcome> {
            if self.fail_on_stream == Some(packet.stream_index) {
                return Err(PackError::Format("磁盘已满".into()));
            }
            if packet.is_empty() {
                return Ok(WriteOutcome::Skipped);
            }
            self.written.push((packet.stream_index, packet.pts));
            Ok(WriteOutcome::Written)
        }

        fn write_trailer(&mut self) -> PackResult<()> {
            Ok(())
        }

        fn streams(&self) -> &[Stream] {
            &[]
        }

        fn state(&self) -> MuxerState {
            MuxerState::HeaderWritten
        }

        fn audio_stream_index(&self) -> Option<usize> {
            Some(1)
        }

        fn video_stream_index(&self) -> Option<usize> {
            Some(0)
        }
    }

    /// 缓存所有帧, 只在排空时输出数据包; 最后附带一个空包
    struct DelayEncoder {
        params: Option<CodecParameters>,
        pending: VecDeque<i64>,
        draining: bool,
        trailing_empty: bool,
    }

    impl Encoder for DelayEncoder {
        fn codec_id(&self) -> CodecId {
            CodecId::RawVideo
        }

        fn name(&self) -> &str {
            "delay"
        }

        fn open(&mut self, params: &CodecParameters) -> PackResult<()> {
            self.params = Some(params.clone());
            Ok(())
        }

        fn parameters(&self) -> Option<&CodecParameters> {
            self.params.as_ref()
        }

        fn send_frame(&mut self, frame: Option<&Frame>) -> PackResult<()> {
            match frame {
                Some(f) => self.pending.push_back(f.pts()),
                None => self.draining = true,
            }
            Ok(())
        }

        fn receive_packet(&mut self) -> PackResult<Packet> {
            if !self.draining {
                return Err(PackError::NeedMoreData);
            }
            if let Some(pts) = self.pending.pop_front() {
                let mut pkt = Packet::from_data(vec![1u8; 4]);
                pkt.pts = pts;
                pkt.dts = pts;
                pkt.duration = 1;
                return Ok(pkt);
            }
            if self.trailing_empty {
                self.trailing_empty = false;
                return Ok(Packet::empty());
            }
            Err(PackError::Eof)
        }
    }

    fn video_params() -> CodecParameters {
        CodecParameters::new_video(
            CodecId::RawVideo,
            0,
            VideoCodecParams {
                width: 4,
                height: 4,
                pixel_format: PixelFormat::Yuv420p,
                frame_rate: Rational::new(25, 1),
                gop_size: 12,
                max_b_frames: 0,
            },
        )
    }

    fn audio_params() -> CodecParameters {
        CodecParameters::new_audio(
            CodecId::PcmS16le,
            0,
            AudioCodecParams {
                sample_rate: 44_100,
                channel_layout: ChannelLayout::STEREO,
                sample_format: SampleFormat::S16,
                frame_size: 4,
            },
        )
    }

    fn packer_with(video_encoder: Box<dyn Encoder>) -> Packer {
        let reg = crate::default_codec_registry();
        let (audio, _) = open_encoder(&reg, &audio_params()).unwrap();
        let mut video = StreamEncoder::new(video_encoder);
        video.open(&video_params()).unwrap();
        Packer::new(audio, 1, video, 0)
    }

    fn raw_packer() -> Packer {
        let reg = crate::default_codec_registry();
        packer_with(reg.create_encoder(CodecId::RawVideo).unwrap())
    }

    #[test]
    fn test_交错顺序() {
        let mut packer = raw_packer();
        let mut video = VecSource::new(MediaType::Video, 24, &[0, 40_000, 80_000]);
        let mut audio = VecSource::new(
            MediaType::Audio,
            16,
            &[0, 23_220, 46_440, 69_660, 92_880],
        );
        let mut muxer = RecordingMuxer::default();
        let stats = packer.run(&mut audio, &mut video, &mut muxer).unwrap();

        // 时间戳相同先写视频; 之后总是推进较早的一路
        assert_eq!(
            muxer.written,
            vec![
                (0, 0),
                (1, 0),
                (1, 1024),
                (0, 1),
                (1, 2048),
                (1, 3072),
                (0, 2),
                (1, 4096),
            ]
        );
        assert_eq!(stats.video.frames_in, 3);
        assert_eq!(stats.video.packets_out, 3);
        assert_eq!(stats.video.bytes, 72);
        assert_eq!(stats.video.last_pts, Some(2));
        assert_eq!(stats.video.end_time_us, 120_000);
        assert_eq!(stats.audio.packets_out, 5);
        assert_eq!(stats.total_packets(), 8);
    }

    #[test]
    fn test_一路为空() {
        let mut packer = raw_packer();
        let mut video = VecSource::new(MediaType::Video, 24, &[]);
        let mut audio = VecSource::new(MediaType::Audio, 16, &[0, 23_220]);
        let mut muxer = RecordingMuxer::default();
        let stats = packer.run(&mut audio, &mut video, &mut muxer).unwrap();
        assert_eq!(muxer.written, vec![(1, 0), (1, 1024)]);
        assert_eq!(stats.video, StreamStats::default());
    }

    #[test]
    fn test_排空产生尾包() {
        let mut packer = packer_with(Box::new(DelayEncoder {
            params: None,
            pending: VecDeque::new(),
            draining: false,
            trailing_empty: true,
        }));
        let mut video = VecSource::new(MediaType::Video, 24, &[0, 40_000]);
        let mut audio = VecSource::new(MediaType::Audio, 16, &[0]);
        let mut muxer = RecordingMuxer::default();
        let stats = packer.run(&mut audio, &mut video, &mut muxer).unwrap();

        // 视频包全部在排空时产生, 空包被跳过
        assert_eq!(muxer.written, vec![(1, 0), (0, 0), (0, 1)]);
        assert_eq!(stats.video.frames_in, 2);
        assert_eq!(stats.video.packets_out, 2);
        assert_eq!(stats.video.skipped, 1);
    }

    #[test]
    fn test_写包失败带流信息() {
        let mut packer = raw_packer();
        let mut video = VecSource::new(MediaType::Video, 24, &[0]);
        let mut audio = VecSource::new(MediaType::Audio, 16, &[0]);
        let mut muxer = RecordingMuxer {
            fail_on_stream: Some(1),
            ..Default::default()
        };
        let err = packer.run(&mut audio, &mut video, &mut muxer).unwrap_err();
        match err {
            PackError::Stream {
                media, operation, ..
            } => {
                assert_eq!(media, MediaType::Audio);
                assert_eq!(operation, "写包");
            }
            other => panic!("意外的错误: {other}"),
        }
    }

    #[test]
    fn test_编码失败带流信息() {
        let mut packer = raw_packer();
        // 帧大小与编码参数不符
        let mut video = VecSource::new(MediaType::Video, 23, &[0]);
        let mut audio = VecSource::new(MediaType::Audio, 16, &[]);
        let mut muxer = RecordingMuxer::default();
        let err = packer.run(&mut audio, &mut video, &mut muxer).unwrap_err();
        assert!(matches!(
            err,
            PackError::Stream {
                media: MediaType::Video,
                operation: "编码",
                ..
            }
        ));
    }

    #[test]
    fn test_帧源类型不符() {
        let mut packer = raw_packer();
        let mut a = VecSource::new(MediaType::Video, 24, &[]);
        let mut b = VecSource::new(MediaType::Video, 24, &[]);
        let mut muxer = RecordingMuxer::default();
        assert!(matches!(
            packer.run(&mut a, &mut b, &mut muxer),
            Err(PackError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_pack_readers_写入内存() {
        let config = PackConfig {
            width: 4,
            height: 4,
            video_codec: "rawvideo".into(),
            audio_codec: "pcm_s16le".into(),
            audio_frame_size: 4,
            audio_chunk_size: 16,
            format: Some("null".into()),
            ..PackConfig::default()
        };
        let mut video_in = Vec::new();
        video_in.extend_from_slice(&0u32.to_le_bytes());
        video_in.extend_from_slice(&[0u8; 24]);
        let mut audio_in = Vec::new();
        audio_in.extend_from_slice(&0u32.to_le_bytes());
        audio_in.extend_from_slice(&[0u8; 16]);

        let buffer = SharedBuffer::new();
        let stats = pack_readers(
            &config,
            &crate::default_codec_registry(),
            &crate::default_format_registry(),
            audio_in.as_slice(),
            video_in.as_slice(),
            OutputTarget::Memory(buffer.clone()),
        )
        .unwrap();
        assert!(buffer.is_empty());
        assert_eq!(stats.video.packets_out, 1);
        assert_eq!(stats.audio.packets_out, 1);
        assert_eq!(stats.total_bytes(), 40);
        assert_eq!(config.format_id().unwrap(), FormatId::Null);
    }
}
