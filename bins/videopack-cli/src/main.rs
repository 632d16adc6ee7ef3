//! videopack - 原始音视频封装命令行工具
//!
//! 读取带时间戳的 S16LE PCM 与 YUV420P 分块输入, 编码后交错写入单个输出文件.

mod logging;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{error, info};

use videopack::PackConfig;

#[derive(Parser, Debug)]
#[command(name = "videopack", version, about = "原始 PCM / YUV420P 编码封装工具")]
struct Cli {
    /// 视频输入 (每块: u32 LE 毫秒时间戳 + 一帧 YUV420P)
    #[arg(long)]
    video: Option<PathBuf>,

    /// 音频输入 (每块: u32 LE 毫秒时间戳 + S16LE 交错 PCM)
    #[arg(long)]
    audio: Option<PathBuf>,

    /// 输出文件路径
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON 配置文件, 命令行参数覆盖其中的值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出格式 (framecrc/null/flv/mp4/matroska/...), 默认按扩展名猜测
    #[arg(short, long)]
    format: Option<String>,

    /// 视频宽度
    #[arg(long)]
    width: Option<u32>,

    /// 视频高度
    #[arg(long)]
    height: Option<u32>,

    /// 帧率
    #[arg(short = 'r', long)]
    fps: Option<u32>,

    /// 视频码率 (bits/s)
    #[arg(long = "vb")]
    video_bit_rate: Option<u64>,

    /// GOP 长度
    #[arg(short = 'g', long = "gop")]
    gop_size: Option<u32>,

    /// 视频编码器 (h264/rawvideo)
    #[arg(long = "vcodec")]
    video_codec: Option<String>,

    /// 声道数
    #[arg(long = "ac")]
    channels: Option<u32>,

    /// 采样率 (Hz)
    #[arg(long = "ar")]
    sample_rate: Option<u32>,

    /// 音频码率 (bits/s)
    #[arg(long = "ab")]
    audio_bit_rate: Option<u64>,

    /// 音频编码器 (aac/pcm_s16le/pcm_s16be)
    #[arg(long = "acodec")]
    audio_codec: Option<String>,

    /// 每个音频帧的采样数 (固定帧长的编码器会忽略)
    #[arg(long)]
    audio_frame_size: Option<u32>,

    /// 音频输入每个分块的 PCM 字节数
    #[arg(long)]
    audio_chunk_size: Option<usize>,

    /// 覆盖输出文件
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// 显示版本和已注册的编码器/格式
    #[arg(long)]
    build_info: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// 用命令行参数覆盖配置
    fn apply(&self, config: &mut PackConfig) {
        fn set<T: Clone>(dst: &mut T, src: &Option<T>) {
            if let Some(v) = src {
                *dst = v.clone();
            }
        }
        set(&mut config.width, &self.width);
        set(&mut config.height, &self.height);
        set(&mut config.fps, &self.fps);
        set(&mut config.video_bit_rate, &self.video_bit_rate);
        set(&mut config.gop_size, &self.gop_size);
        set(&mut config.video_codec, &self.video_codec);
        set(&mut config.channels, &self.channels);
        set(&mut config.sample_rate, &self.sample_rate);
        set(&mut config.audio_bit_rate, &self.audio_bit_rate);
        set(&mut config.audio_codec, &self.audio_codec);
        set(&mut config.audio_frame_size, &self.audio_frame_size);
        set(&mut config.audio_chunk_size, &self.audio_chunk_size);
        if self.video.is_some() {
            config.video_input_path = self.video.clone();
        }
        if self.audio.is_some() {
            config.audio_input_path = self.audio.clone();
        }
        if self.output.is_some() {
            config.output_path = self.output.clone();
        }
        if self.format.is_some() {
            config.format = self.format.clone();
        }
    }

    fn has_task(&self) -> bool {
        self.video.is_some() || self.audio.is_some() || self.config.is_some()
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("videopack", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if cli.build_info {
        print_build_info();
        return;
    }

    if !cli.has_task() {
        print_banner();
        return;
    }

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => PackConfig::load(path)
            .with_context(|| format!("读取配置 '{}' 失败", path.display()))?,
        None => PackConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("配置无效")?;

    if let Some(output) = &config.output_path {
        if !cli.overwrite && output.exists() {
            bail!("输出文件已存在 '{}', 使用 -y 覆盖", output.display());
        }
    }

    info!(
        "videopack 版本 {} -- 原始 PCM / YUV420P 编码封装",
        videopack::version()
    );
    if let (Some(v), Some(a), Some(o)) = (
        &config.video_input_path,
        &config.audio_input_path,
        &config.output_path,
    ) {
        info!("视频输入: {}", v.display());
        info!("音频输入: {}", a.display());
        info!("输出: {}", o.display());
    }

    let stats = videopack::pack(&config).context("封装失败")?;

    eprintln!();
    eprintln!("封装完成:");
    eprintln!(
        "  视频: {} 帧, {} 个数据包, {:.3} 秒",
        stats.video.frames_in,
        stats.video.packets_out,
        stats.video.duration_secs()
    );
    eprintln!(
        "  音频: {} 帧, {} 个数据包, {:.3} 秒",
        stats.audio.frames_in,
        stats.audio.packets_out,
        stats.audio.duration_secs()
    );
    let bytes = stats.total_bytes();
    eprintln!(
        "  输出负载: {bytes} 字节 ({:.2} KB)",
        bytes as f64 / 1024.0
    );
    Ok(())
}

// ============================================================
// UI
// ============================================================

/// 打印版本横幅
fn print_banner() {
    println!(
        "videopack 版本 {} -- 原始 PCM / YUV420P 编码封装工具",
        videopack::version()
    );
    println!();
    println!("用法: videopack --video <YUV 输入> --audio <PCM 输入> -o <输出文件> [选项]");
    println!();
    println!("选项:");
    println!("  --config <文件>      JSON 配置文件");
    println!("  -f <格式>            输出格式 (framecrc/null/flv/mp4/matroska/...)");
    println!("  --width/--height     视频尺寸 (默认 1920x1080)");
    println!("  -r <帧率>            帧率 (默认 25)");
    println!("  --vcodec <编码器>    视频编码器 (h264/rawvideo)");
    println!("  --acodec <编码器>    音频编码器 (aac/pcm_s16le/pcm_s16be)");
    println!("  --ar <频率>          采样率 (默认 44100)");
    println!("  --ac <声道数>        声道数 (默认 2)");
    println!("  -y                   覆盖输出文件");
    println!("  --build-info         显示构建信息");
    println!();
    println!("示例:");
    println!("  videopack --video cam.i420 --audio mic.pcm -o out.flv");
    println!(
        "  videopack --video cam.i420 --audio mic.pcm -o out.crc --vcodec rawvideo --acodec pcm_s16le"
    );
    println!();
    println!("使用 --help 查看完整用法.");
}

/// 打印构建信息
fn print_build_info() {
    println!("videopack 版本 {}", videopack::version());
    println!("  构建目标: {}", std::env::consts::ARCH);
    println!("  操作系统: {}", std::env::consts::OS);
    println!(
        "  FFmpeg 后端: {}",
        if cfg!(feature = "ffmpeg") {
            "已启用"
        } else {
            "未启用"
        }
    );
    println!();
    let codecs = videopack::default_codec_registry();
    let encoders = codecs.list_encoders();
    println!("已注册编码器 ({}):", encoders.len());
    for (id, name) in &encoders {
        println!("  {name} ({id}, {})", id.media_type().as_str());
    }
    println!();
    let formats = videopack::default_format_registry();
    let writers = formats.list_writers();
    println!("已注册输出格式 ({}):", writers.len());
    for (id, name) in &writers {
        println!("  {name} ({id})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_命令行覆盖配置() {
        let cli = Cli::try_parse_from([
            "videopack",
            "--video",
            "v.i420",
            "--audio",
            "a.pcm",
            "-o",
            "out.crc",
            "--width",
            "640",
            "--height",
            "480",
            "--vcodec",
            "rawvideo",
            "--acodec",
            "pcm_s16le",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.has_task());

        let mut config = PackConfig {
            fps: 30,
            ..PackConfig::default()
        };
        cli.apply(&mut config);
        assert_eq!((config.width, config.height), (640, 480));
        // 未指定的参数保留原值
        assert_eq!(config.fps, 30);
        assert_eq!(config.video_codec, "rawvideo");
        assert_eq!(config.output_path, Some(PathBuf::from("out.crc")));
        config.validate().unwrap();
    }

    #[test]
    fn test_无任务时只打印横幅() {
        let cli = Cli::try_parse_from(["videopack", "--build-info"]).unwrap();
        assert!(cli.build_info);
        assert!(!cli.has_task());
    }
}
