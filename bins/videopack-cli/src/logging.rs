//! 日志初始化模块.
//!
//! 双输出:
//! - console (stderr): 彩色, 默认 info, -v 提升到 debug
//! - file: 无色, 默认 debug, -vv 提升到 trace, VIDEOPACK_LOG 环境变量可覆盖
//!
//! 日志文件输出到 $cwd/logs/{prefix}.{date}.log.
//! 库 crate 通过 `log` 输出的记录由 tracing-subscriber 一并收集.

use std::sync::OnceLock;

use anyhow::Context;
use chrono::{Datelike, Local, Timelike};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化日志系统
///
/// - `file_prefix`: 日志文件前缀
/// - `verbosity`: -v 次数
pub fn init(file_prefix: &str, verbosity: u8) -> anyhow::Result<()> {
    std::fs::create_dir_all("logs").context("创建 logs 目录失败")?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build("logs")
        .context("创建日志文件失败")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_level = if verbosity == 0 { "info" } else { "debug" };
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(LineFormat { colored: true })
        .with_filter(EnvFilter::new(console_level));

    let file_level = if verbosity < 2 { "debug" } else { "trace" };
    let file_filter =
        EnvFilter::try_from_env("VIDEOPACK_LOG").unwrap_or_else(|_| EnvFilter::new(file_level));
    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LineFormat { colored: false })
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;
    Ok(())
}

/// 单行日志格式: `[月-日 时:分:秒.毫秒] 级别 target > 消息`
///
/// 控制台输出带颜色且省略 target, 文件输出无色.
struct LineFormat {
    colored: bool,
}

impl LineFormat {
    fn level_color(level: tracing::Level) -> &'static str {
        match level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        let level = *meta.level();
        write!(
            writer,
            "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
        )?;
        if self.colored {
            write!(writer, "{}{level:5}\x1b[0m > ", Self::level_color(level))?;
        } else {
            write!(writer, "{level:5} {} > ", meta.target())?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
