//! Adler-32 校验和.
//!
//! framecrc 输出中每个包的负载校验使用 Adler-32, 与 FFmpeg `av_adler32_update` 一致.
//! 注意 framecrc 以 0 作为初始值累加 (而不是标准 Adler-32 的 1).

const MOD_ADLER: u32 = 65_521;

/// 单次累加的最大字节数, 保证 `b` 不溢出 u32
const NMAX: usize = 5552;

/// 在已有校验值上继续累加
///
/// `adler` 为 0 时得到 framecrc 使用的值, 为 1 时得到标准 Adler-32.
pub fn adler32_update(adler: u32, data: &[u8]) -> u32 {
    let mut a = adler & 0xFFFF;
    let mut b = adler >> 16;
    for block in data.chunks(NMAX) {
        for &byte in block {
            a += u32::from(byte);
            b += a;
        }
        a %= MOD_ADLER;
        b %= MOD_ADLER;
    }
    (b << 16) | a
}
