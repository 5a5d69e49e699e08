//! RGB565 ピクセルコーデック
//!
//! 8ビット RGB を 16ビット RGB565 値に変換し、エンコードモードに応じた
//! バイト順で 2 バイトに直列化します。逆変換はビット複製で 8 ビットに戻します。

use std::fmt;

/// 1ピクセルあたりのバイト数
pub const BYTES_PER_PIXEL: usize = 2;

/// エンコードモード
///
/// コンテナにはヘッダーが無いため、モードは呼び出し側が常に明示的に渡します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingMode {
    /// アニメーション（上位バイトが先）
    Animation,
    /// 静止画（下位バイトが先）
    Static,
}

impl EncodingMode {
    /// モード名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Animation => "animation",
            EncodingMode::Static => "static",
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RGB565 ピクセル値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    /// 8ビット RGB から下位ビットを切り捨てて生成
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r = (r as u16 & 0xF8) << 8;
        let g = (g as u16 & 0xFC) << 3;
        let b = b as u16 >> 3;
        Self(r | g | b)
    }

    /// 8ビット RGB に展開（ビット複製）
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let r5 = ((self.0 >> 11) & 0x1F) as u8;
        let g6 = ((self.0 >> 5) & 0x3F) as u8;
        let b5 = (self.0 & 0x1F) as u8;

        ((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
    }

    /// モードに応じたバイト列に変換
    pub fn to_bytes(self, mode: EncodingMode) -> [u8; BYTES_PER_PIXEL] {
        match mode {
            EncodingMode::Animation => self.0.to_be_bytes(),
            EncodingMode::Static => self.0.to_le_bytes(),
        }
    }

    /// モードに応じたバイト列から復元
    pub fn from_bytes(bytes: [u8; BYTES_PER_PIXEL], mode: EncodingMode) -> Self {
        match mode {
            EncodingMode::Animation => Self(u16::from_be_bytes(bytes)),
            EncodingMode::Static => Self(u16::from_le_bytes(bytes)),
        }
    }
}

/// 1ピクセルをエンコード
pub fn encode(r: u8, g: u8, b: u8, mode: EncodingMode) -> [u8; BYTES_PER_PIXEL] {
    Rgb565::from_rgb(r, g, b).to_bytes(mode)
}

/// 1ピクセルをデコード
pub fn decode(bytes: [u8; BYTES_PER_PIXEL], mode: EncodingMode) -> (u8, u8, u8) {
    Rgb565::from_bytes(bytes, mode).to_rgb()
}

/// RGB888 のピクセル列をまとめてエンコードし、出力バッファに追記
///
/// `rgb` の長さが 3 の倍数でない場合、端数は無視されます。
pub fn encode_rgb_into(rgb: &[u8], mode: EncodingMode, out: &mut Vec<u8>) {
    out.reserve(rgb.len() / 3 * BYTES_PER_PIXEL);
    for px in rgb.chunks_exact(3) {
        out.extend_from_slice(&encode(px[0], px[1], px[2], mode));
    }
}

/// RGB565 のバイト列をまとめてデコードし、RGB888 として出力バッファに追記
pub fn decode_into_rgb(data: &[u8], mode: EncodingMode, out: &mut Vec<u8>) {
    out.reserve(data.len() / BYTES_PER_PIXEL * 3);
    for pair in data.chunks_exact(BYTES_PER_PIXEL) {
        let (r, g, b) = decode([pair[0], pair[1]], mode);
        out.extend_from_slice(&[r, g, b]);
    }
}
