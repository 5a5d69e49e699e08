//! コンテナ（bin ファイル）形式
//!
//! ヘッダー・フレーム数・区切りを持たない RGB565 フレームの単純な連結です。
//! フレーム境界は固定のフレームサイズから暗黙的に決まります。

use crate::codec::BYTES_PER_PIXEL;

/// フレームの幅
pub const FRAME_WIDTH: u32 = 240;

/// フレームの高さ
pub const FRAME_HEIGHT: u32 = 320;

/// 1フレームあたりのピクセル数
pub const FRAME_PIXELS: usize = (FRAME_WIDTH * FRAME_HEIGHT) as usize;

/// 1フレームあたりのバイト数
pub const FRAME_BYTES: usize = FRAME_PIXELS * BYTES_PER_PIXEL;

/// アニメーション・動画変換時の最大フレーム数
pub const MAX_ANIMATION_FRAMES: usize = 96;

/// 動画からフレームを抽出する際のサンプリングレート
pub const VIDEO_SAMPLE_FPS: u32 = 10;

/// コンテナのレイアウト情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLayout {
    /// 完全なフレーム数
    pub frames: usize,
    /// 末尾の不完全なフレームのバイト数
    pub trailing_bytes: usize,
}

impl ContainerLayout {
    /// バイト長からレイアウトを計算
    pub fn from_len(len: usize) -> Self {
        Self {
            frames: len / FRAME_BYTES,
            trailing_bytes: len % FRAME_BYTES,
        }
    }

    /// フレーム境界で割り切れるかどうか
    pub fn is_aligned(&self) -> bool {
        self.trailing_bytes == 0
    }

    /// 完全なフレームが占めるバイト数
    pub fn payload_len(&self) -> usize {
        self.frames * FRAME_BYTES
    }
}

/// 指定フレーム数のコンテナのバイト長
pub fn container_len(frames: usize) -> usize {
    frames * FRAME_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(FRAME_BYTES, 153_600);
        assert_eq!(container_len(3), 460_800);
    }

    #[test]
    fn test_layout_from_len() {
        let layout = ContainerLayout::from_len(FRAME_BYTES * 2 + 100);
        assert_eq!(layout.frames, 2);
        assert_eq!(layout.trailing_bytes, 100);
        assert!(!layout.is_aligned());
        assert_eq!(layout.payload_len(), FRAME_BYTES * 2);

        let layout = ContainerLayout::from_len(0);
        assert_eq!(layout.frames, 0);
        assert!(layout.is_aligned());
    }
}
