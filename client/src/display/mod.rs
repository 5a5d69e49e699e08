//! ディスプレイモジュール
//!
//! コンテナをフレーム画像に復元し、プレビュー用に書き出す機能を担当します。

mod decoder;

pub use decoder::BinDecoder;

use image::ImageError;
use media_bin_rs_common::CommonError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// 表示できる最小FPS
pub const MIN_PREVIEW_FPS: u32 = 1;

/// 表示できる最大FPS
pub const MAX_PREVIEW_FPS: u32 = 60;

/// ディスプレイエラー
#[derive(Error, Debug)]
pub enum DisplayError {
    /// 画像の書き出しエラー
    #[error("画像の書き出しに失敗しました: {0}")]
    Image(#[from] ImageError),

    /// 入出力エラー
    #[error("入出力エラー: {0}")]
    Io(#[from] io::Error),
}

impl From<DisplayError> for CommonError {
    fn from(err: DisplayError) -> Self {
        match err {
            DisplayError::Io(e) => CommonError::IoError(e),
            other => CommonError::Other(other.to_string()),
        }
    }
}

/// FPS からフレームの表示間隔を計算
///
/// FPS は 1〜60 の範囲に丸めます。
pub fn frame_interval(fps: u32) -> Duration {
    let fps = fps.clamp(MIN_PREVIEW_FPS, MAX_PREVIEW_FPS);
    Duration::from_millis(1000 / fps as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(10), Duration::from_millis(100));
        assert_eq!(frame_interval(15), Duration::from_millis(66));
        assert_eq!(frame_interval(0), Duration::from_millis(1000));
        assert_eq!(frame_interval(240), Duration::from_millis(16));
    }
}
