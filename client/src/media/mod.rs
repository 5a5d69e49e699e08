//! メディア変換モジュール
//!
//! 静止画・GIF・動画フレーム列を読み込み、固定解像度の RGB565 コンテナへ
//! 変換する機能を提供します。

pub mod encoder;
pub mod extract;
pub mod source;

// 主要なコンポーネントを再エクスポート
pub use encoder::{BinEncoder, EncodeSummary};
pub use extract::{FfmpegExtractor, FrameExtractor};
pub use source::{FrameSource, Frames};

use media_bin_rs_common::CommonError;
use std::io;
use std::path::Path;
use thiserror::Error;

/// メディアエラー
#[derive(Error, Debug)]
pub enum MediaError {
    /// メディアが存在しない・壊れている
    #[error("メディアを読み込めません: {0}")]
    UnreadableMedia(String),

    /// フレームサイズが不正
    #[error("フレームサイズが不正です: {width}x{height}")]
    FrameSizeMismatch {
        /// 幅
        width: u32,
        /// 高さ
        height: u32,
    },

    /// 外部ツールの実行エラー
    #[error("フレーム抽出エラー: {0}")]
    ExtractError(String),

    /// 入出力エラー
    #[error("入出力エラー: {0}")]
    IoError(#[from] io::Error),
}

impl MediaError {
    /// パスと原因から読み込みエラーを作成
    pub(crate) fn unreadable(path: &Path, reason: impl std::fmt::Display) -> Self {
        MediaError::UnreadableMedia(format!("{}: {}", path.display(), reason))
    }
}

impl From<MediaError> for CommonError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnreadableMedia(msg) => CommonError::UnreadableMedia(msg),
            e @ MediaError::FrameSizeMismatch { .. } => CommonError::InvalidParameterError(e.to_string()),
            MediaError::IoError(e) => CommonError::IoError(e),
            other => CommonError::Other(other.to_string()),
        }
    }
}
