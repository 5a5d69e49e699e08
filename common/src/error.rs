//! エラー型定義
//!
//! アプリケーション全体で使用する共通エラー型を定義します。

use crate::config::ConfigError;
use crate::transfer::TransferError;
use std::io;
use thiserror::Error;

/// 共通エラー
#[derive(Error, Debug)]
pub enum CommonError {
    /// 入出力エラー
    #[error("I/Oエラー: {0}")]
    IoError(#[from] io::Error),

    /// メディアを読み込めない
    #[error("メディアを読み込めません: {0}")]
    UnreadableMedia(String),

    /// 転送エラー
    #[error("転送エラー: {0}")]
    TransferError(#[from] TransferError),

    /// 設定エラー
    #[error("設定エラー: {0}")]
    ConfigError(#[from] ConfigError),

    /// デシリアライズエラー
    #[error("デシリアライズエラー: {0}")]
    DeserializeError(String),

    /// 無効なパラメータ
    #[error("無効なパラメータ: {0}")]
    InvalidParameterError(String),

    /// その他のエラー
    #[error("{0}")]
    Other(String),
}

/// エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// 成功
    Success = 0,
    /// I/Oエラー
    IoError = 2,
    /// デシリアライズエラー
    DeserializeError = 4,
    /// 設定エラー
    ConfigError = 8,
    /// 無効なパラメータ
    InvalidParameterError = 11,
    /// メディアを読み込めない
    UnreadableMedia = 20,
    /// チャンクが拒否された
    ChunkRejected = 21,
    /// 通信障害
    TransportFault = 22,
    /// その他のエラー
    Other = 99,
}

impl ErrorCode {
    /// エラーコードから文字列表現を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::IoError => "IoError",
            ErrorCode::DeserializeError => "DeserializeError",
            ErrorCode::ConfigError => "ConfigError",
            ErrorCode::InvalidParameterError => "InvalidParameterError",
            ErrorCode::UnreadableMedia => "UnreadableMedia",
            ErrorCode::ChunkRejected => "ChunkRejected",
            ErrorCode::TransportFault => "TransportFault",
            ErrorCode::Other => "Other",
        }
    }

    /// プロセス終了コード
    pub fn exit_code(&self) -> i32 {
        *self as i32
    }
}

impl CommonError {
    /// エラーコードを取得
    pub fn code(&self) -> ErrorCode {
        match self {
            CommonError::IoError(_) => ErrorCode::IoError,
            CommonError::UnreadableMedia(_) => ErrorCode::UnreadableMedia,
            CommonError::TransferError(e) => match e {
                TransferError::ChunkRejected { .. } => ErrorCode::ChunkRejected,
                TransferError::TransportFault(_) => ErrorCode::TransportFault,
                TransferError::IoError(_) => ErrorCode::IoError,
                TransferError::InvalidState { .. } | TransferError::InvalidChunkSize(_) => ErrorCode::Other,
            },
            CommonError::ConfigError(_) => ErrorCode::ConfigError,
            CommonError::DeserializeError(_) => ErrorCode::DeserializeError,
            CommonError::InvalidParameterError(_) => ErrorCode::InvalidParameterError,
            CommonError::Other(_) => ErrorCode::Other,
        }
    }
}

/// 結果型のエイリアス
pub type Result<T> = std::result::Result<T, CommonError>;
