//! ネットワークモジュール
//!
//! デバイスへのチャンクアップロードと、カタログサーバーとの通信を担当します。
//! どちらもブロッキング HTTP クライアントで逐次的に通信します。

mod catalog;
mod device;

pub use catalog::{CatalogClient, CatalogError};
pub use device::{DeviceSink, HttpDevice};

use media_bin_rs_common::TransferError;

/// HTTP クライアントのエラーを通信障害に変換
pub(crate) fn transport_fault(err: reqwest::Error) -> TransferError {
    let kind = if err.is_timeout() {
        "タイムアウト"
    } else if err.is_connect() {
        "接続失敗"
    } else if err.is_request() {
        "リクエスト送信失敗"
    } else if err.is_body() || err.is_decode() {
        "応答の受信失敗"
    } else {
        "HTTPエラー"
    };

    TransferError::TransportFault(format!("{}: {}", kind, err))
}
