//! デバイス HTTP クライアント
//!
//! コンテナをチャンクごとに HTTP POST でデバイスへ送信します。

use super::transport_fault;
use log::{debug, info, warn};
use media_bin_rs_common::{
    ChunkSink, ChunkedTransport, ContainerKind, DeviceConfig, TransferError, TransferProgress, TransferReport,
};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::path::Path;

/// デバイスクライアント
#[derive(Debug, Clone)]
pub struct HttpDevice {
    /// HTTP クライアント
    client: Client,
    /// 接続情報
    config: DeviceConfig,
}

impl HttpDevice {
    /// 接続情報からクライアントを作成
    pub fn new(config: DeviceConfig) -> Result<Self, TransferError> {
        let client = Client::builder().timeout(config.timeout()).build().map_err(transport_fault)?;
        Ok(Self { client, config })
    }

    /// 接続情報
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// アップロード前にデバイスへ通知
    ///
    /// 失敗しても警告を出すだけで処理は続行します。通知が受理されたかどうかを返します。
    pub fn notify(&self) -> bool {
        let url = self.config.root_url();
        match self.client.get(&url).send() {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("通知 {} -> {}", url, response.status());
                true
            }
            Ok(response) => {
                warn!("デバイスへの通知に失敗しました ({}): ステータス {}", url, response.status());
                false
            }
            Err(e) => {
                warn!("デバイスへの通知に失敗しました ({}): {}", url, e);
                false
            }
        }
    }

    /// 指定の種類のアップロード先を作成
    pub fn sink(&self, kind: ContainerKind) -> DeviceSink<'_> {
        DeviceSink {
            client: &self.client,
            url: self.config.upload_url(kind),
        }
    }

    /// コンテナファイルをアップロード
    pub fn upload<F>(
        &self,
        path: &Path,
        kind: ContainerKind,
        transport: &ChunkedTransport,
        on_progress: F,
    ) -> Result<TransferReport, TransferError>
    where
        F: FnMut(&TransferProgress),
    {
        if kind.notifies_device() {
            self.notify();
        }

        let mut sink = self.sink(kind);
        info!("{} へ送信します", sink.url());
        transport.upload_file(path, &mut sink, on_progress)
    }
}

/// デバイスのアップロードエンドポイント
#[derive(Debug)]
pub struct DeviceSink<'a> {
    client: &'a Client,
    url: String,
}

impl DeviceSink<'_> {
    /// 送信先 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChunkSink for DeviceSink<'_> {
    fn send_chunk(&mut self, offset: u64, chunk: &[u8]) -> Result<(), TransferError> {
        let response = self
            .client
            .post(&self.url)
            .body(chunk.to_vec())
            .send()
            .map_err(transport_fault)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(TransferError::ChunkRejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("オフセット {} の {} バイトを送信しました", offset, chunk.len());
        Ok(())
    }
}
