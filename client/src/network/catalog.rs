//! カタログサーバークライアント
//!
//! 共有されたコンテナの一覧取得・ダウンロード・アップロードを行います。

use super::transport_fault;
use log::{debug, info};
use media_bin_rs_common::protocol::{ListResponse, StatusResponse};
use media_bin_rs_common::{
    CatalogEntry, ChunkedTransport, CommonError, Sidecar, TransferError, TransferProgress, TransferReport,
};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// 推奨FPSの範囲
const SIDECAR_FPS_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// カタログエラー
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP 通信エラー
    #[error("カタログサーバーとの通信に失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    /// サーバーが要求を拒否した
    #[error("カタログサーバーが要求を拒否しました (ステータス {status}): {message}")]
    Rejected {
        /// HTTP ステータスコード
        status: u16,
        /// エラーメッセージ
        message: String,
    },

    /// 応答の JSON が不正
    #[error("応答の解析に失敗しました: {0}")]
    Json(#[from] serde_json::Error),

    /// 入出力エラー
    #[error("入出力エラー: {0}")]
    Io(#[from] io::Error),

    /// 転送エラー
    #[error("転送エラー: {0}")]
    Transfer(#[from] TransferError),

    /// ファイル名が不正
    #[error("不正なファイル名です: {0}")]
    InvalidFileName(String),

    /// メタデータが不正
    #[error("不正なメタデータです: {0}")]
    InvalidSidecar(String),
}

impl From<CatalogError> for CommonError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Http(e) => CommonError::TransferError(transport_fault(e)),
            CatalogError::Transfer(e) => CommonError::TransferError(e),
            CatalogError::Io(e) => CommonError::IoError(e),
            CatalogError::Json(e) => CommonError::DeserializeError(e.to_string()),
            e @ (CatalogError::InvalidFileName(_) | CatalogError::InvalidSidecar(_)) => {
                CommonError::InvalidParameterError(e.to_string())
            }
            other => CommonError::Other(other.to_string()),
        }
    }
}

/// カタログサーバークライアント
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// サーバー URL からクライアントを作成
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// サーバー URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 登録済みコンテナの一覧を取得
    pub fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = format!("{}/list", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).send()?;
        let response = ensure_ok(response)?;
        let list: ListResponse = serde_json::from_str(&response.text()?)?;

        if list.r != "ok" {
            return Err(CatalogError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: format!("r = {}", list.r),
            });
        }

        info!("カタログから {} 件のエントリを取得しました", list.d.len());
        Ok(list.d)
    }

    /// コンテナをダウンロードしてファイルに保存
    ///
    /// 失敗した場合は保存先に何も残りません。
    pub fn download<F>(
        &self,
        filename: &str,
        dest: &Path,
        transport: &ChunkedTransport,
        on_progress: F,
    ) -> Result<TransferReport, CatalogError>
    where
        F: FnMut(&TransferProgress),
    {
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;

        let report = {
            let writer = BufWriter::new(temp.as_file_mut());
            self.download_to_writer(filename, writer, transport, on_progress)?
        };

        temp.persist(dest).map_err(|e| CatalogError::Io(e.error))?;
        info!("{} を {:?} に保存しました", filename, dest);
        Ok(report)
    }

    /// コンテナをダウンロードしてメモリに読み込む
    pub fn download_to_vec<F>(
        &self,
        filename: &str,
        transport: &ChunkedTransport,
        on_progress: F,
    ) -> Result<Vec<u8>, CatalogError>
    where
        F: FnMut(&TransferProgress),
    {
        let mut data = Vec::new();
        self.download_to_writer(filename, &mut data, transport, on_progress)?;
        Ok(data)
    }

    fn download_to_writer<W, F>(
        &self,
        filename: &str,
        writer: W,
        transport: &ChunkedTransport,
        on_progress: F,
    ) -> Result<TransferReport, CatalogError>
    where
        W: io::Write,
        F: FnMut(&TransferProgress),
    {
        validate_file_name(filename)?;

        let url = format!("{}/download/{}", self.base_url, filename);
        debug!("GET {}", url);

        let response = ensure_ok(self.client.get(&url).send()?)?;
        let total = response.content_length();
        Ok(transport.download(response, total, writer, on_progress)?)
    }

    /// コンテナとメタデータをアップロード
    pub fn upload(&self, path: &Path, sidecar: &Sidecar) -> Result<(), CatalogError> {
        let is_bin = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("bin"))
            .unwrap_or(false);
        if !is_bin {
            return Err(CatalogError::InvalidFileName(path.display().to_string()));
        }
        if !SIDECAR_FPS_RANGE.contains(&sidecar.fps) {
            return Err(CatalogError::InvalidSidecar(format!("FPS は 1〜60 で指定してください: {}", sidecar.fps)));
        }

        let ini = serde_json::to_string(sidecar)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = Part::bytes(fs::read(path)?).file_name(file_name);
        let form = Form::new().part("file", file).text("ini", ini);

        let url = format!("{}/upload", self.base_url);
        info!("{:?} を {} にアップロードします", path, url);

        let response = self.client.post(&url).multipart(form).send()?;
        let status = response.status();
        let body = response.text()?;
        let parsed: Option<StatusResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(result) if status == StatusCode::OK && result.is_ok() => {
                info!("アップロード完了");
                Ok(())
            }
            Some(result) => Err(CatalogError::Rejected {
                status: status.as_u16(),
                message: result.msg.unwrap_or(result.r),
            }),
            None => Err(CatalogError::Rejected {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

/// 200 以外の応答をエラーにする
fn ensure_ok(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let message = response.text().unwrap_or_default();
    Err(CatalogError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// サーバー上のファイル名として安全か確認
fn validate_file_name(filename: &str) -> Result<(), CatalogError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.chars().any(char::is_control);

    if invalid {
        return Err(CatalogError::InvalidFileName(filename.to_string()));
    }
    Ok(())
}
