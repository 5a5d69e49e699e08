//! 通信プロトコル定義
//!
//! デバイスへのチャンクアップロードのエンドポイントと、
//! カタログサーバーとの間で送受信される JSON メッセージを定義します。

use crate::codec::EncodingMode;
use crate::container::MAX_ANIMATION_FRAMES;
use crate::transfer::{ANIMATION_CHUNK_SIZE, IMAGE_CHUNK_SIZE};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// デフォルトのデバイスアドレス
pub const DEFAULT_DEVICE_ADDRESS: &str = "192.168.1.1";

/// 静止画アップロードのパス
pub const STATIC_UPLOAD_PATH: &str = "/upload";

/// アニメーションアップロードのパス
pub const ANIMATION_UPLOAD_PATH: &str = "/uploada";

/// 推奨FPSが無い場合のプレビューFPS
pub const DEFAULT_PREVIEW_FPS: u32 = 15;

/// 転送するコンテナの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// 静止画（1フレーム、静止画モード）
    StaticImage,
    /// GIF・動画から変換したアニメーション
    Animation,
    /// 既存の bin ファイルをそのまま転送
    Passthrough,
}

impl ContainerKind {
    /// アップロード先のパス
    pub fn upload_path(&self) -> &'static str {
        match self {
            ContainerKind::StaticImage => STATIC_UPLOAD_PATH,
            ContainerKind::Animation | ContainerKind::Passthrough => ANIMATION_UPLOAD_PATH,
        }
    }

    /// チャンクサイズ
    pub fn chunk_size(&self) -> usize {
        match self {
            ContainerKind::Animation => ANIMATION_CHUNK_SIZE,
            ContainerKind::StaticImage | ContainerKind::Passthrough => IMAGE_CHUNK_SIZE,
        }
    }

    /// 変換時のエンコードモード（そのまま転送する場合は不明）
    pub fn encoding_mode(&self) -> Option<EncodingMode> {
        match self {
            ContainerKind::StaticImage => Some(EncodingMode::Static),
            ContainerKind::Animation => Some(EncodingMode::Animation),
            ContainerKind::Passthrough => None,
        }
    }

    /// 変換時の最大フレーム数
    pub fn frame_cap(&self) -> Option<usize> {
        match self {
            ContainerKind::StaticImage => Some(1),
            ContainerKind::Animation => Some(MAX_ANIMATION_FRAMES),
            ContainerKind::Passthrough => None,
        }
    }

    /// アップロード前にデバイスへ通知するかどうか
    pub fn notifies_device(&self) -> bool {
        matches!(self, ContainerKind::StaticImage)
    }
}

/// デバイス接続情報
///
/// 起動時に一度だけ決定し、以降は変更しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    address: String,
    timeout: Duration,
}

impl DeviceConfig {
    /// 新しい接続情報を作成
    pub fn new(address: &str, timeout: Duration) -> Self {
        let address = address.trim();
        // スキームは http 固定なので、指定されていれば取り除く
        let address = match address.split_once("://") {
            Some((_, rest)) => rest,
            None => address,
        };
        let address = address.trim_end_matches('/').to_string();

        Self { address, timeout }
    }

    /// デバイスアドレス
    pub fn address(&self) -> &str {
        &self.address
    }

    /// リクエストのタイムアウト
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// デバイスのルート URL
    pub fn root_url(&self) -> String {
        format!("http://{}/", self.address)
    }

    /// アップロード先の URL
    pub fn upload_url(&self, kind: ContainerKind) -> String {
        format!("http://{}{}", self.address, kind.upload_path())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ADDRESS, Duration::from_secs(10))
    }
}

/// カタログのエントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// ファイル名
    #[serde(rename = "n")]
    pub filename: String,
    /// 表示名
    #[serde(rename = "pn", default)]
    pub name: String,
    /// 作者
    #[serde(rename = "by", default)]
    pub author: String,
    /// 説明
    #[serde(rename = "in", default)]
    pub description: String,
    /// 推奨FPS
    #[serde(rename = "fp", default, deserialize_with = "deserialize_fps")]
    pub suggested_fps: Option<u32>,
}

impl CatalogEntry {
    /// 推奨FPS（未設定なら既定値）
    pub fn fps_or_default(&self) -> u32 {
        self.suggested_fps.unwrap_or(DEFAULT_PREVIEW_FPS)
    }

    /// キーワードに一致するかどうか（大文字小文字を区別しない）
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return true;
        }

        [&self.filename, &self.name, &self.author, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&keyword))
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | 名前: {} | 作者: {} | 説明: {} | 推奨FPS: {}",
            self.filename,
            self.name,
            self.author,
            self.description,
            self.fps_or_default()
        )
    }
}

/// キーワードでエントリを絞り込む
pub fn search<'a>(entries: &'a [CatalogEntry], keyword: &str) -> Vec<&'a CatalogEntry> {
    entries.iter().filter(|e| e.matches(keyword)).collect()
}

/// カタログに登録するメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    /// 表示名
    #[serde(rename = "pn")]
    pub name: String,
    /// 作者
    #[serde(rename = "by")]
    pub author: String,
    /// 説明
    #[serde(rename = "in")]
    pub description: String,
    /// 推奨FPS
    #[serde(rename = "fp")]
    pub fps: u32,
}

/// 一覧取得の応答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// 結果（"ok" / "error"）
    pub r: String,
    /// エントリ一覧
    #[serde(default)]
    pub d: Vec<CatalogEntry>,
}

/// アップロードの応答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// 結果（"ok" / "error"）
    pub r: String,
    /// エラーメッセージ
    #[serde(default)]
    pub msg: Option<String>,
}

impl StatusResponse {
    /// 成功かどうか
    pub fn is_ok(&self) -> bool {
        self.r == "ok"
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FpsRepr {
    Number(u32),
    Text(String),
}

/// 数値・文字列どちらの FPS も受け付ける
fn deserialize_fps<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FpsRepr>::deserialize(deserializer)? {
        Some(FpsRepr::Number(n)) => Some(n),
        Some(FpsRepr::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
