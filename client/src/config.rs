//! クライアント設定
//!
//! クライアントの設定情報を管理するモジュール

use log::{debug, info};
use media_bin_rs_common::config::{self, ConfigError};
use media_bin_rs_common::protocol::DEFAULT_DEVICE_ADDRESS;
use media_bin_rs_common::transfer::{ANIMATION_CHUNK_SIZE, IMAGE_CHUNK_SIZE};
use media_bin_rs_common::utils::path::get_config_dir;
use media_bin_rs_common::{ChunkedTransport, ContainerKind, DeviceConfig, MAX_ANIMATION_FRAMES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 設定ファイル名
const CONFIG_FILE_NAME: &str = "client.toml";

/// クライアント設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// デバイス設定
    pub device: DeviceSettings,
    /// カタログ設定
    pub catalog: CatalogSettings,
    /// 転送設定
    pub transfer: TransferSettings,
    /// 出力設定
    pub output: OutputSettings,
}

/// デバイス設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// デバイスアドレス
    pub address: String,
    /// リクエストタイムアウト(秒)
    pub timeout_secs: u64,
}

/// カタログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// カタログサーバー URL
    pub server_url: String,
}

/// 転送設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// アニメーションのチャンクサイズ
    pub animation_chunk_size: usize,
    /// 静止画のチャンクサイズ
    pub image_chunk_size: usize,
    /// チャンク間の待機時間(ミリ秒)
    pub chunk_delay_ms: u64,
    /// アニメーションの最大フレーム数
    pub max_frames: usize,
}

/// 出力設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// アニメーションコンテナの出力先
    pub animation_bin: PathBuf,
    /// 静止画コンテナの出力先
    pub image_bin: PathBuf,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8099".to_string(),
        }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            animation_chunk_size: ANIMATION_CHUNK_SIZE,
            image_chunk_size: IMAGE_CHUNK_SIZE,
            chunk_delay_ms: 10,
            max_frames: MAX_ANIMATION_FRAMES,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            animation_bin: PathBuf::from("animation.bin"),
            image_bin: PathBuf::from("img.bin"),
        }
    }
}

impl ClientSettings {
    /// 既定の設定ファイルパス
    pub fn default_path() -> PathBuf {
        get_config_dir().join(CONFIG_FILE_NAME)
    }

    /// 設定ファイルを読み込み（存在しなければ既定値）
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("設定ファイル {:?} が無いため既定値を使用します", path);
            return Ok(Self::default());
        }

        let settings: Self = config::load_from_file(path)?;
        settings.validate()?;
        info!("設定ファイル {:?} を読み込みました", path);
        Ok(settings)
    }

    /// 設定ファイルに保存
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        config::save_to_file(self, path)
    }

    /// 設定値を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.address.trim().is_empty() {
            return Err(ConfigError::InvalidValue("device.address が空です".to_string()));
        }
        if self.transfer.animation_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("transfer.animation_chunk_size は 1 以上".to_string()));
        }
        if self.transfer.image_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("transfer.image_chunk_size は 1 以上".to_string()));
        }
        if self.transfer.max_frames == 0 || self.transfer.max_frames > MAX_ANIMATION_FRAMES {
            return Err(ConfigError::InvalidValue(format!(
                "transfer.max_frames は 1〜{} の範囲で指定してください: {}",
                MAX_ANIMATION_FRAMES, self.transfer.max_frames
            )));
        }
        Ok(())
    }

    /// デバイス接続情報を作成
    ///
    /// `address` が指定された場合は設定ファイルの値より優先します。
    pub fn device_config(&self, address: Option<&str>) -> DeviceConfig {
        let address = address.unwrap_or(&self.device.address);
        DeviceConfig::new(address, self.timeout())
    }

    /// リクエストタイムアウト
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.device.timeout_secs)
    }

    /// コンテナの種類に合わせた転送エンジンを作成
    pub fn transport_for(&self, kind: ContainerKind) -> ChunkedTransport {
        let chunk_size = match kind {
            ContainerKind::Animation => self.transfer.animation_chunk_size,
            ContainerKind::StaticImage | ContainerKind::Passthrough => self.transfer.image_chunk_size,
        };

        ChunkedTransport::new(chunk_size).with_chunk_delay(Duration::from_millis(self.transfer.chunk_delay_ms))
    }

    /// 種類ごとの出力先
    pub fn output_path(&self, kind: ContainerKind) -> &Path {
        match kind {
            ContainerKind::StaticImage => &self.output.image_bin,
            ContainerKind::Animation | ContainerKind::Passthrough => &self.output.animation_bin,
        }
    }
}
