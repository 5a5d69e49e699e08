//! メインアプリケーション
//!
//! 変換・デバイス転送・プレビュー・カタログ操作をまとめたアプリケーションを実装します。

use crate::config::ClientSettings;
use crate::display::{frame_interval, BinDecoder};
use crate::media::{BinEncoder, EncodeSummary, FrameExtractor, FrameSource};
use crate::network::{CatalogClient, HttpDevice};
use log::{info, warn};
use media_bin_rs_common::protocol::{search, DEFAULT_PREVIEW_FPS};
use media_bin_rs_common::{
    CatalogEntry, CommonError, ContainerKind, ContainerLayout, DeviceConfig, EncodingMode, Result, Sidecar,
    TransferProgress, TransferReport,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// アップロード結果
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// 転送したコンテナ
    pub container: PathBuf,
    /// 変換結果（そのまま転送した場合は None）
    pub encode: Option<EncodeSummary>,
    /// 転送結果
    pub transfer: TransferReport,
}

/// プレビュー結果
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    /// 書き出したフレーム画像
    pub frames: Vec<PathBuf>,
    /// 末尾の余りバイト数
    pub trailing_bytes: usize,
    /// フレームの表示間隔
    pub interval: Duration,
}

/// アプリケーション
pub struct App {
    /// 設定
    settings: ClientSettings,
    /// デバイス接続情報
    device: DeviceConfig,
}

impl App {
    /// 新しいアプリケーションを作成
    ///
    /// `device_address` が指定された場合は設定ファイルのアドレスより優先します。
    pub fn new(settings: ClientSettings, device_address: Option<&str>) -> Self {
        let device = settings.device_config(device_address);
        info!("デバイス: {}", device.address());
        Self { settings, device }
    }

    /// 設定
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// デバイス接続情報
    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// 入力を任意のモードでコンテナに変換
    ///
    /// ディレクトリを渡した場合はフレーム画像の列として扱います。
    /// フレーム数は設定の最大フレーム数で打ち切ります。
    pub fn convert(&self, input: &Path, output: &Path, mode: EncodingMode) -> Result<EncodeSummary> {
        let source = if input.is_dir() {
            FrameSource::sequence_dir(input)?
        } else {
            FrameSource::open(input)?
        };

        let summary = BinEncoder::new(mode)
            .with_max_frames(self.settings.transfer.max_frames)
            .encode_file(&source, output)?;
        Ok(summary)
    }

    /// 静止画を変換してデバイスへ送信
    pub fn upload_image<F>(&self, path: &Path, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        let source = FrameSource::Still(path.to_path_buf());
        self.encode_and_upload(&source, ContainerKind::StaticImage, on_progress)
    }

    /// GIF アニメーションを変換してデバイスへ送信
    pub fn upload_animation<F>(&self, path: &Path, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        let source = FrameSource::open(path)?;
        self.encode_and_upload(&source, ContainerKind::Animation, on_progress)
    }

    /// 動画からフレームを抽出し、変換してデバイスへ送信
    pub fn upload_video<F>(&self, path: &Path, extractor: &dyn FrameExtractor, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        // 抽出したフレームは関数を抜けると削除される
        let work_dir = tempfile::tempdir()?;
        let frames = extractor.extract(path, work_dir.path())?;
        let source = FrameSource::Sequence(frames);
        self.encode_and_upload(&source, ContainerKind::Animation, on_progress)
    }

    /// 抽出済みフレーム画像のディレクトリを変換してデバイスへ送信
    pub fn upload_frames_dir<F>(&self, dir: &Path, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        let source = FrameSource::sequence_dir(dir)?;
        self.encode_and_upload(&source, ContainerKind::Animation, on_progress)
    }

    /// 既存のコンテナをそのままデバイスへ送信
    pub fn upload_bin<F>(&self, path: &Path, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        let len = fs::metadata(path)
            .map_err(|e| CommonError::UnreadableMedia(format!("{}: {}", path.display(), e)))?
            .len();
        let layout = ContainerLayout::from_len(len as usize);
        if !layout.is_aligned() {
            warn!(
                "{:?} のサイズ {} はフレームサイズの倍数ではありません ({} フレーム + {} バイト)",
                path, len, layout.frames, layout.trailing_bytes
            );
        }

        let transfer = self.send(path, ContainerKind::Passthrough, on_progress)?;
        Ok(UploadOutcome {
            container: path.to_path_buf(),
            encode: None,
            transfer,
        })
    }

    /// コンテナをフレーム画像として書き出す
    pub fn preview(&self, bin: &Path, mode: EncodingMode, out_dir: &Path, fps: u32) -> Result<PreviewOutcome> {
        let data = fs::read(bin).map_err(|e| CommonError::UnreadableMedia(format!("{}: {}", bin.display(), e)))?;
        export_preview(&data, &bin.display().to_string(), mode, out_dir, fps)
    }

    /// カタログのコンテナをダウンロードし、そのままフレーム画像として書き出す
    ///
    /// `fps` を省略した場合はカタログに登録された推奨FPSを使います。
    pub fn catalog_preview(
        &self,
        filename: &str,
        mode: EncodingMode,
        out_dir: &Path,
        fps: Option<u32>,
    ) -> Result<PreviewOutcome> {
        let catalog = self.catalog()?;
        let fps = match fps {
            Some(fps) => fps,
            None => catalog
                .list()?
                .iter()
                .find(|entry| entry.filename == filename)
                .map(CatalogEntry::fps_or_default)
                .unwrap_or(DEFAULT_PREVIEW_FPS),
        };

        let transport = self.settings.transport_for(ContainerKind::Animation);
        let data = catalog.download_to_vec(filename, &transport, |_| {})?;
        info!("{} ({} バイト) を {} モードで展開します", filename, data.len(), mode);
        export_preview(&data, filename, mode, out_dir, fps)
    }

    /// カタログの一覧を取得（キーワードで絞り込み）
    pub fn catalog_list(&self, keyword: Option<&str>) -> Result<Vec<CatalogEntry>> {
        let entries = self.catalog()?.list()?;
        Ok(match keyword {
            Some(keyword) => search(&entries, keyword).into_iter().cloned().collect(),
            None => entries,
        })
    }

    /// カタログからコンテナをダウンロード
    pub fn catalog_download<F>(&self, filename: &str, dest: &Path, on_progress: F) -> Result<TransferReport>
    where
        F: FnMut(&TransferProgress),
    {
        let transport = self.settings.transport_for(ContainerKind::Animation);
        let report = self.catalog()?.download(filename, dest, &transport, on_progress)?;
        Ok(report)
    }

    /// コンテナとメタデータをカタログへアップロード
    pub fn catalog_upload(&self, path: &Path, sidecar: &Sidecar) -> Result<()> {
        self.catalog()?.upload(path, sidecar)?;
        Ok(())
    }

    fn catalog(&self) -> Result<CatalogClient> {
        Ok(CatalogClient::new(&self.settings.catalog.server_url, self.settings.timeout())?)
    }

    fn encode_and_upload<F>(&self, source: &FrameSource, kind: ContainerKind, on_progress: F) -> Result<UploadOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        let encoder = match kind {
            ContainerKind::Animation => {
                BinEncoder::new(EncodingMode::Animation).with_max_frames(self.settings.transfer.max_frames)
            }
            _ => BinEncoder::for_kind(kind)
                .ok_or_else(|| CommonError::InvalidParameterError(format!("{:?} は変換できません", kind)))?,
        };

        let container = self.settings.output_path(kind).to_path_buf();
        let summary = encoder.encode_file(source, &container)?;
        let transfer = self.send(&container, kind, on_progress)?;

        Ok(UploadOutcome {
            container,
            encode: Some(summary),
            transfer,
        })
    }

    fn send<F>(&self, path: &Path, kind: ContainerKind, on_progress: F) -> Result<TransferReport>
    where
        F: FnMut(&TransferProgress),
    {
        let device = HttpDevice::new(self.device.clone())?;
        let transport = self.settings.transport_for(kind);
        Ok(device.upload(path, kind, &transport, on_progress)?)
    }
}

/// コンテナのバイト列をデコードしてフレーム画像を書き出す
fn export_preview(data: &[u8], label: &str, mode: EncodingMode, out_dir: &Path, fps: u32) -> Result<PreviewOutcome> {
    let decoder = BinDecoder::new(data, mode);
    if decoder.frame_count() == 0 {
        return Err(CommonError::UnreadableMedia(format!("{}: フレームがありません", label)));
    }

    let frames = decoder.export_png_sequence(out_dir)?;
    Ok(PreviewOutcome {
        frames,
        trailing_bytes: decoder.trailing_bytes(),
        interval: frame_interval(fps),
    })
}
