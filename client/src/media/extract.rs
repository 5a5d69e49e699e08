//! 動画フレーム抽出
//!
//! 外部ツール（ffmpeg）を使って動画から一定間隔でフレーム画像を書き出します。

use super::source::collect_frame_files;
use super::MediaError;
use log::{debug, info};
use media_bin_rs_common::container::VIDEO_SAMPLE_FPS;
use media_bin_rs_common::{FRAME_HEIGHT, FRAME_WIDTH};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// フレーム抽出器
pub trait FrameExtractor {
    /// 動画からフレーム画像を抽出し、再生順に並んだパスを返す
    fn extract(&self, video: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, MediaError>;
}

/// ffmpeg によるフレーム抽出
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    /// 実行ファイル名
    program: String,
    /// サンプリングFPS
    fps: u32,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            fps: VIDEO_SAMPLE_FPS,
        }
    }
}

impl FfmpegExtractor {
    /// 実行ファイルを指定して作成
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// サンプリングFPSを設定
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// サンプリングFPS
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// コマンドライン引数を組み立てる
    pub fn args(&self, video: &Path, out_dir: &Path) -> Vec<OsString> {
        let filter = format!("fps={},scale={}:{}", self.fps, FRAME_WIDTH, FRAME_HEIGHT);
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            video.as_os_str().to_os_string(),
            "-vf".into(),
            filter.into(),
            out_dir.join("frame_%04d.ppm").into_os_string(),
        ]
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(&self, video: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
        if !video.is_file() {
            return Err(MediaError::unreadable(video, "ファイルが見つかりません"));
        }

        let args = self.args(video, out_dir);
        info!("{} で {:?} から {} fps でフレームを抽出します", self.program, video, self.fps);
        debug!("{} {:?}", self.program, args);

        let output = Command::new(&self.program).args(&args).output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MediaError::ExtractError(format!("{} が見つかりません", self.program)),
            _ => MediaError::ExtractError(format!("{} を実行できません: {}", self.program, e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::unreadable(
                video,
                format!(
                    "{} が失敗しました (終了コード: {}): {}",
                    self.program,
                    output.status.code().map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()),
                    stderr.trim()
                ),
            ));
        }

        let frames = collect_frame_files(out_dir)?;
        if frames.is_empty() {
            return Err(MediaError::unreadable(video, "フレームを抽出できませんでした"));
        }

        info!("{} フレームを抽出しました", frames.len());
        Ok(frames)
    }
}
