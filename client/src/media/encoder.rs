//! コンテナエンコーダ
//!
//! フレームソースから取り出したフレームを RGB565 に変換し、
//! 1つのコンテナファイルに連結して書き出します。

use super::{FrameSource, MediaError};
use image::RgbImage;
use log::{debug, info};
use media_bin_rs_common::codec::{self, EncodingMode};
use media_bin_rs_common::{ContainerKind, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH, MAX_ANIMATION_FRAMES};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;

/// エンコード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// エンコードモード
    pub mode: EncodingMode,
    /// 書き出したフレーム数
    pub frames_written: usize,
    /// 書き出したバイト数
    pub bytes_written: u64,
    /// 最大フレーム数に達して打ち切ったかどうか
    pub reached_cap: bool,
}

/// コンテナエンコーダ
#[derive(Debug, Clone, Copy)]
pub struct BinEncoder {
    /// エンコードモード
    mode: EncodingMode,
    /// 最大フレーム数（1〜MAX_ANIMATION_FRAMES）
    max_frames: usize,
}

impl BinEncoder {
    /// 新しいエンコーダを作成
    pub fn new(mode: EncodingMode) -> Self {
        Self {
            mode,
            max_frames: MAX_ANIMATION_FRAMES,
        }
    }

    /// コンテナの種類に合わせたエンコーダを作成
    pub fn for_kind(kind: ContainerKind) -> Option<Self> {
        let mode = kind.encoding_mode()?;
        let max_frames = kind.frame_cap()?;
        Some(Self::new(mode).with_max_frames(max_frames))
    }

    /// 最大フレーム数を設定
    ///
    /// 値は 1〜`MAX_ANIMATION_FRAMES` に丸めます。
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames.clamp(1, MAX_ANIMATION_FRAMES);
        self
    }

    /// エンコードモード
    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// 最大フレーム数
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// 1フレームをエンコードしてバッファに追記
    pub fn encode_frame(&self, frame: &RgbImage, out: &mut Vec<u8>) -> Result<(), MediaError> {
        let (width, height) = frame.dimensions();
        if width != FRAME_WIDTH || height != FRAME_HEIGHT {
            return Err(MediaError::FrameSizeMismatch { width, height });
        }

        codec::encode_rgb_into(frame.as_raw(), self.mode, out);
        Ok(())
    }

    /// フレーム列をエンコードしてライターへ書き出す
    ///
    /// 最大フレーム数に達した時点で、それ以降のフレームは取り出さずに終了します。
    pub fn encode_to_writer<I, W>(&self, frames: I, mut writer: W) -> Result<EncodeSummary, MediaError>
    where
        I: IntoIterator<Item = Result<RgbImage, MediaError>>,
        W: Write,
    {
        let mut summary = EncodeSummary {
            mode: self.mode,
            frames_written: 0,
            bytes_written: 0,
            reached_cap: false,
        };

        let mut buffer = Vec::with_capacity(FRAME_BYTES);
        let mut frames = frames.into_iter();

        loop {
            if summary.frames_written >= self.max_frames {
                info!("最大フレーム数 {} に達したため変換を終了します", self.max_frames);
                summary.reached_cap = true;
                break;
            }

            let frame = match frames.next() {
                Some(frame) => frame?,
                None => break,
            };

            buffer.clear();
            self.encode_frame(&frame, &mut buffer)?;
            writer.write_all(&buffer)?;

            summary.frames_written += 1;
            summary.bytes_written += buffer.len() as u64;
            debug!("フレーム {} を書き出しました", summary.frames_written);
        }

        writer.flush()?;
        Ok(summary)
    }

    /// フレームソースをエンコードしてライターへ書き出す
    pub fn encode_source<W: Write>(&self, source: &FrameSource, writer: W) -> Result<EncodeSummary, MediaError> {
        self.encode_to_writer(source.frames()?, writer)
    }

    /// フレームソースをエンコードしてファイルに保存
    ///
    /// 同じディレクトリの一時ファイルに書き出し、成功した場合のみ置き換えます。
    /// 失敗した場合は出力先に何も残りません。
    pub fn encode_file(&self, source: &FrameSource, path: &Path) -> Result<EncodeSummary, MediaError> {
        info!("{} を {} モードで {:?} に変換します", source.describe(), self.mode, path);
        let start_time = Instant::now();

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;

        let summary = {
            let writer = BufWriter::new(temp.as_file_mut());
            self.encode_source(source, writer)?
        };

        temp.persist(path).map_err(|e| MediaError::IoError(e.error))?;

        info!(
            "変換完了: {} フレーム / {} バイト ({:?})",
            summary.frames_written,
            summary.bytes_written,
            start_time.elapsed()
        );
        Ok(summary)
    }
}
