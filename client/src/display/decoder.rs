//! コンテナデコードモジュール
//!
//! RGB565 コンテナをフレーム単位で RGB 画像に復元します。

use super::DisplayError;
use image::{Rgb, RgbImage};
use log::{debug, info};
use media_bin_rs_common::codec::{self, EncodingMode, BYTES_PER_PIXEL};
use media_bin_rs_common::{ContainerLayout, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH};
use std::fs;
use std::path::{Path, PathBuf};

/// コンテナデコーダ
///
/// エンコード時と同じモードを指定する必要があります（モードはデータから判定しません）。
/// 末尾の1フレームに満たないデータは無視されます。
#[derive(Debug, Clone, Copy)]
pub struct BinDecoder<'a> {
    data: &'a [u8],
    mode: EncodingMode,
}

impl<'a> BinDecoder<'a> {
    /// 新しいデコーダを作成
    pub fn new(data: &'a [u8], mode: EncodingMode) -> Self {
        let layout = ContainerLayout::from_len(data.len());
        if !layout.is_aligned() {
            debug!("末尾の {} バイトは1フレームに満たないため無視します", layout.trailing_bytes);
        }

        Self { data, mode }
    }

    /// デコードモード
    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// コンテナのレイアウト
    pub fn layout(&self) -> ContainerLayout {
        ContainerLayout::from_len(self.data.len())
    }

    /// フレーム数
    pub fn frame_count(&self) -> usize {
        self.layout().frames
    }

    /// 末尾の余りバイト数
    pub fn trailing_bytes(&self) -> usize {
        self.layout().trailing_bytes
    }

    /// 指定番号のフレームをデコード
    pub fn frame(&self, index: usize) -> Option<RgbImage> {
        if index >= self.frame_count() {
            return None;
        }

        let start = index * FRAME_BYTES;
        let slice = &self.data[start..start + FRAME_BYTES];
        let mode = self.mode;

        Some(RgbImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
            let offset = (y * FRAME_WIDTH + x) as usize * BYTES_PER_PIXEL;
            let (r, g, b) = codec::decode([slice[offset], slice[offset + 1]], mode);
            Rgb([r, g, b])
        }))
    }

    /// 先頭から順にフレームをデコードするイテレータ
    pub fn frames(&self) -> impl Iterator<Item = RgbImage> + 'a {
        let decoder = *self;
        (0..decoder.frame_count()).filter_map(move |index| decoder.frame(index))
    }

    /// 全フレームを PNG 連番として書き出す
    ///
    /// `frame_0000.png` から順に保存し、書き出したパスを返します。
    pub fn export_png_sequence(&self, dir: &Path) -> Result<Vec<PathBuf>, DisplayError> {
        fs::create_dir_all(dir)?;

        let mut paths = Vec::with_capacity(self.frame_count());
        for (index, frame) in self.frames().enumerate() {
            let path = dir.join(format!("frame_{:04}.png", index));
            frame.save(&path)?;
            debug!("{:?} を書き出しました", path);
            paths.push(path);
        }

        info!("{} フレームを {:?} に書き出しました", paths.len(), dir);
        Ok(paths)
    }
}
