//! フレームソース
//!
//! 静止画・GIF アニメーション・抽出済みフレーム列から、
//! 固定解像度にリサイズ済みの RGB フレームを順番に取り出します。

use super::MediaError;
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat, RgbImage};
use log::debug;
use media_bin_rs_common::{FRAME_HEIGHT, FRAME_WIDTH};
use std::fs::{self, File};
use std::io::BufReader;
use std::iter;
use std::path::{Path, PathBuf};

/// フレーム列として扱う画像ファイルの拡張子
const SEQUENCE_EXTENSIONS: [&str; 4] = ["ppm", "png", "jpg", "jpeg"];

/// フレームのイテレータ
///
/// 各要素は `FRAME_WIDTH` x `FRAME_HEIGHT` の 8ビット RGB 画像です。
pub struct Frames<'a> {
    inner: Box<dyn Iterator<Item = Result<RgbImage, MediaError>> + 'a>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<RgbImage, MediaError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// フレームソース
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// 静止画（1フレーム）
    Still(PathBuf),
    /// GIF アニメーション
    Animation(PathBuf),
    /// 動画から抽出したフレーム画像の列
    Sequence(Vec<PathBuf>),
    /// メモリ上の画像
    Memory(Vec<DynamicImage>),
}

impl FrameSource {
    /// ファイル形式を判定してソースを作成
    ///
    /// GIF はアニメーション、それ以外は静止画として扱います。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let format = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| MediaError::unreadable(path, e))?
            .format()
            .ok_or_else(|| MediaError::unreadable(path, "不明な画像形式です"))?;

        Ok(match format {
            ImageFormat::Gif => FrameSource::Animation(path.to_path_buf()),
            _ => FrameSource::Still(path.to_path_buf()),
        })
    }

    /// ディレクトリ内のフレーム画像をファイル名順に並べたソースを作成
    pub fn sequence_dir<P: AsRef<Path>>(dir: P) -> Result<Self, MediaError> {
        let dir = dir.as_ref();
        let frames = collect_frame_files(dir)?;
        if frames.is_empty() {
            return Err(MediaError::unreadable(dir, "フレーム画像がありません"));
        }

        Ok(FrameSource::Sequence(frames))
    }

    /// ソースの説明
    pub fn describe(&self) -> String {
        match self {
            FrameSource::Still(path) => format!("静止画 {}", path.display()),
            FrameSource::Animation(path) => format!("アニメーション {}", path.display()),
            FrameSource::Sequence(paths) => format!("フレーム列 ({} 枚)", paths.len()),
            FrameSource::Memory(images) => format!("メモリ画像 ({} 枚)", images.len()),
        }
    }

    /// フレームを順番に取り出すイテレータを作成
    ///
    /// 呼び出すたびにメディアを開き直すため、何度でも先頭から読み直せます。
    /// メディアを開けない場合はフレームを返さずにエラーになります。
    pub fn frames(&self) -> Result<Frames<'_>, MediaError> {
        let inner: Box<dyn Iterator<Item = Result<RgbImage, MediaError>> + '_> = match self {
            FrameSource::Still(path) => {
                let image = image::open(path).map_err(|e| MediaError::unreadable(path, e))?;
                Box::new(iter::once(Ok(normalize(&image))))
            }
            FrameSource::Animation(path) => {
                let file = File::open(path).map_err(|e| MediaError::unreadable(path, e))?;
                let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| MediaError::unreadable(path, e))?;
                let path = path.clone();
                Box::new(decoder.into_frames().enumerate().map(move |(index, frame)| {
                    debug!("フレーム {} をデコード", index);
                    frame
                        .map(|f| normalize(&DynamicImage::ImageRgba8(f.into_buffer())))
                        .map_err(|e| MediaError::unreadable(&path, format!("フレーム {}: {}", index, e)))
                }))
            }
            FrameSource::Sequence(paths) => Box::new(paths.iter().map(|path| {
                debug!("{} を読み込み", path.display());
                image::open(path)
                    .map(|image| normalize(&image))
                    .map_err(|e| MediaError::unreadable(path, e))
            })),
            FrameSource::Memory(images) => Box::new(images.iter().map(|image| Ok(normalize(image)))),
        };

        Ok(Frames { inner })
    }
}

/// 任意サイズの画像を固定解像度の RGB 画像に変換
///
/// アスペクト比は維持せず、幅と高さをそれぞれ引き伸ばします。
pub fn normalize(image: &DynamicImage) -> RgbImage {
    if image.width() == FRAME_WIDTH && image.height() == FRAME_HEIGHT {
        return image.to_rgb8();
    }

    image
        .resize_exact(FRAME_WIDTH, FRAME_HEIGHT, FilterType::CatmullRom)
        .to_rgb8()
}

/// ディレクトリ内のフレーム画像をファイル名順に列挙
pub fn collect_frame_files(dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
    let entries = fs::read_dir(dir).map_err(|e| MediaError::unreadable(dir, e))?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SEQUENCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);

        if is_frame && path.is_file() {
            frames.push(path);
        }
    }

    frames.sort();
    Ok(frames)
}
