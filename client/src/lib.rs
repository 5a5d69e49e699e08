//! RGB565 コンテナクライアントライブラリ
//!
//! 画像・GIF・動画を固定解像度の RGB565 コンテナに変換し、
//! デバイスへチャンク転送する機能と、カタログサーバーとの連携機能を提供します。

pub mod app;
pub mod config;
pub mod display;
pub mod media;
pub mod network;

pub use app::App;
pub use config::ClientSettings;
