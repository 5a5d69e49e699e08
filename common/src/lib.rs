//! RGB565 コンテナ共通ライブラリ
//!
//! このクレートは、画像を RGB565 のフラットなバイナリコンテナに変換して
//! デバイスへ転送するアプリケーションで使用される共通の機能を提供します。
//! ピクセルコーデック、コンテナ形式、チャンク転送、カタログプロトコルを含みます。

pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod protocol;
pub mod transfer;
pub mod utils;

// 主要コンポーネントを再エクスポート
pub use codec::{EncodingMode, Rgb565};
pub use container::{ContainerLayout, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH, MAX_ANIMATION_FRAMES};
pub use error::{CommonError, ErrorCode, Result};
pub use protocol::{CatalogEntry, ContainerKind, DeviceConfig, Sidecar};
pub use transfer::{
    ChunkSink, ChunkedTransport, TransferError, TransferProgress, TransferReport, TransferSession, TransferState,
};

/// ライブラリのバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
