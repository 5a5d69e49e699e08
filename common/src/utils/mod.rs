//! ユーティリティモジュール
//!
//! 各種ユーティリティ機能を提供します。

/// パス関連のユーティリティ
pub mod path {
    use std::path::PathBuf;

    /// 設定ディレクトリを取得
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("media-bin-rs")
    }
}

/// 数値関連のユーティリティ
pub mod number {
    /// バイト単位を人間が読みやすい形式に変換
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

        if bytes == 0 {
            return "0 B".to_string();
        }

        let bytes_f64 = bytes as f64;
        let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
        let exponent = exponent.min(UNITS.len() - 1);

        let value = bytes_f64 / 1024_f64.powi(exponent as i32);

        if exponent == 0 {
            format!("{} {}", value as u64, UNITS[exponent])
        } else {
            format!("{:.2} {}", value, UNITS[exponent])
        }
    }
}
