//! チャンク転送
//!
//! コンテナを固定サイズのチャンクに分割して順番に送受信します。
//! チャンクごとに進捗を通知し、失敗したチャンクがあればその時点で
//! セッションを終了します（自動リトライ・再開はしません）。

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info};
use thiserror::Error;

/// アニメーションコンテナのチャンクサイズ
pub const ANIMATION_CHUNK_SIZE: usize = 4096;

/// 静止画コンテナのチャンクサイズ
pub const IMAGE_CHUNK_SIZE: usize = 2048;

/// チャンク送信後の待機時間
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(10);

/// 転送エラー
#[derive(Error, Debug)]
pub enum TransferError {
    /// エンドポイントがチャンクを拒否した
    #[error("チャンクが拒否されました (ステータス {status}): {body}")]
    ChunkRejected {
        /// HTTP ステータスコード
        status: u16,
        /// レスポンス本文
        body: String,
    },

    /// 接続拒否・タイムアウト・名前解決失敗など
    #[error("通信障害: {0}")]
    TransportFault(String),

    /// ローカルファイルの入出力エラー
    #[error("I/Oエラー: {0}")]
    IoError(#[from] io::Error),

    /// 不正な状態遷移
    #[error("不正な状態遷移: {from} -> {to}")]
    InvalidState {
        /// 遷移元
        from: TransferState,
        /// 遷移先
        to: TransferState,
    },

    /// 無効なチャンクサイズ
    #[error("無効なチャンクサイズ: {0}")]
    InvalidChunkSize(usize),
}

/// 転送状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// 開始前
    Idle,
    /// 転送中
    Transferring,
    /// 完了
    Completed,
    /// 失敗
    Failed,
}

impl TransferState {
    /// 終端状態かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }

    /// 状態名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Idle => "Idle",
            TransferState::Transferring => "Transferring",
            TransferState::Completed => "Completed",
            TransferState::Failed => "Failed",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 転送方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// アップロード
    Upload,
    /// ダウンロード
    Download,
}

/// 進捗情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// 転送方向
    pub direction: TransferDirection,
    /// 今回のチャンク番号（0始まり）
    pub chunk_index: u64,
    /// 今回のチャンクのバイト数
    pub chunk_len: usize,
    /// 累計転送バイト数
    pub transferred: u64,
    /// 総バイト数（不明な場合は None）
    pub total: Option<u64>,
}

impl TransferProgress {
    /// 進捗率（%）
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.transferred as f64 / total as f64 * 100.0),
            None => None,
        }
    }

    /// 小数点以下2桁の進捗率文字列
    pub fn percentage_text(&self) -> Option<String> {
        self.percentage().map(|p| format!("{:.2}", p))
    }
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.percentage(), self.total) {
            (Some(p), Some(total)) => {
                write!(f, "Progress: {:.2}% ({}/{} bytes)", p, self.transferred, total)
            }
            _ => write!(f, "Progress: {} bytes", self.transferred),
        }
    }
}

/// 転送結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferReport {
    /// 転送方向
    pub direction: TransferDirection,
    /// 転送したバイト数
    pub bytes: u64,
    /// 転送したチャンク数
    pub chunks: u64,
    /// 所要時間
    pub elapsed: Duration,
}

/// 転送セッション
///
/// `Idle → Transferring → {Completed | Failed}` の状態遷移を管理します。
#[derive(Debug)]
pub struct TransferSession {
    direction: TransferDirection,
    chunk_size: usize,
    total: Option<u64>,
    transferred: u64,
    chunks: u64,
    state: TransferState,
    started_at: Option<Instant>,
}

impl TransferSession {
    /// 新しいセッションを作成
    pub fn new(direction: TransferDirection, chunk_size: usize, total: Option<u64>) -> Self {
        Self {
            direction,
            chunk_size,
            total,
            transferred: 0,
            chunks: 0,
            state: TransferState::Idle,
            started_at: None,
        }
    }

    /// 転送を開始
    pub fn begin(&mut self) -> Result<(), TransferError> {
        self.transition(TransferState::Transferring)?;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// チャンクの成功を記録して進捗を返す
    pub fn record_chunk(&mut self, len: usize) -> Result<TransferProgress, TransferError> {
        if self.state != TransferState::Transferring {
            return Err(TransferError::InvalidState {
                from: self.state,
                to: TransferState::Transferring,
            });
        }

        let progress = TransferProgress {
            direction: self.direction,
            chunk_index: self.chunks,
            chunk_len: len,
            transferred: self.transferred + len as u64,
            total: self.total,
        };
        self.transferred = progress.transferred;
        self.chunks += 1;

        Ok(progress)
    }

    /// 転送を完了
    pub fn complete(&mut self) -> Result<TransferReport, TransferError> {
        self.transition(TransferState::Completed)?;
        Ok(TransferReport {
            direction: self.direction,
            bytes: self.transferred,
            chunks: self.chunks,
            elapsed: self.started_at.map(|t| t.elapsed()).unwrap_or_default(),
        })
    }

    /// 転送を失敗として終了
    pub fn fail(&mut self) -> Result<(), TransferError> {
        self.transition(TransferState::Failed)
    }

    /// 現在の状態
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// チャンクサイズ
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 累計転送バイト数
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// 転送済みチャンク数
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// 総バイト数
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    fn transition(&mut self, to: TransferState) -> Result<(), TransferError> {
        let allowed = matches!(
            (self.state, to),
            (TransferState::Idle, TransferState::Transferring)
                | (TransferState::Transferring, TransferState::Completed)
                | (TransferState::Transferring, TransferState::Failed)
        );

        if !allowed {
            return Err(TransferError::InvalidState { from: self.state, to });
        }

        debug!("転送状態: {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }
}

/// チャンクの送信先
///
/// 成功以外の応答は `ChunkRejected`、通信そのものの失敗は `TransportFault` を返します。
pub trait ChunkSink {
    /// チャンクを送信
    fn send_chunk(&mut self, offset: u64, chunk: &[u8]) -> Result<(), TransferError>;
}

/// チャンク転送エンジン
#[derive(Debug, Clone, Copy)]
pub struct ChunkedTransport {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl ChunkedTransport {
    /// 指定チャンクサイズのエンジンを作成
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    /// チャンク間の待機時間を設定
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// チャンクサイズ
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// チャンク間の待機時間
    pub fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    /// ファイルをアップロード
    pub fn upload_file<S, F>(&self, path: &Path, sink: &mut S, on_progress: F) -> Result<TransferReport, TransferError>
    where
        S: ChunkSink + ?Sized,
        F: FnMut(&TransferProgress),
    {
        let file = File::open(path)?;
        let total = file.metadata()?.len();
        info!("{:?} をアップロードします ({} バイト, チャンク {} バイト)", path, total, self.chunk_size);

        self.upload(BufReader::new(file), total, sink, on_progress)
    }

    /// リーダーの内容をチャンク単位でアップロード
    pub fn upload<R, S, F>(&self, mut reader: R, total: u64, sink: &mut S, mut on_progress: F) -> Result<TransferReport, TransferError>
    where
        R: Read,
        S: ChunkSink + ?Sized,
        F: FnMut(&TransferProgress),
    {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(self.chunk_size));
        }

        let mut session = TransferSession::new(TransferDirection::Upload, self.chunk_size, Some(total));
        session.begin()?;

        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let len = match read_window(&mut reader, &mut buffer) {
                Ok(len) => len,
                Err(e) => return Err(abort(&mut session, e.into())),
            };
            if len == 0 {
                break;
            }

            if let Err(e) = sink.send_chunk(session.transferred(), &buffer[..len]) {
                return Err(abort(&mut session, e));
            }

            let progress = session.record_chunk(len)?;
            info!("{}", progress);
            on_progress(&progress);

            if !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }

        let report = session.complete()?;
        info!("アップロード完了: {} バイト / {} チャンク ({:?})", report.bytes, report.chunks, report.elapsed);
        Ok(report)
    }

    /// リーダー（リモートエンドポイントの応答本文）からチャンク単位でダウンロード
    ///
    /// 読み取り側の失敗は通信障害、書き込み側の失敗は I/O エラーとして扱います。
    pub fn download<R, W, F>(&self, mut reader: R, total: Option<u64>, mut writer: W, mut on_progress: F) -> Result<TransferReport, TransferError>
    where
        R: Read,
        W: Write,
        F: FnMut(&TransferProgress),
    {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(self.chunk_size));
        }

        let mut session = TransferSession::new(TransferDirection::Download, self.chunk_size, total);
        session.begin()?;

        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let len = match read_window(&mut reader, &mut buffer) {
                Ok(len) => len,
                Err(e) => return Err(abort(&mut session, TransferError::TransportFault(e.to_string()))),
            };
            if len == 0 {
                break;
            }

            if let Err(e) = writer.write_all(&buffer[..len]) {
                return Err(abort(&mut session, e.into()));
            }

            let progress = session.record_chunk(len)?;
            debug!("{}", progress);
            on_progress(&progress);
        }

        if let Err(e) = writer.flush() {
            return Err(abort(&mut session, e.into()));
        }

        let report = session.complete()?;
        info!("ダウンロード完了: {} バイト / {} チャンク ({:?})", report.bytes, report.chunks, report.elapsed);
        Ok(report)
    }
}

/// セッションを失敗状態にしてエラーを返す
fn abort(session: &mut TransferSession, err: TransferError) -> TransferError {
    error!("転送を中断しました ({} チャンク目): {}", session.chunks(), err);
    if let Err(e) = session.fail() {
        debug!("{}", e);
    }
    err
}

/// バッファが埋まるか EOF に達するまで読み込む
fn read_window<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 送信されたチャンクを記録するテスト用の送信先
    #[derive(Default)]
    struct RecordingSink {
        offsets: Vec<u64>,
        lengths: Vec<usize>,
        received: Vec<u8>,
        reject_at: Option<usize>,
        fault_at: Option<usize>,
        attempts: usize,
    }

    impl ChunkSink for RecordingSink {
        fn send_chunk(&mut self, offset: u64, chunk: &[u8]) -> Result<(), TransferError> {
            let index = self.attempts;
            self.attempts += 1;

            if self.reject_at == Some(index) {
                return Err(TransferError::ChunkRejected { status: 500, body: "busy".to_string() });
            }
            if self.fault_at == Some(index) {
                return Err(TransferError::TransportFault("connection refused".to_string()));
            }

            self.offsets.push(offset);
            self.lengths.push(chunk.len());
            self.received.extend_from_slice(chunk);
            Ok(())
        }
    }

    /// 1回の read で少しずつしか返さないリーダー
    struct TrickleReader {
        data: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            self.data.read(&mut buf[..n])
        }
    }

    /// 途中で失敗するリーダー
    struct BrokenReader {
        remaining: usize,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(0xAB);
            self.remaining -= n;
            Ok(n)
        }
    }

    fn transport(chunk_size: usize) -> ChunkedTransport {
        ChunkedTransport::new(chunk_size).with_chunk_delay(Duration::ZERO)
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_upload_chunk_count_and_order() {
        let data = sample(10_000);
        let mut sink = RecordingSink::default();
        let mut observed = Vec::new();

        let report = transport(4096)
            .upload(Cursor::new(data.clone()), data.len() as u64, &mut sink, |p| observed.push(*p))
            .unwrap();

        // ceil(10000 / 4096) = 3
        assert_eq!(report.chunks, 3);
        assert_eq!(report.bytes, 10_000);
        assert_eq!(sink.offsets, vec![0, 4096, 8192]);
        assert_eq!(sink.lengths, vec![4096, 4096, 1808]);
        assert_eq!(sink.received, data);

        assert_eq!(observed.len(), 3);
        assert_eq!(observed.last().unwrap().percentage_text().unwrap(), "100.00");
        assert_eq!(observed[0].percentage_text().unwrap(), "40.96");
        assert!(observed.windows(2).all(|w| w[0].percentage() < w[1].percentage()));
    }

    #[test]
    fn test_upload_exact_multiple() {
        let data = sample(2048 * 4);
        let mut sink = RecordingSink::default();
        let mut last = None;

        let report = transport(IMAGE_CHUNK_SIZE)
            .upload(Cursor::new(data.clone()), data.len() as u64, &mut sink, |p| last = Some(*p))
            .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(last.unwrap().percentage(), Some(100.0));
        assert_eq!(last.unwrap().to_string(), "Progress: 100.00% (8192/8192 bytes)");
    }

    #[test]
    fn test_upload_refills_short_reads() {
        let data = sample(5000);
        let reader = TrickleReader { data: Cursor::new(data.clone()), step: 333 };
        let mut sink = RecordingSink::default();

        let report = transport(2048).upload(reader, 5000, &mut sink, |_| {}).unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(sink.lengths, vec![2048, 2048, 904]);
        assert_eq!(sink.received, data);
    }

    #[test]
    fn test_upload_empty_source() {
        let mut sink = RecordingSink::default();
        let mut calls = 0;

        let report = transport(4096).upload(Cursor::new(Vec::new()), 0, &mut sink, |_| calls += 1).unwrap();

        assert_eq!(report.chunks, 0);
        assert_eq!(report.bytes, 0);
        assert_eq!(sink.attempts, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_rejected_chunk_halts_session() {
        let data = sample(4096 * 5);
        let mut sink = RecordingSink { reject_at: Some(2), ..Default::default() };
        let mut observed = 0;

        let err = transport(4096)
            .upload(Cursor::new(data), 4096 * 5, &mut sink, |_| observed += 1)
            .unwrap_err();

        match err {
            TransferError::ChunkRejected { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other}"),
        }
        // 拒否されたチャンク以降は送信されない
        assert_eq!(sink.attempts, 3);
        assert_eq!(sink.offsets, vec![0, 4096]);
        assert_eq!(observed, 2);
    }

    #[test]
    fn test_transport_fault_halts_session() {
        let data = sample(3000);
        let mut sink = RecordingSink { fault_at: Some(0), ..Default::default() };

        let err = transport(1024).upload(Cursor::new(data), 3000, &mut sink, |_| {}).unwrap_err();

        assert!(matches!(err, TransferError::TransportFault(_)));
        assert_eq!(sink.attempts, 1);
        assert!(sink.received.is_empty());
    }

    #[test]
    fn test_upload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("animation.bin");
        let data = sample(9000);
        std::fs::write(&path, &data).unwrap();

        let mut sink = RecordingSink::default();
        let report = transport(4096).upload_file(&path, &mut sink, |_| {}).unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(sink.received, data);
        // 元ファイルは変更されない
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_upload_missing_file() {
        let mut sink = RecordingSink::default();
        let err = transport(4096)
            .upload_file(Path::new("/nonexistent/animation.bin"), &mut sink, |_| {})
            .unwrap_err();
        assert!(matches!(err, TransferError::IoError(_)));
        assert_eq!(sink.attempts, 0);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let mut sink = RecordingSink::default();
        let err = transport(0).upload(Cursor::new(vec![1, 2, 3]), 3, &mut sink, |_| {}).unwrap_err();
        assert!(matches!(err, TransferError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_download_into_buffer() {
        let data = sample(7000);
        let mut out = Vec::new();
        let mut observed = Vec::new();

        let report = transport(4096)
            .download(Cursor::new(data.clone()), Some(7000), &mut out, |p| observed.push(*p))
            .unwrap();

        assert_eq!(out, data);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.direction, TransferDirection::Download);
        assert_eq!(observed.last().unwrap().percentage_text().unwrap(), "100.00");
    }

    #[test]
    fn test_download_unknown_total() {
        let data = sample(100);
        let mut out = Vec::new();
        let mut last = None;

        transport(64).download(Cursor::new(data), None, &mut out, |p| last = Some(*p)).unwrap();

        let last = last.unwrap();
        assert_eq!(last.percentage(), None);
        assert_eq!(last.to_string(), "Progress: 100 bytes");
    }

    #[test]
    fn test_download_read_failure_is_transport_fault() {
        let mut out = Vec::new();
        let err = transport(1024)
            .download(BrokenReader { remaining: 1500 }, Some(4096), &mut out, |_| {})
            .unwrap_err();

        assert!(matches!(err, TransferError::TransportFault(_)));
        // 読み取れた完全なチャンクだけが書き込まれている
        assert_eq!(out.len(), 1024);
    }

    #[test]
    fn test_session_state_machine() {
        let mut session = TransferSession::new(TransferDirection::Upload, 4096, Some(100));
        assert_eq!(session.state(), TransferState::Idle);
        assert!(session.record_chunk(10).is_err());

        session.begin().unwrap();
        assert_eq!(session.state(), TransferState::Transferring);
        assert!(session.begin().is_err());

        let progress = session.record_chunk(60).unwrap();
        assert_eq!(progress.transferred, 60);
        assert_eq!(progress.chunk_index, 0);

        session.fail().unwrap();
        assert_eq!(session.state(), TransferState::Failed);
        assert!(session.state().is_terminal());

        // 失敗から再開することはできない
        assert!(matches!(
            session.begin(),
            Err(TransferError::InvalidState { from: TransferState::Failed, to: TransferState::Transferring })
        ));
        assert!(session.complete().is_err());
        assert!(session.record_chunk(10).is_err());
    }

    #[test]
    fn test_session_completed_is_final() {
        let mut session = TransferSession::new(TransferDirection::Download, 16, None);
        session.begin().unwrap();
        session.record_chunk(16).unwrap();
        let report = session.complete().unwrap();

        assert_eq!(report.bytes, 16);
        assert_eq!(report.chunks, 1);
        assert!(session.fail().is_err());
        assert!(session.begin().is_err());
    }
}
