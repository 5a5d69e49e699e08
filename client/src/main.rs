//! クライアントエントリポイント
//!
//! コマンドラインから変換・転送・プレビュー・カタログ操作を実行します。

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use media_bin_rs_client::app::UploadOutcome;
use media_bin_rs_client::media::FfmpegExtractor;
use media_bin_rs_client::{App, ClientSettings};
use media_bin_rs_common::protocol::DEFAULT_PREVIEW_FPS;
use media_bin_rs_common::utils::number::format_bytes;
use media_bin_rs_common::{CommonError, EncodingMode, Sidecar, TransferProgress};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "media-bin", version, about = "画像・GIF・動画を RGB565 コンテナに変換してデバイスへ転送します")]
struct Cli {
    /// 設定ファイル
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// デバイスアドレス（設定ファイルより優先）
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 静止画を変換して送信
    Image { path: PathBuf },
    /// GIF アニメーションを変換して送信
    Gif { path: PathBuf },
    /// 動画からフレームを抽出して送信
    Video {
        path: PathBuf,
        /// ffmpeg の実行ファイル
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,
    },
    /// 抽出済みフレーム画像のディレクトリを変換して送信
    Frames { dir: PathBuf },
    /// 既存の bin ファイルをそのまま送信
    Bin { path: PathBuf },
    /// 変換のみ行う
    Convert {
        input: PathBuf,
        /// 出力先
        #[arg(short, long)]
        output: PathBuf,
        /// エンコードモード
        #[arg(long, value_enum, default_value_t = ModeArg::Animation)]
        mode: ModeArg,
    },
    /// コンテナをフレーム画像として書き出す
    Preview {
        bin: PathBuf,
        /// エンコード時のモード
        #[arg(long, value_enum)]
        mode: ModeArg,
        /// 出力ディレクトリ
        #[arg(long, default_value = "preview")]
        out_dir: PathBuf,
        /// 再生FPS
        #[arg(long, default_value_t = DEFAULT_PREVIEW_FPS)]
        fps: u32,
    },
    /// カタログサーバー操作
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// 一覧を表示
    List {
        /// 検索キーワード
        #[arg(long)]
        search: Option<String>,
    },
    /// ダウンロード
    Download {
        file: String,
        /// 保存先（省略時はファイル名）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// アップロード
    Upload {
        bin: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_FPS)]
        fps: u32,
    },
    /// カタログのコンテナをダウンロードせずにフレーム画像として書き出す
    Preview {
        file: String,
        /// エンコード時のモード
        #[arg(long, value_enum)]
        mode: ModeArg,
        /// 出力ディレクトリ
        #[arg(long, default_value = "preview")]
        out_dir: PathBuf,
        /// 再生FPS（省略時はカタログの値）
        #[arg(long)]
        fps: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Animation,
    Static,
}

impl From<ModeArg> for EncodingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Animation => EncodingMode::Animation,
            ModeArg::Static => EncodingMode::Static,
        }
    }
}

fn main() {
    // ロガーを初期化
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        let code = e
            .downcast_ref::<CommonError>()
            .map(|err| err.code().exit_code())
            .unwrap_or(1);
        process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(ClientSettings::default_path);
    let settings = ClientSettings::load_or_default(&config_path)
        .map_err(CommonError::from)
        .with_context(|| format!("設定ファイル {:?} を読み込めません", config_path))?;

    let app = App::new(settings, cli.device.as_deref());
    let mut progress = |p: &TransferProgress| log::debug!("チャンク {} 送信済み", p.chunk_index + 1);

    match cli.command {
        Commands::Image { path } => report(app.upload_image(&path, &mut progress)?),
        Commands::Gif { path } => report(app.upload_animation(&path, &mut progress)?),
        Commands::Video { path, ffmpeg } => {
            let extractor = FfmpegExtractor::new(ffmpeg);
            report(app.upload_video(&path, &extractor, &mut progress)?)
        }
        Commands::Frames { dir } => report(app.upload_frames_dir(&dir, &mut progress)?),
        Commands::Bin { path } => report(app.upload_bin(&path, &mut progress)?),
        Commands::Convert { input, output, mode } => {
            let summary = app.convert(&input, &output, mode.into())?;
            println!(
                "{:?}: {} フレーム ({}){}",
                output,
                summary.frames_written,
                format_bytes(summary.bytes_written),
                if summary.reached_cap { " 最大フレーム数で打ち切り" } else { "" }
            );
        }
        Commands::Preview { bin, mode, out_dir, fps } => {
            let outcome = app.preview(&bin, mode.into(), &out_dir, fps)?;
            println!(
                "{} フレームを {:?} に書き出しました (表示間隔 {} ms)",
                outcome.frames.len(),
                out_dir,
                outcome.interval.as_millis()
            );
            if outcome.trailing_bytes > 0 {
                println!("末尾の {} バイトは無視されました", outcome.trailing_bytes);
            }
        }
        Commands::Catalog(command) => run_catalog(&app, command, &mut progress)?,
    }

    Ok(())
}

fn run_catalog<F>(app: &App, command: CatalogCommand, progress: &mut F) -> anyhow::Result<()>
where
    F: FnMut(&TransferProgress),
{
    match command {
        CatalogCommand::List { search } => {
            let entries = app.catalog_list(search.as_deref())?;
            for entry in &entries {
                println!("{}", entry);
            }
            println!("{} 件", entries.len());
        }
        CatalogCommand::Download { file, output } => {
            let dest = output.unwrap_or_else(|| PathBuf::from(&file));
            let report = app.catalog_download(&file, &dest, progress)?;
            println!("{:?} に保存しました ({})", dest, format_bytes(report.bytes));
        }
        CatalogCommand::Upload { bin, name, author, description, fps } => {
            let sidecar = Sidecar { name, author, description, fps };
            app.catalog_upload(&bin, &sidecar)?;
            println!("{:?} をアップロードしました", bin);
        }
        CatalogCommand::Preview { file, mode, out_dir, fps } => {
            let outcome = app.catalog_preview(&file, mode.into(), &out_dir, fps)?;
            println!(
                "{} の {} フレームを {:?} に書き出しました (表示間隔 {} ms)",
                file,
                outcome.frames.len(),
                out_dir,
                outcome.interval.as_millis()
            );
        }
    }

    Ok(())
}

fn report(outcome: UploadOutcome) {
    if let Some(summary) = outcome.encode {
        println!(
            "{:?}: {} フレームを変換しました{}",
            outcome.container,
            summary.frames_written,
            if summary.reached_cap { " (最大フレーム数で打ち切り)" } else { "" }
        );
    }
    println!(
        "送信完了: {} / {} チャンク ({:.2} 秒)",
        format_bytes(outcome.transfer.bytes),
        outcome.transfer.chunks,
        outcome.transfer.elapsed.as_secs_f64()
    );
}
