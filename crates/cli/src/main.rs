//! CLI tool for turning the first sheet of an XLSX workbook into a slide deck.

use anyhow::{Context, Result};
use clap::Parser;
use sheetdeck_core::{
    CancelFlag, Error, GenerationOptions, GenerationRequest, Generator, RasterImage,
    ThemeRegistry,
};
use sheetdeck_pptx::{BackgroundStrategy, PptxWriter};
use sheetdeck_raster::TinySkiaRasterizer;
use sheetdeck_xlsx::XlsxReader;
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the whole background download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Generate one PowerPoint slide per spreadsheet row.
#[derive(Parser, Debug)]
#[command(name = "sheetdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input workbook (.xlsx); the first sheet is used
    #[arg(required_unless_present = "list_themes")]
    input: Option<PathBuf>,

    /// Output file or directory (default: Excel_to_PPT.pptx in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Theme key (see --list-themes); unknown keys use the default theme
    #[arg(short, long)]
    theme: Option<String>,

    /// Background image file replacing the theme gradient
    #[arg(long, conflicts_with = "background_url")]
    background: Option<PathBuf>,

    /// Background image URL replacing the theme gradient
    #[arg(long)]
    background_url: Option<String>,

    /// Place the background as a full-bleed picture instead of a slide fill
    #[arg(long)]
    picture_background: bool,

    /// Gradient raster width in pixels
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Gradient raster height in pixels
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if args.list_themes {
        print!("{}", theme_listing());
        return Ok(());
    }

    let input_path = args
        .input
        .clone()
        .context("An input workbook is required")?;

    let cancel = CancelFlag::new();
    until_interrupted(run(&args, input_path, &cancel), tokio::signal::ctrl_c(), &cancel).await
}

/// Run `work` until it finishes or `interrupt` fires.
///
/// On interrupt the pending step is dropped and the cancel flag is set so a
/// generation already running on the blocking pool stops at the next row.
async fn until_interrupted<T>(
    work: impl Future<Output = Result<T>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
    cancel: &CancelFlag,
) -> Result<T> {
    tokio::select! {
        result = work => result,
        Ok(()) = interrupt => {
            log::warn!("Interrupted, cancelling generation");
            cancel.cancel();
            anyhow::bail!("Interrupted");
        }
    }
}

async fn run(args: &Args, input_path: PathBuf, cancel: &CancelFlag) -> Result<()> {
    if args.verbose {
        eprintln!("Processing: {}", input_path.display());
    }

    let workbook = tokio::fs::read(&input_path)
        .await
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let rows = XlsxReader::new()
        .read_rows(Cursor::new(workbook))
        .with_context(|| format!("Failed to parse {}", input_path.display()))?;

    if args.verbose {
        eprintln!("  Found {} rows", rows.len());
    }

    let mut request = GenerationRequest::new(rows);
    if let Some(theme) = &args.theme {
        request = request.with_theme(theme.clone());
    }
    if let Some(name) = input_path.file_name().and_then(|n| n.to_str()) {
        request = request.with_source_file_name(name);
    }
    if let Some(image) = load_background(args).await? {
        request = request.with_background(image);
    }

    let generator = build_generator(args);
    let worker_cancel = cancel.clone();
    let document = tokio::task::spawn_blocking(move || generator.generate(request, &worker_cancel))
        .await
        .context("Generation task failed")?
        .context("Failed to generate presentation")?;

    let output_path = resolve_output_path(args.output.as_deref(), &document.file_name).await;
    tokio::fs::write(&output_path, &document.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if args.verbose {
        eprintln!(
            "Written {} slides to: {}",
            document.slide_count,
            output_path.display()
        );
    }

    Ok(())
}

/// One `key  Name` line per registered theme.
fn theme_listing() -> String {
    ThemeRegistry::themes()
        .iter()
        .map(|theme| format!("{}  {}\n", theme.key, theme.name))
        .collect()
}

fn build_generator(args: &Args) -> Generator<TinySkiaRasterizer, PptxWriter> {
    let strategy = if args.picture_background {
        BackgroundStrategy::PictureShape
    } else {
        BackgroundStrategy::Native
    };

    let mut options = GenerationOptions::default();
    if let (Some(width), Some(height)) = (args.width, args.height) {
        options.raster_width = width;
        options.raster_height = height;
    }

    Generator::new(
        TinySkiaRasterizer::new(),
        PptxWriter::new().with_background_strategy(strategy),
    )
    .with_options(options)
}

/// Read or fetch the override background, if one was requested.
async fn load_background(args: &Args) -> Result<Option<RasterImage>> {
    let bytes = if let Some(path) = &args.background {
        log::debug!("Reading background image {}", path.display());
        tokio::fs::read(path).await.map_err(|e| {
            Error::ImageFetchError(format!("Failed to read {}: {}", path.display(), e))
        })?
    } else if let Some(url) = &args.background_url {
        fetch_background(url).await?
    } else {
        return Ok(None);
    };

    Ok(Some(RasterImage::from_bytes(bytes)?))
}

async fn fetch_background(url: &str) -> Result<Vec<u8>, Error> {
    log::debug!("Fetching background image {}", url);
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| Error::ImageFetchError(format!("Failed to create HTTP client: {}", e)))?;
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::ImageFetchError(format!("Failed to fetch {}: {}", url, e)))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::ImageFetchError(format!("Failed to download {}: {}", url, e)))?;
    Ok(bytes.to_vec())
}

/// Determine where the generated document is written.
async fn resolve_output_path(output: Option<&Path>, file_name: &str) -> PathBuf {
    match output {
        Some(path) => {
            let is_dir = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                path.join(file_name)
            } else {
                path.to_path_buf()
            }
        }
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_theme_listing() {
        let listing = theme_listing();
        assert!(listing.starts_with("neutral  Neutral\n"));
        assert_eq!(listing.lines().count(), ThemeRegistry::themes().len());
    }

    #[test]
    fn test_list_themes_without_input() {
        let args = Args::try_parse_from(["sheetdeck", "--list-themes"]).unwrap();
        assert!(args.list_themes);
        assert!(args.input.is_none());

        assert!(Args::try_parse_from(["sheetdeck"]).is_err());
    }

    #[test]
    fn test_background_sources_conflict() {
        let result = Args::try_parse_from([
            "sheetdeck",
            "data.xlsx",
            "--background",
            "bg.png",
            "--background-url",
            "https://example.com/bg.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_raster_size_requires_both_dimensions() {
        assert!(Args::try_parse_from(["sheetdeck", "data.xlsx", "--width", "800"]).is_err());

        let args = Args::try_parse_from([
            "sheetdeck", "data.xlsx", "--width", "800", "--height", "450",
        ])
        .unwrap();
        let generator = build_generator(&args);
        assert_eq!(generator.options().raster_width, 800);
        assert_eq!(generator.options().raster_height, 450);
    }

    #[tokio::test]
    async fn test_interrupt_aborts_pending_step() {
        let cancel = CancelFlag::new();
        let result: Result<()> = until_interrupted(
            std::future::pending(),
            async { Ok(()) },
            &cancel,
        )
        .await;

        assert!(result.is_err());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_work_finishes_without_interrupt() {
        let cancel = CancelFlag::new();
        let value = until_interrupted(async { Ok(7) }, std::future::pending(), &cancel)
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_working() {
        let cancel = CancelFlag::new();
        let value = until_interrupted(
            async {
                tokio::task::yield_now().await;
                Ok("done")
            },
            async { Err(std::io::Error::other("no signal handler")) },
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_resolve_output_path() {
        assert_eq!(
            resolve_output_path(None, "Excel_to_PPT.pptx").await,
            PathBuf::from("Excel_to_PPT.pptx")
        );

        let dir = std::env::temp_dir();
        assert_eq!(
            resolve_output_path(Some(dir.as_path()), "Excel_to_PPT.pptx").await,
            dir.join("Excel_to_PPT.pptx")
        );

        let file = Path::new("out/deck.pptx");
        assert_eq!(
            resolve_output_path(Some(file), "Excel_to_PPT.pptx").await,
            file.to_path_buf()
        );
    }

    #[tokio::test]
    async fn test_unknown_background_format_is_fetch_error() {
        let path = std::env::temp_dir().join("sheetdeck-cli-not-an-image.txt");
        tokio::fs::write(&path, b"plain text").await.unwrap();

        let args = Args::try_parse_from([
            "sheetdeck",
            "data.xlsx",
            "--background",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let err = load_background(&args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ImageFetchError(_))
        ));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_missing_background_file_is_fetch_error() {
        let args = Args::try_parse_from([
            "sheetdeck",
            "data.xlsx",
            "--background",
            "/nonexistent/sheetdeck/bg.png",
        ])
        .unwrap();
        let err = load_background(&args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ImageFetchError(_))
        ));
    }
}
