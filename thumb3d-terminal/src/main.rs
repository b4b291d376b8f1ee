/// thumb3d terminal renderer
///
/// Renders an OBJ or STL model (local path, file:// or http(s):// URL) into
/// a PNG thumbnail. Progress goes to stderr; the PNG is written to
/// `--output`, or its data URL is printed to stdout.
///
/// Set `RUST_LOG=debug` for pipeline logging.
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thumb3d_core::{FileType, RenderConfig};
use thumb3d_terminal::{preview_columns, print_preview, RenderJob, TerminalApp};

#[derive(Parser, Debug)]
#[command(name = "thumb3d-terminal", version, about = "Render a 3D model to a PNG thumbnail")]
struct Args {
    /// Model URL or path
    url: String,

    /// Model format (obj or stl); inferred from the extension when omitted
    #[arg(long = "type", value_name = "TYPE")]
    file_type: Option<String>,

    /// Base color as #RRGGBB
    #[arg(long, default_value = "#808080")]
    color: String,

    #[arg(long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Write the PNG here instead of printing the data URL
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Supersampling factor per axis
    #[arg(long, default_value_t = 2)]
    samples: u32,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print an ASCII preview of the result
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let file_type = match &args.file_type {
        Some(tag) => tag.clone(),
        None => FileType::from_path(&args.url)
            .map(|t| t.as_str().to_string())
            .ok_or_else(|| anyhow!("cannot infer the model type of {}; pass --type obj|stl", args.url))?,
    };

    let config = RenderConfig::default()
        .with_supersample(args.samples)
        .with_http_timeout(Duration::from_secs(args.timeout));
    let mut app = TerminalApp::new(config, args.width, args.height);
    let data_url = app.run(&RenderJob {
        url: args.url.clone(),
        file_type,
        color: args.color.clone(),
    })?;

    let mut stdout = io::stdout().lock();
    match &args.output {
        Some(path) => {
            let png = thumb3d_core::encode::decode_data_url(&data_url)?;
            std::fs::write(path, &png).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote {} ({} bytes)", path.display(), png.len());
        }
        None => writeln!(stdout, "{data_url}")?,
    }

    if args.preview {
        print_preview(&data_url, preview_columns(), &mut stdout)?;
    }
    Ok(())
}
