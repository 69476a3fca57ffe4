//! Entry point for the relic asset inspector.
//! Probes each file against the known loaders and prints what it decoded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asset::{
    AssetKind, RasterImage, StaticModel, load_image, load_model, probe, stream::open_stream,
};
use corelib::{ErrorKind, ErrorLog, ErrorSink};

struct Options {
    paths: Vec<PathBuf>,
    png_out: Option<PathBuf>,
    quiet: bool,
}

fn parse_args() -> Options {
    // Accept: <path>... [--png=<out.png>] [--quiet]
    let mut opts = Options {
        paths: Vec::new(),
        png_out: None,
        quiet: false,
    };
    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--png=") {
            opts.png_out = Some(PathBuf::from(val));
        } else if arg == "--quiet" || arg == "-q" {
            opts.quiet = true;
        } else if arg.starts_with("--") {
            log::warn!("Unknown flag '{}', ignoring.", arg);
        } else {
            opts.paths.push(PathBuf::from(arg));
        }
    }
    opts
}

/// PNG destination for `path`. With several inputs the file stem is appended
/// so exports do not overwrite each other.
fn png_target(base: &Path, path: &Path, many: bool) -> PathBuf {
    if !many {
        return base.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let base_stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    base.with_file_name(format!("{}-{}.png", base_stem, stem))
}

fn describe_image(path: &Path, img: &RasterImage) {
    println!(
        "{}: image {}x{} {:?} ({:?}), {} level(s), {} bytes",
        path.display(),
        img.width,
        img.height,
        img.format,
        img.colour_order,
        img.levels,
        img.data.len()
    );
}

fn describe_model(path: &Path, model: &StaticModel) {
    let c = model.bounds.center();
    let e = model.bounds.extents();
    println!(
        "{}: model {} vertices, {} triangles, centre [{:.2} {:.2} {:.2}] size [{:.2} {:.2} {:.2}], upload {} + {} bytes",
        path.display(),
        model.mesh.vertices.len(),
        model.mesh.triangle_count(),
        c.x,
        c.y,
        c.z,
        e.x,
        e.y,
        e.z,
        model.mesh.vertex_bytes().len(),
        model.mesh.index_bytes().len()
    );
}

/// Returns `true` if the file decoded.
fn inspect(path: &Path, opts: &Options, sink: &mut ErrorLog) -> Result<bool> {
    let kind = {
        let mut reader = open_stream(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        probe(&mut reader).with_context(|| format!("Failed to probe {}", path.display()))?
    };

    let before = sink.records().len();
    let decoded = match kind {
        Some(AssetKind::Image) => match load_image(path, sink) {
            Some(img) => {
                if !opts.quiet {
                    describe_image(path, &img);
                }
                if let Some(base) = &opts.png_out {
                    let target = png_target(base, path, opts.paths.len() > 1);
                    img.save_png(&target)?;
                }
                true
            }
            None => false,
        },
        Some(AssetKind::Model) => match load_model(path, sink) {
            Some(model) => {
                if !opts.quiet {
                    describe_model(path, &model);
                }
                true
            }
            None => false,
        },
        None => {
            sink.report(
                ErrorKind::Unsupported,
                &format!("{}: not a recognised asset", path.display()),
            );
            false
        }
    };

    if !decoded {
        for record in &sink.records()[before..] {
            eprintln!("{}: [{}] {}", path.display(), record.kind, record.message);
        }
    }
    Ok(decoded)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args();
    if opts.paths.is_empty() {
        anyhow::bail!("usage: relic <path>... [--png=<out.png>] [--quiet]");
    }
    log::info!("Inspecting {} file(s)", opts.paths.len());

    let mut sink = ErrorLog::new();
    let mut failed = 0usize;
    for path in &opts.paths {
        match inspect(path, &opts, &mut sink) {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                eprintln!("{:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed to decode", failed, opts.paths.len());
    }
    log::info!("All files decoded.");
    Ok(())
}
