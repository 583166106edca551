mod tui;

use clap::{Args, CommandFactory, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::{Path, PathBuf};
use std::{io, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tui::app::{classify_guarded, classify_snapshot, App};
use tui::events::handle_key;
use tui::session::Session;
use tui::ui::render;
use aal_lens_core::api::{ApiClient, BBox, BufferQuery};
use aal_lens_core::batch::classify_metrics;
use aal_lens_core::choropleth::ChoroplethLayer;
use aal_lens_core::export::{export_csv, export_geojson, export_json, print_summary, ClassificationReport};
use aal_lens_core::geojson::FeatureCollection;
use aal_lens_core::metric::{Hazard, MetricKey};
use aal_lens_core::palette::Palette;
use aal_lens_core::{load_observations, ClassifyOptions};
use aal_lens_common::Config;

fn parse_bbox(s: &str) -> Result<BBox, String> { // minlng,minlat,maxlng,maxlat
    let parts: Vec<f64> = s.split(',').map(|p| p.trim().parse::<f64>()).collect::<Result<_, _>>().map_err(|e| format!("bad bbox {s}: {e}"))?;
    match parts[..] {
        [min_lng, min_lat, max_lng, max_lat] if min_lng < max_lng && min_lat < max_lat => Ok(BBox { min_lng, min_lat, max_lng, max_lat }),
        _ => Err(format!("bbox must be minlng,minlat,maxlng,maxlat with min < max, got {s}")),
    }
}

fn parse_classes(s: &str) -> Result<usize, String> { // reject k = 0 at CLI parse time
    let k: usize = s.parse().map_err(|_| format!("not a count: {s}"))?;
    if k >= 1 { Ok(k) } else { Err("class count must be at least 1".into()) }
}

#[derive(Parser)]
#[command(name = "aal-lens", version, about = "Natural-breaks classification for disaster-risk AAL maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `[classify]` config section.
#[derive(Args, Clone, Default)]
struct ClassArgs {
    #[arg(short = 'k', long = "classes", value_parser = parse_classes)]
    classes: Option<usize>,
    /// jenks, quantile or equal-interval
    #[arg(long)]
    method: Option<String>,
    /// aal, choropleth or hazard
    #[arg(long)]
    palette: Option<String>,
    /// open or range
    #[arg(long)]
    style: Option<String>,
    /// id or en
    #[arg(long)]
    locale: Option<String>,
}

impl ClassArgs {
    fn is_empty(&self) -> bool {
        self.classes.is_none() && self.method.is_none() && self.palette.is_none() && self.style.is_none() && self.locale.is_none()
    }

    fn options(&self, config: &Config) -> anyhow::Result<ClassifyOptions> {
        let mut opts = ClassifyOptions::from_config(&config.classify)?;
        if let Some(k) = self.classes { opts.classes = Some(k); }
        if let Some(m) = &self.method { opts.method = m.parse()?; }
        if let Some(p) = &self.palette { opts.palette = Palette::preset(p)?; }
        if let Some(s) = &self.style { opts.legend.style = s.parse()?; }
        if let Some(l) = &self.locale { opts.legend.locale = l.parse()?; }
        Ok(opts)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a column of observations and print the classes
    Classify {
        input: PathBuf,
        #[arg(long)] column: Option<String>,
        #[command(flatten)] class: ClassArgs,
        #[arg(long)] json: bool,
    },
    /// Print the legend for one AAL metric of a GeoJSON file
    Legend {
        input: PathBuf,
        #[arg(long)] metric: String,
        #[command(flatten)] class: ClassArgs,
    },
    /// Classify every AAL metric of a GeoJSON file
    Batch {
        input: PathBuf,
        #[arg(long, value_delimiter = ',')] metrics: Option<Vec<String>>,
        #[command(flatten)] class: ClassArgs,
        #[arg(long)] json: bool,
    },
    /// Download from the AAL API
    Fetch {
        #[command(subcommand)] target: FetchTarget,
        #[arg(long, global = true)] output: Option<PathBuf>,
        #[arg(long, global = true)] no_cache: bool,
    },
    /// Write a classification as json, csv or annotated geojson
    Export {
        input: PathBuf,
        #[arg(long)] column: Option<String>,
        #[arg(long)] format: Option<String>,
        #[arg(long)] output: Option<PathBuf>,
        #[command(flatten)] class: ClassArgs,
    },
    /// Interactive classifier
    View {
        input: PathBuf,
        #[arg(long)] column: Option<String>,
        #[command(flatten)] class: ClassArgs,
    },
    /// Shell completion script
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum FetchTarget {
    /// Province polygons with AAL metrics (GeoJSON)
    Provinces,
    ProvinceList,
    ProvinceData { provinsi: String },
    Cities { provinsi: String },
    /// Building points for a city (GeoJSON)
    Buildings { provinsi: String, kota: String },
    /// Hazard intensity buffers, e.g. `hazard gempa mmi_500`
    Hazard {
        hazard: String,
        field: String,
        #[arg(long, default_value_t = 5.0)] zoom: f64,
        #[arg(long, value_parser = parse_bbox)] bbox: Option<BBox>,
    },
    Curves,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("AAL_LENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // the alternate screen owns the terminal in view mode
    if !matches!(cli.command, Commands::View { .. }) { init_tracing(); }
    let config = Config::load().unwrap_or_default();
    match cli.command {
        Commands::Classify { input, column, class, json } => run_classify(&input, column.as_deref(), &class, json, &config)?,
        Commands::Legend { input, metric, class } => run_legend(&input, &metric, &class, &config)?,
        Commands::Batch { input, metrics, class, json } => run_batch(&input, metrics, &class, json, &config)?,
        Commands::Fetch { target, output, no_cache } => run_fetch(target, output, no_cache, &config).await?,
        Commands::Export { input, column, format, output, class } => run_export(&input, column, format, output, &class, &config)?,
        Commands::View { input, column, class } => run_view(input, column, &class, config)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "aal-lens", &mut io::stdout());
        }
    }
    Ok(())
}

fn run_classify(input: &Path, column: Option<&str>, class: &ClassArgs, json: bool, config: &Config) -> anyhow::Result<()> {
    let opts = class.options(config)?;
    let values = load_observations(input, column)?;
    let report = ClassificationReport::build(&input.to_string_lossy(), column, &values, &opts)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_legend(input: &Path, metric: &str, class: &ClassArgs, config: &Config) -> anyhow::Result<()> {
    let opts = class.options(config)?;
    let fc = FeatureCollection::from_path(input)?;
    let key: MetricKey = metric.parse()?;
    let layer = ChoroplethLayer::build(&fc, &key.to_string(), &opts)?;
    for line in layer.legend.to_lines() {
        println!("{line}");
    }
    Ok(())
}

fn run_batch(input: &Path, metrics: Option<Vec<String>>, class: &ClassArgs, json: bool, config: &Config) -> anyhow::Result<()> {
    let opts = class.options(config)?;
    let fc = FeatureCollection::from_path(input)?;
    let keys = metrics
        .unwrap_or_default()
        .iter()
        .map(|m| m.parse::<MetricKey>())
        .collect::<Result<Vec<_>, _>>()?;
    let results = classify_metrics(&fc, &keys, &opts)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        anyhow::bail!("no aal_* metrics found in {}", input.display());
    }
    println!("{:<26} {:>7} {:>5} {:>7} {:>6}  breaks", "metric", "classes", "obs", "no data", "gvf");
    for r in &results {
        println!(
            "{:<26} {:>7} {:>5} {:>7} {:>6.3}  {:?}",
            r.metric.to_string(),
            r.breaks.class_count(),
            r.observations,
            r.no_data_count,
            r.gvf,
            r.breaks.as_slice(),
        );
    }
    Ok(())
}

async fn run_fetch(target: FetchTarget, output: Option<PathBuf>, no_cache: bool, config: &Config) -> anyhow::Result<()> {
    let mut api_cfg = config.api.clone();
    if no_cache { api_cfg.cache_ttl_secs = None; }
    let client = ApiClient::from_config(&api_cfg)?;
    let body = match target {
        FetchTarget::Provinces => serde_json::to_value(client.aal_provinsi().await?)?,
        FetchTarget::ProvinceList => client.aal_provinsi_list().await?,
        FetchTarget::ProvinceData { provinsi } => client.aal_provinsi_data(&provinsi).await?,
        FetchTarget::Cities { provinsi } => client.cities(&provinsi).await?,
        FetchTarget::Buildings { provinsi, kota } => serde_json::to_value(client.buildings(&provinsi, &kota).await?)?,
        FetchTarget::Hazard { hazard, field, zoom, bbox } => {
            let hazard: Hazard = hazard.parse()?;
            let query = BufferQuery::at_zoom(bbox.unwrap_or(BBox::INDONESIA), zoom, field);
            serde_json::to_value(client.hazard_buffer(hazard, &query).await?)?
        }
        FetchTarget::Curves => client.disaster_curves().await?,
    };
    let text = serde_json::to_string_pretty(&body)?;
    info!(base = %client.base_url(), bytes = text.len(), "fetch complete");
    match output {
        Some(path) => {
            std::fs::write(&path, text)?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn run_export(input: &Path, column: Option<String>, format: Option<String>, output: Option<PathBuf>, class: &ClassArgs, config: &Config) -> anyhow::Result<()> {
    let opts = class.options(config)?;
    let format = format.unwrap_or_else(|| config.export.format.clone());
    let ext = match format.as_str() {
        "json" | "csv" | "geojson" => format.as_str(),
        other => anyhow::bail!("unknown format: {other} (use json, csv or geojson)"),
    };
    let out_path = output.unwrap_or_else(|| {
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "aal".into());
        Path::new(&config.export.output_dir).join(format!("{stem}_classes.{ext}"))
    });
    let source = input.to_string_lossy();
    if format == "geojson" {
        let fc = FeatureCollection::from_path(input)?;
        let property = match column {
            Some(c) => c,
            None => fc
                .metric_keys()
                .first()
                .map(|k| k.to_string())
                .ok_or_else(|| anyhow::anyhow!("no aal_* metric in {}, pass --column", input.display()))?,
        };
        let layer = ChoroplethLayer::build(&fc, &property, &opts)?;
        export_geojson(&out_path, &fc, &layer)?;
        print_summary(&ClassificationReport::from_layer(&source, &fc, &layer));
    } else {
        let values = load_observations(input, column.as_deref())?;
        let report = ClassificationReport::build(&source, column.as_deref(), &values, &opts)?;
        if format == "csv" { export_csv(&out_path, &report)?; } else { export_json(&out_path, &report)?; }
    }
    info!(format = ext, path = %out_path.display(), "export written");
    eprintln!("Written to {}", out_path.display());
    Ok(())
}

fn run_view(input: PathBuf, column: Option<String>, class: &ClassArgs, config: Config) -> anyhow::Result<()> {
    let opts = class.options(&config)?;
    let values = load_observations(&input, column.as_deref())?;
    let input_path = input.to_string_lossy().into_owned();
    let mut app = App::new(input_path, column, values, opts, config);
    if class.is_empty() {
        if let Some(s) = Session::load().filter(|s| s.input_path == app.input_path) { app.restore_from_session(&s); }
    }
    app.status_msg = "Ready".into();

    enable_raw_mode()?;
    let _guard = TerminalGuard;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick = Duration::from_millis(66); // 15Hz
    loop {
        terminal.draw(|f| render(f, &app))?;
        // spawn a classification run when settings changed
        if app.pending_classify {
            app.pending_classify = false;
            app.in_flight += 1;
            let generation = app.generation;
            let values = app.values.clone();
            let opts = app.opts.clone();
            let title = app.title();
            let tx = app.result_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = classify_guarded(|| classify_snapshot(&values, &opts, &title));
                let _ = tx.send((generation, result));
            });
        }
        app.drain_results();
        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? { handle_key(&mut app, key); }
        }
        if app.should_quit { break; }
    }
    let _ = app.to_session().save();
    Ok(())
}

/// Leave raw mode and the alternate screen, best effort.
fn restore_terminal<W: io::Write>(out: &mut W) {
    let _ = disable_raw_mode();
    let _ = execute!(out, LeaveAlternateScreen, DisableMouseCapture, cursor::Show);
}

/// Restores the terminal on every exit from the view loop, `?` included.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal(&mut io::stdout());
    }
}
