use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::Receiver;
use serde::Serialize;

use facetag_core::codec::domain::source_file::SourceFile;
use facetag_core::codec::infrastructure::data_uri_encoder::DataUriEncoder;
use facetag_core::codec::infrastructure::disk_file::DiskFile;
use facetag_core::config::settings::Settings;
use facetag_core::recognition::infrastructure::gemini_oracle::GeminiOracle;
use facetag_core::recognition::recognition_client::RecognitionClient;
use facetag_core::scanning::batch_scanner::{BatchScanner, ScanEvent};
use facetag_core::scanning::scan_logger::StdoutScanLogger;
use facetag_core::scanning::scan_photo_use_case::ScanPhotoUseCase;
use facetag_core::session::dashboard::{
    activity, filter_photos, resolve, ActivityBar, PhotoFilter, ScanStatistics,
};
use facetag_core::session::session_store::SessionStore;
use facetag_core::shared::analyzed_photo::AnalyzedPhoto;
use facetag_core::shared::constants::{API_KEY_ENV, FALLBACK_API_KEY_ENV, IMAGE_EXTENSIONS};
use facetag_core::shared::identity::Identity;

/// Tag photos with the registered people they show.
#[derive(Parser)]
#[command(name = "facetag", version)]
struct Cli {
    /// Photos to scan. Directories are expanded to the files they contain.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Register an identity from a reference photo, as NAME=PATH. Repeatable.
    #[arg(long = "identity", value_name = "NAME=PATH")]
    identities: Vec<String>,

    /// Register every image in DIR, named after its file stem.
    #[arg(long, value_name = "DIR")]
    identities_dir: Option<PathBuf>,

    /// Photos scanned concurrently (1 keeps strict submission order).
    #[arg(long)]
    workers: Option<usize>,

    /// Recognition model name.
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the recognition API.
    #[arg(long)]
    endpoint: Option<String>,

    /// Sampling temperature (0.0-2.0).
    #[arg(long)]
    temperature: Option<f64>,

    /// HTTP timeout per recognition call, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// API key for the recognition service.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Which photos to list: all, unknown, or an identity name.
    #[arg(long, default_value = "all")]
    filter: String,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Store the effective model, endpoint, temperature, workers and timeout
    /// as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = build_settings(&cli)?;
    if cli.save_settings {
        settings.save()?;
        if let Some(path) = Settings::config_path() {
            log::info!("Saved settings to {}", path.display());
        }
    }
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var(FALLBACK_API_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| format!("API key is missing: pass --api-key or set {API_KEY_ENV}"))?;

    let store = Arc::new(SessionStore::new());
    register_identities(&cli, &store)?;
    let filter = parse_filter(&cli.filter, &store.identities())?;

    let oracle = GeminiOracle::new(api_key, &settings)?;
    let client = RecognitionClient::new(Box::new(oracle)).with_temperature(settings.temperature);
    let use_case = ScanPhotoUseCase::new(Box::new(DataUriEncoder::new()), client, store.clone());
    let scanner = BatchScanner::new(
        use_case,
        store.clone(),
        Box::new(StdoutScanLogger::default()),
        settings.workers,
    );

    let events = scanner.subscribe();
    let files = collect_inputs(&cli.files)?;
    let tickets = scanner.submit(files);
    for warning in scan_warnings(store.identity_count(), tickets.len()) {
        log::warn!("{warning}");
    }

    let failures = follow_progress(&events, tickets.len());
    scanner.wait_idle();
    scanner.log_summary();

    let identities = store.identities();
    let photos = store.photos();
    let report = Report::build(&identities, &photos, &filter, failures);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::load();
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(temperature) = cli.temperature {
        settings.temperature = temperature;
    }
    if let Some(timeout) = cli.timeout_secs {
        settings.request_timeout_secs = timeout;
    }
    settings.validate()?;
    Ok(settings)
}

fn register_identities(cli: &Cli, store: &SessionStore) -> Result<(), Box<dyn std::error::Error>> {
    let encoder = DataUriEncoder::new();
    let mut entries = Vec::new();
    for arg in &cli.identities {
        entries.push(parse_identity_arg(arg)?);
    }
    if let Some(dir) = &cli.identities_dir {
        entries.extend(identity_dir_entries(dir)?);
    }

    for (name, path) in entries {
        let identity = store.register_identity(name, &DiskFile::new(&path), &encoder)?;
        log::info!("Identity {} from {}", identity.name, path.display());
    }
    Ok(())
}

fn parse_identity_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("Identity must be NAME=PATH, got '{arg}'")),
    }
}

fn identity_dir_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    for path in list_files(dir)? {
        if !is_image(&path) {
            continue;
        }
        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            entries.push((stem, path));
        }
    }
    Ok(entries)
}

fn parse_filter(filter: &str, identities: &[Identity]) -> Result<PhotoFilter, String> {
    match filter.to_lowercase().as_str() {
        "all" => Ok(PhotoFilter::All),
        "unknown" => Ok(PhotoFilter::Unknown),
        _ => identities
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(filter))
            .map(|i| PhotoFilter::Identity(i.id.clone()))
            .ok_or_else(|| format!("Filter must be all, unknown or a registered name, got '{filter}'")),
    }
}

/// Expands directories (non-recursive) and keeps the given order otherwise.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<Box<dyn SourceFile>>, Box<dyn std::error::Error>> {
    let mut files: Vec<Box<dyn SourceFile>> = Vec::new();
    for path in paths {
        if path.is_dir() {
            for file in list_files(path)? {
                files.push(Box::new(DiskFile::new(file)));
            }
        } else {
            files.push(Box::new(DiskFile::new(path)));
        }
    }
    Ok(files)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .map_err(|e| format!("Cannot read directory {}: {e}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn scan_warnings(identity_count: usize, queued: usize) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if queued == 0 {
        warnings.push("No image files to scan");
    } else if identity_count == 0 {
        warnings.push("No identities registered: every photo will be reported as Unknown");
    }
    warnings
}

/// Prints progress until every ticket reached a terminal event. Returns the
/// per-file failures.
fn follow_progress(
    events: &Receiver<ScanEvent>,
    expected: usize,
) -> Vec<Failure> {
    let mut failures = Vec::new();
    let mut done = 0;
    while done < expected {
        let Ok(event) = events.recv() else {
            break;
        };
        match &event {
            ScanEvent::Failed { name, error, .. } => failures.push(Failure {
                source_name: name.clone(),
                error: error.clone(),
            }),
            ScanEvent::Cancelled { name, .. } => failures.push(Failure {
                source_name: name.clone(),
                error: "cancelled".to_string(),
            }),
            _ => {}
        }
        if event.is_terminal() {
            done += 1;
            eprint!("\rScanning photo {done}/{expected}");
        }
    }
    if expected > 0 {
        eprintln!();
    }
    failures
}

// --- Report ---

#[derive(Serialize)]
struct Report {
    statistics: ScanStatistics,
    activity: Vec<ActivityBar>,
    photos: Vec<PhotoRow>,
    failures: Vec<Failure>,
}

#[derive(Serialize)]
struct PhotoRow {
    source_name: String,
    identity: Option<String>,
    confidence: f64,
    timestamp: String,
}

#[derive(Serialize)]
struct Failure {
    source_name: String,
    error: String,
}

impl Report {
    fn build(
        identities: &[Identity],
        photos: &[AnalyzedPhoto],
        filter: &PhotoFilter,
        failures: Vec<Failure>,
    ) -> Self {
        let rows = filter_photos(filter, identities, photos)
            .iter()
            .map(|p| PhotoRow {
                source_name: p.source_name.clone(),
                identity: resolve(identities, p).map(|i| i.name.clone()),
                confidence: p.confidence,
                timestamp: p.timestamp.to_rfc3339(),
            })
            .collect();
        Self {
            statistics: ScanStatistics::compute(identities, photos),
            activity: activity(identities, photos),
            photos: rows,
            failures,
        }
    }
}

fn print_report(report: &Report) {
    let stats = &report.statistics;
    println!(
        "Scanned {} photo(s): {} recognized, {} unknown",
        stats.total, stats.recognized, stats.unknown
    );

    if !report.activity.is_empty() {
        println!();
        for bar in &report.activity {
            let width = (bar.width * 20.0).round() as usize;
            println!("  {:<16} {:<20} {}", bar.label, "#".repeat(width), bar.count);
        }
    }

    if !report.photos.is_empty() {
        println!();
        for row in &report.photos {
            let identity = row.identity.as_deref().unwrap_or("Unknown");
            println!(
                "  {:<32} {:<16} {:>5.1}%",
                row.source_name,
                identity,
                row.confidence * 100.0
            );
        }
    }

    if !report.failures.is_empty() {
        println!();
        for failure in &report.failures {
            println!("  failed: {}: {}", failure.source_name, failure.error);
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for path in &cli.files {
        if !path.exists() {
            return Err(format!("Input not found: {}", path.display()).into());
        }
    }
    for arg in &cli.identities {
        let (_, path) = parse_identity_arg(arg)?;
        if !path.is_file() {
            return Err(format!("Reference photo not found: {}", path.display()).into());
        }
    }
    if let Some(dir) = &cli.identities_dir {
        if !dir.is_dir() {
            return Err(format!("Identities directory not found: {}", dir.display()).into());
        }
    }
    if cli.workers == Some(0) {
        return Err("Workers must be at least 1".into());
    }
    if cli.filter.trim().is_empty() {
        return Err("Filter must not be empty".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetag_core::codec::domain::encoded_image::EncodedImage;
    use tempfile::TempDir;

    fn identity(name: &str) -> Identity {
        Identity::new(name, EncodedImage::from_parts("image/png", "REF"))
    }

    #[test]
    fn test_parse_identity_arg() {
        let (name, path) = parse_identity_arg("Ada = refs/ada.png").unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(path, PathBuf::from("refs/ada.png"));
    }

    #[test]
    fn test_parse_identity_arg_rejects_missing_parts() {
        assert!(parse_identity_arg("ada.png").is_err());
        assert!(parse_identity_arg("=ada.png").is_err());
        assert!(parse_identity_arg("Ada=").is_err());
    }

    #[test]
    fn test_parse_filter() {
        let identities = vec![identity("Ada")];

        assert_eq!(parse_filter("all", &identities).unwrap(), PhotoFilter::All);
        assert_eq!(parse_filter("Unknown", &identities).unwrap(), PhotoFilter::Unknown);
        assert_eq!(
            parse_filter("ada", &identities).unwrap(),
            PhotoFilter::Identity(identities[0].id.clone())
        );
        assert!(parse_filter("Grace", &identities).is_err());
    }

    #[test]
    fn test_collect_inputs_expands_directories_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.jpg"), b"b").unwrap();
        fs::write(tmp.path().join("a.png"), b"a").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("c.jpg"), b"c").unwrap();
        let single = tmp.path().join("nested").join("c.jpg");

        let files = collect_inputs(&[single, tmp.path().to_path_buf()]).unwrap();

        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["c.jpg", "a.png", "b.jpg"]);
    }

    #[test]
    fn test_scan_warnings() {
        assert_eq!(scan_warnings(0, 0), vec!["No image files to scan"]);
        assert_eq!(
            scan_warnings(0, 3),
            vec!["No identities registered: every photo will be reported as Unknown"]
        );
        assert!(scan_warnings(2, 3).is_empty());
    }

    #[test]
    fn test_save_settings_flag() {
        let cli = Cli::try_parse_from(["facetag", "--save-settings", "--workers", "2", "a.jpg"]).unwrap();
        assert!(cli.save_settings);
        assert_eq!(cli.workers, Some(2));

        let cli = Cli::try_parse_from(["facetag", "a.jpg"]).unwrap();
        assert!(!cli.save_settings);
    }

    #[test]
    fn test_identity_dir_uses_file_stems() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Ada.png"), b"a").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"n").unwrap();

        let entries = identity_dir_entries(tmp.path()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "Ada");
    }
}
