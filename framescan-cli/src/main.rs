use clap::Parser;
use framescan::search::ZnccConfig;
use framescan::{
    CancelToken, Detection, DetectionRequest, EngineConfig, ImageFileSource, TemplateEngine,
    ZnccImageSearch,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "framescan CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the scan stages.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum EngineKind {
    Template,
    Neural,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct ZnccConfigJson {
    max_levels: usize,
    min_template_side: usize,
    beam_width: usize,
    refine_radius: usize,
    min_var_i: f32,
}

impl Default for ZnccConfigJson {
    fn default() -> Self {
        let cfg = ZnccConfig::default();
        Self {
            max_levels: cfg.max_levels,
            min_template_side: cfg.min_template_side,
            beam_width: cfg.beam_width,
            refine_radius: cfg.refine_radius,
            min_var_i: cfg.min_var_i,
        }
    }
}

impl From<&ZnccConfigJson> for ZnccConfig {
    fn from(value: &ZnccConfigJson) -> Self {
        Self {
            max_levels: value.max_levels,
            min_template_side: value.min_template_side,
            beam_width: value.beam_width,
            refine_radius: value.refine_radius,
            min_var_i: value.min_var_i,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct Config {
    /// Screenshot scanned in place of a live window capture.
    image_path: String,
    /// Screen position of the screenshot's top-left corner.
    origin: (i32, i32),
    output_path: Option<String>,
    engine: EngineKind,
    min_confidence: f32,
    settings: EngineConfig,
    zncc: ZnccConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: "screenshot.png".to_string(),
            origin: (0, 0),
            output_path: None,
            engine: EngineKind::Template,
            min_confidence: 0.8,
            settings: EngineConfig {
                template_dir: Some(PathBuf::from("templates")),
                ..EngineConfig::default()
            },
            zncc: ZnccConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FailureRecord {
    template: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct Output {
    engine: &'static str,
    detections: Vec<Detection>,
    failures: Vec<FailureRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("framescan=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{}", serde_json::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }

    let frames = ImageFileSource::new().with_origin(config.origin.0, config.origin.1);
    let request = DetectionRequest::new(config.image_path.as_str(), config.min_confidence);
    let cancel = CancelToken::new();

    let output = match config.engine {
        EngineKind::Template => {
            let search = ZnccImageSearch::new((&config.zncc).into());
            let engine = TemplateEngine::new(config.settings, search, frames);
            let scan = engine.scan(&request, &cancel)?;
            Output {
                engine: "template",
                detections: scan.detections,
                failures: scan
                    .failures
                    .into_iter()
                    .map(|failure| FailureRecord {
                        template: failure.template.path.display().to_string(),
                        error: failure.error.to_string(),
                    })
                    .collect(),
            }
        }
        EngineKind::Neural => run_neural(config.settings, frames, &request, &cancel)?,
    };

    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(feature = "tract")]
fn run_neural(
    settings: EngineConfig,
    frames: ImageFileSource,
    request: &DetectionRequest,
    cancel: &CancelToken,
) -> Result<Output, Box<dyn std::error::Error>> {
    use framescan::{Detector, NeuralEngine, TractRuntime};

    let runtime = TractRuntime::new(settings.input_size);
    let engine = NeuralEngine::new(settings, runtime, frames);
    Ok(Output {
        engine: engine.name(),
        detections: engine.detect(request, cancel)?,
        failures: Vec::new(),
    })
}

#[cfg(not(feature = "tract"))]
fn run_neural(
    _settings: EngineConfig,
    _frames: ImageFileSource,
    _request: &DetectionRequest,
    _cancel: &CancelToken,
) -> Result<Output, Box<dyn std::error::Error>> {
    Err("the neural engine requires building framescan-cli with the `tract` feature".into())
}
