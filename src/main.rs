use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use labelsync::surface::{ConsoleSurface, PreviewSurface};
use labelsync::{
    Field, PageBootstrap, PreviewSyncController, ProtocolVersion, SyncConfig, Transport, UploadedAsset,
};
use std::io::{self, BufRead};
use std::path::PathBuf;

type Controller = PreviewSyncController<labelsync::http::HttpTransport, ConsoleSurface>;

#[derive(Parser)]
#[command(name = "labelsync", version, about = "Preview, save and export beer labels against a label backend")]
struct Cli {
    /// JSON configuration file (keys of SyncConfig)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the label backend
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Label UUID to scope endpoints with
    #[arg(long, global = true)]
    uuid: Option<String>,

    /// Form revision spoken by the backend (v1 or v2)
    #[arg(long, global = true)]
    protocol: Option<ProtocolVersion>,

    /// Editor page to bootstrap initial data and label UUID from
    #[arg(long, global = true)]
    page: Option<String>,

    /// JSON file with initial label data
    #[arg(long, global = true)]
    initial: Option<PathBuf>,

    /// Directory that receives downloaded PDFs
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Default)]
struct DraftArgs {
    /// Background image (png, jpg, jpeg)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Field assignment, e.g. --set beer_name="Pale Ale"
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(Field, String)>,
}

#[derive(Subcommand)]
enum Command {
    /// Render one preview of the draft
    Preview(DraftArgs),
    /// Export the label as a PDF into --out-dir
    Pdf(DraftArgs),
    /// Save the label on the server
    Save(DraftArgs),
    /// Read `field=value` edits from stdin and re-render after each one
    Watch(DraftArgs),
    /// Print the draft as label data JSON
    Inspect(DraftArgs),
}

fn parse_assignment(s: &str) -> Result<(Field, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", s))?;
    let field = Field::from_name(name).ok_or_else(|| format!("unknown field '{}'", name.trim()))?;
    Ok((field, value.to_string()))
}

fn load_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(uuid) = &cli.uuid {
        config.label_uuid = Some(uuid.clone());
    }
    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }
    Ok(config)
}

fn bootstrap(controller: &mut Controller, cli: &Cli) -> anyhow::Result<()> {
    if let Some(page) = &cli.page {
        controller
            .bootstrap_from_page(page)
            .with_context(|| format!("Failed to bootstrap from {}", page))?;
    }
    if let Some(path) = &cli.initial {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        let boot = PageBootstrap::from_json(value, None)?;
        controller.initialize(&boot)?;
    }
    Ok(())
}

/// Assign `--set` values, refusing fields the configured form does not have
fn apply_fields<T: Transport, S: PreviewSurface>(
    controller: &mut PreviewSyncController<T, S>,
    set: &[(Field, String)],
) -> anyhow::Result<()> {
    let protocol = controller.protocol();
    for (field, value) in set {
        if !field.is_available(protocol) {
            bail!("field '{}' is not on the {} form", field.name(protocol), protocol);
        }
        controller.set_field(*field, value.clone());
    }
    Ok(())
}

fn apply_draft(controller: &mut Controller, args: &DraftArgs) -> anyhow::Result<()> {
    apply_fields(controller, &args.set)?;
    if let Some(path) = &args.image {
        let asset = UploadedAsset::from_path(path)
            .with_context(|| format!("Failed to load image {}", path.display()))?;
        controller.attach_background(asset)?;
    }
    Ok(())
}

fn watch(controller: &mut Controller) -> anyhow::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Failures were already alerted on stderr; keep reading edits
        let outcome = match line {
            ":quit" | ":q" => break,
            ":preview" => controller.submit_draft().map(|_| ()),
            ":pdf" => controller.export_pdf().map(|_| ()),
            ":save" => controller.save_label().map(|_| ()),
            edit => match parse_assignment(edit) {
                Ok((field, value)) => controller.edit_field(field, value).map(|_| ()),
                Err(e) => {
                    eprintln!("! {}", e);
                    Ok(())
                }
            },
        };
        if let Err(e) = outcome {
            log::debug!("command '{}' failed: {}", line, e);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let surface = ConsoleSurface::new(cli.out_dir.clone());
    let mut controller = labelsync::connect(config, surface).context("Failed to create client")?;
    bootstrap(&mut controller, &cli)?;

    match &cli.command {
        Command::Preview(args) => {
            apply_draft(&mut controller, args)?;
            if args.image.is_none() {
                controller.submit_draft()?;
            }
        }
        Command::Pdf(args) => {
            apply_draft(&mut controller, args)?;
            controller.export_pdf()?;
        }
        Command::Save(args) => {
            apply_draft(&mut controller, args)?;
            let outcome = controller.save_label()?;
            if let Some(uuid) = outcome.label_uuid {
                println!("uuid: {}", uuid);
            }
        }
        Command::Watch(args) => {
            apply_draft(&mut controller, args)?;
            watch(&mut controller)?;
        }
        Command::Inspect(args) => {
            apply_fields(&mut controller, &args.set)?;
            let data = controller.draft().label_data(controller.protocol());
            println!("{}", serde_json::to_string_pretty(&data)?);
            if let Some(uuid) = controller.label_uuid() {
                println!("uuid: {}", uuid);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("labelsync: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelsync::surface::RecordingSurface;
    use labelsync::MemoryTransport;

    fn controller(protocol: ProtocolVersion) -> PreviewSyncController<MemoryTransport, RecordingSurface> {
        let config = SyncConfig { protocol, ..Default::default() };
        PreviewSyncController::new(&config, MemoryTransport::new(), RecordingSurface::new()).unwrap()
    }

    #[test]
    fn assignments_parse_either_subtitle_name() {
        assert_eq!(parse_assignment("brewer_name=Acme").unwrap(), (Field::Subtitle, "Acme".to_string()));
        assert_eq!(parse_assignment("crop_y=12").unwrap(), (Field::CropY, "12".to_string()));
        assert!(parse_assignment("crop_y").is_err());
        assert!(parse_assignment("hops=citra").is_err());
    }

    #[test]
    fn fields_missing_from_the_form_are_refused() {
        let mut v1 = controller(ProtocolVersion::V1);
        let set = vec![(Field::BeerName, "Bock".to_string()), (Field::CropY, "12".to_string())];
        let err = apply_fields(&mut v1, &set).unwrap_err();
        assert!(err.to_string().contains("crop_y"));

        let mut v2 = controller(ProtocolVersion::V2);
        apply_fields(&mut v2, &set).unwrap();
        assert_eq!(v2.draft().crop_y, "12");
        assert_eq!(v2.transport().request_count(), 0);
    }
}
