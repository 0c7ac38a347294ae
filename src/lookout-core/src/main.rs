//! Lookout - find images and text on screen
//!
//! Template matching and OCR text search over image files or live display
//! captures, plus monitor geometry queries.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use lookout_core::colored_logger::{init_component_logger, Component};
use lookout_core::{ColorSpace, Granularity, Locator, LocatorConfig, Match, Point, Position, RasterImage, Rect};

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "Locate images and text on screen")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find all occurrences of a template image
    FindImage {
        /// Image to search: a file path or `display:N`
        source: ImageSource,

        /// Template image file
        template: PathBuf,

        /// Minimum correlation score (defaults to the configured value)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Find text fully matching a regular expression
    FindText {
        /// Image to search: a file path or `display:N`
        source: ImageSource,

        /// Regular expression the whole fragment must match
        pattern: String,

        /// Minimum confidence as a fraction (defaults to the configured value)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// symbol, word, line, paragraph or block
        #[arg(short, long)]
        granularity: Option<Granularity>,
    },

    /// List monitors on the virtual desktop
    Displays,

    /// Find the monitor containing a virtual-desktop point
    Locate {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },

    /// Capture a display (or part of it) to an image file
    Capture {
        /// Output file; the format follows the extension
        output: PathBuf,

        /// Display index
        #[arg(short, long, default_value = "0")]
        display: usize,

        /// Region relative to the display as `x,y,width,height`
        #[arg(short, long, value_parser = parse_region)]
        region: Option<Rect>,
    },

    /// Check external dependencies (tesseract, displays)
    Check,
}

/// Where a searched image comes from
#[derive(Debug, Clone)]
enum ImageSource {
    File(PathBuf),
    Display(usize),
}

impl FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.strip_prefix("display:") {
            Some(index) => index
                .parse()
                .map(ImageSource::Display)
                .map_err(|_| format!("invalid display index '{}'", index)),
            None => Ok(ImageSource::File(PathBuf::from(s))),
        }
    }
}

impl ImageSource {
    fn load(&self, locator: &Locator) -> Result<RasterImage> {
        let image = match self {
            ImageSource::File(path) => locator
                .load_image(path, ColorSpace::Bgr)
                .with_context(|| format!("failed to load {:?}", path))?,
            ImageSource::Display(index) => locator.capture_display(*index)?,
        };
        Ok(image)
    }

    fn display(&self) -> Option<usize> {
        match self {
            ImageSource::Display(index) => Some(*index),
            ImageSource::File(_) => None,
        }
    }
}

fn parse_region(s: &str) -> std::result::Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region '{}': {}", s, e))?;
    match parts[..] {
        [x, y, w, h] if w > 0 && h > 0 => Ok(Rect::new(x as i32, y as i32, w as u32, h as u32)),
        _ => Err(format!("region must be x,y,width,height with positive size, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let component = match cli.command {
        Commands::FindImage { .. } => Component::Image,
        Commands::FindText { .. } => Component::Text,
        Commands::Displays | Commands::Locate { .. } => Component::Display,
        Commands::Capture { .. } => Component::Capture,
        Commands::Check => Component::Main,
    };
    init_component_logger(component, cli.verbose)?;

    let mut config = LocatorConfig::load(cli.config.as_deref())?;
    if let Some(profile) = &cli.profile {
        config = config.apply_profile(profile)?;
        info!("applied profile '{}'", profile);
    }
    let locator = Locator::new(config);

    match cli.command {
        Commands::FindImage {
            source,
            template,
            threshold,
        } => {
            let image = source.load(&locator)?;
            let template = locator
                .load_image(&template, image.color_space())
                .with_context(|| format!("failed to load template {:?}", template))?;
            let found = locator.find_image(&image, &template, threshold)?;
            report_matches(&locator, &found, source.display(), cli.json)?;
        }
        Commands::FindText {
            source,
            pattern,
            threshold,
            granularity,
        } => {
            let image = source.load(&locator)?;
            let found = locator.find_text(&image, &pattern, threshold, granularity)?;
            report_matches(&locator, &found, source.display(), cli.json)?;
        }
        Commands::Displays => cmd_displays(&locator, cli.json)?,
        Commands::Locate { x, y } => cmd_locate(&locator, Point::new(x, y), cli.json)?,
        Commands::Capture {
            output,
            display: display_index,
            region,
        } => {
            let image = match region {
                Some(region) => locator.capture_region(region, display_index)?,
                None => locator.capture_display(display_index)?,
            };
            locator.save_image(&image, &output)?;
            info!(
                "saved {}x{} capture of display {} to {:?}",
                image.width(),
                image.height(),
                display_index,
                output
            );
        }
        Commands::Check => cmd_check(&locator)?,
    }

    Ok(())
}

/// Print matches; exits with status 1 when there are none
fn report_matches(locator: &Locator, found: &[Match], display: Option<usize>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(found)?);
    } else if found.is_empty() {
        println!("no matches");
    } else {
        println!("found {} match(es):\n", found.len());
        for (i, m) in found.iter().enumerate() {
            let label = m.label.as_deref().map(|l| format!(" \"{}\"", l)).unwrap_or_default();
            print!("  [{}] {}{}", i, m.rect, label);
            // captured displays can be placed on the desktop
            if let Some(index) = display {
                let point = locator.to_virtual(index, &Position::from(m.clone()))?;
                print!(" -> desktop {}", point);
            }
            println!();
        }
    }

    if found.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_displays(locator: &Locator, json: bool) -> Result<()> {
    let monitors = locator.monitors()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&monitors)?);
        return Ok(());
    }

    println!("found {} monitor(s):\n", monitors.len());
    for m in &monitors {
        println!("  [{}] {} - {}", m.index, m.name, m.rect);
    }
    Ok(())
}

fn cmd_locate(locator: &Locator, point: Point, json: bool) -> Result<()> {
    let location = locator.locate_point(point)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&location)?);
    } else {
        match location {
            Some(loc) => println!("{} is on display {} at {}", point, loc.index, loc.local),
            None => println!("{} is not on any display", point),
        }
    }

    if location.is_none() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_check(locator: &Locator) -> Result<()> {
    println!("checking dependencies...\n");
    let ocr = &locator.config().ocr;

    let languages = lookout_ocr::list_languages(&ocr.binary, ocr.tessdata.as_deref());
    let tesseract_ok = match &languages {
        Ok(langs) => {
            println!("  tesseract: OK ({} language(s))", langs.len());
            let has_language = langs.iter().any(|l| l == &ocr.language);
            println!(
                "  language '{}': {}",
                ocr.language,
                if has_language { "OK" } else { "NOT FOUND" }
            );
            has_language
        }
        Err(e) => {
            warn!("{}", e);
            println!("  tesseract: NOT FOUND ({})", ocr.binary.display());
            false
        }
    };

    let displays = locator.display_count();
    match &displays {
        Ok(count) => println!("  displays: {} found", count),
        Err(e) => println!("  displays: enumeration failed ({})", e),
    }

    println!();

    if !tesseract_ok {
        println!("WARNING: text search needs tesseract with the configured language data.");
        println!("Install tesseract or set [ocr] binary / tessdata in the config file.");
        return Err(anyhow!("tesseract not usable"));
    }
    if displays.is_err() {
        return Err(anyhow!("display enumeration failed"));
    }

    println!("all checks passed!");
    Ok(())
}
