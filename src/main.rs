use anyhow::{Context, Result, bail};
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use whereabouts::api::{GeocodingClient, PoiClient};
use whereabouts::config::FileConfig;
use whereabouts::domain::Coordinate;
use whereabouts::locate::{FixedPlatform, IpPlatform, LocationPlatform};
use whereabouts::orchestrator::{Orchestrator, PositionStage, Surfaces};
use whereabouts::surface::TerminalSurface;

/// Find out where you are, what the address is and what is nearby
///
/// Examples:
///   # Locate via IP, reverse-geocode through Nominatim, list nearby POIs
///   whereabouts --email you@example.org
///
///   # Use a fixed position and a relay that adds the contact address
///   whereabouts --lat 31.2304 --lon 121.4737 --proxy-url https://relay.example.net
///
///   # Address only, wider search disabled
///   whereabouts --lat 48.8584 --lon 2.2945 --no-poi
///
///   # Use a config file
///   whereabouts --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "whereabouts")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches whereabouts.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latitude of a fixed position (use with --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of a fixed position (use with --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Do not fall back to IP geolocation when no fixed position is given
    #[arg(long)]
    no_ip: bool,

    /// Send reverse-geocoding requests through this relay instead of Nominatim
    #[arg(long)]
    proxy_url: Option<String>,

    /// Contact address sent to Nominatim when calling it directly
    #[arg(long)]
    email: Option<String>,

    /// POI search radius in meters
    #[arg(short = 'r', long)]
    radius: Option<u32>,

    /// Maximum number of POIs to list
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Skip the nearby POI search
    #[arg(long)]
    no_poi: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let config_path = match args.config {
        Some(ref path) if !path.exists() => bail!("Config file not found: {:?}", path),
        Some(ref path) => Some(path.clone()),
        None => FileConfig::find(),
    };
    let mut file_config = match config_path {
        Some(ref path) => FileConfig::from_path(path).context("Failed to load config file")?,
        None => FileConfig::default(),
    };

    let verbose = args.verbose || file_config.verbose;
    init_tracing(verbose)?;
    match config_path {
        Some(ref path) => tracing::debug!(path = %path.display(), "loaded config file"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    let lat = args.lat.or(file_config.lat);
    let lon = args.lon.or(file_config.lon);
    if args.no_ip {
        file_config.locate.ip_lookup = false;
    }
    if let Some(proxy_url) = args.proxy_url.clone() {
        file_config.geocoding.proxy_url = Some(proxy_url);
    }
    if let Some(email) = args.email.clone() {
        file_config.geocoding.email = email;
    }
    if let Some(radius) = args.radius {
        file_config.poi.radius_m = radius;
    }
    if let Some(limit) = args.limit {
        file_config.poi.limit = limit;
    }
    if args.no_poi {
        file_config.poi.enabled = false;
    }

    println!("whereabouts");
    println!("===========");
    println!();

    if verbose {
        println!("Configuration:");
        if let (Some(lt), Some(ln)) = (lat, lon) {
            println!("  Fixed position: ({:.4}, {:.4})", lt, ln);
        } else {
            println!(
                "  IP geolocation: {}",
                if file_config.locate.ip_lookup { "enabled" } else { "disabled" }
            );
        }
        match &file_config.geocoding.proxy_url {
            Some(proxy) => println!("  Geocoding via proxy: {}", proxy),
            None => println!("  Geocoding: {}", file_config.geocoding.base_url),
        }
        if file_config.poi.enabled {
            println!(
                "  POI search: {}m radius, up to {} results, tags {:?}",
                file_config.poi.radius_m, file_config.poi.limit, file_config.poi.tags
            );
        } else {
            println!("  POI search: disabled");
        }
        println!();
    }

    if file_config.geocoding.proxy_url.is_none() && file_config.geocoding.email.is_empty() {
        tracing::warn!("no contact email configured; Nominatim may throttle anonymous requests");
    }

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    let geocoder = GeocodingClient::new(client.clone(), file_config.geocoding.settings())
        .context("Invalid geocoding configuration")?;
    let poi = if file_config.poi.enabled {
        let settings = file_config
            .poi
            .settings(&file_config.geocoding.user_agent)
            .context("Invalid POI configuration")?;
        Some(PoiClient::new(client.clone(), settings).context("Invalid POI configuration")?)
    } else {
        None
    };

    let platform: Option<Box<dyn LocationPlatform>> = match (lat, lon) {
        (Some(lt), Some(ln)) => Some(Box::new(FixedPlatform::new(Coordinate::new(lt, ln)))),
        _ if file_config.locate.ip_lookup => {
            let url = Url::parse(&file_config.locate.ip_url)
                .context("Invalid IP geolocation URL")?;
            Some(Box::new(IpPlatform::new(client.clone(), url)))
        }
        _ => None,
    };

    let orchestrator = Orchestrator::new(geocoder, poi, file_config.locate.options());

    let mut position = TerminalSurface::new("Position");
    let mut address = TerminalSurface::new("Address");
    let mut nearby = TerminalSurface::new("Nearby");
    let mut surfaces = Surfaces {
        position: &mut position,
        address: &mut address,
        poi: &mut nearby,
    };

    let report = orchestrator.run(platform.as_deref(), &mut surfaces).await;

    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    if report.position == PositionStage::Failed {
        bail!("Could not determine the current position");
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let fallback = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
