use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;
use venue_locator::config::{parse_country_list, LocatorConfig};
use venue_locator::location::timezone::utc_offset_label;
use venue_locator::location::{
    Coordinate, LocationResolver, MapClick, PickerEvent, PickerPhase, PickerState, SearchController,
};

/// Venue Locator: resolve event venues to a name, coordinate and timezone.
///
/// Examples:
///   venue search "grand indonesia"
///   venue search monas --select 1
///   venue click --lat -6.1951 --lng 106.8217
///   venue timezone --lat -8.65 --lng 115.22
///   venue format "AB12+34, Kecamatan Cengkareng, Jakarta, Indonesia"
///   venue pick
///   venue serve --port 3000
#[derive(Parser)]
#[command(name = "venue", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

/// Overrides on top of the `VENUE_*` environment.
#[derive(Args)]
struct Settings {
    /// Maps API key.
    #[arg(long, env = "VENUE_MAPS_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Never call the map provider.
    #[arg(long, global = true)]
    offline: bool,

    /// Country omitted from display names (e.g. Indonesia).
    #[arg(long, global = true)]
    home_country: Option<String>,

    /// ISO code of the home country (e.g. ID), also omitted from display names.
    #[arg(long, global = true)]
    home_country_code: Option<String>,

    /// Radius in meters of the first nearby search on a click.
    #[arg(long, global = true)]
    radius: Option<u32>,

    /// Autocomplete country allow-list, comma-separated ISO codes.
    #[arg(long, global = true)]
    countries: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Autocomplete a venue name.
    Search {
        text: String,
        /// Confirm the Nth candidate (1-based).
        #[arg(long)]
        select: Option<usize>,
    },
    /// Resolve a map click.
    Click {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Place id of a POI rendered by the map, if the click hit one.
        #[arg(long)]
        place_id: Option<String>,
    },
    /// Create a location from raw coordinates.
    Manual {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Look up the IANA timezone for a coordinate.
    Timezone {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Shorten a provider address for display.
    Format { address: String },
    /// Interactive picker session on stdin.
    Pick,
    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Serialize)]
struct TimezoneOutput {
    timezone: String,
    utc_offset: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.settings)?;
    let resolver = LocationResolver::from_config(&config);

    match cli.command {
        Command::Search { text, select } => {
            let candidates = resolver.autocomplete(&text).await;
            match select {
                None => print_json(&candidates)?,
                Some(n) => {
                    let Some(candidate) = n.checked_sub(1).and_then(|i| candidates.get(i)) else {
                        bail!("no candidate #{} ({} results for '{}')", n, candidates.len(), text);
                    };
                    print_json(&resolver.select_candidate(candidate).await)?;
                }
            }
        }
        Command::Click { lat, lng, place_id } => {
            let coordinate = Coordinate::checked(lat, lng)?;
            let click = match place_id {
                Some(id) => MapClick::on_place(coordinate, id),
                None => MapClick::at(coordinate),
            };
            let resolved = resolver.resolve_click(&click).await?;
            eprintln!("  {}", resolved.display_line());
            print_json(&resolved)?;
        }
        Command::Manual { lat, lng } => {
            let resolved = resolver.resolve_manual(Coordinate::checked(lat, lng)?).await;
            eprintln!("  {}", resolved.display_line());
            print_json(&resolved)?;
        }
        Command::Timezone { lat, lng } => {
            let timezone = resolver.timezone(Coordinate::checked(lat, lng)?).await;
            print_json(&TimezoneOutput {
                utc_offset: utc_offset_label(&timezone),
                timezone,
            })?;
        }
        Command::Format { address } => println!("{}", resolver.format_address(&address)),
        Command::Pick => pick(resolver, config.debounce).await?,
        Command::Serve { host, port } => venue_locator::server::start(&host, port, resolver)
            .await
            .with_context(|| format!("server on {}:{} failed", host, port))?,
    }

    Ok(())
}

fn load_config(settings: &Settings) -> anyhow::Result<LocatorConfig> {
    apply_settings(LocatorConfig::from_env()?, settings)
}

fn apply_settings(mut config: LocatorConfig, settings: &Settings) -> anyhow::Result<LocatorConfig> {
    if let Some(key) = settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        config.api_key = Some(key.to_string());
    }
    if settings.offline {
        config.offline = true;
    }
    if let Some(country) = &settings.home_country {
        config.home_country = country.clone();
    }
    if let Some(code) = settings.home_country_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        config.home_country_code = code.to_uppercase();
    } else if settings.home_country.is_some() {
        // A new home country without its code must not keep the old code as home.
        config.home_country_code.clear();
    }
    if let Some(radius) = settings.radius {
        if radius == 0 {
            bail!("--radius must be at least 1 meter");
        }
        config.search_radius_m = radius;
    }
    if let Some(countries) = &settings.countries {
        config.autocomplete_countries = parse_country_list(countries);
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Interactive picker ──────────────────────────────────────────

const PICK_HELP: &str = "\
  Type to search. Commands:
    /select N              confirm candidate N
    /hover N               preview candidate N
    /click LAT LNG [ID]    click the map
    /commit                confirm the typed text as-is
    /clear                 reset the picker
    /quit";

#[derive(Debug, PartialEq)]
enum PickCommand {
    Event(PickerEvent),
    Quit,
}

fn parse_pick_line(line: &str) -> Result<PickCommand, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(PickCommand::Event(PickerEvent::TextChanged(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let index = |arg: Option<&str>| -> Result<usize, String> {
        arg.and_then(|s| s.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| "expected a candidate number starting at 1".to_string())
    };
    let number = |arg: Option<&str>, what: &str| -> Result<f64, String> {
        arg.and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| format!("expected {}", what))
    };

    let event = match parts.next() {
        Some("select") => PickerEvent::CandidateSelected(index(parts.next())?),
        Some("hover") => PickerEvent::CandidateHovered(index(parts.next())?),
        Some("click") => {
            let lat = number(parts.next(), "latitude")?;
            let lng = number(parts.next(), "longitude")?;
            let coordinate = Coordinate::checked(lat, lng).map_err(|e| e.to_string())?;
            match parts.next() {
                Some(id) => PickerEvent::MapClicked(MapClick::on_place(coordinate, id)),
                None => PickerEvent::MapClicked(MapClick::at(coordinate)),
            }
        }
        Some("commit") => PickerEvent::TextCommitted,
        Some("clear") => PickerEvent::Cleared,
        Some("quit") | Some("exit") => return Ok(PickCommand::Quit),
        _ => return Err(format!("unknown command '/{}'", command)),
    };
    Ok(PickCommand::Event(event))
}

fn render(state: &PickerState) {
    match state.phase {
        PickerPhase::ShowingCandidates if state.candidates.is_empty() => {
            eprintln!("  (no suggestions for '{}')", state.text)
        }
        PickerPhase::ShowingCandidates => {
            for (i, c) in state.candidates.iter().enumerate() {
                eprintln!("  {:>2}. {}", i + 1, c.description);
            }
        }
        PickerPhase::Resolving => eprintln!("  resolving..."),
        PickerPhase::NoResult => eprintln!("  nothing found at that spot"),
        PickerPhase::Unavailable => eprintln!("  map provider unavailable; type a name and /commit"),
        PickerPhase::Confirmed => {
            if let Some(current) = &state.current {
                eprintln!(
                    "  \u{1F4CD} {} [{}]",
                    current.display_name,
                    current.timezone.as_deref().unwrap_or("no timezone")
                );
            }
        }
        PickerPhase::Idle | PickerPhase::Querying => {}
    }
}

async fn pick(resolver: LocationResolver, debounce: Duration) -> anyhow::Result<()> {
    let controller = SearchController::new(resolver, debounce).on_location_resolved(|selection| {
        match serde_json::to_string(selection) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "failed to serialize selection"),
        }
    });
    let handle = controller.handle();
    let mut updates = controller.subscribe();
    render(&updates.borrow_and_update());
    let picker = tokio::spawn(controller.run());

    let watcher = tokio::spawn(async move {
        let mut last: Option<(PickerPhase, Option<usize>)> = None;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let key = (state.phase, state.hovered);
            if last == Some(key) {
                continue;
            }
            last = Some(key);
            if let Some(i) = state.hovered {
                if let Some(c) = state.candidates.get(i) {
                    eprintln!("  previewing {}", c.description);
                }
                continue;
            }
            render(&state);
        }
    });

    eprintln!("{}", PICK_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match parse_pick_line(&line) {
            Ok(PickCommand::Event(event)) => {
                if !handle.send(event) {
                    break;
                }
            }
            Ok(PickCommand::Quit) => break,
            Err(msg) => eprintln!("  {}", msg),
        }
    }

    handle.send(PickerEvent::Closed);
    picker.await.context("picker task failed")?;
    watcher.await.context("watcher task failed")?;
    Ok(())
}
