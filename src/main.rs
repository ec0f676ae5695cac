use std::path::{Path, PathBuf};

use anyhow::{anyhow, Error};
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use rgb_driver::prelude::*;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

#[derive(Parser)]
#[command(name = "rgb-driver", version, about = "Drive an RGB light over a serial port")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overrides the session and the config
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the serial ports on this machine
    Ports,
    /// Show the stored presets
    List,
    /// Store a color, before preset AT or at the end
    Add {
        color: String,
        #[arg(long)]
        at: Option<usize>,
    },
    /// Delete a stored preset
    Remove { index: usize },
    /// Make a preset active and send it
    Select { index: usize },
    /// Send the preset after the active one
    Next,
    /// Send the preset before the active one
    Previous,
    /// Send a color without storing it
    Send { color: String },
    /// Print the command frame for a color
    Encode { color: String },
    /// Write every preset icon as a PNG
    Icons { dir: PathBuf },
    /// Read actions from stdin, one per line
    Run {
        /// Remember whether later runs open the port right away
        #[arg(long)]
        activate_on_start: Option<bool>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let mut session = Session::load(&config.session)?;

    let mut store = PresetStore::new(config.icon_template());
    session.restore(&mut store);

    match cli.command {
        Command::Ports => {
            let ports = available_ports()?;
            if ports.is_empty() {
                info!("No serial ports found");
            }
            for port in ports {
                println!("{}", port);
            }
        }
        Command::List => print_presets(&store),
        Command::Add { color, at } => {
            let color = parse_color(&color)?;
            store.insert(at, color);
            info!("Stored {}", color_name(color));
            save_session(&mut session, &store, &config)?;
        }
        Command::Remove { index } => {
            let color = store
                .remove(index)
                .ok_or_else(|| anyhow!("There is no preset {}", index))?;
            info!("Removed {}", color_name(color));
            save_session(&mut session, &store, &config)?;
        }
        Command::Select { index } => {
            let mut port = open_port(cli.port.as_deref(), &mut session, &config)?;
            let color = store
                .color_at(index)
                .ok_or_else(|| anyhow!("There is no preset {}", index))?;
            port.send(&encode(color))?;
            save_session(&mut session, &store, &config)?;
        }
        Command::Next => {
            let mut port = open_port(cli.port.as_deref(), &mut session, &config)?;
            let color = store.next_color().ok_or_else(|| anyhow!("No presets stored"))?;
            port.send(&encode(color))?;
            save_session(&mut session, &store, &config)?;
        }
        Command::Previous => {
            let mut port = open_port(cli.port.as_deref(), &mut session, &config)?;
            let color = store
                .previous_color()
                .ok_or_else(|| anyhow!("No presets stored"))?;
            port.send(&encode(color))?;
            save_session(&mut session, &store, &config)?;
        }
        Command::Send { color } => {
            let color = parse_color(&color)?;
            let mut port = open_port(cli.port.as_deref(), &mut session, &config)?;
            port.send(&encode(color))?;
            session.set_manual_color(color);
            save_session(&mut session, &store, &config)?;
        }
        Command::Encode { color } => println!("{}", encode(parse_color(&color)?)),
        Command::Icons { dir } => export_icons(&store, &dir)?,
        Command::Run { activate_on_start } => {
            if let Some(activate) = activate_on_start {
                session.activate = activate;
            }
            run(&config, session, store, cli.port).await?
        }
    }

    Ok(())
}

fn print_presets(store: &PresetStore) {
    if store.is_empty() {
        println!("No presets stored");
        return;
    }

    for (index, preset) in store.iter().enumerate() {
        let marker = if store.current_index() == Some(index) {
            '*'
        } else {
            ' '
        };
        println!(
            "{} {:>3}  {}  {}",
            marker,
            index,
            preset.name(),
            encode(preset.color())
        );
    }
}

fn export_icons(store: &PresetStore, dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;

    for (index, preset) in store.iter().enumerate() {
        let Some(icon) = preset.icon() else {
            warn!("Preset {} has no icon", index);
            continue;
        };
        let path = dir.join(format!(
            "{:02}-{}.png",
            index,
            preset.name().trim_start_matches('#')
        ));
        icon.save_png(&path)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

fn save_session(session: &mut Session, store: &PresetStore, config: &Config) -> Result<(), Error> {
    session.capture(store);
    session.save(&config.session)
}

fn open_port(
    requested: Option<&str>,
    session: &mut Session,
    config: &Config,
) -> Result<SerialController, Error> {
    let name = config
        .resolve_port(requested, session.port.as_deref())
        .ok_or_else(|| anyhow!("No serial port given, pass --port or set one in the config"))?;

    let port = SerialController::open(&name, config.serial.baud_rate)?;
    session.port = Some(name);
    Ok(port)
}

type Writer = (mpsc::Sender<SerialMessage>, JoinHandle<SerialController>);

fn start_writer(
    requested: Option<&str>,
    session: &mut Session,
    config: &Config,
) -> Result<Writer, Error> {
    let controller = open_port(requested, session, config)?;
    let (tx, rx) = mpsc::channel(100);
    Ok((tx, tokio::spawn(controller.start(rx))))
}

async fn stop_writer(
    driver: &mut Driver<mpsc::Sender<SerialMessage>>,
    writer: &mut Option<JoinHandle<SerialController>>,
) -> Result<(), Error> {
    // Dropping the sender ends the writer loop, which closes the port
    drop(driver.deactivate());
    if let Some(handle) = writer.take() {
        let controller = handle.await?;
        info!("Closed {}", controller.name());
    }
    Ok(())
}

async fn run(
    config: &Config,
    mut session: Session,
    store: PresetStore,
    requested: Option<String>,
) -> Result<(), Error> {
    let mut driver = Driver::new(store);
    driver
        .store_mut()
        .subscribe(|change| debug!("Presets changed: {:?}", change));

    let mut writer = None;
    if session.activate || requested.is_some() {
        let (tx, handle) = start_writer(requested.as_deref(), &mut session, config)?;
        driver.activate(tx);
        writer = Some(handle);
    } else {
        info!("Port is closed, type `o` to open it");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match Input::parse(&line) {
            Ok(Input::Event(event)) => {
                session.record(&event);
                if let Some(color) = driver.handle(event) {
                    println!("{}", color_name(color));
                }
            }
            Ok(Input::Open) => {
                if driver.is_active() {
                    continue;
                }
                match start_writer(requested.as_deref(), &mut session, config) {
                    Ok((tx, handle)) => {
                        driver.activate(tx);
                        writer = Some(handle);
                    }
                    Err(e) => error!("{}", e),
                }
            }
            Ok(Input::Close) => stop_writer(&mut driver, &mut writer).await?,
            Ok(Input::List) => print_presets(driver.store()),
            Ok(Input::Save) => save_session(&mut session, driver.store(), config)?,
            Ok(Input::Quit) => break,
            Err(e) => warn!("{}", e),
        }
    }

    stop_writer(&mut driver, &mut writer).await?;
    save_session(&mut session, driver.store(), config)
}
