use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::ArgMatches;
use log::error;

use par::args::{build_cli, redundancy_to_geometry};
use par::container::detect_container;
use par::par2::ParInfo;
use par::{create_par_file, restore_par_file, ContainerVersion};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    match build_cli().get_matches().subcommand() {
        Some(("create", matches)) => create(matches),
        Some(("restore", matches)) => restore(matches),
        Some(("dump", matches)) => dump(matches),
        _ => unreachable!("subcommand is required"),
    }
}

fn create(matches: &ArgMatches) -> anyhow::Result<()> {
    let container = match matches.get_one::<String>("version").unwrap().as_str() {
        "json" => ContainerVersion::Json,
        "par" | "par2" => ContainerVersion::Par2,
        "tar" => ContainerVersion::Tar,
        other => bail!("unknown version {other:?}; known versions: json, tar, par2"),
    };
    let redundancy = *matches.get_one::<u32>("redundancy").unwrap();
    if redundancy == 0 || redundancy > 255 {
        bail!("redundancy must be between 1 and 255");
    }
    let shard_size = *matches.get_one::<u32>("shard-size").unwrap();
    if shard_size == 0 {
        bail!("shard size must be positive");
    }
    let (data_shards, parity_shards) = redundancy_to_geometry(redundancy);

    let data = PathBuf::from(matches.get_one::<String>("data").unwrap());
    let parity = matches
        .get_one::<String>("parity")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_parity_path(&data));

    create_par_file(
        container,
        &parity,
        &data,
        data_shards,
        parity_shards,
        shard_size,
    )
    .with_context(|| format!("create {}", parity.display()))?;
    Ok(())
}

fn restore(matches: &ArgMatches) -> anyhow::Result<()> {
    let parity = PathBuf::from(matches.get_one::<String>("parity").unwrap());
    let data = matches
        .get_one::<String>("data")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_path(&parity));

    let out = matches.get_one::<String>("output").unwrap();
    if out == "-" {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        restore_par_file(&mut handle, &parity, &data)
            .with_context(|| format!("restore {}", parity.display()))?;
        handle.flush()?;
    } else {
        let mut file = File::create(out).with_context(|| format!("create {out}"))?;
        restore_par_file(&mut file, &parity, &data)
            .with_context(|| format!("restore {}", parity.display()))?;
        file.flush()?;
    }
    Ok(())
}

fn dump(matches: &ArgMatches) -> anyhow::Result<()> {
    let parity = PathBuf::from(matches.get_one::<String>("parity").unwrap());
    let mut file = File::open(&parity).with_context(|| format!("open {}", parity.display()))?;
    let container = detect_container(&mut file)?;
    drop(file);
    if container != ContainerVersion::Par2 {
        bail!("dumping version {container} not implemented");
    }

    let info = ParInfo::parse(&[parity])?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &info)?;
    handle.write_all(b"\n")?;
    Ok(())
}

fn default_parity_path(data: &Path) -> PathBuf {
    let mut name = data.as_os_str().to_os_string();
    name.push(".par");
    PathBuf::from(name)
}

fn default_data_path(parity: &Path) -> PathBuf {
    match parity.to_string_lossy().strip_suffix(".par") {
        Some(stripped) => PathBuf::from(stripped),
        None => parity.to_path_buf(),
    }
}
