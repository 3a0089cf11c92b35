//! Command-line definition for the `par` binary.

use clap::{value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("par")
        .about("Create and restore Reed-Solomon parity archives")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("create")
                .visible_alias("c")
                .about("Create the parity file for a data file")
                .arg(
                    Arg::new("version")
                        .long("version")
                        .value_name("CONTAINER")
                        .help("Container to create (tar|json|par2)")
                        .value_parser(["tar", "json", "par", "par2"])
                        .default_value("tar"),
                )
                .arg(
                    Arg::new("shard-size")
                        .short('s')
                        .value_name("BYTES")
                        .help("Shard size in bytes (rounded up to a multiple of 4)")
                        .value_parser(value_parser!(u32))
                        .default_value("524288"),
                )
                .arg(
                    Arg::new("redundancy")
                        .short('r')
                        .value_name("PERCENT")
                        .help("Redundancy percentage")
                        .value_parser(value_parser!(u32))
                        .default_value("30"),
                )
                .arg(
                    Arg::new("data")
                        .value_name("FILE")
                        .help("Data file to protect")
                        .required(true),
                )
                .arg(
                    Arg::new("parity")
                        .value_name("PARITY")
                        .help("Parity file to write (default: <FILE>.par)"),
                ),
        )
        .subcommand(
            Command::new("restore")
                .visible_alias("r")
                .about("Restore the data file from its parity")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .value_name("OUT")
                        .help("Output file ('-' for standard output)")
                        .default_value("-"),
                )
                .arg(
                    Arg::new("parity")
                        .value_name("PARITY")
                        .help("Parity file")
                        .required(true),
                )
                .arg(
                    Arg::new("data")
                        .value_name("FILE")
                        .help("Data file (default: PARITY with .par stripped)"),
                ),
        )
        .subcommand(
            Command::new("dump")
                .visible_alias("d")
                .about("Pretty-print the parsed contents of a PAR 2.0 file")
                .arg(
                    Arg::new("parity")
                        .value_name("PARITY")
                        .help("Parity file")
                        .required(true)
                        .action(ArgAction::Set),
                ),
        )
}

/// Maps a redundancy percentage onto a shard geometry: multiples of ten
/// spread over ten data shards, anything else over one hundred.
pub fn redundancy_to_geometry(redundancy: u32) -> (u8, u8) {
    if redundancy % 10 == 0 {
        (10, (redundancy / 10) as u8)
    } else {
        (100, redundancy as u8)
    }
}
