mod burrow;
mod config;
mod device;
mod heartbeat;
mod prices;
mod prowl;
mod retry;

use clap::{Parser, Subcommand};

pub use self::{burrow::BurrowArgs, prowl::ProwlArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: keep the devices switched on during the cheap hours until interrupted.
    #[clap(name = "prowl")]
    Prowl(Box<ProwlArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_prowl_defaults_ok() {
        let args = Args::try_parse_from(["ferret", "prowl"]).unwrap();
        let Command::Prowl(args) = args.command else { panic!("expected `prowl`") };
        assert_eq!(args.tick_interval(), std::time::Duration::from_secs(60));
    }

    #[test]
    fn parse_burrow_device_ok() {
        let args = Args::try_parse_from(["ferret", "burrow", "device", "192.168.1.10", "on"]);
        assert!(args.is_ok());
    }
}
