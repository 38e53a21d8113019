use clap::{Parser, Subcommand};

use crate::{
    cli::{config::ConfigArgs, device::DeviceArgs, prices::PriceArgs, retry::RetryArgs},
    core::{
        device::{Address, DeviceControl},
        schedule::DeviceSchedule,
        shutdown::Shutdown,
    },
    prelude::*,
    tables::{build_prices_table, build_statistics_table, build_windows_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        match self.command {
            BurrowCommand::Prices(args) => args.run().await,
            BurrowCommand::Windows(args) => args.run().await,
            BurrowCommand::Device(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Fetch and print the prices.
    Prices(BurrowPricesArgs),

    /// Fetch the prices and print the favorable windows of every configured device.
    Windows(BurrowWindowsArgs),

    /// Talk to a single device.
    Device(BurrowDeviceArgs),
}

#[derive(Parser)]
struct BurrowPricesArgs {
    #[clap(flatten)]
    prices: PriceArgs,
}

impl BurrowPricesArgs {
    async fn run(self) -> Result {
        let series = self.prices.fetch_series().await?;
        ensure!(!series.is_empty(), "the price feed returned nothing");
        let statistics = series.statistics()?;
        println!("{}", build_prices_table(&series, &statistics));
        println!("{}", build_statistics_table(&statistics));
        Ok(())
    }
}

#[derive(Parser)]
struct BurrowWindowsArgs {
    #[clap(flatten)]
    prices: PriceArgs,

    #[clap(flatten)]
    config: ConfigArgs,
}

impl BurrowWindowsArgs {
    async fn run(self) -> Result {
        let configuration = self.config.open().await?.snapshot();
        let series = self.prices.fetch_series().await?;
        let min_duration = self.prices.min_window_duration()?;
        for device in configuration.devices.values() {
            let schedule = DeviceSchedule::compute(&series, device.policy, min_duration)?;
            info!(
                device = %device.name,
                policy = %device.policy,
                threshold = %schedule.threshold,
                n_windows = schedule.windows.len(),
            );
            println!("{}", build_windows_table(&device.name, &schedule));
        }
        Ok(())
    }
}

#[derive(Parser)]
struct BurrowDeviceArgs {
    /// Device host name or IP address, optionally with a port.
    address: Address,

    #[command(subcommand)]
    command: BurrowDeviceCommand,

    #[clap(flatten)]
    device: DeviceArgs,

    #[clap(flatten)]
    retry: RetryArgs,
}

#[derive(Copy, Clone, Subcommand)]
enum BurrowDeviceCommand {
    /// Read the power state.
    State,

    /// Switch the device on.
    On,

    /// Switch the device off.
    Off,

    /// Check that the device is reachable.
    Test,
}

impl BurrowDeviceArgs {
    #[instrument(skip_all, fields(address = %self.address))]
    async fn run(self) -> Result {
        let client = self.device.client()?;
        let retry = self.retry.retry();
        let shutdown = Shutdown::never();
        let address = &self.address;

        match self.command {
            BurrowDeviceCommand::State => {
                let is_on = retry.run(&shutdown, || client.read_state(address)).await?;
                info!(is_on, "gotcha");
            }
            BurrowDeviceCommand::On | BurrowDeviceCommand::Off => {
                let is_on = matches!(self.command, BurrowDeviceCommand::On);
                retry.run(&shutdown, || client.set_state(address, is_on)).await?;
                info!(is_on, "switched");
            }
            BurrowDeviceCommand::Test => {
                retry.run(&shutdown, || client.test_connection(address)).await?;
                info!("reachable");
            }
        }
        Ok(())
    }
}
