use std::path::{Path, PathBuf};

use fuelboard::{
    app::App,
    cli::Command,
    config::{Config, DEFAULT_DATA_DIR},
    Error, Result,
};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match Command::parse(&args) {
        Ok(Command::ShowHelp) => {
            Command::print_help();
            Ok(())
        }
        Ok(Command::ShowVersion) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Ok(Command::InitConfig { data_dir, force }) => {
            let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            init_config(&data_dir, force)
        }
        Ok(Command::Run(opts)) => {
            let app = App::from_options(opts)?;
            app.run()
        }
        Err(err) => {
            Command::print_help();
            Err(err)
        }
    }
}

fn init_config(data_dir: &Path, force: bool) -> Result<()> {
    let path = Config::path_in(data_dir);
    if path.exists() && !force {
        return Err(Error::InvalidArgs(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }
    Config::default().save_to_path(&path)?;
    println!("wrote {}; fill in wlan_ssid, station_ids and tankerkoenig_api_key", path.display());
    Ok(())
}
