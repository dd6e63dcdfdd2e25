use anyhow::Result;
use clap::Parser;
use console::style;
use seqinfo::cli::Args;
use seqinfo::component::AssetInventory;
use seqinfo::component::asset_inventory::InventoryOptions;
use seqinfo::config::Config;
use seqinfo::init;
use seqinfo::tools::clean_path;
use std::process::ExitCode;

fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config)?;
    let options = InventoryOptions {
        search_root: clean_path(&args.search_root),
        image_extensions: args.image_extensions.clone(),
        movie_extensions: args.movie_extensions.clone(),
        separator: args.separator.clone(),
        verbose: args.verbose,
        output: args.spreadsheet_path(),
    };

    AssetInventory::new(config, options).run()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("fatal: {e:?}");
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
