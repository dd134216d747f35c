use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use odim_bridge::fixture::{
    FixtureSource, DEFAULT_BASE_URL, DEFAULT_CACHE_DIR, DEFAULT_REMOTE_PATH, FIXTURE_FILES,
};

/// Download the reference ODIM_H5 files unless they are already cached.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[clap(long, default_value = DEFAULT_REMOTE_PATH)]
    remote_path: String,
    #[clap(long, default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,
    /// Files to fetch instead of the default fixtures.
    files: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let source = FixtureSource {
        base_url: args.base_url,
        remote_path: args.remote_path,
        cache_dir: args.cache_dir,
    };
    let names: Vec<&str> = if args.files.is_empty() {
        FIXTURE_FILES.to_vec()
    } else {
        args.files.iter().map(String::as_str).collect()
    };
    for name in names {
        let path = source
            .ensure_local(name)
            .with_context(|| format!("Could not fetch `{}`", source.remote_url(name)))?;
        println!("{}", path.display());
    }
    Ok(())
}
