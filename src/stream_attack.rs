use std::path::PathBuf;

use clap::Parser;

use prvsat::attack::Schedule;
use prvsat::cli::{self,SolveArgs};
use prvsat::config::{self,StreamParams};

/// Recovers the key of the nonce-keyed stream cipher from its keystream.
#[derive(Debug, Parser)]
#[command(name = "stream_attack", version)]
struct Opts {
    /// JSON parameter file; missing keys keep their defaults
    #[arg(long)]
    config:Option<PathBuf>,

    #[arg(long)]
    width:Option<usize>,

    /// Number of secret hash elements
    #[arg(long)]
    hci:Option<usize>,

    /// Hash array length
    #[arg(long)]
    hc:Option<usize>,

    /// Discarded firewall rounds
    #[arg(long)]
    fc:Option<usize>,

    /// Observed firewall rounds, four words each
    #[arg(long)]
    num_obs:Option<usize>,

    #[arg(long)]
    seed:Option<u64>,

    #[arg(long, value_delimiter = ',')]
    hash:Option<Vec<u64>>,

    /// Public nonce words
    #[arg(long, value_delimiter = ',')]
    iv:Option<Vec<u64>>,

    #[command(flatten)]
    solve:SolveArgs
}

impl Opts {
    fn params(&self)->prvsat::Result<StreamParams> {
	let mut p:StreamParams = match &self.config {
	    Some(path) => config::load(path)?,
	    None => StreamParams::default()
	};
	if let Some(x) = self.width { p.width = x; }
	if let Some(x) = self.hci { p.hci = x; }
	if let Some(x) = self.hc { p.hc = x; }
	if let Some(x) = self.fc { p.fc = x; }
	if let Some(x) = self.num_obs { p.num_obs = x; }
	if let Some(x) = self.seed { p.seed = x; }
	if let Some(x) = &self.hash { p.hash = x.clone(); }
	if let Some(x) = &self.iv { p.iv = x.clone(); }
	Ok(p)
    }
}

fn main()->Result<(),Box<dyn std::error::Error>> {
    cli::init_tracing();
    let opts = Opts::parse();
    let p = opts.params()?;
    cli::run(Schedule::Stream(p),&opts.solve)?;
    Ok(())
}
